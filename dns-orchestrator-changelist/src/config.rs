//! Client configuration
//!
//! Every field has a default, so an empty JSON object is a valid config.

use serde::{Deserialize, Serialize};

use crate::activation::PollOptions;
use crate::api::DEFAULT_API_BASE_PATH;
use crate::backoff::RetryConfig;
use crate::batch::BatchOptions;
use crate::error::{ChangelistError, ChangelistResult};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChangelistConfig {
    /// Path prefix of the changelist API.
    pub api_base_path: String,
    /// Submission retry policy.
    pub retry: RetryConfig,
    /// Activation polling defaults.
    pub poll: PollOptions,
    /// Batch processing defaults.
    pub batch: BatchOptions,
}

impl Default for ChangelistConfig {
    fn default() -> Self {
        Self {
            api_base_path: DEFAULT_API_BASE_PATH.to_string(),
            retry: RetryConfig::default(),
            poll: PollOptions::default(),
            batch: BatchOptions::default(),
        }
    }
}

impl ChangelistConfig {
    pub fn from_json(json: &str) -> ChangelistResult<Self> {
        serde_json::from_str(json).map_err(|e| ChangelistError::Serialization(e.to_string()))
    }
}
