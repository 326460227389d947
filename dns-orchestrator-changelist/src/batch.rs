//! Batch Zone Processor
//!
//! Runs one operation per zone, sequentially and in input order. Zones are
//! independent transactions, so one failing zone does not undo the others.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::observer::{ProtocolEvent, ProtocolObserver};
use crate::types::{BatchResult, BatchZoneFailure};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BatchOptions {
    /// Keep going after a zone fails.
    pub continue_on_error: bool,
    /// Pause between two zones, to stay under the service rate limit.
    #[serde(rename = "delayBetweenZonesMs", with = "crate::utils::duration_ms")]
    pub delay_between_zones: Duration,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            continue_on_error: true,
            delay_between_zones: Duration::from_secs(1),
        }
    }
}

/// Invoke `operation` for every zone.
///
/// With `continue_on_error` unset, processing stops at the first failure;
/// the outcomes collected so far, including the failing zone, are returned.
pub async fn process_zones<I, F, Fut, T, E>(
    zones: I,
    mut operation: F,
    options: &BatchOptions,
    observer: &dyn ProtocolObserver,
) -> BatchResult
where
    I: IntoIterator,
    I::Item: Into<String>,
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let zones: Vec<String> = zones.into_iter().map(Into::into).collect();
    let total = zones.len();
    let mut result = BatchResult::default();

    for (index, zone) in zones.into_iter().enumerate() {
        if index > 0 && !options.delay_between_zones.is_zero() {
            tokio::time::sleep(options.delay_between_zones).await;
        }

        let outcome = operation(zone.clone()).await;
        observer.on_event(&ProtocolEvent::ZoneProcessed {
            zone: zone.clone(),
            index,
            total,
            success: outcome.is_ok(),
        });

        match outcome {
            Ok(_) => result.successful.push(zone),
            Err(e) => {
                result.failed.push(BatchZoneFailure {
                    zone,
                    error: e.to_string(),
                });
                if !options.continue_on_error {
                    break;
                }
            }
        }
    }

    result
}
