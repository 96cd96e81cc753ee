//! Fallback controller
//!
//! Walks an ordered list of provider names and returns the first success.
//! Retry is a separate layer: the gateway hands in an operation that already
//! retries a single provider, so each step here is "this provider, with its
//! retries exhausted".

use crate::error::{Error, Result};
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// A value together with the provider that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct Served<T> {
    /// Name of the provider that succeeded
    pub provider: String,

    /// Position of that provider in the chain
    pub index: usize,

    /// The operation result
    pub value: T,
}

/// Ordered failover across providers
#[derive(Debug, Default)]
pub struct FallbackController {
    current: AtomicUsize,
}

impl FallbackController {
    /// Create a controller that has not served anything yet
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the provider that most recently succeeded
    pub fn current_provider_index(&self) -> usize {
        self.current.load(Ordering::Relaxed)
    }

    /// Try each provider in order
    ///
    /// Every failure is logged before moving on. If all providers fail, the
    /// error from the last one is returned.
    pub async fn execute<T, F, Fut>(&self, providers: &[String], mut operation: F) -> Result<Served<T>>
    where
        F: FnMut(String) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for (index, name) in providers.iter().enumerate() {
            match operation(name.clone()).await {
                Ok(value) => {
                    if index > 0 {
                        debug!("Provider '{}' served the request after {} failures", name, index);
                    }
                    self.current.store(index, Ordering::Relaxed);
                    return Ok(Served {
                        provider: name.clone(),
                        index,
                        value,
                    });
                }
                Err(e) => {
                    if index + 1 < providers.len() {
                        warn!("Provider '{}' failed, trying next: {}", name, e);
                    } else {
                        warn!("Provider '{}' failed: {}", name, e);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| Error::config("No providers to try")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_first_success_wins() {
        let controller = FallbackController::new();

        let served = controller
            .execute(&names(&["a", "b", "c"]), |name| async move {
                if name == "a" {
                    Err(Error::transient("a", "down"))
                } else {
                    Ok(format!("from {}", name))
                }
            })
            .await
            .unwrap();

        assert_eq!(served.provider, "b");
        assert_eq!(served.index, 1);
        assert_eq!(served.value, "from b");
        assert_eq!(controller.current_provider_index(), 1);
    }

    #[tokio::test]
    async fn test_empty_chain_is_configuration_error() {
        let controller = FallbackController::new();
        let result: Result<Served<()>> = controller.execute(&[], |_| async { Ok(()) }).await;
        assert!(matches!(result, Err(Error::Configuration(_))));
    }
}
