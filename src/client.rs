//! Gmail message fetcher with bounded concurrency and retry logic

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::auth::{GmailHub, READONLY_SCOPE};
use crate::error::{Result, TidyError};
use crate::headers::record_from_message;
use crate::models::MessageRecord;

/// Progress callback type, invoked once per message fetched
pub type ProgressCallback = Arc<dyn Fn() + Send + Sync>;

/// Largest page the Gmail list endpoint returns
const MAX_PAGE_SIZE: usize = 100;

const MAX_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(100);
const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// Source of message records for the analysis
///
/// Records come back in list order; the aggregator uses that order as its
/// tie-break.
#[async_trait]
pub trait MailFetcher: Send + Sync {
    /// List ids of messages matching `query`, at most `max_results`
    async fn list_message_ids(&self, query: &str, max_results: usize) -> Result<Vec<String>>;

    /// Fetch the header metadata of one message
    async fn get_record(&self, id: &str) -> Result<MessageRecord>;

    /// Fetch many messages, preserving the order of `message_ids`
    async fn fetch_records(
        &self,
        message_ids: Vec<String>,
        on_progress: ProgressCallback,
    ) -> Result<Vec<MessageRecord>>;
}

/// Production fetcher backed by the Gmail API
pub struct GmailFetcher {
    hub: GmailHub,
    rate_limiter: Arc<Semaphore>,
    max_concurrent: usize,
}

impl GmailFetcher {
    /// Create a new fetcher
    ///
    /// # Arguments
    /// * `hub` - Authenticated Gmail API hub
    /// * `max_concurrent` - Maximum in-flight requests
    pub fn new(hub: GmailHub, max_concurrent: usize) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            hub,
            rate_limiter: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
        }
    }

    /// Check if an error is retryable
    fn should_retry(error: &TidyError) -> bool {
        error.is_transient()
    }

    /// Execute an async operation with exponential backoff retry
    async fn with_retry<T, F, Fut>(
        operation_name: &str,
        max_retries: u32,
        mut operation: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = INITIAL_RETRY_DELAY;
        let mut attempts = 0;

        loop {
            attempts += 1;
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if Self::should_retry(&e) && attempts <= max_retries => {
                    let wait = match e {
                        TidyError::RateLimitExceeded { retry_after } => {
                            delay.max(Duration::from_secs(retry_after))
                        }
                        _ => delay,
                    };
                    warn!(
                        "{} failed (attempt {}/{}): {}. Retrying in {:?}...",
                        operation_name,
                        attempts,
                        max_retries + 1,
                        e,
                        wait
                    );
                    tokio::time::sleep(wait).await;
                    delay = std::cmp::min(delay * 2, MAX_RETRY_DELAY);
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl MailFetcher for GmailFetcher {
    async fn list_message_ids(&self, query: &str, max_results: usize) -> Result<Vec<String>> {
        let mut all_ids = Vec::new();
        let mut page_token: Option<String> = None;

        info!("Fetching emails with query '{}' (max: {})", query, max_results);

        while all_ids.len() < max_results {
            let page_size = MAX_PAGE_SIZE.min(max_results - all_ids.len()) as u32;
            let token = page_token.clone();

            let (_, response) = Self::with_retry("list_messages", MAX_RETRIES, || {
                let token = token.clone();
                async move {
                    let mut call = self
                        .hub
                        .users()
                        .messages_list("me")
                        .q(query)
                        .max_results(page_size);
                    if let Some(token) = token.as_deref() {
                        call = call.page_token(token);
                    }
                    Ok::<_, TidyError>(call.add_scope(READONLY_SCOPE).doit().await?)
                }
            })
            .await?;

            let messages = response.messages.unwrap_or_default();
            if messages.is_empty() {
                debug!("No more messages found");
                break;
            }

            all_ids.extend(messages.into_iter().filter_map(|m| m.id));
            debug!("Fetched {} message IDs", all_ids.len());

            page_token = response.next_page_token;
            if page_token.is_none() {
                break;
            }
        }

        all_ids.truncate(max_results);
        info!("Found {} messages", all_ids.len());
        Ok(all_ids)
    }

    async fn get_record(&self, id: &str) -> Result<MessageRecord> {
        let _permit = self.rate_limiter.acquire().await.map_err(|e| {
            TidyError::Unknown(format!("Failed to acquire rate limit permit: {}", e))
        })?;

        Self::with_retry("get_message", MAX_RETRIES, || async move {
            let (_, message) = self
                .hub
                .users()
                .messages_get("me", id)
                .format("metadata")
                .add_metadata_headers("From")
                .add_metadata_headers("Subject")
                .add_metadata_headers("Date")
                .add_metadata_headers("List-Unsubscribe")
                .add_scope(READONLY_SCOPE)
                .doit()
                .await?;
            Ok::<_, TidyError>(record_from_message(&message))
        })
        .await
    }

    async fn fetch_records(
        &self,
        message_ids: Vec<String>,
        on_progress: ProgressCallback,
    ) -> Result<Vec<MessageRecord>> {
        let requested = message_ids.len();

        // `buffered` keeps list order; the semaphore in get_record bounds load
        let results: Vec<(String, Result<MessageRecord>)> = stream::iter(message_ids)
            .map(|id| {
                let on_progress = Arc::clone(&on_progress);
                async move {
                    let result = self.get_record(&id).await;
                    on_progress();
                    (id, result)
                }
            })
            .buffered(self.max_concurrent)
            .collect()
            .await;

        let mut records = Vec::with_capacity(requested);
        let mut first_error = None;
        for (id, result) in results {
            match result {
                Ok(record) => records.push(record),
                Err(e) => {
                    warn!("Error fetching details for message ID {}: {}", id, e);
                    first_error.get_or_insert(e);
                }
            }
        }

        // Individual failures are skipped, but a batch where nothing came back
        // is reported as the failure it is
        if records.is_empty() {
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        info!(
            "Finished fetching details for {} of {} messages",
            records.len(),
            requested
        );
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_should_retry_transient_errors() {
        assert!(GmailFetcher::should_retry(&TidyError::ServerError {
            status: 500,
            message: "Internal error".to_string(),
        }));
        assert!(GmailFetcher::should_retry(&TidyError::NetworkError(
            "connection reset".to_string()
        )));
        assert!(GmailFetcher::should_retry(&TidyError::RateLimitExceeded {
            retry_after: 0
        }));
    }

    #[test]
    fn test_should_not_retry_permanent_errors() {
        assert!(!GmailFetcher::should_retry(&TidyError::AuthError(
            "invalid token".to_string()
        )));
        assert!(!GmailFetcher::should_retry(&TidyError::Forbidden(
            "no access".to_string()
        )));
    }

    #[tokio::test]
    async fn test_with_retry_succeeds_after_transient_error() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = Arc::clone(&attempt_count);

        let result = GmailFetcher::with_retry("test_op", 3, || {
            let count = Arc::clone(&attempt_count_clone);
            async move {
                let current = count.fetch_add(1, Ordering::SeqCst);
                if current < 2 {
                    Err(TidyError::NetworkError("Connection timeout".to_string()))
                } else {
                    Ok("success".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "success");
        assert_eq!(attempt_count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_with_retry_fails_on_permanent_error() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = Arc::clone(&attempt_count);

        let result = GmailFetcher::with_retry("test_op", 3, || {
            let count = Arc::clone(&attempt_count_clone);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(TidyError::AuthError("Invalid credentials".to_string()))
            }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempt_count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_with_retry_exhausts_all_retries() {
        let attempt_count = Arc::new(AtomicU32::new(0));
        let attempt_count_clone = Arc::clone(&attempt_count);

        let result = GmailFetcher::with_retry("test_op", 3, || {
            let count = Arc::clone(&attempt_count_clone);
            async move {
                count.fetch_add(1, Ordering::SeqCst);
                Err::<String, _>(TidyError::ServerError {
                    status: 503,
                    message: "unavailable".to_string(),
                })
            }
        })
        .await;

        assert!(result.is_err());
        // initial attempt + 3 retries
        assert_eq!(attempt_count.load(Ordering::SeqCst), 4);
    }
}
