//! Common test utilities and fixtures

#![allow(dead_code)]

use google_gmail1::api::Message;
use indicatif::{MultiProgress, ProgressDrawTarget};
use mockall::mock;
use serde_json::json;
use tidy_inbox::cli::ProgressReporter;
use tidy_inbox::client::{MailFetcher, ProgressCallback};
use tidy_inbox::error::Result;
use tidy_inbox::models::MessageRecord;

/// Record with a From header and an RFC 2822 date
pub fn dated_record(from: &str, date: &str) -> MessageRecord {
    MessageRecord::new(from).with_date(date)
}

/// Record that looks like a mailing-list message
pub fn newsletter_record(from: &str, date: &str, subject: &str) -> MessageRecord {
    MessageRecord::new(from)
        .with_date(date)
        .with_subject(subject)
        .with_unsubscribe(true)
}

/// Ids in the form `msg-0`, `msg-1`, ...
pub fn message_ids(count: usize) -> Vec<String> {
    (0..count).map(|i| format!("msg-{}", i)).collect()
}

/// Gmail API message in metadata format (JSON)
pub fn mock_gmail_message_response(
    id: &str,
    from: &str,
    subject: &str,
    date: &str,
    list_unsubscribe: Option<&str>,
) -> serde_json::Value {
    let mut headers = vec![
        json!({"name": "From", "value": from}),
        json!({"name": "Subject", "value": subject}),
        json!({"name": "Date", "value": date}),
    ];
    if let Some(value) = list_unsubscribe {
        headers.push(json!({"name": "List-Unsubscribe", "value": value}));
    }

    json!({
        "id": id,
        "threadId": format!("thread_{}", id),
        "labelIds": ["INBOX", "UNREAD"],
        "payload": {
            "mimeType": "text/plain",
            "headers": headers
        }
    })
}

/// Same as [`mock_gmail_message_response`], deserialized into the API type
pub fn mock_gmail_message(
    id: &str,
    from: &str,
    subject: &str,
    date: &str,
    list_unsubscribe: Option<&str>,
) -> Message {
    serde_json::from_value(mock_gmail_message_response(
        id,
        from,
        subject,
        date,
        list_unsubscribe,
    ))
    .unwrap()
}

/// Progress reporter that draws nothing
pub fn hidden_reporter() -> ProgressReporter {
    ProgressReporter::with_multi_progress(MultiProgress::with_draw_target(
        ProgressDrawTarget::hidden(),
    ))
}

mock! {
    pub MailFetcher {}

    #[async_trait::async_trait]
    impl MailFetcher for MailFetcher {
        async fn list_message_ids(&self, query: &str, max_results: usize) -> Result<Vec<String>>;
        async fn get_record(&self, id: &str) -> Result<MessageRecord>;
        async fn fetch_records(
            &self,
            message_ids: Vec<String>,
            on_progress: ProgressCallback,
        ) -> Result<Vec<MessageRecord>>;
    }
}

/// Mock that lists one id per record and returns the records in order
pub fn fetcher_returning(records: Vec<MessageRecord>) -> MockMailFetcher {
    let mut fetcher = MockMailFetcher::new();
    let ids = message_ids(records.len());

    fetcher
        .expect_list_message_ids()
        .times(1)
        .returning(move |_, max_results| Ok(ids.iter().take(max_results).cloned().collect()));

    fetcher
        .expect_fetch_records()
        .times(1)
        .returning(move |ids, on_progress| {
            let fetched: Vec<MessageRecord> = records.iter().take(ids.len()).cloned().collect();
            for _ in &fetched {
                on_progress();
            }
            Ok(fetched)
        });

    fetcher
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_ids() {
        assert_eq!(message_ids(2), vec!["msg-0", "msg-1"]);
    }

    #[test]
    fn test_mock_gmail_message_has_headers() {
        let message = mock_gmail_message(
            "m1",
            "News <news@example.com>",
            "Hello",
            "Mon, 1 Jan 2024 10:00:00 +0000",
            Some("<mailto:unsub@example.com>"),
        );
        let headers = message.payload.unwrap().headers.unwrap();
        assert_eq!(headers.len(), 4);
    }
}
