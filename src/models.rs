use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::identity::SenderIdentity;

/// Header metadata for one fetched message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageRecord {
    /// Gmail message id, kept for diagnostics only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Raw "From" header
    pub from: String,
    pub subject: Option<String>,
    /// Raw "Date" header
    pub date: Option<String>,
    pub has_unsubscribe_header: bool,
}

impl MessageRecord {
    pub fn new(from: impl Into<String>) -> Self {
        Self {
            id: None,
            from: from.into(),
            subject: None,
            date: None,
            has_unsubscribe_header: false,
        }
    }

    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    pub fn with_unsubscribe(mut self, has_unsubscribe_header: bool) -> Self {
        self.has_unsubscribe_header = has_unsubscribe_header;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Running summary of every message attributed to one sender
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderGroup {
    pub identity: SenderIdentity,
    pub display_name: String,
    pub count: usize,
    /// Newest successfully parsed date among the group's messages
    pub most_recent: Option<DateTime<Utc>>,
    /// Subject of the message that set `most_recent`
    pub subject: Option<String>,
    pub has_unsubscribe: bool,
}

impl SenderGroup {
    pub fn new(identity: SenderIdentity, display_name: String) -> Self {
        Self {
            identity,
            display_name,
            count: 0,
            most_recent: None,
            subject: None,
            has_unsubscribe: false,
        }
    }

    /// Bulk-mail signal used by the optional candidate filter
    pub fn is_newsletter_candidate(&self) -> bool {
        self.has_unsubscribe || self.count > 1
    }
}
