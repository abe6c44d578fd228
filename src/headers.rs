//! Header extraction from message records and Gmail API messages

use google_gmail1::api::Message;
use mailparse::MailAddr;

use crate::identity::{find_address, SenderIdentity};
use crate::models::MessageRecord;

/// Fields the aggregator needs from one message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedHeaders {
    pub identity: SenderIdentity,
    pub display_name: String,
    pub subject: Option<String>,
    pub date: Option<String>,
    pub has_unsubscribe: bool,
}

/// Pull the grouping fields out of a record
///
/// Never fails: absent subject and date stay `None`, and a From header with no
/// usable address still yields an identity and a display name.
pub fn extract(record: &MessageRecord) -> ExtractedHeaders {
    let from = decode_header_value(&record.from);
    let identity = SenderIdentity::from_header(&from);
    let display_name = display_name(&from)
        .or_else(|| find_address(&from).map(str::to_string))
        .or_else(|| Some(from.trim().to_string()).filter(|s| !s.is_empty()))
        .unwrap_or_else(|| identity.to_string());

    ExtractedHeaders {
        identity,
        display_name,
        subject: record
            .subject
            .as_deref()
            .map(decode_header_value)
            .filter(|s| !s.trim().is_empty()),
        date: record
            .date
            .as_ref()
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty()),
        has_unsubscribe: record.has_unsubscribe_header,
    }
}

/// Decode RFC 2047 encoded-words (`=?UTF-8?B?...?=`); plain text passes through
pub fn decode_header_value(value: &str) -> String {
    if !value.contains("=?") {
        return value.to_string();
    }

    let line = format!("X-Decode: {}", value.replace(['\r', '\n'], " "));
    match mailparse::parse_header(line.as_bytes()) {
        Ok((header, _)) => header.get_value(),
        Err(_) => value.to_string(),
    }
}

/// Display name of the first mailbox in a From header, without quotes
pub fn display_name(from: &str) -> Option<String> {
    if let Ok(addrs) = mailparse::addrparse(from) {
        if let Some(MailAddr::Single(info)) = addrs.iter().next() {
            if let Some(name) = info.display_name.as_deref() {
                let name = name.trim().trim_matches('"').trim();
                if !name.is_empty() {
                    return Some(name.to_string());
                }
            }
        }
    }

    // "Name <addr" and other shapes addrparse rejects
    let pos = from.find('<')?;
    let name = from[..pos].trim().trim_matches('"').trim();
    if name.is_empty() {
        None
    } else {
        Some(name.to_string())
    }
}

/// Build a record from a Gmail message fetched in `metadata` format
///
/// Header names are matched case-insensitively; a missing From header leaves
/// `from` empty.
pub fn record_from_message(message: &Message) -> MessageRecord {
    let mut record = MessageRecord::new(String::new());
    record.id = message.id.clone();

    let headers = message
        .payload
        .as_ref()
        .and_then(|p| p.headers.as_ref());

    for header in headers.into_iter().flatten() {
        if let (Some(name), Some(value)) = (&header.name, &header.value) {
            match name.to_lowercase().as_str() {
                "from" => record.from = value.clone(),
                "subject" => record.subject = Some(value.clone()),
                "date" => record.date = Some(value.clone()),
                "list-unsubscribe" => record.has_unsubscribe_header = true,
                _ => {}
            }
        }
    }

    record
}
