//! Gmail search-query rendering for a sender

use crate::identity::SenderIdentity;

const GMAIL_SEARCH_URL: &str = "https://mail.google.com/mail/u/0/#search/";

/// `from:(<identity>)`, with the identity inserted verbatim
pub fn filter_query(identity: &SenderIdentity) -> String {
    format!("from:({})", identity)
}

/// The sender filter scoped by the search that produced the report
///
/// A blank base query yields just the sender filter.
pub fn full_filter_query(base_query: &str, identity: &SenderIdentity) -> String {
    let base_query = base_query.trim();
    if base_query.is_empty() {
        filter_query(identity)
    } else {
        format!("{} {}", base_query, filter_query(identity))
    }
}

/// Link that opens the query in the Gmail web UI
pub fn search_url(query: &str) -> String {
    format!("{}{}", GMAIL_SEARCH_URL, urlencoding::encode(query))
}
