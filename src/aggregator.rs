//! Folding message records into per-sender groups

use std::collections::HashMap;
use std::fmt;

use tracing::{debug, info, warn};

use crate::date::{parse_date, ParsedDate};
use crate::headers::extract;
use crate::identity::SenderIdentity;
use crate::models::{MessageRecord, SenderGroup};

/// A record whose date could not be used
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateWarning {
    pub identity: SenderIdentity,
    /// Raw header, `None` when the message had no date at all
    pub raw_date: Option<String>,
    pub message_id: Option<String>,
}

impl fmt::Display for DateWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.raw_date {
            Some(raw) => write!(f, "could not parse date '{}' for sender {}", raw, self.identity),
            None => write!(f, "no date header for sender {}", self.identity),
        }
    }
}

/// Receives per-record date problems; never aborts the fold
pub trait WarningSink {
    fn date_skipped(&mut self, warning: DateWarning);
}

impl WarningSink for Vec<DateWarning> {
    fn date_skipped(&mut self, warning: DateWarning) {
        self.push(warning);
    }
}

/// Sink that logs each warning and keeps a tally
#[derive(Debug, Default)]
pub struct TracingWarningSink {
    count: usize,
}

impl TracingWarningSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> usize {
        self.count
    }
}

impl WarningSink for TracingWarningSink {
    fn date_skipped(&mut self, warning: DateWarning) {
        self.count += 1;
        warn!("{}; date parsing skipped", warning);
    }
}

/// Stateful fold from records to sender groups
///
/// Groups are kept in first-encounter order, which later serves as the
/// ranking tie-break.
#[derive(Debug, Default)]
pub struct Aggregator {
    index: HashMap<SenderIdentity, usize>,
    groups: Vec<SenderGroup>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into its sender's group
    pub fn fold(&mut self, record: &MessageRecord, sink: &mut dyn WarningSink) {
        let headers = extract(record);

        let slot = match self.index.get(&headers.identity) {
            Some(&slot) => slot,
            None => {
                debug!("New sender: {}", headers.identity);
                self.groups.push(SenderGroup::new(
                    headers.identity.clone(),
                    headers.display_name.clone(),
                ));
                self.index
                    .insert(headers.identity.clone(), self.groups.len() - 1);
                self.groups.len() - 1
            }
        };
        let group = &mut self.groups[slot];

        group.count += 1;
        group.has_unsubscribe |= headers.has_unsubscribe;

        match parse_date(headers.date.as_deref()) {
            ParsedDate::Valid(timestamp) => {
                let is_newer = group.most_recent.map_or(true, |current| timestamp > current);
                if is_newer {
                    group.most_recent = Some(timestamp);
                    group.subject = headers.subject;
                    group.display_name = headers.display_name;
                }
            }
            ParsedDate::Missing | ParsedDate::Unparseable => {
                sink.date_skipped(DateWarning {
                    identity: headers.identity,
                    raw_date: headers.date,
                    message_id: record.id.clone(),
                });
            }
        }
    }

    /// Fold every record in order
    pub fn fold_all<'a, I>(&mut self, records: I, sink: &mut dyn WarningSink)
    where
        I: IntoIterator<Item = &'a MessageRecord>,
    {
        for record in records {
            self.fold(record, sink);
        }
    }

    pub fn finish(self) -> SenderMap {
        info!("Finished grouping. Identified {} senders", self.groups.len());
        SenderMap {
            index: self.index,
            groups: self.groups,
        }
    }
}

/// Completed mapping from sender identity to group, in encounter order
#[derive(Debug, Clone, Default)]
pub struct SenderMap {
    index: HashMap<SenderIdentity, usize>,
    groups: Vec<SenderGroup>,
}

impl SenderMap {
    /// Aggregate a whole batch in one call
    pub fn from_records<'a, I>(records: I, sink: &mut dyn WarningSink) -> Self
    where
        I: IntoIterator<Item = &'a MessageRecord>,
    {
        let mut aggregator = Aggregator::new();
        aggregator.fold_all(records, sink);
        aggregator.finish()
    }

    pub fn get(&self, identity: &SenderIdentity) -> Option<&SenderGroup> {
        self.index.get(identity).map(|&slot| &self.groups[slot])
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SenderGroup> {
        self.groups.iter()
    }

    /// Sum of group counts; equals the number of records folded
    pub fn total_messages(&self) -> usize {
        self.groups.iter().map(|g| g.count).sum()
    }

    /// Keep only senders with an unsubscribe header or more than one message
    pub fn newsletter_candidates(self) -> Self {
        let before = self.groups.len();
        let groups: Vec<SenderGroup> = self
            .groups
            .into_iter()
            .filter(SenderGroup::is_newsletter_candidate)
            .collect();
        info!(
            "Filtered {} senders down to {} newsletter candidates",
            before,
            groups.len()
        );

        let index = groups
            .iter()
            .enumerate()
            .map(|(slot, group)| (group.identity.clone(), slot))
            .collect();
        Self { index, groups }
    }
}
