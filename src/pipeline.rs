//! One-shot analysis: records in, ranked report out

use tracing::info;

use crate::aggregator::{DateWarning, SenderMap, WarningSink};
use crate::error::Result;
use crate::filter_query::{filter_query, full_filter_query, search_url};
use crate::models::MessageRecord;
use crate::ranker::{rank, SortMode};
use crate::report::{RankedSender, Report};

/// Knobs for a single analysis run
#[derive(Debug, Clone)]
pub struct AnalysisOptions {
    pub sort: SortMode,
    /// Maximum number of senders to report; negative values are rejected
    pub limit: i64,
    /// Search expression the records were fetched with
    pub base_query: String,
    /// Drop single-message senders that carry no unsubscribe header
    pub candidates_only: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            sort: SortMode::Count,
            limit: 20,
            base_query: "is:unread".to_string(),
            candidates_only: false,
        }
    }
}

/// Forwards warnings while counting them for the report
struct CountingSink<'a> {
    inner: &'a mut dyn WarningSink,
    count: usize,
}

impl WarningSink for CountingSink<'_> {
    fn date_skipped(&mut self, warning: DateWarning) {
        self.count += 1;
        self.inner.date_skipped(warning);
    }
}

/// Aggregate, rank and render filter queries for a batch of records
///
/// Date problems go to `sink`; only invalid options produce an error. An empty
/// batch yields an empty report.
pub fn analyze(
    records: &[MessageRecord],
    options: &AnalysisOptions,
    sink: &mut dyn WarningSink,
) -> Result<Report> {
    info!("Grouping {} messages", records.len());

    let mut counting = CountingSink {
        inner: sink,
        count: 0,
    };
    let mut senders = SenderMap::from_records(records, &mut counting);
    let skipped_dates = counting.count;
    let distinct_senders = senders.len();

    if options.candidates_only {
        senders = senders.newsletter_candidates();
    }

    let entries = rank(&senders, options.sort, options.limit)?
        .into_iter()
        .enumerate()
        .map(|(i, group)| {
            let full_query = full_filter_query(&options.base_query, &group.identity);
            RankedSender {
                rank: i + 1,
                filter_query: filter_query(&group.identity),
                search_url: search_url(&full_query),
                full_query,
                group,
            }
        })
        .collect();

    Ok(Report {
        sort: options.sort,
        base_query: options.base_query.clone(),
        total_messages: records.len(),
        distinct_senders,
        skipped_dates,
        entries,
    })
}
