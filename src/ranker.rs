//! Ordering and truncation of sender groups

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use tracing::info;

use crate::aggregator::SenderMap;
use crate::error::{Result, TidyError};
use crate::models::SenderGroup;

/// Ranking criterion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    /// Most messages first, newest first on ties
    #[default]
    Count,
    /// Newest first, most messages first on ties
    Date,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Count => "count",
            SortMode::Date => "date",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = TidyError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "count" => Ok(SortMode::Count),
            "date" => Ok(SortMode::Date),
            other => Err(TidyError::InvalidArgument(format!(
                "unknown sort mode '{}'. Must be 'count' or 'date'",
                other
            ))),
        }
    }
}

/// Order groups by `mode` and keep at most `limit`
///
/// The sort is stable, so groups with equal keys stay in the order their
/// senders were first seen. Undated groups sort after dated ones. A negative
/// limit is rejected rather than clamped.
pub fn rank(senders: &SenderMap, mode: SortMode, limit: i64) -> Result<Vec<SenderGroup>> {
    if limit < 0 {
        return Err(TidyError::InvalidArgument(format!(
            "result count must not be negative, got {}",
            limit
        )));
    }
    let limit = usize::try_from(limit).unwrap_or(usize::MAX);

    info!("Sorting {} senders by {}", senders.len(), mode);

    let mut ranked: Vec<SenderGroup> = senders.iter().cloned().collect();
    ranked.sort_by(|a, b| compare(mode, a, b));
    ranked.truncate(limit);

    Ok(ranked)
}

fn compare(mode: SortMode, a: &SenderGroup, b: &SenderGroup) -> Ordering {
    // None < Some, so comparing b against a puts undated groups last
    match mode {
        SortMode::Count => b
            .count
            .cmp(&a.count)
            .then_with(|| b.most_recent.cmp(&a.most_recent)),
        SortMode::Date => b
            .most_recent
            .cmp(&a.most_recent)
            .then_with(|| b.count.cmp(&a.count)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::DateWarning;
    use crate::models::MessageRecord;

    fn map(records: &[MessageRecord]) -> SenderMap {
        SenderMap::from_records(records, &mut Vec::<DateWarning>::new())
    }

    fn order(groups: &[SenderGroup]) -> Vec<&str> {
        groups.iter().map(|g| g.identity.as_str()).collect()
    }

    fn example() -> SenderMap {
        map(&[
            MessageRecord::new("a@x.com"),
            MessageRecord::new("a@x.com"),
            MessageRecord::new("A@X.com").with_date("2024-01-01"),
            MessageRecord::new("c@y.com")
                .with_date("2024-02-01")
                .with_unsubscribe(true),
        ])
    }

    #[test]
    fn test_sort_mode_from_str() {
        assert_eq!("count".parse::<SortMode>().unwrap(), SortMode::Count);
        assert_eq!(" Date ".parse::<SortMode>().unwrap(), SortMode::Date);

        let err = "size".parse::<SortMode>().unwrap_err();
        assert!(matches!(err, TidyError::InvalidArgument(_)));
        assert!(err.to_string().contains("unknown sort mode 'size'"));
    }

    #[test]
    fn test_worked_example_by_count() {
        let ranked = rank(&example(), SortMode::Count, 10).unwrap();
        assert_eq!(order(&ranked), vec!["a@x.com", "c@y.com"]);
    }

    #[test]
    fn test_worked_example_by_date() {
        let ranked = rank(&example(), SortMode::Date, 10).unwrap();
        assert_eq!(order(&ranked), vec!["c@y.com", "a@x.com"]);
    }

    #[test]
    fn test_count_ties_broken_by_date_with_undated_last() {
        let senders = map(&[
            MessageRecord::new("undated@x.com"),
            MessageRecord::new("old@x.com").with_date("2023-01-01"),
            MessageRecord::new("new@x.com").with_date("2024-01-01"),
        ]);
        let ranked = rank(&senders, SortMode::Count, 10).unwrap();
        assert_eq!(order(&ranked), vec!["new@x.com", "old@x.com", "undated@x.com"]);
    }

    #[test]
    fn test_date_mode_undated_last_then_count() {
        let senders = map(&[
            MessageRecord::new("undated@x.com"),
            MessageRecord::new("undated@x.com"),
            MessageRecord::new("one@x.com").with_date("2024-01-01"),
            MessageRecord::new("two@x.com").with_date("2024-01-01"),
            MessageRecord::new("two@x.com"),
        ]);
        let ranked = rank(&senders, SortMode::Date, 10).unwrap();
        assert_eq!(order(&ranked), vec!["two@x.com", "one@x.com", "undated@x.com"]);
    }

    #[test]
    fn test_equal_keys_keep_encounter_order() {
        let senders = map(&[
            MessageRecord::new("c@x.com"),
            MessageRecord::new("a@x.com"),
            MessageRecord::new("b@x.com"),
        ]);
        let ranked = rank(&senders, SortMode::Count, 10).unwrap();
        assert_eq!(order(&ranked), vec!["c@x.com", "a@x.com", "b@x.com"]);

        let ranked = rank(&senders, SortMode::Date, 10).unwrap();
        assert_eq!(order(&ranked), vec!["c@x.com", "a@x.com", "b@x.com"]);
    }

    #[test]
    fn test_limit_truncates() {
        let ranked = rank(&example(), SortMode::Count, 1).unwrap();
        assert_eq!(order(&ranked), vec!["a@x.com"]);
    }

    #[test]
    fn test_zero_limit_is_empty() {
        assert!(rank(&example(), SortMode::Count, 0).unwrap().is_empty());
    }

    #[test]
    fn test_limit_above_sender_count_returns_all() {
        assert_eq!(rank(&example(), SortMode::Date, 1000).unwrap().len(), 2);
    }

    #[test]
    fn test_negative_limit_is_invalid() {
        let err = rank(&example(), SortMode::Count, -1).unwrap_err();
        assert!(matches!(err, TidyError::InvalidArgument(_)));
    }

    #[test]
    fn test_empty_map() {
        let ranked = rank(&SenderMap::default(), SortMode::Count, 20).unwrap();
        assert!(ranked.is_empty());
    }
}
