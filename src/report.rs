//! Ranked report and its text, Markdown and JSON renderings

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::Result;
use crate::models::SenderGroup;
use crate::ranker::SortMode;

/// One row of the report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RankedSender {
    /// 1-based position
    pub rank: usize,
    #[serde(flatten)]
    pub group: SenderGroup,
    /// `from:(<identity>)`
    pub filter_query: String,
    /// Base search plus the sender filter
    pub full_query: String,
    pub search_url: String,
}

/// Result of one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub sort: SortMode,
    pub base_query: String,
    pub total_messages: usize,
    pub distinct_senders: usize,
    /// Messages whose date was missing or unparseable
    pub skipped_dates: usize,
    pub entries: Vec<RankedSender>,
}

fn format_recent(date: Option<DateTime<Utc>>) -> String {
    date.map(|d| d.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

impl Report {
    /// Plain-text listing for the terminal
    pub fn to_text(&self) -> String {
        let mut out = String::new();

        out.push_str("========================================\n");
        out.push_str("Top Newsletters\n");
        out.push_str("========================================\n");
        out.push_str(&format!("Query: {}\n", self.base_query));
        out.push_str(&format!("Sorted by: {}\n", capitalize(self.sort.as_str())));
        out.push_str(&format!(
            "Displaying top {} of {} senders ({} messages analyzed)\n",
            self.entries.len(),
            self.distinct_senders,
            self.total_messages
        ));

        for entry in &self.entries {
            let group = &entry.group;
            let marker = if group.has_unsubscribe { " [unsubscribe]" } else { "" };

            out.push('\n');
            out.push_str(&format!("{}. {}{}\n", entry.rank, group.identity, marker));
            out.push_str(&format!("   Sender:       {}\n", group.display_name));
            out.push_str(&format!("   Filter Query: {}\n", entry.full_query));
            out.push_str(&format!("   Search Link:  {}\n", entry.search_url));
            out.push_str(&format!(
                "   Count: {} | Recent: {} | Subject: {}\n",
                group.count,
                format_recent(group.most_recent),
                group.subject.as_deref().unwrap_or("N/A")
            ));
        }

        if self.skipped_dates > 0 {
            out.push('\n');
            out.push_str(&format!(
                "Note: date parsing skipped for {} message(s); they still count toward totals.\n",
                self.skipped_dates
            ));
        }

        out
    }

    /// Markdown rendering, one table row per sender
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str("# Newsletter Senders\n\n");
        md.push_str("## Summary\n\n");
        md.push_str(&format!("- **Query:** `{}`\n", self.base_query));
        md.push_str(&format!("- **Sorted by:** {}\n", self.sort));
        md.push_str(&format!("- **Messages analyzed:** {}\n", self.total_messages));
        md.push_str(&format!("- **Distinct senders:** {}\n", self.distinct_senders));
        if self.skipped_dates > 0 {
            md.push_str(&format!("- **Dates skipped:** {}\n", self.skipped_dates));
        }
        md.push('\n');

        if self.entries.is_empty() {
            md.push_str("_No senders found._\n");
            return md;
        }

        md.push_str("## Senders\n\n");
        md.push_str("| # | Sender | Count | Most recent | Unsubscribe | Filter query |\n");
        md.push_str("|---|--------|-------|-------------|-------------|--------------|\n");
        for entry in &self.entries {
            let group = &entry.group;
            md.push_str(&format!(
                "| {} | {} ({}) | {} | {} | {} | [`{}`]({}) |\n",
                entry.rank,
                group.display_name.replace('|', "\\|"),
                group.identity,
                group.count,
                format_recent(group.most_recent),
                if group.has_unsubscribe { "yes" } else { "no" },
                entry.full_query,
                entry.search_url
            ));
        }

        md
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
