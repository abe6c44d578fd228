//! Tidy Inbox
//!
//! Finds the senders behind the bulk of a Gmail inbox. Messages matching a
//! search are grouped by normalized sender address, ranked by volume or
//! recency, and each sender comes with a ready-made `from:(...)` filter query.
//!
//! # Overview
//!
//! - **Authentication**: OAuth2 installed-app flow with a read-only scope
//! - **Fetching**: Paginated listing plus concurrent metadata fetches with retry
//! - **Aggregation**: Per-sender counts, most recent date and subject, unsubscribe flag
//! - **Ranking**: Stable sort by count or by date, truncated to the top N
//! - **Reporting**: Text, Markdown and JSON renderings
//!
//! # Example Usage
//!
//! ```no_run
//! use tidy_inbox::{aggregator::TracingWarningSink, pipeline, MessageRecord};
//!
//! let records = vec![
//!     MessageRecord::new("News <news@example.com>").with_date("Mon, 1 Jan 2024 10:00:00 +0000"),
//!     MessageRecord::new("news@example.com").with_unsubscribe(true),
//! ];
//!
//! let report = pipeline::analyze(
//!     &records,
//!     &pipeline::AnalysisOptions::default(),
//!     &mut TracingWarningSink::new(),
//! )?;
//! println!("{}", report.to_text());
//! # Ok::<(), tidy_inbox::TidyError>(())
//! ```
//!
//! # Module Organization
//!
//! - [`auth`] - OAuth2 authentication and Gmail API initialization
//! - [`client`] - Gmail message fetcher with retry logic
//! - [`headers`] - Header decoding and extraction
//! - [`identity`] - Sender address normalization
//! - [`date`] - Lenient date header parsing
//! - [`aggregator`] - Grouping records by sender
//! - [`ranker`] - Sorting and truncating sender groups
//! - [`filter_query`] - Gmail filter strings and search links
//! - [`pipeline`] - End-to-end analysis of a batch of records
//! - [`report`] - Report rendering
//! - [`cli`] - Command-line interface and scan orchestration
//! - [`config`] - Configuration management
//! - [`error`] - Error types and result aliases
//! - [`models`] - Core data structures

pub mod aggregator;
pub mod auth;
pub mod cli;
pub mod client;
pub mod config;
pub mod date;
pub mod error;
pub mod filter_query;
pub mod headers;
pub mod identity;
pub mod models;
pub mod pipeline;
pub mod ranker;
pub mod report;

pub use error::{Result, TidyError};

pub use identity::SenderIdentity;
pub use models::{MessageRecord, SenderGroup};

pub use aggregator::{Aggregator, DateWarning, SenderMap, TracingWarningSink, WarningSink};
pub use ranker::{rank, SortMode};
pub use pipeline::{analyze, AnalysisOptions};
pub use report::{RankedSender, Report};

pub use config::Config;
pub use client::{GmailFetcher, MailFetcher, ProgressCallback};
pub use cli::{Cli, Commands, ProgressReporter, ScanArgs, ScanPlan};
