//! Command-line interface

use clap::{Args, Parser, Subcommand};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::aggregator::TracingWarningSink;
use crate::client::{MailFetcher, ProgressCallback};
use crate::config::Config;
use crate::error::{Result, TidyError};
use crate::pipeline::{analyze, AnalysisOptions};
use crate::ranker::SortMode;
use crate::report::Report;

#[derive(Parser, Debug)]
#[command(name = "tidy-inbox")]
#[command(version = "0.1.0")]
#[command(about = "Find the newsletters cluttering your Gmail inbox", long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to OAuth2 credentials file
    #[arg(long, default_value = "credentials.json")]
    pub credentials: PathBuf,

    /// Path to token cache file
    #[arg(long, default_value = ".tidy-inbox/token.json")]
    pub token_cache: PathBuf,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Authenticate with Gmail API
    Auth {
        /// Force re-authentication even if token exists
        #[arg(long)]
        force: bool,
    },

    /// Group matching messages by sender and list the top senders
    Scan(ScanArgs),

    /// Generate example configuration file
    InitConfig {
        /// Path to create config file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,

        /// Overwrite existing file
        #[arg(long)]
        force: bool,
    },
}

/// Flags for `scan`; each one overrides the config file when given
#[derive(Args, Debug, Clone, Default)]
pub struct ScanArgs {
    /// Gmail search query (e.g. "is:unread category:promotions")
    #[arg(short, long)]
    pub query: Option<String>,

    /// Sort by "count" or "date"
    #[arg(short, long)]
    pub sort: Option<String>,

    /// Number of senders to show
    #[arg(short = 'n', long, allow_negative_numbers = true)]
    pub num_results: Option<i64>,

    /// Maximum number of messages to fetch
    #[arg(long)]
    pub max_fetch: Option<usize>,

    /// Only show senders with an unsubscribe header or more than one message
    #[arg(long)]
    pub candidates_only: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Also write a Markdown report to this path
    #[arg(long)]
    pub markdown: Option<PathBuf>,
}

/// Everything a scan needs, after merging flags over config
#[derive(Debug, Clone)]
pub struct ScanPlan {
    pub query: String,
    pub max_fetch: usize,
    pub options: AnalysisOptions,
}

impl ScanArgs {
    pub fn resolve(&self, config: &Config) -> Result<ScanPlan> {
        let query = self
            .query
            .clone()
            .unwrap_or_else(|| config.search.query.clone());
        if query.trim().is_empty() {
            return Err(TidyError::InvalidArgument(
                "query cannot be empty".to_string(),
            ));
        }

        let max_fetch = self.max_fetch.unwrap_or(config.search.max_fetch);
        if max_fetch == 0 {
            return Err(TidyError::InvalidArgument(
                "max-fetch must be at least 1".to_string(),
            ));
        }

        let sort: SortMode = match &self.sort {
            Some(sort) => sort.parse()?,
            None => config.sort_mode()?,
        };

        Ok(ScanPlan {
            options: AnalysisOptions {
                sort,
                limit: self.num_results.unwrap_or(config.report.num_results),
                base_query: query.clone(),
                candidates_only: self.candidates_only || config.report.candidates_only,
            },
            query,
            max_fetch,
        })
    }
}

/// Progress reporter using indicatif
pub struct ProgressReporter {
    multi: MultiProgress,
    spinner_style: ProgressStyle,
    bar_style: ProgressStyle,
}

impl ProgressReporter {
    pub fn new() -> Self {
        Self::with_multi_progress(MultiProgress::new())
    }

    /// Share a MultiProgress with the log writer so lines print above the bars
    pub fn with_multi_progress(multi: MultiProgress) -> Self {
        let spinner_style = ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed:>6}] {msg}")
            .unwrap()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        let bar_style = ProgressStyle::default_bar()
            .template("[{elapsed:>6}] {bar:40.cyan/blue} {pos:>7}/{len:7} {msg}")
            .unwrap()
            .progress_chars("##-");

        Self {
            multi,
            spinner_style,
            bar_style,
        }
    }

    pub fn multi_progress(&self) -> &MultiProgress {
        &self.multi
    }

    pub fn add_spinner(&self, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(self.spinner_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn add_progress_bar(&self, len: u64, msg: &str) -> ProgressBar {
        let pb = self.multi.add(ProgressBar::new(len));
        pb.set_style(self.bar_style.clone());
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    /// Finish a spinner and clear it from the multi-progress display
    pub fn finish_spinner(&self, pb: &ProgressBar, msg: &str) {
        pb.finish_and_clear();
        let _ = self.multi.println(format!("  ✓ {}", msg));
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Fetch, group and rank in one go
///
/// Listing failures propagate; date problems are logged and counted in the
/// report.
pub async fn run_scan(
    fetcher: &dyn MailFetcher,
    plan: &ScanPlan,
    reporter: &ProgressReporter,
) -> Result<Report> {
    let spinner = reporter.add_spinner(&format!("Listing messages matching '{}'...", plan.query));
    let ids = fetcher.list_message_ids(&plan.query, plan.max_fetch).await?;
    reporter.finish_spinner(&spinner, &format!("Found {} messages", ids.len()));

    let records = if ids.is_empty() {
        info!("No messages found matching query '{}'", plan.query);
        Vec::new()
    } else {
        let pb = reporter.add_progress_bar(ids.len() as u64, "Fetching message details...");
        let progress_pb = pb.clone();
        let on_progress: ProgressCallback = Arc::new(move || progress_pb.inc(1));

        let records = fetcher.fetch_records(ids, on_progress).await?;
        pb.finish_and_clear();
        records
    };

    let mut sink = TracingWarningSink::new();
    let report = analyze(&records, &plan.options, &mut sink)?;
    if sink.count() > 0 {
        info!("Date parsing skipped for {} messages", sink.count());
    }

    Ok(report)
}

/// Write the Markdown rendering of a report
pub async fn save_markdown(report: &Report, path: &std::path::Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    tokio::fs::write(path, report.to_markdown()).await?;
    info!("Saved Markdown report to {:?}", path);
    Ok(())
}
