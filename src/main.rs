use anyhow::Result;
use clap::Parser;
use indicatif::MultiProgress;
use std::io::Write;
use std::process;
use std::sync::Arc;
use tidy_inbox::auth::{self, READONLY_SCOPE};
use tidy_inbox::cli::{self, Cli, Commands, ProgressReporter};
use tidy_inbox::client::GmailFetcher;
use tidy_inbox::config::Config;
use tidy_inbox::error::TidyError;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Buffers one log event and prints it through MultiProgress on flush,
/// so log lines land above any active progress bars
struct ProgressAwareWriter {
    multi: MultiProgress,
    buffer: Vec<u8>,
}

impl Write for ProgressAwareWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let line = String::from_utf8_lossy(&self.buffer);
        let line = line.trim_end_matches('\n');
        if !line.is_empty() {
            let _ = self.multi.println(line);
        }
        self.buffer.clear();
        Ok(())
    }
}

impl Drop for ProgressAwareWriter {
    fn drop(&mut self) {
        let _ = self.flush();
    }
}

#[derive(Clone)]
struct ProgressAwareMakeWriter {
    multi: Arc<MultiProgress>,
}

impl<'a> MakeWriter<'a> for ProgressAwareMakeWriter {
    type Writer = ProgressAwareWriter;

    fn make_writer(&'a self) -> Self::Writer {
        ProgressAwareWriter {
            multi: (*self.multi).clone(),
            buffer: Vec::new(),
        }
    }
}

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("Error: {}", e);
        eprintln!("\nFor help, run: tidy-inbox --help");
        process::exit(1);
    }
}

async fn run() -> Result<()> {
    // aws-lc-rs everywhere except Windows, where ring avoids the NASM/CMake toolchain
    #[cfg(not(windows))]
    rustls::crypto::aws_lc_rs::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    #[cfg(windows)]
    rustls::crypto::ring::default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("Failed to install default crypto provider"))?;

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("tidy_inbox=debug,info"))
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("tidy_inbox=info,warn,error"))
    };

    let multi_progress = Arc::new(MultiProgress::new());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(ProgressAwareMakeWriter {
            multi: Arc::clone(&multi_progress),
        })
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();

    match cli.command {
        Commands::Auth { force } => {
            tracing::info!("Authenticating with Gmail API...");

            if force && cli.token_cache.exists() {
                tokio::fs::remove_file(&cli.token_cache).await?;
                tracing::info!("Removed existing token cache");
            }

            let hub = auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache).await?;

            println!("Successfully authenticated with Gmail API");
            println!("Token cached at: {:?}", cli.token_cache);

            // Same scope as the cached token, otherwise a second flow starts
            let (_, profile) = hub
                .users()
                .get_profile("me")
                .add_scope(READONLY_SCOPE)
                .doit()
                .await
                .map_err(TidyError::from)?;
            println!(
                "Connected to account: {}",
                profile.email_address.unwrap_or_default()
            );

            Ok(())
        }

        Commands::Scan(args) => {
            let config = Config::load(&cli.config).await?;
            let plan = args.resolve(&config)?;

            let hub = auth::initialize_gmail_hub(&cli.credentials, &cli.token_cache).await?;
            let fetcher = GmailFetcher::new(hub, config.search.max_concurrent_requests);
            let reporter = ProgressReporter::with_multi_progress((*multi_progress).clone());

            let report = cli::run_scan(&fetcher, &plan, &reporter).await?;

            if let Some(path) = &args.markdown {
                cli::save_markdown(&report, path).await?;
            }

            if args.json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.to_text());
            }

            Ok(())
        }

        Commands::InitConfig { output, force } => {
            if output.exists() && !force {
                return Err(TidyError::ConfigError(format!(
                    "Configuration file already exists at {:?}. Use --force to overwrite.",
                    output
                ))
                .into());
            }

            Config::create_example(&output).await?;

            println!("Created example configuration file at: {:?}", output);
            println!("\nKey settings:");
            println!("  - search.query: Gmail search selecting the messages to analyze");
            println!("  - search.max_fetch: Upper bound on messages fetched per run");
            println!("  - report.sort: 'count' or 'date'");
            println!("  - report.num_results: How many senders to list");

            Ok(())
        }
    }
}
