//! `inbox-sanitizer` - clean up a Gmail inbox with YAML rules.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use inbox_sanitizer_core::auth::default_token_path;
use inbox_sanitizer_core::{
    AuthMode, Authorizer, BatchRunner, ClientSecrets, GmailGateway, RuleConfig, ScheduleConfig,
    Scheduler, Shutdown, TokenStore, TriageEngine,
};

#[derive(Parser, Debug)]
#[command(
    name = "inbox-sanitizer",
    version,
    about = "Clean up your Gmail inbox automatically",
    after_help = "Examples:
  inbox-sanitizer auth                  # Connect to Gmail
  inbox-sanitizer test-auth             # Test connection and show account info
  inbox-sanitizer check                 # See what would be archived
  inbox-sanitizer clean --max 200       # Archive up to 200 messages
  inbox-sanitizer daemon --interval 30  # Run every 30 minutes"
)]
struct Cli {
    /// Rule file.
    #[arg(long, value_name = "PATH", default_value = "config/filters.yaml", global = true)]
    config: PathBuf,

    /// OAuth client secrets downloaded from the Google Cloud console.
    #[arg(long, value_name = "PATH", default_value = "credentials.json", global = true)]
    credentials: PathBuf,

    /// Keep the token in a JSON file instead of the system keyring.
    /// Without a value, uses the per-user configuration directory.
    #[arg(long, value_name = "PATH", num_args = 0..=1, global = true)]
    token_file: Option<Option<PathBuf>>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Authorize access to Gmail.
    Auth,
    /// Check the stored authorization and show account info.
    TestAuth,
    /// Show what would be removed, without changing anything.
    Check(BatchArgs),
    /// Archive or delete matching messages.
    Clean(BatchArgs),
    /// Clean periodically until interrupted.
    Daemon(DaemonArgs),
    /// Forget the stored authorization.
    Logout,
}

#[derive(Args, Debug)]
struct BatchArgs {
    /// Maximum messages to process.
    #[arg(long, default_value_t = 100)]
    max: u32,

    /// Gmail search selecting candidates.
    #[arg(long, default_value = "in:inbox")]
    query: String,
}

#[derive(Args, Debug)]
struct DaemonArgs {
    /// Minutes between runs.
    #[arg(long, value_name = "MINUTES", default_value_t = 60)]
    interval: u64,

    #[command(flatten)]
    batch: BatchArgs,

    /// Decide without modifying messages.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "inbox_sanitizer=info,inbox_sanitizer_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Command::Auth => {
            authorize(&cli).await?;
            println!("Authentication successful!");
            println!("You can now use other commands.");
            Ok(ExitCode::SUCCESS)
        }
        Command::TestAuth => test_auth(&cli).await,
        Command::Check(args) => run_batch(&cli, args, true).await,
        Command::Clean(args) => run_batch(&cli, args, false).await,
        Command::Daemon(args) => daemon(&cli, args).await,
        Command::Logout => {
            let store = token_store(&cli)?;
            if store.delete()? {
                println!("Removed stored credentials from {}", store.describe());
            } else {
                println!("No stored credentials in {}", store.describe());
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn token_store(cli: &Cli) -> anyhow::Result<TokenStore> {
    Ok(match &cli.token_file {
        None => TokenStore::Keyring,
        Some(Some(path)) => TokenStore::File(path.clone()),
        Some(None) => TokenStore::File(default_token_path()?),
    })
}

async fn authorize(cli: &Cli) -> anyhow::Result<Authorizer> {
    let secrets = ClientSecrets::load(&cli.credentials)?;
    let store = token_store(cli)?;
    let authorizer = Authorizer::obtain(&secrets, store, AuthMode::Interactive)
        .await
        .context("Authentication failed")?;
    Ok(authorizer)
}

async fn gateway(cli: &Cli) -> anyhow::Result<GmailGateway> {
    let authorizer = authorize(cli).await?;
    Ok(GmailGateway::new(Arc::new(authorizer)))
}

fn runner(cli: &Cli, gmail: GmailGateway, query: &str) -> BatchRunner<GmailGateway> {
    let rules = RuleConfig::load(&cli.config);
    BatchRunner::new(gmail, TriageEngine::new(rules)).with_scope(query)
}

async fn test_auth(cli: &Cli) -> anyhow::Result<ExitCode> {
    println!("Testing authentication...");
    let gmail = match gateway(cli).await {
        Ok(gmail) => gmail,
        Err(e) => {
            println!("✗ Authentication failed: {e:#}");
            return Ok(ExitCode::FAILURE);
        }
    };

    match gmail.profile().await {
        Ok(profile) => {
            info!("Connection test successful: {}", profile.email_address);
            println!("✓ Successfully connected to Gmail");
            println!("  Email: {}", profile.email_address);
            println!("  Total messages: {}", profile.messages_total);
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            println!("✗ Connection test failed");
            println!("  Error: {e}");
            Ok(ExitCode::FAILURE)
        }
    }
}

async fn run_batch(cli: &Cli, args: &BatchArgs, dry_run: bool) -> anyhow::Result<ExitCode> {
    let gmail = gateway(cli).await?;
    let mut runner = runner(cli, gmail, &args.query);
    let action = runner.engine().config().action;

    if dry_run {
        println!("DRY RUN - no messages will be modified");
    }

    let result = match runner.run_once(args.max, dry_run).await {
        Ok(result) => result,
        Err(e) if e.is_credential() => {
            error!("{e}");
            return Ok(ExitCode::FAILURE);
        }
        Err(e) => return Err(e.into()),
    };

    let verb = action.past_tense();
    if dry_run {
        println!(
            "\nSummary: {} of {} would be {}",
            result.removed,
            result.processed,
            verb.to_lowercase()
        );
    } else {
        println!(
            "\nSummary: {verb} {} of {} messages",
            result.removed, result.processed
        );
    }
    if result.failed > 0 || result.skipped > 0 {
        println!(
            "  ({} could not be modified, {} could not be read)",
            result.failed, result.skipped
        );
    }
    Ok(ExitCode::SUCCESS)
}

async fn daemon(cli: &Cli, args: &DaemonArgs) -> anyhow::Result<ExitCode> {
    let gmail = gateway(cli).await?;
    let runner = runner(cli, gmail, &args.batch.query);
    let config = ScheduleConfig::new(Duration::from_secs(args.interval.saturating_mul(60)), args.batch.max)
        .with_dry_run(args.dry_run);
    let mut scheduler = Scheduler::new(runner, config);

    let shutdown = Shutdown::new();
    let listener = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupt received, finishing current run");
            listener.trigger();
        }
    });

    println!("Press Ctrl+C to stop");
    let runs = scheduler.run_forever(&shutdown).await;
    println!("\nStopped after {runs} runs");
    Ok(ExitCode::SUCCESS)
}
