//! TruthLens CLI: claim fact-checking service.
//!
//! Usage:
//!   truthlens serve [--addr 127.0.0.1:3000]
//!   truthlens submit --user <id> --title <t> --statement <s> --category <c> [--source-url <u>]
//!   truthlens list --user <id>
//!   truthlens show --user <id> <report-id>
//!   truthlens ping
//!   truthlens index ensure
//!
//! Store credentials are always read from the environment.

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use truthlens::config::{default_data_dir, DEFAULT_ADDR};
use truthlens::{AppConfig, ProcessEnv, RawClaim, Report, SubmissionError, TruthLensApi};
use url::Url;

#[derive(Parser)]
#[command(name = "truthlens", version, about = "Claim fact-checking service")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Directory holding the document store
    #[arg(long, env = "TRUTHLENS_DATA_DIR", global = true)]
    data_dir: Option<PathBuf>,
    /// Verification service endpoint
    #[arg(long, env = "TRUTHLENS_VERIFIER_URL", global = true)]
    verifier_url: Option<Url>,
    /// Bearer key for the verification service
    #[arg(long, env = "TRUTHLENS_VERIFIER_KEY", global = true, hide_env_values = true)]
    verifier_key: Option<String>,
    /// Give up on verification after this many seconds
    #[arg(long, env = "TRUTHLENS_VERIFIER_TIMEOUT_SECS", global = true)]
    verifier_timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Listen address
        #[arg(long, env = "TRUTHLENS_ADDR", default_value = DEFAULT_ADDR)]
        addr: SocketAddr,
    },
    /// Verify a claim and save the report
    Submit {
        /// Submitting user id
        #[arg(long)]
        user: String,
        #[arg(long)]
        title: String,
        #[arg(long)]
        statement: String,
        /// One of: Politics, Health, Science, Technology, Social Media, Business, Other
        #[arg(long)]
        category: String,
        #[arg(long)]
        source_url: Option<String>,
    },
    /// List a user's reports, newest first
    List {
        #[arg(long)]
        user: String,
    },
    /// Show one of a user's reports
    Show {
        #[arg(long)]
        user: String,
        /// Report id
        id: String,
    },
    /// Check that the document store is reachable
    Ping,
    /// Manage composite indexes
    Index {
        #[command(subcommand)]
        action: IndexAction,
    },
}

#[derive(Subcommand)]
enum IndexAction {
    /// Provision the indexes report listing needs
    Ensure,
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "truthlens=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn app_config(cli: &Cli) -> AppConfig {
    let defaults = AppConfig::default();
    AppConfig {
        addr: match &cli.command {
            Commands::Serve { addr } => *addr,
            _ => defaults.addr,
        },
        data_dir: Some(cli.data_dir.clone().unwrap_or_else(default_data_dir)),
        verifier_url: cli.verifier_url.clone(),
        verifier_key: cli.verifier_key.clone(),
        verifier_timeout: cli.verifier_timeout_secs.map(Duration::from_secs),
    }
}

fn print_report(report: &Report) {
    println!("Report {}", report.id);
    println!("  Claim:    {}", report.claim_title);
    println!("  Category: {}", report.claim_category);
    if !report.claim_source_url.is_empty() {
        println!("  Source:   {}", report.claim_source_url);
    }
    println!("  Score:    {}/100", report.truth_score.value());
    println!("  Verdict:  {}", report.verdict);
    for source in &report.supporting_sources {
        println!("    - {}", source);
    }
    println!("  Created:  {}", report.created_at.to_rfc3339());
}

async fn cmd_serve(api: TruthLensApi, addr: SocketAddr) -> i32 {
    match truthlens::http::serve(api, addr).await {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("Error: server failed: {}", e);
            1
        }
    }
}

async fn cmd_submit(api: &TruthLensApi, user: &str, claim: RawClaim) -> i32 {
    match api.submit(&claim, user).await {
        Ok(report) => {
            print_report(&report);
            0
        }
        Err(SubmissionError::InvalidInput(e)) => {
            eprintln!("Error: the claim is invalid:");
            for violation in e.violations() {
                eprintln!("  {}: {}", violation.field.as_str(), violation.reason);
            }
            2
        }
        Err(e) => {
            eprintln!("Error [{}]: {}", e.kind(), e);
            1
        }
    }
}

async fn cmd_list(api: &TruthLensApi, user: &str) -> i32 {
    let reports = match api.list_reports(user).await {
        Ok(reports) => reports,
        Err(e) => {
            eprintln!("Error [{}]: {}", e.kind(), e);
            if e.kind() == truthlens::ErrorKind::IndexRequired {
                eprintln!("Hint: run `truthlens index ensure` first");
            }
            return 1;
        }
    };
    if reports.is_empty() {
        println!("No reports for '{}'.", user);
        return 0;
    }
    println!("{:<32}  {:>5}  {:<14}  {:<25}  TITLE", "ID", "SCORE", "VERDICT", "CREATED");
    println!("{}", "-".repeat(100));
    for report in reports {
        println!(
            "{:<32}  {:>5}  {:<14}  {:<25}  {}",
            report.id,
            report.truth_score.value(),
            report.verdict,
            report.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            report.claim_title
        );
    }
    0
}

async fn cmd_show(api: &TruthLensApi, user: &str, id: &str) -> i32 {
    match api.get_report(user, id).await {
        Ok(report) => {
            print_report(&report);
            0
        }
        Err(e) => {
            eprintln!("Error [{}]: {}", e.kind(), e);
            1
        }
    }
}

async fn cmd_ping(api: &TruthLensApi) -> i32 {
    match api.ping().await {
        Ok(()) => {
            match api.gateway().credential_source().await {
                Some(source) => println!("Document store reachable (credentials: {})", source),
                None => println!("Document store reachable"),
            }
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

async fn cmd_index_ensure(api: &TruthLensApi) -> i32 {
    match api.ensure_indexes().await {
        Ok(true) => {
            println!("Created report listing index");
            0
        }
        Ok(false) => {
            println!("Indexes already present");
            0
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            1
        }
    }
}

fn main() {
    init_tracing();
    let cli = Cli::parse();

    let config = app_config(&cli);
    let api = match config.build_api(ProcessEnv) {
        Ok(api) => api,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };

    let code = rt.block_on(async {
        match cli.command {
            Commands::Serve { .. } => cmd_serve(api, config.addr).await,
            Commands::Submit {
                user,
                title,
                statement,
                category,
                source_url,
            } => {
                let mut claim = RawClaim::new(title, statement, category);
                claim.source_url = source_url;
                cmd_submit(&api, &user, claim).await
            }
            Commands::List { user } => cmd_list(&api, &user).await,
            Commands::Show { user, id } => cmd_show(&api, &user, &id).await,
            Commands::Ping => cmd_ping(&api).await,
            Commands::Index {
                action: IndexAction::Ensure,
            } => cmd_index_ensure(&api).await,
        }
    });
    std::process::exit(code);
}
