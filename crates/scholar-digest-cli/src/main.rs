use std::io::Write;
use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use scholar_digest_core::resolve::pubmed::PubMed;
use scholar_digest_core::{Config, RunOutcome, config_file, pipeline};
use scholar_digest_gmail::{ClientSecrets, Credential, GmailClient, GmailError};

mod output;

use output::ColorMode;

/// Summarize Google Scholar alert emails into a Markdown literature digest
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Log at debug level (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch recent alert emails, look up each paper, and write the digest
    Run {
        /// Path to the OAuth client secrets JSON
        #[arg(long)]
        credentials: Option<PathBuf>,

        /// Path of the stored OAuth token
        #[arg(long)]
        token: Option<PathBuf>,

        /// Gmail search query selecting alert emails
        #[arg(long)]
        query: Option<String>,

        /// Maximum number of alert emails to read
        #[arg(long)]
        max_results: Option<u32>,

        /// Directory the Markdown digest is written into
        #[arg(short, long)]
        output_dir: Option<PathBuf>,

        /// Disable colored output
        #[arg(long)]
        no_color: bool,

        /// Dry run: list extracted links without querying PubMed or writing a file
        #[arg(long)]
        dry_run: bool,
    },

    /// Authorize Gmail access and store the token
    Auth {
        /// Path to the OAuth client secrets JSON
        #[arg(long)]
        credentials: Option<PathBuf>,

        /// Path of the stored OAuth token
        #[arg(long)]
        token: Option<PathBuf>,
    },
}

/// Per-invocation overrides collected from flags.
#[derive(Debug, Default)]
struct Overrides {
    credentials: Option<PathBuf>,
    token: Option<PathBuf>,
    query: Option<String>,
    max_results: Option<u32>,
    output_dir: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let command = cli.command.unwrap_or(Command::Run {
        credentials: None,
        token: None,
        query: None,
        max_results: None,
        output_dir: None,
        no_color: false,
        dry_run: false,
    });

    match command {
        Command::Run {
            credentials,
            token,
            query,
            max_results,
            output_dir,
            no_color,
            dry_run,
        } => {
            let config = resolve_config(Overrides {
                credentials,
                token,
                query,
                max_results,
                output_dir,
            });
            run(config, ColorMode(!no_color), dry_run).await
        }
        Command::Auth { credentials, token } => {
            let config = resolve_config(Overrides {
                credentials,
                token,
                ..Overrides::default()
            });
            auth(config).await
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn resolve_config(flags: Overrides) -> Config {
    let mut config = Config::default();
    config.apply_file(&config_file::load_config());
    apply_overrides(&mut config, flags, |name| std::env::var(name).ok());
    tracing::debug!(
        query = %config.query,
        max_results = config.max_results,
        output_dir = %config.output_dir.display(),
        "resolved configuration"
    );
    config
}

// Resolve configuration: CLI flags > env vars > config file > defaults
fn apply_overrides(
    config: &mut Config,
    flags: Overrides,
    env: impl Fn(&str) -> Option<String>,
) {
    let env_value = |name: &str| env(name).filter(|v| !v.is_empty());
    let env_path = |name: &str| env_value(name).map(PathBuf::from);

    if let Some(path) = flags
        .credentials
        .or_else(|| env_path("GMAIL_CREDENTIALS_PATH"))
    {
        config.credentials_path = Some(path);
    }
    if let Some(path) = flags.token.or_else(|| env_path("GMAIL_TOKEN_PATH")) {
        config.token_path = path;
    }
    if let Some(key) = env_value("NCBI_API_KEY") {
        config.ncbi_api_key = Some(key);
    }
    if let Some(dir) = flags
        .output_dir
        .or_else(|| env_path("SCHOLAR_DIGEST_OUTPUT_DIR"))
    {
        config.output_dir = dir;
    }
    if let Some(query) = flags.query {
        config.query = query;
    }
    if let Some(n) = flags.max_results {
        config.max_results = n;
    }
}

fn http_client() -> anyhow::Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("scholar-digest/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

async fn authorize(client: &reqwest::Client, config: &Config) -> anyhow::Result<Credential> {
    let Some(secrets_path) = config.credentials_path.as_ref() else {
        anyhow::bail!(GmailError::MissingClientSecrets);
    };
    let secrets = ClientSecrets::load(secrets_path)
        .with_context(|| format!("loading client secrets from {}", secrets_path.display()))?;
    let credential = Credential::acquire(client, secrets, &config.token_path, |url: &str| {
        eprintln!("Open this URL in your browser to authorize Gmail access:\n\n  {url}\n");
    })
    .await
    .context("Gmail authorization failed")?;
    Ok(credential)
}

async fn auth(config: Config) -> anyhow::Result<()> {
    let client = http_client()?;
    let credential = authorize(&client, &config).await?;
    println!(
        "Token stored at {} (expires {})",
        config.token_path.display(),
        credential.token().expires_at.format("%Y-%m-%d %H:%M UTC")
    );
    Ok(())
}

async fn run(config: Config, color: ColorMode, dry_run: bool) -> anyhow::Result<()> {
    let client = http_client()?;
    let credential = authorize(&client, &config).await?;
    let gmail = GmailClient::new(client.clone(), &credential);

    if dry_run {
        let alerts = pipeline::collect_alerts(&gmail, &config).await?;
        if alerts.is_empty() {
            println!("No messages found.");
            return Ok(());
        }
        let mut stdout = std::io::stdout().lock();
        output::print_dry_run(&mut stdout, &alerts, color)?;
        return Ok(());
    }

    let pubmed = PubMed::from_config(&config);
    let progress = move |event: scholar_digest_core::ProgressEvent| {
        let mut stdout = std::io::stdout().lock();
        let _ = output::print_progress(&mut stdout, &event, color);
        let _ = stdout.flush();
    };

    match pipeline::run(&gmail, &pubmed, &client, &config, progress).await? {
        RunOutcome::NoMessages => {
            println!("No messages found.");
        }
        RunOutcome::Completed(digest) => {
            let today = chrono::Local::now().date_naive();
            let path = scholar_digest_reporting::write_digest(&config.output_dir, &digest, today)
                .context("writing the Markdown digest")?;
            let unresolved = output::count_unresolved(digest.records());
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout)?;
            output::print_created(&mut stdout, &path, digest.len(), unresolved, color)?;
        }
    }
    Ok(())
}
