//! fantail CLI
//!
//! Distributed tail: follows files on a set of remote hosts over SSH
//! and merges the line streams onto local stdout, one `host[path]:
//! line` record per line. The same binary provides the hidden
//! `remote-tail` mode that runs on the target side of the connection.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio_stream::StreamExt;
use tokio_util::codec::FramedRead;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use ft_core::config::{self, ConnectOptions};
use ft_core::Hostname;
use ft_engine::{Session, SshRouter};
use ft_protocol::{Message, MessageCodec, SeekWhence, TailRequest};

#[derive(Parser)]
#[command(name = "fantail")]
#[command(author, version, about = "Distributed tail over SSH")]
#[command(propagate_version = true)]
struct Cli {
    /// Hostname to tail on, can be specified multiple times
    #[arg(short = 'H', long = "host")]
    host: Vec<String>,

    /// Read a newline-delimited host list from stdin instead
    #[arg(long, conflicts_with = "host")]
    hosts_stdin: bool,

    /// Path to tail, can be specified multiple times
    #[arg(short, long = "path")]
    path: Vec<PathBuf>,

    /// Byte offset to seek in the file before reading
    #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
    seek_offset: i64,

    /// Origin the seek offset is relative to
    #[arg(long, value_enum, default_value_t = SeekWhenceArg::End)]
    seek_whence: SeekWhenceArg,

    /// User to sudo to on the remote side for reading
    #[arg(long)]
    sudo_as: Option<String>,

    /// Stop at end-of-file instead of polling for new data
    #[arg(long)]
    no_follow: bool,

    /// SSH username (defaults to the local user)
    #[arg(long)]
    ssh_user: Option<String>,

    /// SSH port
    #[arg(long)]
    ssh_port: Option<u16>,

    /// Path to the private key for publickey auth
    #[arg(short, long)]
    identity: Option<PathBuf>,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Turn debug logging on
    #[arg(long)]
    debug: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the remote tail producer over stdio (executed on targets
    /// by the controller, not meant for interactive use)
    #[command(hide = true)]
    RemoteTail,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SeekWhenceArg {
    /// Read from the beginning of the file
    Start,
    /// Read only data appended after the tail starts
    End,
}

impl From<SeekWhenceArg> for SeekWhence {
    fn from(arg: SeekWhenceArg) -> Self {
        match arg {
            SeekWhenceArg::Start => Self::Start,
            SeekWhenceArg::End => Self::End,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.into()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    match cli.command {
        Some(Commands::RemoteTail) => run_remote_tail().await,
        None => run_tail(cli).await,
    }
}

/// Controller mode: connect, dispatch, and stream until exhaustion or
/// Ctrl-C. Per-host connect failures are logged and skipped; only
/// unrecoverable startup failures produce a non-zero exit.
async fn run_tail(cli: Cli) -> Result<()> {
    if cli.path.is_empty() {
        bail!("at least one --path is required");
    }

    let hosts = if cli.hosts_stdin {
        hosts_from_stdin()?
    } else {
        cli.host.iter().map(|h| Hostname::from(h.as_str())).collect()
    };
    tracing::debug!(?hosts, "Resolved host list");

    let options = connect_options(&cli)?;

    let mut request = TailRequest::new(cli.path.clone());
    request.seek_offset = cli.seek_offset;
    request.seek_whence = cli.seek_whence.into();
    request.follow = !cli.no_follow;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let router = SshRouter::new();
    let mut session = Session::new();
    let mut stdout = tokio::io::stdout();

    let summary = session
        .run(
            &hosts,
            request,
            cli.sudo_as.as_deref(),
            &router,
            &options,
            cancel,
            &mut stdout,
        )
        .await?;

    tracing::info!(
        connected = summary.hosts_connected,
        failed = summary.hosts_failed,
        lines = summary.lines_emitted,
        "Session complete"
    );

    Ok(())
}

/// Remote mode: one request frame in on stdin, line record frames out
/// on stdout until the tail finishes or the connection is severed
async fn run_remote_tail() -> Result<()> {
    let mut framed = FramedRead::new(tokio::io::stdin(), MessageCodec::new());

    let request = match framed.next().await {
        Some(Ok(Message::Request(request))) => request,
        Some(Ok(other)) => bail!("unexpected frame on stdin: {:?}", other.message_type()),
        Some(Err(e)) => return Err(e).context("failed to decode request frame"),
        None => bail!("no request frame on stdin"),
    };

    if request.paths.is_empty() {
        bail!("request names no paths");
    }

    ft_remote::stream_paths(&request, tokio::io::stdout()).await?;
    Ok(())
}

/// Connection options: config file (explicit or default location)
/// with CLI flag overrides on top
fn connect_options(cli: &Cli) -> Result<ConnectOptions> {
    let mut options = match &cli.config {
        Some(path) => config::load_options(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => {
            let path = config::default_config_path();
            if path.exists() {
                config::load_options(&path)
                    .with_context(|| format!("failed to load config {}", path.display()))?
            } else {
                ConnectOptions::default()
            }
        }
    };

    if let Some(user) = &cli.ssh_user {
        options.username = Some(user.clone());
    }
    if let Some(port) = cli.ssh_port {
        options.port = port;
    }
    if let Some(identity) = &cli.identity {
        options.private_key_path = Some(identity.clone());
    }

    Ok(options)
}

/// Read a newline-delimited host list from stdin, skipping blank lines
fn hosts_from_stdin() -> Result<Vec<Hostname>> {
    use std::io::BufRead;

    let stdin = std::io::stdin();
    let mut hosts = Vec::new();
    for line in stdin.lock().lines() {
        let line = line.context("failed to read host list from stdin")?;
        let trimmed = line.trim();
        if !trimmed.is_empty() {
            hosts.push(Hostname::from(trimmed));
        }
    }
    Ok(hosts)
}
