//! Skiff: workspace chat agent daemon
//!
//! Main binary with subcommands:
//! - `serve`: control server with auto-resume of the last agent
//! - `start`: run a single agent from the command line
//! - `channels`: list the chat channels of a workspace

use clap::{Args, Parser, Subcommand};
use miette::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod serve;

#[derive(Parser)]
#[command(name = "skiff")]
#[command(about = "Workspace chat agent daemon", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Connection endpoints and agent wiring shared by every subcommand.
#[derive(Args)]
struct DaemonArgs {
    /// Sync daemon base URL
    #[arg(long, env = "SKIFF_SYNC_URL", default_value = "http://127.0.0.1:7410")]
    sync_url: String,

    /// Identity daemon base URL
    #[arg(long, env = "SKIFF_IDENTITY_URL", default_value = "http://127.0.0.1:7411")]
    identity_url: String,

    /// Principal name used for identity bootstrap
    #[arg(long, env = "SKIFF_PRINCIPAL")]
    principal: String,

    /// Text generation endpoint
    #[arg(long, env = "SKIFF_GENERATION_URL", default_value = "http://127.0.0.1:7412/complete")]
    generation_url: String,

    /// Mail relay endpoint
    #[arg(long, env = "SKIFF_MAIL_URL", default_value = "http://127.0.0.1:7413/send")]
    mail_url: String,

    /// Local state directory (workspace metadata, run state)
    #[arg(long, env = "SKIFF_STATE_DIR", default_value = ".skiff")]
    state_dir: String,

    /// Digest email template file
    #[arg(long, env = "SKIFF_TEMPLATE_PATH", default_value = "digest.html")]
    template_path: String,

    /// Digest sender address
    #[arg(long, env = "SKIFF_DIGEST_FROM", default_value = "")]
    digest_from: String,

    /// Digest recipients (comma-separated)
    #[arg(long, env = "SKIFF_DIGEST_TO", default_value = "")]
    digest_to: String,

    /// Digest bcc recipients (comma-separated)
    #[arg(long, env = "SKIFF_DIGEST_BCC", default_value = "")]
    digest_bcc: String,

    /// Seconds to wait for sync propagation before reading documents
    #[arg(long, default_value = "10")]
    settle_delay: u64,

    /// Relax certificate validation on joined workspaces
    #[arg(long, env = "SKIFF_RELAX_CERTS")]
    relax_certs: bool,

    /// Author name stamped on outbound replies
    #[arg(long, env = "SKIFF_AUTHOR", default_value = "skiff")]
    author: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the control server, auto-resuming the last started agent
    Serve {
        #[command(flatten)]
        daemon: DaemonArgs,

        /// Control server port
        #[arg(long, env = "SKIFF_PORT", default_value = "8080")]
        port: u16,
    },

    /// Start one agent from the command line and run until interrupted
    Start {
        #[command(flatten)]
        daemon: DaemonArgs,

        /// Workspace name
        #[arg(long)]
        workspace: String,

        /// Pre-shared workspace key (64 hex characters)
        #[arg(long, env = "SKIFF_WORKSPACE_PSK")]
        psk: String,

        /// Channel to attach the agent to
        #[arg(long)]
        channel: String,

        /// Run the digest pipeline instead of AI replies
        #[arg(long)]
        digest: bool,
    },

    /// List the chat channels of a workspace
    Channels {
        #[command(flatten)]
        daemon: DaemonArgs,

        /// Workspace name
        #[arg(long)]
        workspace: String,

        /// Pre-shared workspace key (64 hex characters)
        #[arg(long, env = "SKIFF_WORKSPACE_PSK")]
        psk: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "skiff=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { daemon, port } => serve::run_serve(daemon, port).await,

        Commands::Start {
            daemon,
            workspace,
            psk,
            channel,
            digest,
        } => serve::run_start(daemon, &workspace, &psk, &channel, digest).await,

        Commands::Channels {
            daemon,
            workspace,
            psk,
        } => serve::run_channels(daemon, &workspace, &psk).await,
    }
}
