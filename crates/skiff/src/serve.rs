//! Subcommand wiring: build the agent stack and run it.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use miette::Result;
use tokio::sync::watch;
use tracing::{info, warn};

use skiff_agent::{
    AgentDeps, AgentLifecycleManager, CompletionClient, DispatchMode, RunStateStore,
};
use skiff_digest::{DigestConfig, DigestPipeline, HttpMailer};
use skiff_identity::{HttpIdentityService, PromptCodeSource, ensure_identity};
use skiff_sync::{FileMetadataStore, HttpSyncService, Psk, WorkspaceSession};

use crate::DaemonArgs;

/// Run the control server, auto-resuming the last started agent.
pub async fn run_serve(args: DaemonArgs, port: u16) -> Result<()> {
    bootstrap_identity(&args).await?;

    let (manager, digest_done_rx) = build_manager(&args);

    // Auto-resume the last agent, if a run-state record survived
    let store = RunStateStore::new(run_state_path(&args));
    match store.load().await {
        Ok(Some(state)) => {
            info!(
                workspace = %state.workspace_name,
                channel = %state.channel_name,
                "resuming last agent"
            );
            if let Err(e) = manager
                .start_or_replace(
                    &state.workspace_name,
                    &state.preshared_key_hex,
                    &state.channel_name,
                    state.mode,
                )
                .await
            {
                warn!(error = %e, "auto-resume failed, waiting for control request");
            }
        }
        Ok(None) => {}
        Err(e) => warn!(error = %e, "failed to load run state"),
    }

    let server = tokio::spawn(skiff_web::run_server(Arc::clone(&manager), port));

    wait_for_shutdown(digest_done_rx).await;

    manager.shutdown().await;
    server.abort();

    Ok(())
}

/// Start one agent from command-line arguments and run until
/// interrupted or, in digest mode, until the digest is delivered.
pub async fn run_start(
    args: DaemonArgs,
    workspace: &str,
    psk_hex: &str,
    channel: &str,
    digest: bool,
) -> Result<()> {
    bootstrap_identity(&args).await?;

    let (manager, digest_done_rx) = build_manager(&args);

    let mode = if digest {
        DispatchMode::Digest
    } else {
        DispatchMode::AiReply
    };

    manager
        .start_or_replace(workspace, psk_hex, channel, mode)
        .await
        .map_err(|e| miette::miette!("failed to start agent: {}", e))?;

    wait_for_shutdown(digest_done_rx).await;

    manager.shutdown().await;

    Ok(())
}

/// List the chat channels of a workspace without subscribing to any.
pub async fn run_channels(args: DaemonArgs, workspace: &str, psk_hex: &str) -> Result<()> {
    bootstrap_identity(&args).await?;

    let psk = Psk::from_hex(psk_hex).map_err(|e| miette::miette!("{}", e))?;

    let service = HttpSyncService::new(&args.sync_url);
    let store = FileMetadataStore::new(metadata_dir(&args));
    let session = WorkspaceSession::setup(
        &service,
        &store,
        workspace,
        psk.as_bytes(),
        args.relax_certs,
    )
    .await
    .map_err(|e| miette::miette!("{}", e))?;

    let channels = session
        .chat_channel()
        .list_channels()
        .await
        .map_err(|e| miette::miette!("{}", e))?;

    for line in format_channel_listing(workspace, &channels) {
        println!("{}", line);
    }

    Ok(())
}

fn format_channel_listing(workspace: &str, channels: &[String]) -> Vec<String> {
    if channels.is_empty() {
        vec![format!("workspace '{}' has no chat channels", workspace)]
    } else {
        channels.to_vec()
    }
}

async fn bootstrap_identity(args: &DaemonArgs) -> Result<()> {
    let identity = HttpIdentityService::new(&args.identity_url);
    ensure_identity(&identity, &args.principal, &PromptCodeSource)
        .await
        .map_err(|e| miette::miette!("identity bootstrap failed: {}", e))
}

/// Wire up the lifecycle manager from daemon arguments.
///
/// Returns the manager and a receiver that fires once a digest run
/// has delivered, at which point the process should wind down.
fn build_manager(args: &DaemonArgs) -> (Arc<AgentLifecycleManager>, watch::Receiver<bool>) {
    let (process_shutdown, digest_done_rx) = watch::channel(false);

    let mut config = DigestConfig::new(&args.template_path)
        .with_settle_delay(Duration::from_secs(args.settle_delay));
    config.from = args.digest_from.clone();
    config.to = parse_recipients(&args.digest_to);
    config.bcc = parse_recipients(&args.digest_bcc);

    let pipeline = DigestPipeline::new(config, Arc::new(HttpMailer::new(&args.mail_url)));

    let manager = AgentLifecycleManager::new(AgentDeps {
        sync: Arc::new(HttpSyncService::new(&args.sync_url)),
        metadata: Arc::new(FileMetadataStore::new(metadata_dir(args))),
        generator: Arc::new(CompletionClient::new(&args.generation_url)),
        pipeline: Arc::new(pipeline),
        relax_certs: args.relax_certs,
        author: args.author.clone(),
        process_shutdown,
        run_state: Some(RunStateStore::new(run_state_path(args))),
    });

    (Arc::new(manager), digest_done_rx)
}

async fn wait_for_shutdown(mut digest_done_rx: watch::Receiver<bool>) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("interrupt received, shutting down");
        }
        changed = digest_done_rx.changed() => {
            if changed.is_ok() && *digest_done_rx.borrow() {
                info!("digest delivered, shutting down");
            }
        }
    }
}

fn metadata_dir(args: &DaemonArgs) -> PathBuf {
    PathBuf::from(&args.state_dir).join("workspaces")
}

fn run_state_path(args: &DaemonArgs) -> PathBuf {
    PathBuf::from(&args.state_dir).join("agent.json")
}

fn parse_recipients(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}
