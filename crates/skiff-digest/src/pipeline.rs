//! The digest pipeline itself.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use skiff_sync::WorkspaceSession;

use crate::{DigestError, MailTransport, render_markdown, section_window, splice_template};

/// Well-known agenda document path within a project.
pub const AGENDA_PATH: &str = "Agenda.md";

/// Default settling delay before reading document content.
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(10);

/// Configuration for a digest run.
#[derive(Debug, Clone)]
pub struct DigestConfig {
    /// Path of the agenda document within each project.
    pub agenda_path: String,
    /// Local mail template file with two `<hr>` delimiters.
    pub template_path: PathBuf,
    /// Wait before reading, to let sync propagation converge.
    ///
    /// A heuristic, not a correctness guarantee; the sync service has
    /// no convergence signal to wait on.
    pub settle_delay: Duration,
    pub from: String,
    pub to: Vec<String>,
    pub bcc: Vec<String>,
    pub subject: String,
}

impl DigestConfig {
    pub fn new(template_path: impl Into<PathBuf>) -> Self {
        Self {
            agenda_path: AGENDA_PATH.to_string(),
            template_path: template_path.into(),
            settle_delay: DEFAULT_SETTLE_DELAY,
            from: String::new(),
            to: Vec::new(),
            bcc: Vec::new(),
            subject: "Agenda digest".to_string(),
        }
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }
}

/// Extract-render-splice-deliver pipeline for the workspace agenda.
pub struct DigestPipeline {
    config: DigestConfig,
    mailer: Arc<dyn MailTransport>,
}

impl DigestPipeline {
    pub fn new(config: DigestConfig, mailer: Arc<dyn MailTransport>) -> Self {
        Self { config, mailer }
    }

    /// Run the pipeline once against a workspace session.
    ///
    /// A workspace without an agenda document completes as a no-op.
    /// Delivery failure is logged and swallowed; the triggering
    /// message can simply be re-sent.
    #[tracing::instrument(skip(self, session), fields(workspace = %session.descriptor().name))]
    pub async fn run(&self, session: &WorkspaceSession) -> Result<(), DigestError> {
        sleep(self.config.settle_delay).await;

        let Some(content) = self.find_agenda(session).await? else {
            info!(path = %self.config.agenda_path, "no agenda document found, nothing to send");
            return Ok(());
        };

        let window = section_window(&content);
        let fragment = render_markdown(&window);

        let template = tokio::fs::read_to_string(&self.config.template_path).await?;
        let body = splice_template(&template, &fragment)?;

        match self
            .mailer
            .send(
                &self.config.from,
                &self.config.to,
                &self.config.bcc,
                &self.config.subject,
                &body,
            )
            .await
        {
            Ok(delivery) => {
                info!(
                    recipients = self.config.to.len(),
                    message_id = ?delivery.message_id,
                    "digest delivered"
                );
            }
            Err(e) => {
                // No retry policy here: a human re-sends the trigger
                warn!(error = %e, "digest delivery failed");
            }
        }

        Ok(())
    }

    /// Scan every project for the agenda document.
    async fn find_agenda(&self, session: &WorkspaceSession) -> Result<Option<String>, DigestError> {
        let tree = session.document_tree();
        for project in tree.list_projects().await? {
            let files = tree.list_files(&project).await?;
            if files.iter().any(|f| f == &self.config.agenda_path) {
                let content = tree.read_file(&project, &self.config.agenda_path).await?;
                info!(project = %project, "found agenda document");
                return Ok(Some(content));
            }
        }
        Ok(None)
    }
}
