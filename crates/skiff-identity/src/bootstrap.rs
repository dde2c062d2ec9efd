//! Top-level bootstrap entry point.

use tracing::info;

use crate::{CodeSource, IdentityError, IdentityService};

/// Ensure a usable signing credential exists for `principal`.
///
/// Idempotent: if a credential is already present this is a no-op.
/// Terminal failure aborts startup; nothing downstream is meaningful
/// without an identity.
#[tracing::instrument(skip(service, codes))]
pub async fn ensure_identity(
    service: &dyn IdentityService,
    principal: &str,
    codes: &dyn CodeSource,
) -> Result<(), IdentityError> {
    service.connect().await?;

    if service.has_credential().await? {
        info!(principal = %principal, "credential already present");
        return Ok(());
    }

    service.issue_challenge(principal, codes).await?;

    let name = service.identity_name().await?;
    info!(identity = %name, "identity bootstrap complete");
    Ok(())
}
