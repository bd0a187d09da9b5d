// ABOUTME: Startup scan that restores every session found in the credential store.
// ABOUTME: One failing namespace never stops the others; outcomes are collected in a report.

use std::sync::Arc;

use serde::Serialize;
use tracing::{error, info, warn};

use crate::credentials::CredentialStore;
use crate::session::SessionRegistry;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BootstrapFailure {
    pub session_id: String,
    pub error: String,
}

/// What the startup scan did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BootstrapReport {
    pub restored: Vec<String>,
    pub failed: Vec<BootstrapFailure>,
}

/// Create a session for every namespace in the store, one at a time.
///
/// An unreadable store is logged and yields an empty report; it is not fatal.
pub async fn restore_sessions(
    registry: &SessionRegistry,
    store: &Arc<dyn CredentialStore>,
) -> BootstrapReport {
    let mut report = BootstrapReport::default();

    let namespaces = match store.list_namespaces().await {
        Ok(namespaces) => namespaces,
        Err(e) => {
            error!(error = %e, "could not scan the credential store; no sessions restored");
            return report;
        }
    };

    if namespaces.is_empty() {
        info!("no stored sessions to restore");
        return report;
    }

    info!(count = namespaces.len(), "restoring stored sessions");
    for session_id in namespaces {
        match registry.create_session(&session_id).await {
            Ok(_) => {
                info!(session = %session_id, "session restored");
                report.restored.push(session_id);
            }
            Err(e) => {
                warn!(session = %session_id, error = %e, "failed to restore session");
                report.failed.push(BootstrapFailure {
                    session_id,
                    error: e.to_string(),
                });
            }
        }
    }

    info!(
        restored = report.restored.len(),
        failed = report.failed.len(),
        "session restore finished"
    );
    report
}
