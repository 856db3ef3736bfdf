//! Per-session backend choice.

use std::sync::Arc;

use tracing::{info, warn};

use super::{AutomationBackend, AutomationService, Backend, Capabilities, DirectBackend};
use crate::common::{Error, Result};
use crate::config::{EngineConfig, SelectionPolicy};

/// Binds a [`Backend`] for a new session.
///
/// The host is contacted once per [`select`](Self::select) call. Whatever is
/// bound stays bound for the session: a host that later disconnects is not
/// replaced mid-session.
///
/// | policy              | host reachable            | host unreachable |
/// |---------------------|---------------------------|------------------|
/// | `auto`              | host if any host-only op  | direct           |
/// | `prefer-automation` | host                      | direct           |
/// | `direct-only`       | direct (never contacted) | direct           |
/// | `automation-only`   | host                      | connection error |
///
/// Selection never fails because an optional operation is missing; calling
/// that operation later reports [`Error::Capability`].
pub struct BackendSelector {
    config: EngineConfig,
    service: Option<Arc<dyn AutomationService>>,
}

impl BackendSelector {
    /// A selector with no host binding; every session is direct.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            service: None,
        }
    }

    pub fn with_service(mut self, service: Arc<dyn AutomationService>) -> Self {
        self.service = Some(service);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn select(&self, required: Capabilities) -> Result<Backend> {
        let policy = self.config.selection.policy;
        let wants_host = match policy {
            SelectionPolicy::DirectOnly => false,
            SelectionPolicy::Auto => required.intersects(Capabilities::HOST_ONLY),
            SelectionPolicy::PreferAutomation | SelectionPolicy::AutomationOnly => true,
        };

        if wants_host {
            match self.reach_host() {
                Ok(backend) => {
                    info!(?policy, session = %backend.session(), "bound automation backend");
                    return Ok(Backend::Automation(backend));
                },
                Err(e) if policy == SelectionPolicy::AutomationOnly => {
                    warn!(?policy, error = %e, "automation host required but unreachable");
                    return Err(e);
                },
                Err(e) => {
                    warn!(?policy, error = %e, "automation host unreachable, falling back to direct");
                },
            }
        }

        let missing = required.difference(DirectBackend::supported());
        if !missing.is_empty() {
            info!(
                ?policy,
                missing = ?missing.operations().collect::<Vec<_>>(),
                "bound direct backend without some required operations"
            );
        } else {
            info!(?policy, "bound direct backend");
        }
        Ok(Backend::Direct(DirectBackend::new(self.config.clone())))
    }

    fn reach_host(&self) -> Result<AutomationBackend> {
        let service = self
            .service
            .as_ref()
            .ok_or_else(|| Error::Connection("no automation service configured".to_string()))?;
        if !service.is_available() {
            return Err(Error::Connection("automation host is not available".to_string()));
        }
        AutomationBackend::connect(
            Arc::clone(service),
            &self.config.automation,
            &self.config.limits,
        )
    }
}
