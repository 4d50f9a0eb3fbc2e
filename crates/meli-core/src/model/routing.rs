// ── Compiled routing configuration ──
//
// The proxy-facing projection of a branch. Never persisted and never
// patched in place: it is recomputed from stored state every time.

use serde::{Deserialize, Serialize};

use super::branch::Redirect;
use super::ids::{BranchId, ReleaseId, SiteId};

/// What the proxy serves for a branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "release", rename_all = "snake_case")]
pub enum ReleaseTarget {
    /// Serve the artifacts of this release.
    Release(ReleaseId),
    /// Nothing deployed: the proxy answers with a fixed placeholder
    /// instead of falling through to whatever it served before.
    NoDeployment,
}

impl ReleaseTarget {
    pub fn release(&self) -> Option<&ReleaseId> {
        match self {
            Self::Release(id) => Some(id),
            Self::NoDeployment => None,
        }
    }
}

/// The part of a branch password the proxy needs to enforce the gate.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordGate {
    pub user: String,
    /// bcrypt hash, exactly as stored.
    pub hash: String,
}

impl std::fmt::Debug for PasswordGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordGate")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Compiled routing rules for one site + branch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    pub site_id: SiteId,
    pub site_name: String,
    pub branch_id: BranchId,
    pub branch_slug: String,
    /// Whether the branch is also served on the bare site host.
    pub main_branch: bool,
    pub target: ReleaseTarget,
    pub password: Option<PasswordGate>,
    /// Redirect rules in persisted order; first match wins downstream.
    pub redirects: Vec<Redirect>,
}

impl RoutingConfig {
    pub fn requires_password(&self) -> bool {
        self.password.is_some()
    }
}
