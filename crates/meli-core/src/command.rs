// ── Command API ──
//
// All branch writes flow through a unified `Command` enum executed by
// the orchestrator.

use secrecy::SecretString;

use crate::model::{BranchId, BranchView, Redirect, ReleaseId, SiteId};

/// All possible write operations against a site's branches.
#[derive(Debug, Clone)]
pub enum Command {
    // ── Branch lifecycle ─────────────────────────────────────────────
    CreateBranch {
        site_id: SiteId,
        name: String,
        slug: String,
        release: Option<ReleaseId>,
    },
    DeleteBranch {
        site_id: SiteId,
        branch_id: BranchId,
    },

    // ── Field updates ────────────────────────────────────────────────
    /// Point a branch at a release, or clear it with `None`.
    UpdateBranch {
        site_id: SiteId,
        branch_id: BranchId,
        release: Option<ReleaseId>,
    },
    SetBranchPassword {
        site_id: SiteId,
        branch_id: BranchId,
        user: String,
        password: SecretString,
    },
    RemoveBranchPassword {
        site_id: SiteId,
        branch_id: BranchId,
    },
    /// Replace the redirect list verbatim; order is kept.
    SetBranchRedirects {
        site_id: SiteId,
        branch_id: BranchId,
        redirects: Vec<Redirect>,
    },

    // ── Reconciliation ───────────────────────────────────────────────
    /// Re-derive and re-push every branch's routes from stored state, and
    /// remove proxy routes of branches that are no longer stored.
    ResyncSite { site_id: SiteId },
}

impl Command {
    pub fn site_id(&self) -> &SiteId {
        match self {
            Self::CreateBranch { site_id, .. }
            | Self::DeleteBranch { site_id, .. }
            | Self::UpdateBranch { site_id, .. }
            | Self::SetBranchPassword { site_id, .. }
            | Self::RemoveBranchPassword { site_id, .. }
            | Self::SetBranchRedirects { site_id, .. }
            | Self::ResyncSite { site_id } => site_id,
        }
    }

    /// Short operation name, for logs.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CreateBranch { .. } => "create_branch",
            Self::DeleteBranch { .. } => "delete_branch",
            Self::UpdateBranch { .. } => "update_branch",
            Self::SetBranchPassword { .. } => "set_branch_password",
            Self::RemoveBranchPassword { .. } => "remove_branch_password",
            Self::SetBranchRedirects { .. } => "set_branch_redirects",
            Self::ResyncSite { .. } => "resync_site",
        }
    }
}

/// Result of a successfully executed command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// The branch as committed.
    Branch(BranchView),
    /// The branch as it was when removed.
    Deleted(BranchView),
    /// Number of branches whose routes were scheduled for re-push.
    Resynced { branches: usize },
}

impl CommandResult {
    pub fn branch(&self) -> Option<&BranchView> {
        match self {
            Self::Branch(view) | Self::Deleted(view) => Some(view),
            Self::Resynced { .. } => None,
        }
    }
}
