// ── Site domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::branch::Branch;
use super::ids::{BranchId, ReleaseId, SiteId};

/// Aggregate root owning an ordered, name-unique set of branches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: SiteId,
    /// DNS-safe site name, used as the site's host label.
    pub name: String,
    /// Branch served on the bare site host.
    #[serde(default)]
    pub main_branch: Option<BranchId>,
    /// Branches in creation order.
    #[serde(default)]
    pub branches: Vec<Branch>,
    /// Release catalog. Branches reference these by id.
    #[serde(default)]
    pub releases: Vec<Release>,
}

impl Site {
    pub fn new(id: impl Into<SiteId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            main_branch: None,
            branches: Vec::new(),
            releases: Vec::new(),
        }
    }

    pub fn branch(&self, id: &BranchId) -> Option<&Branch> {
        self.branches.iter().find(|b| &b.id == id)
    }

    pub(crate) fn branch_mut(&mut self, id: &BranchId) -> Option<&mut Branch> {
        self.branches.iter_mut().find(|b| &b.id == id)
    }

    pub fn branch_by_slug(&self, slug: &str) -> Option<&Branch> {
        self.branches.iter().find(|b| b.slug == slug)
    }

    pub fn has_release(&self, id: &ReleaseId) -> bool {
        self.releases.iter().any(|r| &r.id == id)
    }

    pub fn is_main_branch(&self, id: &BranchId) -> bool {
        self.main_branch.as_ref() == Some(id)
    }
}

/// A deployed build. Its lifecycle is owned by the upload pipeline;
/// branches only point at it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: ReleaseId,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

impl Release {
    pub fn new(id: impl Into<ReleaseId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            created_at: Utc::now(),
        }
    }
}
