// ── Branch store ──
//
// The system of record for site and branch documents. Every write is a
// single atomic, field-scoped operation keyed by (site, branch); callers
// never read-modify-write a site across an await point.

mod field;
mod memory;
mod stream;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::CoreError;
use crate::model::{Branch, BranchId, Site, SiteId};

pub use field::BranchField;
pub use memory::MemoryStore;
pub use stream::SiteStream;

/// Persistence boundary for sites and their branches.
#[async_trait]
pub trait BranchStore: Send + Sync {
    /// Load the current committed state of a site.
    async fn find_site(&self, site_id: &SiteId) -> Result<Option<Arc<Site>>, CoreError>;

    /// Atomically replace one field of one branch.
    ///
    /// Fails with [`CoreError::SiteNotFound`] / [`CoreError::BranchNotFound`]
    /// when no matching (site, branch) pair exists.
    async fn update_branch_field(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
        field: BranchField,
    ) -> Result<(), CoreError>;

    /// Append a branch to a site. Duplicate slugs or names are rejected
    /// with [`CoreError::Validation`].
    async fn insert_branch(&self, site_id: &SiteId, branch: Branch) -> Result<(), CoreError>;

    /// Remove a branch, returning it as it was at removal time.
    async fn remove_branch(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
    ) -> Result<Branch, CoreError>;

    /// Ids of every stored site.
    async fn site_ids(&self) -> Result<Vec<SiteId>, CoreError>;
}
