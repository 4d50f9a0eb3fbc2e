// ── Branch response representation ──

use serde::Serialize;

use super::branch::{Branch, Redirect};
use super::ids::{BranchId, ReleaseId, SiteId};

/// A branch serialized in the context of its site.
///
/// This is what mutation callers get back. Password material never
/// appears here, only whether a gate is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BranchView {
    pub id: BranchId,
    pub site_id: SiteId,
    pub name: String,
    pub slug: String,
    pub release: Option<ReleaseId>,
    pub has_password: bool,
    pub redirects: Vec<Redirect>,
    /// Public URL the branch is served on.
    pub url: String,
}

impl BranchView {
    pub(crate) fn new(site_id: &SiteId, branch: &Branch, url: String) -> Self {
        Self {
            id: branch.id.clone(),
            site_id: site_id.clone(),
            name: branch.name.clone(),
            slug: branch.slug.clone(),
            release: branch.release.clone(),
            has_password: branch.password.is_some(),
            redirects: branch.redirects.clone(),
            url,
        }
    }
}
