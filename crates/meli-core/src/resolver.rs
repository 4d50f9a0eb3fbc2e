// ── Release resolver ──
//
// Site-scoped release existence. Unknown ids resolve to `false`; the
// orchestrator turns that into a validation error.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use crate::model::{ReleaseId, SiteId};
use crate::store::BranchStore;

/// Read-only existence check for release references.
#[async_trait]
pub trait ReleaseResolver: Send + Sync {
    /// Whether `release_id` names a release of `site_id`. Never fails.
    async fn exists(&self, site_id: &SiteId, release_id: &ReleaseId) -> bool;
}

/// Resolves releases against the site's own release catalog.
///
/// A release is known only if the site lists it in `releases`; another
/// branch pointing at the same id does not make it valid.
pub struct CatalogResolver {
    store: Arc<dyn BranchStore>,
}

impl CatalogResolver {
    pub fn new(store: Arc<dyn BranchStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ReleaseResolver for CatalogResolver {
    async fn exists(&self, site_id: &SiteId, release_id: &ReleaseId) -> bool {
        match self.store.find_site(site_id).await {
            Ok(Some(site)) => site.has_release(release_id),
            Ok(None) => false,
            Err(e) => {
                warn!(site = %site_id, release = %release_id, error = %e, "release lookup failed");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Branch, BranchId, Release, Site};
    use crate::store::MemoryStore;

    fn resolver() -> CatalogResolver {
        let store = MemoryStore::new();
        let mut site = Site::new("s1", "docs");
        site.releases.push(Release::new("r1", "first"));
        // A dangling pointer on a branch is not catalog membership.
        site.branches
            .push(Branch::new(BranchId::from("b1"), "main", "main").with_release("ghost"));
        store.insert_site(site);
        CatalogResolver::new(Arc::new(store))
    }

    #[tokio::test]
    async fn known_release_exists() {
        assert!(resolver().exists(&"s1".into(), &"r1".into()).await);
    }

    #[tokio::test]
    async fn unknown_release_does_not_exist() {
        let r = resolver();
        assert!(!r.exists(&"s1".into(), &"r9".into()).await);
        assert!(!r.exists(&"s1".into(), &"ghost".into()).await);
    }

    #[tokio::test]
    async fn unknown_site_has_no_releases() {
        assert!(!resolver().exists(&"nope".into(), &"r1".into()).await);
    }
}
