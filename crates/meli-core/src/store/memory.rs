// ── In-memory branch store ──
//
// Concurrent site storage with copy-on-write updates and push-based
// change notification via a `watch` snapshot channel.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::watch;
use tracing::debug;

use super::field::BranchField;
use super::stream::SiteStream;
use super::BranchStore;
use crate::error::CoreError;
use crate::model::{Branch, BranchId, Release, Site, SiteId};

/// A lock-free, reactive [`BranchStore`].
///
/// Each site lives behind an `Arc` and is cloned on write while its
/// `DashMap` shard lock is held, so a write is atomic with respect to
/// every other write on the same site and readers always see a whole,
/// committed document. Every mutation rebuilds the snapshot that
/// subscribers receive.
pub struct MemoryStore {
    sites: DashMap<SiteId, Arc<Site>>,
    snapshot: watch::Sender<Arc<Vec<Arc<Site>>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));
        Self {
            sites: DashMap::new(),
            snapshot,
        }
    }

    /// Insert or replace a whole site. Returns `true` if the id was new.
    pub fn insert_site(&self, site: Site) -> bool {
        let is_new = self.sites.insert(site.id.clone(), Arc::new(site)).is_none();
        self.rebuild_snapshot();
        is_new
    }

    /// Add a release to a site's catalog.
    pub fn add_release(&self, site_id: &SiteId, release: Release) -> Result<(), CoreError> {
        self.modify_site(site_id, |site| {
            site.releases.push(release);
            Ok(())
        })
    }

    /// Point-in-time view of every stored site.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Site>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to site changes.
    pub fn subscribe_sites(&self) -> SiteStream {
        SiteStream::new(self.snapshot.subscribe())
    }

    pub fn len(&self) -> usize {
        self.sites.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sites.is_empty()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Apply `f` to a private copy of the site and swap it in.
    ///
    /// The shard guard is released before the snapshot is rebuilt;
    /// iterating the map while holding it would deadlock.
    fn modify_site<T>(
        &self,
        site_id: &SiteId,
        f: impl FnOnce(&mut Site) -> Result<T, CoreError>,
    ) -> Result<T, CoreError> {
        let out = {
            let mut entry = self
                .sites
                .get_mut(site_id)
                .ok_or_else(|| CoreError::SiteNotFound {
                    site_id: site_id.clone(),
                })?;
            let mut next = Site::clone(entry.value());
            let out = f(&mut next)?;
            *entry.value_mut() = Arc::new(next);
            out
        };
        self.rebuild_snapshot();
        Ok(out)
    }

    fn rebuild_snapshot(&self) {
        let mut values: Vec<Arc<Site>> = self.sites.iter().map(|r| Arc::clone(r.value())).collect();
        values.sort_by(|a, b| a.id.cmp(&b.id));
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BranchStore for MemoryStore {
    async fn find_site(&self, site_id: &SiteId) -> Result<Option<Arc<Site>>, CoreError> {
        Ok(self.sites.get(site_id).map(|r| Arc::clone(r.value())))
    }

    async fn update_branch_field(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
        field: BranchField,
    ) -> Result<(), CoreError> {
        let path = field.path();
        self.modify_site(site_id, |site| {
            let branch = site
                .branch_mut(branch_id)
                .ok_or_else(|| CoreError::BranchNotFound {
                    site_id: site_id.clone(),
                    branch_id: branch_id.clone(),
                })?;
            field.apply(branch);
            Ok(())
        })?;
        debug!(site = %site_id, branch = %branch_id, field = path, "branch field updated");
        Ok(())
    }

    async fn insert_branch(&self, site_id: &SiteId, branch: Branch) -> Result<(), CoreError> {
        let branch_id = branch.id.clone();
        self.modify_site(site_id, |site| {
            if site.branch_by_slug(&branch.slug).is_some() {
                return Err(CoreError::validation(
                    "slug",
                    format!("a branch with slug '{}' already exists", branch.slug),
                ));
            }
            if site.branches.iter().any(|b| b.name == branch.name) {
                return Err(CoreError::validation(
                    "name",
                    format!("a branch named '{}' already exists", branch.name),
                ));
            }
            if site.branch(&branch.id).is_some() {
                return Err(CoreError::Store {
                    message: format!("branch id {} already in use", branch.id),
                });
            }
            // The first branch of a site is what the bare site host serves.
            if site.main_branch.is_none() {
                site.main_branch = Some(branch.id.clone());
            }
            site.branches.push(branch);
            Ok(())
        })?;
        debug!(site = %site_id, branch = %branch_id, "branch inserted");
        Ok(())
    }

    async fn remove_branch(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
    ) -> Result<Branch, CoreError> {
        let removed = self.modify_site(site_id, |site| {
            let idx = site
                .branches
                .iter()
                .position(|b| &b.id == branch_id)
                .ok_or_else(|| CoreError::BranchNotFound {
                    site_id: site_id.clone(),
                    branch_id: branch_id.clone(),
                })?;
            if site.is_main_branch(branch_id) {
                site.main_branch = None;
            }
            Ok(site.branches.remove(idx))
        })?;
        debug!(site = %site_id, branch = %branch_id, "branch removed");
        Ok(removed)
    }

    async fn site_ids(&self) -> Result<Vec<SiteId>, CoreError> {
        let mut ids: Vec<SiteId> = self.sites.iter().map(|r| r.key().clone()).collect();
        ids.sort();
        Ok(ids)
    }
}
