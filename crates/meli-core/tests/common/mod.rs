#![allow(clippy::unwrap_used, dead_code)]
// Shared fixtures and test doubles for meli-core integration tests.

use std::collections::BTreeSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use meli_core::config::DEFAULT_ADMIN_URL;
use meli_core::{
    Branch, BranchId, BroadcastNotifier, CatalogResolver, ChangeNotifier, EngineConfig,
    EventPublishError, MemoryStore, Orchestrator, ProxyConfig, ProxyConfigError, ProxyControl,
    Release, RoutingConfig, Site, SiteEvent, SiteId, SitesConfig,
};

pub const SITE: &str = "s1";
pub const MAIN: &str = "b-main";
pub const PREVIEW: &str = "b1";

// ── Proxy doubles ───────────────────────────────────────────────────

/// Records every call and always succeeds.
#[derive(Default)]
pub struct RecordingProxy {
    pub applied: Mutex<Vec<RoutingConfig>>,
    pub removed: Mutex<Vec<(SiteId, BranchId)>>,
    pub pruned: Mutex<Vec<(SiteId, Vec<BranchId>)>>,
}

impl RecordingProxy {
    pub fn applied(&self) -> Vec<RoutingConfig> {
        self.applied.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<(SiteId, BranchId)> {
        self.removed.lock().unwrap().clone()
    }

    pub fn pruned(&self) -> Vec<(SiteId, Vec<BranchId>)> {
        self.pruned.lock().unwrap().clone()
    }
}

#[async_trait]
impl ProxyControl for RecordingProxy {
    async fn apply_routing_config(&self, config: &RoutingConfig) -> Result<(), ProxyConfigError> {
        self.applied.lock().unwrap().push(config.clone());
        Ok(())
    }

    async fn remove_routing_config(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
    ) -> Result<(), ProxyConfigError> {
        self.removed
            .lock()
            .unwrap()
            .push((site_id.clone(), branch_id.clone()));
        Ok(())
    }

    async fn prune_site(
        &self,
        site_id: &SiteId,
        keep: &[BranchId],
    ) -> Result<usize, ProxyConfigError> {
        self.pruned
            .lock()
            .unwrap()
            .push((site_id.clone(), keep.to_vec()));
        Ok(0)
    }
}

/// Keeps the set of installed routes like a real proxy would, applying
/// configs only after `apply_delay`.
#[derive(Default)]
pub struct RouteTableProxy {
    pub apply_delay: Duration,
    pub routes: Mutex<BTreeSet<(SiteId, BranchId)>>,
}

impl RouteTableProxy {
    pub fn with_apply_delay(apply_delay: Duration) -> Self {
        Self {
            apply_delay,
            routes: Mutex::default(),
        }
    }

    pub fn branches(&self, site_id: &SiteId) -> Vec<BranchId> {
        self.routes
            .lock()
            .unwrap()
            .iter()
            .filter(|(site, _)| site == site_id)
            .map(|(_, branch)| branch.clone())
            .collect()
    }
}

#[async_trait]
impl ProxyControl for RouteTableProxy {
    async fn apply_routing_config(&self, config: &RoutingConfig) -> Result<(), ProxyConfigError> {
        tokio::time::sleep(self.apply_delay).await;
        self.routes
            .lock()
            .unwrap()
            .insert((config.site_id.clone(), config.branch_id.clone()));
        Ok(())
    }

    async fn remove_routing_config(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
    ) -> Result<(), ProxyConfigError> {
        self.routes
            .lock()
            .unwrap()
            .remove(&(site_id.clone(), branch_id.clone()));
        Ok(())
    }

    async fn prune_site(
        &self,
        site_id: &SiteId,
        keep: &[BranchId],
    ) -> Result<usize, ProxyConfigError> {
        let mut routes = self.routes.lock().unwrap();
        let before = routes.len();
        routes.retain(|(site, branch)| site != site_id || keep.contains(branch));
        Ok(before - routes.len())
    }
}

/// Rejects everything, like an unreachable admin endpoint.
pub struct FailingProxy;

#[async_trait]
impl ProxyControl for FailingProxy {
    async fn apply_routing_config(&self, _config: &RoutingConfig) -> Result<(), ProxyConfigError> {
        Err(ProxyConfigError::Unreachable {
            reason: "connection refused".into(),
        })
    }

    async fn remove_routing_config(
        &self,
        _site_id: &SiteId,
        _branch_id: &BranchId,
    ) -> Result<(), ProxyConfigError> {
        Err(ProxyConfigError::Unreachable {
            reason: "connection refused".into(),
        })
    }

    async fn prune_site(
        &self,
        _site_id: &SiteId,
        _keep: &[BranchId],
    ) -> Result<usize, ProxyConfigError> {
        Err(ProxyConfigError::Unreachable {
            reason: "connection refused".into(),
        })
    }
}

// ── Notifier doubles ────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingNotifier {
    pub events: Mutex<Vec<SiteEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<SiteEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl ChangeNotifier for RecordingNotifier {
    fn publish(&self, event: SiteEvent) -> Result<(), EventPublishError> {
        self.events.lock().unwrap().push(event);
        Ok(())
    }
}

pub struct FailingNotifier;

impl ChangeNotifier for FailingNotifier {
    fn publish(&self, _event: SiteEvent) -> Result<(), EventPublishError> {
        Err(EventPublishError::Closed)
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

pub fn engine_config() -> EngineConfig {
    let proxy = ProxyConfig::new(Url::parse(DEFAULT_ADMIN_URL).unwrap());
    let sites = SitesConfig {
        domain: "meli.test".into(),
        root: "/srv/sites".into(),
        https: false,
    };
    EngineConfig {
        sync_timeout: Duration::from_secs(2),
        // bcrypt's minimum, keeps tests fast.
        password_cost: 4,
        ..EngineConfig::new(proxy, sites)
    }
}

/// Site `s1` ("docs") with a main branch on `r1`, a `preview` branch with
/// nothing deployed, and releases `r1` and `r2` in its catalog.
pub fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new();
    let mut site = Site::new(SITE, "docs");
    site.main_branch = Some(BranchId::from(MAIN));
    site.branches
        .push(Branch::new(BranchId::from(MAIN), "main", "main").with_release("r1"));
    site.branches
        .push(Branch::new(BranchId::from(PREVIEW), "preview", "preview"));
    site.releases.push(Release::new("r1", "first build"));
    site.releases.push(Release::new("r2", "second build"));
    store.insert_site(site);
    Arc::new(store)
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub proxy: Arc<RecordingProxy>,
    pub notifier: Arc<RecordingNotifier>,
    pub engine: Orchestrator,
}

pub fn harness() -> Harness {
    let store = seeded_store();
    let proxy = Arc::new(RecordingProxy::default());
    let notifier = Arc::new(RecordingNotifier::default());
    let engine = Orchestrator::new(
        engine_config(),
        store.clone(),
        Arc::new(CatalogResolver::new(store.clone())),
        proxy.clone(),
        notifier.clone(),
    );
    Harness {
        store,
        proxy,
        notifier,
        engine,
    }
}

/// Engine wired to a custom proxy and a real broadcast bus.
pub fn engine_with_proxy(proxy: Arc<dyn ProxyControl>) -> (Arc<MemoryStore>, Orchestrator) {
    let store = seeded_store();
    let engine = Orchestrator::new(
        engine_config(),
        store.clone(),
        Arc::new(CatalogResolver::new(store.clone())),
        proxy,
        Arc::new(BroadcastNotifier::new()),
    );
    (store, engine)
}

pub fn site_id() -> SiteId {
    SiteId::from(SITE)
}

pub fn preview_id() -> BranchId {
    BranchId::from(PREVIEW)
}

pub fn main_id() -> BranchId {
    BranchId::from(MAIN)
}
