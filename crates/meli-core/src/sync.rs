// ── Proxy synchronizer ──
//
// Pushes compiled routing configs to the reverse proxy in the
// background. The store is already committed when a sync starts, so a
// failure here is logged and broadcast on the outcome channel, never
// returned to the mutation caller.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use meli_proxy::CaddyClient;

use crate::config::SitesConfig;
use crate::convert::{route_branch, route_for, route_id};
use crate::error::ProxyConfigError;
use crate::model::{BranchId, RoutingConfig, SiteId};

const OUTCOME_CHANNEL_SIZE: usize = 256;

// ── Proxy control seam ───────────────────────────────────────────────

/// The reverse proxy's control API, as the engine sees it.
#[async_trait]
pub trait ProxyControl: Send + Sync {
    /// Install or replace the routes for one site + branch.
    async fn apply_routing_config(&self, config: &RoutingConfig) -> Result<(), ProxyConfigError>;

    /// Drop the routes for one site + branch. Absent routes are not an error.
    async fn remove_routing_config(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
    ) -> Result<(), ProxyConfigError>;

    /// Drop every route of `site_id` whose branch is not in `keep`.
    /// Returns how many routes were removed.
    async fn prune_site(
        &self,
        site_id: &SiteId,
        keep: &[BranchId],
    ) -> Result<usize, ProxyConfigError>;
}

/// [`ProxyControl`] backed by Caddy's admin API.
pub struct CaddyProxy {
    client: CaddyClient,
    sites: SitesConfig,
}

impl CaddyProxy {
    pub fn new(client: CaddyClient, sites: SitesConfig) -> Self {
        Self { client, sites }
    }
}

#[async_trait]
impl ProxyControl for CaddyProxy {
    async fn apply_routing_config(&self, config: &RoutingConfig) -> Result<(), ProxyConfigError> {
        let route = route_for(config, &self.sites);
        self.client.upsert_route(&route).await?;
        Ok(())
    }

    async fn remove_routing_config(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
    ) -> Result<(), ProxyConfigError> {
        let id = route_id(site_id, branch_id);
        if !self.client.delete_route(&id).await? {
            debug!(route = %id, "route already absent");
        }
        Ok(())
    }

    async fn prune_site(
        &self,
        site_id: &SiteId,
        keep: &[BranchId],
    ) -> Result<usize, ProxyConfigError> {
        let orphans: Vec<String> = self
            .client
            .list_route_ids()
            .await?
            .into_iter()
            .filter(|id| {
                route_branch(id, site_id)
                    .is_some_and(|branch| !keep.iter().any(|k| k.as_str() == branch))
            })
            .collect();

        let mut pruned = 0;
        for id in &orphans {
            if self.client.delete_route(id).await? {
                debug!(route = %id, "orphan route removed");
                pruned += 1;
            }
        }
        Ok(pruned)
    }
}

// ── Actions and outcomes ─────────────────────────────────────────────

/// One unit of proxy work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncAction {
    Apply(RoutingConfig),
    Remove { site_id: SiteId, branch_id: BranchId },
    /// Remove routes of `site_id` for branches outside `keep`.
    Prune { site_id: SiteId, keep: Vec<BranchId> },
}

impl SyncAction {
    pub fn site_id(&self) -> &SiteId {
        match self {
            Self::Apply(config) => &config.site_id,
            Self::Remove { site_id, .. } | Self::Prune { site_id, .. } => site_id,
        }
    }

    /// The branch this action targets; `None` for site-wide actions.
    pub fn branch_id(&self) -> Option<&BranchId> {
        match self {
            Self::Apply(config) => Some(&config.branch_id),
            Self::Remove { branch_id, .. } => Some(branch_id),
            Self::Prune { .. } => None,
        }
    }
}

impl fmt::Display for SyncAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Apply(config) => write!(f, "apply {}/{}", config.site_id, config.branch_id),
            Self::Remove { site_id, branch_id } => write!(f, "remove {site_id}/{branch_id}"),
            Self::Prune { site_id, keep } => {
                write!(f, "prune {site_id} (keeping {})", keep.len())
            }
        }
    }
}

/// Result of one background sync, as seen by observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    pub site_id: SiteId,
    /// `None` for site-wide actions such as pruning.
    pub branch_id: Option<BranchId>,
    pub result: Result<(), ProxyConfigError>,
}

// ── Synchronizer ─────────────────────────────────────────────────────

/// Runs proxy syncs as tracked, time-bounded background tasks.
///
/// Syncs are never retried inline; a reconciliation pass re-derives and
/// re-pushes configs from the store instead.
pub struct ProxySynchronizer {
    proxy: Arc<dyn ProxyControl>,
    timeout: Duration,
    tracker: TaskTracker,
    cancel: CancellationToken,
    outcomes: broadcast::Sender<SyncOutcome>,
}

impl ProxySynchronizer {
    pub fn new(proxy: Arc<dyn ProxyControl>, timeout: Duration) -> Self {
        let (outcomes, _) = broadcast::channel(OUTCOME_CHANNEL_SIZE);
        Self {
            proxy,
            timeout,
            tracker: TaskTracker::new(),
            cancel: CancellationToken::new(),
            outcomes,
        }
    }

    /// Subscribe to sync outcomes.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncOutcome> {
        self.outcomes.subscribe()
    }

    /// Start `action` in the background and return immediately.
    ///
    /// After [`shutdown`](Self::shutdown) nothing is started; the action is
    /// reported as [`ProxyConfigError::ShutDown`] instead.
    pub fn spawn(&self, action: SyncAction) {
        if self.cancel.is_cancelled() {
            report(&self.outcomes, action, Err(ProxyConfigError::ShutDown));
            return;
        }

        let proxy = Arc::clone(&self.proxy);
        let timeout = self.timeout;
        let cancel = self.cancel.clone();
        let outcomes = self.outcomes.clone();

        self.tracker.spawn(async move {
            let result = tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    debug!(action = %action, "sync cancelled");
                    return;
                }
                result = run(proxy.as_ref(), &action, timeout) => result,
            };
            report(&outcomes, action, result);
        });
    }

    /// Run `action` on the current task, still bounded by the timeout.
    pub async fn sync_now(&self, action: SyncAction) -> Result<(), ProxyConfigError> {
        if self.cancel.is_cancelled() {
            report(&self.outcomes, action, Err(ProxyConfigError::ShutDown));
            return Err(ProxyConfigError::ShutDown);
        }
        let result = run(self.proxy.as_ref(), &action, self.timeout).await;
        report(&self.outcomes, action, result.clone());
        result
    }

    /// Number of syncs still in flight.
    pub fn in_flight(&self) -> usize {
        self.tracker.len()
    }

    /// Wait for every in-flight sync to finish. New syncs may still be
    /// spawned afterwards.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Cancel in-flight syncs and wait for them to stop. Later syncs are
    /// refused.
    pub async fn shutdown(&self) {
        self.cancel.cancel();
        self.tracker.close();
        self.tracker.wait().await;
    }

    pub fn is_shut_down(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

async fn run(
    proxy: &dyn ProxyControl,
    action: &SyncAction,
    timeout: Duration,
) -> Result<(), ProxyConfigError> {
    let call = async {
        match action {
            SyncAction::Apply(config) => proxy.apply_routing_config(config).await,
            SyncAction::Remove { site_id, branch_id } => {
                proxy.remove_routing_config(site_id, branch_id).await
            }
            SyncAction::Prune { site_id, keep } => {
                let pruned = proxy.prune_site(site_id, keep).await?;
                if pruned > 0 {
                    debug!(site = %site_id, pruned, "orphan routes pruned");
                }
                Ok(())
            }
        }
    };
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ProxyConfigError::Timeout {
            timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
        }),
    }
}

fn report(
    outcomes: &broadcast::Sender<SyncOutcome>,
    action: SyncAction,
    result: Result<(), ProxyConfigError>,
) {
    match &result {
        Ok(()) => debug!(action = %action, "proxy in sync"),
        Err(e) => warn!(
            action = %action,
            error = %e,
            "proxy sync failed (store remains authoritative)"
        ),
    }
    let (site_id, branch_id) = match action {
        SyncAction::Apply(config) => (config.site_id, Some(config.branch_id)),
        SyncAction::Remove { site_id, branch_id } => (site_id, Some(branch_id)),
        SyncAction::Prune { site_id, .. } => (site_id, None),
    };
    // No subscribers is fine; the log line above is the record.
    let _ = outcomes.send(SyncOutcome {
        site_id,
        branch_id,
        result,
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::model::ReleaseTarget;

    struct SlowProxy {
        delay: Duration,
        calls: Mutex<Vec<BranchId>>,
    }

    #[async_trait]
    impl ProxyControl for SlowProxy {
        async fn apply_routing_config(
            &self,
            config: &RoutingConfig,
        ) -> Result<(), ProxyConfigError> {
            tokio::time::sleep(self.delay).await;
            self.calls.lock().unwrap().push(config.branch_id.clone());
            Ok(())
        }

        async fn remove_routing_config(
            &self,
            _site_id: &SiteId,
            branch_id: &BranchId,
        ) -> Result<(), ProxyConfigError> {
            self.calls.lock().unwrap().push(branch_id.clone());
            Ok(())
        }

        async fn prune_site(
            &self,
            _site_id: &SiteId,
            _keep: &[BranchId],
        ) -> Result<usize, ProxyConfigError> {
            Ok(0)
        }
    }

    fn config(branch: &str) -> RoutingConfig {
        RoutingConfig {
            site_id: "s1".into(),
            site_name: "docs".into(),
            branch_id: branch.into(),
            branch_slug: branch.into(),
            main_branch: false,
            target: ReleaseTarget::NoDeployment,
            password: None,
            redirects: Vec::new(),
        }
    }

    fn synchronizer(delay: Duration, timeout: Duration) -> (Arc<SlowProxy>, ProxySynchronizer) {
        let proxy = Arc::new(SlowProxy {
            delay,
            calls: Mutex::new(Vec::new()),
        });
        let sync = ProxySynchronizer::new(proxy.clone(), timeout);
        (proxy, sync)
    }

    #[tokio::test(start_paused = true)]
    async fn slow_proxy_times_out() {
        let (proxy, sync) = synchronizer(Duration::from_secs(30), Duration::from_millis(500));
        let mut outcomes = sync.subscribe();

        sync.spawn(SyncAction::Apply(config("b1")));
        sync.wait_idle().await;

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.branch_id, Some(BranchId::from("b1")));
        assert_eq!(
            outcome.result,
            Err(ProxyConfigError::Timeout { timeout_ms: 500 })
        );
        assert!(proxy.calls.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn wait_idle_drains_and_reopens() {
        let (proxy, sync) = synchronizer(Duration::from_millis(10), Duration::from_secs(5));

        sync.spawn(SyncAction::Apply(config("b1")));
        sync.spawn(SyncAction::Remove {
            site_id: "s1".into(),
            branch_id: "b2".into(),
        });
        sync.wait_idle().await;
        assert_eq!(sync.in_flight(), 0);
        assert_eq!(proxy.calls.lock().unwrap().len(), 2);

        sync.spawn(SyncAction::Apply(config("b3")));
        sync.wait_idle().await;
        assert_eq!(proxy.calls.lock().unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_cancels_in_flight() {
        let (proxy, sync) = synchronizer(Duration::from_secs(3), Duration::from_secs(5));
        let mut outcomes = sync.subscribe();

        sync.spawn(SyncAction::Apply(config("b1")));
        sync.shutdown().await;

        assert!(proxy.calls.lock().unwrap().is_empty());
        assert!(outcomes.try_recv().is_err());
    }

    #[tokio::test]
    async fn spawn_after_shutdown_is_reported() {
        let (proxy, sync) = synchronizer(Duration::ZERO, Duration::from_secs(5));
        let mut outcomes = sync.subscribe();

        sync.shutdown().await;
        assert!(sync.is_shut_down());
        sync.spawn(SyncAction::Apply(config("b1")));

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.branch_id, Some(BranchId::from("b1")));
        assert_eq!(outcome.result, Err(ProxyConfigError::ShutDown));
        assert_eq!(
            sync.sync_now(SyncAction::Apply(config("b2"))).await,
            Err(ProxyConfigError::ShutDown)
        );
        assert!(proxy.calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn prune_outcome_is_site_wide() {
        let (_proxy, sync) = synchronizer(Duration::ZERO, Duration::from_secs(1));
        let mut outcomes = sync.subscribe();
        let action = SyncAction::Prune {
            site_id: "s1".into(),
            keep: vec!["b-main".into()],
        };
        assert_eq!(action.to_string(), "prune s1 (keeping 1)");

        sync.sync_now(action).await.unwrap();

        let outcome = outcomes.recv().await.unwrap();
        assert_eq!(outcome.site_id, SiteId::from("s1"));
        assert_eq!(outcome.branch_id, None);
        assert!(outcome.result.is_ok());
    }

    #[tokio::test]
    async fn sync_now_reports_inline() {
        let (proxy, sync) = synchronizer(Duration::ZERO, Duration::from_secs(1));
        let mut outcomes = sync.subscribe();

        sync.sync_now(SyncAction::Apply(config("b1"))).await.unwrap();

        assert_eq!(proxy.calls.lock().unwrap().as_slice(), &[BranchId::from("b1")]);
        assert!(outcomes.recv().await.unwrap().result.is_ok());
    }
}
