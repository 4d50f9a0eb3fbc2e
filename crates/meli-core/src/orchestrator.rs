// ── Mutation orchestrator ──
//
// Sequences every branch mutation: validate → commit → re-read →
// compile + sync → notify → respond. Steps up to the re-read decide the
// result; sync and notify run after it and can only log.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use meli_proxy::CaddyClient;

use crate::command::{Command, CommandResult};
use crate::compile::compile;
use crate::config::EngineConfig;
use crate::convert::branch_url;
use crate::error::CoreError;
use crate::model::{
    Branch, BranchId, BranchPassword, BranchView, Redirect, ReleaseId, Site, SiteEvent, SiteId,
};
use crate::notify::ChangeNotifier;
use crate::resolver::{CatalogResolver, ReleaseResolver};
use crate::store::{BranchField, BranchStore};
use crate::sync::{CaddyProxy, ProxyControl, ProxySynchronizer, SyncAction, SyncOutcome};
use crate::validation;

/// Entry point for branch mutations.
///
/// Cheaply cloneable via `Arc<OrchestratorInner>`. Holds no lock across
/// a pipeline: concurrent mutations are serialized only by the store's
/// per-update atomicity, and the proxy converges on whichever compiled
/// config it receives last.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    config: EngineConfig,
    store: Arc<dyn BranchStore>,
    resolver: Arc<dyn ReleaseResolver>,
    sync: ProxySynchronizer,
    notifier: Arc<dyn ChangeNotifier>,
}

impl Orchestrator {
    pub fn new(
        config: EngineConfig,
        store: Arc<dyn BranchStore>,
        resolver: Arc<dyn ReleaseResolver>,
        proxy: Arc<dyn ProxyControl>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Self {
        let sync = ProxySynchronizer::new(proxy, config.sync_timeout);
        Self {
            inner: Arc::new(OrchestratorInner {
                config,
                store,
                resolver,
                sync,
                notifier,
            }),
        }
    }

    /// Wire the engine to a Caddy admin endpoint, resolving releases
    /// against each site's catalog.
    pub fn caddy(
        config: EngineConfig,
        store: Arc<dyn BranchStore>,
        notifier: Arc<dyn ChangeNotifier>,
    ) -> Result<Self, CoreError> {
        let client = CaddyClient::new(
            config.proxy.admin_url.clone(),
            config.proxy.server.clone(),
            &config.proxy.transport(),
        )
        .map_err(|e| CoreError::Config {
            message: format!("proxy client: {e}"),
        })?;
        let proxy = Arc::new(CaddyProxy::new(client, config.sites.clone()));
        let resolver = Arc::new(CatalogResolver::new(Arc::clone(&store)));
        Ok(Self::new(config, store, resolver, proxy, notifier))
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn BranchStore> {
        &self.inner.store
    }

    /// Subscribe to background proxy sync outcomes.
    pub fn sync_outcomes(&self) -> broadcast::Receiver<SyncOutcome> {
        self.inner.sync.subscribe()
    }

    /// Wait for in-flight proxy syncs to finish.
    pub async fn wait_idle(&self) {
        self.inner.sync.wait_idle().await;
    }

    /// Cancel in-flight proxy syncs and refuse later ones. The store is
    /// unaffected.
    pub async fn shutdown(&self) {
        self.inner.sync.shutdown().await;
    }

    // ── Reads ────────────────────────────────────────────────────

    /// A branch as currently stored.
    pub async fn branch(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
    ) -> Result<BranchView, CoreError> {
        let site = self.load_site(site_id).await?;
        let branch = site
            .branch(branch_id)
            .ok_or_else(|| branch_not_found(site_id, branch_id))?;
        Ok(self.view(&site, branch))
    }

    // ── Command execution ────────────────────────────────────────

    /// Execute a command.
    ///
    /// Returns once the change is committed and read back. Proxy sync and
    /// event publication continue in the background; their failures never
    /// reach this result.
    pub async fn execute(&self, cmd: Command) -> Result<CommandResult, CoreError> {
        let op = cmd.name();
        let site_id = cmd.site_id().clone();
        debug!(command = op, site = %site_id, "executing");

        let result = match cmd {
            Command::CreateBranch {
                site_id,
                name,
                slug,
                release,
            } => self
                .create_branch(&site_id, name, slug, release)
                .await
                .map(CommandResult::Branch),
            Command::UpdateBranch {
                site_id,
                branch_id,
                release,
            } => self
                .set_release(&site_id, &branch_id, release)
                .await
                .map(CommandResult::Branch),
            Command::SetBranchPassword {
                site_id,
                branch_id,
                user,
                password,
            } => self
                .set_password(&site_id, &branch_id, user, password)
                .await
                .map(CommandResult::Branch),
            Command::RemoveBranchPassword { site_id, branch_id } => self
                .update_field(&site_id, &branch_id, BranchField::Password(None))
                .await
                .map(CommandResult::Branch),
            Command::SetBranchRedirects {
                site_id,
                branch_id,
                redirects,
            } => self
                .set_redirects(&site_id, &branch_id, redirects)
                .await
                .map(CommandResult::Branch),
            Command::DeleteBranch { site_id, branch_id } => self
                .delete_branch(&site_id, &branch_id)
                .await
                .map(CommandResult::Deleted),
            Command::ResyncSite { site_id } => self
                .resync_site(&site_id)
                .await
                .map(|branches| CommandResult::Resynced { branches }),
        };

        match &result {
            Ok(_) => info!(command = op, site = %site_id, "command committed"),
            Err(e) => debug!(command = op, site = %site_id, error = %e, "command rejected"),
        }
        result
    }

    // ── Per-command pipelines ────────────────────────────────────

    async fn create_branch(
        &self,
        site_id: &SiteId,
        name: String,
        slug: String,
        release: Option<ReleaseId>,
    ) -> Result<BranchView, CoreError> {
        validation::name(&name)?;
        validation::slug(&slug)?;
        self.load_site(site_id).await?;
        if let Some(release) = &release {
            self.ensure_release(site_id, release).await?;
        }

        let mut branch = Branch::new(BranchId::generate(), name, slug);
        branch.release = release;
        let branch_id = branch.id.clone();

        self.inner.store.insert_branch(site_id, branch).await?;
        self.propagate(site_id, &branch_id).await
    }

    async fn set_release(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
        release: Option<ReleaseId>,
    ) -> Result<BranchView, CoreError> {
        if let Some(release) = &release {
            let site = self.load_site(site_id).await?;
            if site.branch(branch_id).is_none() {
                return Err(branch_not_found(site_id, branch_id));
            }
            self.ensure_release(site_id, release).await?;
        }
        self.update_field(site_id, branch_id, BranchField::Release(release))
            .await
    }

    async fn set_password(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
        user: String,
        password: SecretString,
    ) -> Result<BranchView, CoreError> {
        validation::user(&user)?;
        validation::password(password.expose_secret())?;

        let cost = self.inner.config.password_cost;
        let hashed = tokio::task::spawn_blocking(move || {
            BranchPassword::hash(user, password.expose_secret(), cost)
        })
        .await
        .map_err(|e| CoreError::Internal(format!("password hashing task failed: {e}")))?
        .map_err(|e| CoreError::Internal(format!("password hashing failed: {e}")))?;

        self.update_field(site_id, branch_id, BranchField::Password(Some(hashed)))
            .await
    }

    async fn set_redirects(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
        redirects: Vec<Redirect>,
    ) -> Result<BranchView, CoreError> {
        validation::redirects(&redirects)?;
        self.update_field(site_id, branch_id, BranchField::Redirects(redirects))
            .await
    }

    async fn delete_branch(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
    ) -> Result<BranchView, CoreError> {
        let before = self.load_site(site_id).await?;
        if before.is_main_branch(branch_id) {
            return Err(CoreError::validation(
                "branch_id",
                "the main branch of a site cannot be deleted",
            ));
        }

        let removed = self.inner.store.remove_branch(site_id, branch_id).await?;
        let view = self.view(&before, &removed);

        self.inner.sync.spawn(SyncAction::Remove {
            site_id: site_id.clone(),
            branch_id: branch_id.clone(),
        });
        match self.inner.store.find_site(site_id).await {
            Ok(Some(site)) => self.notify(site, branch_id),
            Ok(None) => debug!(site = %site_id, "site gone after branch delete, no event"),
            Err(e) => warn!(site = %site_id, error = %e, "post-delete read failed, no event"),
        }
        Ok(view)
    }

    /// Re-push every stored branch and drop proxy routes of branches the
    /// store no longer has.
    async fn resync_site(&self, site_id: &SiteId) -> Result<usize, CoreError> {
        let site = self.load_site(site_id).await?;
        for branch in &site.branches {
            self.inner
                .sync
                .spawn(SyncAction::Apply(compile(&site, branch)));
        }
        self.inner.sync.spawn(SyncAction::Prune {
            site_id: site_id.clone(),
            keep: site.branches.iter().map(|b| b.id.clone()).collect(),
        });
        info!(site = %site_id, branches = site.branches.len(), "site resync scheduled");
        Ok(site.branches.len())
    }

    // ── Pipeline steps ───────────────────────────────────────────

    /// Validate a release reference against the resolver.
    async fn ensure_release(
        &self,
        site_id: &SiteId,
        release: &ReleaseId,
    ) -> Result<(), CoreError> {
        validation::release(release)?;
        if self.inner.resolver.exists(site_id, release).await {
            Ok(())
        } else {
            Err(CoreError::validation(
                "release",
                format!("release {release} does not exist in site {site_id}"),
            ))
        }
    }

    /// Commit one field, then propagate from the read-back state.
    async fn update_field(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
        field: BranchField,
    ) -> Result<BranchView, CoreError> {
        self.inner
            .store
            .update_branch_field(site_id, branch_id, field)
            .await?;
        self.propagate(site_id, branch_id).await
    }

    /// Re-read the committed site, schedule the proxy sync, publish the
    /// event and build the response.
    ///
    /// If the branch vanished in between (a concurrent delete), nothing
    /// is synced or published for it.
    async fn propagate(
        &self,
        site_id: &SiteId,
        branch_id: &BranchId,
    ) -> Result<BranchView, CoreError> {
        let site = self.load_site(site_id).await?;
        let branch = site
            .branch(branch_id)
            .ok_or_else(|| branch_not_found(site_id, branch_id))?;

        self.inner
            .sync
            .spawn(SyncAction::Apply(compile(&site, branch)));
        let view = self.view(&site, branch);
        self.notify(Arc::clone(&site), branch_id);
        Ok(view)
    }

    fn notify(&self, site: Arc<Site>, branch_id: &BranchId) {
        let site_id = site.id.clone();
        let event = SiteEvent::site_updated(site, Some(branch_id.clone()));
        if let Err(e) = self.inner.notifier.publish(event) {
            warn!(site = %site_id, branch = %branch_id, error = %e, "event publish failed");
        }
    }

    async fn load_site(&self, site_id: &SiteId) -> Result<Arc<Site>, CoreError> {
        self.inner
            .store
            .find_site(site_id)
            .await?
            .ok_or_else(|| CoreError::SiteNotFound {
                site_id: site_id.clone(),
            })
    }

    fn view(&self, site: &Site, branch: &Branch) -> BranchView {
        let url = branch_url(site, branch, &self.inner.config.sites);
        BranchView::new(&site.id, branch, url)
    }
}

fn branch_not_found(site_id: &SiteId, branch_id: &BranchId) -> CoreError {
    CoreError::BranchNotFound {
        site_id: site_id.clone(),
        branch_id: branch_id.clone(),
    }
}
