// ── Routing config compiler ──

use crate::model::{Branch, PasswordGate, ReleaseTarget, RoutingConfig, Site};

/// Project a branch's persisted state into the config the proxy enforces.
///
/// Pure and total. Call it only with state read back after a commit.
pub fn compile(site: &Site, branch: &Branch) -> RoutingConfig {
    RoutingConfig {
        site_id: site.id.clone(),
        site_name: site.name.clone(),
        branch_id: branch.id.clone(),
        branch_slug: branch.slug.clone(),
        main_branch: site.is_main_branch(&branch.id),
        target: branch
            .release
            .clone()
            .map_or(ReleaseTarget::NoDeployment, ReleaseTarget::Release),
        password: branch.password.as_ref().map(|p| PasswordGate {
            user: p.user.clone(),
            hash: p.hash.clone(),
        }),
        redirects: branch.redirects.clone(),
    }
}
