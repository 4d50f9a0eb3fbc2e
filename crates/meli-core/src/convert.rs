// ── Domain-to-proxy conversions ──
//
// Translates a compiled `RoutingConfig` into the Caddy route that
// enforces it, and derives the public hosts and URLs branches are
// served on.

use std::collections::BTreeMap;

use meli_proxy::{Handler, MatchSet, Route};

use crate::config::SitesConfig;
use crate::model::{Branch, BranchId, ReleaseTarget, RoutingConfig, Site, SiteId};

/// Body returned for a branch with nothing deployed.
pub const NO_DEPLOYMENT_BODY: &str = "No release has been deployed to this branch yet.";

/// Stable `@id` of a branch's proxy route.
pub fn route_id(site_id: &SiteId, branch_id: &BranchId) -> String {
    format!("site-{site_id}-branch-{branch_id}")
}

/// Branch id carried by a route `@id` of `site_id`, if it is one of ours.
pub fn route_branch<'a>(id: &'a str, site_id: &SiteId) -> Option<&'a str> {
    let branch = id
        .strip_prefix("site-")?
        .strip_prefix(site_id.as_str())?
        .strip_prefix("-branch-")?;
    (!branch.is_empty() && !branch.contains("-branch-")).then_some(branch)
}

fn site_host(site_name: &str, sites: &SitesConfig) -> String {
    format!("{site_name}.{}", sites.domain)
}

fn branch_host(site_name: &str, slug: &str, sites: &SitesConfig) -> String {
    format!("{slug}.{site_name}.{}", sites.domain)
}

/// Hosts a branch answers on; the main branch also takes the bare site host.
pub fn hosts_for(config: &RoutingConfig, sites: &SitesConfig) -> Vec<String> {
    let mut hosts = vec![branch_host(&config.site_name, &config.branch_slug, sites)];
    if config.main_branch {
        hosts.push(site_host(&config.site_name, sites));
    }
    hosts
}

/// Public URL of a branch.
pub fn branch_url(site: &Site, branch: &Branch, sites: &SitesConfig) -> String {
    let scheme = if sites.https { "https" } else { "http" };
    let host = if site.is_main_branch(&branch.id) {
        site_host(&site.name, sites)
    } else {
        branch_host(&site.name, &branch.slug, sites)
    };
    format!("{scheme}://{host}")
}

/// Build the Caddy route enforcing `config`.
///
/// Handlers run in order: password gate, redirects (first match wins),
/// then content or the no-deployment placeholder.
pub fn route_for(config: &RoutingConfig, sites: &SitesConfig) -> Route {
    let mut handle = Vec::with_capacity(3);

    if let Some(gate) = &config.password {
        handle.push(Handler::basic_auth(&gate.user, &gate.hash));
    }

    if !config.redirects.is_empty() {
        let routes = config
            .redirects
            .iter()
            .map(|r| Route {
                id: None,
                matchers: vec![MatchSet::path(&r.path)],
                handle: vec![Handler::redirect(&r.target, r.kind.status_code())],
                terminal: true,
            })
            .collect();
        handle.push(Handler::Subroute { routes });
    }

    handle.push(match &config.target {
        ReleaseTarget::Release(release) => Handler::FileServer {
            root: sites
                .root
                .join(config.site_id.as_str())
                .join(release.as_str())
                .to_string_lossy()
                .into_owned(),
        },
        ReleaseTarget::NoDeployment => Handler::StaticResponse {
            status_code: Some(404),
            headers: BTreeMap::new(),
            body: Some(NO_DEPLOYMENT_BODY.to_owned()),
        },
    });

    Route {
        id: Some(route_id(&config.site_id, &config.branch_id)),
        matchers: vec![MatchSet::hosts(hosts_for(config, sites))],
        handle,
        terminal: true,
    }
}
