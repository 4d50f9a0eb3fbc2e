//! Branch routing synchronisation engine for the meli static-site control plane.
//!
//! Keeps a reverse proxy's per-branch routes consistent with persisted
//! branch state. The store is the source of truth; the proxy is an
//! eventually-consistent replica fed from it.
//!
//! - **[`Orchestrator`]** - Executes [`Command`]s as a fixed pipeline:
//!   validate, commit one field atomically, read the site back, then
//!   compile and push the branch's routes in the background and publish a
//!   [`SiteEvent`]. Callers wait for the commit and read-back only.
//!
//! - **[`BranchStore`]** - Field-scoped atomic updates keyed by site and
//!   branch. [`MemoryStore`] implements it on `DashMap` with a
//!   `tokio::sync::watch` snapshot channel for subscribers.
//!
//! - **[`compile()`]** - Pure projection of a branch into a
//!   [`RoutingConfig`]; [`convert::route_for`] turns that into a Caddy route.
//!
//! - **[`ProxySynchronizer`]** - Tracked, time-bounded background syncs
//!   through a [`ProxyControl`] seam, with failures reported on their own
//!   broadcast channel instead of the mutation result.
//!
//! - **[`ReleaseResolver`]** and **[`ChangeNotifier`]** - Release existence
//!   checks and the domain event bus.

pub mod command;
pub mod compile;
pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod notify;
pub mod orchestrator;
pub mod resolver;
pub mod store;
pub mod sync;
mod validation;

// ── Primary re-exports ──────────────────────────────────────────────
pub use command::{Command, CommandResult};
pub use compile::compile;
pub use config::{EngineConfig, ProxyConfig, SitesConfig, TlsVerification};
pub use error::{CoreError, EventPublishError, ProxyConfigError};
pub use notify::{BroadcastNotifier, ChangeNotifier};
pub use orchestrator::Orchestrator;
pub use resolver::{CatalogResolver, ReleaseResolver};
pub use store::{BranchField, BranchStore, MemoryStore, SiteStream};
pub use sync::{CaddyProxy, ProxyControl, ProxySynchronizer, SyncAction, SyncOutcome};
pub use validation::PASSWORD_MAX_BYTES;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Branch, BranchId, BranchPassword, BranchView, EventType, PasswordGate, Redirect,
    RedirectKind, Release, ReleaseId, ReleaseTarget, RoutingConfig, STRING_MAX_LENGTH, Site,
    SiteEvent, SiteId,
};
