// ── Domain model ──
//
// Sites own branches; branches point at releases. Routing configs and
// branch views are derived from these and never stored.

pub mod branch;
pub mod event;
pub mod ids;
pub mod routing;
pub mod site;
pub mod view;

// ── Re-exports ──────────────────────────────────────────────────────
// Flat access: `use meli_core::model::*` gives you everything.

pub use branch::{Branch, BranchPassword, Redirect, RedirectKind};
pub use event::{EventType, SiteEvent};
pub use ids::{BranchId, ReleaseId, SiteId};
pub use routing::{PasswordGate, ReleaseTarget, RoutingConfig};
pub use site::{Release, Site};
pub use view::BranchView;

/// Upper bound on every free-form string accepted from callers.
pub const STRING_MAX_LENGTH: usize = 255;
