// ── Domain events ──

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::{AsRefStr, Display};

use super::ids::BranchId;
use super::site::Site;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum EventType {
    SiteUpdated,
}

/// Published after a branch mutation has been committed.
///
/// Carries the full post-commit site so subscribers never need to read
/// the store again to act on it.
#[derive(Debug, Clone, Serialize)]
pub struct SiteEvent {
    pub event_type: EventType,
    pub site: Arc<Site>,
    /// Branch whose change triggered the event, if any.
    pub branch_id: Option<BranchId>,
    pub timestamp: DateTime<Utc>,
}

impl SiteEvent {
    pub fn site_updated(site: Arc<Site>, branch_id: Option<BranchId>) -> Self {
        Self {
            event_type: EventType::SiteUpdated,
            site,
            branch_id,
            timestamp: Utc::now(),
        }
    }
}
