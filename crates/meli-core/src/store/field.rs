// ── Field-scoped branch updates ──

use crate::model::{Branch, BranchPassword, Redirect, ReleaseId};

/// A single branch field and its new value.
///
/// The store applies exactly one of these per update, so two concurrent
/// updates to different fields of the same branch never clobber each other.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BranchField {
    Release(Option<ReleaseId>),
    Password(Option<BranchPassword>),
    Redirects(Vec<Redirect>),
}

impl BranchField {
    /// Document path of the field, for logs.
    pub fn path(&self) -> &'static str {
        match self {
            Self::Release(_) => "branches.$.release",
            Self::Password(_) => "branches.$.password",
            Self::Redirects(_) => "branches.$.redirects",
        }
    }

    pub(crate) fn apply(self, branch: &mut Branch) {
        match self {
            Self::Release(release) => branch.release = release,
            Self::Password(password) => branch.password = password,
            Self::Redirects(redirects) => branch.redirects = redirects,
        }
    }
}
