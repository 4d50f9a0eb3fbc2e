// ── Branch domain types ──

use std::fmt;

use serde::{Deserialize, Serialize};

use super::ids::{BranchId, ReleaseId};

/// A named routing target within a site, optionally bound to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Branch {
    pub id: BranchId,
    pub name: String,
    /// URL-addressable name, unique within the owning site.
    pub slug: String,
    /// Release served by this branch. `None` means nothing is deployed.
    #[serde(default)]
    pub release: Option<ReleaseId>,
    /// Access gate. Presence means visitors need a credential.
    #[serde(default)]
    pub password: Option<BranchPassword>,
    /// Ordered redirect rules; the first matching rule wins.
    #[serde(default)]
    pub redirects: Vec<Redirect>,
}

impl Branch {
    pub fn new(id: BranchId, name: impl Into<String>, slug: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            slug: slug.into(),
            release: None,
            password: None,
            redirects: Vec::new(),
        }
    }

    pub fn with_release(mut self, release: impl Into<ReleaseId>) -> Self {
        self.release = Some(release.into());
        self
    }
}

// ── Password gate ───────────────────────────────────────────────────

/// Basic-auth credential guarding a branch.
///
/// Only the bcrypt hash is ever stored; the plaintext is dropped as soon
/// as it has been hashed.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchPassword {
    pub user: String,
    pub hash: String,
}

impl BranchPassword {
    /// Hash `plaintext` with bcrypt at the given cost.
    pub fn hash(
        user: impl Into<String>,
        plaintext: &str,
        cost: u32,
    ) -> Result<Self, bcrypt::BcryptError> {
        Ok(Self {
            user: user.into(),
            hash: bcrypt::hash(plaintext, cost)?,
        })
    }

    /// Check a candidate plaintext against the stored hash.
    pub fn verify(&self, candidate: &str) -> bool {
        bcrypt::verify(candidate, &self.hash).unwrap_or(false)
    }
}

impl fmt::Debug for BranchPassword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BranchPassword")
            .field("user", &self.user)
            .field("hash", &"[REDACTED]")
            .finish()
    }
}

// ── Redirects ───────────────────────────────────────────────────────

/// HTTP status family used when a redirect fires.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectKind {
    #[default]
    Permanent,
    Temporary,
}

impl RedirectKind {
    pub fn status_code(self) -> u16 {
        match self {
            Self::Permanent => 301,
            Self::Temporary => 302,
        }
    }
}

/// Source-path → target mapping applied before content is served.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Redirect {
    /// Request path to match, starting with `/`.
    pub path: String,
    /// Location sent back to the client.
    pub target: String,
    #[serde(default)]
    pub kind: RedirectKind,
}

impl Redirect {
    pub fn new(path: impl Into<String>, target: impl Into<String>, kind: RedirectKind) -> Self {
        Self {
            path: path.into(),
            target: target.into(),
            kind,
        }
    }
}
