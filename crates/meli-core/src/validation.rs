// ── Input validation ──
//
// Field bounds checked before any store access. Failures carry the
// offending field name.

use crate::error::CoreError;
use crate::model::{Redirect, ReleaseId, STRING_MAX_LENGTH};

/// bcrypt ignores everything past this many bytes.
pub const PASSWORD_MAX_BYTES: usize = 72;

fn bounded(field: &str, value: &str) -> Result<(), CoreError> {
    if value.trim().is_empty() {
        return Err(CoreError::validation(field, "must not be empty"));
    }
    if value.chars().count() > STRING_MAX_LENGTH {
        return Err(CoreError::validation(
            field,
            format!("must be at most {STRING_MAX_LENGTH} characters"),
        ));
    }
    Ok(())
}

pub(crate) fn name(value: &str) -> Result<(), CoreError> {
    bounded("name", value)
}

/// Slugs become DNS labels: `[a-z0-9-]`, no leading or trailing `-`.
pub(crate) fn slug(value: &str) -> Result<(), CoreError> {
    bounded("slug", value)?;
    if !value
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
    {
        return Err(CoreError::validation(
            "slug",
            "may only contain lowercase letters, digits and '-'",
        ));
    }
    if value.starts_with('-') || value.ends_with('-') {
        return Err(CoreError::validation(
            "slug",
            "must not start or end with '-'",
        ));
    }
    Ok(())
}

pub(crate) fn release(value: &ReleaseId) -> Result<(), CoreError> {
    bounded("release", value.as_str())
}

pub(crate) fn user(value: &str) -> Result<(), CoreError> {
    bounded("user", value)?;
    // Caddy's basic-auth header splits on the first ':'.
    if value.contains(':') {
        return Err(CoreError::validation("user", "must not contain ':'"));
    }
    Ok(())
}

pub(crate) fn password(value: &str) -> Result<(), CoreError> {
    if value.is_empty() {
        return Err(CoreError::validation("password", "must not be empty"));
    }
    if value.len() > PASSWORD_MAX_BYTES {
        return Err(CoreError::validation(
            "password",
            format!("must be at most {PASSWORD_MAX_BYTES} bytes"),
        ));
    }
    Ok(())
}

pub(crate) fn redirects(rules: &[Redirect]) -> Result<(), CoreError> {
    for (i, rule) in rules.iter().enumerate() {
        bounded(&format!("redirects[{i}].path"), &rule.path)?;
        bounded(&format!("redirects[{i}].target"), &rule.target)?;
        if !rule.path.starts_with('/') {
            return Err(CoreError::validation(
                &format!("redirects[{i}].path"),
                "must start with '/'",
            ));
        }
    }
    Ok(())
}
