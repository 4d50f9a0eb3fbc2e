// Caddy admin API wire types
//
// Only the slice of Caddy's JSON config that per-branch routes need:
// host/path matchers and the subroute, static_response, file_server and
// authentication handlers. Field names follow Caddy's JSON exactly.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

// ── Route ────────────────────────────────────────────────────────────

/// One entry of `apps.http.servers.{name}.routes`.
///
/// `@id` makes the route addressable through `/id/{id}` so it can be
/// replaced or deleted without knowing its position in the route list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Route {
    #[serde(rename = "@id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "match", default, skip_serializing_if = "Vec::is_empty")]
    pub matchers: Vec<MatchSet>,
    #[serde(default)]
    pub handle: Vec<Handler>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub terminal: bool,
}

/// A matcher set; all populated fields must match.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSet {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub host: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub path: Vec<String>,
}

impl MatchSet {
    pub fn hosts(hosts: Vec<String>) -> Self {
        Self {
            host: hosts,
            path: Vec::new(),
        }
    }

    pub fn path(path: impl Into<String>) -> Self {
        Self {
            host: Vec::new(),
            path: vec![path.into()],
        }
    }
}

// ── Handlers ─────────────────────────────────────────────────────────

/// HTTP handler modules, tagged by Caddy's `"handler"` discriminator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "handler", rename_all = "snake_case")]
pub enum Handler {
    Subroute {
        routes: Vec<Route>,
    },
    StaticResponse {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        status_code: Option<u16>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, Vec<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        body: Option<String>,
    },
    FileServer {
        root: String,
    },
    Authentication {
        providers: AuthProviders,
    },
}

impl Handler {
    /// `static_response` that redirects to `location` with `status`.
    pub fn redirect(location: impl Into<String>, status: u16) -> Self {
        let mut headers = BTreeMap::new();
        headers.insert("Location".to_owned(), vec![location.into()]);
        Self::StaticResponse {
            status_code: Some(status),
            headers,
            body: None,
        }
    }

    /// `http_basic` authentication with a single bcrypt account.
    pub fn basic_auth(username: impl Into<String>, password_hash: impl Into<String>) -> Self {
        Self::Authentication {
            providers: AuthProviders {
                http_basic: HttpBasic {
                    accounts: vec![Account {
                        username: username.into(),
                        password: password_hash.into(),
                    }],
                    hash: HashAlgorithm {
                        algorithm: "bcrypt".into(),
                    },
                    realm: None,
                },
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthProviders {
    pub http_basic: HttpBasic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpBasic {
    pub accounts: Vec<Account>,
    pub hash: HashAlgorithm,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub realm: Option<String>,
}

/// Basic-auth account. `password` is a bcrypt hash in modular crypt
/// format (`$2b$...`), never plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashAlgorithm {
    pub algorithm: String,
}

// ── Errors ───────────────────────────────────────────────────────────

/// Error body returned by the admin API on failure.
#[derive(Debug, Deserialize)]
pub struct AdminError {
    pub error: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn route_serializes_caddy_field_names() {
        let route = Route {
            id: Some("site-s1-branch-b1".into()),
            matchers: vec![MatchSet::hosts(vec!["b1.s1.example.com".into()])],
            handle: vec![Handler::FileServer {
                root: "/sites/s1/r1".into(),
            }],
            terminal: true,
        };

        let value = serde_json::to_value(&route).unwrap();
        assert_eq!(
            value,
            json!({
                "@id": "site-s1-branch-b1",
                "match": [{ "host": ["b1.s1.example.com"] }],
                "handle": [{ "handler": "file_server", "root": "/sites/s1/r1" }],
                "terminal": true
            })
        );
    }

    #[test]
    fn redirect_handler_sets_location_header() {
        let value = serde_json::to_value(Handler::redirect("/new", 301)).unwrap();
        assert_eq!(
            value,
            json!({
                "handler": "static_response",
                "status_code": 301,
                "headers": { "Location": ["/new"] }
            })
        );
    }

    #[test]
    fn basic_auth_uses_bcrypt() {
        let value = serde_json::to_value(Handler::basic_auth("alice", "$2b$04$hash")).unwrap();
        assert_eq!(value["handler"], "authentication");
        assert_eq!(value["providers"]["http_basic"]["hash"]["algorithm"], "bcrypt");
        assert_eq!(
            value["providers"]["http_basic"]["accounts"][0]["password"],
            "$2b$04$hash"
        );
    }

    #[test]
    fn route_round_trips_from_admin_json() {
        let raw = json!({
            "@id": "x",
            "match": [{ "host": ["a.example.com"] }],
            "handle": [
                { "handler": "subroute", "routes": [] },
                { "handler": "static_response", "status_code": 404, "body": "none" }
            ]
        });
        let route: Route = serde_json::from_value(raw).unwrap();
        assert_eq!(route.id.as_deref(), Some("x"));
        assert!(!route.terminal);
        assert_eq!(route.handle.len(), 2);
    }
}
