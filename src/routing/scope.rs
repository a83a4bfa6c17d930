//! Compiled configuration scopes and per-request lookup.
//!
//! The tree is built once per configuration load. Every scope carries its
//! fully merged settings, so a request only has to find its scope.

use std::sync::Arc;

use axum::body::Body;
use axum::http::Request;

use crate::config::RemoveIpConfig;
use crate::masking::{MaskingPolicy, Toggle};
use crate::routing::matcher::{HostMatcher, Matcher, PathPrefixMatcher};
use crate::security::AccessRules;

/// Resolved settings for one global, server or location scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Scope {
    name: String,
    masking: MaskingPolicy,
    access: AccessRules,
}

impl Scope {
    pub fn new(name: impl Into<String>, masking: MaskingPolicy, access: AccessRules) -> Self {
        Self {
            name: name.into(),
            masking,
            access,
        }
    }

    /// Name used in logs and metric labels.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn masking(&self) -> MaskingPolicy {
        self.masking
    }

    pub fn access(&self) -> &AccessRules {
        &self.access
    }
}

#[derive(Debug)]
struct LocationScope {
    matcher: PathPrefixMatcher,
    scope: Arc<Scope>,
}

#[derive(Debug)]
struct ServerScope {
    host: Option<HostMatcher>,
    scope: Arc<Scope>,
    /// Sorted by prefix length, longest first.
    locations: Vec<LocationScope>,
}

impl ServerScope {
    fn resolve(&self, req: &Request<Body>) -> &Arc<Scope> {
        self.locations
            .iter()
            .find(|location| location.matcher.matches(req))
            .map(|location| &location.scope)
            .unwrap_or(&self.scope)
    }
}

/// Immutable scope hierarchy: global → servers → locations.
#[derive(Debug)]
pub struct ScopeTree {
    global: Arc<Scope>,
    servers: Vec<ServerScope>,
}

impl ScopeTree {
    /// Merge every scope with its parent and freeze the result.
    pub fn compile(config: &RemoveIpConfig) -> Self {
        let global_toggle = config.removeip.merge(Toggle::Unset);
        let global = Arc::new(Scope::new(
            "global",
            MaskingPolicy::from_merged(global_toggle),
            config.access.clone(),
        ));

        let servers = config
            .servers
            .iter()
            .map(|server| {
                let server_toggle = server.removeip.merge(global_toggle);
                let server_access = server.access.merge(global.access());

                let mut locations: Vec<LocationScope> = server
                    .locations
                    .iter()
                    .map(|location| LocationScope {
                        matcher: PathPrefixMatcher::new(location.path_prefix.clone()),
                        scope: Arc::new(Scope::new(
                            format!("{}{}", server.name, location.path_prefix),
                            MaskingPolicy::from_merged(location.removeip.merge(server_toggle)),
                            location.access.merge(&server_access),
                        )),
                    })
                    .collect();
                locations.sort_by(|a, b| b.matcher.prefix().len().cmp(&a.matcher.prefix().len()));

                ServerScope {
                    host: server.host.as_ref().map(HostMatcher::new),
                    scope: Arc::new(Scope::new(
                        server.name.clone(),
                        MaskingPolicy::from_merged(server_toggle),
                        server_access,
                    )),
                    locations,
                }
            })
            .collect();

        Self { global, servers }
    }

    /// Find the scope for a request.
    ///
    /// Server selection: first server whose host matches, then the first
    /// server without a host, then the global scope.
    pub fn resolve(&self, req: &Request<Body>) -> Arc<Scope> {
        let server = self
            .servers
            .iter()
            .find(|s| s.host.as_ref().is_some_and(|h| h.matches(req)))
            .or_else(|| self.servers.iter().find(|s| s.host.is_none()));

        match server {
            Some(server) => Arc::clone(server.resolve(req)),
            None => Arc::clone(&self.global),
        }
    }

    pub fn global(&self) -> &Arc<Scope> {
        &self.global
    }
}

impl Default for ScopeTree {
    fn default() -> Self {
        Self::compile(&RemoveIpConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LocationConfig, ServerConfig};

    fn request(host: &str, path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header("Host", host)
            .body(Body::empty())
            .unwrap()
    }

    fn location(prefix: &str, removeip: Toggle) -> LocationConfig {
        LocationConfig {
            path_prefix: prefix.into(),
            removeip,
            ..Default::default()
        }
    }

    #[test]
    fn nothing_configured_is_off() {
        let tree = ScopeTree::default();
        let scope = tree.resolve(&request("any", "/"));
        assert_eq!(scope.name(), "global");
        assert!(!scope.masking().enabled());
    }

    #[test]
    fn server_inherits_global_on() {
        let config = RemoveIpConfig {
            removeip: Toggle::On,
            servers: vec![ServerConfig {
                name: "site".into(),
                locations: vec![location("/app", Toggle::Unset)],
                ..Default::default()
            }],
            ..Default::default()
        };
        let tree = ScopeTree::compile(&config);

        assert!(tree.resolve(&request("x", "/")).masking().enabled());
        assert!(tree.resolve(&request("x", "/app/1")).masking().enabled());
    }

    #[test]
    fn location_overrides_server() {
        let config = RemoveIpConfig {
            servers: vec![ServerConfig {
                name: "site".into(),
                host: Some("example.com".into()),
                removeip: Toggle::Off,
                locations: vec![
                    location("/private", Toggle::On),
                    location("/private/open", Toggle::Off),
                ],
                ..Default::default()
            }],
            ..Default::default()
        };
        let tree = ScopeTree::compile(&config);

        let host = "example.com";
        assert!(!tree.resolve(&request(host, "/")).masking().enabled());
        assert!(tree.resolve(&request(host, "/private/x")).masking().enabled());
        let open = tree.resolve(&request(host, "/private/open/x"));
        assert_eq!(open.name(), "site/private/open");
        assert!(!open.masking().enabled());
    }

    #[test]
    fn host_match_before_default_server() {
        let config = RemoveIpConfig {
            servers: vec![
                ServerConfig {
                    name: "default".into(),
                    removeip: Toggle::Off,
                    ..Default::default()
                },
                ServerConfig {
                    name: "masked".into(),
                    host: Some("hidden.example".into()),
                    removeip: Toggle::On,
                    ..Default::default()
                },
            ],
            ..Default::default()
        };
        let tree = ScopeTree::compile(&config);

        assert_eq!(tree.resolve(&request("hidden.example", "/")).name(), "masked");
        assert_eq!(tree.resolve(&request("other", "/")).name(), "default");
    }

    #[test]
    fn unmatched_host_without_default_uses_global() {
        let config = RemoveIpConfig {
            removeip: Toggle::On,
            servers: vec![ServerConfig {
                name: "only".into(),
                host: Some("a.example".into()),
                removeip: Toggle::Off,
                ..Default::default()
            }],
            ..Default::default()
        };
        let tree = ScopeTree::compile(&config);

        let scope = tree.resolve(&request("b.example", "/"));
        assert_eq!(scope.name(), "global");
        assert!(scope.masking().enabled());
    }

    #[test]
    fn access_rules_inherit_down_the_tree() {
        let mut config = RemoveIpConfig::default();
        config.access.deny = vec!["203.0.113.7".parse().unwrap()];
        config.servers = vec![ServerConfig {
            name: "site".into(),
            locations: vec![location("/x", Toggle::Unset)],
            ..Default::default()
        }];
        let tree = ScopeTree::compile(&config);

        let scope = tree.resolve(&request("h", "/x"));
        assert_eq!(scope.access(), &config.access);
    }
}
