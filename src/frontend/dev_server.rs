//! Dev-server configuration and its proxy table.
//!
//! Mirrors `front/vite.config.ts`. During front-end development the dev
//! server forwards the backend's three path namespaces to this process.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

/// Upstream every backend prefix is forwarded to.
pub const BACKEND_UPSTREAM: &str = "http://127.0.0.1:8080";

/// Path namespaces served by the backend, in proxy-table order.
pub const BACKEND_PREFIXES: [&str; 3] = ["/random", "/obj", "/dir"];

/// Framework integration plugin registered with the bundler.
pub const FRAMEWORK_PLUGIN: &str = "sveltekit";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DevServerConfig {
    pub plugins: Vec<String>,
    pub server: ServerSection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerSection {
    pub proxy: ProxyTable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyRule {
    pub prefix: String,
    pub target: String,
}

impl ProxyRule {
    /// URL the request is forwarded to. Path and query pass through unmodified.
    #[must_use]
    pub fn forward_url(&self, path_and_query: &str) -> String {
        format!("{}{path_and_query}", self.target.trim_end_matches('/'))
    }

    /// `host:port` of the target, with the scheme's default port filled in.
    /// `None` if the target is not an absolute URL with a host.
    #[must_use]
    pub fn authority(&self) -> Option<String> {
        let url = reqwest::Url::parse(&self.target).ok()?;
        let host = url.host_str()?;
        match url.port_or_known_default() {
            Some(port) => Some(format!("{host}:{port}")),
            None => Some(host.to_owned()),
        }
    }
}

/// Ordered prefix → upstream mapping.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProxyTable {
    rules: Vec<ProxyRule>,
}

impl ProxyTable {
    /// Add a rule. A prefix that is already present keeps its position and
    /// takes the new target.
    #[must_use]
    pub fn with_rule(mut self, prefix: &str, target: &str) -> Self {
        if let Some(rule) = self.rules.iter_mut().find(|r| r.prefix == prefix) {
            rule.target = target.to_owned();
        } else {
            self.rules.push(ProxyRule { prefix: prefix.to_owned(), target: target.to_owned() });
        }
        self
    }

    #[must_use]
    pub fn rules(&self) -> &[ProxyRule] {
        &self.rules
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    #[must_use]
    pub fn get(&self, prefix: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.prefix == prefix)
            .map(|r| r.target.as_str())
    }

    /// First rule whose prefix starts the request path.
    #[must_use]
    pub fn resolve(&self, path: &str) -> Option<&ProxyRule> {
        self.rules.iter().find(|r| path.starts_with(&r.prefix))
    }

    /// Distinct upstream authorities, in first-seen order.
    #[must_use]
    pub fn upstream_authorities(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for authority in self.rules.iter().filter_map(ProxyRule::authority) {
            if !out.contains(&authority) {
                out.push(authority);
            }
        }
        out
    }
}

impl Serialize for ProxyTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.rules.len()))?;
        for rule in &self.rules {
            map.serialize_entry(&rule.prefix, &rule.target)?;
        }
        map.end()
    }
}

/// Build the dev-server configuration from its literal values.
#[must_use]
pub fn dev_server_config() -> DevServerConfig {
    let proxy = BACKEND_PREFIXES
        .iter()
        .fold(ProxyTable::default(), |table, prefix| table.with_rule(prefix, BACKEND_UPSTREAM));
    DevServerConfig { plugins: vec![FRAMEWORK_PLUGIN.to_owned()], server: ServerSection { proxy } }
}

impl DevServerConfig {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
