//! Front-end build configuration.
//!
//! SYSTEM CONTEXT
//! ==============
//! The SvelteKit front-end under `front/` is configured by two static files:
//! the utility-CSS scan config and the dev-server config. Their values are a
//! contract with this backend (the proxy table names the routes we serve) and
//! with the gallery markup (the safelist names classes built at runtime).
//! This module holds the same values as typed data so the server and CLI can
//! check and emit them.

pub mod dev_server;
pub mod style;

pub use dev_server::{DevServerConfig, ProxyRule, ProxyTable, dev_server_config};
pub use style::{StyleConfig, style_config};

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
