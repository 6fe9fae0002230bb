//! picbox: random image gallery backend.
//!
//! Indexes the images in an S3-compatible bucket (or a local directory) and
//! serves them to the SvelteKit front-end under `/random`, `/obj` and `/dir`.

pub mod config;
pub mod frontend;
pub mod routes;
pub mod services;
pub mod state;
pub mod store;
