//! Local static file server for pages that need cross-origin isolation.
//!
//! Every response carries `Cross-Origin-Opener-Policy: same-origin` and
//! `Cross-Origin-Embedder-Policy: require-corp`, which browsers require
//! before exposing `SharedArrayBuffer`.

pub mod config;
pub mod handler;
pub mod http;
pub mod logger;
pub mod server;
