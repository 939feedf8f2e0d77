//! HTTP protocol layer module
//!
//! Protocol-level helpers shared by the static file handler: content types,
//! cache validators, response builders and the isolation header injector.

pub mod cache;
pub mod isolation;
pub mod mime;
pub mod response;

// Re-export commonly used builders
pub use response::{
    build_301_response, build_304_response, build_404_response, build_501_response,
    build_file_response, build_html_response, FileMeta,
};
