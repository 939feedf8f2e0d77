//! Request handler module
//!
//! Static file serving with cross-origin isolation headers on every response.

pub mod listing;
pub mod path;
pub mod router;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
