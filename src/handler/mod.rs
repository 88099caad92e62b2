//! Request handler module
//!
//! Responsible for request routing dispatch and the view/edit/save page
//! operations.

pub mod router;
pub mod wiki;

// Re-export main entry point
pub use router::handle_request;
