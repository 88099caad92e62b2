//! HTTP protocol layer module
//!
//! Response builders and request form decoding, decoupled from page logic.

pub mod form;
pub mod response;

// Re-export commonly used types
pub use form::{form_value, FormSource};
pub use response::{
    build_400_response, build_404_response, build_413_response, build_500_response,
    build_html_response, build_redirect_response, with_server_header,
};
