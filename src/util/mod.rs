//! Utility functions for common operations.
//!
//! - **URL validation**: the API base URL and reference links opened in a browser
//! - **Text processing**: Unicode-aware width, truncation and terminal sanitizing
//!
//! # Examples
//!
//! ```
//! use knowtree::util::{display_width, truncate_to_width, validate_base_url};
//!
//! let base = validate_base_url("http://localhost:8080").unwrap();
//! assert_eq!(base.host_str(), Some("localhost"));
//!
//! assert_eq!(display_width("Rust"), 4);
//! assert_eq!(truncate_to_width("Network Protocols", 10), "Network...");
//! ```

mod text;
mod url_validator;

pub use text::{display_width, single_line, strip_control_chars, truncate_to_width};
pub use url_validator::{extract_links, validate_base_url, validate_url_for_open, UrlValidationError};

/// Maximum accepted search query length.
pub const MAX_SEARCH_QUERY_LENGTH: usize = 256;
