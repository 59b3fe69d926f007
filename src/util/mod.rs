//! Utility functions shared across the crate.
//!
//! - **URL validation**: base URL and thumbnail URL checks
//! - **Text processing**: terminal-width truncation and HTML-to-text for article bodies
//!
//! ```
//! use newsdesk::util::{excerpt, truncate_to_width};
//!
//! let row = excerpt("<p>Getting started with <em>React</em></p>", 120);
//! assert_eq!(truncate_to_width(&row, 15), "Getting star...");
//! ```

mod text;
mod url_validator;

pub use text::{
    display_width, excerpt, html_to_text, strip_control_chars, truncate_to_width, EXCERPT_CHARS,
};
pub use url_validator::{validate_base_url, validate_image_url, UrlValidationError};
