//! Security utilities.

pub mod xss;

pub use xss::{escape_html, escape_html_attr, is_safe_url, strip_tags_safe};
