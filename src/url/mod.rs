//! URL handling module for Spider-Index
//!
//! Link following is restricted to the host of the page a link was found on.

mod domain;

pub use domain::{extract_host, is_same_domain};
