//! Fileflow decision engine.
//!
//! Pure functions only: rule matching, action resolution, first-match rule
//! selection, coarse classification, and MIME sniffing. No I/O happens here;
//! the worker stages feed these functions with data fetched at the
//! boundaries and apply their results.

pub mod classifier;
pub mod matcher;
pub mod mime;
pub mod resolver;
pub mod selector;

pub use classifier::classify;
pub use matcher::rule_matches;
pub use mime::{detect_mime_type, SNIFF_LEN};
pub use resolver::resolve_actions;
pub use selector::select_rule;
