//! # canopy-query
//!
//! JQL-style filtering over issue records.
//!
//! ```text
//! "project = PHX AND status IN (\"To Do\", Done)"
//!     → parse    → [Condition, Condition]
//!     → evaluate → AND over every condition, per record
//! ```
//!
//! The grammar is deliberately small: comparisons and `IN` lists joined by
//! `AND`. Anything the scanner does not recognise is dropped, so a malformed
//! query matches a superset of what a well-formed one would.

pub mod eval;
pub mod parse;
pub mod record;

pub use eval::{evaluate, matches_all, search};
pub use parse::{Condition, ConditionValue, Operator, parse};
pub use record::{FieldValue, QueryField, QueryRecord};
