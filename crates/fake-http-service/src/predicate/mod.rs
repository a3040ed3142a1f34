//! Request predicates and the fluent filter builder.
//!
//! - `condition` - Tests over a single facet (`equals`, `ends_with`, closures, ...)
//! - `filter` - Labelled predicates over a whole request and their AND/OR/NOT composition
//! - `builder` - `FilterBuilder`, the chain behind `on_request()`

mod builder;
mod condition;
mod filter;

pub use builder::FilterBuilder;
pub use condition::{
    contains, described, ends_with, equals, matches_regex, starts_with, Condition, Described,
    StringCondition,
};
pub use filter::RequestPredicate;
