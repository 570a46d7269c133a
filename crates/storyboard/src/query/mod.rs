//! Condition evaluation and collection projection.
//!
//! Conditions gate content on the data context; collections filter, sort
//! and paginate an array from it. Both are pure functions of a property
//! table and an optional data object.

pub mod collection;
pub mod condition;
pub mod scalar;

pub use collection::{Collection, Limit, SortDescriptor, run_pipeline};
pub use condition::{Condition, Conditional, Predicate};
pub use scalar::Scalar;
