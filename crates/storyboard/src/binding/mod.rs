//! Value binding: property tables, key-paths and literal-or-bound variables.
//!
//! Everything here is a pure function of its inputs. Nothing in this module
//! knows about the node graph.

pub mod interpolate;
pub mod keypath;
pub mod property;
pub mod variable;

pub use interpolate::interpolate;
pub use keypath::{Found, lookup, lookup_data};
pub use property::{AssetRef, Properties, PropertyValue};
pub use variable::{Bindable, Binding, Variable, format_number};
