//! Reexports of all important traits of this library for convenience.
//!
//! As with every prelude, the main usage is to glob import everything from
//! this module:
//!
//! ```
//! use hemesh::prelude::*;
//! ```
//!
//! Now you have all important traits in scope.

pub use crate::{
    Handle,
    ds::{Config, FaceKind},
    math::Position,
    traits::{Element, Mesh},
};
