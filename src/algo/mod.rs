//! Algorithms operating on meshes.

pub mod remesh;
