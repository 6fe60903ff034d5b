//! Polygon mesh data structures.
//!
//! The main data structure is the [`HalfEdgeMesh`]: it stores positions and
//! the full connectivity of a polygon surface and keeps it consistent while
//! vertices, edges and faces are added and removed. The
//! [`FaceVertexMesh`] is a much simpler representation that half edge meshes
//! can be exported to.
//!
//!
//! # Compile time configuration
//!
//! The half edge mesh is configured at compile time by passing a type that
//! implements [`Config`] as generic parameter. Right now, the only thing to
//! configure is the kind of faces the mesh can store: [`PolyConfig`] allows
//! arbitrary polygons, [`TriConfig`] only triangles. Operations that only
//! make sense for triangle meshes (like the [remeshing
//! operators][crate::algo::remesh]) require `Config<FaceKind = TriFaces>`,
//! so using them with a polygon mesh is a compile error.
//!
//! To create your own configuration, create a new enum type without any
//! variants (e.g. `enum MyConfig {}`) and implement `Config` for it.

use crate::sealed::Sealed;

pub mod face_vertex;
pub mod half_edge;

pub use self::{
    face_vertex::FaceVertexMesh,
    half_edge::HalfEdgeMesh,
};


// ===========================================================================
// ===== `FaceKind`
// ===========================================================================

/// A kind of faces a mesh data structure can store. Either [`TriFaces`] or
/// [`PolyFaces`].
///
/// This is a sealed trait, meaning you cannot implement it for your own types.
/// This library provides exactly two types that implement this trait.
pub trait FaceKind: Sealed {
    const ONLY_TRIANGLES: bool;
}

/// Only triangular faces are supported.
#[allow(missing_debug_implementations)]
pub enum TriFaces {}
impl Sealed for TriFaces {}
impl FaceKind for TriFaces {
    const ONLY_TRIANGLES: bool = true;
}

/// Arbitrary polygons are allowed as faces.
#[allow(missing_debug_implementations)]
pub enum PolyFaces {}
impl Sealed for PolyFaces {}
impl FaceKind for PolyFaces {
    const ONLY_TRIANGLES: bool = false;
}


// ===========================================================================
// ===== `Config`
// ===========================================================================

/// Compile-time configuration for [`HalfEdgeMesh`].
pub trait Config: 'static {
    /// What kind of faces are allowed in this half edge mesh.
    type FaceKind: FaceKind;
}

/// The standard configuration for the half edge mesh. Poly faces are
/// supported.
#[allow(missing_debug_implementations)]
pub enum PolyConfig {}
impl Config for PolyConfig {
    type FaceKind = PolyFaces;
}

/// Configuration for pure triangle meshes.
#[allow(missing_debug_implementations)]
pub enum TriConfig {}
impl Config for TriConfig {
    type FaceKind = TriFaces;
}
