//! A half edge mesh kernel.
//!
//! This crate stores polygon meshes as [`HalfEdgeMesh`]: every edge is split
//! into two directed half edges, each knowing its successor and predecessor
//! around a face (or around a hole), its pair and its face. Vertices and
//! faces store one representative half edge. With this, all local adjacency
//! queries are answered without searching the whole mesh.
//!
//! Elements live in arenas owned by the mesh and are referred to via
//! [handles][handle]. Removing elements never changes the handles of other
//! elements. [`HalfEdgeMesh::clean`] compacts the arenas again.
//!
//! ```
//! use hemesh::{HalfEdgeMesh, prelude::*};
//!
//! let mut mesh = HalfEdgeMesh::<[f32; 3]>::new();
//! let a = mesh.add_vertex([0.0, 0.0, 0.0]);
//! let b = mesh.add_vertex([1.0, 0.0, 0.0]);
//! let c = mesh.add_vertex([0.0, 1.0, 0.0]);
//! let f = mesh.add_face(&[a, b, c]).unwrap();
//!
//! assert_eq!(mesh.num_edges(), 3);
//! assert_eq!(mesh.face_valence(f).unwrap(), 3);
//! assert!(mesh.edges().all(|e| e.is_boundary()));
//! ```
//!
//! Besides the half edge mesh, there is a simple [face-vertex
//! representation][FaceVertexMesh] to export to, and [remeshing
//! operators][algo::remesh] for triangle meshes.

#[cfg(test)]
#[macro_use]
mod test_utils;

pub mod algo;
pub mod ds;
pub mod error;
pub mod handle;
pub mod map;
pub mod math;
pub mod prelude;
pub mod traits;

pub use self::{
    ds::{
        Config, FaceKind, PolyConfig, PolyFaces, TriConfig, TriFaces,
        FaceVertexMesh, HalfEdgeMesh,
    },
    error::MeshError,
    handle::{hsize, EdgeHandle, FaceHandle, HalfEdgeHandle, Handle, VertexHandle},
    math::Position,
};


/// Used for sealed traits.
mod sealed {
    pub trait Sealed {}
}
