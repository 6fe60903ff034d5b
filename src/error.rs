//! The error type of all fallible mesh operations.

use failure::Fail;

use crate::handle::{EdgeHandle, FaceHandle, HalfEdgeHandle, VertexHandle};


/// Everything that can go wrong when manipulating or querying a mesh.
///
/// Operations check their preconditions before touching the mesh, so an
/// error usually means nothing was changed. The exception is a failing fan
/// relink inside [`add_face`][crate::HalfEdgeMesh::add_face]: fan blades
/// reordered before the failure stay reordered (the mesh is still
/// consistent, it just might look different). Do not blindly retry.
#[derive(Debug, Clone, PartialEq, Eq, Fail)]
pub enum MeshError {
    #[fail(display = "{:?} does not exist in this mesh", _0)]
    VertexNotFound(VertexHandle),

    #[fail(display = "{:?} does not exist in this mesh", _0)]
    HalfEdgeNotFound(HalfEdgeHandle),

    #[fail(display = "{:?} does not exist in this mesh", _0)]
    EdgeNotFound(EdgeHandle),

    #[fail(display = "{:?} does not exist in this mesh", _0)]
    FaceNotFound(FaceHandle),

    #[fail(display = "{:?} is still connected to half edges and cannot be erased", _0)]
    VertexNotIsolated(VertexHandle),

    #[fail(display = "{:?} is not on the boundary, nothing can be attached to it", _0)]
    VertexNotOnBoundary(VertexHandle),

    #[fail(display = "{:?} appears more than once in the vertex list of the new face", _0)]
    DuplicateVertex(VertexHandle),

    #[fail(display = "a face needs at least 3 vertices, but {} were given", _0)]
    TooFewVertices(usize),

    #[fail(display = "this mesh only stores triangles, but a face with {} vertices was given", _0)]
    NotATriangle(usize),

    #[fail(display = "new face would add a non-manifold edge ({:?} already has a face)", _0)]
    NonManifoldEdge(HalfEdgeHandle),

    #[fail(display = "new face would add a non-manifold vertex (no hole found around {:?})", _0)]
    NonManifoldVertex(VertexHandle),

    #[fail(display = "{:?} is a boundary edge, but an interior edge is required", _0)]
    BoundaryEdge(EdgeHandle),

    #[fail(display = "there already is an edge between {:?} and {:?}", _0, _1)]
    EdgeExists(VertexHandle, VertexHandle),

    #[fail(display = "collapsing {:?} would make the mesh non-manifold", _0)]
    CollapseNotAllowed(EdgeHandle),
}
