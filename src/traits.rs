//! Small capability traits shared by the mesh representations of this crate.

use crate::handle::{hsize, Handle, FaceHandle, VertexHandle, EdgeHandle};


/// A record stored in a mesh: it knows its own handle.
///
/// Records are plain data. They only expose read access to their
/// connectivity; changing it is the job of the mesh that owns them.
pub trait Element {
    type Handle: Handle;

    /// Returns the handle of this element in its mesh.
    fn handle(&self) -> Self::Handle;
}

/// Some kind of polygon mesh with vertices, full edges and faces.
///
/// Both the half edge mesh and the face-vertex mesh implement this, so
/// code only interested in counts and membership can work with either.
pub trait Mesh {
    /// Returns the number of vertices in this mesh.
    fn num_vertices(&self) -> hsize;

    /// Returns the number of full edges in this mesh.
    fn num_edges(&self) -> hsize;

    /// Returns the number of faces in this mesh.
    fn num_faces(&self) -> hsize;

    fn contains_vertex(&self, vertex: VertexHandle) -> bool;
    fn contains_edge(&self, edge: EdgeHandle) -> bool;
    fn contains_face(&self, face: FaceHandle) -> bool;

    /// Returns `true` if the mesh has no vertices (and thus nothing else).
    fn is_empty(&self) -> bool {
        self.num_vertices() == 0
    }
}
