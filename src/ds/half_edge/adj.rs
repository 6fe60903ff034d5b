//! Adjacency queries: circulating around vertices and faces.

use std::fmt;

use crate::{
    error::MeshError,
    handle::{EdgeHandle, FaceHandle, HalfEdgeHandle, VertexHandle},
};
use super::{Config, HalfEdgeMesh};


/// Iterates over the outgoing half edges of one vertex.
///
/// Starting at the vertex' `outgoing` half edge, the next outgoing half edge
/// is always `next(pair(current))`. Since all half edges around a vertex form
/// one cycle, this visits every outgoing half edge exactly once, even for
/// vertices with several fan blades.
pub struct VertexCirculator<'a, P, C: Config> {
    mesh: &'a HalfEdgeMesh<P, C>,
    start: Option<HalfEdgeHandle>,
    current: Option<HalfEdgeHandle>,
}

impl<'a, P, C: Config> VertexCirculator<'a, P, C> {
    /// `start == None` is used for isolated vertices: the iterator is empty.
    pub(super) fn new(mesh: &'a HalfEdgeMesh<P, C>, start: Option<HalfEdgeHandle>) -> Self {
        Self { mesh, start, current: start }
    }
}

impl<P, C: Config> Iterator for VertexCirculator<'_, P, C> {
    type Item = HalfEdgeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        let next = self.mesh.half_edges[current.pair()].next;
        self.current = if Some(next) == self.start { None } else { Some(next) };
        Some(current)
    }
}

/// Iterates over the half edges of one loop (the loop around a face or
/// around a hole) by following `next`.
pub struct FaceCirculator<'a, P, C: Config> {
    mesh: &'a HalfEdgeMesh<P, C>,
    start: HalfEdgeHandle,
    current: Option<HalfEdgeHandle>,
}

impl<'a, P, C: Config> FaceCirculator<'a, P, C> {
    pub(super) fn new(mesh: &'a HalfEdgeMesh<P, C>, start: HalfEdgeHandle) -> Self {
        Self { mesh, start, current: Some(start) }
    }
}

impl<P, C: Config> Iterator for FaceCirculator<'_, P, C> {
    type Item = HalfEdgeHandle;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.current?;
        let next = self.mesh.half_edges[current].next;
        self.current = if next == self.start { None } else { Some(next) };
        Some(current)
    }
}

impl<P, C: Config> fmt::Debug for VertexCirculator<'_, P, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "VertexCirculator {{ start: {:?}, current: {:?} }}", self.start, self.current)
    }
}

impl<P, C: Config> fmt::Debug for FaceCirculator<'_, P, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "FaceCirculator {{ start: {:?}, current: {:?} }}", self.start, self.current)
    }
}


impl<P, C: Config> HalfEdgeMesh<P, C> {
    /// Returns all half edges starting at `vertex`. For isolated vertices,
    /// the iterator is empty.
    pub fn outgoing_half_edges(
        &self,
        vertex: VertexHandle,
    ) -> Result<VertexCirculator<'_, P, C>, MeshError> {
        self.check_vertex(vertex)?;
        Ok(self.circulate_around_vertex(vertex))
    }

    /// Returns all half edges ending at `vertex`.
    pub fn incoming_half_edges(
        &self,
        vertex: VertexHandle,
    ) -> Result<impl Iterator<Item = HalfEdgeHandle> + '_, MeshError> {
        Ok(self.outgoing_half_edges(vertex)?.map(|he| he.pair()))
    }

    /// Returns all vertices connected to `vertex` by an edge.
    pub fn neighbors(
        &self,
        vertex: VertexHandle,
    ) -> Result<impl Iterator<Item = VertexHandle> + '_, MeshError> {
        Ok(self.outgoing_half_edges(vertex)?.map(move |he| self.half_edges[he].end))
    }

    /// Returns all faces `vertex` is a corner of.
    pub fn adjacent_faces(
        &self,
        vertex: VertexHandle,
    ) -> Result<impl Iterator<Item = FaceHandle> + '_, MeshError> {
        Ok(self.outgoing_half_edges(vertex)?
            .filter_map(move |he| self.half_edges[he].face.into_option()))
    }

    /// Returns the number of edges adjacent to `vertex`.
    pub fn valence(&self, vertex: VertexHandle) -> Result<usize, MeshError> {
        Ok(self.outgoing_half_edges(vertex)?.count())
    }

    /// Returns the half edges of the face, starting with its representative
    /// half edge.
    pub fn face_half_edges(&self, face: FaceHandle) -> Result<FaceCirculator<'_, P, C>, MeshError> {
        let first = self.face(face)?.first;
        Ok(self.circulate_around_face(first))
    }

    /// Returns the corners of the face in counter-clockwise order. The first
    /// vertex is the start of the face's representative half edge.
    pub fn face_vertices(
        &self,
        face: FaceHandle,
    ) -> Result<impl Iterator<Item = VertexHandle> + '_, MeshError> {
        Ok(self.face_half_edges(face)?.map(move |he| self.half_edges[he].start))
    }

    pub fn face_edges(
        &self,
        face: FaceHandle,
    ) -> Result<impl Iterator<Item = EdgeHandle> + '_, MeshError> {
        Ok(self.face_half_edges(face)?.map(|he| he.full_edge()))
    }

    /// Returns the faces sharing an edge with `face`.
    pub fn face_neighbors(
        &self,
        face: FaceHandle,
    ) -> Result<impl Iterator<Item = FaceHandle> + '_, MeshError> {
        Ok(self.face_half_edges(face)?
            .filter_map(move |he| self.half_edges[he.pair()].face.into_option()))
    }

    /// Returns the number of corners (= number of edges) of the face.
    pub fn face_valence(&self, face: FaceHandle) -> Result<usize, MeshError> {
        Ok(self.face_half_edges(face)?.count())
    }

    /// Returns the three corners of a face, or `None` if it is not a
    /// triangle.
    pub fn triangle_vertices(&self, face: FaceHandle) -> Result<Option<[VertexHandle; 3]>, MeshError> {
        let mut it = self.face_vertices(face)?;
        let out = match (it.next(), it.next(), it.next(), it.next()) {
            (Some(a), Some(b), Some(c), None) => Some([a, b, c]),
            _ => None,
        };
        Ok(out)
    }
}
