//! Whole-mesh maintenance: culling isolated elements, compaction and
//! cloning.

use std::{marker::PhantomData, mem};

use tracing::debug;

use crate::{
    handle::{EdgeHandle, FaceHandle, HalfEdgeHandle, Handle, VertexHandle},
    map::DenseMap,
};
use super::{Config, Face, HalfEdge, HalfEdgeMesh, Vertex};


/// A deep copy: all three arenas are copied, including holes, so every
/// handle of the original refers to the corresponding element of the copy.
impl<P: Clone, C: Config> Clone for HalfEdgeMesh<P, C> {
    fn clone(&self) -> Self {
        Self {
            vertices: self.vertices.clone(),
            half_edges: self.half_edges.clone(),
            faces: self.faces.clone(),
            _config: PhantomData,
        }
    }
}

impl<P, C: Config> HalfEdgeMesh<P, C> {
    /// Compacts the mesh: all elements are renumbered to occupy the index
    /// range `0..count` for each kind (keeping their relative order) and the
    /// "next index" counters are reset to the counts.
    ///
    /// If `cull_isolated` is `true`, isolated elements are removed first, in
    /// this order:
    /// - faces that share no edge with another face,
    /// - edges with no face on either side (including the ones left over by
    ///   removing faces),
    /// - vertices without any edge.
    ///
    /// **Attention**: this invalidates all handles you kept around.
    pub fn clean(&mut self, cull_isolated: bool) {
        if cull_isolated {
            self.cull_isolated();
        }
        self.compact();
    }

    fn cull_isolated(&mut self) {
        let faces = self.face_handles()
            .filter(|&f| self.is_isolated_face(f))
            .collect::<Vec<_>>();
        let num_faces = faces.len();
        for f in faces {
            self.erase_face_unchecked(f);
        }

        let edges = self.edges()
            .filter(|e| e.is_isolated())
            .map(|e| e.half_edge())
            .collect::<Vec<_>>();
        let num_edges = edges.len();
        for he in edges {
            self.unlink_pair(he);
        }

        let vertices = self.vertices()
            .filter(|v| v.is_isolated())
            .map(|v| v.handle)
            .collect::<Vec<_>>();
        let num_vertices = vertices.len();
        for v in vertices {
            self.vertices.remove(v);
        }

        debug!(
            "culled {} isolated faces, {} isolated edges and {} isolated vertices",
            num_faces,
            num_edges,
            num_vertices,
        );
    }

    fn compact(&mut self) {
        // ----- Build the old -> new handle maps ----------------------------
        let mut vertex_map = DenseMap::<VertexHandle, VertexHandle>::new();
        for (i, vh) in self.vertices.handles().enumerate() {
            vertex_map.insert(vh, VertexHandle::from_usize(i));
        }

        // Pairs stay together: the k-th remaining edge gets the half edges
        // 2k and 2k + 1, in the same lower/upper order as before.
        let mut half_edge_map = DenseMap::<HalfEdgeHandle, HalfEdgeHandle>::new();
        let lower_halves = self.half_edges.handles().filter(|he| he.is_lower_half());
        for (k, he) in lower_halves.enumerate() {
            let new = HalfEdgeHandle::lower_half_of(EdgeHandle::from_usize(k));
            half_edge_map.insert(he, new);
            half_edge_map.insert(he.pair(), new.pair());
        }

        let mut face_map = DenseMap::<FaceHandle, FaceHandle>::new();
        for (i, fh) in self.faces.handles().enumerate() {
            face_map.insert(fh, FaceHandle::from_usize(i));
        }

        // ----- Rebuild all arenas ------------------------------------------
        // Elements are pushed in increasing old index order, which is also
        // increasing new index order. So `push` hands out exactly the new
        // handles.
        let old_vertices = mem::replace(
            &mut self.vertices,
            DenseMap::with_capacity(vertex_map.num_elements() as usize),
        );
        for (_, v) in old_vertices.into_iter() {
            let handle = vertex_map[v.handle];
            let new = self.vertices.push(Vertex {
                handle,
                position: v.position,
                outgoing: v.outgoing.map_t(|he| half_edge_map[he]),
            });
            debug_assert_eq!(new, handle);
        }

        let old_half_edges = mem::replace(
            &mut self.half_edges,
            DenseMap::with_capacity(half_edge_map.num_elements() as usize),
        );
        for (_, he) in old_half_edges.into_iter() {
            let handle = half_edge_map[he.handle];
            let new = self.half_edges.push(HalfEdge {
                handle,
                start: vertex_map[he.start],
                end: vertex_map[he.end],
                next: half_edge_map[he.next],
                prev: half_edge_map[he.prev],
                face: he.face.map_t(|f| face_map[f]),
            });
            debug_assert_eq!(new, handle);
        }

        let old_faces = mem::replace(
            &mut self.faces,
            DenseMap::with_capacity(face_map.num_elements() as usize),
        );
        for (_, f) in old_faces.into_iter() {
            let handle = face_map[f.handle];
            let new = self.faces.push(Face {
                handle,
                first: half_edge_map[f.first],
            });
            debug_assert_eq!(new, handle);
        }

        debug!(
            "compacted mesh to {} vertices, {} half edges and {} faces",
            self.vertices.num_elements(),
            self.half_edges.num_elements(),
            self.faces.num_elements(),
        );
    }
}
