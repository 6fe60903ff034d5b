//! Everything related to the [`FaceVertexMesh`].

use fxhash::FxHashMap;
use smallvec::SmallVec;
use tracing::debug;

use crate::{
    error::MeshError,
    handle::{hsize, EdgeHandle, FaceHandle, VertexHandle},
    map::DenseMap,
    traits::{Element, Mesh},
};
use super::{Config, HalfEdgeMesh};


/// A vertex of a [`FaceVertexMesh`]: its position and all edges it is an
/// endpoint of.
#[derive(Debug, Clone, PartialEq)]
pub struct Vertex<P> {
    handle: VertexHandle,
    position: P,
    edges: SmallVec<[EdgeHandle; 6]>,
}

impl<P> Vertex<P> {
    pub fn handle(&self) -> VertexHandle {
        self.handle
    }

    pub fn position(&self) -> &P {
        &self.position
    }

    pub fn edges(&self) -> &[EdgeHandle] {
        &self.edges
    }
}

impl<P> Element for Vertex<P> {
    type Handle = VertexHandle;
    fn handle(&self) -> VertexHandle {
        self.handle
    }
}

/// An undirected edge with the (at most two) faces it borders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edge {
    handle: EdgeHandle,
    vertices: [VertexHandle; 2],
    faces: SmallVec<[FaceHandle; 2]>,
}

impl Edge {
    pub fn handle(&self) -> EdgeHandle {
        self.handle
    }

    pub fn vertices(&self) -> [VertexHandle; 2] {
        self.vertices
    }

    pub fn faces(&self) -> &[FaceHandle] {
        &self.faces
    }

    /// Returns `true` if less than two faces border this edge.
    pub fn is_boundary(&self) -> bool {
        self.faces.len() < 2
    }
}

impl Element for Edge {
    type Handle = EdgeHandle;
    fn handle(&self) -> EdgeHandle {
        self.handle
    }
}

/// A face as ordered list of its corners and of its edges. The `i`-th edge
/// connects the `i`-th and the `(i + 1)`-th corner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Face {
    handle: FaceHandle,
    vertices: SmallVec<[VertexHandle; 4]>,
    edges: SmallVec<[EdgeHandle; 4]>,
}

impl Face {
    pub fn handle(&self) -> FaceHandle {
        self.handle
    }

    pub fn vertices(&self) -> &[VertexHandle] {
        &self.vertices
    }

    pub fn edges(&self) -> &[EdgeHandle] {
        &self.edges
    }
}

impl Element for Face {
    type Handle = FaceHandle;
    fn handle(&self) -> FaceHandle {
        self.handle
    }
}


/// A simple mesh representation: faces list their vertices and edges
/// explicitly, edges list their faces and vertices list their edges.
///
/// There is no way to modify this mesh. It is created from a
/// [`HalfEdgeMesh`] (see [`HalfEdgeMesh::to_face_vertex`]) and keeps all
/// handles of its source: vertex and face handles are the same, the edge
/// handle is the half edge index divided by two. Holes in the index range of
/// the source stay holes.
#[derive(Debug, Clone)]
pub struct FaceVertexMesh<P> {
    vertices: DenseMap<VertexHandle, Vertex<P>>,
    edges: DenseMap<EdgeHandle, Edge>,
    faces: DenseMap<FaceHandle, Face>,
    edge_lookup: FxHashMap<(VertexHandle, VertexHandle), EdgeHandle>,
}

/// Order-independent key for `edge_lookup`.
fn edge_key(a: VertexHandle, b: VertexHandle) -> (VertexHandle, VertexHandle) {
    if a < b { (a, b) } else { (b, a) }
}

impl<P> FaceVertexMesh<P> {
    pub fn num_vertices(&self) -> hsize {
        self.vertices.num_elements()
    }

    pub fn num_edges(&self) -> hsize {
        self.edges.num_elements()
    }

    pub fn num_faces(&self) -> hsize {
        self.faces.num_elements()
    }

    pub fn vertex(&self, vertex: VertexHandle) -> Result<&Vertex<P>, MeshError> {
        self.vertices.get(vertex).ok_or(MeshError::VertexNotFound(vertex))
    }

    pub fn try_vertex(&self, vertex: VertexHandle) -> Option<&Vertex<P>> {
        self.vertices.get(vertex)
    }

    pub fn edge(&self, edge: EdgeHandle) -> Result<&Edge, MeshError> {
        self.edges.get(edge).ok_or(MeshError::EdgeNotFound(edge))
    }

    pub fn try_edge(&self, edge: EdgeHandle) -> Option<&Edge> {
        self.edges.get(edge)
    }

    pub fn face(&self, face: FaceHandle) -> Result<&Face, MeshError> {
        self.faces.get(face).ok_or(MeshError::FaceNotFound(face))
    }

    pub fn try_face(&self, face: FaceHandle) -> Option<&Face> {
        self.faces.get(face)
    }

    /// Returns the edge between `a` and `b` (in any order), if there is one.
    pub fn edge_between(&self, a: VertexHandle, b: VertexHandle) -> Option<&Edge> {
        self.edge_lookup.get(&edge_key(a, b)).map(|&e| &self.edges[e])
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex<P>> + '_ {
        self.vertices.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &Edge> + '_ {
        self.edges.values()
    }

    pub fn faces(&self) -> impl Iterator<Item = &Face> + '_ {
        self.faces.values()
    }
}

impl<P> Mesh for FaceVertexMesh<P> {
    fn num_vertices(&self) -> hsize {
        self.vertices.num_elements()
    }

    fn num_edges(&self) -> hsize {
        self.edges.num_elements()
    }

    fn num_faces(&self) -> hsize {
        self.faces.num_elements()
    }

    fn contains_vertex(&self, vertex: VertexHandle) -> bool {
        self.vertices.contains_handle(vertex)
    }

    fn contains_edge(&self, edge: EdgeHandle) -> bool {
        self.edges.contains_handle(edge)
    }

    fn contains_face(&self, face: FaceHandle) -> bool {
        self.faces.contains_handle(face)
    }
}

impl<P: Clone, C: Config> From<&HalfEdgeMesh<P, C>> for FaceVertexMesh<P> {
    fn from(src: &HalfEdgeMesh<P, C>) -> Self {
        let mut vertices = DenseMap::with_capacity(src.next_vertex_index() as usize);
        let mut edges = DenseMap::with_capacity((src.next_half_edge_index() / 2) as usize);
        let mut faces = DenseMap::with_capacity(src.next_face_index() as usize);
        let mut edge_lookup = FxHashMap::default();
        edge_lookup.reserve(src.num_edges() as usize);

        for v in src.vertices() {
            vertices.insert(v.handle(), Vertex {
                handle: v.handle(),
                position: v.position().clone(),
                edges: SmallVec::new(),
            });
        }

        // `edges()` only visits the lower half of each pair.
        for e in src.edges() {
            let (a, b) = (e.start(), e.end());
            edges.insert(e.handle(), Edge {
                handle: e.handle(),
                vertices: [a, b],
                faces: SmallVec::new(),
            });
            vertices[a].edges.push(e.handle());
            vertices[b].edges.push(e.handle());
            edge_lookup.insert(edge_key(a, b), e.handle());
        }

        for f in src.faces() {
            let fh = f.handle();
            let corners = src.face_vertices(fh)
                .expect("bug: face returned by `faces()` does not exist")
                .collect::<SmallVec<[_; 4]>>();
            let face_edges = src.face_edges(fh)
                .expect("bug: face returned by `faces()` does not exist")
                .collect::<SmallVec<[_; 4]>>();

            for &e in &face_edges {
                edges[e].faces.push(fh);
            }
            faces.insert(fh, Face {
                handle: fh,
                vertices: corners,
                edges: face_edges,
            });
        }

        debug!(
            "converted half edge mesh into face-vertex mesh ({} vertices, {} edges, {} faces)",
            vertices.num_elements(),
            edges.num_elements(),
            faces.num_elements(),
        );

        Self { vertices, edges, faces, edge_lookup }
    }
}

impl<P: Clone, C: Config> HalfEdgeMesh<P, C> {
    /// Converts this mesh into a [`FaceVertexMesh`]. See there for details.
    pub fn to_face_vertex(&self) -> FaceVertexMesh<P> {
        FaceVertexMesh::from(self)
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::handle::{HalfEdgeHandle, Handle};

    fn quad() -> (HalfEdgeMesh<[f64; 2]>, [VertexHandle; 4]) {
        let mut mesh = HalfEdgeMesh::new();
        let a = mesh.add_vertex([0.0, 0.0]);
        let b = mesh.add_vertex([1.0, 0.0]);
        let c = mesh.add_vertex([1.0, 1.0]);
        let d = mesh.add_vertex([0.0, 1.0]);
        mesh.add_triangle([a, b, c]).unwrap();
        mesh.add_triangle([a, c, d]).unwrap();
        (mesh, [a, b, c, d])
    }

    #[test]
    fn counts_and_indices_match() {
        let (src, [a, b, c, d]) = quad();
        let fv = src.to_face_vertex();

        assert_eq!(fv.num_vertices(), src.num_vertices());
        assert_eq!(fv.num_edges(), src.num_edges());
        assert_eq!(fv.num_faces(), src.num_faces());

        for he in src.half_edges() {
            let edge = fv.edge(he.handle().full_edge()).unwrap();
            assert_eq_set!(edge.vertices().iter().copied(), [he.start(), he.end()]);
        }
        for v in src.vertices() {
            assert_eq!(fv.vertex(v.handle()).unwrap().position(), v.position());
        }

        assert_eq!(fv.vertex(a).unwrap().edges().len(), 3);
        assert_eq!(fv.vertex(b).unwrap().edges().len(), 2);
        assert!(fv.edge_between(b, d).is_none());

        let diagonal = fv.edge_between(c, a).unwrap();
        assert_eq!(Some(diagonal), fv.edge_between(a, c));
        assert_eq!(diagonal.faces().len(), 2);
        assert!(!diagonal.is_boundary());
        assert!(fv.edge_between(a, b).unwrap().is_boundary());
    }

    #[test]
    fn faces_list_corners_and_edges() {
        let (src, _) = quad();
        let fv = FaceVertexMesh::from(&src);

        for f in src.faces() {
            let face = fv.face(f.handle()).unwrap();
            assert_eq!(face.vertices(), &*src.face_vertices(f.handle()).unwrap().collect::<Vec<_>>());
            assert_eq!(face.edges().len(), 3);
            for (i, &e) in face.edges().iter().enumerate() {
                let next = face.vertices()[(i + 1) % 3];
                let expected = fv.edge_between(face.vertices()[i], next).unwrap().handle();
                assert_eq!(e, expected);
                assert!(fv.edge(e).unwrap().faces().contains(&f.handle()));
            }
        }
    }

    #[test]
    fn holes_are_kept() {
        let (mut src, [_, b, _, _]) = quad();
        src.remove_vertex(b).unwrap();
        let fv = src.to_face_vertex();

        assert_eq!(fv.num_vertices(), 3);
        assert_eq!(fv.num_edges(), 3);
        assert_eq!(fv.num_faces(), 1);
        assert!(!fv.contains_vertex(b));
        assert!(!fv.contains_edge(HalfEdgeHandle::new(0).full_edge()));
        assert!(fv.try_face(FaceHandle::new(0)).is_none());
        assert!(fv.face(FaceHandle::new(1)).is_ok());

        // The source is untouched.
        src.check_integrity();
        assert_eq!(src.num_faces(), 1);
    }
}
