//! Everything related to the [`HalfEdgeMesh`].

// # Some notes for developers about this implementation
//
// - The pair half edges are stored implicitly: pairs are always pushed
//   together and thus always have handle indices only one apart. Since we
//   start with index 0 (and compaction keeps pairs together), the indices of
//   two pair halves are always 2k and 2k + 1. Edge to half edge is a
//   multiplication by two, half edge to edge an integer division.
// - `next` and `prev` of every half edge are always valid. A freshly
//   allocated pair points to itself (`h.next == h.prev == pair(h)`), which is
//   exactly the boundary loop of an isolated edge.
// - All outgoing half edges of a vertex form one cycle via `next(pair(h))`,
//   even if the vertex has several fan blades.
// - If a vertex has at least one outgoing boundary half edge, its `outgoing`
//   field stores one of those.

use std::{fmt, marker::PhantomData};

use smallvec::{smallvec, SmallVec};
use tracing::{debug, trace};

use crate::{
    error::MeshError,
    handle::{hsize, EdgeHandle, FaceHandle, HalfEdgeHandle, Handle, Opt, VertexHandle},
    map::DenseMap,
    traits::{Element, Mesh},
};
use super::{Config, FaceKind, PolyConfig};


/// Helper macro to set the `next` and `prev` handles in one line. These two
/// handles always have to be set at the same time, so with this macro you
/// cannot forget.
macro_rules! set_next_prev {
    ($mesh:ident, $prev:tt -> $next:tt) => {{
        let (prev, next) = ($prev, $next);
        $mesh.half_edges[prev].next = next;
        $mesh.half_edges[next].prev = prev;
    }};
}

mod adj;
mod clean;

pub use self::adj::{FaceCirculator, VertexCirculator};


// ===============================================================================================
// ===== Definition of the records stored inside the data structure
// ===============================================================================================

/// A vertex of a [`HalfEdgeMesh`]: a position plus one outgoing half edge.
///
/// The outgoing half edge is the "representative" of the vertex:
/// - If the vertex is isolated, there is none.
/// - If the vertex is on the boundary, it is a boundary half edge. There is
///   one such half edge per fan blade; which one is stored is arbitrary.
/// - Otherwise it's an arbitrary outgoing half edge.
///
/// Two vertices compare equal if they have the same handle and the same
/// representative; positions are ignored.
#[derive(Clone)]
pub struct Vertex<P> {
    handle: VertexHandle,
    position: P,
    outgoing: Opt<HalfEdgeHandle>,
}

impl<P> Vertex<P> {
    pub fn handle(&self) -> VertexHandle {
        self.handle
    }

    pub fn position(&self) -> &P {
        &self.position
    }

    /// Returns the representative outgoing half edge or `None` if this vertex
    /// is isolated.
    pub fn outgoing(&self) -> Option<HalfEdgeHandle> {
        self.outgoing.into_option()
    }

    /// Returns `true` if no half edge starts or ends at this vertex.
    pub fn is_isolated(&self) -> bool {
        self.outgoing.is_none()
    }
}

impl<P> Element for Vertex<P> {
    type Handle = VertexHandle;
    fn handle(&self) -> VertexHandle {
        self.handle
    }
}

impl<P> PartialEq for Vertex<P> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle && self.outgoing == other.outgoing
    }
}

impl<P: fmt::Debug> fmt::Debug for Vertex<P> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "Vertex {{ {:?}, position: {:?}, outgoing: {:?} }}",
            self.handle,
            self.position,
            self.outgoing,
        )
    }
}

/// One directed half of an edge.
///
/// `next` and `prev` link the half edge into the loop around its face or,
/// if it has no face, into the loop around a hole of the mesh. A half edge
/// without face is a *boundary* half edge; there is no separate flag.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct HalfEdge {
    handle: HalfEdgeHandle,
    start: VertexHandle,
    end: VertexHandle,
    next: HalfEdgeHandle,
    prev: HalfEdgeHandle,
    face: Opt<FaceHandle>,
}

impl HalfEdge {
    pub fn handle(&self) -> HalfEdgeHandle {
        self.handle
    }

    /// The other half of the same edge (pointing in the opposite direction).
    pub fn pair(&self) -> HalfEdgeHandle {
        self.handle.pair()
    }

    /// The full edge this half edge belongs to.
    pub fn edge(&self) -> EdgeHandle {
        self.handle.full_edge()
    }

    pub fn start(&self) -> VertexHandle {
        self.start
    }

    pub fn end(&self) -> VertexHandle {
        self.end
    }

    pub fn next(&self) -> HalfEdgeHandle {
        self.next
    }

    pub fn prev(&self) -> HalfEdgeHandle {
        self.prev
    }

    /// The face this half edge belongs to, or `None` for boundary half edges.
    pub fn face(&self) -> Option<FaceHandle> {
        self.face.into_option()
    }

    pub fn is_boundary(&self) -> bool {
        self.face.is_none()
    }
}

impl Element for HalfEdge {
    type Handle = HalfEdgeHandle;
    fn handle(&self) -> HalfEdgeHandle {
        self.handle
    }
}

impl fmt::Debug for HalfEdge {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "HalfEdge {{ {:?}: {:?} -> {:?}, next: {:?}, prev: {:?}, face: {:?} }}",
            self.handle,
            self.start,
            self.end,
            self.next,
            self.prev,
            self.face,
        )
    }
}

/// A face, stored as one (arbitrary) half edge of its loop.
///
/// Everything else about the face (its vertices, edges and valence) is
/// derived by walking the loop with `next`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Face {
    handle: FaceHandle,
    first: HalfEdgeHandle,
}

impl Face {
    pub fn handle(&self) -> FaceHandle {
        self.handle
    }

    /// The representative half edge of this face.
    pub fn first_half_edge(&self) -> HalfEdgeHandle {
        self.first
    }
}

impl Element for Face {
    type Handle = FaceHandle;
    fn handle(&self) -> FaceHandle {
        self.handle
    }
}

impl fmt::Debug for Face {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Face {{ {:?}, first: {:?} }}", self.handle, self.first)
    }
}

/// A view on one full edge (a pair of half edges).
///
/// Edges are not stored in the mesh, this is a snapshot created by
/// [`HalfEdgeMesh::edge`] and friends. Start and end are the ones of the
/// lower (even) half edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge {
    handle: EdgeHandle,
    half_edge: HalfEdgeHandle,
    start: VertexHandle,
    end: VertexHandle,
    faces: [Option<FaceHandle>; 2],
}

impl Edge {
    pub fn handle(&self) -> EdgeHandle {
        self.handle
    }

    /// The lower half edge of this edge (the one with the even index).
    pub fn half_edge(&self) -> HalfEdgeHandle {
        self.half_edge
    }

    pub fn start(&self) -> VertexHandle {
        self.start
    }

    pub fn end(&self) -> VertexHandle {
        self.end
    }

    /// The faces of the lower and the upper half edge, in that order.
    pub fn faces(&self) -> [Option<FaceHandle>; 2] {
        self.faces
    }

    /// Returns `true` if at least one side of this edge has no face.
    pub fn is_boundary(&self) -> bool {
        self.faces[0].is_none() || self.faces[1].is_none()
    }

    /// Returns `true` if neither side of this edge has a face.
    pub fn is_isolated(&self) -> bool {
        self.faces[0].is_none() && self.faces[1].is_none()
    }
}

impl Element for Edge {
    type Handle = EdgeHandle;
    fn handle(&self) -> EdgeHandle {
        self.handle
    }
}


// ===============================================================================================
// ===== The mesh
// ===============================================================================================

/// Implementation of the *half edge mesh*. This data structure is widely used
/// in geometry processing due to its many capabilities paired with fairly good
/// speed and memory consumption.
///
/// This data structure allows you to represent polygon meshes where each face
/// can have differently many vertices. (However, you can restrict this mesh to
/// triangle meshes via the configuration.) It stores one position of type
/// `P` per vertex and answers all local adjacency queries without scanning
/// the mesh.
///
/// All elements live in arenas owned by the mesh and refer to each other via
/// handles. Handles of existing elements stay valid when other elements are
/// removed; only [`clean`][HalfEdgeMesh::clean] renumbers elements.
///
/// The mesh is meant to be used by one writer at a time. Mutating methods
/// take `&mut self`, so the borrow checker already prevents readers from
/// observing a half-finished mutation.
///
/// # References
///
/// Introduced in: Mäntylä, Martti. An introduction to solid modeling. Computer
/// science press, 1988.
pub struct HalfEdgeMesh<P, C: Config = PolyConfig> {
    vertices: DenseMap<VertexHandle, Vertex<P>>,
    half_edges: DenseMap<HalfEdgeHandle, HalfEdge>,
    faces: DenseMap<FaceHandle, Face>,
    _config: PhantomData<C>,
}

impl<P, C: Config> Default for HalfEdgeMesh<P, C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: fmt::Debug, C: Config> fmt::Debug for HalfEdgeMesh<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("HalfEdgeMesh")
            .field("vertices", &self.vertices)
            .field("faces", &self.faces)
            .field("half_edges", &self.half_edges)
            .finish()
    }
}


// ===============================================================================================
// ===== Queries
// ===============================================================================================

impl<P, C: Config> HalfEdgeMesh<P, C> {
    /// Creates an empty mesh.
    pub fn new() -> Self {
        Self {
            vertices: DenseMap::new(),
            half_edges: DenseMap::new(),
            faces: DenseMap::new(),
            _config: PhantomData,
        }
    }

    // ===== Counts ==========================================================
    pub fn num_vertices(&self) -> hsize {
        self.vertices.num_elements()
    }

    pub fn num_half_edges(&self) -> hsize {
        self.half_edges.num_elements()
    }

    /// Returns the number of full edges. There are always exactly twice as
    /// many half edges.
    pub fn num_edges(&self) -> hsize {
        self.half_edges.num_elements() / 2
    }

    pub fn num_faces(&self) -> hsize {
        self.faces.num_elements()
    }

    /// The index the next added vertex will get. This is not decreased by
    /// removing vertices, only by [`clean`][Self::clean].
    pub fn next_vertex_index(&self) -> hsize {
        self.vertices.next_push_handle().idx()
    }

    /// The index the next added half edge will get. See
    /// [`next_vertex_index`][Self::next_vertex_index].
    pub fn next_half_edge_index(&self) -> hsize {
        self.half_edges.next_push_handle().idx()
    }

    /// The index the next added face will get. See
    /// [`next_vertex_index`][Self::next_vertex_index].
    pub fn next_face_index(&self) -> hsize {
        self.faces.next_push_handle().idx()
    }

    /// Reserves memory for `vertices` more vertices and `faces` more faces.
    pub fn reserve(&mut self, vertices: hsize, faces: hsize) {
        self.vertices.reserve(vertices);
        // We have at least three half edges per face, but most are shared.
        self.half_edges.reserve(faces * 3);
        self.faces.reserve(faces);
    }

    // ===== Lookups =========================================================
    pub fn contains_vertex(&self, vertex: VertexHandle) -> bool {
        self.vertices.contains_handle(vertex)
    }

    pub fn contains_half_edge(&self, half_edge: HalfEdgeHandle) -> bool {
        self.half_edges.contains_handle(half_edge)
    }

    pub fn contains_edge(&self, edge: EdgeHandle) -> bool {
        self.half_edges.contains_handle(HalfEdgeHandle::lower_half_of(edge))
    }

    pub fn contains_face(&self, face: FaceHandle) -> bool {
        self.faces.contains_handle(face)
    }

    /// Returns the vertex with the given handle or `VertexNotFound`.
    pub fn vertex(&self, vertex: VertexHandle) -> Result<&Vertex<P>, MeshError> {
        self.vertices.get(vertex).ok_or(MeshError::VertexNotFound(vertex))
    }

    pub fn try_vertex(&self, vertex: VertexHandle) -> Option<&Vertex<P>> {
        self.vertices.get(vertex)
    }

    /// Shorthand for `vertex(v)?.position()`.
    pub fn position(&self, vertex: VertexHandle) -> Result<&P, MeshError> {
        self.vertex(vertex).map(|v| &v.position)
    }

    /// Replaces the position of a vertex. Connectivity is not affected.
    pub fn set_position(&mut self, vertex: VertexHandle, position: P) -> Result<(), MeshError> {
        let v = self.vertices.get_mut(vertex).ok_or(MeshError::VertexNotFound(vertex))?;
        v.position = position;
        Ok(())
    }

    pub fn half_edge(&self, half_edge: HalfEdgeHandle) -> Result<&HalfEdge, MeshError> {
        self.half_edges.get(half_edge).ok_or(MeshError::HalfEdgeNotFound(half_edge))
    }

    pub fn try_half_edge(&self, half_edge: HalfEdgeHandle) -> Option<&HalfEdge> {
        self.half_edges.get(half_edge)
    }

    pub fn face(&self, face: FaceHandle) -> Result<&Face, MeshError> {
        self.faces.get(face).ok_or(MeshError::FaceNotFound(face))
    }

    pub fn try_face(&self, face: FaceHandle) -> Option<&Face> {
        self.faces.get(face)
    }

    pub fn edge(&self, edge: EdgeHandle) -> Result<Edge, MeshError> {
        self.try_edge(edge).ok_or(MeshError::EdgeNotFound(edge))
    }

    pub fn try_edge(&self, edge: EdgeHandle) -> Option<Edge> {
        let lower = self.half_edges.get(HalfEdgeHandle::lower_half_of(edge))?;
        let upper = &self.half_edges[lower.handle.pair()];
        Some(Edge {
            handle: edge,
            half_edge: lower.handle,
            start: lower.start,
            end: lower.end,
            faces: [lower.face.into_option(), upper.face.into_option()],
        })
    }

    /// Returns the half edge going from `from` to `to`, if it exists.
    pub fn half_edge_between(
        &self,
        from: VertexHandle,
        to: VertexHandle,
    ) -> Option<HalfEdgeHandle> {
        if !self.contains_vertex(from) || !self.contains_vertex(to) {
            return None;
        }

        self.circulate_around_vertex(from).find(|&he| self.half_edges[he].end == to)
    }

    /// Returns the edge connecting `a` and `b` (in any direction), if it
    /// exists.
    pub fn edge_between(&self, a: VertexHandle, b: VertexHandle) -> Option<Edge> {
        self.half_edge_between(a, b)
            .and_then(|he| self.try_edge(he.full_edge()))
    }

    // ===== Iteration =======================================================
    /// Iterates over the handles of all vertices in increasing index order.
    pub fn vertex_handles(&self) -> impl Iterator<Item = VertexHandle> + '_ {
        self.vertices.handles()
    }

    pub fn half_edge_handles(&self) -> impl Iterator<Item = HalfEdgeHandle> + '_ {
        self.half_edges.handles()
    }

    pub fn edge_handles(&self) -> impl Iterator<Item = EdgeHandle> + '_ {
        self.half_edges.handles()
            .filter(|he| he.is_lower_half())
            .map(|he| he.full_edge())
    }

    pub fn face_handles(&self) -> impl Iterator<Item = FaceHandle> + '_ {
        self.faces.handles()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &Vertex<P>> + '_ {
        self.vertices.values()
    }

    pub fn half_edges(&self) -> impl Iterator<Item = &HalfEdge> + '_ {
        self.half_edges.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = Edge> + '_ {
        self.edge_handles().map(move |e| {
            self.try_edge(e).expect("internal mesh error: lower half edge without pair")
        })
    }

    pub fn faces(&self) -> impl Iterator<Item = &Face> + '_ {
        self.faces.values()
    }

    // ===== Boundary ========================================================
    /// Returns `true` if the half edge exists and has no face.
    pub fn is_boundary_half_edge(&self, half_edge: HalfEdgeHandle) -> bool {
        self.half_edges.get(half_edge).map_or(false, |he| he.is_boundary())
    }

    /// Returns `true` if the edge exists and at least one of its halves has
    /// no face.
    pub fn is_boundary_edge(&self, edge: EdgeHandle) -> bool {
        self.try_edge(edge).map_or(false, |e| e.is_boundary())
    }

    /// Returns `true` if the vertex exists and is on the boundary. Isolated
    /// vertices are boundary vertices, too.
    pub fn is_boundary_vertex(&self, vertex: VertexHandle) -> bool {
        match self.vertices.get(vertex) {
            None => false,
            Some(v) => match v.outgoing.into_option() {
                None => true,
                Some(outgoing) => self.half_edges[outgoing].is_boundary(),
            },
        }
    }

    /// Returns `true` if the face exists and shares no edge with another
    /// face.
    pub fn is_isolated_face(&self, face: FaceHandle) -> bool {
        match self.faces.get(face) {
            None => false,
            Some(f) => self.circulate_around_face(f.first)
                .all(|he| self.half_edges[he.pair()].is_boundary()),
        }
    }
}


// ===============================================================================================
// ===== Internal helper methods
// ===============================================================================================

impl<P, C: Config> HalfEdgeMesh<P, C> {
    fn check_vertex(&self, vertex: VertexHandle) -> Result<(), MeshError> {
        if self.vertices.contains_handle(vertex) {
            Ok(())
        } else {
            Err(MeshError::VertexNotFound(vertex))
        }
    }

    /// Returns an iterator that circulates around the face loop containing
    /// `start`. The iterator yields the half edges of the loop.
    fn circulate_around_face(&self, start: HalfEdgeHandle) -> FaceCirculator<'_, P, C> {
        FaceCirculator::new(self, start)
    }

    /// Returns an iterator that circulates around the vertex `center`. The
    /// iterator yields outgoing half edges. `center` has to exist.
    fn circulate_around_vertex(&self, center: VertexHandle) -> VertexCirculator<'_, P, C> {
        VertexCirculator::new(self, self.vertices[center].outgoing.into_option())
    }

    /// Adds two half edges between `from` and `to` and returns the one
    /// pointing to `to`.
    ///
    /// This function:
    /// - Correctly sets the `start` and `end` fields of the half edges.
    /// - Always sets the `face` field of the half edges to `None`.
    /// - Links both halves to each other via `next` and `prev`, like an
    ///   isolated edge.
    /// - Does not touch the vertices, so the new edge is not reachable by
    ///   circulating around `from` or `to`. The caller has to fix that.
    fn add_pair_partially(&mut self, from: VertexHandle, to: VertexHandle) -> HalfEdgeHandle {
        let he = self.half_edges.next_push_handle();
        let twin = he.pair();
        debug_assert!(he.is_lower_half(), "internal mesh error: half edges are not paired");

        let face = Opt::none();
        self.half_edges.push(HalfEdge { handle: he, start: from, end: to, next: twin, prev: twin, face });
        self.half_edges.push(HalfEdge { handle: twin, start: to, end: from, next: he, prev: he, face });

        trace!("added half edge pair {:?}/{:?} between {:?} and {:?}", he, twin, from, to);
        he
    }

    /// Sets the `outgoing` handle of `vertex` to a boundary half edge, if
    /// there is one. Otherwise the handle is not changed.
    fn adjust_outgoing(&mut self, vertex: VertexHandle) {
        let boundary = self.circulate_around_vertex(vertex)
            .find(|&he| self.half_edges[he].is_boundary());
        if let Some(he) = boundary {
            self.vertices[vertex].outgoing = Opt::some(he);
        }
    }

    /// Links the fresh isolated pair `out` (leaving `vertex`) / `out.pair()`
    /// (arriving at `vertex`) into the boundary cycle around `vertex`.
    fn attach_free_end(&mut self, vertex: VertexHandle, out: HalfEdgeHandle) {
        let incoming = out.pair();
        match self.vertices[vertex].outgoing.into_option() {
            None => {
                set_next_prev!(self, incoming -> out);
                self.vertices[vertex].outgoing = Opt::some(out);
            }
            Some(boundary_next) => {
                let boundary_prev = self.half_edges[boundary_next].prev;
                set_next_prev!(self, boundary_prev -> out);
                set_next_prev!(self, incoming -> boundary_next);
            }
        }
    }

    /// See [`erase_face`][Self::erase_face]. `face` has to exist.
    fn erase_face_unchecked(&mut self, face: FaceHandle) {
        let first = self.faces[face].first;

        let mut he = first;
        loop {
            self.half_edges[he].face = Opt::none();
            let start = self.half_edges[he].start;
            self.vertices[start].outgoing = Opt::some(he);

            he = self.half_edges[he].next;
            if he == first {
                break;
            }
        }

        self.faces.remove(face);
        trace!("erased {:?}", face);
    }

    /// Removes the pair `he`/`pair(he)`, which must not have a face on
    /// either side. The neighboring half edges are linked to each other and
    /// the `outgoing` handles of both end vertices are updated.
    fn unlink_pair(&mut self, he: HalfEdgeHandle) {
        //
        //        he_prev ↘       ↗ twin_next            twin_prev ↙      ↖ he_next
        //                  (a) ---------- he ---------> (b)
        //                      <-------- twin ----------
        //
        let twin = he.pair();
        let HalfEdge { start: a, end: b, next: he_next, prev: he_prev, .. } = self.half_edges[he];
        let HalfEdge { next: twin_next, prev: twin_prev, .. } = self.half_edges[twin];

        // If `he_prev == twin`, the edge dangles at `a` and there is nothing
        // to reconnect there. Same for `b`.
        if he_prev != twin {
            set_next_prev!(self, he_prev -> twin_next);
        }
        if he_next != twin {
            set_next_prev!(self, twin_prev -> he_next);
        }

        if self.vertices[a].outgoing == Opt::some(he) {
            self.vertices[a].outgoing = if twin_next != he {
                Opt::some(twin_next)
            } else {
                Opt::none()
            };
        }
        if self.vertices[b].outgoing == Opt::some(twin) {
            self.vertices[b].outgoing = if he_next != twin {
                Opt::some(he_next)
            } else {
                Opt::none()
            };
        }

        self.half_edges.remove(he);
        self.half_edges.remove(twin);
        trace!("erased half edge pair {:?}/{:?}", he, twin);
    }

    /// Moves fan blades around `vertex` so that `inner_next` directly follows
    /// `inner_prev`, which is required before both can become half edges of
    /// one face.
    ///
    /// The blades between the two (the "patch") are moved to the first free
    /// gap found when circulating around the vertex. If there are several
    /// gaps, the choice is a heuristic depending on the order of blades,
    /// which in turn depends on the insertion history.
    fn relink_fan_blades(
        &mut self,
        vertex: VertexHandle,
        inner_prev: HalfEdgeHandle,
        inner_next: HalfEdgeHandle,
    ) -> Result<(), MeshError> {
        // Find a boundary half edge arriving at `vertex` between the blade
        // of `outer_prev` and `inner_prev`. That's the end of the blade we
        // will put the patch behind. Everything after `inner_prev` in this
        // walk belongs to the patch itself, so reaching `inner_prev` means
        // there is no free gap.
        let outer_prev = inner_next.pair();
        let mut boundary_prev = outer_prev;
        loop {
            boundary_prev = self.half_edges[boundary_prev].next.pair();
            if boundary_prev == inner_prev || boundary_prev == outer_prev {
                return Err(MeshError::NonManifoldVertex(vertex));
            }
            if self.half_edges[boundary_prev].is_boundary() {
                break;
            }
        }

        let boundary_next = self.half_edges[boundary_prev].next;
        if boundary_next == inner_next {
            return Err(MeshError::NonManifoldVertex(vertex));
        }

        debug!(
            "relinking fan blades around {:?} to connect {:?} and {:?}",
            vertex,
            inner_prev,
            inner_next,
        );

        let patch_start = self.half_edges[inner_prev].next;
        let patch_end = self.half_edges[inner_next].prev;

        set_next_prev!(self, boundary_prev -> patch_start);
        set_next_prev!(self, patch_end -> boundary_next);
        set_next_prev!(self, inner_prev -> inner_next);

        Ok(())
    }
}


// ===============================================================================================
// ===== The connectivity kernel
// ===============================================================================================

impl<P, C: Config> HalfEdgeMesh<P, C> {
    /// Adds an isolated vertex with the given position.
    pub fn add_vertex(&mut self, position: P) -> VertexHandle {
        let handle = self.vertices.next_push_handle();
        self.vertices.push(Vertex {
            handle,
            position,
            outgoing: Opt::none(),
        })
    }

    /// Adds a free edge (a pair of half edges without faces) between `start`
    /// and `end` and returns the half edge going from `start` to `end`.
    ///
    /// Returns `Ok(None)` without changing anything if `start == end` or if
    /// the two vertices are already connected. Otherwise, the new pair is
    /// linked into the boundary cycles around both vertices, so both vertices
    /// have to be isolated or on the boundary.
    pub fn add_pair(
        &mut self,
        start: VertexHandle,
        end: VertexHandle,
    ) -> Result<Option<HalfEdgeHandle>, MeshError> {
        self.check_vertex(start)?;
        self.check_vertex(end)?;
        if start == end || self.half_edge_between(start, end).is_some() {
            return Ok(None);
        }

        for &v in &[start, end] {
            if !self.is_boundary_vertex(v) {
                return Err(MeshError::VertexNotOnBoundary(v));
            }
        }

        let he = self.add_pair_partially(start, end);
        self.attach_free_end(start, he);
        self.attach_free_end(end, he.pair());

        Ok(Some(he))
    }

    /// Shorthand for [`add_face`][Self::add_face] with three vertices.
    pub fn add_triangle(&mut self, [a, b, c]: [VertexHandle; 3]) -> Result<FaceHandle, MeshError> {
        self.add_face(&[a, b, c])
    }

    /// Adds a face defined by the given vertices (in counter-clockwise order,
    /// i.e. the face loop visits them in the given order).
    ///
    /// All vertices have to exist and have to be isolated or on the boundary.
    /// Existing edges between consecutive vertices are reused; missing ones
    /// are created. An existing half edge that already has a face is rejected
    /// (`NonManifoldEdge`), as a third face at one edge is not representable.
    ///
    /// Vertices with several fan blades (non-manifold vertices) are
    /// supported: when the new face connects two blades, the blades are
    /// reordered around the vertex if necessary.
    pub fn add_face(&mut self, vertices: &[VertexHandle]) -> Result<FaceHandle, MeshError> {
        let len = vertices.len();
        if len < 3 {
            return Err(MeshError::TooFewVertices(len));
        }
        if <C::FaceKind as FaceKind>::ONLY_TRIANGLES && len != 3 {
            return Err(MeshError::NotATriangle(len));
        }

        // ===================================================================
        // ===== Check preconditions
        // ===================================================================
        for (i, &vh) in vertices.iter().enumerate() {
            let v = self.vertex(vh)?;
            if vertices[..i].contains(&vh) {
                return Err(MeshError::DuplicateVertex(vh));
            }
            if let Some(outgoing) = v.outgoing.into_option() {
                if !self.half_edges[outgoing].is_boundary() {
                    return Err(MeshError::VertexNotOnBoundary(vh));
                }
            }
        }

        // ===================================================================
        // ===== Find edges between vertices
        // ===================================================================
        // `inner[i]` is the half edge from `vertices[i]` to
        // `vertices[(i + 1) % len]`, if it already exists.
        let mut inner: SmallVec<[Option<HalfEdgeHandle>; 4]> = SmallVec::with_capacity(len);
        for i in 0..len {
            let he = self.half_edge_between(vertices[i], vertices[(i + 1) % len]);
            if let Some(he) = he {
                if !self.half_edges[he].is_boundary() {
                    return Err(MeshError::NonManifoldEdge(he));
                }
            }
            inner.push(he);
        }

        // ===================================================================
        // ===== Reorder fan blades
        // ===================================================================
        // If both half edges at a corner already exist, they have to be
        // consecutive in the boundary loop. If they are not, the blades
        // between them are moved somewhere else.
        for i in 0..len {
            let j = (i + 1) % len;
            if let (Some(inner_prev), Some(inner_next)) = (inner[i], inner[j]) {
                if self.half_edges[inner_prev].next != inner_next {
                    self.relink_fan_blades(vertices[j], inner_prev, inner_next)?;
                }
            }
        }

        // ===================================================================
        // ===== Add missing edges and the face
        // ===================================================================
        let mut is_new: SmallVec<[bool; 4]> = SmallVec::with_capacity(len);
        let mut inner_hes: SmallVec<[HalfEdgeHandle; 4]> = SmallVec::with_capacity(len);
        for (i, he) in inner.into_iter().enumerate() {
            match he {
                Some(he) => {
                    inner_hes.push(he);
                    is_new.push(false);
                }
                None => {
                    let he = self.add_pair_partially(vertices[i], vertices[(i + 1) % len]);
                    inner_hes.push(he);
                    is_new.push(true);
                }
            }
        }

        let new_face = self.faces.next_push_handle();
        self.faces.push(Face {
            handle: new_face,
            first: inner_hes[0],
        });
        for &he in &inner_hes {
            self.half_edges[he].face = Opt::some(new_face);
        }

        // ===================================================================
        // ===== Fix `next` and `prev` handles
        // ===================================================================
        // We handle each corner separately. For each corner, we have this
        // situation (the corner vertex `v`, the new face `F`, and the outer
        // half edges of the two inner half edges at `v`):
        //
        //                 ?
        //           ?           ?
        //
        //                (v)
        //               ^/ ^\
        //  outer_next  //   \\  outer_prev
        //             //  F  \\
        //            /v       \v
        //           ( )       ( )
        //
        // Reading `next`/`prev` has to happen on the old state, so the new
        // links are collected first and applied after the loop.
        let mut next_cache: SmallVec<[(HalfEdgeHandle, HalfEdgeHandle); 12]> = SmallVec::new();
        let mut needs_adjust: SmallVec<[bool; 4]> = smallvec![false; len];

        for i in 0..len {
            let j = (i + 1) % len;
            let vh = vertices[j];
            let inner_prev = inner_hes[i];
            let inner_next = inner_hes[j];
            let outer_prev = inner_next.pair();
            let outer_next = inner_prev.pair();

            match (is_new[i], is_new[j]) {
                // Both edges existed already and are consecutive (see
                // reordering above). Only the `outgoing` handle might now
                // point to a half edge that's not boundary anymore.
                (false, false) => {
                    needs_adjust[j] = self.vertices[vh].outgoing == Opt::some(inner_next);
                }

                // Only the incoming edge is new: the half edge that arrived
                // before `inner_next` now continues with `outer_next`.
                (true, false) => {
                    let boundary_prev = self.half_edges[inner_next].prev;
                    next_cache.push((boundary_prev, outer_next));
                    self.vertices[vh].outgoing = Opt::some(outer_next);
                }

                // Only the outgoing edge is new: `outer_prev` continues with
                // what came after `inner_prev`.
                (false, true) => {
                    let boundary_next = self.half_edges[inner_prev].next;
                    next_cache.push((outer_prev, boundary_next));
                    self.vertices[vh].outgoing = Opt::some(boundary_next);
                }

                // Both edges are new.
                (true, true) => match self.vertices[vh].outgoing.into_option() {
                    // The vertex was isolated, easy.
                    None => {
                        next_cache.push((outer_prev, outer_next));
                        self.vertices[vh].outgoing = Opt::some(outer_next);
                    }

                    // The vertex already has some fan blade. The new face is
                    // inserted as additional blade before the blade starting
                    // with the vertex' (boundary) `outgoing` half edge.
                    Some(boundary_next) => {
                        debug!("{:?} becomes a vertex with multiple fan blades", vh);
                        let boundary_prev = self.half_edges[boundary_next].prev;
                        next_cache.push((boundary_prev, outer_next));
                        next_cache.push((outer_prev, boundary_next));
                    }
                },
            }

            next_cache.push((inner_prev, inner_next));
        }

        for (prev, next) in next_cache {
            set_next_prev!(self, prev -> next);
        }

        for (&vh, &adjust) in vertices.iter().zip(&needs_adjust) {
            if adjust {
                self.adjust_outgoing(vh);
            }
        }

        trace!("added {:?} with vertices {:?}", new_face, vertices);
        Ok(new_face)
    }

    /// Removes the face from the mesh, but nothing else.
    ///
    /// The half edges of the face loop become boundary half edges (the face
    /// turns into a hole). The start vertex of each of these half edges gets
    /// that half edge as new `outgoing` handle, as they are boundary vertices
    /// now.
    pub fn erase_face(&mut self, face: FaceHandle) -> Result<(), MeshError> {
        self.face(face)?;
        self.erase_face_unchecked(face);
        Ok(())
    }

    /// Removes the face and everything that is only there because of it.
    ///
    /// Edges of the face that are not adjacent to another face are removed,
    /// as well as vertices that become isolated by that.
    pub fn remove_face(&mut self, face: FaceHandle) -> Result<(), MeshError> {
        let first = self.face(face)?.first;
        let loop_hes = self.circulate_around_face(first).collect::<SmallVec<[_; 8]>>();
        let loop_vertices = loop_hes.iter()
            .map(|&he| self.half_edges[he].start)
            .collect::<SmallVec<[_; 8]>>();

        self.erase_face(face)?;

        for he in loop_hes {
            if self.is_boundary_half_edge(he.pair()) {
                self.erase_half_edge(he)?;
            }
        }

        for vh in loop_vertices {
            if self.vertices[vh].outgoing.is_none() {
                self.vertices.remove(vh);
                trace!("removed now isolated {:?}", vh);
            }
        }

        Ok(())
    }

    /// Removes both halves of the edge `half_edge` belongs to, unconditionally.
    ///
    /// Faces adjacent to the edge are erased (see
    /// [`erase_face`][Self::erase_face]). The neighboring half edges are
    /// linked to each other and the `outgoing` handles of both end vertices
    /// are updated. Vertices are never removed, they might be isolated
    /// afterwards.
    pub fn erase_half_edge(&mut self, half_edge: HalfEdgeHandle) -> Result<(), MeshError> {
        self.half_edge(half_edge)?;
        let he = half_edge;
        let twin = he.pair();

        for &side in &[he, twin] {
            if let Some(face) = self.half_edges[side].face.into_option() {
                self.erase_face_unchecked(face);
            }
        }

        self.unlink_pair(he);
        Ok(())
    }

    /// Removes the edge `half_edge` belongs to and everything that depends on
    /// it.
    ///
    /// - If the edge has no faces, it is erased. End vertices that become
    ///   isolated are removed as well.
    /// - Otherwise, all adjacent faces are removed via
    ///   [`remove_face`][Self::remove_face], which removes the edge, too.
    pub fn remove_half_edge(&mut self, half_edge: HalfEdgeHandle) -> Result<(), MeshError> {
        let HalfEdge { start, end, face, .. } = *self.half_edge(half_edge)?;
        let pair_face = self.half_edges[half_edge.pair()].face;

        match (face.into_option(), pair_face.into_option()) {
            (None, None) => {
                self.erase_half_edge(half_edge)?;
                for &vh in &[start, end] {
                    if self.vertices[vh].outgoing.is_none() {
                        self.vertices.remove(vh);
                    }
                }
            }
            (Some(face), None) | (None, Some(face)) => {
                self.remove_face(face)?;
            }
            (Some(face), Some(other)) => {
                self.remove_face(face)?;
                self.remove_face(other)?;
            }
        }

        Ok(())
    }

    /// Removes an isolated vertex. Fails with `VertexNotIsolated` if any half
    /// edge is still attached to it.
    pub fn erase_vertex(&mut self, vertex: VertexHandle) -> Result<(), MeshError> {
        if !self.vertex(vertex)?.is_isolated() {
            return Err(MeshError::VertexNotIsolated(vertex));
        }

        self.vertices.remove(vertex);
        trace!("erased {:?}", vertex);
        Ok(())
    }

    /// Removes the vertex with all adjacent faces and edges.
    ///
    /// Faces are removed via [`remove_face`][Self::remove_face], so other
    /// vertices that end up isolated are removed, too.
    pub fn remove_vertex(&mut self, vertex: VertexHandle) -> Result<(), MeshError> {
        self.check_vertex(vertex)?;

        let faces = self.circulate_around_vertex(vertex)
            .filter_map(|he| self.half_edges[he].face.into_option())
            .collect::<SmallVec<[_; 8]>>();
        for face in faces {
            self.remove_face(face)?;
        }

        // Free edges are not removed by removing faces.
        while let Some(he) = self.vertices.get(vertex).and_then(|v| v.outgoing.into_option()) {
            self.remove_half_edge(he)?;
        }

        if self.vertices.contains_handle(vertex) {
            self.vertices.remove(vertex);
        }

        trace!("removed {:?}", vertex);
        Ok(())
    }
}


// ===============================================================================================
// ===== Integrity check
// ===============================================================================================

impl<P, C: Config> HalfEdgeMesh<P, C> {
    /// Checks all invariants of the data structure and panics with a
    /// descriptive message if one is violated.
    ///
    /// This is meant for tests and debugging. It walks the whole mesh, so it
    /// is slow.
    pub fn check_integrity(&self) {
        // ----- Vertices ----------------------------------------------------
        for (vh, v) in self.vertices.iter() {
            if v.handle != vh {
                panic!("bug: vertex stored at {:?} thinks its handle is {:?}", vh, v.handle);
            }

            let outgoing = match v.outgoing.into_option() {
                None => continue,
                Some(he) => he,
            };
            let he = match self.half_edges.get(outgoing) {
                None => panic!(
                    "bug (broken reference): [{:?}].outgoing = {:?}, but that half edge \
                        does not exist!",
                    vh,
                    outgoing,
                ),
                Some(he) => he,
            };
            if he.start != vh {
                panic!(
                    "bug: [{:?}].outgoing = {:?}, but that half edge starts at {:?}",
                    vh,
                    outgoing,
                    he.start,
                );
            }

            let has_boundary = self.circulate_around_vertex(vh)
                .any(|he| self.half_edges[he].is_boundary());
            if has_boundary && !he.is_boundary() {
                panic!(
                    "bug: {:?} is a boundary vertex, but its outgoing half edge {:?} is not \
                        a boundary half edge",
                    vh,
                    outgoing,
                );
            }
        }

        // ----- Half edges --------------------------------------------------
        for (heh, he) in self.half_edges.iter() {
            if he.handle != heh {
                panic!("bug: half edge stored at {:?} thinks its handle is {:?}", heh, he.handle);
            }

            let pair = match self.half_edges.get(heh.pair()) {
                None => panic!("bug: {:?} exists, but its pair {:?} doesn't", heh, heh.pair()),
                Some(pair) => pair,
            };
            if pair.start != he.end || pair.end != he.start {
                panic!(
                    "bug: {:?} goes from {:?} to {:?}, but its pair {:?} goes from {:?} to {:?}",
                    heh,
                    he.start,
                    he.end,
                    heh.pair(),
                    pair.start,
                    pair.end,
                );
            }
            if he.start == he.end {
                panic!("bug: {:?} is a loop at {:?}", heh, he.start);
            }

            for &v in &[he.start, he.end] {
                match self.vertices.get(v) {
                    None => panic!(
                        "bug (broken reference): {:?} is adjacent to {:?}, but that vertex \
                            does not exist!",
                        heh,
                        v,
                    ),
                    Some(vertex) if vertex.is_isolated() => panic!(
                        "bug: {:?} is adjacent to {:?}, but that vertex is isolated",
                        heh,
                        v,
                    ),
                    Some(_) => {}
                }
            }

            if let Some(face) = he.face.into_option() {
                if !self.faces.contains_handle(face) {
                    panic!(
                        "bug (broken reference): [{:?}].face = {:?}, but that face does \
                            not exist!",
                        heh,
                        face,
                    );
                }
            }

            let next = match self.half_edges.get(he.next) {
                None => panic!(
                    "bug (broken reference): [{:?}].next = {:?}, but that half edge does \
                        not exist!",
                    heh,
                    he.next,
                ),
                Some(next) => next,
            };
            if next.prev != heh {
                panic!(
                    "bug: [{:?}].next = {:?}, but [{:?}].prev = {:?} (should be {:?})",
                    heh,
                    he.next,
                    he.next,
                    next.prev,
                    heh,
                );
            }
            if next.start != he.end {
                panic!(
                    "bug: {:?} ends at {:?}, but its next half edge {:?} starts at {:?}",
                    heh,
                    he.end,
                    he.next,
                    next.start,
                );
            }
            if next.face != he.face {
                panic!(
                    "bug: {:?} has face {:?}, but its next half edge {:?} has face {:?}",
                    heh,
                    he.face,
                    he.next,
                    next.face,
                );
            }
            if !self.half_edges.contains_handle(he.prev) {
                panic!(
                    "bug (broken reference): [{:?}].prev = {:?}, but that half edge does \
                        not exist!",
                    heh,
                    he.prev,
                );
            }

            // Every half edge has to be reachable by circulating around its
            // start vertex.
            if !self.circulate_around_vertex(he.start).any(|out| out == heh) {
                panic!(
                    "bug: {:?} starts at {:?}, but is not found when circulating around \
                        that vertex",
                    heh,
                    he.start,
                );
            }
        }

        // ----- Faces -------------------------------------------------------
        for (fh, f) in self.faces.iter() {
            if f.handle != fh {
                panic!("bug: face stored at {:?} thinks its handle is {:?}", fh, f.handle);
            }
            match self.half_edges.get(f.first) {
                None => panic!(
                    "bug (broken reference): [{:?}].first = {:?}, but that half edge does \
                        not exist!",
                    fh,
                    f.first,
                ),
                Some(he) if he.face != Opt::some(fh) => panic!(
                    "bug: [{:?}].first = {:?}, but that half edge has face {:?}",
                    fh,
                    f.first,
                    he.face,
                ),
                Some(_) => {}
            }

            let valence = self.circulate_around_face(f.first).count();
            if valence < 3 {
                panic!("bug: {:?} has only {} half edges", fh, valence);
            }
            if <C::FaceKind as FaceKind>::ONLY_TRIANGLES && valence != 3 {
                panic!("bug: {:?} has {} half edges in a triangle mesh", fh, valence);
            }
        }
    }
}

impl<P, C: Config> Mesh for HalfEdgeMesh<P, C> {
    fn num_vertices(&self) -> hsize {
        HalfEdgeMesh::num_vertices(self)
    }

    fn num_edges(&self) -> hsize {
        HalfEdgeMesh::num_edges(self)
    }

    fn num_faces(&self) -> hsize {
        HalfEdgeMesh::num_faces(self)
    }

    fn contains_vertex(&self, vertex: VertexHandle) -> bool {
        HalfEdgeMesh::contains_vertex(self, vertex)
    }

    fn contains_edge(&self, edge: EdgeHandle) -> bool {
        HalfEdgeMesh::contains_edge(self, edge)
    }

    fn contains_face(&self, face: FaceHandle) -> bool {
        HalfEdgeMesh::contains_face(self, face)
    }
}
