//! Local remeshing operators for triangle meshes: edge collapse, flip and
//! split.
//!
//! All operators are free functions taking the mesh as argument. They are
//! only available for half edge meshes configured with [`TriFaces`]; using
//! them with a polygon mesh is a compile error:
//!
//! ```compile_fail
//! use hemesh::{HalfEdgeMesh, EdgeHandle, Handle, algo::remesh};
//!
//! let mut mesh = HalfEdgeMesh::<[f32; 3]>::new();
//! remesh::flip_edge(&mut mesh, EdgeHandle::new(0));
//! ```
//!
//! Each operator checks everything that could go wrong before changing the
//! mesh. It then removes the affected faces (and edges) with the
//! non-cascading primitives ([`erase_face`][HalfEdgeMesh::erase_face],
//! [`erase_half_edge`][HalfEdgeMesh::erase_half_edge]) and inserts the new
//! ones with [`add_face`][HalfEdgeMesh::add_face]. Vertices of the
//! neighborhood thus keep their handles.

use smallvec::SmallVec;
use tracing::debug;

use crate::{
    ds::{Config, TriFaces, HalfEdgeMesh},
    error::MeshError,
    handle::{EdgeHandle, FaceHandle, HalfEdgeHandle, VertexHandle},
    math::Position,
};


/// Returns the vertex of the triangle of `he` that is not adjacent to `he`.
fn opposite_vertex<P, C>(
    mesh: &HalfEdgeMesh<P, C>,
    he: HalfEdgeHandle,
) -> Result<VertexHandle, MeshError>
where
    C: Config<FaceKind = TriFaces>,
{
    let next = mesh.half_edge(he)?.next();
    Ok(mesh.half_edge(next)?.end())
}

/// Flips the given interior edge.
///
/// ```text
///          (c)                     (c)
///         /   \                   / | \
///        /  F0 \                 /  |  \
///      (a) ---> (b)     =>     (a)  |  (b)
///        \  F1 /                 \  |  /
///         \   /                   \ | /
///          (d)                     (d)
/// ```
///
/// Both faces are replaced by the two triangles using the other diagonal
/// `c -- d`. Fails with `BoundaryEdge` if the edge doesn't have a face on
/// both sides, and with `EdgeExists` if `c` and `d` are already connected.
pub fn flip_edge<P, C>(mesh: &mut HalfEdgeMesh<P, C>, edge: EdgeHandle) -> Result<(), MeshError>
where
    C: Config<FaceKind = TriFaces>,
    P: Position,
{
    let e = mesh.edge(edge)?;
    let (f0, f1) = match e.faces() {
        [Some(f0), Some(f1)] => (f0, f1),
        _ => return Err(MeshError::BoundaryEdge(edge)),
    };

    let he = e.half_edge();
    let (a, b) = (e.start(), e.end());
    let c = opposite_vertex(mesh, he)?;
    let d = opposite_vertex(mesh, he.pair())?;
    if c == d || mesh.half_edge_between(c, d).is_some() {
        return Err(MeshError::EdgeExists(c, d));
    }

    mesh.erase_face(f0)?;
    mesh.erase_face(f1)?;
    mesh.erase_half_edge(he)?;
    mesh.add_triangle([a, d, c])?;
    mesh.add_triangle([d, b, c])?;

    debug!("flipped {:?} ({:?} -- {:?} is now {:?} -- {:?})", edge, a, b, c, d);
    Ok(())
}

/// Splits the given edge at its midpoint and returns the new vertex.
///
/// ```text
///          (c)                     (c)
///         /   \                   / | \
///        /     \                 /  |  \
///      (a) ---> (b)     =>     (a)-(m)-(b)
///        \     /                 \  |  /
///         \   /                   \ | /
///          (d)                     (d)
/// ```
///
/// Each adjacent triangle is split into two. This works for interior,
/// boundary and free edges (the latter simply become two free edges).
pub fn split_edge<P, C>(
    mesh: &mut HalfEdgeMesh<P, C>,
    edge: EdgeHandle,
) -> Result<VertexHandle, MeshError>
where
    C: Config<FaceKind = TriFaces>,
    P: Position,
{
    let e = mesh.edge(edge)?;
    let he = e.half_edge();
    let (a, b) = (e.start(), e.end());
    let [f0, f1] = e.faces();
    let c = match f0 {
        Some(_) => Some(opposite_vertex(mesh, he)?),
        None => None,
    };
    let d = match f1 {
        Some(_) => Some(opposite_vertex(mesh, he.pair())?),
        None => None,
    };
    let position = mesh.position(a)?.halfway(*mesh.position(b)?);

    mesh.erase_half_edge(he)?;
    let m = mesh.add_vertex(position);

    if let Some(c) = c {
        mesh.add_triangle([a, m, c])?;
        mesh.add_triangle([m, b, c])?;
    }
    if let Some(d) = d {
        mesh.add_triangle([b, m, d])?;
        mesh.add_triangle([m, a, d])?;
    }
    if c.is_none() && d.is_none() {
        mesh.add_pair(a, m)?;
        mesh.add_pair(m, b)?;
    }

    debug!("split {:?} ({:?} -- {:?}) at new vertex {:?}", edge, a, b, m);
    Ok(m)
}

/// Collapses the given edge into a single new vertex at its midpoint and
/// returns that vertex.
///
/// All faces around both endpoints are replaced by a fan around the new
/// vertex; the (one or two) faces adjacent to the edge disappear. Free edges
/// at the endpoints are reconnected to the new vertex.
///
/// The collapse is rejected with `CollapseNotAllowed` if it would produce a
/// non-manifold mesh. That's the case if:
/// - the endpoints have more common neighbors than the edge has faces (the
///   so called *link condition*),
/// - both endpoints are on the boundary but the edge is interior,
/// - or two faces of the new fan would be the same triangle with opposite
///   orientation.
pub fn collapse_edge<P, C>(
    mesh: &mut HalfEdgeMesh<P, C>,
    edge: EdgeHandle,
) -> Result<VertexHandle, MeshError>
where
    C: Config<FaceKind = TriFaces>,
    P: Position,
{
    let e = mesh.edge(edge)?;
    let (a, b) = (e.start(), e.end());

    // ----- Check the link condition ----------------------------------------
    let neighbors_a = mesh.neighbors(a)?.collect::<SmallVec<[_; 8]>>();
    let neighbors_b = mesh.neighbors(b)?.collect::<SmallVec<[_; 8]>>();
    let num_common = neighbors_a.iter().filter(|v| neighbors_b.contains(v)).count();
    let num_edge_faces = e.faces().iter().filter(|f| f.is_some()).count();
    if num_common != num_edge_faces {
        return Err(MeshError::CollapseNotAllowed(edge));
    }
    if mesh.is_boundary_vertex(a) && mesh.is_boundary_vertex(b) && !e.is_boundary() {
        return Err(MeshError::CollapseNotAllowed(edge));
    }

    // ----- Collect the neighborhood ----------------------------------------
    // For each face around `a` or `b`, the edge opposite to that vertex
    // becomes the outer edge of a new face around the merged vertex. Faces
    // containing both `a` and `b` have no such edge.
    let mut faces = SmallVec::<[FaceHandle; 16]>::new();
    let mut outer = SmallVec::<[(VertexHandle, VertexHandle); 16]>::new();
    let mut incident = SmallVec::<[HalfEdgeHandle; 16]>::new();
    for &center in &[a, b] {
        for he in mesh.outgoing_half_edges(center)? {
            let half_edge = mesh.half_edge(he)?;
            if !incident.iter().any(|other| other.full_edge() == he.full_edge()) {
                incident.push(he);
            }

            let face = match half_edge.face() {
                Some(f) if !faces.contains(&f) => f,
                _ => continue,
            };
            faces.push(face);

            let opposite = mesh.half_edge(half_edge.next())?;
            let (u, w) = (opposite.start(), opposite.end());
            if u != a && u != b && w != a && w != b {
                outer.push((u, w));
            }
        }
    }

    if outer.iter().any(|&(u, w)| outer.contains(&(w, u))) {
        return Err(MeshError::CollapseNotAllowed(edge));
    }

    let others = neighbors_a.iter()
        .chain(&neighbors_b)
        .copied()
        .filter(|&v| v != a && v != b)
        .collect::<SmallVec<[_; 16]>>();
    let position = mesh.position(a)?.halfway(*mesh.position(b)?);

    // ----- Remove the old neighborhood -------------------------------------
    for face in faces {
        mesh.erase_face(face)?;
    }
    for he in incident {
        mesh.erase_half_edge(he)?;
    }
    mesh.erase_vertex(a)?;
    mesh.erase_vertex(b)?;

    // ----- Insert the new fan ----------------------------------------------
    let m = mesh.add_vertex(position);
    for (u, w) in ring_order(outer) {
        mesh.add_triangle([m, u, w])?;
    }
    for v in others {
        if mesh.half_edge_between(m, v).is_none() {
            mesh.add_pair(m, v)?;
        }
    }

    debug!("collapsed {:?} ({:?} -- {:?}) into {:?}", edge, a, b, m);
    Ok(m)
}

/// Orders the outer edges of a fan such that each edge starts where the
/// previous one ended, as far as possible. Adding the fan faces in this
/// order means each new face shares an edge with the previous one.
fn ring_order(
    mut edges: SmallVec<[(VertexHandle, VertexHandle); 16]>,
) -> SmallVec<[(VertexHandle, VertexHandle); 16]> {
    let mut out = SmallVec::with_capacity(edges.len());
    while !edges.is_empty() {
        // Start a chain where no other edge ends, if there is such an edge.
        // Otherwise the remaining edges form a closed ring.
        let start = edges.iter()
            .position(|&(u, _)| edges.iter().all(|&(_, w)| w != u))
            .unwrap_or(0);
        let mut current = edges.swap_remove(start);
        out.push(current);

        while let Some(i) = edges.iter().position(|&(u, _)| u == current.1) {
            current = edges.swap_remove(i);
            out.push(current);
        }
    }
    out
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ds::TriConfig, handle::{hsize, Handle}};

    type TriMesh = HalfEdgeMesh<[f64; 2], TriConfig>;

    fn assert_counts(mesh: &TriMesh, v: hsize, e: hsize, f: hsize) {
        assert_eq!((mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()), (v, e, f));
    }

    /// ```text
    ///   (d) ------ (c)
    ///    |       /  |
    ///    |     /    |
    ///    |   /      |
    ///   (a) ------ (b)
    /// ```
    fn quad() -> (TriMesh, [VertexHandle; 4]) {
        let mut mesh = TriMesh::new();
        let a = mesh.add_vertex([0.0, 0.0]);
        let b = mesh.add_vertex([2.0, 0.0]);
        let c = mesh.add_vertex([2.0, 2.0]);
        let d = mesh.add_vertex([0.0, 2.0]);
        mesh.add_triangle([a, b, c]).unwrap();
        mesh.add_triangle([a, c, d]).unwrap();
        (mesh, [a, b, c, d])
    }

    /// A center vertex surrounded by four triangles.
    fn closed_fan() -> (TriMesh, VertexHandle, [VertexHandle; 4]) {
        let mut mesh = TriMesh::new();
        let m = mesh.add_vertex([0.0, 0.0]);
        let ring = [
            mesh.add_vertex([-1.0, -1.0]),
            mesh.add_vertex([1.0, -1.0]),
            mesh.add_vertex([1.0, 1.0]),
            mesh.add_vertex([-1.0, 1.0]),
        ];
        for i in 0..4 {
            mesh.add_triangle([m, ring[i], ring[(i + 1) % 4]]).unwrap();
        }
        (mesh, m, ring)
    }

    fn face_sets(mesh: &TriMesh) -> Vec<Vec<VertexHandle>> {
        let mut out = mesh.face_handles()
            .map(|f| {
                let mut vs = mesh.face_vertices(f).unwrap().collect::<Vec<_>>();
                vs.sort();
                vs
            })
            .collect::<Vec<_>>();
        out.sort();
        out
    }

    #[test]
    fn flip_diagonal() {
        let (mut mesh, [a, b, c, d]) = quad();
        let diagonal = mesh.edge_between(a, c).unwrap().handle();

        flip_edge(&mut mesh, diagonal).unwrap();
        mesh.check_integrity();

        assert_counts(&mesh, 4, 5, 2);
        assert!(mesh.edge_between(a, c).is_none());
        assert!(!mesh.edge_between(b, d).unwrap().is_boundary());
        assert_eq!(face_sets(&mesh), vec![vec![a, b, d], vec![b, c, d]]);

        // Flipping twice gives the original connectivity back.
        let diagonal = mesh.edge_between(b, d).unwrap().handle();
        flip_edge(&mut mesh, diagonal).unwrap();
        mesh.check_integrity();
        assert_eq!(face_sets(&mesh), vec![vec![a, b, c], vec![a, c, d]]);
    }

    #[test]
    fn flip_rejects_invalid_edges() {
        let (mut mesh, [a, b, c, d]) = quad();
        let boundary = mesh.edge_between(a, b).unwrap().handle();
        assert_eq!(flip_edge(&mut mesh, boundary), Err(MeshError::BoundaryEdge(boundary)));

        let missing = EdgeHandle::new(99);
        assert_eq!(flip_edge(&mut mesh, missing), Err(MeshError::EdgeNotFound(missing)));

        // Connect `b` and `d` around the outside, so the other diagonal
        // already exists.
        mesh.add_pair(b, d).unwrap().unwrap();
        let diagonal = mesh.edge_between(a, c).unwrap().handle();
        match flip_edge(&mut mesh, diagonal) {
            Err(MeshError::EdgeExists(x, y)) => assert_eq_set!(vec![x, y], [b, d]),
            other => panic!("unexpected result: {:?}", other),
        }

        mesh.check_integrity();
        assert_counts(&mesh, 4, 6, 2);
    }

    #[test]
    fn split_interior_edge() {
        let (mut mesh, [a, b, c, d]) = quad();
        let diagonal = mesh.edge_between(a, c).unwrap().handle();

        let m = split_edge(&mut mesh, diagonal).unwrap();
        mesh.check_integrity();

        assert_counts(&mesh, 5, 8, 4);
        assert_eq!(mesh.position(m), Ok(&[1.0, 1.0]));
        assert_eq!(mesh.valence(m), Ok(4));
        assert!(!mesh.is_boundary_vertex(m));
        assert_eq_set!(mesh.neighbors(m).unwrap(), [a, b, c, d]);
        assert!(mesh.edge_between(a, c).is_none());
    }

    #[test]
    fn split_boundary_edge() {
        let (mut mesh, [a, b, c, _]) = quad();
        let bottom = mesh.edge_between(a, b).unwrap().handle();

        let m = split_edge(&mut mesh, bottom).unwrap();
        mesh.check_integrity();

        assert_counts(&mesh, 5, 7, 3);
        assert_eq!(mesh.position(m), Ok(&[1.0, 0.0]));
        assert_eq_set!(mesh.neighbors(m).unwrap(), [a, b, c]);
        assert!(mesh.is_boundary_vertex(m));
        assert!(mesh.edge_between(a, m).unwrap().is_boundary());
    }

    #[test]
    fn split_free_edge() {
        let mut mesh = TriMesh::new();
        let a = mesh.add_vertex([0.0, 0.0]);
        let b = mesh.add_vertex([0.0, 4.0]);
        let he = mesh.add_pair(a, b).unwrap().unwrap();

        let m = split_edge(&mut mesh, he.full_edge()).unwrap();
        mesh.check_integrity();

        assert_counts(&mesh, 3, 2, 0);
        assert_eq!(mesh.position(m), Ok(&[0.0, 2.0]));
        assert_eq_set!(mesh.neighbors(m).unwrap(), [a, b]);
    }

    #[test]
    fn collapse_spoke_of_fan() {
        let (mut mesh, center, ring) = closed_fan();
        let spoke = mesh.edge_between(center, ring[0]).unwrap().handle();

        let m = collapse_edge(&mut mesh, spoke).unwrap();
        mesh.check_integrity();

        assert_counts(&mesh, 4, 5, 2);
        assert!(!mesh.contains_vertex(center));
        assert!(!mesh.contains_vertex(ring[0]));
        assert_eq!(mesh.position(m), Ok(&[-0.5, -0.5]));
        assert_eq_set!(mesh.neighbors(m).unwrap(), [ring[1], ring[2], ring[3]]);
        assert_eq!(face_sets(&mesh).len(), 2);
    }

    #[test]
    fn collapse_boundary_edge() {
        let (mut mesh, [a, b, c, d]) = quad();
        let bottom = mesh.edge_between(a, b).unwrap().handle();

        let m = collapse_edge(&mut mesh, bottom).unwrap();
        mesh.check_integrity();

        assert_counts(&mesh, 3, 3, 1);
        let mut expected = vec![m, c, d];
        expected.sort();
        assert_eq!(face_sets(&mesh), vec![expected]);
    }

    #[test]
    fn collapse_single_triangle_leaves_free_edge() {
        let mut mesh = TriMesh::new();
        let a = mesh.add_vertex([0.0, 0.0]);
        let b = mesh.add_vertex([2.0, 0.0]);
        let c = mesh.add_vertex([0.0, 2.0]);
        mesh.add_triangle([a, b, c]).unwrap();
        let ab = mesh.edge_between(a, b).unwrap().handle();

        let m = collapse_edge(&mut mesh, ab).unwrap();
        mesh.check_integrity();
        assert_counts(&mesh, 2, 1, 0);
        assert!(mesh.edge_between(m, c).unwrap().is_isolated());
    }

    #[test]
    fn collapse_rejects_non_manifold_results() {
        // Interior edge between two boundary vertices.
        let (mut mesh, [a, b, c, _]) = quad();
        let diagonal = mesh.edge_between(a, c).unwrap().handle();
        assert_eq!(
            collapse_edge(&mut mesh, diagonal),
            Err(MeshError::CollapseNotAllowed(diagonal)),
        );

        // Link condition: `a` and `b` have the common neighbors `c` and `x`,
        // but only one face at their edge.
        let x = mesh.add_vertex([1.0, -1.0]);
        mesh.add_pair(a, x).unwrap().unwrap();
        mesh.add_pair(x, b).unwrap().unwrap();
        let bottom = mesh.edge_between(a, b).unwrap().handle();
        assert_eq!(
            collapse_edge(&mut mesh, bottom),
            Err(MeshError::CollapseNotAllowed(bottom)),
        );

        mesh.check_integrity();
        assert_counts(&mesh, 5, 7, 2);
    }

    #[test]
    fn random_flips_splits_and_collapses() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        for seed in 0..50 {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut mesh = TriMesh::new();
            let vertices = (0..16)
                .map(|i| mesh.add_vertex([(i % 4) as f64, (i / 4) as f64]))
                .collect::<Vec<_>>();
            let v = |x: usize, y: usize| vertices[y * 4 + x];
            for y in 0..3 {
                for x in 0..3 {
                    mesh.add_triangle([v(x, y), v(x + 1, y), v(x + 1, y + 1)]).unwrap();
                    mesh.add_triangle([v(x, y), v(x + 1, y + 1), v(x, y + 1)]).unwrap();
                }
            }

            for _ in 0..40 {
                let edges = mesh.edge_handles().collect::<Vec<_>>();
                if edges.is_empty() {
                    break;
                }
                let e = edges[rng.random_range(0..edges.len())];
                let _ = match rng.random_range(0..3) {
                    0 => flip_edge(&mut mesh, e),
                    1 => split_edge(&mut mesh, e).map(|_| ()),
                    _ => collapse_edge(&mut mesh, e).map(|_| ()),
                };
                mesh.check_integrity();
            }
        }
    }
}
