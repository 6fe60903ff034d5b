//! Tests of structural properties that have to hold for any mesh built via
//! the public API.

use hemesh::{
    algo::remesh,
    prelude::*,
    hsize, EdgeHandle, FaceHandle, HalfEdgeHandle, HalfEdgeMesh, MeshError, PolyConfig,
    TriConfig, VertexHandle,
};


/// Creates a regular `n` x `n` vertex grid in which every quad is split into
/// two triangles.
fn grid<C: Config>(n: u32) -> (HalfEdgeMesh<[f64; 2], C>, Vec<VertexHandle>) {
    let mut mesh = HalfEdgeMesh::new();
    let mut vertices = Vec::new();
    for y in 0..n {
        for x in 0..n {
            vertices.push(mesh.add_vertex([x as f64, y as f64]));
        }
    }

    let v = |x: u32, y: u32| vertices[(y * n + x) as usize];
    for y in 0..n - 1 {
        for x in 0..n - 1 {
            mesh.add_triangle([v(x, y), v(x + 1, y), v(x + 1, y + 1)]).unwrap();
            mesh.add_triangle([v(x, y), v(x + 1, y + 1), v(x, y + 1)]).unwrap();
        }
    }

    (mesh, vertices)
}

/// Collects the handles of the given elements, in iteration order.
fn handles<'a, E: Element + 'a>(elements: impl Iterator<Item = &'a E>) -> Vec<E::Handle> {
    elements.map(|e| e.handle()).collect()
}

fn counts(mesh: &impl Mesh) -> (hsize, hsize, hsize) {
    (mesh.num_vertices(), mesh.num_edges(), mesh.num_faces())
}

fn euler_characteristic<P, C: Config>(mesh: &HalfEdgeMesh<P, C>) -> i64 {
    mesh.num_vertices() as i64 - mesh.num_edges() as i64 + mesh.num_faces() as i64
}

/// Checks the basic half edge properties via the public API only.
fn check_properties<P, C: Config>(mesh: &HalfEdgeMesh<P, C>) {
    mesh.check_integrity();

    for he in mesh.half_edges() {
        let h = he.handle();
        assert_eq!(h.pair().pair(), h);
        assert_eq!(h.pair(), he.pair());
        assert_eq!(he.is_boundary(), he.face().is_none());
        assert_eq!(mesh.is_boundary_half_edge(h), he.face().is_none());

        let next = mesh.half_edge(he.next()).unwrap();
        assert_eq!(next.prev(), h);
        assert_eq!(next.start(), he.end());
        assert_eq!(next.face(), he.face());

        let twin = mesh.half_edge(h.pair()).unwrap();
        assert_eq!((twin.start(), twin.end()), (he.end(), he.start()));
    }

    for face in mesh.faces() {
        let valence = mesh.face_valence(face.handle()).unwrap();
        assert!(valence >= 3);

        // Following `next` `valence` times returns to the start.
        let mut he = face.first_half_edge();
        for _ in 0..valence {
            assert_eq!(mesh.half_edge(he).unwrap().face(), Some(face.handle()));
            he = mesh.half_edge(he).unwrap().next();
        }
        assert_eq!(he, face.first_half_edge());
    }

    for e in mesh.edges() {
        assert_eq!(e.half_edge().full_edge(), e.handle());
        assert_eq!(e.is_boundary(), mesh.is_boundary_edge(e.handle()));
    }
}

#[test]
fn single_triangle() {
    let mut mesh = HalfEdgeMesh::<[f64; 2]>::new();
    let a = mesh.add_vertex([0.0, 0.0]);
    let b = mesh.add_vertex([1.0, 0.0]);
    let c = mesh.add_vertex([0.0, 1.0]);
    let f = mesh.add_face(&[a, b, c]).unwrap();

    check_properties(&mesh);
    assert_eq!((mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()), (3, 3, 1));
    assert_eq!(mesh.num_half_edges(), 6);
    assert!(mesh.edges().all(|e| e.is_boundary()));
    assert!(mesh.vertex_handles().all(|v| mesh.is_boundary_vertex(v)));
    assert!(mesh.is_isolated_face(f));

    mesh.remove_face(f).unwrap();
    check_properties(&mesh);
    assert_eq!(counts(&mesh), (0, 0, 0));
    assert!(Mesh::is_empty(&mesh));
}

#[test]
fn two_triangles() {
    let mut mesh = HalfEdgeMesh::<[f64; 2]>::new();
    let a = mesh.add_vertex([0.0, 0.0]);
    let b = mesh.add_vertex([1.0, 0.0]);
    let c = mesh.add_vertex([1.0, 1.0]);
    let d = mesh.add_vertex([0.0, 1.0]);
    mesh.add_face(&[a, b, c]).unwrap();
    mesh.add_face(&[a, c, d]).unwrap();

    check_properties(&mesh);
    assert_eq!((mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()), (4, 5, 2));

    let shared = mesh.edge_between(a, c).unwrap();
    assert!(!shared.is_boundary());
    assert_eq!(mesh.edges().filter(|e| e.is_boundary()).count(), 4);
}

#[test]
fn grid_mesh() {
    let (mesh, vertices) = grid::<PolyConfig>(4);
    check_properties(&mesh);

    assert_eq!((mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()), (16, 33, 18));
    assert_eq!(euler_characteristic(&mesh), 1);
    assert_eq!(mesh.edges().filter(|e| e.is_boundary()).count(), 12);

    // Interior vertices have six neighbors in this triangulation.
    let interior = [vertices[5], vertices[6], vertices[9], vertices[10]];
    for &v in &interior {
        assert!(!mesh.is_boundary_vertex(v));
        assert_eq!(mesh.valence(v), Ok(6));
        assert_eq!(mesh.adjacent_faces(v).unwrap().count(), 6);
    }
    let num_boundary = mesh.vertex_handles().filter(|&v| mesh.is_boundary_vertex(v)).count();
    assert_eq!(num_boundary, 12);
}

#[test]
fn invalid_operations_report_errors() {
    let (mut mesh, vertices) = grid::<TriConfig>(3);
    let center = vertices[4];
    let missing = VertexHandle::new(100);

    assert_eq!(mesh.add_face(&[vertices[0], missing, vertices[1]]), Err(MeshError::VertexNotFound(missing)));
    assert_eq!(mesh.erase_vertex(center), Err(MeshError::VertexNotIsolated(center)));
    assert_eq!(
        mesh.add_pair(center, vertices[2]),
        Err(MeshError::VertexNotOnBoundary(center)),
    );
    assert_eq!(mesh.erase_face(FaceHandle::new(99)), Err(MeshError::FaceNotFound(FaceHandle::new(99))));
    assert_eq!(
        mesh.erase_half_edge(HalfEdgeHandle::new(999)),
        Err(MeshError::HalfEdgeNotFound(HalfEdgeHandle::new(999))),
    );
    assert_eq!(
        mesh.add_face(&[vertices[0], vertices[1], vertices[2], vertices[5]]),
        Err(MeshError::NotATriangle(4)),
    );

    check_properties(&mesh);
    assert_eq!((mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()), (9, 16, 8));
}

#[test]
fn clone_is_independent() {
    let (mesh, vertices) = grid::<PolyConfig>(3);
    let mut copy = mesh.clone();

    copy.remove_vertex(vertices[4]).unwrap();
    copy.set_position(vertices[2], [7.0, 7.0]).unwrap();
    check_properties(&copy);

    check_properties(&mesh);
    assert_eq!(mesh.num_faces(), 8);
    assert_eq!(copy.num_faces(), 2);
    assert_eq!(mesh.position(vertices[2]), Ok(&[2.0, 0.0]));
    assert!(mesh.contains_vertex(vertices[4]));
}

#[test]
fn clean_compacts_indices() {
    let (mut mesh, vertices) = grid::<PolyConfig>(4);
    mesh.remove_vertex(vertices[5]).unwrap();
    mesh.remove_vertex(vertices[15]).unwrap();
    let isolated = mesh.add_vertex([10.0, 10.0]);
    assert!(mesh.next_vertex_index() > mesh.num_vertices());

    mesh.clean(true);
    check_properties(&mesh);

    // The isolated vertex was culled and everything is numbered densely.
    assert!(!mesh.contains_vertex(isolated));
    assert_eq!(mesh.next_vertex_index(), mesh.num_vertices());
    assert_eq!(mesh.next_half_edge_index(), mesh.num_half_edges());
    assert_eq!(mesh.next_face_index(), mesh.num_faces());
    assert!(mesh.vertex_handles().map(|v| v.idx()).eq(0..mesh.num_vertices()));
    assert!(mesh.half_edge_handles().map(|h| h.idx()).eq(0..mesh.num_half_edges()));
    assert!(mesh.face_handles().map(|f| f.idx()).eq(0..mesh.num_faces()));
    assert!(mesh.edge_handles().map(|e| e.idx()).eq(0..mesh.num_edges()));
}

#[test]
fn face_vertex_conversion() {
    let (mut mesh, vertices) = grid::<PolyConfig>(4);
    mesh.remove_vertex(vertices[6]).unwrap();
    let fv = mesh.to_face_vertex();

    assert_eq!(counts(&fv), counts(&mesh));
    assert!(!Mesh::is_empty(&fv));
    assert_eq!(handles(fv.vertices()), handles(mesh.vertices()));
    assert_eq!(handles(fv.faces()), handles(mesh.faces()));
    assert!(!fv.contains_vertex(vertices[6]));

    for e in mesh.edges() {
        let converted = fv.edge(e.handle()).unwrap();
        assert_eq!(converted.vertices(), [e.start(), e.end()]);
        assert_eq!(converted.is_boundary(), e.is_boundary());
    }
    for f in mesh.faces() {
        let corners = mesh.face_vertices(f.handle()).unwrap().collect::<Vec<_>>();
        assert_eq!(fv.face(f.handle()).unwrap().vertices(), &corners[..]);
    }
}

#[test]
fn splitting_all_edges_keeps_topology() {
    let (mut mesh, _) = grid::<TriConfig>(4);
    let edges = mesh.edge_handles().collect::<Vec<EdgeHandle>>();
    let num_boundary = mesh.edges().filter(|e| e.is_boundary()).count() as hsize;

    for &e in &edges {
        remesh::split_edge(&mut mesh, e).unwrap();
    }

    check_properties(&mesh);
    assert_eq!(mesh.num_vertices(), 16 + 33);
    assert_eq!(mesh.num_faces(), 18 + 2 * (33 - num_boundary) + num_boundary);
    assert_eq!(euler_characteristic(&mesh), 1);
}

#[test]
fn flipping_and_collapsing_interior_edges() {
    let (mut mesh, vertices) = grid::<TriConfig>(4);

    let a = vertices[5];
    let b = vertices[6];
    let edge = mesh.edge_between(a, b).unwrap().handle();
    let m = remesh::collapse_edge(&mut mesh, edge).unwrap();

    check_properties(&mesh);
    assert_eq!((mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()), (15, 30, 16));
    assert_eq!(mesh.valence(m), Ok(8));
    assert!(!mesh.is_boundary_vertex(m));
    assert_eq!(mesh.position(m), Ok(&[1.5, 1.0]));

    let interior = mesh.edges()
        .filter(|e| !e.is_boundary())
        .map(|e| e.handle())
        .collect::<Vec<_>>();
    let mut num_flipped = 0;
    for e in interior {
        if remesh::flip_edge(&mut mesh, e).is_ok() {
            num_flipped += 1;
        }
    }

    check_properties(&mesh);
    assert!(num_flipped > 0);
    assert_eq!((mesh.num_vertices(), mesh.num_edges(), mesh.num_faces()), (15, 30, 16));
}
