//! Handles to refer to mesh elements.
//!
//! Mesh elements never reference each other directly. Instead, they store
//! handles: small `Copy` types that wrap an index into the arena of the mesh
//! owning the element. A handle stays valid until the element is removed or
//! the mesh is compacted via [`HalfEdgeMesh::clean`][crate::HalfEdgeMesh::clean].

use std::{fmt, hash::Hash};

use optional::{Noned, OptEq, Optioned};
use static_assertions::assert_eq_size;


/// The integer type used as index in all handles.
///
/// This is `u32` by default, which is sufficient for meshes with up to
/// roughly four billion elements of one kind. If you need more, enable the
/// `large-handle` feature to use `u64` instead.
#[cfg(not(feature = "large-handle"))]
#[allow(non_camel_case_types)]
pub type hsize = u32;

/// The integer type used as index in all handles.
#[cfg(feature = "large-handle")]
#[allow(non_camel_case_types)]
pub type hsize = u64;


/// Types that are handles to mesh elements.
///
/// The index `hsize::max_value()` is never handed out. It is reserved as the
/// sentinel value for "no element" (see [`Opt`]).
pub trait Handle: 'static + Copy + fmt::Debug + Eq + Ord + Hash {
    /// Creates a handle from the given index.
    fn new(idx: hsize) -> Self;

    /// Returns the index of this handle.
    fn idx(&self) -> hsize;

    /// Creates a handle from a `usize` index.
    ///
    /// Panics if the index does not fit into `hsize`.
    #[inline(always)]
    fn from_usize(raw: usize) -> Self {
        assert!(
            raw < hsize::max_value() as usize,
            "index {} does not fit into a handle (enable the `large-handle` feature?)",
            raw,
        );
        Self::new(raw as hsize)
    }

    /// Returns the index of this handle as `usize`.
    #[inline(always)]
    fn to_usize(&self) -> usize {
        self.idx() as usize
    }
}

/// A nullable handle that has the same size as the handle itself.
pub type Opt<H> = Optioned<H>;

macro_rules! make_handle_type {
    ($(#[$attr:meta])* $name:ident = $short:expr;) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(hsize);

        impl Handle for $name {
            #[inline(always)]
            fn new(idx: hsize) -> Self {
                $name(idx)
            }

            #[inline(always)]
            fn idx(&self) -> hsize {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}{}", $short, self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                fmt::Debug::fmt(self, f)
            }
        }

        impl Noned for $name {
            #[inline(always)]
            fn is_none(&self) -> bool {
                self.0 == hsize::max_value()
            }

            #[inline(always)]
            fn get_none() -> Self {
                $name(hsize::max_value())
            }
        }

        impl OptEq for $name {
            #[inline(always)]
            fn opt_eq(&self, other: &Self) -> bool {
                self == other
            }
        }
    };
}

make_handle_type! {
    /// Handle to refer to a vertex.
    VertexHandle = "V";
}

make_handle_type! {
    /// Handle to refer to a face.
    FaceHandle = "F";
}

make_handle_type! {
    /// Handle to refer to a full edge (a pair of half edges).
    EdgeHandle = "E";
}

make_handle_type! {
    /// Handle to refer to a half edge.
    ///
    /// Half edges are always stored in pairs: the two halves of one edge
    /// have the indices `2k` and `2k + 1`. This lets us find the pair and
    /// the full edge of a half edge without storing anything.
    HalfEdgeHandle = "HE";
}

assert_eq_size!(Opt<VertexHandle>, VertexHandle);
assert_eq_size!(Opt<HalfEdgeHandle>, HalfEdgeHandle);

impl HalfEdgeHandle {
    /// Returns the half edge with the lower (even) index of the given edge.
    ///
    /// This method does not check if the half edge actually exists.
    #[inline(always)]
    pub fn lower_half_of(edge: EdgeHandle) -> Self {
        Self(edge.idx() * 2)
    }

    /// Returns the other half of the edge this half edge belongs to.
    ///
    /// The two halves only differ in the lowest bit of their index.
    #[inline(always)]
    pub fn pair(self) -> Self {
        Self(self.0 ^ 1)
    }

    /// Returns the full edge this half edge belongs to.
    #[inline(always)]
    pub fn full_edge(self) -> EdgeHandle {
        EdgeHandle::new(self.0 / 2)
    }

    /// Returns `true` if this is the half with the even index, i.e. the
    /// representative of its full edge.
    #[inline(always)]
    pub fn is_lower_half(self) -> bool {
        self.0 & 1 == 0
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pair_and_full_edge() {
        let he = HalfEdgeHandle::new(6);
        assert_eq!(he.pair(), HalfEdgeHandle::new(7));
        assert_eq!(he.pair().pair(), he);
        assert_eq!(he.full_edge(), EdgeHandle::new(3));
        assert_eq!(he.pair().full_edge(), EdgeHandle::new(3));
        assert_eq!(HalfEdgeHandle::lower_half_of(EdgeHandle::new(3)), he);
        assert!(he.is_lower_half());
        assert!(!he.pair().is_lower_half());
    }

    #[test]
    fn optional_handles() {
        let none = Opt::<VertexHandle>::none();
        assert!(none.is_none());
        assert_eq!(none.into_option(), None);

        let some = Opt::some(VertexHandle::new(0));
        assert_eq!(some.into_option(), Some(VertexHandle::new(0)));
        assert!(some != none);
    }

    #[test]
    fn debug_output() {
        assert_eq!(format!("{:?}", VertexHandle::new(3)), "V3");
        assert_eq!(format!("{}", HalfEdgeHandle::new(12)), "HE12");
    }
}
