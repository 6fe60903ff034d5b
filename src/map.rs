//! The arena every mesh stores its elements in.

use std::{
    fmt,
    marker::PhantomData,
    ops::{Index, IndexMut},
};

use stable_vec::StableVec;

use crate::handle::{hsize, Handle};


/// A handle-keyed arena that uses a simple contiguous vector to store its
/// elements.
///
/// The handle is simply used as an index into the underlying
/// [`StableVec`]. Removing an element leaves a hole; the handles of all other
/// elements stay valid. New elements are always pushed at
/// [`next_push_handle`][DenseMap::next_push_handle], which is never
/// decremented by removals. So this value is the "next free index" counter
/// of the collection and can be larger than `num_elements`.
///
/// Indexing with a handle that does not refer to an element panics. The
/// mesh only does that with handles it knows to be valid and uses
/// [`get`][DenseMap::get] for handles coming from the outside.
pub struct DenseMap<H: Handle, T> {
    vec: StableVec<T>,
    _dummy: PhantomData<H>,
}

impl<H: Handle, T> DenseMap<H, T> {
    /// Creates an empty `DenseMap`.
    pub fn new() -> Self {
        Self {
            vec: StableVec::new(),
            _dummy: PhantomData,
        }
    }

    /// Creates an empty `DenseMap` with space for `cap` elements.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            vec: StableVec::with_capacity(cap),
            _dummy: PhantomData,
        }
    }

    /// Adds an element at the next free index and returns its handle.
    pub fn push(&mut self, elem: T) -> H {
        H::from_usize(self.vec.push(elem))
    }

    /// Inserts `elem` at the index of `handle`, returning the previous element
    /// at that position, if any. Indices between the current end and `handle`
    /// stay empty.
    pub fn insert(&mut self, handle: H, elem: T) -> Option<T> {
        self.vec.reserve_for(handle.to_usize());
        self.vec.insert(handle.to_usize(), elem)
    }

    /// Removes the element with the given handle and returns it. Returns
    /// `None` if there is no such element.
    pub fn remove(&mut self, handle: H) -> Option<T> {
        if handle.to_usize() >= self.vec.next_push_index() {
            return None;
        }
        self.vec.remove(handle.to_usize())
    }

    pub fn get(&self, handle: H) -> Option<&T> {
        self.vec.get(handle.to_usize())
    }

    pub fn get_mut(&mut self, handle: H) -> Option<&mut T> {
        self.vec.get_mut(handle.to_usize())
    }

    pub fn contains_handle(&self, handle: H) -> bool {
        handle.to_usize() < self.vec.next_push_index()
            && self.vec.has_element_at(handle.to_usize())
    }

    /// Returns the handle the next `push` will return.
    pub fn next_push_handle(&self) -> H {
        H::from_usize(self.vec.next_push_index())
    }

    pub fn num_elements(&self) -> hsize {
        self.vec.num_elements() as hsize
    }

    pub fn reserve(&mut self, additional: hsize) {
        self.vec.reserve(additional as usize);
    }

    /// Iterates over all handles of existing elements, in increasing order.
    pub fn handles(&self) -> impl Iterator<Item = H> + '_ {
        self.vec.indices().map(H::from_usize)
    }

    /// Iterates over all existing elements, in increasing handle order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.vec.values()
    }

    pub fn iter(&self) -> impl Iterator<Item = (H, &T)> + '_ {
        self.vec.iter().map(|(i, elem)| (H::from_usize(i), elem))
    }

    /// Consumes the map and yields all elements with their handles, in
    /// increasing handle order.
    pub fn into_iter(self) -> impl Iterator<Item = (H, T)> {
        self.vec.into_iter().map(|(i, elem)| (H::from_usize(i), elem))
    }
}

impl<H: Handle, T> Default for DenseMap<H, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<H: Handle, T: Clone> Clone for DenseMap<H, T> {
    fn clone(&self) -> Self {
        Self {
            vec: self.vec.clone(),
            _dummy: PhantomData,
        }
    }
}

impl<H: Handle, T> Index<H> for DenseMap<H, T> {
    type Output = T;

    #[inline(always)]
    fn index(&self, handle: H) -> &Self::Output {
        match self.get(handle) {
            None => panic!("internal mesh error: no element found for handle '{:?}'", handle),
            Some(r) => r,
        }
    }
}

impl<H: Handle, T> IndexMut<H> for DenseMap<H, T> {
    #[inline(always)]
    fn index_mut(&mut self, handle: H) -> &mut Self::Output {
        match self.get_mut(handle) {
            None => panic!("internal mesh error: no element found for handle '{:?}'", handle),
            Some(r) => r,
        }
    }
}

impl<H: Handle, T: fmt::Debug> fmt::Debug for DenseMap<H, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}
