//! Helpers for the unit tests of this crate.

use std::{collections::BTreeSet, fmt::Debug};


/// Takes an iterator and a list of elements. Collects both into sets and
/// compares those sets for equality via `assert_eq`.
macro_rules! assert_eq_set {
    ($iter:expr, [$($item:expr),* $(,)*] $(,)?) => {
        crate::test_utils::assert_eq_set_fn(
            $iter,
            &[$($item),*],
            stringify!($iter),
            stringify!([$($item),*]),
        )
    }
}

/// Internal helper function for `assert_eq_set`.
pub(crate) fn assert_eq_set_fn<I, T>(actual: I, expected: &[T], left_str: &str, right_str: &str)
where
    I: IntoIterator<Item = T>,
    T: Debug + Clone + Eq + Ord,
{
    let actual = actual.into_iter().collect::<BTreeSet<_>>();
    let expected = expected.iter().cloned().collect::<BTreeSet<_>>();
    if actual != expected {
        panic!(
            "assert_eq_set({}, {}) failed:\n  left: {:?}\n right: {:?} ",
            left_str,
            right_str,
            actual,
            expected,
        );
    }
}

/// Asserts that the circular sequence `actual` equals `expected` up to
/// rotation. Used for face loops, which can start at any corner.
macro_rules! assert_eq_cycle {
    ($iter:expr, [$($item:expr),* $(,)*] $(,)?) => {{
        let actual = $iter.collect::<Vec<_>>();
        let expected = [$($item),*];
        if !crate::test_utils::is_rotation(&actual, &expected) {
            panic!(
                "assert_eq_cycle({}, {}) failed:\n  left: {:?}\n right: {:?} ",
                stringify!($iter),
                stringify!([$($item),*]),
                actual,
                expected,
            );
        }
    }}
}

pub(crate) fn is_rotation<T: PartialEq>(actual: &[T], expected: &[T]) -> bool {
    if actual.len() != expected.len() {
        return false;
    }
    if actual.is_empty() {
        return true;
    }
    (0..actual.len()).any(|offset| {
        (0..actual.len()).all(|i| actual[(i + offset) % actual.len()] == expected[i])
    })
}
