//! Abstractions over the position type stored per vertex.
//!
//! The mesh kernel itself never looks at positions. Only the remeshing
//! operators need to combine them, and the only thing they do is computing
//! midpoints. That's why [`Position`] only asks for addition and scaling by a
//! scalar.

use std::fmt::Debug;

use num_traits::{Float, One};
#[cfg(feature = "cgmath")]
use cgmath::{BaseFloat, EuclideanSpace, Point2, Point3, Vector2, Vector3};


/// Types that can be used as vertex position by the remeshing operators.
///
/// Implemented for `f32`/`f64` (1D positions), arrays `[T; 2]` and `[T; 3]`,
/// tuples `(T, T, T)` and (with the `cgmath` feature) for `cgmath` points and
/// vectors. To avoid logic errors, you should prefer strong types like
/// `cgmath::Point3` over tuples and arrays.
pub trait Position: Copy + PartialEq + Debug {
    /// The type of each component.
    type Scalar: Float;

    /// Component-wise sum of `self` and `other`.
    fn add_position(self, other: Self) -> Self;

    /// Scales each component by `factor`.
    fn scale(self, factor: Self::Scalar) -> Self;

    /// Returns the point halfway between `self` and `other`.
    ///
    /// Named `halfway` so that it doesn't clash with
    /// `cgmath::EuclideanSpace::midpoint` when both traits are in scope.
    fn halfway(self, other: Self) -> Self {
        let two = Self::Scalar::one() + Self::Scalar::one();
        self.add_position(other).scale(two.recip())
    }
}

macro_rules! impl_position_for_float {
    ($($t:ty),*) => {
        $(
            impl Position for $t {
                type Scalar = $t;
                fn add_position(self, other: Self) -> Self {
                    self + other
                }
                fn scale(self, factor: Self::Scalar) -> Self {
                    self * factor
                }
            }
        )*
    }
}

impl_position_for_float!(f32, f64);

impl<T: Float + Debug> Position for [T; 2] {
    type Scalar = T;
    fn add_position(self, other: Self) -> Self {
        [self[0] + other[0], self[1] + other[1]]
    }
    fn scale(self, factor: Self::Scalar) -> Self {
        [self[0] * factor, self[1] * factor]
    }
}

impl<T: Float + Debug> Position for [T; 3] {
    type Scalar = T;
    fn add_position(self, other: Self) -> Self {
        [self[0] + other[0], self[1] + other[1], self[2] + other[2]]
    }
    fn scale(self, factor: Self::Scalar) -> Self {
        [self[0] * factor, self[1] * factor, self[2] * factor]
    }
}

impl<T: Float + Debug> Position for (T, T, T) {
    type Scalar = T;
    fn add_position(self, other: Self) -> Self {
        (self.0 + other.0, self.1 + other.1, self.2 + other.2)
    }
    fn scale(self, factor: Self::Scalar) -> Self {
        (self.0 * factor, self.1 * factor, self.2 * factor)
    }
}

#[cfg(feature = "cgmath")]
impl<T: BaseFloat> Position for Point3<T> {
    type Scalar = T;
    fn add_position(self, other: Self) -> Self {
        Point3::from_vec(self.to_vec() + other.to_vec())
    }
    fn scale(self, factor: Self::Scalar) -> Self {
        self * factor
    }
}

#[cfg(feature = "cgmath")]
impl<T: BaseFloat> Position for Point2<T> {
    type Scalar = T;
    fn add_position(self, other: Self) -> Self {
        Point2::from_vec(self.to_vec() + other.to_vec())
    }
    fn scale(self, factor: Self::Scalar) -> Self {
        self * factor
    }
}

#[cfg(feature = "cgmath")]
impl<T: BaseFloat> Position for Vector3<T> {
    type Scalar = T;
    fn add_position(self, other: Self) -> Self {
        self + other
    }
    fn scale(self, factor: Self::Scalar) -> Self {
        self * factor
    }
}

#[cfg(feature = "cgmath")]
impl<T: BaseFloat> Position for Vector2<T> {
    type Scalar = T;
    fn add_position(self, other: Self) -> Self {
        self + other
    }
    fn scale(self, factor: Self::Scalar) -> Self {
        self * factor
    }
}
