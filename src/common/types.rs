//! Common types used throughout warehouse_rrt

use std::fmt;

use nalgebra::Vector2;

/// Numeric domain of a workspace coordinate.
///
/// Planning arithmetic (distances, steering, sub-stepping) is carried out in
/// `f64`; `from_f64` writes a real value back into the domain. Integer domains
/// round to the nearest representable value.
pub trait Coordinate:
    Copy + PartialEq + PartialOrd + fmt::Debug + fmt::Display + Send + Sync + 'static
{
    fn zero() -> Self;
    fn to_f64(self) -> f64;
    fn from_f64(value: f64) -> Self;
}

macro_rules! impl_integer_coordinate {
    ($($t:ty),*) => {
        $(
            impl Coordinate for $t {
                fn zero() -> Self {
                    0
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn from_f64(value: f64) -> Self {
                    value.round() as $t
                }
            }
        )*
    };
}

macro_rules! impl_real_coordinate {
    ($($t:ty),*) => {
        $(
            impl Coordinate for $t {
                fn zero() -> Self {
                    0.0
                }

                fn to_f64(self) -> f64 {
                    self as f64
                }

                fn from_f64(value: f64) -> Self {
                    value as $t
                }
            }
        )*
    };
}

impl_integer_coordinate!(i32, i64);
impl_real_coordinate!(f32, f64);

/// A workspace coordinate (x, y, z).
///
/// `z` is carried for completeness; the planner only reads x and y.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Point<T> {
    x: T,
    y: T,
    z: T,
}

impl<T: Coordinate> Point<T> {
    pub fn new(x: T, y: T) -> Self {
        Self { x, y, z: T::zero() }
    }

    pub fn new_3d(x: T, y: T, z: T) -> Self {
        Self { x, y, z }
    }

    pub fn x(&self) -> T {
        self.x
    }

    pub fn y(&self) -> T {
        self.y
    }

    pub fn z(&self) -> T {
        self.z
    }

    /// Rewrites x while a sample is being clamped onto its extension segment.
    pub fn set_x(&mut self, x: T) {
        self.x = x;
    }

    /// Rewrites y while a sample is being clamped onto its extension segment.
    pub fn set_y(&mut self, y: T) {
        self.y = y;
    }

    /// Planar Euclidean distance; z is ignored.
    pub fn distance(&self, other: &Point<T>) -> f64 {
        let dx = self.x.to_f64() - other.x.to_f64();
        let dy = self.y.to_f64() - other.y.to_f64();
        (dx * dx + dy * dy).sqrt()
    }

    /// Offset `other - self` in the plane.
    pub fn offset_to(&self, other: &Point<T>) -> Vector2<f64> {
        Vector2::new(
            other.x.to_f64() - self.x.to_f64(),
            other.y.to_f64() - self.y.to_f64(),
        )
    }

    pub fn to_vector(&self) -> Vector2<f64> {
        Vector2::new(self.x.to_f64(), self.y.to_f64())
    }
}

impl<T: Coordinate> From<(T, T)> for Point<T> {
    fn from(tuple: (T, T)) -> Self {
        Self::new(tuple.0, tuple.1)
    }
}

impl<T: Coordinate> From<[T; 2]> for Point<T> {
    fn from(xy: [T; 2]) -> Self {
        Self::new(xy[0], xy[1])
    }
}

impl<T: Coordinate> fmt::Display for Point<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Robot footprint. Only used to derive the grid cell size.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Footprint<T> {
    pub length: T,
    pub width: T,
    pub height: T,
}

impl<T: Coordinate> Footprint<T> {
    pub fn new(length: T, width: T) -> Self {
        Self {
            length,
            width,
            height: T::zero(),
        }
    }

    pub fn new_3d(length: T, width: T, height: T) -> Self {
        Self { length, width, height }
    }

    /// Side of one grid cell: `max(length, width)`.
    pub fn cell_size(&self) -> T {
        if self.length >= self.width {
            self.length
        } else {
            self.width
        }
    }
}

/// Extent of the planar workspace, anchored at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorkspaceBounds<T> {
    pub width: T,
    pub height: T,
}

impl<T: Coordinate> WorkspaceBounds<T> {
    pub fn new(width: T, height: T) -> Self {
        Self { width, height }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_point_distance() {
        let p1 = Point::new(0.0, 0.0);
        let p2 = Point::new(3.0, 4.0);
        assert!((p1.distance(&p2) - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_point_distance_ignores_z() {
        let p1 = Point::new_3d(0, 0, 100);
        let p2 = Point::new_3d(6, 8, -40);
        assert_eq!(p1.distance(&p2), 10.0);
    }

    #[test]
    fn test_point_hashes_by_components() {
        let mut seen = HashSet::new();
        seen.insert(Point::new(10, 20));
        assert!(seen.contains(&Point::new(10, 20)));
        assert!(!seen.contains(&Point::new_3d(10, 20, 1)));
    }

    #[test]
    fn test_integer_coordinate_rounds() {
        assert_eq!(i32::from_f64(12.6), 13);
        assert_eq!(i32::from_f64(-2.4), -2);
        assert_eq!(f64::from_f64(12.6), 12.6);
    }

    #[test]
    fn test_footprint_cell_size() {
        assert_eq!(Footprint::new(10, 4).cell_size(), 10);
        assert_eq!(Footprint::new(3.0, 7.5).cell_size(), 7.5);
    }
}
