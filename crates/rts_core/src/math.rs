//! Fixed-point math utilities for deterministic simulation.
//!
//! All positions, speeds and ranges are fixed-point tile units. Floating-point
//! results can differ between CPUs, and the server is the single source of
//! truth, so the same inputs must always yield the same positions.

use fixed::types::I32F32;
use serde::{Deserialize, Serialize};

/// Fixed-point number type for all simulation math.
///
/// Uses 32 bits for integer part and 32 bits for fractional part.
pub type Fixed = I32F32;

/// Fixed-point 2D vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Vec2Fixed {
    /// X coordinate.
    #[serde(with = "fixed_serde")]
    pub x: Fixed,
    /// Y coordinate.
    #[serde(with = "fixed_serde")]
    pub y: Fixed,
}

/// Serde support for fixed-point numbers.
///
/// Serializes fixed-point numbers as their raw bit representation (i64)
/// to preserve exact precision across serialization boundaries.
pub mod fixed_serde {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a fixed-point number as its raw bit representation.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        value.to_bits().serialize(serializer)
    }

    /// Deserialize a fixed-point number from its raw bit representation.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let bits = i64::deserialize(deserializer)?;
        Ok(Fixed::from_bits(bits))
    }
}

/// Serde support for fixed-point numbers written as plain decimals.
///
/// Used by hand-written data files (type tables, config) where raw bits
/// would be unreadable. Values are parsed through `f64`, which is exact for
/// the short decimals such files contain.
pub mod fixed_decimal {
    use super::Fixed;
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a fixed-point number as a decimal.
    pub fn serialize<S>(value: &Fixed, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_f64(value.to_num::<f64>())
    }

    /// Deserialize a fixed-point number from a decimal.
    pub fn deserialize<'de, D>(deserializer: D) -> Result<Fixed, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = f64::deserialize(deserializer)?;
        Fixed::checked_from_num(value)
            .ok_or_else(|| serde::de::Error::custom(format!("{value} is out of fixed-point range")))
    }
}

impl Vec2Fixed {
    /// Create a new fixed-point vector.
    #[must_use]
    pub const fn new(x: Fixed, y: Fixed) -> Self {
        Self { x, y }
    }

    /// Create a vector from integer tile coordinates.
    #[must_use]
    pub fn from_tiles(x: i32, y: i32) -> Self {
        Self::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    /// Zero vector.
    pub const ZERO: Self = Self {
        x: Fixed::ZERO,
        y: Fixed::ZERO,
    };

    /// Calculate squared distance (avoids sqrt for comparisons).
    #[must_use]
    pub fn distance_squared(self, other: Self) -> Fixed {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    /// Calculate Manhattan distance.
    #[must_use]
    pub fn manhattan_distance(self, other: Self) -> Fixed {
        (self.x - other.x).abs() + (self.y - other.y).abs()
    }

    /// Dot product of two vectors.
    #[must_use]
    pub fn dot(self, other: Self) -> Fixed {
        self.x * other.x + self.y * other.y
    }

    /// Scale both components.
    #[must_use]
    pub fn scale(self, factor: Fixed) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }

    /// Normalize vector using fixed-point math.
    #[must_use]
    pub fn normalize(self) -> Self {
        let len_sq = self.dot(self);

        if len_sq == Fixed::ZERO {
            return Self::ZERO;
        }

        let len = fixed_sqrt(len_sq);
        if len == Fixed::ZERO {
            return Self::ZERO;
        }

        Self::new(self.x / len, self.y / len)
    }
}

/// Advance `from` toward `to` by at most `budget`.
///
/// The step is split between the axes in proportion to the remaining
/// `|dx|` and `|dy|`, normalised by the Manhattan length `|dx| + |dy|`, so the
/// per-axis steps always sum to exactly the budget (up to truncation) and a
/// pure diagonal travels `budget / sqrt(2)` in Euclidean terms. When the
/// remaining Manhattan distance fits inside the budget the result snaps to
/// `to` exactly. Returns the new position and whether it reached `to`.
#[must_use]
pub fn step_toward(from: Vec2Fixed, to: Vec2Fixed, budget: Fixed) -> (Vec2Fixed, bool) {
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let total = from.manhattan_distance(to);

    if total <= budget {
        return (to, true);
    }

    // Work on magnitudes so truncation can only shorten the step.
    let step_x = dx.abs() * budget / total;
    let step_y = dy.abs() * budget / total;

    let next = Vec2Fixed::new(
        if dx < Fixed::ZERO { from.x - step_x } else { from.x + step_x },
        if dy < Fixed::ZERO { from.y - step_y } else { from.y + step_y },
    );
    (next, false)
}

/// Axis-aligned rectangle in tile space, `[min, min + size)` on both axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RectFixed {
    /// Top-left corner.
    pub min: Vec2Fixed,
    /// Width.
    #[serde(with = "fixed_serde")]
    pub width: Fixed,
    /// Height.
    #[serde(with = "fixed_serde")]
    pub height: Fixed,
}

impl RectFixed {
    /// Create a rectangle from its corner and extents.
    #[must_use]
    pub const fn new(min: Vec2Fixed, width: Fixed, height: Fixed) -> Self {
        Self { min, width, height }
    }

    /// Square footprint of `size` tiles anchored at `min`.
    #[must_use]
    pub fn square(min: Vec2Fixed, size: u32) -> Self {
        let side = Fixed::from_num(size);
        Self::new(min, side, side)
    }

    /// Exclusive right edge.
    #[must_use]
    pub fn max_x(&self) -> Fixed {
        self.min.x + self.width
    }

    /// Exclusive bottom edge.
    #[must_use]
    pub fn max_y(&self) -> Fixed {
        self.min.y + self.height
    }

    /// Centre point.
    #[must_use]
    pub fn center(&self) -> Vec2Fixed {
        let two = Fixed::from_num(2);
        Vec2Fixed::new(self.min.x + self.width / two, self.min.y + self.height / two)
    }

    /// Whether `point` lies strictly inside the rectangle.
    #[must_use]
    pub fn strictly_contains(&self, point: Vec2Fixed) -> bool {
        point.x > self.min.x && point.x < self.max_x() && point.y > self.min.y && point.y < self.max_y()
    }

    /// Whether the interiors of the two rectangles overlap.
    #[must_use]
    pub fn intersects(&self, other: &Self) -> bool {
        self.min.x < other.max_x()
            && other.min.x < self.max_x()
            && self.min.y < other.max_y()
            && other.min.y < self.max_y()
    }

    /// Squared Euclidean length of the gap between two rectangles.
    ///
    /// Zero when they touch or overlap.
    #[must_use]
    pub fn gap_squared(&self, other: &Self) -> Fixed {
        let gap_x = (other.min.x - self.max_x())
            .max(self.min.x - other.max_x())
            .max(Fixed::ZERO);
        let gap_y = (other.min.y - self.max_y())
            .max(self.min.y - other.max_y())
            .max(Fixed::ZERO);
        gap_x * gap_x + gap_y * gap_y
    }

    /// Whether the gap between the rectangles is at most `range`.
    #[must_use]
    pub fn within_range(&self, other: &Self, range: Fixed) -> bool {
        self.gap_squared(other) <= range * range
    }

    /// Integer tile span `(x0, y0, x1, y1)` covered by the interior, inclusive.
    #[must_use]
    pub fn tile_span(&self) -> (i32, i32, i32, i32) {
        let x0 = self.min.x.floor().to_num::<i32>();
        let y0 = self.min.y.floor().to_num::<i32>();
        let x1 = self.max_x().ceil().to_num::<i32>() - 1;
        let y1 = self.max_y().ceil().to_num::<i32>() - 1;
        (x0, y0, x1.max(x0), y1.max(y0))
    }
}

/// Computes the square root of a fixed-point number using binary search.
fn fixed_sqrt(value: Fixed) -> Fixed {
    if value <= Fixed::ZERO {
        return Fixed::ZERO;
    }

    let mut low = Fixed::ZERO;
    let mut high = if value > Fixed::from_num(1) {
        value
    } else {
        Fixed::from_num(1)
    };

    for _ in 0..48 {
        let mid = (low + high) / Fixed::from_num(2);
        let mid_sq = mid.saturating_mul(mid);

        if mid_sq <= value {
            low = mid;
        } else {
            high = mid;
        }
    }

    low
}

impl std::ops::Add for Vec2Fixed {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x + rhs.x,
            y: self.y + rhs.y,
        }
    }
}

impl std::ops::Sub for Vec2Fixed {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self::Output {
        Self {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(x: f64, y: f64) -> Vec2Fixed {
        Vec2Fixed::new(Fixed::from_num(x), Fixed::from_num(y))
    }

    #[test]
    fn test_vec2_distance_squared() {
        let dist_sq = v(3.0, 0.0).distance_squared(v(0.0, 4.0));
        assert_eq!(dist_sq, Fixed::from_num(25));
    }

    #[test]
    fn test_step_toward_axis_aligned() {
        let (next, arrived) = step_toward(v(0.0, 0.0), v(10.0, 0.0), Fixed::from_num(2));
        assert!(!arrived);
        assert_eq!(next, v(2.0, 0.0));
    }

    #[test]
    fn test_step_toward_splits_diagonal_by_manhattan_length() {
        // dx = 3, dy = 1: three quarters of the budget goes to x.
        let (next, arrived) = step_toward(v(0.0, 0.0), v(-3.0, 1.0), Fixed::from_num(2));
        assert!(!arrived);
        assert_eq!(next, v(-1.5, 0.5));
    }

    #[test]
    fn test_step_toward_snaps_when_within_budget() {
        let target = v(1.25, 0.5);
        let (next, arrived) = step_toward(v(0.5, 0.25), target, Fixed::from_num(1));
        assert!(arrived);
        assert_eq!(next, target);
    }

    #[test]
    fn test_rect_gap_and_range() {
        let a = RectFixed::square(v(3.0, 3.0), 1);
        let b = RectFixed::square(v(4.0, 3.0), 1);
        assert_eq!(a.gap_squared(&b), Fixed::ZERO);
        assert!(a.within_range(&b, Fixed::from_num(1)));

        let c = RectFixed::square(v(7.0, 7.0), 1);
        // gap is (3, 3)
        assert_eq!(a.gap_squared(&c), Fixed::from_num(18));
        assert!(!a.within_range(&c, Fixed::from_num(4)));
        assert!(a.within_range(&c, Fixed::from_num(5)));
    }

    #[test]
    fn test_rect_tile_span_fractional() {
        let rect = RectFixed::square(v(3.5, 2.0), 1);
        assert_eq!(rect.tile_span(), (3, 2, 4, 2));
    }

    #[test]
    fn test_strict_containment_excludes_edges() {
        let rect = RectFixed::square(v(2.0, 2.0), 2);
        assert!(rect.strictly_contains(v(3.0, 3.0)));
        assert!(!rect.strictly_contains(v(2.0, 3.0)));
        assert!(!rect.strictly_contains(v(4.0, 3.0)));
    }

    #[test]
    fn test_vec2_normalize() {
        let norm = v(3.0, 4.0).normalize();
        let one = Fixed::from_num(1);
        let epsilon = one / Fixed::from_num(10000);
        assert!((norm.dot(norm) - one).abs() < epsilon);
        let ratio_diff = (norm.x * Fixed::from_num(4)) - (norm.y * Fixed::from_num(3));
        assert!(ratio_diff.abs() < epsilon);
    }
}
