//! Geometric primitives, like points and segments, and the tolerance-aware
//! predicates the sweep is built on.
//!
//! Every structural decision the sweep makes (which events coalesce, which
//! segment sits above which, where a snap lands) reduces to the predicates
//! in this module, so they are the single source of numerical truth.

use std::cmp::Ordering;

use ordered_float::OrderedFloat;

use crate::Role;

/// A two-dimensional point.
///
/// Points are sorted by `x` and then by `y`, matching the order in which the
/// sweep line (which moves in increasing `x`) encounters them.
#[derive(Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Point {
    /// Horizontal coordinate.
    pub x: f64,
    /// Vertical coordinate.
    pub y: f64,
}

impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        (OrderedFloat(self.x), OrderedFloat(self.y))
            .cmp(&(OrderedFloat(other.x), OrderedFloat(other.y)))
    }
}

impl PartialOrd for Point {
    #[inline(always)]
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Eq for Point {}

impl std::fmt::Debug for Point {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:?}, {:?})", self.x, self.y)
    }
}

impl Point {
    /// Create a new point.
    pub fn new(x: f64, y: f64) -> Self {
        debug_assert!(x.is_finite());
        debug_assert!(y.is_finite());
        Point { x, y }
    }

    /// Is `other` within the Chebyshev ball of radius `tol` around `self`?
    ///
    /// This is the point-proximity test behind all glomming: two points are
    /// indistinguishable when both coordinates agree to within `tol`.
    pub fn close_to(&self, other: &Point, tol: f64) -> bool {
        (self.x - other.x).abs() <= tol && (self.y - other.y).abs() <= tol
    }

    /// Compute an affine combination between `self` and `other`; that is, `(1 - t) * self + t * other`.
    pub fn affine(&self, other: &Self, t: f64) -> Self {
        Point {
            x: (1.0 - t) * self.x + t * other.x,
            y: (1.0 - t) * self.y + t * other.y,
        }
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

impl From<[f64; 2]> for Point {
    fn from([x, y]: [f64; 2]) -> Self {
        Self { x, y }
    }
}

/// A line segment, stored in sweep order.
///
/// `left` is the lexicographically smaller endpoint: the one with the smaller
/// `x` coordinate, or the smaller `y` for vertical segments.
#[derive(Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Segment {
    /// The starting endpoint, less than `right`.
    pub left: Point,
    /// The ending endpoint, greater than `left`.
    pub right: Point,
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} -- {:?}", self.left, self.right)
    }
}

impl Segment {
    /// Create a new segment from two endpoints, in either order.
    pub fn new(p: Point, q: Point) -> Self {
        if q < p {
            Segment { left: q, right: p }
        } else {
            Segment { left: p, right: q }
        }
    }

    /// Returns true if both endpoints share an `x` coordinate exactly.
    pub fn is_vertical(&self) -> bool {
        self.left.x == self.right.x
    }

    /// Returns true if both endpoints share a `y` coordinate exactly.
    pub fn is_horizontal(&self) -> bool {
        self.left.y == self.right.y
    }

    /// The direction vector from `left` to `right`.
    ///
    /// Points rightward for non-vertical segments and straight up for
    /// vertical ones.
    pub(crate) fn dir(&self) -> (f64, f64) {
        (self.right.x - self.left.x, self.right.y - self.left.y)
    }

    /// The Euclidean length.
    pub fn length(&self) -> f64 {
        let (dx, dy) = self.dir();
        dx.hypot(dy)
    }

    /// Our `y` coordinate at the given `x` coordinate.
    ///
    /// Vertical segments return their largest `y` coordinate.
    ///
    /// # Panics
    ///
    /// May panic (in debug builds) if `x` is outside the `x` range of this
    /// segment.
    pub fn at_x(&self, x: f64) -> f64 {
        debug_assert!(
            (self.left.x..=self.right.x).contains(&x),
            "segment {self:?}, x={x:?}"
        );

        if self.is_vertical() {
            self.right.y
        } else {
            // Even if the segment is *almost* vertical, t is guaranteed
            // to be in [0.0, 1.0].
            let t = (x - self.left.x) / (self.right.x - self.left.x);
            self.left.y + t * (self.right.y - self.left.y)
        }
    }

    /// The height of this segment at sweep position `x`.
    ///
    /// A vertical segment occupies a whole `y` range at its `x`, so `y_hint`
    /// (the `y` of the event being processed) is clamped into that range.
    /// Clamping keeps the status order consistent as the sweep walks up a
    /// vertical segment's extent.
    pub(crate) fn sweep_y(&self, x: f64, y_hint: f64) -> f64 {
        if self.is_vertical() {
            y_hint.clamp(self.left.y, self.right.y)
        } else {
            self.at_x(x)
        }
    }

    /// Signed perpendicular and axial offsets of `p` relative to this
    /// segment's carrier line. Positive perpendicular offsets are on the
    /// upper (left-of-direction) side; the axial offset is measured from
    /// `left` along the segment.
    pub(crate) fn carrier_offsets(&self, p: &Point) -> (f64, f64) {
        let len = self.length();
        debug_assert!(len > 0.0);
        let ux = (self.right.x - self.left.x) / len;
        let uy = (self.right.y - self.left.y) / len;
        let vx = p.x - self.left.x;
        let vy = p.y - self.left.y;
        (ux * vy - uy * vx, ux * vx + uy * vy)
    }

    /// Is `p` inside this segment's tolerance tube?
    ///
    /// The tube is the rectangle of half-width `tol` around the segment with
    /// squared ends: perpendicular distance to the carrier line at most
    /// `tol`, axial position within the segment's extent padded by `tol` at
    /// each end.
    pub fn on_segment(&self, p: &Point, tol: f64) -> bool {
        let (perp, axial) = self.carrier_offsets(p);
        perp.abs() <= tol && (-tol..=self.length() + tol).contains(&axial)
    }
}

/// Orders two segments by their post-crossing slopes.
///
/// `Greater` means `a` sits above `b` just to the right of a shared point:
/// the steeper-upward segment wins, with vertical segments steepest of all.
fn slope_cmp(a: &Segment, b: &Segment) -> Ordering {
    let (ax, ay) = a.dir();
    let (bx, by) = b.dir();
    let cross = bx * ay - by * ax;
    if cross > 0.0 {
        Ordering::Greater
    } else if cross < 0.0 {
        Ordering::Less
    } else {
        Ordering::Equal
    }
}

/// Orders two segments by their stacking at the sweep position `at`.
///
/// Returns `Greater` if `a` is strictly above `b`, `Less` if strictly below.
/// When the heights agree to within `tol` the slopes break the tie, so that
/// a bundle of segments through a crossing comes out in its post-crossing
/// stacking order; `Equal` is only returned for segments that are parallel
/// as vectors (collinear bundles).
///
/// Vertical segments are compared at the height of `at` itself (clamped into
/// their extent) and count as steeper than everything else.
pub fn order_at(a: &Segment, b: &Segment, at: Point, tol: f64) -> Ordering {
    let ya = a.sweep_y(at.x, at.y);
    let yb = b.sweep_y(at.x, at.y);
    if (ya - yb).abs() > tol {
        OrderedFloat(ya).cmp(&OrderedFloat(yb))
    } else {
        slope_cmp(a, b)
    }
}

/// The result of [`segment_intersect`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Intersection {
    /// The segments meet at a single point.
    Point {
        /// The meeting point, snapped per the tolerance rules: a T-junction
        /// reports the stem's endpoint, not the nearby interior point.
        at: Point,
        /// The role each input segment plays at the point, in argument order.
        roles: (Role, Role),
    },
    /// The segments are collinear within tolerance and share an extent of
    /// positive measure; the two points bound the shared extent.
    Overlap(Point, Point),
}

/// Computes the intersection of two segments, if any, under tolerance `tol`.
///
/// The possibilities, checked in this order:
///
/// - a pair of endpoints within `tol` of each other (Chebyshev) is reported
///   as a point meeting with the two endpoint roles;
/// - one segment's endpoint inside the other's tolerance tube is a
///   T-junction: the reported point is the *endpoint* (the stem wins over
///   the nearby interior point) with roles (endpoint role, interior);
/// - segments collinear within tolerance that share more than a trivial
///   extent are an overlap;
/// - a pure crossing is computed from the two segments' signed distances and
///   reported with interior roles for both.
pub fn segment_intersect(a: &Segment, b: &Segment, tol: f64) -> Option<Intersection> {
    // Coincident endpoints first; these dominate every other reading.
    for (pa, ra) in [(a.left, Role::Left), (a.right, Role::Right)] {
        for (pb, rb) in [(b.left, Role::Left), (b.right, Role::Right)] {
            if pa.close_to(&pb, tol) {
                return Some(Intersection::Point {
                    at: pa,
                    roles: (ra, rb),
                });
            }
        }
    }

    let len_a = a.length();
    let (perp_bl, ax_bl) = a.carrier_offsets(&b.left);
    let (perp_br, ax_br) = a.carrier_offsets(&b.right);

    match (perp_bl.abs() <= tol, perp_br.abs() <= tol) {
        (true, true) => {
            // Collinear within tolerance. Disjoint only if both of b's
            // endpoints hang off the same end of a; a touching contact would
            // have been caught by the endpoint checks above.
            let before = ax_bl < -tol && ax_br < -tol;
            let after = ax_bl > len_a + tol && ax_br > len_a + tol;
            if before || after {
                return None;
            }
            let lo = if a.left < b.left { b.left } else { a.left };
            let hi = if a.right < b.right { a.right } else { b.right };
            return Some(Intersection::Overlap(lo, hi));
        }
        (true, false) => {
            // Only b's left endpoint sits on a's carrier line, so the
            // segments can meet nowhere else.
            if (-tol..=len_a + tol).contains(&ax_bl) {
                return Some(Intersection::Point {
                    at: b.left,
                    roles: (Role::Interior, Role::Left),
                });
            }
            return None;
        }
        (false, true) => {
            if (-tol..=len_a + tol).contains(&ax_br) {
                return Some(Intersection::Point {
                    at: b.right,
                    roles: (Role::Interior, Role::Right),
                });
            }
            return None;
        }
        (false, false) => {
            if (perp_bl > 0.0) == (perp_br > 0.0) {
                // Both of b's endpoints are strictly on one side of a.
                return None;
            }
        }
    }

    let len_b = b.length();
    let (perp_al, ax_al) = b.carrier_offsets(&a.left);
    let (perp_ar, ax_ar) = b.carrier_offsets(&a.right);

    match (perp_al.abs() <= tol, perp_ar.abs() <= tol) {
        (true, true) => {
            // Both of a's endpoints inside b's tube: a short segment riding a
            // long near-parallel one. Their tubes overlap along all of a.
            let lo = if a.left < b.left { b.left } else { a.left };
            let hi = if a.right < b.right { a.right } else { b.right };
            return Some(Intersection::Overlap(lo, hi));
        }
        (true, false) => {
            if (-tol..=len_b + tol).contains(&ax_al) {
                return Some(Intersection::Point {
                    at: a.left,
                    roles: (Role::Left, Role::Interior),
                });
            }
            return None;
        }
        (false, true) => {
            if (-tol..=len_b + tol).contains(&ax_ar) {
                return Some(Intersection::Point {
                    at: a.right,
                    roles: (Role::Right, Role::Interior),
                });
            }
            return None;
        }
        (false, false) => {
            if (perp_al > 0.0) == (perp_ar > 0.0) {
                return None;
            }
        }
    }

    // Both pairs of endpoints straddle the complementary segment: a pure
    // crossing. A vertical carrier pins the crossing's x exactly, so the
    // other segment is evaluated there; otherwise the crossing splits a in
    // proportion to the two signed distances of its endpoints from b.
    let at = if a.is_vertical() {
        Point::new(a.left.x, b.at_x(a.left.x))
    } else if b.is_vertical() {
        Point::new(b.left.x, a.at_x(b.left.x))
    } else {
        let t = perp_al.abs() / (perp_al.abs() + perp_ar.abs());
        a.left.affine(&a.right, t)
    };

    #[cfg(feature = "slow-asserts")]
    exact::check_crossing(a, b, &at);

    Some(Intersection::Point {
        at,
        roles: (Role::Interior, Role::Interior),
    })
}

#[cfg(feature = "slow-asserts")]
mod exact {
    //! Exact rational cross-checks for the floating-point crossing
    //! computation.

    use malachite::num::arithmetic::traits::Abs;
    use malachite::Rational;

    use super::{Point, Segment};

    fn rat(x: f64) -> Rational {
        Rational::try_from(x).unwrap()
    }

    /// The exact intersection of the two carrier lines, if they are not
    /// parallel.
    fn exact_crossing(a: &Segment, b: &Segment) -> Option<(Rational, Rational)> {
        let (ax0, ay0) = (rat(a.left.x), rat(a.left.y));
        let (ax1, ay1) = (rat(a.right.x), rat(a.right.y));
        let (bx0, by0) = (rat(b.left.x), rat(b.left.y));
        let (bx1, by1) = (rat(b.right.x), rat(b.right.y));

        let da = (&ax1 - &ax0, &ay1 - &ay0);
        let db = (&bx1 - &bx0, &by1 - &by0);
        let denom = &da.0 * &db.1 - &da.1 * &db.0;
        if denom == 0 {
            return None;
        }
        let t = ((&bx0 - &ax0) * &db.1 - (&by0 - &ay0) * &db.0) / denom;
        Some((&ax0 + &t * &da.0, &ay0 + &t * &da.1))
    }

    pub(super) fn check_crossing(a: &Segment, b: &Segment, at: &Point) {
        let Some((ex, ey)) = exact_crossing(a, b) else {
            return;
        };
        let scale = at.x.abs().max(at.y.abs()).max(1.0);
        let bound = rat(scale * 1e-9);
        assert!((rat(at.x) - ex).abs() <= bound);
        assert!((rat(at.y) - ey).abs() <= bound);
    }
}
