#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

mod geom;
mod segments;
pub mod sweep;

pub use geom::{order_at, segment_intersect, Intersection, Point, Segment};
pub use segments::{SegIdx, Segments};
pub use sweep::{SweepEvent, SweepObserver, SweepOutput};

/// The glomming tolerance used by [`sweep`].
pub const DEFAULT_TOLERANCE: f64 = 1e-9;

/// How a segment is incident on an event point.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The segment starts here: its smaller endpoint (smaller `x`, or
    /// smaller `y` for a vertical segment) is this point.
    Left,
    /// The segment ends here: its larger endpoint is this point.
    Right,
    /// The segment passes through here.
    Interior,
}

/// The input could not be swept.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Error {
    /// A coordinate was not finite, the tolerance was invalid, or a segment
    /// was no longer than the tolerance (possibly after glomming collapsed
    /// it).
    InvalidInput,
    /// Two distinct vertical segments were close enough that their events
    /// would glom together, leaving no consistent ordering between them.
    VerticalCollision,
    /// The status structure lost track of a segment mid-run. This reports an
    /// internal inconsistency, not a property of the input.
    StatusInvariant,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidInput => write!(f, "invalid segment or tolerance"),
            Error::VerticalCollision => {
                write!(f, "two vertical segments are within tolerance of each other")
            }
            Error::StatusInvariant => write!(f, "sweep status lost track of a segment"),
        }
    }
}

impl std::error::Error for Error {}

/// Computes all pairwise intersections among `segments` with the
/// [default tolerance](DEFAULT_TOLERANCE).
///
/// Each input segment is a pair of `[x, y]` endpoints, in either order. The
/// output lists the segments (in input order, with endpoints possibly
/// adjusted by snapping) and every event of the sweep; see [`SweepOutput`].
pub fn sweep(
    segments: impl IntoIterator<Item = ([f64; 2], [f64; 2])>,
) -> Result<SweepOutput, Error> {
    sweep_with_tolerance(segments, DEFAULT_TOLERANCE)
}

/// Like [`sweep`], with a caller-chosen tolerance.
///
/// `tol` is the radius of the proximity tests: points within `tol` of each
/// other (in the Chebyshev metric) are treated as one point, and a point
/// within `tol` of a segment's carrier line counts as on the segment. It
/// must be finite and non-negative, and it is global to the run.
pub fn sweep_with_tolerance(
    segments: impl IntoIterator<Item = ([f64; 2], [f64; 2])>,
    tol: f64,
) -> Result<SweepOutput, Error> {
    let arena = collect(segments, tol)?;
    sweep::run(arena, tol, None)
}

/// Like [`sweep_with_tolerance`], reporting each processed event and the
/// sweep-line stacking to `observer` as the run progresses.
pub fn sweep_with_observer(
    segments: impl IntoIterator<Item = ([f64; 2], [f64; 2])>,
    tol: f64,
    observer: &mut dyn SweepObserver,
) -> Result<SweepOutput, Error> {
    let arena = collect(segments, tol)?;
    sweep::run(arena, tol, Some(observer))
}

fn collect(
    segments: impl IntoIterator<Item = ([f64; 2], [f64; 2])>,
    tol: f64,
) -> Result<Segments, Error> {
    if !tol.is_finite() || tol < 0.0 {
        return Err(Error::InvalidInput);
    }
    let mut arena = Segments::default();
    for (p, q) in segments {
        if ![p[0], p[1], q[0], q[1]].iter().all(|c| c.is_finite()) {
            return Err(Error::InvalidInput);
        }
        arena.push(Segment::new(p.into(), q.into()));
    }
    Ok(arena)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn crossing_pair_smoke_test() {
        let out = sweep([([0.0, 0.0], [2.0, 2.0]), ([0.0, 2.0], [2.0, 0.0])]).unwrap();
        assert_eq!(out.events.len(), 5);

        let crossing = out.intersections().next().unwrap();
        assert!(crossing.point.close_to(&Point::new(1.0, 1.0), 1e-9));
        assert_eq!(crossing.incidences.len(), 2);
    }

    #[test]
    fn rejects_bad_input() {
        let nan = sweep([([0.0, f64::NAN], [1.0, 1.0])]).unwrap_err();
        assert_eq!(nan, Error::InvalidInput);

        let bad_tol = sweep_with_tolerance([([0.0, 0.0], [1.0, 1.0])], -1.0).unwrap_err();
        assert_eq!(bad_tol, Error::InvalidInput);

        let degenerate = sweep([([1.0, 1.0], [1.0, 1.0])]).unwrap_err();
        assert_eq!(degenerate, Error::InvalidInput);
    }

    #[test]
    fn empty_input_is_fine() {
        let segs: [([f64; 2], [f64; 2]); 0] = [];
        let out = sweep(segs).unwrap();
        assert!(out.events.is_empty());
        assert_eq!(out.segments.len(), 0);
    }
}
