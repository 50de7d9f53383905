//! One-shot preprocessing: vertical nudging, endpoint snapping, projection
//! of stray endpoints onto vertical segments, and construction of the
//! definitive event queue.
//!
//! Runs in a fixed order. Near-vertical segments are straightened first;
//! then every endpoint is loaded into an event queue (verticals first, so
//! their endpoints are already in place as preferred snap targets); then
//! endpoints hovering near a vertical's line are projected onto it. Because
//! all of that can drag endpoints around, the queue used for snapping is a
//! scratch structure: once the coordinates have settled, segments are
//! re-oriented and the queue handed to the sweep is rebuilt from the final
//! endpoints, so every role names the final orientation.

use super::events::EventQueue;
use crate::geom::Point;
use crate::segments::{SegIdx, Segments};
use crate::{Error, Role};

pub(crate) fn prepare(segments: &mut Segments, tol: f64) -> Result<EventQueue, Error> {
    for i in 0..segments.len() {
        if segments[SegIdx(i)].left.close_to(&segments[SegIdx(i)].right, tol) {
            return Err(Error::InvalidInput);
        }
    }

    let verticals = nudge_verticals(segments, tol);
    check_vertical_separation(segments, &verticals, tol)?;

    let mut scratch = EventQueue::new(tol);
    load_endpoints(&mut scratch, segments, &verticals)?;
    for &v in &verticals {
        snap_onto_vertical(&mut scratch, segments, v, tol)?;
    }
    drop(scratch);

    // Snapping can only have moved coordinates; orientation is restored here
    // so the rebuilt queue assigns roles against the final endpoints.
    for i in 0..segments.len() {
        segments.reorient(SegIdx(i));
    }

    let mut queue = EventQueue::new(tol);
    load_endpoints(&mut queue, segments, &verticals)?;
    settle(&mut queue, segments, &verticals, tol)?;
    Ok(queue)
}

/// Straightens every segment whose endpoints are within tolerance of each
/// other in `x`: both endpoints get the mean `x`, and the segment flips to
/// bottom-to-top orientation. Returns the indices of all vertical segments.
fn nudge_verticals(segments: &mut Segments, tol: f64) -> Vec<SegIdx> {
    let mut verticals = Vec::new();
    for i in 0..segments.len() {
        let idx = SegIdx(i);
        let seg = segments[idx];
        if (seg.right.x - seg.left.x).abs() <= tol {
            if !seg.is_vertical() {
                let x = (seg.left.x + seg.right.x) / 2.0;
                let seg = segments.seg_mut(idx);
                seg.left.x = x;
                seg.right.x = x;
            }
            segments.reorient(idx);
            verticals.push(idx);
        }
    }
    verticals
}

/// Two distinct vertical segments within tolerance in `x` whose `y` extents
/// overlap by more than the tolerance have no consistent event order.
fn check_vertical_separation(
    segments: &Segments,
    verticals: &[SegIdx],
    tol: f64,
) -> Result<(), Error> {
    for (i, &v) in verticals.iter().enumerate() {
        for &w in &verticals[i + 1..] {
            let a = &segments[v];
            let b = &segments[w];
            if (a.left.x - b.left.x).abs() <= tol {
                let overlap = a.right.y.min(b.right.y) - a.left.y.max(b.left.y);
                if overlap > tol {
                    return Err(Error::VerticalCollision);
                }
            }
        }
    }
    Ok(())
}

/// Loads every endpoint into `queue`, vertical segments first.
fn load_endpoints(
    queue: &mut EventQueue,
    segments: &mut Segments,
    verticals: &[SegIdx],
) -> Result<(), Error> {
    let mut order = verticals.to_vec();
    for i in 0..segments.len() {
        let idx = SegIdx(i);
        if !verticals.contains(&idx) {
            order.push(idx);
        }
    }
    for idx in order {
        let seg = segments[idx];
        queue.insert(seg.left, &[(idx, Role::Left)], segments)?;
        queue.insert(seg.right, &[(idx, Role::Right)], segments)?;
    }
    Ok(())
}

/// Moves every event key hovering within tolerance of `v`'s line, strictly
/// inside its `y` extent, onto the line, dragging the associated segment
/// endpoints along.
fn snap_onto_vertical(
    queue: &mut EventQueue,
    segments: &mut Segments,
    v: SegIdx,
    tol: f64,
) -> Result<(), Error> {
    let seg = segments[v];
    let x = seg.left.x;
    for key in queue.keys_in_box(x - tol, x + tol, seg.left.y + tol, seg.right.y - tol) {
        if key.x == x {
            continue;
        }
        let Some(payload) = queue.remove(key) else {
            continue;
        };
        let entries: Vec<(SegIdx, Role)> = payload.into_iter().collect();
        queue.insert(Point::new(x, key.y), &entries, segments)?;
    }
    Ok(())
}

/// Post-rebuild checks: glom cascades may have collapsed a segment or
/// dragged its endpoints out of order, and a vertical must still be
/// vertical. Reversed segments are re-oriented, with their event roles
/// relabelled to match.
fn settle(
    queue: &mut EventQueue,
    segments: &mut Segments,
    verticals: &[SegIdx],
    tol: f64,
) -> Result<(), Error> {
    for i in 0..segments.len() {
        let idx = SegIdx(i);
        let seg = segments[idx];
        if seg.left.close_to(&seg.right, tol) {
            return Err(Error::InvalidInput);
        }
        if seg.right < seg.left {
            segments.reorient(idx);
            queue.swap_roles(idx, seg.left, seg.right);
        }
    }
    for &v in verticals {
        if !segments[v].is_vertical() {
            return Err(Error::VerticalCollision);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Segment;

    fn arena(segs: &[((f64, f64), (f64, f64))]) -> Segments {
        let mut arena = Segments::default();
        for &(p, q) in segs {
            arena.push(Segment::new(p.into(), q.into()));
        }
        arena
    }

    #[test]
    fn near_vertical_segments_are_straightened_to_the_mean() {
        let mut segments = arena(&[((0.0, 0.0), (0.004, 2.0))]);
        prepare(&mut segments, 0.01).unwrap();

        let seg = segments[SegIdx(0)];
        assert!(seg.is_vertical());
        assert_eq!(seg.left, Point::new(0.002, 0.0));
        assert_eq!(seg.right, Point::new(0.002, 2.0));
    }

    #[test]
    fn endpoints_within_tolerance_share_a_key() {
        let mut segments = arena(&[
            ((0.0, 0.0), (2.0, 0.0)),
            ((2.005, 0.005), (4.0, 1.0)),
        ]);
        let queue = prepare(&mut segments, 0.01).unwrap();

        // The second segment's left endpoint glommed onto the first's right.
        assert_eq!(segments[SegIdx(1)].left, segments[SegIdx(0)].right);
        assert_eq!(queue.iter().count(), 3);
    }

    #[test]
    fn endpoints_project_onto_vertical_segments() {
        let mut segments = arena(&[
            ((1.0, 0.0), (1.0, 2.0)),
            ((1.005, 1.0), (3.0, 1.0)),
        ]);
        prepare(&mut segments, 0.01).unwrap();

        // The horizontal's left endpoint sat just off the vertical's line,
        // strictly inside its extent; it is pulled onto the line.
        assert_eq!(segments[SegIdx(1)].left, Point::new(1.0, 1.0));
    }

    #[test]
    fn zero_length_segments_are_invalid() {
        let mut segments = arena(&[((0.0, 0.0), (0.005, 0.005))]);
        assert_eq!(prepare(&mut segments, 0.01), Err(Error::InvalidInput));
    }

    #[test]
    fn overlapping_verticals_collide() {
        let mut segments = arena(&[((0.0, 0.0), (0.0, 2.0)), ((0.005, 1.0), (0.005, 3.0))]);
        assert_eq!(prepare(&mut segments, 0.01), Err(Error::VerticalCollision));
    }

    #[test]
    fn stacked_verticals_with_close_endpoints_collide() {
        // No y overlap, but the upper endpoint of one would glom onto the
        // lower endpoint of the other.
        let mut segments = arena(&[((0.0, 0.0), (0.0, 1.0)), ((0.005, 1.005), (0.005, 2.0))]);
        assert_eq!(prepare(&mut segments, 0.01), Err(Error::VerticalCollision));
    }
}
