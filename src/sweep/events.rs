//! The event queue: an ordered map from planar points to the segments
//! incident on them, with tolerance-aware insertion.
//!
//! Keys are kept pairwise separated by more than the tolerance (in the
//! Chebyshev metric): inserting a point within tolerance of an existing key
//! unions the payload into that key instead of creating a new one, and drags
//! any segment endpoints along (glomming). Consumed keys stay in the map
//! behind a cursor so that intersections discovered later can still coalesce
//! into them; the final in-order traversal is the sweep's output.

use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

use crate::geom::Point;
use crate::segments::{SegIdx, Segments};
use crate::{Error, Role};

/// The set of incidences at one event point.
pub(crate) type Incidences = BTreeSet<(SegIdx, Role)>;

/// The ordered set of event points, keyed lexicographically by `(x, y)`.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct EventQueue {
    events: BTreeMap<Point, Incidences>,
    /// The most recently consumed key; everything at or before it has been
    /// processed but remains available as a glom target.
    cursor: Option<Point>,
    tol: f64,
}

impl EventQueue {
    pub fn new(tol: f64) -> Self {
        EventQueue {
            events: BTreeMap::new(),
            cursor: None,
            tol,
        }
    }

    /// All keys within `tol` of `p` in the Chebyshev metric.
    ///
    /// The map's own order only narrows the `x` band; the `y` filter is a
    /// scan of the band. This is the known worst case when many events share
    /// one `x` band; it is tolerated, not optimized.
    pub fn near_keys(&self, p: Point) -> Vec<Point> {
        self.keys_in_box(
            p.x - self.tol,
            p.x + self.tol,
            p.y - self.tol,
            p.y + self.tol,
        )
    }

    /// All keys in the closed box `[x0, x1] × [y0, y1]`.
    pub fn keys_in_box(&self, x0: f64, x1: f64, y0: f64, y1: f64) -> Vec<Point> {
        let lo = Point {
            x: x0,
            y: f64::NEG_INFINITY,
        };
        let hi = Point {
            x: x1,
            y: f64::INFINITY,
        };
        self.events
            .range(lo..=hi)
            .map(|(k, _)| *k)
            .filter(|k| (y0..=y1).contains(&k.y))
            .collect()
    }

    /// The priority class of an existing key as a snap target: vertical
    /// segment endpoints win (top before bottom), then any other endpoint,
    /// then interior-only points.
    fn snap_class(&self, key: Point, segments: &Segments) -> u8 {
        let mut class = 3;
        for &(seg, role) in &self.events[&key] {
            if role == Role::Interior {
                continue;
            }
            let c = if segments[seg].is_vertical() {
                if role == Role::Right {
                    0
                } else {
                    1
                }
            } else {
                2
            };
            class = class.min(c);
        }
        class
    }

    /// Insert `p` with the given incidence entries, coalescing into an
    /// existing key within tolerance if there is one. Returns the key that
    /// ended up holding the entries.
    ///
    /// Among several in-tolerance keys the highest-priority one wins (see
    /// [`Self::snap_class`]); ties go to the lexicographically smallest key.
    /// Every endpoint named by `entries` is rewritten to the returned key.
    pub fn insert(
        &mut self,
        p: Point,
        entries: &[(SegIdx, Role)],
        segments: &mut Segments,
    ) -> Result<Point, Error> {
        let near = self.near_keys(p);
        let key = near
            .iter()
            .copied()
            .min_by_key(|k| self.snap_class(*k, segments))
            .unwrap_or(p);

        // Endpoint events of two distinct vertical segments must never share
        // a key: there is no consistent event order for them afterwards.
        if let Some(existing) = self.events.get(&key) {
            for &(seg, role) in entries {
                if role != Role::Interior && segments[seg].is_vertical() {
                    let clash = existing.iter().any(|&(other, other_role)| {
                        other != seg
                            && other_role != Role::Interior
                            && segments[other].is_vertical()
                    });
                    if clash {
                        return Err(Error::VerticalCollision);
                    }
                }
            }
        }

        let payload = self.events.entry(key).or_default();
        payload.extend(entries.iter().copied());
        for &(seg, role) in entries {
            segments.retarget_endpoint(seg, role, key);
        }
        Ok(key)
    }

    /// Physically remove a key, returning its payload.
    ///
    /// Only used before the sweep starts (for the vertical-projection snap,
    /// which moves keys); consumed keys are never removed.
    pub fn remove(&mut self, key: Point) -> Option<Incidences> {
        debug_assert!(self.cursor.is_none());
        self.events.remove(&key)
    }

    /// Relabel the endpoint roles of `seg` after its endpoints were swapped:
    /// the key `a` (formerly the left endpoint) becomes right, and `b`
    /// (formerly the right endpoint) becomes left.
    pub fn swap_roles(&mut self, seg: SegIdx, a: Point, b: Point) {
        if let Some(payload) = self.events.get_mut(&a) {
            if payload.remove(&(seg, Role::Left)) {
                payload.insert((seg, Role::Right));
            }
        }
        if let Some(payload) = self.events.get_mut(&b) {
            if payload.remove(&(seg, Role::Right)) {
                payload.insert((seg, Role::Left));
            }
        }
    }

    /// Consume the smallest not-yet-consumed event.
    ///
    /// The key stays in the map: a later insertion within tolerance of it
    /// coalesces into it (and is recorded in the output) rather than
    /// spawning a fresh key behind the sweep.
    pub fn pop_min(&mut self) -> Option<(Point, Incidences)> {
        let next = match self.cursor {
            None => self.events.first_key_value(),
            Some(cur) => self
                .events
                .range((Bound::Excluded(cur), Bound::Unbounded))
                .next(),
        };
        let (key, payload) = next?;
        let (key, payload) = (*key, payload.clone());
        self.cursor = Some(key);
        Some((key, payload))
    }

    /// Every event in key order, consumed or not.
    pub fn iter(&self) -> impl Iterator<Item = (Point, &Incidences)> {
        self.events.iter().map(|(k, v)| (*k, v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geom::Segment;

    const TOL: f64 = 0.5;

    fn arena(segs: &[((f64, f64), (f64, f64))]) -> Segments {
        let mut arena = Segments::default();
        for &(p, q) in segs {
            arena.push(Segment::new(p.into(), q.into()));
        }
        arena
    }

    #[test]
    fn coalesces_within_tolerance_and_gloms_the_endpoint() {
        let mut segments = arena(&[((0.0, 0.0), (10.0, 0.0)), ((0.3, 0.2), (10.0, 5.0))]);
        let mut queue = EventQueue::new(TOL);

        let first_left = segments[SegIdx(0)].left;
        let k0 = queue
            .insert(first_left, &[(SegIdx(0), Role::Left)], &mut segments)
            .unwrap();
        assert_eq!(k0, Point::new(0.0, 0.0));

        // The second segment's left endpoint is within tolerance of the
        // first key; it merges there and the segment is dragged along.
        let second_left = segments[SegIdx(1)].left;
        let k1 = queue
            .insert(second_left, &[(SegIdx(1), Role::Left)], &mut segments)
            .unwrap();
        assert_eq!(k1, k0);
        assert_eq!(segments[SegIdx(1)].left, k0);

        let (_, payload) = queue.iter().next().unwrap();
        assert_eq!(payload.len(), 2);
    }

    #[test]
    fn endpoint_keys_beat_interior_keys_as_snap_targets() {
        let mut segments = arena(&[((0.0, 0.0), (10.0, 0.0)), ((0.6, 0.0), (10.0, 5.0))]);
        let mut queue = EventQueue::new(TOL);

        // An interior key at (0.6, 0) and an endpoint key at (0, 0), more
        // than `TOL` apart from each other.
        queue
            .insert(Point::new(0.0, 0.0), &[(SegIdx(0), Role::Left)], &mut segments)
            .unwrap();
        queue
            .insert(Point::new(0.6, 0.0), &[(SegIdx(1), Role::Interior)], &mut segments)
            .unwrap();

        // (0.3, 0) is within tolerance of both; the endpoint key wins.
        let key = queue
            .insert(Point::new(0.3, 0.0), &[(SegIdx(1), Role::Interior)], &mut segments)
            .unwrap();
        assert_eq!(key, Point::new(0.0, 0.0));
    }

    #[test]
    fn vertical_endpoints_beat_plain_endpoints() {
        let mut segments = arena(&[((0.0, 0.0), (0.0, 5.0)), ((0.6, 0.1), (10.0, 5.0))]);
        let mut queue = EventQueue::new(TOL);

        queue
            .insert(Point::new(0.0, 0.0), &[(SegIdx(0), Role::Left)], &mut segments)
            .unwrap();
        queue
            .insert(Point::new(0.6, 0.1), &[(SegIdx(1), Role::Left)], &mut segments)
            .unwrap();

        let key = queue
            .insert(Point::new(0.3, 0.0), &[(SegIdx(1), Role::Interior)], &mut segments)
            .unwrap();
        assert_eq!(key, Point::new(0.0, 0.0));
    }

    #[test]
    fn glomming_vertical_endpoints_together_is_an_error() {
        let mut segments = arena(&[((0.0, 0.0), (0.0, 1.0)), ((0.3, 1.1), (0.3, 2.0))]);
        let mut queue = EventQueue::new(TOL);

        queue
            .insert(Point::new(0.0, 0.0), &[(SegIdx(0), Role::Left)], &mut segments)
            .unwrap();
        queue
            .insert(Point::new(0.0, 1.0), &[(SegIdx(0), Role::Right)], &mut segments)
            .unwrap();

        // The second vertical's lower endpoint would land on the first
        // vertical's upper endpoint.
        let err = queue
            .insert(Point::new(0.3, 1.1), &[(SegIdx(1), Role::Left)], &mut segments)
            .unwrap_err();
        assert_eq!(err, Error::VerticalCollision);
    }

    #[test]
    fn pop_min_walks_in_order_and_consumed_keys_still_coalesce() {
        let mut segments = arena(&[((0.0, 0.0), (10.0, 0.0)), ((2.0, 0.0), (10.0, 5.0))]);
        let mut queue = EventQueue::new(TOL);

        queue
            .insert(Point::new(0.0, 0.0), &[(SegIdx(0), Role::Left)], &mut segments)
            .unwrap();
        queue
            .insert(Point::new(2.0, 0.0), &[(SegIdx(1), Role::Left)], &mut segments)
            .unwrap();

        let (first, _) = queue.pop_min().unwrap();
        assert_eq!(first, Point::new(0.0, 0.0));

        // A point near the consumed key merges into it instead of becoming
        // a fresh event behind the cursor.
        let key = queue
            .insert(Point::new(0.2, 0.0), &[(SegIdx(1), Role::Interior)], &mut segments)
            .unwrap();
        assert_eq!(key, first);

        let (second, _) = queue.pop_min().unwrap();
        assert_eq!(second, Point::new(2.0, 0.0));
        assert!(queue.pop_min().is_none());

        let all: Vec<_> = queue.iter().collect();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].1.len(), 2);
    }
}
