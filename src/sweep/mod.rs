//! The sweep-line driver and its two ordered structures.
//!
//! The driver owns the whole run: it preprocesses the segment arena, then
//! consumes events left to right, maintaining the set of segments under the
//! sweep line and scheduling the intersections of newly adjacent pairs. The
//! run is strictly sequential and in-memory; a caller that wants to abort
//! simply drops it.

mod events;
mod prepare;
mod status;

use std::collections::BTreeSet;

use crate::geom::{self, Intersection, Point};
use crate::segments::{SegIdx, Segments};
use crate::{Error, Role};

use events::EventQueue;
use status::Status;

/// A single output event: a point and everything incident on it.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct SweepEvent {
    /// Where the event happened.
    pub point: Point,
    /// The segments meeting the point, each tagged with how it arrives
    /// there.
    pub incidences: BTreeSet<(SegIdx, Role)>,
}

/// Everything a sweep produces.
#[derive(Clone, Debug, serde::Serialize)]
pub struct SweepOutput {
    /// The input segments, in input order, with endpoints possibly rewritten
    /// by vertical nudging and glomming.
    pub segments: Segments,
    /// Every event the sweep saw, in lexicographic `(x, y)` order. Lone
    /// endpoints are events too; see [`SweepOutput::intersections`].
    pub events: Vec<SweepEvent>,
}

impl SweepOutput {
    /// The events where at least two segments meet.
    pub fn intersections(&self) -> impl Iterator<Item = &SweepEvent> {
        self.events.iter().filter(|ev| ev.incidences.len() > 1)
    }
}

/// Observes the sweep as it runs.
///
/// This is a debugging hook, not part of the core contract: after every
/// processed event the driver reports the event and the stacking of segments
/// on the sweep line at that moment.
pub trait SweepObserver {
    /// Called after `event` has been fully processed. `order` is the active
    /// segment stacking, bottom to top.
    fn after_event(&mut self, event: &SweepEvent, order: &[SegIdx]);
}

pub(crate) fn run(
    mut segments: Segments,
    tol: f64,
    mut observer: Option<&mut dyn SweepObserver>,
) -> Result<SweepOutput, Error> {
    let mut queue = prepare::prepare(&mut segments, tol)?;
    let mut status = Status::new(tol);

    while let Some((point, incidences)) = queue.pop_min() {
        step(&mut segments, &mut queue, &mut status, point, &incidences, tol)?;
        if let Some(obs) = &mut observer {
            let event = SweepEvent {
                point,
                incidences: incidences.clone(),
            };
            obs.after_event(&event, &status.order());
        }
        status.audit_and_redistribute();
    }

    if !status.is_empty() {
        return Err(Error::StatusInvariant);
    }

    let events = queue
        .iter()
        .map(|(point, incidences)| SweepEvent {
            point,
            incidences: incidences.clone(),
        })
        .collect();
    Ok(SweepOutput { segments, events })
}

/// Processes one event: update the status structure and schedule whatever
/// intersections the new adjacencies reveal.
fn step(
    segments: &mut Segments,
    queue: &mut EventQueue,
    status: &mut Status,
    point: Point,
    incidences: &BTreeSet<(SegIdx, Role)>,
    tol: f64,
) -> Result<(), Error> {
    let mut starting = Vec::new();
    let mut ending = Vec::new();
    let mut passing = Vec::new();
    for &(seg, role) in incidences {
        match role {
            Role::Left => starting.push(seg),
            Role::Right => ending.push(seg),
            Role::Interior => passing.push(seg),
        }
    }
    // An overlap can hand a segment both an endpoint and an interior role at
    // the same event; the endpoint reading wins.
    passing.retain(|seg| !starting.contains(seg) && !ending.contains(seg));

    // Remove the bundle that ends or passes through here, remembering its
    // former neighbors.
    let removing: Vec<SegIdx> = ending.iter().chain(&passing).copied().collect();
    let mut above = None;
    let mut below = None;
    if !removing.is_empty() {
        let mut lo = usize::MAX;
        let mut hi = 0;
        for &seg in &removing {
            let pos = status.index_of(seg).ok_or(Error::StatusInvariant)?;
            lo = lo.min(pos);
            hi = hi.max(pos);
        }
        below = lo.checked_sub(1).map(|i| status.seg_at(i));
        above = (hi + 1 < status.len()).then(|| status.seg_at(hi + 1));
        for &seg in &removing {
            status.remove(seg)?;
        }
    }

    let inserting: Vec<SegIdx> = starting.iter().chain(&passing).copied().collect();
    if inserting.is_empty() {
        // A pure right-endpoint event: the removed bundle's former
        // neighbors have just become adjacent.
        if let (Some(upper), Some(lower)) = (above, below) {
            schedule(segments, queue, point, upper, lower, tol)?;
        }
    } else {
        // Re-inserting at the event point puts the bundle in post-crossing
        // order, via the slope tie-break in the geometric comparator.
        for &seg in &inserting {
            status.insert(segments, seg, point)?;
        }
        let mut lo = usize::MAX;
        let mut hi = 0;
        for &seg in &inserting {
            let pos = status.index_of(seg).ok_or(Error::StatusInvariant)?;
            lo = lo.min(pos);
            hi = hi.max(pos);
        }
        if hi + 1 < status.len() {
            schedule(segments, queue, point, status.seg_at(hi + 1), status.seg_at(hi), tol)?;
        }
        if let Some(i) = lo.checked_sub(1) {
            schedule(segments, queue, point, status.seg_at(lo), status.seg_at(i), tol)?;
        }
    }

    Ok(())
}

/// Tests a newly adjacent pair and enqueues whatever intersection it has
/// ahead of the sweep.
fn schedule(
    segments: &mut Segments,
    queue: &mut EventQueue,
    ev: Point,
    upper: SegIdx,
    lower: SegIdx,
    tol: f64,
) -> Result<(), Error> {
    let found = geom::segment_intersect(&segments[upper], &segments[lower], tol);
    match found {
        None => {}
        Some(Intersection::Point { at, roles }) => {
            if beyond(at, ev, tol) {
                queue.insert(at, &[(upper, roles.0), (lower, roles.1)], segments)?;
            }
        }
        Some(Intersection::Overlap(p0, p1)) => {
            // The overlap contributes events at its two ends only; the
            // region in between needs no further attention.
            for p in [p0, p1] {
                if beyond(p, ev, tol) {
                    queue.insert(
                        p,
                        &[(upper, Role::Interior), (lower, Role::Interior)],
                        segments,
                    )?;
                }
            }
        }
    }
    Ok(())
}

/// Is `p` far enough along to schedule, relative to the event being
/// processed?
///
/// Points up to `tol` behind still qualify: they coalesce into the current
/// event (or a within-tolerance neighbor of it) instead of spawning work
/// behind the sweep.
fn beyond(p: Point, ev: Point, tol: f64) -> bool {
    p > Point {
        x: ev.x - tol,
        y: ev.y - tol,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn beyond_is_lexicographic_with_slack() {
        let ev = Point::new(1.0, 1.0);
        assert!(beyond(Point::new(1.0, 1.0), ev, 0.1));
        assert!(beyond(Point::new(2.0, -5.0), ev, 0.1));
        assert!(beyond(Point::new(0.95, 0.95), ev, 0.1));
        assert!(!beyond(Point::new(0.5, 5.0), ev, 0.1));
    }
}
