//! The status structure: the segments currently crossing the sweep line, in
//! bottom-to-top stacking order.
//!
//! The in-order position of an entry is the semantic truth. Each entry also
//! carries a cached numeric rank (the segment's height when it was last
//! reinserted), but ranks are hygiene only: placement is always computed
//! from live geometry, and ranks are respaced whenever floating-point drift
//! crams two of them together.

use crate::geom::{self, Point};
use crate::segments::{SegIdx, Segments};
use crate::Error;

/// Spacing used when a freshly computed rank cannot sit between its
/// neighbors' ranks.
const RANK_SPREAD: f64 = 512.0;

/// Adjacent ranks closer than this trigger redistribution.
const MIN_RANK_GAP: f64 = f64::EPSILON * 64.0;

#[derive(Clone, Copy, Debug)]
struct StatusEntry {
    seg: SegIdx,
    rank: f64,
}

/// The active-segment order under the sweep line.
#[derive(Clone, Debug)]
pub(crate) struct Status {
    entries: Vec<StatusEntry>,
    tol: f64,
}

impl Status {
    pub fn new(tol: f64) -> Self {
        Status {
            entries: Vec::new(),
            tol,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The position of `seg`, bottom to top.
    pub fn index_of(&self, seg: SegIdx) -> Option<usize> {
        self.entries.iter().position(|e| e.seg == seg)
    }

    pub fn seg_at(&self, pos: usize) -> SegIdx {
        self.entries[pos].seg
    }

    /// The segments directly above and below `seg`, as `(above, below)`.
    #[allow(dead_code)]
    pub fn neighbors(&self, seg: SegIdx) -> (Option<SegIdx>, Option<SegIdx>) {
        let Some(pos) = self.index_of(seg) else {
            return (None, None);
        };
        let above = self.entries.get(pos + 1).map(|e| e.seg);
        let below = pos.checked_sub(1).map(|i| self.entries[i].seg);
        (above, below)
    }

    /// The bottom-to-top stacking order.
    pub fn order(&self) -> Vec<SegIdx> {
        self.entries.iter().map(|e| e.seg).collect()
    }

    /// Insert `seg` at the sweep position `at`.
    ///
    /// The position is found by binary search with the geometric comparator,
    /// so a bundle of segments inserted at a crossing comes out in
    /// post-crossing order. The cached rank is the segment's height at `at`,
    /// nudged between its neighbors' ranks when it collides with them.
    pub fn insert(&mut self, segments: &Segments, seg: SegIdx, at: Point) -> Result<(), Error> {
        let target = &segments[seg];
        let pos = match self.entries.binary_search_by(|probe| {
            geom::order_at(&segments[probe.seg], target, at, self.tol)
                .then_with(|| probe.seg.cmp(&seg))
        }) {
            // The comparator falls back to index order, so an exact hit
            // means this segment is already present.
            Ok(_) => return Err(Error::StatusInvariant),
            Err(pos) => pos,
        };

        let height = target.sweep_y(at.x, at.y);
        let below = pos.checked_sub(1).map(|i| self.entries[i].rank);
        let above = self.entries.get(pos).map(|e| e.rank);
        let rank = match (below, above) {
            (None, None) => height,
            (Some(lo), None) => {
                if height > lo {
                    height
                } else {
                    lo + RANK_SPREAD
                }
            }
            (None, Some(hi)) => {
                if height < hi {
                    height
                } else {
                    hi - RANK_SPREAD
                }
            }
            (Some(lo), Some(hi)) => {
                if height > lo && height < hi {
                    height
                } else {
                    lo + (hi - lo) / 2.0
                }
            }
        };
        self.entries.insert(pos, StatusEntry { seg, rank });
        Ok(())
    }

    /// Remove `seg`. Removing a segment that is not present is a fatal
    /// internal inconsistency.
    pub fn remove(&mut self, seg: SegIdx) -> Result<(), Error> {
        let pos = self.index_of(seg).ok_or(Error::StatusInvariant)?;
        self.entries.remove(pos);
        Ok(())
    }

    /// Numeric hygiene: if floating-point drift has pushed two adjacent
    /// ranks within a few ulps of each other, respace all ranks evenly.
    /// This never changes which segment is above which.
    pub fn audit_and_redistribute(&mut self) {
        let cramped = self
            .entries
            .windows(2)
            .any(|w| w[1].rank - w[0].rank < MIN_RANK_GAP);
        if cramped {
            self.redistribute();
        }
    }

    fn redistribute(&mut self) {
        let mut rank = -RANK_SPREAD * (self.entries.len() / 2) as f64;
        for entry in &mut self.entries {
            entry.rank = rank;
            rank += RANK_SPREAD;
        }
    }

    #[cfg(test)]
    fn ranks(&self) -> Vec<f64> {
        self.entries.iter().map(|e| e.rank).collect()
    }
}
