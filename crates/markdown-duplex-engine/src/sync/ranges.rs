//! Accumulation of structured-tree block ranges touched since the last flush.

/// Inclusive interval of top-level block indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct BlockRange {
    pub start: usize,
    pub end: usize,
}

impl BlockRange {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(index: usize) -> Self {
        Self::new(index, index)
    }

    /// The widest possible range, used for changes of unknown extent.
    /// It never resolves against a real tree.
    pub fn everything() -> Self {
        Self::new(0, usize::MAX)
    }

    pub fn is_unbounded(self) -> bool {
        self.end == usize::MAX
    }

    /// Same range with `start <= end`.
    pub fn normalized(self) -> Self {
        if self.start <= self.end {
            self
        } else {
            Self::new(self.end, self.start)
        }
    }

    /// Number of blocks covered.
    pub fn len(self) -> usize {
        self.end.saturating_sub(self.start).saturating_add(1)
    }

    /// True when the two ranges overlap or sit directly next to each other.
    pub fn touches(self, other: Self) -> bool {
        self.start <= other.end.saturating_add(1) && other.start <= self.end.saturating_add(1)
    }

    pub fn union(self, other: Self) -> Self {
        Self::new(self.start.min(other.start), self.end.max(other.end))
    }
}

/// A pair of block ranges describing one structured edit: `old` locates the
/// affected blocks in the pre-edit tree, `new` the blocks that replaced them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
pub struct EditRange {
    pub old: BlockRange,
    pub new: BlockRange,
}

impl EditRange {
    pub fn new(old: BlockRange, new: BlockRange) -> Self {
        Self { old, new }
    }

    /// Edit of unknown extent; forces a full serialization when flushed.
    pub fn unknown() -> Self {
        Self::new(BlockRange::everything(), BlockRange::everything())
    }

    pub fn normalized(self) -> Self {
        Self::new(self.old.normalized(), self.new.normalized())
    }

    pub fn touches(&self, other: &Self) -> bool {
        self.old.touches(other.old) || self.new.touches(other.new)
    }

    /// Merges `old` and `new` independently.
    pub fn merge(self, other: Self) -> Self {
        Self::new(self.old.union(other.old), self.new.union(other.new))
    }

    /// Net change in top-level block count caused by this edit.
    pub fn block_delta(&self) -> isize {
        self.new.len() as isize - self.old.len() as isize
    }
}

/// Smallest set of non-touching edit ranges covering every structured change
/// since the tracker was last cleared.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditRangeTracker {
    ranges: Vec<EditRange>,
}

impl EditRangeTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a range, merging it with every accumulated range it touches.
    ///
    /// Merging happens in a single pass over the current set: an existing
    /// range is absorbed if it touches the incoming range as grown so far.
    pub fn record(&mut self, range: EditRange) {
        let mut incoming = range.normalized();
        let mut kept = Vec::with_capacity(self.ranges.len() + 1);

        for existing in self.ranges.drain(..) {
            if existing.touches(&incoming) {
                incoming = incoming.merge(existing);
            } else {
                kept.push(existing);
            }
        }

        log::trace!("recorded edit range {incoming:?}, {} pending", kept.len() + 1);
        kept.push(incoming);
        self.ranges = kept;
    }

    pub fn ranges(&self) -> &[EditRange] {
        &self.ranges
    }

    /// Pending ranges ordered by the start of their old range.
    pub fn sorted(&self) -> Vec<EditRange> {
        let mut ranges = self.ranges.clone();
        ranges.sort_by_key(|r| (r.old.start, r.new.start));
        ranges
    }

    pub fn len(&self) -> usize {
        self.ranges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    pub fn clear(&mut self) {
        self.ranges.clear();
    }
}
