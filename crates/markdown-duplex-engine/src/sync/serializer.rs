//! Incremental markdown serialization of structured edits.
//!
//! Pending edit ranges are turned into line patches against the canonical
//! markdown. Whenever a range cannot be resolved unambiguously the whole
//! structured tree is serialized instead: a slower full pass is always
//! preferred over a patch that might be wrong.

use crate::parsing::parse;
use crate::surface::StructuredSurface;
use crate::sync::{BlockRange, EditRange, MdPatch, apply_patches};

/// Result of flushing pending structured edits.
#[derive(Debug, Clone, PartialEq)]
pub enum FlushResult {
    /// The structured tree equals the baseline; the markdown is untouched.
    Unchanged,
    /// Every range resolved; `markdown` is the patched text.
    Patched {
        markdown: String,
        patches: Vec<MdPatch>,
    },
    /// Patching was abandoned; `markdown` is the full serialization.
    Full { markdown: String },
}

/// Why a batch of ranges could not be turned into patches.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Unresolvable {
    #[error("no pending ranges describe the change")]
    NoRanges,
    #[error("range of unknown extent")]
    UnknownExtent,
    #[error("no baseline tree to check the markdown against")]
    NoBaseline,
    #[error("the markdown's blocks no longer line up with the baseline tree")]
    Misaligned,
    #[error("old blocks {0:?} are not in the parsed markdown")]
    OldRange(BlockRange),
    #[error("new blocks {0:?} are not in the structured tree")]
    NewRange(BlockRange),
    #[error("several ranges change the block count")]
    AmbiguousBatch,
    #[error("expected {expected} blocks after the edit, tree has {actual}")]
    BlockCount { expected: isize, actual: usize },
    #[error("patched markdown does not parse back into the structured tree")]
    Diverged,
}

/// Turns pending edit ranges into markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct IncrementalSerializer;

impl IncrementalSerializer {
    pub fn new() -> Self {
        Self
    }

    /// Flush `ranges` against `markdown`.
    ///
    /// `baseline` is the structured tree as it was when the markdown was last
    /// known to match it; an unchanged tree short-circuits to
    /// [`FlushResult::Unchanged`]. A patched result is only returned when it
    /// parses back into exactly the current tree.
    pub fn flush<S: StructuredSurface>(
        &self,
        markdown: &str,
        ranges: &[EditRange],
        surface: &S,
        baseline: Option<&S::Model>,
    ) -> FlushResult {
        let Some(baseline) = baseline else {
            return self.full(surface, &Unresolvable::NoBaseline);
        };
        if baseline == surface.model() {
            log::debug!("structured tree equals baseline, nothing to serialize");
            return FlushResult::Unchanged;
        }

        let patched = self
            .plan(markdown, ranges, surface, baseline)
            .and_then(|patches| {
                let patched = apply_patches(markdown, &patches);
                if surface.model_from_markdown(&patched) == *surface.model() {
                    Ok((patched, patches))
                } else {
                    Err(Unresolvable::Diverged)
                }
            });

        match patched {
            Ok((markdown, patches)) => {
                log::debug!("applied {} incremental patch(es)", patches.len());
                FlushResult::Patched { markdown, patches }
            }
            Err(reason) => self.full(surface, &reason),
        }
    }

    /// Resolve every range to a patch, or explain why the batch cannot be patched.
    ///
    /// Block `i` of the structured tree is only located at block `i` of the
    /// parsed markdown when the markdown re-derives exactly the `baseline`
    /// tree; otherwise the batch is refused.
    pub fn plan<S: StructuredSurface>(
        &self,
        markdown: &str,
        ranges: &[EditRange],
        surface: &S,
        baseline: &S::Model,
    ) -> Result<Vec<MdPatch>, Unresolvable> {
        if ranges.is_empty() {
            return Err(Unresolvable::NoRanges);
        }
        if ranges.iter().any(|r| r.old.is_unbounded() || r.new.is_unbounded()) {
            return Err(Unresolvable::UnknownExtent);
        }

        let mut ordered = ranges.to_vec();
        ordered.sort_by_key(|r| r.old.start);

        // Later ranges may be expressed against trees already shifted by
        // earlier ones; only unshifted batches can be located reliably.
        if ordered.len() > 1 && ordered.iter().any(|r| r.block_delta() != 0) {
            return Err(Unresolvable::AmbiguousBatch);
        }

        if surface.model_from_markdown(markdown) != *baseline {
            return Err(Unresolvable::Misaligned);
        }

        let old_tree = parse(markdown);
        let net: isize = ordered.iter().map(EditRange::block_delta).sum();
        let expected = old_tree.len() as isize + net;
        let actual = surface.block_count();
        if expected != actual as isize {
            return Err(Unresolvable::BlockCount { expected, actual });
        }

        ordered
            .iter()
            .map(|range| {
                let lines = old_tree
                    .line_range_of(range.old.start, range.old.end)
                    .ok_or(Unresolvable::OldRange(range.old))?;
                let text = surface
                    .serialize_range(range.new)
                    .ok_or(Unresolvable::NewRange(range.new))?;
                Ok(MdPatch { range: lines, text })
            })
            .collect()
    }

    fn full<S: StructuredSurface>(&self, surface: &S, reason: &Unresolvable) -> FlushResult {
        log::debug!("falling back to full serialization: {reason}");
        FlushResult::Full {
            markdown: surface.serialize_all(),
        }
    }
}
