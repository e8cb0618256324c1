//! # Markdown/Structured Synchronization Primitives
//!
//! - [`position`]: (line, column) ↔ flat offset mapping
//! - [`ranges`]: block ranges touched by structured edits
//! - [`patch`]: line-range patches over the canonical markdown
//! - [`serializer`]: turning pending ranges into new markdown

pub mod patch;
pub mod position;
pub mod ranges;
pub mod serializer;

pub use patch::{MdPatch, apply_patches};
pub use position::{MdPosition, PositionMapper, clamp, end_of};
pub use ranges::{BlockRange, EditRange, EditRangeTracker};
pub use serializer::{FlushResult, IncrementalSerializer, Unresolvable};
