pub mod coordinator;
pub mod error;
pub mod history;
pub mod html;
pub mod parsing;
pub mod surface;
pub mod sync;
pub mod timer;

// Re-export key types for easier usage
pub use coordinator::{Coordinator, DebugInfo, EditorMode, FlushOutcome, SyncOptions};
pub use error::SyncError;
pub use history::{HistorySize, Selection, Snapshot, SnapshotHistory};
pub use parsing::{NodeKind, ParseTree, parse};
pub use surface::{
    BlockSurface, BlockTree, ReplaceOptions, StructuredChange, StructuredSurface, TreeBlock,
};
pub use sync::{BlockRange, EditRange, MdPatch, MdPosition};
pub use timer::{Clock, ManualClock, SystemClock};
