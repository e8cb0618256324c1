use std::borrow::Cow;
use std::fmt;
use std::time::Duration;

use crate::error::SyncError;
use crate::history::{HistorySize, Selection, Snapshot, SnapshotHistory};
use crate::surface::{ReplaceOptions, StructuredChange, StructuredSurface};
use crate::sync::{
    EditRangeTracker, FlushResult, IncrementalSerializer, MdPatch, PositionMapper, end_of,
};
use crate::timer::{Clock, Debouncer, SystemClock};

/// Which representation the user is currently editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize)]
pub enum EditorMode {
    /// The markdown text is live.
    #[default]
    Text,
    /// The structured tree is live.
    Structured,
}

impl fmt::Display for EditorMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditorMode::Text => write!(f, "text"),
            EditorMode::Structured => write!(f, "structured"),
        }
    }
}

/// Coordinator settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOptions {
    /// Quiet period after the last structured edit before it is serialized.
    pub debounce: Duration,
    /// Log every snapshot push and history move at info level.
    pub debug: bool,
    /// Maximum undo depth; `None` keeps everything.
    pub history_limit: Option<usize>,
    pub initial_mode: EditorMode,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            debug: false,
            history_limit: None,
            initial_mode: EditorMode::Text,
        }
    }
}

/// Diagnostic view of the coordinator state.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DebugInfo {
    pub mode: EditorMode,
    pub canonical_md: String,
    pub dirty: bool,
    pub snapshot_size: HistorySize,
    pub selection: Selection,
}

/// What a flush did to the canonical markdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlushOutcome {
    /// No structured edits were pending.
    Idle,
    /// Edits were pending but the markdown did not change.
    Unchanged,
    /// The markdown was patched in place.
    Patched { patches: Vec<MdPatch> },
    /// The markdown was replaced by a full serialization of the tree.
    FullSerialized,
}

/// Keeps the canonical markdown and the structured surface in sync.
///
/// ## Ownership
/// - **Canonical markdown**: owned here, mutated wholesale by text edits and
///   `set_markdown`, or by line patches when structured edits are flushed
/// - **Structured tree**: owned by the surface `S`; the coordinator only
///   reads it or replaces it as a whole
///
/// ## Flushing
/// Structured edits are reported through [`notify_structured_change`] (or
/// [`edit_structured`]) and serialized once the debounce period elapses,
/// observed by polling [`tick`]. Reading the markdown, switching to text
/// mode, undo and redo flush first, so none of them sees stale text.
///
/// ## History
/// Every text change, every flush that changes the markdown and every
/// non-programmatic replacement pushes a [`Snapshot`]. Undo and redo restore
/// snapshots into whichever mode is active.
///
/// ```rust
/// use markdown_duplex_engine::{BlockSurface, Coordinator, EditorMode, SyncOptions};
///
/// let mut editor = Coordinator::new(BlockSurface::new(), "# H\n\npara one\n", SyncOptions::default());
/// editor.change_mode(EditorMode::Structured);
/// editor.edit_structured(|surface| surface.replace_block(1, "para ONE"));
///
/// // Reading forces the pending flush.
/// assert_eq!(editor.get_markdown(), "# H\n\npara ONE\n");
///
/// assert!(editor.undo());
/// assert_eq!(editor.get_markdown(), "# H\n\npara one\n");
/// ```
///
/// [`notify_structured_change`]: Coordinator::notify_structured_change
/// [`edit_structured`]: Coordinator::edit_structured
/// [`tick`]: Coordinator::tick
pub struct Coordinator<S: StructuredSurface, C: Clock = SystemClock> {
    surface: S,
    clock: C,
    options: SyncOptions,
    markdown: String,
    mode: EditorMode,
    /// Structured edits exist that are not yet in `markdown`.
    dirty: bool,
    /// Structured tree at the last point `markdown` was known to match it.
    baseline: Option<S::Model>,
    tracker: EditRangeTracker,
    serializer: IncrementalSerializer,
    history: SnapshotHistory,
    debouncer: Debouncer,
    /// Selection reported by the text view.
    text_selection: Selection,
    scroll_top: Option<f32>,
}

impl<S: StructuredSurface> Coordinator<S, SystemClock> {
    pub fn new(surface: S, markdown: impl Into<String>, options: SyncOptions) -> Self {
        Self::with_clock(surface, markdown, options, SystemClock)
    }

    /// Create a coordinator from raw document bytes.
    pub fn from_bytes(surface: S, bytes: &[u8], options: SyncOptions) -> Result<Self, SyncError> {
        let text = std::str::from_utf8(bytes)?;
        Ok(Self::new(surface, text, options))
    }
}

impl<S: StructuredSurface, C: Clock> Coordinator<S, C> {
    pub fn with_clock(
        surface: S,
        markdown: impl Into<String>,
        options: SyncOptions,
        clock: C,
    ) -> Self {
        let history = match options.history_limit {
            Some(limit) => SnapshotHistory::with_limit(limit),
            None => SnapshotHistory::new(),
        };
        let initial_mode = options.initial_mode;
        let mut coordinator = Self {
            surface,
            clock,
            debouncer: Debouncer::new(options.debounce),
            options,
            markdown: markdown.into(),
            mode: EditorMode::Text,
            dirty: false,
            baseline: None,
            tracker: EditRangeTracker::new(),
            serializer: IncrementalSerializer::new(),
            history,
            text_selection: Selection::default(),
            scroll_top: None,
        };
        if initial_mode == EditorMode::Structured {
            coordinator.enter_structured();
        }
        coordinator.push_snapshot();
        coordinator
    }

    pub fn mode(&self) -> EditorMode {
        self.mode
    }

    pub fn options(&self) -> &SyncOptions {
        &self.options
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Direct access to the surface. Tree mutations made through it must be
    /// reported with [`notify_structured_change`](Self::notify_structured_change).
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Canonical markdown as last committed, without flushing.
    pub fn markdown(&self) -> &str {
        &self.markdown
    }

    /// Canonical markdown including every pending structured edit.
    pub fn get_markdown(&mut self) -> &str {
        if self.mode == EditorMode::Structured {
            self.flush_pending();
        }
        &self.markdown
    }

    /// HTML rendering of the structured tree. In text mode the tree is
    /// derived from the markdown for this call only.
    pub fn get_html(&self) -> String {
        match self.mode {
            EditorMode::Structured => self.surface.model_to_html(self.surface.model()),
            EditorMode::Text => {
                let model = self.surface.model_from_markdown(&self.markdown);
                self.surface.model_to_html(&model)
            }
        }
    }

    /// Replace the document. Pending structured edits are discarded.
    pub fn set_markdown(&mut self, markdown: impl Into<String>, options: ReplaceOptions) {
        self.replace_content(markdown.into(), None, options);
    }

    /// Replace the document with converted HTML.
    pub fn set_html(&mut self, html: &str, options: ReplaceOptions) -> Result<(), SyncError> {
        let model = self.surface.model_from_html(html)?;
        let markdown = self.surface.model_to_markdown(&model);
        self.replace_content(markdown, Some(model), options);
        Ok(())
    }

    /// Switch the live representation. Leaving structured mode flushes first.
    pub fn change_mode(&mut self, next: EditorMode) {
        if next == self.mode {
            return;
        }
        log::info!("switching editor mode {} -> {}", self.mode, next);

        match next {
            EditorMode::Structured => self.enter_structured(),
            EditorMode::Text => {
                if self.dirty {
                    self.flush_pending();
                }
                self.text_selection = self.structured_selection();
                self.discard_pending();
                self.baseline = None;
                self.mode = EditorMode::Text;
            }
        }
    }

    /// Text view change event.
    pub fn text_changed(&mut self, text: impl Into<String>, selection: Selection) {
        if self.mode != EditorMode::Text {
            log::debug!("ignoring text change while structured mode is live");
            return;
        }
        let text = text.into();
        if text == self.markdown {
            self.text_selection = selection.clamped(&self.markdown);
            return;
        }
        self.markdown = text;
        self.text_selection = selection.clamped(&self.markdown);
        self.push_snapshot();
    }

    /// Structured surface change event: track the range and restart the debounce.
    pub fn notify_structured_change(&mut self, change: StructuredChange) {
        if self.mode != EditorMode::Structured {
            log::debug!("ignoring structured change while text mode is live");
            return;
        }
        self.tracker.record(change.edit_range());
        self.dirty = true;
        self.debouncer.schedule(self.clock.now());
    }

    /// Run `edit` against the surface and report the change it returns.
    /// Returns false when nothing changed or text mode is live.
    pub fn edit_structured<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut S) -> Option<StructuredChange>,
    {
        if self.mode != EditorMode::Structured {
            return false;
        }
        match edit(&mut self.surface) {
            Some(change) => {
                self.notify_structured_change(change);
                true
            }
            None => false,
        }
    }

    /// Flush if the debounce period has elapsed.
    pub fn tick(&mut self) -> FlushOutcome {
        if self.debouncer.take_due(self.clock.now()) {
            self.flush_pending()
        } else {
            FlushOutcome::Idle
        }
    }

    /// Flush pending structured edits now, ignoring the debounce timer.
    pub fn flush(&mut self) -> FlushOutcome {
        self.flush_pending()
    }

    pub fn undo(&mut self) -> bool {
        self.flush_pending();
        let Some(snapshot) = self.history.undo().cloned() else {
            return false;
        };
        if self.options.debug {
            log::info!("undo -> {:?}", self.history.size());
        }
        self.restore(snapshot);
        true
    }

    pub fn redo(&mut self) -> bool {
        self.flush_pending();
        let Some(snapshot) = self.history.redo().cloned() else {
            return false;
        };
        if self.options.debug {
            log::info!("redo -> {:?}", self.history.size());
        }
        self.restore(snapshot);
        true
    }

    /// Start over with `markdown` as the only history entry.
    pub fn reset(&mut self, markdown: impl Into<String>) {
        self.history.clear();
        self.scroll_top = None;
        self.text_selection = Selection::default();
        self.replace_content(markdown.into(), None, ReplaceOptions::programmatic());
        if self.mode == EditorMode::Structured {
            self.apply_structured_selection(Selection::default());
        }
        self.push_snapshot();
        log::info!("coordinator reset with {} bytes", self.markdown.len());
    }

    /// Current selection in markdown coordinates.
    pub fn selection(&self) -> Selection {
        match self.mode {
            EditorMode::Text => self.text_selection.clamped(&self.markdown),
            EditorMode::Structured => self.structured_selection(),
        }
    }

    /// Move the selection of the live view. Out of range positions are clamped.
    pub fn set_selection(&mut self, selection: Selection) {
        match self.mode {
            EditorMode::Text => self.text_selection = selection.clamped(&self.markdown),
            EditorMode::Structured => self.apply_structured_selection(selection),
        }
    }

    pub fn scroll_top(&self) -> Option<f32> {
        self.scroll_top
    }

    pub fn set_scroll_top(&mut self, scroll_top: f32) {
        self.scroll_top = Some(scroll_top);
    }

    pub fn debug_info(&self) -> DebugInfo {
        DebugInfo {
            mode: self.mode,
            canonical_md: self.markdown.clone(),
            dirty: self.dirty,
            snapshot_size: self.history.size(),
            selection: self.selection(),
        }
    }

    fn enter_structured(&mut self) {
        let model = self.surface.model_from_markdown(&self.markdown);
        self.install_model(model, ReplaceOptions::programmatic());
        self.mode = EditorMode::Structured;
        self.apply_structured_selection(self.text_selection);
    }

    /// Hand `model` to the surface and make it the new baseline.
    fn install_model(&mut self, model: S::Model, options: ReplaceOptions) {
        self.baseline = Some(model.clone());
        self.surface.set_model(model, options);
        self.discard_pending();
    }

    fn discard_pending(&mut self) {
        self.tracker.clear();
        self.debouncer.cancel();
        self.dirty = false;
    }

    fn replace_content(&mut self, markdown: String, model: Option<S::Model>, options: ReplaceOptions) {
        self.markdown = markdown;
        self.discard_pending();

        match self.mode {
            EditorMode::Text => {
                self.text_selection = if options.move_cursor_to_end {
                    Selection::caret(end_of(&self.markdown))
                } else {
                    self.text_selection.clamped(&self.markdown)
                };
            }
            EditorMode::Structured => {
                let model =
                    model.unwrap_or_else(|| self.surface.model_from_markdown(&self.markdown));
                self.install_model(model, options);
            }
        }

        if options.records_history() {
            self.push_snapshot();
        } else {
            log::debug!("programmatic replacement, history untouched");
        }
    }

    /// Single flush path shared by the debounce timer and forced flushes.
    fn flush_pending(&mut self) -> FlushOutcome {
        self.debouncer.cancel();
        if !self.dirty {
            self.tracker.clear();
            return FlushOutcome::Idle;
        }

        let ranges = self.tracker.sorted();
        let result =
            self.serializer
                .flush(&self.markdown, &ranges, &self.surface, self.baseline.as_ref());
        self.tracker.clear();
        self.dirty = false;
        self.baseline = Some(self.surface.model().clone());

        let (markdown, outcome) = match result {
            FlushResult::Unchanged => return FlushOutcome::Unchanged,
            FlushResult::Patched { markdown, patches } => {
                (markdown, FlushOutcome::Patched { patches })
            }
            FlushResult::Full { markdown } => (markdown, FlushOutcome::FullSerialized),
        };

        if markdown == self.markdown {
            log::debug!("flush reproduced the current markdown, no snapshot");
            return FlushOutcome::Unchanged;
        }
        self.markdown = markdown;
        self.push_snapshot();
        outcome
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.markdown = snapshot.md;
        self.scroll_top = snapshot.scroll_top;

        match self.mode {
            EditorMode::Text => {
                self.discard_pending();
                self.text_selection = snapshot.selection.clamped(&self.markdown);
            }
            EditorMode::Structured => {
                let model = self.surface.model_from_markdown(&self.markdown);
                self.install_model(model, ReplaceOptions::programmatic());
                self.apply_structured_selection(snapshot.selection);
            }
        }
    }

    fn push_snapshot(&mut self) {
        let snapshot = Snapshot {
            md: self.markdown.clone(),
            selection: self.selection(),
            scroll_top: self.scroll_top,
            mode: self.mode,
            time: self.clock.now(),
        };
        self.history.push(snapshot);
        if self.options.debug {
            log::info!(
                "snapshot pushed in {} mode ({} bytes), history {:?}",
                self.mode,
                self.markdown.len(),
                self.history.size()
            );
        }
    }

    /// Markdown matching the structured tree as it is right now.
    fn structured_markdown(&self) -> Cow<'_, str> {
        if self.dirty {
            Cow::Owned(self.surface.serialize_all())
        } else {
            Cow::Borrowed(&self.markdown)
        }
    }

    fn structured_selection(&self) -> Selection {
        let markdown = self.structured_markdown();
        let mapper = PositionMapper::new(&markdown);
        let (from, to) = self.surface.selection();
        Selection::new(
            mapper.to_markdown_position(from),
            mapper.to_markdown_position(to),
        )
    }

    fn apply_structured_selection(&mut self, selection: Selection) {
        let (from, to) = {
            let markdown = self.structured_markdown();
            let selection = selection.clamped(&markdown);
            let mapper = PositionMapper::new(&markdown);
            (
                mapper.to_structured_offset(selection.anchor),
                mapper.to_structured_offset(selection.head),
            )
        };
        self.surface.set_selection(from, to);
    }
}
