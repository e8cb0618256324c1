use std::time::Duration;

use markdown_duplex_engine::sync::{EditRangeTracker, apply_patches, clamp};
use markdown_duplex_engine::{
    BlockRange, BlockSurface, Coordinator, EditRange, EditorMode, FlushOutcome, HistorySize,
    ManualClock, MdPatch, MdPosition, ReplaceOptions, Selection, SyncOptions,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

const DOC: &str = "# H\n\npara one\n\npara two\n";

fn structured_editor(markdown: &str) -> (Coordinator<BlockSurface, ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    let mut editor = Coordinator::with_clock(
        BlockSurface::new(),
        markdown,
        SyncOptions::default(),
        clock.clone(),
    );
    editor.change_mode(EditorMode::Structured);
    (editor, clock)
}

#[test]
fn single_paragraph_edit_becomes_one_line_patch() {
    let (mut editor, clock) = structured_editor(DOC);
    editor.edit_structured(|s| s.replace_block(1, "para ONE"));

    clock.advance(Duration::from_millis(300));
    assert_eq!(
        editor.tick(),
        FlushOutcome::Patched {
            patches: vec![MdPatch::new(3, 3, "para ONE")]
        }
    );
    assert_eq!(editor.get_markdown(), "# H\n\npara ONE\n\npara two\n");
}

#[test]
fn identical_tree_leaves_markdown_and_history_alone() {
    let (mut editor, clock) = structured_editor(DOC);
    editor.edit_structured(|s| s.replace_block(2, "para two"));

    clock.advance(Duration::from_secs(1));
    assert_eq!(editor.tick(), FlushOutcome::Unchanged);
    assert_eq!(editor.get_markdown(), DOC);
    assert_eq!(
        editor.debug_info().snapshot_size,
        HistorySize { undo: 1, redo: 0 }
    );
}

#[test]
fn undo_walks_back_to_floor_and_push_clears_redo() {
    let clock = ManualClock::new();
    let mut editor =
        Coordinator::with_clock(BlockSurface::new(), "S0", SyncOptions::default(), clock);
    editor.text_changed("S1", Selection::default());
    editor.text_changed("S2", Selection::default());

    assert!(editor.undo());
    assert_eq!(editor.markdown(), "S1");
    assert!(editor.undo());
    assert_eq!(editor.markdown(), "S0");
    assert!(!editor.undo());
    assert!(!editor.can_undo());

    editor.set_markdown("S1'", ReplaceOptions::user());
    assert!(!editor.redo());
}

#[test]
fn forced_flush_before_undo_clears_redo() {
    let (mut editor, _clock) = structured_editor(DOC);
    editor.edit_structured(|s| s.replace_block(0, "# A"));
    editor.flush();
    editor.undo();
    assert!(editor.can_redo());

    editor.edit_structured(|s| s.replace_block(0, "# B"));
    // undo flushes "# B" first, which pushes and drops the redo branch.
    assert!(editor.undo());
    assert_eq!(editor.markdown(), DOC);
    assert!(editor.redo());
    assert_eq!(editor.markdown(), "# B\n\npara one\n\npara two\n");
    assert!(!editor.redo());
}

#[rstest]
#[case(MdPosition::new(40, 2), MdPosition::new(6, 1))]
#[case(MdPosition::new(3, 40), MdPosition::new(3, 9))]
#[case(MdPosition::new(0, 0), MdPosition::new(1, 1))]
fn selections_are_clamped(#[case] position: MdPosition, #[case] expected: MdPosition) {
    assert_eq!(clamp(DOC, position), expected);
}

#[test]
fn touching_ranges_merge_on_record() {
    let mut tracker = EditRangeTracker::new();
    tracker.record(EditRange::new(BlockRange::new(0, 2), BlockRange::new(0, 2)));
    tracker.record(EditRange::new(BlockRange::new(3, 5), BlockRange::new(3, 5)));

    assert_eq!(
        tracker.ranges(),
        &[EditRange::new(BlockRange::new(0, 5), BlockRange::new(0, 5))]
    );
}

#[test]
fn patches_apply_against_pre_edit_line_numbers() {
    let md = "a\nb\nc\nd\n";
    let patches = [
        MdPatch::new(3, 3, "C1\nC2"),
        MdPatch::new(1, 1, "A1\nA2\nA3"),
    ];
    assert_eq!(apply_patches(md, &patches), "A1\nA2\nA3\nb\nC1\nC2\nd\n");
}

#[test]
fn structured_edits_survive_mode_switch_and_undo() {
    let (mut editor, _clock) = structured_editor(DOC);
    editor.edit_structured(|s| Some(s.insert_block(3, "para three")));
    editor.change_mode(EditorMode::Text);

    assert_eq!(
        editor.get_markdown(),
        "# H\n\npara one\n\npara two\n\npara three\n"
    );
    assert!(editor.undo());
    assert_eq!(editor.get_markdown(), DOC);
    assert_eq!(editor.mode(), EditorMode::Text);
}

#[test]
fn reference_definitions_survive_full_serialization() {
    let (mut editor, _clock) =
        structured_editor("See [docs][d].\n\n[d]: https://example.com\n\nmore\n");
    editor.edit_structured(|s| Some(s.insert_block(0, "top")));
    editor.edit_structured(|s| Some(s.insert_block(3, "tail")));

    assert_eq!(editor.flush(), FlushOutcome::FullSerialized);
    assert_eq!(
        editor.markdown(),
        "top\n\nSee [docs][d].\n\n[d]: https://example.com\n\ntail\n\nmore\n"
    );
}

#[test]
fn crlf_documents_keep_their_line_endings_when_patched() {
    let (mut editor, _clock) = structured_editor("# H\r\n\r\npara one\r\n\r\npara two\r\n");
    editor.edit_structured(|s| s.replace_block(1, "para ONE"));

    assert!(matches!(editor.flush(), FlushOutcome::Patched { .. }));
    assert_eq!(
        editor.markdown(),
        "# H\r\n\r\npara ONE\r\n\r\npara two\r\n"
    );
}
