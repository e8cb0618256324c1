use markdown_duplex_engine::sync::{FlushResult, IncrementalSerializer};
use markdown_duplex_engine::{
    BlockSurface, BlockTree, Coordinator, EditorMode, StructuredChange, StructuredSurface,
    SyncOptions,
};
use pretty_assertions::assert_eq;
use rstest::rstest;

fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!(
        "{}/tests/fixtures/{name}.md",
        env!("CARGO_MANIFEST_DIR")
    ))
    .unwrap()
}

#[rstest]
#[case("headings_and_paragraphs")]
#[case("lists_and_quotes")]
#[case("code_and_tables")]
#[case("links_and_references")]
fn mode_round_trip_preserves_markdown(#[case] name: &str) {
    let md = fixture(name);
    let mut editor = Coordinator::new(BlockSurface::new(), md.as_str(), SyncOptions::default());

    editor.change_mode(EditorMode::Structured);
    assert_eq!(editor.surface().serialize_all(), md);
    editor.change_mode(EditorMode::Text);

    assert_eq!(editor.get_markdown(), md);
}

/// Flush `change` made by `edit` and check the patched text equals a full serialization.
fn assert_patch_matches_full<F>(md: &str, edit: F)
where
    F: FnOnce(&mut BlockSurface) -> Option<StructuredChange>,
{
    let mut surface = BlockSurface::from_markdown(md);
    let Some(change) = edit(&mut surface) else {
        return;
    };
    let baseline = BlockTree::from_markdown(md);

    let result =
        IncrementalSerializer::new().flush(md, &[change.edit_range()], &surface, Some(&baseline));

    match result {
        FlushResult::Patched { markdown, .. } => assert_eq!(markdown, surface.serialize_all()),
        FlushResult::Unchanged => assert_eq!(md, surface.serialize_all()),
        FlushResult::Full { markdown } => assert_eq!(markdown, surface.serialize_all()),
    }
}

#[rstest]
#[case("headings_and_paragraphs")]
#[case("lists_and_quotes")]
#[case("code_and_tables")]
#[case("links_and_references")]
fn patched_edits_match_full_serialization(#[case] name: &str) {
    let md = fixture(name);
    let count = BlockTree::from_markdown(&md).len();

    for index in 0..count {
        assert_patch_matches_full(&md, |s| s.replace_block(index, "Replaced block."));
        assert_patch_matches_full(&md, |s| s.replace_block(index, "multi\nline\nblock"));
        assert_patch_matches_full(&md, |s| s.remove_block(index));
    }
    for index in 0..=count {
        assert_patch_matches_full(&md, |s| Some(s.insert_block(index, "Inserted block.")));
    }
}
