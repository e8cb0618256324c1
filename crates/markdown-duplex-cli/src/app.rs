use std::path::PathBuf;

use anyhow::{Context, Result};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use markdown_duplex_engine::{
    BlockSurface, Coordinator, EditorMode, FlushOutcome, StructuredSurface, SyncOptions, TreeBlock,
};
use ratatui::widgets::ListState;

use crate::buffer::TextBuffer;

const NEW_BLOCK: &str = "New paragraph";

/// A structured-mode block being edited in place.
pub struct BlockEdit {
    pub index: usize,
    pub buffer: TextBuffer,
}

pub struct App {
    editor: Coordinator<BlockSurface>,
    path: Option<PathBuf>,
    text: TextBuffer,
    /// First visible row of the text view.
    scroll: u16,
    pub block_list: ListState,
    block_edit: Option<BlockEdit>,
    status: String,
    quit: bool,
}

impl App {
    pub fn new(markdown: &str, path: Option<PathBuf>, options: SyncOptions) -> Self {
        let editor = Coordinator::new(BlockSurface::new(), markdown, options);
        let mut app = Self {
            text: TextBuffer::from_text(editor.markdown()),
            scroll: 0,
            editor,
            path,
            block_list: ListState::default(),
            block_edit: None,
            status: String::new(),
            quit: false,
        };
        app.refresh_view();
        app
    }

    pub fn editor(&self) -> &Coordinator<BlockSurface> {
        &self.editor
    }

    pub fn mode(&self) -> EditorMode {
        self.editor.mode()
    }

    pub fn text(&self) -> &TextBuffer {
        &self.text
    }

    pub fn blocks(&self) -> &[TreeBlock] {
        &self.editor.surface().tree().blocks
    }

    pub fn block_edit(&self) -> Option<&BlockEdit> {
        self.block_edit.as_ref()
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    /// One line summary of the coordinator state.
    pub fn status_line(&self) -> String {
        let info = self.editor.debug_info();
        let file = self
            .path
            .as_ref()
            .map_or_else(|| "[no file]".to_string(), |p| p.display().to_string());
        format!(
            "{} | {} | undo {} redo {} | Ln {}, Col {} | {}",
            info.mode,
            if info.dirty { "pending" } else { "synced" },
            info.snapshot_size.undo,
            info.snapshot_size.redo,
            info.selection.head.line,
            info.selection.head.column,
            file
        )
    }

    /// Scroll the text view so the cursor row is visible in `height` rows
    /// and return the first visible row.
    pub fn follow_cursor(&mut self, height: u16) -> u16 {
        let row = u16::try_from(self.text.cursor().0).unwrap_or(u16::MAX);
        if row < self.scroll {
            self.scroll = row;
        } else if height > 0 && row >= self.scroll + height {
            self.scroll = row + 1 - height;
        }
        self.editor.set_scroll_top(f32::from(self.scroll));
        self.scroll
    }

    /// Give the debounce timer a chance to fire.
    pub fn tick(&mut self) {
        match self.editor.tick() {
            FlushOutcome::Idle => {}
            outcome => log::debug!("debounced flush: {outcome:?}"),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) {
        if key.modifiers.contains(KeyModifiers::CONTROL) {
            match key.code {
                KeyCode::Char('q') => self.quit = true,
                KeyCode::Char('s') => {
                    self.status = match self.save() {
                        Ok(message) => message,
                        Err(e) => format!("Save failed: {e:#}"),
                    }
                }
                KeyCode::Char('z') => self.undo(),
                KeyCode::Char('y') => self.redo(),
                _ => {}
            }
            return;
        }

        if key.code == KeyCode::Tab {
            self.toggle_mode();
            return;
        }

        match self.editor.mode() {
            EditorMode::Text => self.handle_text_key(key.code),
            EditorMode::Structured if self.block_edit.is_some() => {
                self.handle_block_edit_key(key.code)
            }
            EditorMode::Structured => self.handle_block_list_key(key.code),
        }
    }

    fn handle_text_key(&mut self, code: KeyCode) {
        let changed = match code {
            KeyCode::Char(c) => {
                self.text.insert_char(c);
                true
            }
            KeyCode::Enter => {
                self.text.newline();
                true
            }
            KeyCode::Backspace => self.text.backspace(),
            KeyCode::Left => {
                self.text.move_left();
                false
            }
            KeyCode::Right => {
                self.text.move_right();
                false
            }
            KeyCode::Up => {
                self.text.move_up();
                false
            }
            KeyCode::Down => {
                self.text.move_down();
                false
            }
            _ => return,
        };

        if changed {
            self.editor.text_changed(self.text.text(), self.text.caret());
        } else {
            self.editor.set_selection(self.text.caret());
        }
    }

    fn handle_block_list_key(&mut self, code: KeyCode) {
        let count = self.blocks().len();
        let selected = self.block_list.selected().unwrap_or(0);

        match code {
            KeyCode::Down | KeyCode::Char('j') if count > 0 => {
                self.select_block((selected + 1).min(count - 1))
            }
            KeyCode::Up | KeyCode::Char('k') => self.select_block(selected.saturating_sub(1)),
            KeyCode::Enter if count > 0 => self.begin_block_edit(selected),
            KeyCode::Char('a') => {
                let index = if count == 0 { 0 } else { selected + 1 };
                self.editor
                    .edit_structured(|s| Some(s.insert_block(index, NEW_BLOCK)));
                self.select_block(index);
                self.begin_block_edit(index);
            }
            KeyCode::Char('d') | KeyCode::Delete if count > 0 => {
                self.editor.edit_structured(|s| s.remove_block(selected));
                self.clamp_block_selection();
            }
            _ => {}
        }
    }

    fn handle_block_edit_key(&mut self, code: KeyCode) {
        let Some(edit) = self.block_edit.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => self.commit_block_edit(),
            KeyCode::Char(c) => edit.buffer.insert_char(c),
            KeyCode::Enter => edit.buffer.newline(),
            KeyCode::Backspace => {
                edit.buffer.backspace();
            }
            KeyCode::Left => edit.buffer.move_left(),
            KeyCode::Right => edit.buffer.move_right(),
            KeyCode::Up => edit.buffer.move_up(),
            KeyCode::Down => edit.buffer.move_down(),
            _ => {}
        }
    }

    fn begin_block_edit(&mut self, index: usize) {
        let Some(buffer) = self
            .blocks()
            .get(index)
            .map(|block| TextBuffer::from_text(&block.markdown))
        else {
            return;
        };
        self.block_edit = Some(BlockEdit { index, buffer });
    }

    /// Hand the edited block to the surface; an emptied block is removed.
    fn commit_block_edit(&mut self) {
        let Some(edit) = self.block_edit.take() else {
            return;
        };
        let markdown = edit.buffer.text().trim_end().to_string();
        if markdown.trim().is_empty() {
            self.editor.edit_structured(|s| s.remove_block(edit.index));
        } else {
            self.editor
                .edit_structured(|s| s.replace_block(edit.index, markdown));
        }
        self.clamp_block_selection();
    }

    fn toggle_mode(&mut self) {
        self.commit_block_edit();
        let next = match self.editor.mode() {
            EditorMode::Text => EditorMode::Structured,
            EditorMode::Structured => EditorMode::Text,
        };
        self.editor.change_mode(next);
        self.refresh_view();
        self.status = format!("Switched to {next} mode");
    }

    fn undo(&mut self) {
        self.commit_block_edit();
        if !self.editor.undo() {
            self.status = "Nothing to undo".to_string();
        }
        self.refresh_view();
    }

    fn redo(&mut self) {
        self.commit_block_edit();
        if !self.editor.redo() {
            self.status = "Nothing to redo".to_string();
        }
        self.refresh_view();
    }

    fn save(&mut self) -> Result<String> {
        self.commit_block_edit();
        let Some(path) = self.path.clone() else {
            return Ok("No file to save to".to_string());
        };
        let markdown = self.editor.get_markdown().to_string();
        std::fs::write(&path, markdown)
            .with_context(|| format!("writing {}", path.display()))?;
        log::info!("saved {}", path.display());
        Ok(format!("Saved {}", path.display()))
    }

    /// Bring the visible view in line with the coordinator after a wholesale change.
    fn refresh_view(&mut self) {
        match self.editor.mode() {
            EditorMode::Text => {
                self.text = TextBuffer::from_text(self.editor.markdown());
                self.text.set_caret(self.editor.selection().head);
                self.scroll = self.editor.scroll_top().map_or(0, |top| top as u16);
            }
            EditorMode::Structured => {
                let line = self.editor.selection().head.line;
                let index = markdown_duplex_engine::parse(self.editor.markdown())
                    .block_at_line(line)
                    .unwrap_or(0);
                self.select_block(index);
            }
        }
    }

    fn clamp_block_selection(&mut self) {
        let selected = self.block_list.selected().unwrap_or(0);
        self.select_block(selected);
    }

    /// Highlight block `index` and move the structured selection to its start.
    fn select_block(&mut self, index: usize) {
        let count = self.blocks().len();
        if count == 0 {
            self.block_list.select(None);
            return;
        }
        let index = index.min(count - 1);
        self.block_list.select(Some(index));

        let offset = self.blocks()[..index]
            .iter()
            .map(TreeBlock::flat_size)
            .sum::<usize>()
            + 1;
        self.editor.surface_mut().set_selection(offset, offset);
    }
}
