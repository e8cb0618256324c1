mod app;
mod buffer;

use anyhow::{Context, Result, bail};
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use markdown_duplex_config::Config;
use markdown_duplex_engine::{EditorMode, SyncOptions};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Line,
    widgets::{Block, Borders, List, ListItem, Paragraph},
};
use std::{
    env,
    io::{Stdout, stdout},
    path::{Path, PathBuf},
    process,
    time::Duration,
};

use crate::app::App;

/// How long to wait for input before polling the debounce timer again.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

const USAGE: &str =
    "Usage: markdown-duplex-cli [--structured] [--debug] [--log FILE] [--write-config] [FILE]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    file: Option<PathBuf>,
    structured: bool,
    debug: bool,
    log_file: Option<PathBuf>,
    /// Save the effective config and exit.
    write_config: bool,
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut parsed = Args::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--structured" => parsed.structured = true,
            "--debug" => parsed.debug = true,
            "--write-config" => parsed.write_config = true,
            "--log" => {
                let Some(path) = iter.next() else {
                    bail!("--log needs a file name");
                };
                parsed.log_file = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => bail!("unknown option {flag}"),
            file if parsed.file.is_none() => parsed.file = Some(PathBuf::from(file)),
            extra => bail!("unexpected argument {extra}"),
        }
    }
    Ok(parsed)
}

/// Log to a file when asked to, never to the terminal the UI is drawn on.
fn init_logging(log_file: Option<&Path>) -> Result<()> {
    let path = match log_file {
        Some(path) => path.to_path_buf(),
        None if env::var_os("RUST_LOG").is_some() => env::temp_dir().join("markdown-duplex.log"),
        None => return Ok(()),
    };
    let file = std::fs::File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    log::info!("markdown-duplex starting up, logging to {}", path.display());
    Ok(())
}

fn sync_options(config: &Config, args: &Args) -> SyncOptions {
    SyncOptions {
        debounce: config.debounce(),
        debug: config.debug || args.debug,
        history_limit: config.history_limit,
        initial_mode: if args.structured || config.start_in_structured {
            EditorMode::Structured
        } else {
            EditorMode::Text
        },
    }
}

/// `config` with the command line flags folded in.
fn effective_config(config: &Config, args: &Args) -> Config {
    Config {
        debug: config.debug || args.debug,
        start_in_structured: config.start_in_structured || args.structured,
        default_document: args.file.clone().or_else(|| config.default_document.clone()),
        ..config.clone()
    }
}

fn read_document(path: &Path) -> Result<String> {
    if !path.exists() {
        log::info!("{} does not exist yet, starting empty", path.display());
        return Ok(String::new());
    }
    let bytes =
        std::fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let text = std::str::from_utf8(&bytes)
        .with_context(|| format!("{} is not valid UTF-8", path.display()))?;
    Ok(text.to_string())
}

fn main() -> Result<()> {
    let raw_args: Vec<String> = env::args().skip(1).collect();
    let args = match parse_args(&raw_args) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("Error: {e}");
            eprintln!("{USAGE}");
            process::exit(1);
        }
    };
    init_logging(args.log_file.as_deref())?;

    let config = Config::load()?.unwrap_or_default();
    if args.write_config {
        effective_config(&config, &args).save()?;
        log::info!("wrote {}", Config::config_path().display());
        println!("Wrote {}", Config::config_path().display());
        return Ok(());
    }
    let path = args.file.clone().or_else(|| config.default_document.clone());
    let markdown = match &path {
        Some(path) => read_document(path)?,
        None => String::new(),
    };

    let mut app = App::new(&markdown, path, sync_options(&config, &args));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{err:?}");
    }

    Ok(())
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<Stdout>>, app: &mut App) -> Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        if event::poll(POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            app.handle_key(key);
        }
        app.tick();

        if app.should_quit() {
            return Ok(());
        }
    }
}

fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),
            Constraint::Length(1),
            Constraint::Length(1),
        ])
        .split(f.area());

    match app.mode() {
        EditorMode::Text => render_text_view(f, app, chunks[0]),
        EditorMode::Structured => render_structured_view(f, app, chunks[0]),
    }

    let status = if app.status().is_empty() {
        app.status_line()
    } else {
        format!("{} | {}", app.status_line(), app.status())
    };
    f.render_widget(
        Paragraph::new(status).style(Style::default().add_modifier(Modifier::REVERSED)),
        chunks[1],
    );

    let help = match (app.mode(), app.block_edit().is_some()) {
        (EditorMode::Text, _) => "Tab: structured | ^Z/^Y: undo/redo | ^S: save | ^Q: quit",
        (EditorMode::Structured, false) => {
            "↑/↓: select | Enter: edit | a: add | d: delete | Tab: text | ^Z/^Y | ^S | ^Q"
        }
        (EditorMode::Structured, true) => "Esc: finish block | Tab: text | ^S: save | ^Q: quit",
    };
    f.render_widget(Paragraph::new(help), chunks[2]);
}

fn render_text_view(f: &mut Frame, app: &mut App, area: Rect) {
    let height = area.height.saturating_sub(2);
    let scroll = app.follow_cursor(height);
    let lines: Vec<Line> = app
        .text()
        .lines()
        .iter()
        .map(|line| Line::raw(line.as_str()))
        .collect();

    let view = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title("Markdown"))
        .scroll((scroll, 0));
    f.render_widget(view, area);

    let (row, col) = app.text().cursor();
    set_cursor(f, area, row, col, scroll);
}

fn render_structured_view(f: &mut Frame, app: &mut App, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(45), Constraint::Percentage(55)])
        .split(area);

    let items: Vec<ListItem> = app
        .blocks()
        .iter()
        .map(|block| {
            let first = block.markdown.lines().next().unwrap_or_default();
            ListItem::new(Line::raw(format!("{:<18} {first}", block.kind.to_string())))
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Blocks"))
        .highlight_style(Style::default().bg(Color::Yellow).fg(Color::Black));
    f.render_stateful_widget(list, chunks[0], &mut app.block_list);

    let (title, lines, cursor) = match app.block_edit() {
        Some(edit) => (
            format!("Editing block {}", edit.index),
            edit.buffer.lines().to_vec(),
            Some(edit.buffer.cursor()),
        ),
        None => {
            let selected = app
                .block_list
                .selected()
                .and_then(|i| app.blocks().get(i))
                .map(|b| b.markdown.lines().map(str::to_string).collect())
                .unwrap_or_default();
            ("Preview".to_string(), selected, None)
        }
    };
    let body: Vec<Line> = lines.into_iter().map(Line::raw).collect();
    f.render_widget(
        Paragraph::new(body).block(Block::default().borders(Borders::ALL).title(title)),
        chunks[1],
    );

    if let Some((row, col)) = cursor {
        set_cursor(f, chunks[1], row, col, 0);
    }
}

fn set_cursor(f: &mut Frame, area: Rect, row: usize, col: usize, scroll: u16) {
    let row = u16::try_from(row).unwrap_or(u16::MAX).saturating_sub(scroll);
    let col = u16::try_from(col).unwrap_or(u16::MAX);
    let x = area.x.saturating_add(1).saturating_add(col);
    let y = area.y.saturating_add(1).saturating_add(row);
    if x < area.right() && y < area.bottom() {
        f.set_cursor_position((x, y));
    }
}
