//! mdreview - review a markdown document in the terminal and hand the
//! verdict back to whoever asked for it

mod config;
mod io;
mod logging;
mod transport;
mod ui;

use std::io::stdout;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tracing::{error, info, warn};

use mdreview_core::{
    render_feedback, to_json, App, Focus, Mode, SegmentationMode, SelectionKind, Session,
    Transport,
};

use crate::config::Config;
use crate::transport::{HttpTransport, LocalOnly};

#[derive(Debug, Parser)]
#[command(name = "mdreview", version, about = "Approve, reject and comment on markdown")]
struct Cli {
    /// Markdown file to review, or `-` for stdin
    file: String,

    /// Title shown in the header (defaults to the file name)
    #[arg(short, long)]
    title: Option<String>,

    /// Review granularity: block or line
    #[arg(short, long)]
    mode: Option<SegmentationMode>,

    /// Port of the local receiver
    #[arg(short, long)]
    port: Option<u16>,

    /// Full submission URL; overrides --port
    #[arg(long)]
    endpoint: Option<String>,

    /// Keep the verdict local instead of posting it
    #[arg(long)]
    no_submit: bool,

    /// Print the payload as JSON on exit
    #[arg(long)]
    print: bool,

    /// Alternate config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write logs as JSON lines
    #[arg(long)]
    log_json: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref())?;
    if let Some(mode) = cli.mode {
        config.mode = mode;
    }
    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.endpoint.is_some() {
        config.endpoint = cli.endpoint.clone();
    }

    logging::init_logging(io::log_dir()?, &config.log_level, cli.log_json);

    let source = io::load_source(&cli.file)?;
    let title = cli.title.clone().unwrap_or(source.title);

    let transport: Box<dyn Transport> = if cli.no_submit {
        Box::new(LocalOnly)
    } else {
        let http = HttpTransport::new(
            config.submit_url(),
            Duration::from_secs(config.timeout_secs),
        )?;
        info!(endpoint = http.endpoint(), "submissions enabled");
        Box::new(http)
    };

    let session = Session::new(title, &source.content, config.mode);
    info!(
        session = %session.id(),
        mode = %config.mode,
        units = session.units().len(),
        "review started"
    );

    let mut app = App::new(session, &source.content);
    app.set_status(&format!(
        "{} units to review, ? for help",
        app.session.units().len()
    ));

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Main loop
    let res = run_app(&mut terminal, &mut app, transport.as_ref());

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    if let Err(e) = res {
        error!(error = %e, "review loop failed");
        eprintln!("Error: {}", e);
    }

    if !app.session.is_closed() {
        warn!(session = %app.session.id(), "review ended without a decision");
    }

    let Some(payload) = app.outcome() else {
        return Ok(());
    };

    if config.export {
        match io::app_dir().and_then(|dir| io::export_payload(&dir, payload)) {
            Ok(path) => info!(path = %path.display(), "payload exported"),
            Err(e) => eprintln!("Export failed: {}", e),
        }
    }

    if cli.print {
        println!("{}", to_json(payload)?);
    } else {
        println!("{}", render_feedback(app.title(), payload));
    }

    Ok(())
}

fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    transport: &dyn Transport,
) -> Result<()> {
    while app.running {
        terminal.draw(|f| ui::draw(f, app))?;

        if let Event::Key(key) = event::read()? {
            if key.kind != KeyEventKind::Press {
                continue;
            }

            // Clear status on any key, except while a failure is on screen
            if app.mode != Mode::DeliveryFailed {
                app.clear_status();
            }

            match app.mode {
                Mode::Normal => handle_normal_mode(app, key.code, key.modifiers, transport),
                Mode::Visual => handle_visual_mode(app, key.code),
                Mode::Input => handle_input_mode(app, key.code),
                Mode::DeliveryFailed => handle_delivery_failed(app, key.code, transport),
                Mode::Help => {
                    app.mode = Mode::Normal;
                }
                Mode::Finished => app.running = false,
            }
        }
    }
    Ok(())
}

fn handle_normal_mode(
    app: &mut App,
    code: KeyCode,
    modifiers: KeyModifiers,
    transport: &dyn Transport,
) {
    match code {
        KeyCode::Char('?') => app.mode = Mode::Help,

        // Finish
        KeyCode::Char('S') => app.submit(transport),
        KeyCode::Char('s') if modifiers.contains(KeyModifiers::CONTROL) => app.submit(transport),
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => app.cancel(transport),
        KeyCode::Char('q') | KeyCode::Esc => app.cancel(transport),

        // Navigation
        KeyCode::Char('j') | KeyCode::Down => {
            if app.focus == Focus::Document {
                app.move_down();
            } else {
                app.next_annotation();
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            if app.focus == Focus::Document {
                app.move_up();
            } else {
                app.prev_annotation();
            }
        }
        KeyCode::Char('g') => app.move_to_top(),
        KeyCode::Char('G') => app.move_to_bottom(),

        _ if app.is_block_mode() => handle_block_keys(app, code),
        _ => handle_line_keys(app, code),
    }
}

fn handle_block_keys(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char(' ') | KeyCode::Enter => app.toggle_current(),
        KeyCode::Char('c') => app.begin_comment(),
        KeyCode::Char('A') => app.approve_all(),
        KeyCode::Char('R') => app.reject_all(),
        _ => {}
    }
}

fn handle_line_keys(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Char('h') | KeyCode::Left => app.cursor.move_left(),
        KeyCode::Char('l') | KeyCode::Right => app.cursor.move_right(),
        KeyCode::Char('w') => app.cursor.move_word_forward(),
        KeyCode::Char('b') => app.cursor.move_word_back(),
        KeyCode::Char('0') | KeyCode::Home => app.cursor.move_to_line_start(),
        KeyCode::Char('$') | KeyCode::End => app.cursor.move_to_line_end(),

        // Comment navigation
        KeyCode::Char(']') => app.next_annotation(),
        KeyCode::Char('[') => app.prev_annotation(),
        KeyCode::Tab => app.toggle_focus(),

        // Selection
        KeyCode::Char('V') => app.enter_visual_mode(SelectionKind::Lines),
        KeyCode::Char('v') => app.enter_visual_mode(SelectionKind::Text),

        // Comment actions
        KeyCode::Char('c') => {
            if app.focus == Focus::Sidebar {
                app.edit_selected_annotation();
            } else {
                app.begin_comment();
            }
        }
        KeyCode::Char('e') => app.edit_selected_annotation(),
        KeyCode::Char('d') => {
            app.delete_selected_annotation();
        }
        KeyCode::Char('X') => app.clear_all(),
        _ => {}
    }
}

fn handle_visual_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.exit_visual_mode(),
        KeyCode::Char('j') | KeyCode::Down => app.cursor.move_down(),
        KeyCode::Char('k') | KeyCode::Up => app.cursor.move_up(),
        KeyCode::Char('h') | KeyCode::Left => app.cursor.move_left(),
        KeyCode::Char('l') | KeyCode::Right => app.cursor.move_right(),
        KeyCode::Char('w') => app.cursor.move_word_forward(),
        KeyCode::Char('b') => app.cursor.move_word_back(),
        KeyCode::Char('0') | KeyCode::Home => app.cursor.move_to_line_start(),
        KeyCode::Char('$') | KeyCode::End => app.cursor.move_to_line_end(),
        KeyCode::Char('c') | KeyCode::Char('a') | KeyCode::Enter => app.start_selection_comment(),
        _ => {}
    }
}

fn handle_input_mode(app: &mut App, code: KeyCode) {
    match code {
        KeyCode::Esc => app.cancel_input(),
        KeyCode::Enter => {
            app.complete_input();
        }
        KeyCode::Backspace => {
            app.input_buffer.pop();
        }
        KeyCode::Char(c) => {
            app.input_buffer.push(c);
        }
        _ => {}
    }
}

fn handle_delivery_failed(app: &mut App, code: KeyCode, transport: &dyn Transport) {
    match code {
        KeyCode::Char('r') | KeyCode::Enter => app.retry(transport),
        KeyCode::Char('a') | KeyCode::Esc | KeyCode::Char('q') => app.abandon(transport),
        _ => {}
    }
}
