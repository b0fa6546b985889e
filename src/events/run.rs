use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
    },
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend};
use std::io;
use tokio::sync::mpsc;
use tokio::time::{self, Duration};

use crate::app::state::{App, AppEvent, QUICK_SEARCH_DEBOUNCE, SearchMode, View};
use crate::ui::views::{draw_browse, draw_detail, draw_favorites, draw_overlay};

pub async fn run_app(app: &mut App) -> io::Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // background fetch results
    let (tx, rx) = mpsc::unbounded_channel();
    app.set_update_sender(tx);
    app.reload_listing();

    let res = run_loop(app, &mut terminal, rx).await;
    app.shutdown();

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    res
}

async fn run_loop(
    app: &mut App,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    mut rx: mpsc::UnboundedReceiver<AppEvent>,
) -> io::Result<()> {
    let mut tick = time::interval(Duration::from_millis(60));

    loop {
        terminal.draw(|f| {
            match app.view {
                View::Browse => draw_browse(f, app),
                View::Detail => draw_detail(f, app),
                View::Favorites => draw_favorites(f, app),
            }
            if app.overlay.open {
                draw_overlay(f, app);
            }
        })?;

        tokio::select! {
            _ = tick.tick() => {
                if app.overlay.open {
                    app.maybe_apply_overlay_filter(QUICK_SEARCH_DEBOUNCE);
                }
            }
            Some(ev) = rx.recv() => {
                app.handle_event(ev);
            }
            Ok(should_quit) = handle_event(app) => {
                if should_quit { break; }
            }
        }
    }
    Ok(())
}

async fn handle_event(app: &mut App) -> io::Result<bool> {
    if event::poll(std::time::Duration::from_millis(16))?
        && let Event::Key(key) = event::read()?
        && key.kind == KeyEventKind::Press
    {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            return Ok(true);
        }

        if app.overlay.open {
            handle_overlay_input(app, key);
            return Ok(false);
        }

        return Ok(match app.view {
            View::Browse => handle_browse_input(app, key),
            View::Detail => handle_detail_input(app, key),
            View::Favorites => handle_favorites_input(app, key),
        });
    }
    Ok(false)
}

/// Keys shared by both browse modes. Returns true when the key was consumed.
fn handle_browse_common(app: &mut App, key: event::KeyEvent) -> bool {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
        KeyCode::Up if ctrl => app.jump_to_top(),
        KeyCode::Down if ctrl => app.jump_to_bottom(),
        KeyCode::Up => app.move_selection(-1),
        KeyCode::Down => app.move_selection(1),
        KeyCode::PageUp => app.move_selection(-20),
        KeyCode::PageDown => app.move_selection(20),
        KeyCode::Home => app.jump_to_top(),
        KeyCode::End => app.jump_to_bottom(),
        KeyCode::Tab => app.next_category(),
        KeyCode::BackTab => app.prev_category(),
        KeyCode::Enter => app.enter_detail(),
        KeyCode::Char('f') if ctrl => app.toggle_selected_favorite(),
        KeyCode::Char('k') if ctrl => app.open_overlay(),
        KeyCode::Char('l') if ctrl => app.open_favorites(),
        KeyCode::Char('r') if ctrl => app.reload_listing(),
        _ => return false,
    }
    true
}

fn handle_browse_input(app: &mut App, key: event::KeyEvent) -> bool {
    if key.code == KeyCode::Esc {
        if app.browse.input.is_empty() {
            return true; // quit
        }
        app.on_delete();
        return false;
    }

    let navigating = matches!(
        key.code,
        KeyCode::Up | KeyCode::Down | KeyCode::PageUp | KeyCode::PageDown | KeyCode::Home | KeyCode::End
    );
    if handle_browse_common(app, key) {
        if navigating {
            app.browse.mode = SearchMode::Navigate;
        }
        return false;
    }

    match app.browse.mode {
        SearchMode::Insert => match key.code {
            KeyCode::Backspace => app.on_backspace(),
            KeyCode::Delete => app.on_delete(),
            KeyCode::Char(ch) => app.on_input(ch),
            _ => {}
        },
        SearchMode::Navigate => match key.code {
            KeyCode::Backspace => {
                app.browse.mode = SearchMode::Insert;
                app.on_backspace();
            }
            KeyCode::Delete => {
                app.browse.mode = SearchMode::Insert;
                app.on_delete();
            }
            KeyCode::Char('f') => app.toggle_selected_favorite(),
            KeyCode::Char('/') => app.open_overlay(),
            KeyCode::Char('v') => app.open_favorites(),
            KeyCode::Char('r') => app.reload_listing(),
            KeyCode::Char(ch) => {
                app.browse.mode = SearchMode::Insert;
                app.on_input(ch);
            }
            _ => {}
        },
    }
    false
}

fn handle_detail_input(app: &mut App, key: event::KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('b') => app.exit_detail(),
        KeyCode::Char('f') => app.toggle_detail_favorite(),
        KeyCode::Tab | KeyCode::BackTab => app.toggle_detail_tab(),
        KeyCode::Char('/') => app.open_overlay(),
        _ => {}
    }
    false
}

fn handle_favorites_input(app: &mut App, key: event::KeyEvent) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('b') => app.close_favorites(),
        KeyCode::Up => app.move_favorites_selection(-1),
        KeyCode::Down => app.move_favorites_selection(1),
        KeyCode::Enter => app.open_selected_favorite(),
        KeyCode::Char('d') | KeyCode::Delete => app.remove_selected_favorite(),
        KeyCode::Char('/') => app.open_overlay(),
        _ => {}
    }
    false
}

fn handle_overlay_input(app: &mut App, key: event::KeyEvent) {
    match key.code {
        KeyCode::Esc => app.close_overlay(),
        KeyCode::Up => app.move_overlay_selection(-1),
        KeyCode::Down => app.move_overlay_selection(1),
        KeyCode::Enter => app.open_overlay_selection(),
        KeyCode::Backspace => app.overlay_backspace(),
        KeyCode::Char(ch) => app.overlay_input(ch),
        _ => {}
    }
}
