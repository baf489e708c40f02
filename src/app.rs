use crate::audio::{AudioEngine, SilentAudioEngine, RodioAudioEngine};
use crate::cover::CoverArtWorker;
use crate::model::Settings;
use crate::player::Player;
use crate::ui::{self, ScreenLayout};
use anyhow::Result;
use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
    KeyModifiers, MouseButton, MouseEvent, MouseEventKind,
};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;
use ratatui::widgets::ListState;
use std::io::stdout;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

pub fn run(settings: Settings) -> Result<()> {
    let mut player = Player::from_settings(settings);

    let mut audio: Box<dyn AudioEngine> = match RodioAudioEngine::new() {
        Ok(engine) => Box::new(engine),
        Err(err) => {
            tracing::warn!(error = %format!("{err:#}"), "no audio output, using silent engine");
            Box::new(SilentAudioEngine::new())
        }
    };
    audio.set_volume(player.settings.volume);

    let covers = CoverArtWorker::start();
    player.request_covers(&covers);

    enable_raw_mode()?;
    let mut out = stdout();
    execute!(out, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(out);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut search_mode = false;
    let mut last_tick = Instant::now();
    let mut layout = ScreenLayout::default();
    let mut list_state = ListState::default();

    let result: Result<()> = loop {
        for cover in covers.try_events() {
            player.apply_cover_event(cover);
        }
        maybe_handle_track_end(&mut player, &mut *audio);

        if player.dirty || last_tick.elapsed() > Duration::from_millis(250) {
            terminal.draw(|frame| {
                layout = ui::draw(frame, &player, &*audio, search_mode, &mut list_state);
            })?;
            player.dirty = false;
            last_tick = Instant::now();
        }

        if !event::poll(Duration::from_millis(33))? {
            continue;
        }

        match event::read()? {
            Event::Mouse(mouse) => {
                handle_mouse(&mut player, &mut *audio, mouse, &layout, list_state.offset());
            }
            Event::Key(key) if key.kind == KeyEventKind::Press => {
                if handle_key(&mut player, &mut *audio, &mut search_mode, key) == Flow::Quit {
                    break Ok(());
                }
            }
            Event::Resize(_, _) => player.dirty = true,
            _ => {}
        }
    };

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;
    audio.stop();
    result
}

fn maybe_handle_track_end(player: &mut Player, audio: &mut dyn AudioEngine) {
    if audio.current_track().is_none() || audio.is_paused() || !audio.is_finished() {
        return;
    }
    player.handle_track_ended(audio);
}

fn handle_key(
    player: &mut Player,
    audio: &mut dyn AudioEngine,
    search_mode: &mut bool,
    key: KeyEvent,
) -> Flow {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Flow::Quit;
    }

    if *search_mode {
        match key.code {
            KeyCode::Esc => {
                *search_mode = false;
                player.clear_search();
            }
            KeyCode::Enter => {
                *search_mode = false;
                player.dirty = true;
            }
            KeyCode::Backspace => player.pop_search_char(),
            KeyCode::Down => player.select_next_row(),
            KeyCode::Up => player.select_prev_row(),
            KeyCode::Char(ch) => player.push_search_char(ch),
            _ => {}
        }
        return Flow::Continue;
    }

    match key.code {
        KeyCode::Char('q') => return Flow::Quit,
        KeyCode::Down => player.select_next_row(),
        KeyCode::Up => player.select_prev_row(),
        KeyCode::Enter => player.activate_selected(audio),
        KeyCode::Char(' ') => player.toggle_play(audio),
        KeyCode::Char('n') => player.next(audio),
        KeyCode::Char('p') => player.previous(audio),
        KeyCode::Char('s') => player.toggle_shuffle(),
        KeyCode::Char('l') => player.toggle_loop(),
        KeyCode::Right => player.seek_relative(true, audio),
        KeyCode::Left => player.seek_relative(false, audio),
        KeyCode::Char('+') | KeyCode::Char('=') => player.adjust_volume(true, audio),
        KeyCode::Char('-') => player.adjust_volume(false, audio),
        KeyCode::Char('/') => {
            *search_mode = true;
            player.dirty = true;
        }
        KeyCode::Esc if !player.search.is_empty() => player.clear_search(),
        _ => {}
    }
    Flow::Continue
}

fn handle_mouse(
    player: &mut Player,
    audio: &mut dyn AudioEngine,
    mouse: MouseEvent,
    layout: &ScreenLayout,
    list_offset: usize,
) {
    match mouse.kind {
        MouseEventKind::Down(MouseButton::Left) => {
            if let Some(row) = ui::list_row_at(layout, list_offset, mouse.column, mouse.row) {
                player.activate_row(row, audio);
            } else if let Some(fraction) =
                ui::progress_fraction_at(layout, mouse.column, mouse.row)
            {
                player.seek_fraction(fraction, audio);
            }
        }
        MouseEventKind::ScrollDown => player.select_next_row(),
        MouseEventKind::ScrollUp => player.select_prev_row(),
        _ => {}
    }
}
