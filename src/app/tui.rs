use std::io;
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::execute;
use crossterm::terminal::{
    EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode,
};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Alignment, Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{
    Block, BorderType, Borders, Cell, Clear, Padding, Paragraph, Row, Table, TableState, Wrap,
};
use ratatui::{Frame, Terminal};

use crate::store::{SavedEntry, StateStore};

use super::format::{
    format_last_opened_display, format_position, format_position_with_mode, format_rate,
    short_identity, truncate,
};
use super::play_and_record;

#[derive(Debug, Clone)]
struct PendingForget {
    identity: String,
    title: String,
}

pub(crate) fn run_tui(store: &StateStore) -> Result<()> {
    let mut session = TuiSession::enter()?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))
        .context("failed to initialize terminal backend")?;
    terminal.clear()?;

    let mut items = store.list()?;
    let mut table_state = TableState::default();
    table_state.select((!items.is_empty()).then_some(0));
    let mut pending_forget = None::<PendingForget>;
    let mut status = if items.is_empty() {
        status_info("No saved positions yet. Run `vidmark play <file>` to add one.")
    } else {
        status_info("Ready.")
    };

    loop {
        terminal.draw(|frame| {
            draw_tui(
                frame,
                &items,
                &mut table_state,
                &status,
                pending_forget.as_ref(),
            )
        })?;

        if !event::poll(Duration::from_millis(200))? {
            continue;
        }

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(dialog) = pending_forget.as_ref() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => {
                    let forgetting_identity = dialog.identity.clone();
                    let forgetting_title = dialog.title.clone();
                    pending_forget = None;
                    let key = crate::identity::ContentIdentity::from_stored_key(
                        forgetting_identity.clone(),
                    );
                    match store.delete(&key) {
                        Ok(true) => {
                            status =
                                status_info(&format!("Forgot saved position: {forgetting_title}"));
                            refresh_items(store, &mut items, &mut table_state, None)?;
                        }
                        Ok(false) => {
                            status = status_error("Forget failed: entry no longer exists.");
                            refresh_items(store, &mut items, &mut table_state, None)?;
                        }
                        Err(err) => status = status_error(&format!("Forget failed: {err}")),
                    }
                }
                KeyCode::Esc | KeyCode::Char('n') => {
                    pending_forget = None;
                    status = status_info("Forget canceled.");
                }
                _ => {}
            }
            continue;
        }

        match key.code {
            KeyCode::Char('q') => break,
            KeyCode::Up => {
                if let Some(selected) = table_state.selected() {
                    table_state.select(Some(selected.saturating_sub(1)));
                }
            }
            KeyCode::Down => {
                if let Some(selected) = table_state.selected()
                    && !items.is_empty()
                {
                    let next = (selected + 1).min(items.len().saturating_sub(1));
                    table_state.select(Some(next));
                }
            }
            KeyCode::Char('t') => {
                let Some(entry) = table_state.selected().and_then(|idx| items.get(idx)) else {
                    status = status_error("Toggle failed: no entry selected.");
                    continue;
                };
                // Flipping the indicator is a display tweak; recency stays put.
                let mut record = entry.record.clone();
                record.display_mode = record.display_mode.toggled();
                let identity = entry.identity.clone();
                match store.save(&identity, &record) {
                    Ok(()) => {
                        status = status_info(&format!(
                            "Time indicator now shows {} time.",
                            record.display_mode.label()
                        ));
                        refresh_items(store, &mut items, &mut table_state, Some(identity.as_str()))?;
                    }
                    Err(err) => status = status_error(&format!("Toggle failed: {err}")),
                }
            }
            KeyCode::Char('d') => {
                let Some(selected) = table_state.selected() else {
                    status = status_error("Forget failed: no entry selected.");
                    continue;
                };
                if selected >= items.len() {
                    status = status_error("Forget failed: invalid selection.");
                    continue;
                }
                let selected_item = &items[selected];
                pending_forget = Some(PendingForget {
                    identity: selected_item.identity.as_str().to_string(),
                    title: entry_title(selected_item),
                });
                status = status_info("Confirm forget: y/Enter to forget, n/Esc to cancel.");
            }
            KeyCode::Enter => {
                let Some(selected) = table_state.selected() else {
                    continue;
                };
                if selected >= items.len() {
                    continue;
                }
                let selected_item = &items[selected];
                let Some(path) = selected_item.record.path.clone() else {
                    status = status_error("Resume failed: no known path for this entry.");
                    continue;
                };
                let selected_identity = selected_item.identity.as_str().to_string();
                let selected_title = entry_title(selected_item);

                session.suspend()?;
                let result = play_and_record(store, &path);
                session.resume()?;
                terminal.clear()?;

                match result {
                    Ok(msg) => status = status_info(&msg),
                    Err(err) => {
                        status =
                            status_error(&format!("Resume failed for {selected_title}: {err}"))
                    }
                }

                refresh_items(store, &mut items, &mut table_state, Some(&selected_identity))?;
            }
            _ => {}
        }
    }

    terminal.show_cursor()?;
    session.leave()?;
    Ok(())
}

fn entry_title(entry: &SavedEntry) -> String {
    entry
        .record
        .title
        .clone()
        .unwrap_or_else(|| short_identity(&entry.identity))
}

fn draw_tui(
    frame: &mut Frame,
    items: &[SavedEntry],
    table_state: &mut TableState,
    status: &str,
    pending_forget: Option<&PendingForget>,
) {
    let bg = Block::default().style(Style::default().bg(Color::Black));
    frame.render_widget(bg, frame.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let selected_idx = table_state.selected().map(|i| i + 1).unwrap_or(0);
    let selected_text = if selected_idx == 0 {
        "-".to_string()
    } else {
        selected_idx.to_string()
    };
    let header = Paragraph::new(Line::from(vec![
        Span::styled(
            "VIDMARK",
            Style::default()
                .fg(Color::Rgb(110, 170, 255))
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("{} saved positions", items.len()),
            Style::default().fg(Color::Rgb(185, 195, 210)),
        ),
        Span::styled("   ", Style::default()),
        Span::styled(
            format!("selected {selected_text}"),
            Style::default().fg(Color::Rgb(185, 195, 210)),
        ),
    ]))
    .alignment(Alignment::Center)
    .block(panel_block("Dashboard"));
    frame.render_widget(header, chunks[0]);

    let body_chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(64), Constraint::Percentage(36)])
        .split(chunks[1]);

    let rows: Vec<Row> = items
        .iter()
        .map(|entry| {
            let record = &entry.record;
            Row::new(vec![
                Cell::from(entry_title(entry)),
                Cell::from(format_position_with_mode(
                    record.position_seconds,
                    record.display_mode,
                )),
                Cell::from(format_rate(record.playback_rate)),
                Cell::from(format_last_opened_display(record.last_opened_at_ms)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Percentage(48),
            Constraint::Length(16),
            Constraint::Length(8),
            Constraint::Length(18),
        ],
    )
    .header(
        Row::new(vec!["Title", "Position", "Speed", "Last Opened"]).style(
            Style::default()
                .fg(Color::Rgb(110, 170, 255))
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(panel_block("Library"))
    .row_highlight_style(
        Style::default()
            .bg(Color::Rgb(110, 170, 255))
            .fg(Color::Black)
            .add_modifier(Modifier::BOLD),
    )
    .highlight_symbol("▸ ");
    frame.render_stateful_widget(table, body_chunks[0], table_state);

    let selection_text = match table_state.selected().and_then(|idx| items.get(idx)) {
        Some(entry) => {
            let record = &entry.record;
            let path_text = record
                .path
                .as_ref()
                .map(|path| truncate(&path.display().to_string(), 40))
                .unwrap_or_else(|| "-".to_string());
            format!(
                "Title\n{}\n\nPosition\n{} at {}\n\nIndicator\n{}\n\nLast Opened\n{}\n\nPath\n{}\n\nContent ID\n{}",
                truncate(&entry_title(entry), 40),
                format_position(record.position_seconds),
                format_rate(record.playback_rate),
                record.display_mode.label(),
                format_last_opened_display(record.last_opened_at_ms),
                path_text,
                short_identity(&entry.identity),
            )
        }
        None => "No saved positions yet.\n\nRun `vidmark play <file>` to add one.".to_string(),
    };
    let selection = Paragraph::new(selection_text)
        .style(Style::default().fg(Color::Rgb(230, 230, 230)))
        .block(panel_block("Selected"))
        .alignment(Alignment::Left);
    frame.render_widget(selection, body_chunks[1]);

    let command_bar = Paragraph::new(Line::from(Span::styled(
        "↑/↓ move  Enter resume  t indicator  d forget  q quit",
        Style::default().fg(Color::Rgb(185, 195, 210)),
    )))
    .alignment(Alignment::Center)
    .block(panel_block("Controls"));
    frame.render_widget(command_bar, chunks[2]);

    let status_widget = Paragraph::new(status.to_string())
        .style(status_style(status))
        .block(panel_block("Status"));
    frame.render_widget(status_widget, chunks[3]);

    if let Some(confirm) = pending_forget {
        let popup_text = format!(
            "Forget saved position?\n\n{}\n\nThis cannot be undone.\n\n[y / Enter] Forget   [n / Esc] Cancel",
            truncate(&confirm.title, 56)
        );
        let popup_area = popup_rect_for_text(frame.area(), &popup_text);
        render_popup_shadow(frame, popup_area);
        frame.render_widget(Clear, popup_area);
        let popup = Paragraph::new(popup_text)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true })
            .block(modal_block("Confirm Forget"));
        frame.render_widget(popup, popup_area);
    }
}

fn panel_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::Rgb(125, 135, 150)))
        .title(title)
}

fn modal_block(title: &'static str) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(
            Style::default()
                .fg(Color::Rgb(160, 190, 235))
                .add_modifier(Modifier::BOLD),
        )
        .title(title)
        .padding(Padding::new(2, 2, 1, 1))
}

fn status_style(status: &str) -> Style {
    if status.starts_with("ERROR:") {
        Style::default()
            .fg(Color::Rgb(255, 145, 120))
            .add_modifier(Modifier::BOLD)
    } else if status.starts_with("INFO:") {
        Style::default().fg(Color::Rgb(205, 165, 255))
    } else {
        Style::default().fg(Color::Rgb(230, 235, 242))
    }
}

fn centered_fixed_rect(width: u16, height: u16, area: Rect) -> Rect {
    let clamped_width = width.min(area.width.max(1));
    let clamped_height = height.min(area.height.max(1));
    let x = area.x + area.width.saturating_sub(clamped_width) / 2;
    let y = area.y + area.height.saturating_sub(clamped_height) / 2;
    Rect::new(x, y, clamped_width, clamped_height)
}

fn render_popup_shadow(frame: &mut Frame, popup_area: Rect) {
    let area = frame.area();
    let shadow = Rect::new(
        (popup_area.x + 1).min(area.x + area.width.saturating_sub(1)),
        (popup_area.y + 1).min(area.y + area.height.saturating_sub(1)),
        popup_area.width.saturating_sub(1),
        popup_area.height.saturating_sub(1),
    );
    if shadow.width == 0 || shadow.height == 0 {
        return;
    }
    let shadow_block = Block::default().style(Style::default().bg(Color::Rgb(14, 16, 24)));
    frame.render_widget(shadow_block, shadow);
}

fn popup_rect_for_text(area: Rect, text: &str) -> Rect {
    let max_line_width = text
        .lines()
        .map(|line| line.chars().count() as u16)
        .max()
        .unwrap_or(0);
    let line_count = text.lines().count() as u16;

    let available_width = area.width.saturating_sub(2).max(1);
    let min_width = 48.min(available_width);
    let max_width = 72.min(available_width);
    let desired_width = max_line_width.saturating_add(12);
    let width = desired_width.clamp(min_width, max_width);

    let available_height = area.height.saturating_sub(2).max(1);
    let min_height = 10.min(available_height);
    let max_height = 18.min(available_height);
    let desired_height = line_count.saturating_add(6);
    let height = desired_height.clamp(min_height, max_height);

    centered_fixed_rect(width, height, area)
}

fn refresh_items(
    store: &StateStore,
    items: &mut Vec<SavedEntry>,
    table_state: &mut TableState,
    preferred_identity: Option<&str>,
) -> Result<()> {
    *items = store.list()?;
    if items.is_empty() {
        table_state.select(None);
        return Ok(());
    }

    if let Some(identity) = preferred_identity
        && let Some(idx) = items
            .iter()
            .position(|entry| entry.identity.as_str() == identity)
    {
        table_state.select(Some(idx));
        return Ok(());
    }

    match table_state.selected() {
        Some(selected) => table_state.select(Some(selected.min(items.len() - 1))),
        None => table_state.select(Some(0)),
    }
    Ok(())
}

fn status_info(msg: &str) -> String {
    format!("INFO: {msg}")
}

fn status_error(msg: &str) -> String {
    format!("ERROR: {msg}")
}

struct TuiSession {
    active: bool,
}

impl TuiSession {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("failed to enable raw mode")?;
        execute!(io::stdout(), EnterAlternateScreen).context("failed to enter alternate screen")?;
        Ok(Self { active: true })
    }

    fn suspend(&mut self) -> Result<()> {
        if !self.active {
            return Ok(());
        }
        disable_raw_mode().context("failed to disable raw mode")?;
        execute!(io::stdout(), LeaveAlternateScreen).context("failed to leave alternate screen")?;
        self.active = false;
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        if self.active {
            return Ok(());
        }
        execute!(io::stdout(), EnterAlternateScreen)
            .context("failed to re-enter alternate screen")?;
        enable_raw_mode().context("failed to re-enable raw mode")?;
        self.active = true;
        Ok(())
    }

    fn leave(&mut self) -> Result<()> {
        self.suspend()
    }
}

impl Drop for TuiSession {
    fn drop(&mut self) {
        if self.active {
            let _ = disable_raw_mode();
            let _ = execute!(io::stdout(), LeaveAlternateScreen);
        }
    }
}
