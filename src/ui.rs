use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Widget, Wrap},
    Frame,
};

use crate::app::{App, PanelState};
use crate::braille::BrailleCanvas;
use crate::map::{Highlights, MapLayers};
use crate::songs::TrackSource;

const PANEL_WIDTH: u16 = 36;

/// Screen regions for one frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Screen {
    /// Quiz prompt line, only while a quiz runs
    pub prompt: Option<Rect>,
    pub map: Rect,
    /// Map area inside its border; clicks are mapped relative to this
    pub map_inner: Rect,
    pub panel: Rect,
    pub status: Rect,
}

/// Split the terminal into prompt, map, info panel and status bar
pub fn layout(area: Rect, quiz_active: bool) -> Screen {
    let prompt_height = if quiz_active { 1 } else { 0 };
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(prompt_height), // Quiz prompt
            Constraint::Min(3),                // Map + panel
            Constraint::Length(1),             // Status bar
        ])
        .split(area);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(20), Constraint::Length(PANEL_WIDTH)])
        .split(rows[1]);

    let map_block = Block::default().borders(Borders::ALL);
    Screen {
        prompt: quiz_active.then_some(rows[0]),
        map: body[0],
        map_inner: map_block.inner(body[0]),
        panel: body[1],
        status: rows[2],
    }
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let screen = layout(frame.area(), app.quiz.is_active());

    if let Some(prompt) = screen.prompt {
        render_prompt(frame, app, prompt);
    }
    render_map(frame, app, &screen);
    render_panel(frame, app, screen.panel);
    render_status_bar(frame, app, screen.status);
}

fn render_prompt(frame: &mut Frame, app: &App, area: Rect) {
    let text = match app.quiz.feedback() {
        Some(feedback) => feedback.to_string(),
        None => app
            .quiz
            .state()
            .target
            .as_ref()
            .map(|t| format!("Find: {}", t.name))
            .unwrap_or_default(),
    };
    let line = Line::from(vec![
        Span::raw(" "),
        Span::styled(text, Style::default().add_modifier(Modifier::BOLD)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn render_map(frame: &mut Frame, app: &App, screen: &Screen) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            " World Music Map ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(block, screen.map);

    let inner = screen.map_inner;
    let mut viewport = app.viewport.clone();
    viewport.resize(inner.width as usize * 2, inner.height as usize * 4);

    let highlights = Highlights {
        selected: app.quiz.selected().map(|r| r.code.as_str()),
        answer: app.quiz.revealed_code(),
    };
    let layers = app
        .map_renderer
        .render(inner.width as usize, inner.height as usize, &viewport, highlights);

    let cursor_pos = app.mouse_cell().filter(|&(cx, cy)| cx < inner.width && cy < inner.height);

    frame.render_widget(MapWidget { layers, cursor_pos }, inner);
}

/// Braille map layers with a cursor marker on top
struct MapWidget {
    layers: MapLayers,
    cursor_pos: Option<(u16, u16)>,
}

impl MapWidget {
    fn render_layer(canvas: &BrailleCanvas, color: Color, area: Rect, buf: &mut Buffer) {
        for (col, row, ch) in canvas.lit_cells() {
            if col >= area.width || row >= area.height {
                continue;
            }
            buf[(area.x + col, area.y + row)].set_char(ch).set_fg(color);
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Back to front: outlines, selection, quiz answer
        Self::render_layer(&self.layers.outlines, Color::Cyan, area, buf);
        Self::render_layer(&self.layers.selected, Color::Yellow, area, buf);
        Self::render_layer(&self.layers.answer, Color::Green, area, buf);

        if let Some((cx, cy)) = self.cursor_pos {
            buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
        }
    }
}

fn render_panel(frame: &mut Frame, app: &App, area: Rect) {
    let title = app
        .quiz
        .selected()
        .map(|r| format!(" {} ", r.name))
        .unwrap_or_else(|| " Pick a country ".to_string());
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        ));

    let label = Style::default().fg(Color::DarkGray);
    let mut lines: Vec<Line> = Vec::new();

    match &app.panel {
        PanelState::Empty => {
            lines.push(Line::from("Click a country to see a song."));
        }
        PanelState::Loading => {
            lines.push(Line::styled("Searching…", Style::default().fg(Color::Cyan)));
        }
        PanelState::Track(track) => {
            let field = |name: &'static str, value: String| {
                Line::from(vec![Span::styled(name, label), Span::raw(value)])
            };
            lines.push(field("Song:   ", track.title.clone()));
            lines.push(field("Artist: ", track.artist.clone()));
            let source = match track.source {
                TrackSource::Curated => "curated",
                TrackSource::Jamendo => "Jamendo",
            };
            lines.push(field("Source: ", source.to_string()));
            if let Some(page) = &track.share_url {
                lines.push(field("Page:   ", page.clone()));
            }
            if let Some(cover) = &track.cover_url {
                lines.push(field("Cover:  ", cover.clone()));
            }
            lines.push(Line::default());
            if track.is_playable() {
                lines.push(Line::styled(
                    "[p] 🎵 Listen now",
                    Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                ));
            } else {
                lines.push(Line::styled("No audio for this track.", label));
            }
        }
        PanelState::NotFound => {
            lines.push(Line::from("No playable track found yet."));
            lines.push(Line::styled("Add one to the song table.", label));
        }
        PanelState::Error { message, persistent } => {
            let color = if *persistent { Color::Red } else { Color::Yellow };
            lines.push(Line::styled(message.clone(), Style::default().fg(color)));
            if !*persistent {
                lines.push(Line::styled("[r] retry", label));
            }
        }
    }

    if let Some(notice) = &app.notice {
        lines.push(Line::default());
        lines.push(Line::styled(notice.clone(), Style::default().fg(Color::Magenta)));
    }

    let quiz = app.quiz.state();
    if quiz.active {
        lines.push(Line::default());
        lines.push(Line::from(vec![
            Span::styled("Question ", label),
            Span::styled(quiz.question_number.to_string(), Style::default().fg(Color::Yellow)),
            Span::styled("  Score ", label),
            Span::styled(quiz.score.to_string(), Style::default().fg(Color::Green)),
        ]));
        if app.quiz.clue().is_some() {
            lines.push(Line::styled("[p] play the clue", label));
        }
    }

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    let dim = Style::default().fg(Color::DarkGray);
    let keys = if app.quiz.is_active() {
        " | v:reveal n:next e:end p:play +/-:zoom 0:reset q:quit"
    } else {
        " | s:quiz p:play +/-:zoom 0:reset hjkl:pan q:quit"
    };

    let status = Line::from(vec![
        Span::styled(" Zoom: ", dim),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::styled(" | ", dim),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", dim),
        Span::styled(
            format!("{} countries", app.map_renderer.catalog().len()),
            Style::default().fg(Color::Magenta),
        ),
        Span::styled(keys, dim),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}
