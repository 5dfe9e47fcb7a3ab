//! Follow-up chat view.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::application::QUICK_QUESTIONS;
use crate::domain::{Role, Session};
use crate::tui::styles::MedicalTheme;

use super::{key_hints, render_footer, render_header, spinner};

/// Chat view state
#[derive(Debug, Clone, Default)]
pub struct ChatState {
    pub input: String,
    /// Question currently being answered
    pub pending_question: Option<String>,
    /// Answer text received so far for the pending question
    pub streaming: String,
    pub error: Option<String>,
    /// Lines scrolled up from the bottom of the transcript
    pub scroll_back: u16,
}

impl ChatState {
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.pending_question.is_some()
    }

    pub fn input_char(&mut self, c: char) {
        if !c.is_control() {
            self.input.push(c);
        }
    }

    /// Start answering `question`; returns it for dispatch.
    pub fn begin(&mut self, question: String) -> String {
        self.pending_question = Some(question.clone());
        self.streaming.clear();
        self.error = None;
        self.scroll_back = 0;
        question
    }

    /// Finish the pending question, successfully or not.
    pub fn finish(&mut self, error: Option<String>) {
        self.pending_question = None;
        self.streaming.clear();
        self.error = error;
    }

    pub fn scroll_up(&mut self) {
        self.scroll_back = self.scroll_back.saturating_add(3);
    }

    pub fn scroll_down(&mut self) {
        self.scroll_back = self.scroll_back.saturating_sub(3);
    }
}

/// Render the chat transcript, quick questions and input line.
pub fn render_chat(
    f: &mut Frame,
    area: Rect,
    state: &ChatState,
    session: &Session,
    notice: Option<&str>,
    tick: usize,
) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(5),    // Transcript
            Constraint::Length(7), // Quick questions
            Constraint::Length(3), // Input
            Constraint::Length(2), // Footer
        ])
        .split(area);

    let subtitle = match &session.context {
        Some(ctx) => format!("Grounded on: {}", ctx.prediction.status().description()),
        None => "No assessment yet; answers are general".to_string(),
    };
    render_header(f, chunks[0], "Health Assistant", &subtitle);
    render_transcript(f, chunks[1], state, session, tick);
    render_quick_questions(f, chunks[2]);
    render_input(f, chunks[3], state, notice);
    render_footer(
        f,
        chunks[4],
        key_hints(&[
            ("Enter", "Send"),
            ("F1-F5", "Quick question"),
            ("PgUp/PgDn", "Scroll"),
            ("Esc", "Back"),
        ]),
    );
}

fn message_lines<'a>(lines: &mut Vec<Line<'a>>, who: &'a str, style: Style, content: &'a str) {
    lines.push(Line::from(Span::styled(who, style)));
    lines.extend(
        content
            .lines()
            .map(|l| Line::from(Span::styled(l, MedicalTheme::text()))),
    );
    lines.push(Line::from(""));
}

fn render_transcript(f: &mut Frame, area: Rect, state: &ChatState, session: &Session, tick: usize) {
    let block = Block::default()
        .title(Span::styled(" Conversation ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    let inner = block.inner(area);

    let mut lines: Vec<Line> = Vec::new();
    for message in &session.history {
        let (who, style) = match message.role {
            Role::User => ("You", MedicalTheme::key_hint()),
            Role::Assistant => ("Assistant", MedicalTheme::subtitle()),
            Role::System => continue,
        };
        message_lines(&mut lines, who, style, &message.content);
    }

    if let Some(question) = &state.pending_question {
        message_lines(&mut lines, "You", MedicalTheme::key_hint(), question);
        lines.push(Line::from(vec![
            Span::styled("Assistant ", MedicalTheme::subtitle()),
            Span::styled(spinner(tick), MedicalTheme::focused()),
        ]));
        lines.extend(
            state
                .streaming
                .lines()
                .map(|l| Line::from(Span::styled(l, MedicalTheme::text()))),
        );
    }

    if let Some(error) = &state.error {
        lines.push(Line::from(Span::styled(
            format!("! {error}"),
            MedicalTheme::danger(),
        )));
    }

    if lines.is_empty() {
        lines.push(Line::from(Span::styled(
            "Ask anything about diabetes, diet or lifestyle.",
            MedicalTheme::text_muted(),
        )));
    }

    let total = wrapped_height(&lines, inner.width);
    let bottom = total.saturating_sub(inner.height);
    let offset = bottom.saturating_sub(state.scroll_back);

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((offset, 0));
    f.render_widget(paragraph, area);
}

/// Rows needed to show `lines` wrapped at `width` (character-based estimate).
fn wrapped_height(lines: &[Line], width: u16) -> u16 {
    let width = usize::from(width.max(1));
    let rows: usize = lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum();
    u16::try_from(rows).unwrap_or(u16::MAX)
}

fn render_quick_questions(f: &mut Frame, area: Rect) {
    let lines: Vec<Line> = QUICK_QUESTIONS
        .iter()
        .enumerate()
        .map(|(i, q)| {
            Line::from(vec![
                Span::styled(format!("[F{}] ", i + 1), MedicalTheme::key_hint()),
                Span::styled(*q, MedicalTheme::key_desc()),
            ])
        })
        .collect();

    let block = Block::default()
        .title(Span::styled(" Quick questions ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_input(f: &mut Frame, area: Rect, state: &ChatState, notice: Option<&str>) {
    let block = Block::default()
        .title(Span::styled(" Your question ", MedicalTheme::focused()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border_focused());

    let content = if let Some(notice) = notice {
        Line::from(Span::styled(notice.to_string(), MedicalTheme::warning()))
    } else if state.input.is_empty() && !state.is_busy() {
        Line::from(vec![
            Span::styled("Type a question...", MedicalTheme::text_muted()),
            Span::styled("▌", MedicalTheme::cursor()),
        ])
    } else {
        Line::from(vec![
            Span::styled(state.input.clone(), MedicalTheme::text()),
            Span::styled("▌", MedicalTheme::cursor()),
        ])
    };

    f.render_widget(Paragraph::new(content).block(block), area);
}
