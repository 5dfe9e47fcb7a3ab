//! Prediction and advice view.

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::domain::PredictionResult;
use crate::tui::styles::MedicalTheme;

use super::{key_hints, render_footer, render_header, spinner};

/// Where the advice request stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AdviceStatus {
    /// Waiting for the classifier or the first chunk
    #[default]
    Waiting,
    /// Text is arriving
    Streaming,
    Done,
    Failed(String),
}

/// Result view state
#[derive(Debug, Clone, Default)]
pub struct ResultState {
    pub prediction: Option<PredictionResult>,
    pub advice: String,
    pub status: AdviceStatus,
    pub scroll: u16,
}

impl ResultState {
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self.status, AdviceStatus::Waiting | AdviceStatus::Streaming)
    }

    pub fn push_chunk(&mut self, text: &str) {
        self.advice.push_str(text);
        self.status = AdviceStatus::Streaming;
    }
}

/// Render the prediction and advice
pub fn render_result(f: &mut Frame, area: Rect, state: &ResultState, tick: usize) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(7), // Prediction
            Constraint::Min(0),    // Advice
            Constraint::Length(2), // Footer
        ])
        .split(area);

    render_header(f, chunks[0], "Assessment Result", "Prediction & personalized advice");
    render_prediction(f, chunks[1], state.prediction.as_ref(), tick);
    render_advice(f, chunks[2], state, tick);

    let hints = if state.is_busy() {
        Line::from(Span::styled("Generating advice...", MedicalTheme::text_muted()))
    } else {
        key_hints(&[
            ("C", "Chat"),
            ("N", "New Assessment"),
            ("↑↓", "Scroll"),
            ("Esc", "Dashboard"),
        ])
    };
    render_footer(f, chunks[3], hints);
}

fn render_prediction(f: &mut Frame, area: Rect, prediction: Option<&PredictionResult>, tick: usize) {
    let block = Block::default()
        .title(Span::styled(" Prediction ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border_focused());

    let Some(prediction) = prediction else {
        let waiting = Paragraph::new(Line::from(vec![
            Span::styled(spinner(tick), MedicalTheme::focused()),
            Span::styled(" Running the risk model...", MedicalTheme::text_secondary()),
        ]))
        .alignment(Alignment::Center)
        .block(block);
        f.render_widget(waiting, area);
        return;
    };

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Length(3)])
        .split(inner);

    let style = MedicalTheme::status(prediction.status());
    let headline = Paragraph::new(Line::from(vec![
        Span::styled("Prediction result: ", MedicalTheme::text_secondary()),
        Span::styled(
            prediction.status().description(),
            style.add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            format!("  (confidence {:.0}%)", prediction.confidence() * 100.0),
            MedicalTheme::text_muted(),
        ),
    ]))
    .alignment(Alignment::Center);
    f.render_widget(headline, chunks[0]);

    let probability = prediction.probability().clamp(0.0, 1.0);
    let gauge = Gauge::default()
        .block(
            Block::default()
                .title(Span::styled(" Model probability ", MedicalTheme::text_secondary()))
                .borders(Borders::ALL)
                .border_style(MedicalTheme::border()),
        )
        .gauge_style(style)
        .ratio(probability)
        .label(format!("{:.1}%", probability * 100.0));
    f.render_widget(gauge, chunks[1]);
}

fn render_advice(f: &mut Frame, area: Rect, state: &ResultState, tick: usize) {
    let title = match &state.status {
        AdviceStatus::Waiting | AdviceStatus::Streaming => {
            format!(" {} Personalized Advice ", spinner(tick))
        }
        _ => " Personalized Advice ".to_string(),
    };
    let border = match state.status {
        AdviceStatus::Failed(_) => MedicalTheme::danger(),
        _ => MedicalTheme::border(),
    };
    let block = Block::default()
        .title(Span::styled(title, MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(border);

    let mut lines: Vec<Line> = state
        .advice
        .lines()
        .map(|l| Line::from(Span::styled(l, MedicalTheme::text())))
        .collect();

    match &state.status {
        AdviceStatus::Waiting if state.prediction.is_some() => lines.push(Line::from(
            Span::styled("Contacting the advice service...", MedicalTheme::text_muted()),
        )),
        AdviceStatus::Failed(message) => {
            if !lines.is_empty() {
                lines.push(Line::from(""));
            }
            lines.push(Line::from(Span::styled("! Advice unavailable", MedicalTheme::danger())));
            lines.push(Line::from(Span::styled(message.as_str(), MedicalTheme::text())));
            lines.push(Line::from(Span::styled(
                "Your previous assessment (if any) is kept.",
                MedicalTheme::text_muted(),
            )));
        }
        _ => {}
    }

    let paragraph = Paragraph::new(lines)
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((state.scroll, 0));
    f.render_widget(paragraph, area);
}
