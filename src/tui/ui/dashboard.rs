//! Dashboard view: Main overview screen.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph, Wrap},
    Frame,
};

use crate::domain::Session;
use crate::tui::styles::MedicalTheme;

use super::render_header;

/// Dashboard state for rendering.
#[derive(Debug, Clone, Default)]
pub struct DashboardState {
    pub train_rows: usize,
    pub test_rows: usize,
    pub test_accuracy: Option<f64>,
    pub provider: String,
    pub model: String,
    /// Why advice is unavailable, if it is
    pub config_error: Option<String>,
}

/// Render the main dashboard view.
pub fn render_dashboard(f: &mut Frame, area: Rect, state: &DashboardState, session: &Session) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Main content
        ])
        .split(area);

    render_header(f, chunks[0], "GlycoGuide", "Diabetes Risk & Lifestyle Advice");

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[1]);

    render_status_panels(f, columns[0], state);
    render_last_assessment(f, columns[1], session);
}

fn render_status_panels(f: &mut Frame, area: Rect, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(6), // System status
            Constraint::Length(3), // Accuracy
            Constraint::Min(0),    // Quick actions
        ])
        .margin(1)
        .split(area);

    let advice_line = match &state.config_error {
        None => Line::from(vec![
            Span::styled("  OK ", MedicalTheme::success()),
            Span::styled(
                format!("Advice: {} ({})", state.provider, state.model),
                MedicalTheme::text(),
            ),
        ]),
        Some(error) => Line::from(vec![
            Span::styled("  OFF ", MedicalTheme::warning()),
            Span::styled(error.clone(), MedicalTheme::text_secondary()),
        ]),
    };

    let status_items = vec![
        Line::from(vec![
            Span::styled("  OK ", MedicalTheme::success()),
            Span::styled("Risk model trained", MedicalTheme::text()),
        ]),
        Line::from(vec![
            Span::styled("  Rows: ", MedicalTheme::text_secondary()),
            Span::styled(
                format!("{} train / {} test", state.train_rows, state.test_rows),
                MedicalTheme::text(),
            ),
        ]),
        advice_line,
    ];

    let status_block = Block::default()
        .title(Span::styled(" System Status ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    f.render_widget(Paragraph::new(status_items).block(status_block), chunks[0]);

    let accuracy_block = Block::default()
        .title(Span::styled(" Held-out Accuracy ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    match state.test_accuracy {
        Some(accuracy) => {
            let accuracy = accuracy.clamp(0.0, 1.0);
            let gauge = Gauge::default()
                .block(accuracy_block)
                .gauge_style(MedicalTheme::gauge(accuracy))
                .ratio(accuracy)
                .label(format!("{:.1}%", accuracy * 100.0));
            f.render_widget(gauge, chunks[1]);
        }
        None => {
            let empty = Paragraph::new(Span::styled("n/a", MedicalTheme::text_muted()))
                .block(accuracy_block);
            f.render_widget(empty, chunks[1]);
        }
    }

    let actions = vec![
        Line::from(vec![
            Span::styled("[N] ", MedicalTheme::key_hint()),
            Span::styled("New Assessment", MedicalTheme::key_desc()),
        ]),
        Line::from(vec![
            Span::styled("[C] ", MedicalTheme::key_hint()),
            Span::styled("Chat", MedicalTheme::key_desc()),
        ]),
        Line::from(vec![
            Span::styled("[Q] ", MedicalTheme::key_hint()),
            Span::styled("Quit", MedicalTheme::key_desc()),
        ]),
    ];

    let actions_block = Block::default()
        .title(Span::styled(" Quick Actions ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());
    f.render_widget(Paragraph::new(actions).block(actions_block), chunks[2]);
}

fn render_last_assessment(f: &mut Frame, area: Rect, session: &Session) {
    let block = Block::default()
        .title(Span::styled(" Last Assessment ", MedicalTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::border());

    let Some(ctx) = &session.context else {
        let empty_msg = Paragraph::new(Line::from(vec![Span::styled(
            "No prediction yet. Press [N] to start.",
            MedicalTheme::text_muted(),
        )]))
        .block(block);
        f.render_widget(empty_msg, area);
        return;
    };

    let status = ctx.prediction.status();
    let exchanges = session.history.len() / 2;
    let lines = vec![
        Line::from(vec![
            Span::styled("Result: ", MedicalTheme::text_secondary()),
            Span::styled(status.description(), MedicalTheme::status(status)),
        ]),
        Line::from(vec![
            Span::styled("Probability: ", MedicalTheme::text_secondary()),
            Span::styled(
                format!("{:.1}%", ctx.prediction.probability() * 100.0),
                MedicalTheme::text(),
            ),
        ]),
        Line::from(vec![
            Span::styled("Assessed at: ", MedicalTheme::text_secondary()),
            Span::styled(
                ctx.prediction
                    .created_at()
                    .with_timezone(&chrono::Local)
                    .format("%H:%M:%S")
                    .to_string(),
                MedicalTheme::text(),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled(ctx.user_profile(), MedicalTheme::text_muted())),
        Line::from(""),
        Line::from(vec![
            Span::styled("Follow-up questions asked: ", MedicalTheme::text_secondary()),
            Span::styled(exchanges.to_string(), MedicalTheme::text()),
        ]),
    ];

    let p = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    f.render_widget(p, area);
}
