//! Assessment input form.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::domain::{
    yes_no_label, FeatureInput, FeatureVector, Field, Gender, SmokingHistory, ValidationErrors,
};
use crate::tui::styles::MedicalTheme;

use super::{key_hints, render_footer, render_header};

/// Fixed choices for a categorical field, `None` for numeric ones.
#[must_use]
pub fn choices(field: Field) -> Option<Vec<&'static str>> {
    match field {
        Field::Gender => Some(Gender::ALL.iter().map(|g| g.label()).collect()),
        Field::Hypertension | Field::HeartDisease => {
            Some(vec![yes_no_label(false), yes_no_label(true)])
        }
        Field::SmokingHistory => Some(SmokingHistory::ALL.iter().map(|s| s.label()).collect()),
        Field::Age | Field::Bmi | Field::Hba1c | Field::BloodGlucose => None,
    }
}

fn hint(field: Field) -> &'static str {
    match field {
        Field::Age => "years",
        Field::Bmi => "kg/m²",
        Field::Hba1c => "%",
        Field::BloodGlucose => "mg/dL",
        _ => "←/→ to choose",
    }
}

/// Assessment form state
#[derive(Debug, Default)]
pub struct AssessmentFormState {
    pub input: FeatureInput,
    pub selected_field: usize,
    pub errors: Option<ValidationErrors>,
}

impl AssessmentFormState {
    #[must_use]
    pub fn field(&self) -> Field {
        Field::ALL[self.selected_field]
    }

    /// Move to the next field
    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % Field::ALL.len();
    }

    /// Move to the previous field
    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = Field::ALL.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    /// Step a categorical field through its choices (no-op on numeric fields).
    pub fn cycle(&mut self, forward: bool) {
        let field = self.field();
        let Some(options) = choices(field) else {
            return;
        };
        let value = self.input.get_mut(field);
        let next = match options.iter().position(|o| o.eq_ignore_ascii_case(value)) {
            Some(i) if forward => (i + 1) % options.len(),
            Some(i) => (i + options.len() - 1) % options.len(),
            None if forward => 0,
            None => options.len() - 1,
        };
        *value = options[next].to_string();
        self.errors = None;
    }

    /// Add a character to a numeric field
    pub fn input_char(&mut self, c: char) {
        let field = self.field();
        if choices(field).is_some() {
            return;
        }
        let accepts = c.is_ascii_digit() || (c == '.' && field != Field::Age);
        if accepts {
            self.input.get_mut(field).push(c);
            self.errors = None;
        }
    }

    /// Delete the last character
    pub fn delete_char(&mut self) {
        let field = self.field();
        if choices(field).is_some() {
            self.input.get_mut(field).clear();
        } else {
            self.input.get_mut(field).pop();
        }
    }

    /// Clear the current field
    pub fn clear_field(&mut self) {
        self.input.get_mut(self.field()).clear();
    }

    /// Validate the whole form, remembering the errors for display.
    pub fn submit(&mut self) -> Option<FeatureVector> {
        match self.input.parse() {
            Ok(features) => {
                self.errors = None;
                Some(features)
            }
            Err(errors) => {
                tracing::debug!("Form rejected: {} invalid field(s)", errors.0.len());
                self.errors = Some(errors);
                None
            }
        }
    }

    /// Load a sample high-risk profile
    pub fn load_sample_data(&mut self) {
        self.input = FeatureInput {
            gender: "Male".into(),
            age: "45".into(),
            hypertension: "Yes".into(),
            heart_disease: "No".into(),
            smoking_history: "Never".into(),
            bmi: "31.2".into(),
            hba1c: "6.8".into(),
            blood_glucose: "160".into(),
        };
        self.errors = None;
    }

    fn is_invalid(&self, field: Field) -> bool {
        self.errors
            .as_ref()
            .is_some_and(|e| e.fields().contains(&field))
    }
}

/// Render the assessment form
pub fn render_assessment_form(f: &mut Frame, area: Rect, state: &AssessmentFormState) {
    let error_height = state
        .errors
        .as_ref()
        .map_or(0, |e| u16::try_from(e.0.len()).unwrap_or(u16::MAX).saturating_add(2));

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),            // Header
            Constraint::Min(0),               // Form
            Constraint::Length(error_height), // Validation errors
            Constraint::Length(2),            // Footer
        ])
        .split(area);

    render_header(f, chunks[0], "Risk Assessment", "Enter your health metrics");
    render_form_fields(f, chunks[1], state);
    if let Some(errors) = &state.errors {
        render_errors(f, chunks[2], errors);
    }
    render_footer(
        f,
        chunks[3],
        key_hints(&[
            ("↑↓", "Navigate"),
            ("←→", "Choose"),
            ("Enter", "Submit"),
            ("S", "Sample"),
            ("Esc", "Cancel"),
        ]),
    );
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &AssessmentFormState) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    let mid = Field::ALL.len().div_ceil(2);
    render_field_column(f, columns[0], state, &Field::ALL[..mid], 0);
    render_field_column(f, columns[1], state, &Field::ALL[mid..], mid);
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    state: &AssessmentFormState,
    fields: &[Field],
    offset: usize,
) {
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, &field) in fields.iter().enumerate() {
        let is_selected = offset + i == state.selected_field;
        let border_style = if state.is_invalid(field) {
            MedicalTheme::danger()
        } else if is_selected {
            MedicalTheme::border_focused()
        } else {
            MedicalTheme::border()
        };
        let title_style = if is_selected {
            MedicalTheme::focused()
        } else {
            MedicalTheme::text_secondary()
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.label()), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let value = state.input.get(field);
        let mut spans = vec![Span::raw(" ")];
        match (value.is_empty(), choices(field).is_some() && is_selected) {
            (true, _) => spans.push(Span::styled(hint(field), MedicalTheme::text_muted())),
            (false, true) => {
                spans.push(Span::styled("◀ ", MedicalTheme::key_hint()));
                spans.push(Span::styled(value, MedicalTheme::text()));
                spans.push(Span::styled(" ▶", MedicalTheme::key_hint()));
            }
            (false, false) => spans.push(Span::styled(value, MedicalTheme::text())),
        }
        if is_selected && choices(field).is_none() {
            spans.push(Span::styled("▌", MedicalTheme::cursor()));
        }

        f.render_widget(Paragraph::new(Line::from(spans)).block(block), chunks[i]);
    }
}

fn render_errors(f: &mut Frame, area: Rect, errors: &ValidationErrors) {
    let lines: Vec<Line> = errors
        .0
        .iter()
        .map(|e| {
            Line::from(vec![
                Span::styled("! ", MedicalTheme::danger()),
                Span::styled(e.to_string(), MedicalTheme::danger()),
            ])
        })
        .collect();

    let block = Block::default()
        .title(Span::styled(" Please fix ", MedicalTheme::danger()))
        .borders(Borders::ALL)
        .border_style(MedicalTheme::danger());
    f.render_widget(Paragraph::new(lines).block(block), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_categorical_both_ways() {
        let mut state = AssessmentFormState::default();
        assert_eq!(state.field(), Field::Gender);

        state.cycle(true);
        assert_eq!(state.input.gender, "Female");
        state.cycle(true);
        assert_eq!(state.input.gender, "Male");
        state.cycle(true);
        assert_eq!(state.input.gender, "Female");
        state.cycle(false);
        assert_eq!(state.input.gender, "Male");

        state.selected_field = 4;
        state.cycle(false);
        assert_eq!(state.input.smoking_history, "Not Current");
    }

    #[test]
    fn test_numeric_input_filtering() {
        let mut state = AssessmentFormState::default();
        state.selected_field = 1; // age
        for c in "4x5.".chars() {
            state.input_char(c);
        }
        assert_eq!(state.input.age, "45");

        state.next_field();
        state.next_field();
        state.next_field();
        state.next_field(); // bmi
        for c in "31.2".chars() {
            state.input_char(c);
        }
        assert_eq!(state.input.bmi, "31.2");
        state.delete_char();
        assert_eq!(state.input.bmi, "31.");

        // Typing is ignored on categorical fields.
        state.selected_field = 0;
        state.input_char('1');
        assert_eq!(state.input.gender, "");
    }

    #[test]
    fn test_navigation_wraps() {
        let mut state = AssessmentFormState::default();
        state.prev_field();
        assert_eq!(state.field(), Field::BloodGlucose);
        state.next_field();
        assert_eq!(state.field(), Field::Gender);
    }

    #[test]
    fn test_submit_empty_form_lists_every_field() {
        let mut state = AssessmentFormState::default();
        assert!(state.submit().is_none());
        let errors = state.errors.as_ref().expect("errors recorded");
        assert_eq!(errors.fields(), Field::ALL.to_vec());
    }

    #[test]
    fn test_sample_data_submits() {
        let mut state = AssessmentFormState::default();
        state.load_sample_data();
        let features = state.submit().expect("sample is valid");
        assert_eq!(features.age(), 45);
        assert!(state.errors.is_none());
    }
}
