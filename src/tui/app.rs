//! Main TUI application state machine.
//!
//! Handles:
//! - Screen navigation
//! - Input event handling
//! - Session hand-off after each completed request
//! - Async advice and chat via background worker

use std::io;
use std::time::Duration;

use anyhow::Result;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::gbdt::TrainingReport;
use crate::application::{Consultation, QUICK_QUESTIONS};
use crate::domain::Session;

use super::ui::{
    chat::{render_chat, ChatState},
    dashboard::{render_dashboard, DashboardState},
    form::{render_assessment_form, AssessmentFormState},
    render_disclaimer,
    result::{render_result, AdviceStatus, ResultState},
};
use super::worker::{ConsultationWorker, WorkerEvent, WorkerHandle};

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Dashboard,
    AssessmentForm,
    Result,
    Chat,
}

/// Which request the pending worker is serving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Assessment,
    Question,
}

/// Main application state
pub struct App {
    /// Current screen
    screen: Screen,

    /// Whether the app should quit
    should_quit: bool,

    /// Prediction and advice services
    consultation: Consultation,

    /// Last completed session; replaced only when a request succeeds
    session: Session,

    dashboard_state: DashboardState,
    form_state: AssessmentFormState,
    result_state: ResultState,
    chat_state: ChatState,

    /// Pending worker (if running)
    pending_worker: Option<(Job, WorkerHandle)>,

    /// Animation counter
    tick: usize,
}

impl App {
    /// Create the application around a ready consultation.
    #[must_use]
    pub fn new(consultation: Consultation, report: TrainingReport) -> Self {
        let (provider, model) = consultation
            .advice_service()
            .map(|s| (s.provider().to_string(), s.model().to_string()))
            .unwrap_or_default();
        let dashboard_state = DashboardState {
            train_rows: report.train_rows,
            test_rows: report.test_rows,
            test_accuracy: report.test_accuracy,
            provider,
            model,
            config_error: consultation.config_error().map(ToString::to_string),
        };

        Self {
            screen: Screen::Dashboard,
            should_quit: false,
            consultation,
            session: Session::new(),
            dashboard_state,
            form_state: AssessmentFormState::default(),
            result_state: ResultState::default(),
            chat_state: ChatState::default(),
            pending_worker: None,
            tick: 0,
        }
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            self.poll_worker();
            self.tick = self.tick.wrapping_add(1);

            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                let content_area = chunks[0];
                let notice = self.chat_notice();

                match self.screen {
                    Screen::Dashboard => {
                        render_dashboard(f, content_area, &self.dashboard_state, &self.session);
                    }
                    Screen::AssessmentForm => {
                        render_assessment_form(f, content_area, &self.form_state);
                    }
                    Screen::Result => {
                        render_result(f, content_area, &self.result_state, self.tick);
                    }
                    Screen::Chat => render_chat(
                        f,
                        content_area,
                        &self.chat_state,
                        &self.session,
                        notice.as_deref(),
                        self.tick,
                    ),
                }

                render_disclaimer(f, chunks[1]);
            })?;

            // Short poll keeps streamed text flowing
            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn is_busy(&self) -> bool {
        self.pending_worker.is_some()
    }

    fn chat_notice(&self) -> Option<String> {
        self.consultation
            .config_error()
            .map(|e| format!("Chat unavailable: {e}"))
    }

    /// Drain worker events into view state.
    fn poll_worker(&mut self) {
        loop {
            let Some((job, event)) = self
                .pending_worker
                .as_ref()
                .and_then(|(job, worker)| worker.try_recv().map(|e| (*job, e)))
            else {
                break;
            };

            match event {
                WorkerEvent::Predicted(prediction) => {
                    self.result_state.prediction = Some(prediction);
                }
                WorkerEvent::Chunk(text) => match job {
                    Job::Assessment => self.result_state.push_chunk(&text),
                    Job::Question => self.chat_state.streaming.push_str(&text),
                },
                WorkerEvent::AssessmentComplete {
                    session,
                    assessment,
                } => {
                    self.session = session;
                    self.result_state.prediction = Some(assessment.prediction);
                    self.result_state.advice = assessment.advice;
                    self.result_state.status = AdviceStatus::Done;
                    self.pending_worker = None;
                }
                WorkerEvent::AnswerComplete { session, .. } => {
                    self.session = session;
                    self.chat_state.finish(None);
                    self.pending_worker = None;
                }
                WorkerEvent::Failed(message) => {
                    match job {
                        Job::Assessment => self.result_state.status = AdviceStatus::Failed(message),
                        Job::Question => self.chat_state.finish(Some(message)),
                    }
                    self.pending_worker = None;
                }
            }
        }
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        // Global quit handling
        if key == KeyCode::Char('q') && modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Dashboard => self.handle_dashboard_key(key),
            Screen::AssessmentForm => self.handle_form_key(key),
            Screen::Result => self.handle_result_key(key),
            Screen::Chat => self.handle_chat_key(key),
        }
    }

    fn handle_dashboard_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('n' | 'N') => self.open_form(),
            KeyCode::Char('c' | 'C') => self.screen = Screen::Chat,
            KeyCode::Char('q' | 'Q') => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.screen = Screen::Dashboard,
            KeyCode::Up | KeyCode::BackTab => self.form_state.prev_field(),
            KeyCode::Down | KeyCode::Tab => self.form_state.next_field(),
            KeyCode::Left => self.form_state.cycle(false),
            KeyCode::Right => self.form_state.cycle(true),
            KeyCode::Char('s' | 'S') => self.form_state.load_sample_data(),
            KeyCode::Char(c) => self.form_state.input_char(c),
            KeyCode::Backspace => self.form_state.delete_char(),
            KeyCode::Delete => self.form_state.clear_field(),
            KeyCode::Enter => self.submit_form(),
            _ => {}
        }
    }

    fn handle_result_key(&mut self, key: KeyCode) {
        if self.result_state.is_busy() {
            return;
        }
        match key {
            KeyCode::Esc | KeyCode::Enter => self.screen = Screen::Dashboard,
            KeyCode::Char('c' | 'C') => self.screen = Screen::Chat,
            KeyCode::Char('n' | 'N') => self.open_form(),
            KeyCode::Up => self.result_state.scroll = self.result_state.scroll.saturating_sub(1),
            KeyCode::Down => self.result_state.scroll = self.result_state.scroll.saturating_add(1),
            _ => {}
        }
    }

    fn handle_chat_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => self.screen = Screen::Dashboard,
            KeyCode::PageUp => self.chat_state.scroll_up(),
            KeyCode::PageDown => self.chat_state.scroll_down(),
            KeyCode::Enter => {
                if self.send_question(self.chat_state.input.clone()) {
                    self.chat_state.input.clear();
                }
            }
            KeyCode::F(n @ 1..=5) => {
                self.send_question(QUICK_QUESTIONS[usize::from(n) - 1].to_string());
            }
            KeyCode::Backspace => {
                self.chat_state.input.pop();
            }
            KeyCode::Char(c) => self.chat_state.input_char(c),
            _ => {}
        }
    }

    fn open_form(&mut self) {
        self.form_state.selected_field = 0;
        self.form_state.errors = None;
        self.screen = Screen::AssessmentForm;
    }

    fn submit_form(&mut self) {
        if self.is_busy() {
            return;
        }
        let Some(features) = self.form_state.submit() else {
            return;
        };

        self.result_state = ResultState::default();
        self.screen = Screen::Result;
        let worker = ConsultationWorker::spawn_assessment(
            self.consultation.clone(),
            self.session.clone(),
            features,
        );
        self.pending_worker = Some((Job::Assessment, worker));
    }

    /// Dispatch a follow-up question; `false` when it was not sent.
    fn send_question(&mut self, question: String) -> bool {
        if self.is_busy() || self.consultation.config_error().is_some() {
            return false;
        }
        let question = question.trim().to_string();
        if question.is_empty() {
            return false;
        }

        let question = self.chat_state.begin(question);
        let worker =
            ConsultationWorker::spawn_question(self.consultation.clone(), self.session.clone(), question);
        self.pending_worker = Some((Job::Question, worker));
        true
    }
}
