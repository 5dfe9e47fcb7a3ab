//! Background worker for advice and chat requests.
//!
//! Network calls to the text-generation service run on a short-lived thread
//! so the TUI main loop keeps redrawing (spinner, streamed text) while it
//! waits. Progress comes back over an mpsc channel.

use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};
use std::thread::{self, JoinHandle};

use crate::application::{Assessment, Consultation, Progress};
use crate::domain::{FeatureVector, PredictionResult, Session};

/// Updates sent from the worker to the UI.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// Classifier result is ready; advice is being requested
    Predicted(PredictionResult),
    /// Next piece of streamed text
    Chunk(String),
    /// Assessment finished; carries the next session
    AssessmentComplete {
        session: Session,
        assessment: Assessment,
    },
    /// Follow-up answer finished; carries the next session
    AnswerComplete { session: Session, answer: String },
    /// Request failed; the UI keeps its current session
    Failed(String),
}

/// Handle to a running worker.
pub struct WorkerHandle {
    events: Receiver<WorkerEvent>,
    _handle: JoinHandle<()>,
}

impl WorkerHandle {
    /// Try to receive the next event (non-blocking).
    ///
    /// A worker that exits without a final event (it panicked) is reported
    /// as [`WorkerEvent::Failed`].
    #[must_use]
    pub fn try_recv(&self) -> Option<WorkerEvent> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                tracing::error!("Worker thread exited without a result");
                Some(WorkerEvent::Failed("worker stopped unexpectedly".to_string()))
            }
        }
    }
}

/// Spawns consultation requests off the UI thread.
pub struct ConsultationWorker;

impl ConsultationWorker {
    /// Predict and fetch advice for `features`.
    pub fn spawn_assessment(
        consultation: Consultation,
        session: Session,
        features: FeatureVector,
    ) -> WorkerHandle {
        Self::spawn(move |tx| {
            let result = consultation.assess(&session, &features, &mut |progress| {
                let event = match progress {
                    Progress::Predicted(prediction) => WorkerEvent::Predicted(prediction),
                    Progress::Chunk(text) => WorkerEvent::Chunk(text.to_string()),
                };
                let _ = tx.send(event);
            });

            let event = match result {
                Ok((session, assessment)) => WorkerEvent::AssessmentComplete {
                    session,
                    assessment,
                },
                Err(e) => {
                    tracing::warn!("Assessment failed: {}", e);
                    WorkerEvent::Failed(e.to_string())
                }
            };
            let _ = tx.send(event);
        })
    }

    /// Ask one follow-up question.
    pub fn spawn_question(
        consultation: Consultation,
        session: Session,
        question: String,
    ) -> WorkerHandle {
        Self::spawn(move |tx| {
            let result = consultation.ask(&session, &question, &mut |text| {
                let _ = tx.send(WorkerEvent::Chunk(text.to_string()));
            });

            let event = match result {
                Ok((session, answer)) => WorkerEvent::AnswerComplete { session, answer },
                Err(e) => {
                    tracing::warn!("Follow-up failed: {}", e);
                    WorkerEvent::Failed(e.to_string())
                }
            };
            let _ = tx.send(event);
        })
    }

    fn spawn<F>(job: F) -> WorkerHandle
    where
        F: FnOnce(Sender<WorkerEvent>) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let handle = thread::spawn(move || job(tx));
        WorkerHandle {
            events: rx,
            _handle: handle,
        }
    }
}
