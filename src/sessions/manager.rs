//! The session registry and both execution modes.

use miette::Diagnostic;
use rustc_hash::FxHashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use uuid::Uuid;

use super::session::{ProgressReport, WorkflowSession};
use crate::compiler::{BarrierTable, CompileError};
use crate::engine::{EngineError, Traversal};
use crate::events::{Event, EventHub, EventStream, NullEmitter};
use crate::model::{FileUnit, Payload};
use crate::operations::Operation;
use crate::transform::Transformer;

/// Registry of live and finished sessions, shared with background drains.
type SessionRegistry = Arc<Mutex<FxHashMap<Uuid, WorkflowSession>>>;

/// Failures surfaced by the session manager.
#[derive(Debug, Error, Diagnostic)]
pub enum WorkflowError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Engine(#[from] EngineError),

    #[error("workflow session not found: {id}")]
    #[diagnostic(
        code(paperflow::sessions::not_found),
        help("The id is unknown, or its result has already been fetched.")
    )]
    SessionNotFound { id: Uuid },

    #[error("a workflow session with id {id} already exists")]
    #[diagnostic(code(paperflow::sessions::duplicate_id))]
    DuplicateSession { id: Uuid },

    #[error("{what} is not implemented")]
    #[diagnostic(code(paperflow::sessions::not_implemented))]
    NotImplemented { what: &'static str },
}

/// Outcome of asking for a session's result.
#[derive(Debug)]
pub enum ResultFetch {
    /// Still running; retry later or wait for the progress stream to end.
    NotReady,
    /// Single output, served and consumed; the session is gone.
    Single(FileUnit),
    /// Finished with several outputs; bundling is an unimplemented gap and
    /// the session is kept.
    MultiOutputUnsupported { count: usize },
    /// The run failed; the message is served once and the session deleted.
    Failed(String),
}

/// Owns every in-flight and completed workflow in the process.
///
/// All registry access goes through one mutex, never held across an await.
/// Distinct workflows share nothing but the collaborator.
pub struct SessionManager {
    transformer: Arc<dyn Transformer>,
    sessions: SessionRegistry,
}

impl SessionManager {
    pub fn new(transformer: Arc<dyn Transformer>) -> Arc<Self> {
        Arc::new(Self {
            transformer,
            sessions: Arc::new(Mutex::new(FxHashMap::default())),
        })
    }

    /// Blocking execution mode: compile, drain the engine inline, and hand
    /// the caller the flat output list. No session is created.
    #[tracing::instrument(skip_all, fields(roots = operations.len(), files = files.len()), err)]
    pub async fn run_sync(
        &self,
        operations: &[Operation],
        files: Vec<FileUnit>,
    ) -> Result<Vec<FileUnit>, WorkflowError> {
        let mut barriers = BarrierTable::compile(operations)?;
        let traversal = Traversal::new(self.transformer.as_ref(), &mut barriers, &NullEmitter);
        let outputs = traversal
            .run(operations, Payload::from_inputs(files))
            .await?;
        Ok(outputs)
    }

    /// Background execution mode: register a session and return its id
    /// immediately while a spawned task drains the engine.
    ///
    /// Compilation happens before the session exists, so configuration
    /// errors fail the submission itself rather than a run nobody is
    /// watching yet.
    #[tracing::instrument(skip_all, fields(roots = operations.len(), files = files.len()), err)]
    pub fn submit(
        &self,
        operations: Vec<Operation>,
        files: Vec<FileUnit>,
        requested_id: Option<Uuid>,
    ) -> Result<Uuid, WorkflowError> {
        let barriers = BarrierTable::compile(&operations)?;

        let id = requested_id.unwrap_or_else(Uuid::new_v4);
        let hub = EventHub::with_default_capacity();
        {
            let mut sessions = self.sessions.lock().expect("session registry poisoned");
            if sessions.contains_key(&id) {
                return Err(WorkflowError::DuplicateSession { id });
            }
            sessions.insert(id, WorkflowSession::new(id, Arc::clone(&hub)));
        }

        tracing::info!(workflow = %id, "workflow session created");
        tokio::spawn(drain(
            Arc::clone(&self.transformer),
            Arc::clone(&self.sessions),
            id,
            operations,
            files,
            barriers,
            hub,
        ));
        Ok(id)
    }

    /// Read-only progress snapshot.
    pub fn progress(&self, id: Uuid) -> Result<ProgressReport, WorkflowError> {
        let sessions = self.sessions.lock().expect("session registry poisoned");
        sessions
            .get(&id)
            .map(WorkflowSession::progress)
            .ok_or(WorkflowError::SessionNotFound { id })
    }

    /// Attach a progress subscriber to a running or finished session.
    ///
    /// A subscriber attaching after the run already finished receives a
    /// fresh stream-end diagnostic immediately, so its stream terminates
    /// instead of waiting on a hub that will never speak again.
    pub fn subscribe(&self, id: Uuid) -> Result<EventStream, WorkflowError> {
        let sessions = self.sessions.lock().expect("session registry poisoned");
        let session = sessions
            .get(&id)
            .ok_or(WorkflowError::SessionNotFound { id })?;
        let stream = session.hub.subscribe();
        if session.finished {
            session
                .hub
                .publish(Event::stream_end(format!("workflow={id} status=finished")));
        }
        Ok(stream)
    }

    /// Fetch a session's result. A served single output (or a served
    /// failure) consumes the session; multi-output results keep it, since
    /// nothing was delivered.
    pub fn take_result(&self, id: Uuid) -> Result<ResultFetch, WorkflowError> {
        let mut sessions = self.sessions.lock().expect("session registry poisoned");
        let session = sessions
            .get_mut(&id)
            .ok_or(WorkflowError::SessionNotFound { id })?;

        if !session.finished {
            return Ok(ResultFetch::NotReady);
        }
        if let Some(reason) = session.error.take() {
            sessions.remove(&id);
            return Ok(ResultFetch::Failed(reason));
        }
        let count = session.result.as_ref().map_or(0, Vec::len);
        if count != 1 {
            return Ok(ResultFetch::MultiOutputUnsupported { count });
        }
        let mut session = sessions.remove(&id).expect("session present above");
        let unit = session
            .result
            .take()
            .and_then(|mut outputs| outputs.pop())
            .expect("single result present above");
        Ok(ResultFetch::Single(unit))
    }

    /// Documented stub: aborting an in-flight workflow is not supported.
    pub fn abort(&self, _id: Uuid) -> Result<(), WorkflowError> {
        Err(WorkflowError::NotImplemented {
            what: "workflow abort",
        })
    }

    /// Drop finished sessions whose results were never fetched within `ttl`.
    ///
    /// Running sessions are untouched. Returns the number of sessions
    /// removed. The server binary calls this on a fixed schedule.
    pub fn sweep_expired(&self, ttl: std::time::Duration) -> usize {
        let ttl = chrono::Duration::seconds(ttl.as_secs().min(i64::MAX as u64) as i64);
        let threshold = chrono::Utc::now() - ttl;
        let mut sessions = self.sessions.lock().expect("session registry poisoned");
        let before = sessions.len();
        sessions.retain(|_, session| match session.finished_at {
            Some(finished_at) => finished_at > threshold,
            None => true,
        });
        let removed = before - sessions.len();
        if removed > 0 {
            tracing::info!(removed, "swept expired workflow results");
        }
        removed
    }

    /// Number of sessions currently registered. Mostly useful in tests.
    #[must_use]
    pub fn session_count(&self) -> usize {
        self.sessions.lock().expect("session registry poisoned").len()
    }
}

/// Background drain: run the engine, record the outcome on the session,
/// and close the progress stream with a terminal diagnostic.
async fn drain(
    transformer: Arc<dyn Transformer>,
    registry: SessionRegistry,
    id: Uuid,
    operations: Vec<Operation>,
    files: Vec<FileUnit>,
    mut barriers: BarrierTable,
    hub: Arc<EventHub>,
) {
    hub.publish(Event::diagnostic(
        "workflow",
        format!("workflow={id} status=started"),
    ));
    let emitter = hub.emitter();
    let traversal = Traversal::new(transformer.as_ref(), &mut barriers, &emitter);
    let outcome = traversal
        .run(&operations, Payload::from_inputs(files))
        .await;

    let end_message = {
        let mut sessions = registry.lock().expect("session registry poisoned");
        // Consumption requires finished = true, so the slot is still present
        // here unless the process is shutting down.
        let Some(session) = sessions.get_mut(&id) else {
            tracing::warn!(workflow = %id, "session vanished before its run finished");
            return;
        };
        session.finished = true;
        session.finished_at = Some(chrono::Utc::now());
        match outcome {
            Ok(outputs) => {
                let message = format!("workflow={id} status=completed outputs={}", outputs.len());
                tracing::info!(workflow = %id, outputs = outputs.len(), "workflow completed");
                session.result = Some(outputs);
                message
            }
            Err(err) => {
                let reason = err.to_string();
                tracing::error!(workflow = %id, error = %reason, "workflow failed");
                session.error = Some(reason.clone());
                format!("workflow={id} status=error error={reason}")
            }
        }
    };
    hub.publish(Event::stream_end(end_message));
}
