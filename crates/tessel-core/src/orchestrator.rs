// ── Request orchestrator ──
//
// Drains the store's dispatch channel, executes each action through the
// transport and reports the terminal event back into the store. Requests
// run to completion even when nobody is watching anymore, so a later
// subscriber still benefits from the response.

use std::sync::Arc;

use futures_util::future::BoxFuture;
use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::action::RequestAction;
use crate::config::OrchestratorConfig;
use crate::error::CoreError;
use crate::store::{NormalizedStore, ResponseBody, StoreEvent};

/// Executes request actions against a backend.
///
/// Timeouts and retries are the transport's business; whatever it
/// returns as `Err` is recorded as the request's failure message.
pub trait Transport: Send + Sync + 'static {
    fn execute<'a>(&'a self, action: &'a RequestAction) -> BoxFuture<'a, Result<ResponseBody, CoreError>>;
}

/// Lifecycle state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestratorState {
    Idle,
    Running,
    Stopped,
}

/// Cheaply cloneable via `Arc<OrchestratorInner>`.
#[derive(Clone)]
pub struct Orchestrator {
    inner: Arc<OrchestratorInner>,
}

struct OrchestratorInner {
    config: OrchestratorConfig,
    store: Arc<NormalizedStore>,
    transport: Arc<dyn Transport>,
    state: watch::Sender<OrchestratorState>,
    cancel: CancellationToken,
    in_flight: Arc<Semaphore>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl Orchestrator {
    /// Create an orchestrator. Does NOT start processing; call
    /// [`start()`](Self::start).
    pub fn new(config: OrchestratorConfig, store: Arc<NormalizedStore>, transport: Arc<dyn Transport>) -> Self {
        let (state, _) = watch::channel(OrchestratorState::Idle);
        let in_flight = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
        Self {
            inner: Arc::new(OrchestratorInner {
                config,
                store,
                transport,
                state,
                cancel: CancellationToken::new(),
                in_flight,
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<NormalizedStore> {
        &self.inner.store
    }

    pub fn state(&self) -> watch::Receiver<OrchestratorState> {
        self.inner.state.subscribe()
    }

    /// Take the store's dispatch channel and spawn the processor task.
    pub async fn start(&self) -> Result<(), CoreError> {
        let rx = self
            .inner
            .store
            .take_action_receiver()
            .ok_or(CoreError::AlreadyStarted)?;

        let mut handles = self.inner.task_handles.lock().await;
        handles.push(tokio::spawn(processor_task(
            self.clone(),
            rx,
            self.inner.cancel.clone(),
        )));
        self.inner.state.send_replace(OrchestratorState::Running);
        info!(max_in_flight = self.inner.config.max_in_flight, "orchestrator started");
        Ok(())
    }

    /// Stop accepting actions and join the processor. Requests already
    /// executing finish on their own; queued and later ones fail with
    /// "dispatch channel closed".
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();
        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        self.inner.state.send_replace(OrchestratorState::Stopped);
        debug!("orchestrator stopped");
    }
}

// ── Background tasks ─────────────────────────────────────────────

async fn processor_task(
    orchestrator: Orchestrator,
    mut rx: mpsc::UnboundedReceiver<RequestAction>,
    cancel: CancellationToken,
) {
    let store = Arc::clone(&orchestrator.inner.store);
    loop {
        let action = tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            action = rx.recv() => match action {
                Some(action) => action,
                None => break,
            },
        };
        let permit = tokio::select! {
            () = cancel.cancelled() => {
                store.reject(&action);
                break;
            }
            permit = Arc::clone(&orchestrator.inner.in_flight).acquire_owned() => permit,
        };
        let Ok(permit) = permit else {
            store.reject(&action);
            break;
        };
        let transport = Arc::clone(&orchestrator.inner.transport);
        tokio::spawn(execute_action(Arc::clone(&store), transport, action, permit));
    }

    // Anything still queued will never run. Later dispatches fail in the
    // store once `rx` is dropped.
    rx.close();
    while let Some(action) = rx.recv().await {
        store.reject(&action);
    }
}

async fn execute_action(
    store: Arc<NormalizedStore>,
    transport: Arc<dyn Transport>,
    action: RequestAction,
    _permit: OwnedSemaphorePermit,
) {
    let event = match transport.execute(&action).await {
        Ok(body) => StoreEvent::succeeded(&action, body),
        Err(err) => {
            warn!(
                operation = %action.operation,
                schema = %action.schema_key(),
                url = %action.url,
                error = %err,
                "request failed"
            );
            StoreEvent::failed(&action, failure_message(&err))
        }
    };
    store.apply(event);
}

/// The message recorded on the request: the server's own wording when
/// there is one.
fn failure_message(err: &CoreError) -> String {
    match err {
        CoreError::Transport { message, .. } => message.clone(),
        other => other.to_string(),
    }
}
