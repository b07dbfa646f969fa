//! Asynchronous request/notification worker.
//!
//! The engine is CPU-heavy (up to 101 layers, each with a 100,000-iteration
//! password stretch), so it never runs on the caller's task. A [`Worker`]
//! owns a request channel; every submitted [`Request`] gets its own
//! notification channel back, carrying zero or more `Progress` messages in
//! strictly increasing step order followed by exactly one `Success` or
//! `Error`. Requests are served concurrently and share no mutable state.
//!
//! The backend self-test runs once, lazily, behind a [`OnceCell`]. If it
//! fails, every request on this worker fails fast with `EngineNotReady`
//! instead of hanging. There is no mid-pipeline cancellation: dropping the
//! notification receiver discards the result but the pipeline runs to
//! completion.

use std::sync::Arc;

use tokio::sync::OnceCell;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::types::{Action, Notification, Request};

/// Handle to a spawned worker task. Cheap to clone; all clones feed the
/// same request queue.
#[derive(Clone)]
pub struct Worker {
    requests: UnboundedSender<Job>,
}

struct Job {
    request: Request,
    reply: UnboundedSender<Notification>,
}

impl Worker {
    /// Spawns the worker loop onto the current tokio runtime.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run(rx));
        Self { requests: tx }
    }

    /// Submits one request, returning the stream of notifications for it.
    ///
    /// If the worker task is gone, the receiver yields a single terminal
    /// error notification.
    pub fn submit(&self, request: Request) -> UnboundedReceiver<Notification> {
        let (reply_tx, reply_rx) = mpsc::unbounded_channel();
        let action = request.action;

        if self.requests.send(Job { request, reply: reply_tx.clone() }).is_err() {
            let _ = reply_tx.send(Notification::error(action, &EngineError::EngineNotReady));
        }

        reply_rx
    }
}

async fn run(mut requests: mpsc::UnboundedReceiver<Job>) {
    let engine: Arc<OnceCell<Result<Engine, EngineError>>> = Arc::new(OnceCell::new());
    tracing::debug!("worker started");

    while let Some(job) = requests.recv().await {
        let engine = Arc::clone(&engine);
        tokio::spawn(async move {
            serve(&engine, job).await;
        });
    }

    tracing::debug!("worker stopped");
}

async fn serve(engine: &OnceCell<Result<Engine, EngineError>>, job: Job) {
    let Job { request, reply } = job;
    let action = request.action;

    if let Err(err) = request.validate() {
        let _ = reply.send(Notification::error(action, &err));
        return;
    }

    let ready = engine
        .get_or_init(|| async {
            match tokio::task::spawn_blocking(Engine::init).await {
                Ok(result) => {
                    if result.is_ok() {
                        tracing::info!("crypto backend ready");
                    }
                    result
                }
                Err(_) => Err(EngineError::EngineNotReady),
            }
        })
        .await;

    let engine = match ready {
        Ok(engine) => *engine,
        Err(_) => {
            let _ = reply.send(Notification::error(action, &EngineError::EngineNotReady));
            return;
        }
    };

    let progress_reply = reply.clone();
    let outcome = tokio::task::spawn_blocking(move || {
        let progress = move |current: usize, total: usize| {
            let _ = progress_reply.send(Notification::progress(action, current, total));
        };

        match action {
            Action::Encrypt => engine.encrypt(
                &request.payload,
                &request.password,
                &request.rule,
                &request.transform,
                &request.aux,
                progress,
            ),
            Action::Decrypt | Action::Verify => engine.decrypt(
                &request.payload,
                &request.password,
                &request.rule,
                &request.transform,
                &request.aux,
                progress,
            ),
        }
    })
    .await;

    let terminal = match outcome {
        Ok(Ok(result)) => Notification::success(action, result),
        Ok(Err(err)) => {
            tracing::debug!(action = action.label(), error = %err, "request failed");
            Notification::error(action, &err)
        }
        Err(_) => Notification::error(action, &EngineError::EngineNotReady),
    };

    let _ = reply.send(terminal);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secret::Secret;
    use crate::types::AuxStrings;

    fn request(action: Action, payload: &str) -> Request {
        Request {
            action,
            payload: payload.to_owned(),
            password: Secret::new("pw"),
            rule: "5".to_owned(),
            transform: "b".to_owned(),
            aux: AuxStrings::new("path", "upper", "lower"),
        }
    }

    async fn collect(mut rx: UnboundedReceiver<Notification>) -> Vec<Notification> {
        let mut notifications = Vec::new();
        while let Some(notification) = rx.recv().await {
            notifications.push(notification);
        }
        notifications
    }

    #[tokio::test]
    async fn test_encrypt_then_decrypt_via_worker() {
        let worker = Worker::spawn();

        let notifications = collect(worker.submit(request(Action::Encrypt, "hello"))).await;
        let wire = match notifications.last().unwrap() {
            Notification::Success { action, result } => {
                assert_eq!(*action, "encrypt");
                result.clone()
            }
            other => panic!("expected success, got {other:?}"),
        };

        let notifications = collect(worker.submit(request(Action::Decrypt, &wire))).await;
        match notifications.last().unwrap() {
            Notification::Success { action, result } => {
                assert_eq!(*action, "decrypt");
                assert_eq!(result, "hello");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_progress_then_single_terminal() {
        let worker = Worker::spawn();
        let notifications = collect(worker.submit(request(Action::Encrypt, "hello"))).await;

        // Rule 5 = 3 inner layers + outer: 4 progress events, 1 terminal.
        assert_eq!(notifications.len(), 5);

        let mut last_step = 0;
        for notification in &notifications[..4] {
            match notification {
                Notification::Progress { current_step, total_steps, .. } => {
                    assert!(*current_step > last_step);
                    assert_eq!(*total_steps, 4);
                    last_step = *current_step;
                }
                other => panic!("expected progress, got {other:?}"),
            }
        }
        assert!(matches!(notifications[4], Notification::Success { .. }));
    }

    #[tokio::test]
    async fn test_missing_field_fails_before_progress() {
        let worker = Worker::spawn();

        let mut bad = request(Action::Encrypt, "hello");
        bad.rule = String::new();

        let notifications = collect(worker.submit(bad)).await;
        assert_eq!(notifications.len(), 1);
        match &notifications[0] {
            Notification::Error { error, .. } => assert!(error.contains("rule")),
            other => panic!("expected error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_payload_rejected() {
        let worker = Worker::spawn();
        let notifications = collect(worker.submit(request(Action::Decrypt, ""))).await;
        assert_eq!(notifications.len(), 1);
        assert!(matches!(notifications[0], Notification::Error { .. }));
    }

    #[tokio::test]
    async fn test_verify_reports_verify_action() {
        let worker = Worker::spawn();

        let notifications = collect(worker.submit(request(Action::Encrypt, "hello"))).await;
        let wire = match notifications.last().unwrap() {
            Notification::Success { result, .. } => result.clone(),
            other => panic!("expected success, got {other:?}"),
        };

        let notifications = collect(worker.submit(request(Action::Verify, &wire))).await;
        match notifications.last().unwrap() {
            Notification::Success { action, result } => {
                assert_eq!(*action, "verify");
                assert_eq!(result, "hello");
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_concurrent_requests() {
        let worker = Worker::spawn();

        let rx_a = worker.submit(request(Action::Encrypt, "first"));
        let rx_b = worker.submit(request(Action::Encrypt, "second"));

        let (a, b) = tokio::join!(collect(rx_a), collect(rx_b));
        assert!(matches!(a.last().unwrap(), Notification::Success { .. }));
        assert!(matches!(b.last().unwrap(), Notification::Success { .. }));
    }
}
