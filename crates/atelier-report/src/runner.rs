use std::sync::{Arc, Mutex};

use futures::StreamExt;
use tokio::sync::mpsc;
use tokio::task::AbortHandle;

use atelier_client::{event_stream, ApiClient};

use crate::types::{ResearchRequest, WorkflowEvent};

pub const RUN_ENDPOINT: &str = "/api/smartreport/deep-research/run";
pub const CANCEL_ENDPOINT: &str = "/api/smartreport/deep-research/cancel";

#[derive(Debug, serde::Serialize)]
struct CancelRequest {
    task_id: String,
}

/// A running deep-research workflow: an ordered event receiver plus a
/// cancel handle.
pub struct ResearchRun {
    events: mpsc::Receiver<WorkflowEvent>,
    cancel: CancelHandle,
}

impl ResearchRun {
    /// Next event, in wire order. `None` after the stream ends.
    pub async fn next_event(&mut self) -> Option<WorkflowEvent> {
        self.events.recv().await
    }

    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn into_parts(self) -> (mpsc::Receiver<WorkflowEvent>, CancelHandle) {
        (self.events, self.cancel)
    }
}

/// Cancels a running workflow: aborts the in-flight request, then makes
/// a best-effort call to release the server-side task.
#[derive(Clone)]
pub struct CancelHandle {
    abort: AbortHandle,
    client: ApiClient,
    task_id: Arc<Mutex<Option<String>>>,
}

impl CancelHandle {
    /// Abort the stream and notify the backend. The notification may
    /// fail (the task id may not even be known yet); that failure is
    /// logged and swallowed — cancellation is not an error path.
    pub async fn cancel(&self) {
        self.abort.abort();

        let task_id = self.task_id.lock().unwrap().clone();
        let Some(task_id) = task_id else {
            tracing::debug!("no task id observed yet; skipping backend cancel");
            return;
        };
        if let Err(err) = self
            .client
            .post_json::<_, serde_json::Value>(CANCEL_ENDPOINT, &CancelRequest { task_id })
            .await
        {
            tracing::error!("failed to release backend task: {err}");
        }
    }
}

/// Spawns deep-research runs.
pub struct ResearchRunner;

impl ResearchRunner {
    /// Open the POST-initiated event stream and forward decoded events
    /// into a channel, in arrival order.
    ///
    /// Guarantees:
    /// - at most one terminal event (`complete` or `error`) is
    ///   delivered; forwarding stops right after it;
    /// - a failure to open the connection, a transport error mid-stream,
    ///   or a non-2xx response each surface as a single synthesized
    ///   `error` event;
    /// - no timeout is imposed on the stream itself.
    pub fn spawn(client: ApiClient, request: ResearchRequest) -> ResearchRun {
        let (tx, rx) = mpsc::channel(256);
        let task_id = Arc::new(Mutex::new(request.task_id.clone()));
        let task_id_probe = Arc::clone(&task_id);
        let http = client.clone();

        let handle = tokio::spawn(async move {
            let response = match http.post_json_streaming(RUN_ENDPOINT, &request).await {
                Ok(response) => response,
                Err(err) => {
                    let _ = tx
                        .send(WorkflowEvent::Error {
                            error: Some(err.to_string()),
                            task_id: None,
                            timestamp: None,
                        })
                        .await;
                    return;
                }
            };

            let mut events = event_stream::<WorkflowEvent>(response);
            while let Some(item) = events.next().await {
                match item {
                    Ok(event) => {
                        if let Some(id) = event.task_id() {
                            *task_id_probe.lock().unwrap() = Some(id.to_string());
                        }
                        let terminal = event.is_terminal();
                        if tx.send(event).await.is_err() {
                            // Receiver dropped; stop pulling the stream.
                            return;
                        }
                        if terminal {
                            return;
                        }
                    }
                    Err(err) => {
                        let _ = tx
                            .send(WorkflowEvent::Error {
                                error: Some(err.to_string()),
                                task_id: None,
                                timestamp: None,
                            })
                            .await;
                        return;
                    }
                }
            }
        });

        ResearchRun {
            events: rx,
            cancel: CancelHandle {
                abort: handle.abort_handle(),
                client,
                task_id,
            },
        }
    }
}
