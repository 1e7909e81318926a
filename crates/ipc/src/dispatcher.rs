//! Request-ID dispatch for concurrent callers
//!
//! A single background task owns the transport. Outbound requests are queued
//! to it; every inbound frame is routed to the waiter registered under its
//! `request_id`, so responses may arrive in any order.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::performer::{complete, Command};
use crate::protocol::{new_request_id, Request, Response};
use crate::transport::FrameTransport;

/// Outbound requests buffered ahead of the transport
const SUBMISSION_QUEUE_DEPTH: usize = 64;

type Waiter = oneshot::Sender<Result<Response>>;

struct Submission {
    request: Request,
    waiter: Waiter,
}

/// Handle to the dispatch task
///
/// Cheap to clone and usable from many tasks at once. The task exits when
/// every handle is dropped and no exchange is still in flight, or when the
/// transport fails.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    submissions: mpsc::Sender<Submission>,
}

impl Dispatcher {
    /// Start the dispatch task on the current tokio runtime
    pub fn spawn<T: FrameTransport + 'static>(transport: T) -> Self {
        let (submissions, queue) = mpsc::channel(SUBMISSION_QUEUE_DEPTH);
        tokio::spawn(run(transport, queue));
        Self { submissions }
    }

    /// Queue a command and return a handle for its response
    pub async fn submit<C: Command>(&self, command: C) -> Result<Pending<C>> {
        let request = Request::new(new_request_id(), command.build_request_payload()?);
        let (waiter, response) = oneshot::channel();
        self.submissions
            .send(Submission {
                request: request.clone(),
                waiter,
            })
            .await
            .map_err(|_| Error::DispatcherClosed)?;
        Ok(Pending {
            command,
            request,
            response,
        })
    }

    /// Submit a command and wait for its response
    pub async fn perform<C: Command>(&self, command: C) -> Result<C::Output> {
        self.submit(command).await?.wait().await
    }
}

/// An exchange submitted to a [`Dispatcher`]
///
/// Dropping it without calling [`Pending::wait`] abandons the exchange. Its
/// slot is released the next time the dispatch task wakes, and a late response for
/// it is logged and dropped like any unknown id.
#[derive(Debug)]
pub struct Pending<C> {
    command: C,
    request: Request,
    response: oneshot::Receiver<Result<Response>>,
}

impl<C: Command> Pending<C> {
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_id(&self) -> &str {
        &self.request.request_id
    }

    /// Wait for the response routed to this exchange
    pub async fn wait(self) -> Result<C::Output> {
        let response = self.response.await.map_err(|_| Error::DispatcherClosed)??;
        complete(&self.command, Some(&self.request), response)
    }
}

async fn run<T: FrameTransport>(mut transport: T, mut queue: mpsc::Receiver<Submission>) {
    let mut in_flight: HashMap<String, Waiter> = HashMap::new();
    let mut accepting = true;

    loop {
        in_flight.retain(|_, waiter| !waiter.is_closed());
        if !accepting && in_flight.is_empty() {
            debug!("All dispatcher handles dropped, stopping");
            return;
        }

        tokio::select! {
            submission = queue.recv(), if accepting => {
                let Some(Submission { request, waiter }) = submission else {
                    accepting = false;
                    continue;
                };
                let frame = match request.encode() {
                    Ok(frame) => frame,
                    Err(e) => {
                        let _ = waiter.send(Err(e));
                        continue;
                    }
                };
                if let Err(e) = transport.send_frame(frame).await {
                    warn!(error = %e, "Dispatcher failed to send, failing in-flight requests");
                    let _ = waiter.send(Err(e));
                    fail_all(&mut in_flight);
                    return;
                }
                in_flight.insert(request.request_id, waiter);
            }
            frame = transport.recv_frame() => {
                let frame = match frame {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(
                            error = %e,
                            "Dispatcher failed to receive, failing in-flight requests"
                        );
                        fail_all(&mut in_flight);
                        return;
                    }
                };
                // An undecodable frame names no waiter, so only the frame is lost
                let response = match Response::decode(&frame) {
                    Ok(response) => response,
                    Err(e) => {
                        warn!(error = %e, len = frame.len(), "Dropping undecodable frame");
                        continue;
                    }
                };
                match in_flight.remove(&response.request_id) {
                    Some(waiter) => {
                        // The waiter may have given up; nothing to do then
                        let _ = waiter.send(Ok(response));
                    }
                    None => warn!(
                        request_id = %response.request_id,
                        "Dropping response for unknown request"
                    ),
                }
            }
        }
    }
}

fn fail_all(in_flight: &mut HashMap<String, Waiter>) {
    for (_, waiter) in in_flight.drain() {
        let _ = waiter.send(Err(Error::ConnectionClosed));
    }
}
