//! Request/response correlation over a FIFO connection
//!
//! An exchange moves through three states:
//!
//! ```text
//! CommandPerformer ──send──> Exchange ──receive──> C::Output
//!     (built)                 (sent)                (completed)
//! ```
//!
//! Each `receive` takes whatever frame arrives next. The request ID check is a
//! sanity assertion, not a reordering mechanism: pairing a pipelined batch
//! correctly relies on the server answering in request order. Use
//! [`crate::Dispatcher`] when that cannot be guaranteed.

use rmpv::Value;
use tracing::{trace, warn};

use crate::connection::Connection;
use crate::error::{Error, Result};
use crate::protocol::{new_request_id, Request, Response};
use crate::transport::FrameTransport;

/// A typed request/response descriptor
///
/// Commands are immutable parameter holders. They build the request content
/// and decode the matching response content; they never hold protocol state.
pub trait Command {
    /// Decoded result of a successful response
    type Output;

    /// Stable name used in diagnostics
    fn name(&self) -> &str;

    /// Build the named request content, e.g. `{"iss_object": {...}}`
    fn build_request_payload(&self) -> Result<Value>;

    /// Decode the content of a non-error response to this command
    ///
    /// Only ever called with the response to a request built by this
    /// command. A shape mismatch is a [`Error::MalformedResponse`].
    fn decode_response(&self, content: Value) -> Result<Self::Output>;
}

/// A command bound to a fresh request ID, not yet sent
#[derive(Debug)]
pub struct CommandPerformer<C> {
    command: C,
    request_id: String,
}

impl<C: Command> CommandPerformer<C> {
    pub fn new(command: C) -> Self {
        Self {
            command,
            request_id: new_request_id(),
        }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn command(&self) -> &C {
        &self.command
    }

    /// Build the request envelope without sending it
    pub fn create_request(&self) -> Result<Request> {
        Ok(Request::new(
            self.request_id.clone(),
            self.command.build_request_payload()?,
        ))
    }

    /// Write the request and hand back the in-flight exchange
    pub async fn send<T: FrameTransport>(
        self,
        connection: &mut Connection<T>,
    ) -> Result<Exchange<C>> {
        let request = self.create_request()?;
        trace!(command = self.command.name(), request_id = %request.request_id, "Sending command");
        connection.send_request(&request).await?;
        Ok(Exchange {
            command: self.command,
            request,
        })
    }

    /// Take the next response without an expected request to check against
    pub async fn receive<T: FrameTransport>(
        self,
        connection: &mut Connection<T>,
    ) -> Result<C::Output> {
        connection.receive_unchecked(&self.command).await
    }

    /// Send, then receive with the request ID checked
    pub async fn perform<T: FrameTransport>(
        self,
        connection: &mut Connection<T>,
    ) -> Result<C::Output> {
        let exchange = self.send(connection).await?;
        exchange.receive(connection).await
    }
}

/// A sent request awaiting its response
///
/// The caller owns in-flight exchanges; the connection keeps no table of
/// them. Present the exchange back to receive its response.
#[derive(Debug)]
pub struct Exchange<C> {
    command: C,
    request: Request,
}

impl<C: Command> Exchange<C> {
    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn request_id(&self) -> &str {
        &self.request.request_id
    }

    pub fn command(&self) -> &C {
        &self.command
    }

    /// Read the next response and complete this exchange with it
    pub async fn receive<T: FrameTransport>(
        self,
        connection: &mut Connection<T>,
    ) -> Result<C::Output> {
        let response = connection.recv_response().await?;
        complete(&self.command, Some(&self.request), response)
    }

    pub fn into_parts(self) -> (C, Request) {
        (self.command, self.request)
    }
}

/// Validate a response and decode it with the issuing command
pub(crate) fn complete<C: Command>(
    command: &C,
    expected: Option<&Request>,
    response: Response,
) -> Result<C::Output> {
    let content = validate(expected, response)?;
    command.decode_response(content)
}

/// Check the request ID (when known) and the error marker, returning the
/// response content
pub(crate) fn validate(expected: Option<&Request>, response: Response) -> Result<Value> {
    if let Some(request) = expected {
        if response.request_id != request.request_id {
            warn!(
                expected = %request.request_id,
                received = %response.request_id,
                "Mismatched request IDs"
            );
            return Err(Error::RequestIdMismatch {
                request: Box::new(request.clone()),
                response: Box::new(response),
            });
        }
    }

    if let Some(error) = response.server_error() {
        warn!(request_id = %response.request_id, %error, "Received error response");
        return Err(Error::ErrorResponse {
            request: expected.cloned().map(Box::new),
            response: Box::new(response),
            error,
        });
    }

    Ok(response.content)
}
