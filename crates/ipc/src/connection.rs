//! Connection to the server
//!
//! Owns one frame transport for its whole lifetime and moves encoded request
//! and response envelopes over it.

use std::time::Instant;

use tracing::{debug, trace};

use crate::error::Result;
use crate::performer::{Command, CommandPerformer, Exchange};
use crate::protocol::{Request, Response};
use crate::transport::FrameTransport;

/// A single persistent connection to the server
///
/// Responses are consumed strictly in the order frames arrive. Every
/// `receive` must correspond to an earlier `send` on the same connection;
/// receiving more than was sent waits until the transport yields a frame or
/// fails. Methods take `&mut self`, so only one caller can drive the
/// connection at a time.
#[derive(Debug)]
pub struct Connection<T> {
    transport: T,
}

impl<T: FrameTransport> Connection<T> {
    pub fn new(transport: T) -> Self {
        Self { transport }
    }

    /// Borrow the underlying transport
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Give up the connection, returning the transport
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Low-level: encode and write one request frame
    pub async fn send_request(&mut self, request: &Request) -> Result<()> {
        let serialize_start = Instant::now();
        let frame = request.encode()?;
        let serialize_elapsed = serialize_start.elapsed();

        let write_start = Instant::now();
        let bytes = frame.len();
        self.transport.send_frame(frame).await?;
        let write_elapsed = write_start.elapsed();

        debug!(
            request_id = %request.request_id,
            command = request.tag().unwrap_or("?"),
            bytes,
            serialize_ms = serialize_elapsed.as_micros() as f64 / 1000.0,
            write_ms = write_elapsed.as_micros() as f64 / 1000.0,
            "Request sent"
        );
        Ok(())
    }

    /// Low-level: read and decode the next response frame
    pub async fn recv_response(&mut self) -> Result<Response> {
        let read_start = Instant::now();
        let frame = self.transport.recv_frame().await?;
        let read_elapsed = read_start.elapsed();

        let deserialize_start = Instant::now();
        let response = Response::decode(&frame)?;
        let deserialize_elapsed = deserialize_start.elapsed();

        debug!(
            request_id = %response.request_id,
            response = response.tag().unwrap_or("?"),
            bytes = frame.len(),
            read_ms = read_elapsed.as_micros() as f64 / 1000.0,
            deserialize_ms = deserialize_elapsed.as_micros() as f64 / 1000.0,
            "Response received"
        );
        Ok(response)
    }

    /// Send a command without waiting for its response
    pub async fn send<C: Command>(&mut self, command: C) -> Result<Exchange<C>> {
        CommandPerformer::new(command).send(self).await
    }

    /// Complete a previously sent exchange, checking its request ID
    pub async fn receive<C: Command>(&mut self, exchange: Exchange<C>) -> Result<C::Output> {
        exchange.receive(self).await
    }

    /// Take the next response and decode it with `command`, skipping the
    /// request ID check
    pub async fn receive_unchecked<C: Command>(&mut self, command: &C) -> Result<C::Output> {
        trace!(command = command.name(), "Receiving without an expected request");
        let response = self.recv_response().await?;
        crate::performer::complete(command, None, response)
    }

    /// Send a command and wait for its response
    pub async fn perform<C: Command>(&mut self, command: C) -> Result<C::Output> {
        let total_start = Instant::now();
        let name = command.name().to_string();
        let output = CommandPerformer::new(command).perform(self).await;
        debug!(
            command = %name,
            total_ms = total_start.elapsed().as_micros() as f64 / 1000.0,
            ok = output.is_ok(),
            "Exchange completed"
        );
        output
    }
}
