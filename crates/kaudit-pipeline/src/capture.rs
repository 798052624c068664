//! Response capture.
//!
//! [`ResponseCapture`] decorates a [`ResponseWriter`] so the finalizer can
//! learn which status was sent without the handler cooperating. Every call is
//! forwarded to the wrapped sink unchanged.

use std::io;
use std::sync::Arc;

use axum::http::{HeaderMap, StatusCode};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use kaudit_event::now;

/// Sink for an HTTP response, written header first and then body.
pub trait ResponseWriter {
    /// Returns the response headers for modification before the status is written.
    fn headers_mut(&mut self) -> &mut HeaderMap;

    /// Writes the status line.
    fn write_header(&mut self, status: StatusCode);

    /// Writes body bytes, returning how many were accepted.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot accept the bytes.
    fn write(&mut self, buf: &[u8]) -> io::Result<usize>;

    /// Flushes buffered output to the client.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink cannot be flushed.
    fn flush(&mut self) -> io::Result<()>;
}

/// What was observed about a response by the time it completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapturedResponse {
    status: Option<StatusCode>,
    first_write_at: Option<DateTime<Utc>>,
}

impl CapturedResponse {
    /// Returns a snapshot of a response that never wrote anything.
    #[must_use]
    pub const fn aborted() -> Self {
        Self {
            status: None,
            first_write_at: None,
        }
    }

    /// Returns a snapshot of a response that sent `status`.
    #[must_use]
    pub fn with_status(status: StatusCode) -> Self {
        Self {
            status: Some(status),
            first_write_at: Some(now()),
        }
    }

    /// Returns the status that was sent, if any.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns the numeric status code that was sent, if any.
    #[must_use]
    pub fn status_code(&self) -> Option<u16> {
        self.status.map(|s| s.as_u16())
    }

    /// Returns true if a status was sent, explicitly or by writing body bytes.
    #[must_use]
    pub const fn is_written(&self) -> bool {
        self.status.is_some()
    }

    /// Returns when the response first wrote anything.
    #[must_use]
    pub const fn first_write_at(&self) -> Option<DateTime<Utc>> {
        self.first_write_at
    }
}

/// Shared view of a response's capture state.
///
/// Clones observe the same state, so one can stay with the finalizing side
/// while the decorated writer moves into the handler.
#[derive(Debug, Clone, Default)]
pub struct CaptureHandle {
    state: Arc<Mutex<CapturedResponse>>,
}

impl CaptureHandle {
    /// Creates a handle with nothing observed yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an explicit status. Only the first status is kept.
    pub fn observe_status(&self, status: StatusCode) {
        let mut state = self.state.lock();
        if state.status.is_none() {
            state.status = Some(status);
            state.first_write_at = Some(now());
        }
    }

    /// Records a body write, implying `200 OK` if no status was sent yet.
    pub fn observe_body_write(&self) {
        self.observe_status(StatusCode::OK);
    }

    /// Returns true if a status was sent.
    #[must_use]
    pub fn is_written(&self) -> bool {
        self.state.lock().is_written()
    }

    /// Returns the status sent so far.
    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        self.state.lock().status
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> CapturedResponse {
        *self.state.lock()
    }

    /// Consumes the handle, returning the final state.
    #[must_use]
    pub fn finish(self) -> CapturedResponse {
        self.snapshot()
    }
}

/// Decorator recording the status written through a [`ResponseWriter`].
#[derive(Debug)]
pub struct ResponseCapture<W> {
    inner: W,
    handle: CaptureHandle,
}

impl<W: ResponseWriter> ResponseCapture<W> {
    /// Wraps `inner`.
    #[must_use]
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            handle: CaptureHandle::new(),
        }
    }

    /// Returns a handle observing this capture.
    #[must_use]
    pub fn handle(&self) -> CaptureHandle {
        self.handle.clone()
    }

    /// Returns the state observed so far.
    #[must_use]
    pub fn captured(&self) -> CapturedResponse {
        self.handle.snapshot()
    }

    /// Returns the wrapped writer.
    pub const fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Unwraps the writer and the final captured state.
    pub fn into_parts(self) -> (W, CapturedResponse) {
        (self.inner, self.handle.finish())
    }
}

impl<W: ResponseWriter> ResponseWriter for ResponseCapture<W> {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        self.inner.headers_mut()
    }

    fn write_header(&mut self, status: StatusCode) {
        self.handle.observe_status(status);
        self.inner.write_header(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.handle.observe_body_write();
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

impl<W: ResponseWriter> io::Write for ResponseCapture<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        ResponseWriter::write(self, buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        ResponseWriter::flush(self)
    }
}

/// Response sink that buffers everything in memory.
#[derive(Debug, Default)]
pub struct MemoryResponse {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
    flushes: usize,
}

impl MemoryResponse {
    /// Creates an empty response.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the status the sink saw, applying the implicit `200 OK`.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// Returns the headers.
    #[must_use]
    pub const fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the buffered body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Returns how many times the sink was flushed.
    #[must_use]
    pub const fn flush_count(&self) -> usize {
        self.flushes
    }
}

impl ResponseWriter for MemoryResponse {
    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    fn write_header(&mut self, status: StatusCode) {
        self.status.get_or_insert(status);
    }

    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.status.get_or_insert(StatusCode::OK);
        self.body.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.flushes += 1;
        Ok(())
    }
}
