//! Tower middleware running the auditing pipeline around a service.
//!
//! The principal and routing metadata are read from request extensions, so
//! authentication and routing layers must run before this one. A handler may
//! also attach a more precise [`RequestInfo`] to its response extensions,
//! which takes precedence over the request's.
//!
//! The event is finalized when the response body completes, not when the
//! handler returns: [`AuditBody`] carries the pending event alongside the
//! body and closes it at end of stream, on a body error, or when the body is
//! dropped. The status is recorded once the first frame is produced, so a
//! body that fails before sending anything is recorded without a status.

use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::extract::ConnectInfo;
use axum::http::{Request, Response, StatusCode};
use futures::future::BoxFuture;
use http_body::{Body, Frame, SizeHint};
use kaudit_core::{RequestInfo, UserInfo};
use kaudit_event::PendingEvent;
use tower::{Layer, Service};
use tracing::debug;

use crate::auditing::Auditing;
use crate::capture::CaptureHandle;

/// Layer that wraps services with [`AuditService`].
#[derive(Debug, Clone)]
pub struct AuditLayer {
    auditing: Arc<Auditing>,
}

impl AuditLayer {
    /// Creates a layer emitting through `auditing`.
    #[must_use]
    pub const fn new(auditing: Arc<Auditing>) -> Self {
        Self { auditing }
    }
}

impl<S> Layer<S> for AuditLayer {
    type Service = AuditService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuditService {
            inner,
            auditing: self.auditing.clone(),
        }
    }
}

/// Service emitting one audit event per request.
#[derive(Debug, Clone)]
pub struct AuditService<S> {
    inner: S,
    auditing: Arc<Auditing>,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for AuditService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>>,
    S::Future: Send + 'static,
    S::Error: Send + 'static,
    ResBody: Body + Send + 'static,
{
    type Response = Response<AuditBody<ResBody>>;
    type Error = S::Error;
    type Future = BoxFuture<'static, Result<Self::Response, Self::Error>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        if !self.auditing.is_enabled() {
            let future = self.inner.call(request);
            return Box::pin(async move {
                future
                    .await
                    .map(|response| response.map(AuditBody::passthrough))
            });
        }

        let extensions = request.extensions();
        let user = extensions.get::<UserInfo>();
        let remote_addr = extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let info = extensions.get::<RequestInfo>().cloned().unwrap_or_else(|| {
            RequestInfo::non_resource(
                request.method().as_str().to_ascii_lowercase(),
                request.uri().path(),
            )
        });

        let pending = self
            .auditing
            .on_request_received(&request, user, remote_addr);
        let mut in_flight = InFlight {
            auditing: self.auditing.clone(),
            pending: Some(pending),
            capture: CaptureHandle::new(),
            info,
        };

        let future = self.inner.call(request);
        Box::pin(async move {
            match future.await {
                Ok(response) => {
                    if let Some(info) = response.extensions().get::<RequestInfo>() {
                        in_flight.info = info.clone();
                    }
                    let status = response.status();
                    Ok(response.map(|body| AuditBody::new(body, status, in_flight)))
                }
                Err(err) => {
                    in_flight.finish();
                    Err(err)
                }
            }
        })
    }
}

/// Response body that finalizes the audit event when it completes.
pub struct AuditBody<B> {
    inner: Pin<Box<B>>,
    status: Option<StatusCode>,
    in_flight: Option<InFlight>,
}

impl<B: Body> AuditBody<B> {
    fn new(inner: B, status: StatusCode, in_flight: InFlight) -> Self {
        let mut body = Self {
            inner: Box::pin(inner),
            status: Some(status),
            in_flight: Some(in_flight),
        };
        // Headers-only responses may never be polled.
        if body.inner.is_end_stream() {
            body.record_status();
        }
        body
    }

    /// Wraps a body without auditing it.
    #[must_use]
    pub fn passthrough(inner: B) -> Self {
        Self {
            inner: Box::pin(inner),
            status: None,
            in_flight: None,
        }
    }

    fn record_status(&mut self) {
        if let (Some(status), Some(in_flight)) = (self.status.take(), &self.in_flight) {
            in_flight.capture.observe_status(status);
        }
    }

    fn complete(&mut self) {
        if let Some(mut in_flight) = self.in_flight.take() {
            in_flight.finish();
        }
    }
}

impl<B: Body> Body for AuditBody<B> {
    type Data = B::Data;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = this.inner.as_mut().poll_frame(cx);
        match &polled {
            Poll::Ready(Some(Ok(_))) => this.record_status(),
            Poll::Ready(None) => {
                this.record_status();
                this.complete();
            }
            Poll::Ready(Some(Err(_))) => {
                if let Some(in_flight) = &this.in_flight {
                    debug!(path = %in_flight.info.path, "Response body failed");
                }
                this.complete();
            }
            Poll::Pending => {}
        }
        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Finalizes the event when the response completes or is dropped.
struct InFlight {
    auditing: Arc<Auditing>,
    pending: Option<PendingEvent>,
    capture: CaptureHandle,
    info: RequestInfo,
}

impl InFlight {
    fn finish(&mut self) {
        if let Some(pending) = self.pending.take() {
            self.auditing
                .finish(pending, self.capture.snapshot(), &self.info);
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        if self.pending.is_some() {
            debug!(path = %self.info.path, "Response dropped before completion");
            self.finish();
        }
    }
}
