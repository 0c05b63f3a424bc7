//! Time-bounded response streaming.
//!
//! Backend bytes are coalesced into larger frames, but no byte waits in the
//! proxy longer than the flush interval. Long-lived responses such as log
//! tails therefore reach the client incrementally.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::http::HeaderMap;
use bytes::{Bytes, BytesMut};
use http_body::{Body, Frame, SizeHint};
use tokio::time::{sleep, Sleep};

/// Buffered bytes are emitted early once they reach this size.
const MAX_BUFFERED: usize = 64 * 1024;

/// Wraps a response body and flushes buffered data at least every `interval`.
pub struct FlushingBody<B> {
    inner: B,
    interval: Duration,
    buffer: BytesMut,
    /// Armed when the first byte enters an empty buffer.
    deadline: Option<Pin<Box<Sleep>>>,
    trailers: Option<HeaderMap>,
    inner_done: bool,
}

impl<B> FlushingBody<B> {
    /// A zero `interval` forwards every frame as soon as it arrives.
    pub fn new(inner: B, interval: Duration) -> Self {
        Self {
            inner,
            interval,
            buffer: BytesMut::new(),
            deadline: None,
            trailers: None,
            inner_done: false,
        }
    }

    fn take_buffer(&mut self) -> Frame<Bytes> {
        self.deadline = None;
        Frame::data(self.buffer.split().freeze())
    }
}

impl<B> Body for FlushingBody<B>
where
    B: Body<Data = Bytes> + Unpin,
{
    type Data = Bytes;
    type Error = B::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();

        if this.interval.is_zero() {
            return Pin::new(&mut this.inner).poll_frame(cx);
        }

        loop {
            if this.inner_done {
                if !this.buffer.is_empty() {
                    return Poll::Ready(Some(Ok(this.take_buffer())));
                }
                return Poll::Ready(this.trailers.take().map(|t| Ok(Frame::trailers(t))));
            }

            match Pin::new(&mut this.inner).poll_frame(cx) {
                Poll::Ready(Some(Ok(frame))) => match frame.into_data() {
                    Ok(data) => {
                        if data.is_empty() {
                            continue;
                        }
                        if this.buffer.is_empty() {
                            this.deadline = Some(Box::pin(sleep(this.interval)));
                        }
                        this.buffer.extend_from_slice(&data);
                        let overdue = this.deadline.as_ref().is_some_and(|d| d.is_elapsed());
                        if this.buffer.len() >= MAX_BUFFERED || overdue {
                            return Poll::Ready(Some(Ok(this.take_buffer())));
                        }
                    }
                    Err(frame) => {
                        this.trailers = frame.into_trailers().ok();
                        this.inner_done = true;
                    }
                },
                Poll::Ready(Some(Err(e))) => return Poll::Ready(Some(Err(e))),
                Poll::Ready(None) => this.inner_done = true,
                Poll::Pending => {
                    if let Some(deadline) = this.deadline.as_mut() {
                        if deadline.as_mut().poll(cx).is_ready() {
                            return Poll::Ready(Some(Ok(this.take_buffer())));
                        }
                    }
                    return Poll::Pending;
                }
            }
        }
    }

    fn is_end_stream(&self) -> bool {
        if self.interval.is_zero() {
            return self.inner.is_end_stream();
        }
        self.buffer.is_empty()
            && self.trailers.is_none()
            && (self.inner_done || self.inner.is_end_stream())
    }

    fn size_hint(&self) -> SizeHint {
        let inner = self.inner.size_hint();
        let buffered = self.buffer.len() as u64;
        let mut hint = SizeHint::new();
        hint.set_lower(inner.lower() + buffered);
        if let Some(upper) = inner.upper() {
            hint.set_upper(upper + buffered);
        }
        hint
    }
}
