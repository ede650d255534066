use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::Rc;
use std::task::{Context, Poll};

use futures_util::Stream;

use crate::latch::LatchWait;
use crate::signal::SignalWait;
use crate::time::MonotonicTime;

use super::Inner;

/// A stream of the tick times of a [`Ticker`](super::Ticker).
///
/// Each poll races the next tick against the completion of the ticker. A
/// tick that was delivered before completion is always yielded, and nothing
/// is yielded once completion was observed.
#[must_use = "streams do nothing unless polled"]
pub struct TickerStream {
    ticker: Rc<Inner>,
    tick: Option<SignalWait>,
    done: Option<LatchWait>,
    terminated: bool,
}

impl TickerStream {
    pub(super) fn new(ticker: Rc<Inner>) -> Self {
        Self {
            ticker,
            tick: None,
            done: None,
            terminated: false,
        }
    }

    fn terminate(&mut self) -> Poll<Option<MonotonicTime>> {
        self.terminated = true;
        self.tick = None;
        self.done = None;

        Poll::Ready(None)
    }
}

impl Stream for TickerStream {
    type Item = MonotonicTime;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = &mut *self;
        if this.terminated {
            return Poll::Ready(None);
        }
        if this.tick.is_none() {
            if this.ticker.done.is_set() {
                return this.terminate();
            }
            this.tick = Some(this.ticker.ready.wait());
        }
        let done = this
            .done
            .get_or_insert_with(|| this.ticker.done.wait_true());
        let done_ready = Pin::new(done).poll(cx).is_ready();

        // An already delivered tick wins over completion.
        let tick = this.tick.as_mut().map(|tick| Pin::new(tick).poll(cx));
        match tick {
            Some(Poll::Ready(Ok(time))) => {
                this.tick = None;

                Poll::Ready(Some(time))
            }
            Some(Poll::Ready(Err(_))) => this.terminate(),
            _ if done_ready => this.terminate(),
            _ => Poll::Pending,
        }
    }
}

impl fmt::Debug for TickerStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickerStream")
            .field("terminated", &self.terminated)
            .finish_non_exhaustive()
    }
}
