// src/dispatch/mod.rs

pub mod inline;
pub mod message;
pub mod worker;

use std::time::Duration;

use crate::error::{PlayerError, Result};
use crate::render::{Frame, RasterCanvas};

pub use inline::InlineContext;
pub use message::{Completion, Message, Reply};
pub use worker::{RenderWorker, WorkerThread};

/// Routes render messages to the context that owns the render engine.
///
/// The variant is fixed at construction. Both variants run the same
/// `render::render` over the same inputs; they differ only in where the
/// pixels are produced and whether a frame has to be committed afterwards.
pub enum Dispatcher {
    Threaded {
        worker: WorkerThread,
        visible: RasterCanvas,
    },
    Inline(InlineContext),
}

impl Dispatcher {
    /// Uses a worker thread when `use_worker` is set and a thread can be
    /// spawned, otherwise renders inline. Either way the surface is
    /// initialised to `width x height`.
    pub fn new(use_worker: bool, width: u32, height: u32) -> Result<Self> {
        let mut dispatcher = if use_worker {
            match WorkerThread::spawn() {
                Ok(worker) => Dispatcher::Threaded {
                    worker,
                    visible: RasterCanvas::new(width, height),
                },
                Err(e) => {
                    log::warn!("render worker unavailable ({e}), falling back to inline rendering");
                    Dispatcher::Inline(InlineContext::new())
                }
            }
        } else {
            Dispatcher::Inline(InlineContext::new())
        };
        dispatcher.post(Message::Init { width, height })?;
        Ok(dispatcher)
    }

    pub fn is_threaded(&self) -> bool {
        matches!(self, Dispatcher::Threaded { .. })
    }

    pub fn post(&mut self, msg: Message) -> Result<()> {
        match self {
            Dispatcher::Threaded { worker, .. } => worker.post(msg),
            Dispatcher::Inline(ctx) => ctx.post(msg),
        }
    }

    /// Next reply if one is ready, without blocking.
    pub fn try_recv(&mut self) -> Result<Option<Reply>> {
        match self {
            Dispatcher::Threaded { worker, .. } => worker.try_recv(),
            Dispatcher::Inline(ctx) => Ok(ctx.pop()),
        }
    }

    /// Next reply, waiting up to `timeout` for a worker thread.
    pub fn recv_timeout(&mut self, timeout: Duration) -> Result<Option<Reply>> {
        match self {
            Dispatcher::Threaded { worker, .. } => worker.recv_timeout(timeout),
            Dispatcher::Inline(ctx) => Ok(ctx.pop()),
        }
    }

    /// Takes ownership of a frame produced by the worker thread and makes
    /// it the visible surface. Inline rendering already painted it.
    pub fn commit(&mut self, frame: Frame) {
        match self {
            Dispatcher::Threaded { visible, .. } => visible.commit(frame),
            Dispatcher::Inline(_) => {
                log::warn!("dropping frame committed to an inline context");
            }
        }
    }

    pub fn surface(&self) -> Result<&RasterCanvas> {
        match self {
            Dispatcher::Threaded { visible, .. } => Ok(visible),
            Dispatcher::Inline(ctx) => ctx.surface().ok_or(PlayerError::SurfaceMissing),
        }
    }

    pub fn terminate(&mut self) {
        if let Dispatcher::Threaded { worker, .. } = self {
            worker.terminate();
        }
    }
}
