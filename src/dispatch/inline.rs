// src/dispatch/inline.rs

use std::collections::VecDeque;

use crate::dispatch::message::{Message, Reply};
use crate::dispatch::worker::RenderWorker;
use crate::error::Result;
use crate::render::RasterCanvas;

/// Runs the render engine synchronously on the caller's thread, painting
/// straight onto the visible surface.
pub struct InlineContext {
    worker: RenderWorker,
    replies: VecDeque<Reply>,
}

impl InlineContext {
    pub fn new() -> Self {
        Self {
            worker: RenderWorker::new(false),
            replies: VecDeque::new(),
        }
    }

    /// Handles `msg` before returning. A finished render is queued as a
    /// reply so both execution variants deliver results the same way.
    pub fn post(&mut self, msg: Message) -> Result<()> {
        if let Some(done) = self.worker.handle(msg)? {
            self.replies.push_back(Reply::Rendered(done));
        }
        Ok(())
    }

    pub fn pop(&mut self) -> Option<Reply> {
        self.replies.pop_front()
    }

    pub fn surface(&self) -> Option<&RasterCanvas> {
        self.worker.surface()
    }
}

impl Default for InlineContext {
    fn default() -> Self {
        Self::new()
    }
}
