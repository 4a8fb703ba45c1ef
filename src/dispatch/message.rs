// src/dispatch/message.rs

use crate::render::{Frame, RenderRequest, RenderResult};
use crate::store::SampleBuffer;

/// Commands a render context understands. Delivered FIFO, no acks.
#[derive(Debug, Clone)]
pub enum Message {
    /// Allocate the raster surface.
    Init { width: u32, height: u32 },
    /// Replace the sample store contents.
    Decode { samples: SampleBuffer },
    /// Run one full render pass.
    Update { seq: u64, request: RenderRequest },
    Shutdown,
}

/// A finished render pass. `frame` is only set when the pixels were
/// produced in another context and must be committed by the receiver.
#[derive(Debug)]
pub struct Completion {
    pub seq: u64,
    pub result: RenderResult,
    pub frame: Option<Frame>,
}

#[derive(Debug)]
pub enum Reply {
    Rendered(Completion),
    Failed { seq: Option<u64>, error: String },
}
