// src/lib.rs

pub mod color;
pub mod decoder;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod options;
mod player;
pub mod registry;
pub mod render;
pub mod store;
pub mod throttle;

pub use color::Color;
pub use error::{PlayerError, Result};
pub use options::Options;
pub use player::{PlayerEvent, WaveformPlayer};
pub use registry::SurfaceRegistry;
pub use render::{RenderRequest, RenderResult};
pub use store::{DecodedAudio, SampleBuffer, SampleStore};
