// src/player.rs

use serde_json::{json, Value};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::{Duration, Instant};

use crate::decoder;
use crate::dispatch::{Dispatcher, Message, Reply};
use crate::error::{PlayerError, Result};
use crate::export;
use crate::options::Options;
use crate::registry::SurfaceRegistry;
use crate::render::{RasterCanvas, RenderRequest, RenderResult};
use crate::store::{DecodedAudio, SampleStore};
use crate::throttle::Throttle;

/// How long `flush` waits for the worker thread before giving up.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// New sample data reached the render context.
    Decode {
        sample_rate: u32,
        channels: usize,
        duration: f64,
    },
    /// A render pass completed with this geometry.
    Render(RenderResult),
    /// The frame of the last `Render` is now on the visible surface.
    Finish,
    Error(String),
}

type Listener = Box<dyn FnMut(&PlayerEvent) + Send>;

/// A waveform view bound to one target surface.
///
/// All state changes funnel into [`WaveformPlayer::update`], which is
/// throttled to `refreshDelay`. Hosts call [`WaveformPlayer::tick`] from
/// their loop so a throttled request and worker replies get picked up.
pub struct WaveformPlayer {
    target: String,
    registry: SurfaceRegistry,
    options: Options,
    current_time: f64,
    store: SampleStore,
    dispatcher: Dispatcher,
    throttle: Throttle<RenderRequest>,
    next_seq: u64,
    last_committed: u64,
    last_result: Option<RenderResult>,
    listeners: Vec<Listener>,
    pending_decode: Option<Receiver<anyhow::Result<DecodedAudio>>>,
    destroyed: bool,
}

impl std::fmt::Debug for WaveformPlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WaveformPlayer")
            .field("target", &self.target)
            .field("current_time", &self.current_time)
            .field("destroyed", &self.destroyed)
            .finish_non_exhaustive()
    }
}

impl WaveformPlayer {
    /// Mounts a player on `target`. Fails before creating any surface if
    /// the options are invalid or the target is already taken.
    pub fn mount(registry: &SurfaceRegistry, target: &str, options: Options) -> Result<Self> {
        options.validate()?;
        registry.claim(target)?;

        let dispatcher = match Dispatcher::new(options.use_worker, options.width, options.height) {
            Ok(d) => d,
            Err(e) => {
                registry.release(target);
                return Err(e);
            }
        };
        log::info!(
            "mounted waveform player on '{}' ({}x{}, {})",
            target,
            options.width,
            options.height,
            if dispatcher.is_threaded() { "threaded" } else { "inline" }
        );

        let mut store = SampleStore::new();
        store.select(options.channel);

        let mut player = Self {
            target: target.to_string(),
            registry: registry.clone(),
            throttle: Throttle::new(Duration::from_millis(options.refresh_delay)),
            options,
            current_time: 0.0,
            store,
            dispatcher,
            next_seq: 0,
            last_committed: 0,
            last_result: None,
            listeners: Vec::new(),
            pending_decode: None,
            destroyed: false,
        };
        player.update()?;
        Ok(player)
    }

    /// Like [`WaveformPlayer::mount`], taking a flat key/value option set
    /// that is merged over the defaults.
    pub fn mount_with(registry: &SurfaceRegistry, target: &str, patch: &Value) -> Result<Self> {
        let options = Options::default().merged(patch)?;
        Self::mount(registry, target, options)
    }

    fn ensure_alive(&self) -> Result<()> {
        if self.destroyed {
            return Err(PlayerError::Destroyed);
        }
        Ok(())
    }

    pub fn options(&self) -> &Options {
        &self.options
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    /// Length of the loaded audio, infinite until something is decoded.
    pub fn media_duration(&self) -> f64 {
        self.store.duration_secs().unwrap_or(f64::INFINITY)
    }

    pub fn is_threaded(&self) -> bool {
        self.dispatcher.is_threaded()
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_loading(&self) -> bool {
        self.pending_decode.is_some()
    }

    /// Geometry of the most recently committed frame.
    pub fn last_result(&self) -> Option<&RenderResult> {
        self.last_result.as_ref()
    }

    pub fn on(&mut self, listener: impl FnMut(&PlayerEvent) + Send + 'static) {
        self.listeners.push(Box::new(listener));
    }

    fn emit(&mut self, event: PlayerEvent) {
        for listener in &mut self.listeners {
            listener(&event);
        }
    }

    /// Validates and applies a flat key/value patch, then re-renders.
    pub fn set_options(&mut self, patch: &Value) -> Result<()> {
        self.lazy_set_options(patch)?;
        self.update()
    }

    /// Same as [`WaveformPlayer::set_options`] without scheduling a render.
    pub fn lazy_set_options(&mut self, patch: &Value) -> Result<()> {
        self.ensure_alive()?;
        let next = self.options.merged(patch)?;
        if next.use_worker != self.options.use_worker {
            log::debug!("useWorker only takes effect at mount time");
        }
        let channel_changed = next.channel != self.options.channel;
        self.throttle.set_interval(Duration::from_millis(next.refresh_delay));
        self.options = next;
        if channel_changed {
            self.store.select(self.options.channel);
            self.push_samples()?;
        }
        Ok(())
    }

    fn push_samples(&mut self) -> Result<()> {
        let samples = self.store.current();
        self.dispatcher.post(Message::Decode { samples })
    }

    /// Replaces the audio with already-decoded channel data.
    pub fn load_audio(&mut self, audio: DecodedAudio) -> Result<()> {
        self.ensure_alive()?;
        let event = PlayerEvent::Decode {
            sample_rate: audio.sample_rate,
            channels: audio.channels.len(),
            duration: audio.duration_secs(),
        };
        self.store.replace(audio);
        self.store.select(self.options.channel);
        self.push_samples()?;
        self.emit(event);
        self.update()
    }

    /// Starts decoding `path` in the background. The audio is applied by a
    /// later [`WaveformPlayer::tick`] or [`WaveformPlayer::finish_loading`].
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        self.ensure_alive()?;
        let path = path.as_ref().to_path_buf();
        if path.as_os_str().is_empty() {
            return Err(PlayerError::InvalidArgument("the load target is empty".to_string()));
        }
        log::info!("loading {}", path.display());
        let (_handle, rx) = decoder::spawn_decode(path);
        self.pending_decode = Some(rx);
        Ok(())
    }

    fn take_decoded(&mut self, received: std::result::Result<anyhow::Result<DecodedAudio>, ()>) -> Result<()> {
        self.pending_decode = None;
        match received {
            Ok(Ok(audio)) => self.load_audio(audio),
            Ok(Err(e)) => {
                let message = PlayerError::Decode(e.to_string()).to_string();
                self.emit(PlayerEvent::Error(message));
                Ok(())
            }
            Err(()) => {
                self.emit(PlayerEvent::Error("decode thread exited without a result".to_string()));
                Ok(())
            }
        }
    }

    fn poll_decode(&mut self) -> Result<()> {
        let received = match &self.pending_decode {
            Some(rx) => match rx.try_recv() {
                Ok(r) => Ok(r),
                Err(TryRecvError::Empty) => return Ok(()),
                Err(TryRecvError::Disconnected) => Err(()),
            },
            None => return Ok(()),
        };
        self.take_decoded(received)
    }

    /// Blocks until a pending [`WaveformPlayer::load_file`] finishes or
    /// `timeout` passes. Returns whether audio is loaded afterwards.
    pub fn finish_loading(&mut self, timeout: Duration) -> Result<bool> {
        self.ensure_alive()?;
        let received = match &self.pending_decode {
            Some(rx) => match rx.recv_timeout(timeout) {
                Ok(r) => Ok(r),
                Err(RecvTimeoutError::Timeout) => return Ok(false),
                Err(RecvTimeoutError::Disconnected) => Err(()),
            },
            None => return Ok(self.store.is_loaded()),
        };
        self.take_decoded(received)?;
        Ok(self.store.is_loaded())
    }

    fn clamp_time(&self, second: f64) -> Result<f64> {
        if !second.is_finite() {
            return Err(PlayerError::InvalidArgument(format!(
                "seek expects a finite number of seconds, but got {second}"
            )));
        }
        Ok(second.clamp(0.0, self.media_duration()))
    }

    /// Moves the playhead, clamped to `[0, media_duration]`.
    pub fn seek(&mut self, second: f64) -> Result<()> {
        self.ensure_alive()?;
        self.current_time = self.clamp_time(second)?;
        self.update()
    }

    /// Transport time feed. Same clamping as [`WaveformPlayer::seek`].
    pub fn set_current_time(&mut self, second: f64) -> Result<()> {
        self.seek(second)
    }

    /// Seeks to the media time under surface column `x` of the last
    /// committed frame. Returns `false` when `x` falls in a padding band or
    /// nothing has been rendered yet.
    pub fn seek_at(&mut self, x: f64) -> Result<bool> {
        self.ensure_alive()?;
        let Some(time) = self.last_result.and_then(|r| r.time_at(x)) else {
            return Ok(false);
        };
        self.seek(time)?;
        Ok(true)
    }

    pub fn change_channel(&mut self, channel: usize) -> Result<()> {
        self.set_options(&json!({ "channel": channel }))
    }

    /// Forgets the decoded audio; the wave layer goes back to silence.
    pub fn reset(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.pending_decode = None;
        self.store.clear();
        self.push_samples()?;
        self.update()
    }

    /// Requests a render with the current state, subject to throttling.
    pub fn update(&mut self) -> Result<()> {
        self.ensure_alive()?;
        let request = RenderRequest::new(&self.options, self.current_time);
        if let Some(request) = self.throttle.call(request) {
            self.dispatch(request)?;
        }
        self.drain()
    }

    /// Drives pending work: finished decodes, a due throttled render and
    /// worker replies.
    pub fn tick(&mut self) -> Result<()> {
        self.ensure_alive()?;
        self.poll_decode()?;
        if let Some(request) = self.throttle.poll() {
            self.dispatch(request)?;
        }
        self.drain()
    }

    /// When the next throttled render is due, if one is waiting.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.throttle.deadline()
    }

    /// Renders any pending request now and waits until the newest request
    /// has been committed.
    pub fn flush(&mut self) -> Result<Option<RenderResult>> {
        self.ensure_alive()?;
        if let Some(request) = self.throttle.flush() {
            self.dispatch(request)?;
        }
        while self.last_committed < self.next_seq {
            match self.dispatcher.recv_timeout(FLUSH_TIMEOUT)? {
                Some(reply) => self.handle_reply(reply),
                None => {
                    log::warn!("timed out waiting for render #{}", self.next_seq);
                    break;
                }
            }
        }
        Ok(self.last_result)
    }

    fn dispatch(&mut self, request: RenderRequest) -> Result<()> {
        self.next_seq += 1;
        log::debug!("dispatching render #{} at t={:.3}", self.next_seq, request.current_time);
        self.dispatcher.post(Message::Update { seq: self.next_seq, request })
    }

    fn drain(&mut self) -> Result<()> {
        while let Some(reply) = self.dispatcher.try_recv()? {
            self.handle_reply(reply);
        }
        Ok(())
    }

    fn handle_reply(&mut self, reply: Reply) {
        if self.destroyed {
            return;
        }
        match reply {
            Reply::Rendered(done) => {
                if done.seq < self.last_committed {
                    log::warn!("discarding stale render #{} (have #{})", done.seq, self.last_committed);
                    return;
                }
                if let Some(frame) = done.frame {
                    self.dispatcher.commit(frame);
                }
                self.last_committed = done.seq;
                self.last_result = Some(done.result);
                self.emit(PlayerEvent::Render(done.result));
                self.emit(PlayerEvent::Finish);
            }
            Reply::Failed { seq, error } => {
                // A failed pass still answers its request.
                if let Some(seq) = seq {
                    self.last_committed = self.last_committed.max(seq);
                }
                self.emit(PlayerEvent::Error(error));
            }
        }
    }

    /// The visible surface holding the last committed frame.
    pub fn surface(&self) -> Result<&RasterCanvas> {
        self.ensure_alive()?;
        self.dispatcher.surface()
    }

    /// Writes the visible frame as `<unix-millis>.jpeg` into `dir`.
    pub fn export_image(&self, dir: impl AsRef<Path>) -> Result<PathBuf> {
        let path = export::save_jpeg(self.surface()?.image(), dir.as_ref())?;
        log::info!("exported frame to {}", path.display());
        Ok(path)
    }

    /// The visible frame as JPEG bytes.
    pub fn export_image_as_blob(&self) -> Result<Vec<u8>> {
        export::encode_jpeg(self.surface()?.image())
    }

    /// The visible frame as a `data:image/jpeg;base64,` URL.
    pub fn export_image_as_url(&self) -> Result<String> {
        export::jpeg_data_url(self.surface()?.image())
    }

    /// Stops the render context and frees the target. Idempotent.
    pub fn destroy(&mut self) {
        if self.destroyed {
            return;
        }
        self.destroyed = true;
        self.throttle.cancel();
        self.pending_decode = None;
        self.dispatcher.terminate();
        self.registry.release(&self.target);
        self.listeners.clear();
        log::info!("destroyed waveform player on '{}'", self.target);
    }
}

impl Drop for WaveformPlayer {
    fn drop(&mut self) {
        self.destroy();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::Completion;
    use std::sync::{Arc, Mutex};

    fn inline_options() -> Options {
        Options {
            use_worker: false,
            width: 300,
            height: 100,
            duration: 3,
            padding: 1,
            ..Options::default()
        }
    }

    #[test]
    fn mount_renders_first_frame_inline() {
        let registry = SurfaceRegistry::new();
        let player = WaveformPlayer::mount(&registry, "view", inline_options()).unwrap();
        assert!(!player.is_threaded());
        let r = player.last_result().unwrap();
        assert_eq!(r.grid_num, 32.0);
        assert_eq!(r.begin_time, 0.0);
        assert!(registry.is_mounted("view"));
    }

    #[test]
    fn invalid_options_never_claim_the_target() {
        let registry = SurfaceRegistry::new();
        let bad = Options { duration: 0, ..inline_options() };
        assert!(WaveformPlayer::mount(&registry, "view", bad).is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn rejected_patch_leaves_options_untouched() {
        let registry = SurfaceRegistry::new();
        let mut player = WaveformPlayer::mount(&registry, "view", inline_options()).unwrap();
        let before = player.options().clone();
        assert!(player.set_options(&json!({ "padding": 5, "pixelRatio": 0.5 })).is_err());
        assert_eq!(player.options(), &before);
    }

    #[test]
    fn seek_clamps_to_media_duration() {
        let registry = SurfaceRegistry::new();
        let mut player = WaveformPlayer::mount(&registry, "view", inline_options()).unwrap();
        player.seek(-3.0).unwrap();
        assert_eq!(player.current_time(), 0.0);
        assert!(player.seek(f64::NAN).is_err());

        player.load_audio(DecodedAudio::new(vec![vec![0.0; 800]], 100)).unwrap();
        player.seek(42.0).unwrap();
        assert_eq!(player.current_time(), 8.0);
    }

    #[test]
    fn events_follow_each_committed_render() {
        let registry = SurfaceRegistry::new();
        let mut player = WaveformPlayer::mount(&registry, "view", inline_options()).unwrap();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        player.on(move |e| sink.lock().unwrap().push(e.clone()));

        player.load_audio(DecodedAudio::new(vec![vec![0.5; 400]], 100)).unwrap();
        player.seek(7.5).unwrap();
        player.flush().unwrap();

        let events = seen.lock().unwrap();
        assert!(matches!(events[0], PlayerEvent::Decode { sample_rate: 100, channels: 1, .. }));
        let last_render = events
            .iter()
            .rev()
            .find_map(|e| match e {
                PlayerEvent::Render(r) => Some(*r),
                _ => None,
            })
            .unwrap();
        assert_eq!(last_render.begin_time, 3.0);
        assert_eq!(last_render.current_time, 4.0);
        assert_eq!(events.last(), Some(&PlayerEvent::Finish));
    }

    #[test]
    fn older_completion_never_replaces_a_newer_frame() {
        let registry = SurfaceRegistry::new();
        let opts = Options { use_worker: true, ..inline_options() };
        let mut player = WaveformPlayer::mount(&registry, "view", opts).unwrap();
        player.load_audio(DecodedAudio::new(vec![vec![0.5; 400]], 100)).unwrap();
        player.seek(2.0).unwrap();
        player.flush().unwrap();
        assert!(player.last_committed >= 2);

        let committed = *player.last_result().unwrap();
        let pixels = player.surface().unwrap().image().clone();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        player.on(move |e| sink.lock().unwrap().push(e.clone()));

        let late = Completion {
            seq: player.last_committed - 1,
            result: RenderResult { current_time: 0.25, begin_time: 0.0, ..committed },
            frame: Some(RasterCanvas::new(7, 7).transfer_frame()),
        };
        player.handle_reply(Reply::Rendered(late));

        assert_eq!(player.last_result(), Some(&committed));
        assert_eq!(player.surface().unwrap().image(), &pixels);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn seek_at_maps_columns_to_media_time() {
        let registry = SurfaceRegistry::new();
        let mut player = WaveformPlayer::mount(&registry, "view", inline_options()).unwrap();
        player.load_audio(DecodedAudio::new(vec![vec![0.0; 900]], 100)).unwrap();
        player.seek(4.0).unwrap();
        player.flush().unwrap();

        // 300px over 32 columns; the wave area starts one column in.
        let r = *player.last_result().unwrap();
        assert_eq!(r.begin_time, 3.0);
        let x = r.wave_left() + 15.0 * r.grid_gap;
        assert!(player.seek_at(x).unwrap());
        assert!((player.current_time() - 4.5).abs() < 1e-9);

        assert!(!player.seek_at(1.0).unwrap());
        assert!((player.current_time() - 4.5).abs() < 1e-9);
    }

    #[test]
    fn destroy_releases_target_and_blocks_further_calls() {
        let registry = SurfaceRegistry::new();
        let mut player = WaveformPlayer::mount(&registry, "view", inline_options()).unwrap();
        assert!(matches!(
            WaveformPlayer::mount(&registry, "view", inline_options()),
            Err(PlayerError::AlreadyMounted(_))
        ));
        player.destroy();
        assert!(!registry.is_mounted("view"));
        assert!(matches!(player.update(), Err(PlayerError::Destroyed)));
        assert!(matches!(player.export_image_as_blob(), Err(PlayerError::Destroyed)));
        let _again = WaveformPlayer::mount(&registry, "view", inline_options()).unwrap();
    }
}
