// src/dispatch/worker.rs

use std::io;
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::dispatch::message::{Completion, Message, Reply};
use crate::error::{PlayerError, Result};
use crate::render::{self, Canvas, RasterCanvas};
use crate::store::SampleBuffer;

/// Render engine state owned by whichever context executes renders.
pub struct RenderWorker {
    canvas: Option<RasterCanvas>,
    samples: SampleBuffer,
    transfer: bool,
}

impl RenderWorker {
    /// `transfer` hands each finished frame out of the worker instead of
    /// leaving it on the worker's own surface.
    pub fn new(transfer: bool) -> Self {
        Self {
            canvas: None,
            samples: SampleBuffer::default(),
            transfer,
        }
    }

    pub fn surface(&self) -> Option<&RasterCanvas> {
        self.canvas.as_ref()
    }

    pub fn handle(&mut self, msg: Message) -> Result<Option<Completion>> {
        match msg {
            Message::Init { width, height } => {
                self.canvas = Some(RasterCanvas::new(width, height));
                Ok(None)
            }
            Message::Decode { samples } => {
                log::debug!("render context received {} samples @ {} Hz", samples.len(), samples.sample_rate());
                self.samples = samples;
                Ok(None)
            }
            Message::Update { seq, request } => {
                let canvas = self.canvas.as_mut().ok_or(PlayerError::SurfaceMissing)?;
                if canvas.width() != request.width || canvas.height() != request.height {
                    canvas.resize(request.width, request.height);
                }
                let result = render::render(canvas, &self.samples, &request);
                let frame = self.transfer.then(|| canvas.transfer_frame());
                Ok(Some(Completion { seq, result, frame }))
            }
            Message::Shutdown => Ok(None),
        }
    }
}

/// Render context running on a dedicated thread. Communicates only through
/// the two channels; frames come back by value.
pub struct WorkerThread {
    tx: Sender<Message>,
    rx: Receiver<Reply>,
    handle: Option<JoinHandle<()>>,
}

impl WorkerThread {
    pub fn spawn() -> io::Result<Self> {
        let (tx, rx_msg) = channel::<Message>();
        let (tx_reply, rx) = channel::<Reply>();

        let handle = thread::Builder::new()
            .name("wf-render".to_string())
            .spawn(move || run(rx_msg, tx_reply))?;

        log::info!("render worker thread started");
        Ok(Self {
            tx,
            rx,
            handle: Some(handle),
        })
    }

    pub fn post(&self, msg: Message) -> Result<()> {
        self.tx.send(msg).map_err(|_| PlayerError::WorkerDisconnected)
    }

    pub fn try_recv(&self) -> Result<Option<Reply>> {
        match self.rx.try_recv() {
            Ok(reply) => Ok(Some(reply)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(PlayerError::WorkerDisconnected),
        }
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<Reply>> {
        match self.rx.recv_timeout(timeout) {
            Ok(reply) => Ok(Some(reply)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(PlayerError::WorkerDisconnected),
        }
    }

    pub fn terminate(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = self.tx.send(Message::Shutdown);
            if handle.join().is_err() {
                log::error!("render worker thread panicked");
            }
            log::info!("render worker thread stopped");
        }
    }
}

impl Drop for WorkerThread {
    fn drop(&mut self) {
        self.terminate();
    }
}

fn run(rx: Receiver<Message>, tx: Sender<Reply>) {
    let mut worker = RenderWorker::new(true);

    loop {
        // Block for the next message, then take whatever else has queued
        // up so a burst of updates renders only once.
        let first = match rx.recv() {
            Ok(m) => m,
            Err(_) => break,
        };
        let mut batch = vec![first];
        while let Ok(next) = rx.try_recv() {
            batch.push(next);
        }
        let last_update = batch.iter().rposition(|m| matches!(m, Message::Update { .. }));

        for (i, msg) in batch.into_iter().enumerate() {
            let seq = match &msg {
                Message::Shutdown => return,
                Message::Update { seq, .. } if Some(i) != last_update => {
                    log::debug!("update #{seq} superseded before rendering");
                    continue;
                }
                Message::Update { seq, .. } => Some(*seq),
                _ => None,
            };
            let reply = match worker.handle(msg) {
                Ok(Some(done)) => Reply::Rendered(done),
                Ok(None) => continue,
                Err(e) => {
                    log::error!("render worker failed: {e}");
                    Reply::Failed { seq, error: e.to_string() }
                }
            };
            if tx.send(reply).is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::Options;
    use crate::render::RenderRequest;

    #[test]
    fn update_before_init_is_rejected_without_drawing() {
        let mut worker = RenderWorker::new(false);
        let req = RenderRequest::new(&Options::default(), 0.0);
        let err = worker.handle(Message::Update { seq: 1, request: req }).unwrap_err();
        assert!(matches!(err, PlayerError::SurfaceMissing));
        assert!(worker.surface().is_none());
    }

    #[test]
    fn update_resizes_surface_to_request() {
        let mut worker = RenderWorker::new(false);
        worker.handle(Message::Init { width: 10, height: 10 }).unwrap();
        let opts = Options { width: 300, height: 120, ..Options::default() };
        let done = worker
            .handle(Message::Update { seq: 7, request: RenderRequest::new(&opts, 0.0) })
            .unwrap()
            .unwrap();
        assert_eq!(done.seq, 7);
        assert!(done.frame.is_none());
        let surface = worker.surface().unwrap();
        assert_eq!((surface.width(), surface.height()), (300, 120));
    }

    #[test]
    fn thread_returns_transferred_frame() {
        let mut thread = WorkerThread::spawn().unwrap();
        let opts = Options { width: 200, height: 80, ..Options::default() };
        thread.post(Message::Init { width: 200, height: 80 }).unwrap();
        thread
            .post(Message::Update { seq: 1, request: RenderRequest::new(&opts, 0.0) })
            .unwrap();
        let reply = thread.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        let Reply::Rendered(done) = reply else { panic!("render failed") };
        let frame = done.frame.unwrap();
        assert_eq!((frame.width(), frame.height()), (200, 80));
        assert_eq!(done.result.width, 200);
        thread.terminate();
        assert!(thread.post(Message::Shutdown).is_err());
    }

    #[test]
    fn backlog_renders_only_the_newest_update() {
        let (tx, rx) = channel();
        let (reply_tx, reply_rx) = channel();
        let opts = Options { width: 120, height: 40, ..Options::default() };
        tx.send(Message::Init { width: 120, height: 40 }).unwrap();
        for seq in 1..=5 {
            tx.send(Message::Update { seq, request: RenderRequest::new(&opts, seq as f64) }).unwrap();
        }
        tx.send(Message::Decode { samples: SampleBuffer::new(vec![0.5f32; 100], 100) }).unwrap();
        drop(tx);

        run(rx, reply_tx);

        let replies: Vec<Reply> = reply_rx.try_iter().collect();
        assert_eq!(replies.len(), 1);
        let Reply::Rendered(done) = &replies[0] else { panic!("render failed") };
        assert_eq!(done.seq, 5);
        assert_eq!(done.result.current_time, 5.0);
        assert!(done.frame.is_some());
    }

    #[test]
    fn thread_reports_update_before_init() {
        let thread = WorkerThread::spawn().unwrap();
        thread
            .post(Message::Update { seq: 3, request: RenderRequest::new(&Options::default(), 0.0) })
            .unwrap();
        let reply = thread.recv_timeout(Duration::from_secs(5)).unwrap().unwrap();
        assert!(matches!(reply, Reply::Failed { seq: Some(3), .. }));
    }
}
