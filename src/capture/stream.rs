use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, watch};
use tracing::info;

use super::backend::{AudioFrame, StreamSpec};

/// Broadcast capacity for in-flight frames. Consumers that fall further
/// behind than this observe a `Lagged` error and skip ahead.
const FRAME_CHANNEL_CAPACITY: usize = 256;

/// An acquired capture stream, exclusively owned by one recording session.
///
/// Consumers (the activity detector, the recorder) hold only broadcast
/// subscriptions; the session alone decides when the stream is released.
/// `release()` is idempotent and also runs on drop, so the underlying
/// capture stops on every exit path.
pub struct MediaStream {
    spec: StreamSpec,
    frames: broadcast::Sender<AudioFrame>,
    ended: Arc<watch::Sender<bool>>,
    shutdown: Arc<AtomicBool>,
}

impl MediaStream {
    /// Subscribe to the stream's PCM frames.
    pub fn subscribe(&self) -> broadcast::Receiver<AudioFrame> {
        self.frames.subscribe()
    }

    pub fn spec(&self) -> StreamSpec {
        self.spec
    }

    /// Correct the advertised spec once the device reports what it actually
    /// granted. Backends call this before handing the stream out.
    pub(crate) fn set_spec(&mut self, spec: StreamSpec) {
        self.spec = spec;
    }

    /// Watch channel that flips to `true` when the stream ends, either
    /// because the device was lost or because the stream was released.
    pub fn ended(&self) -> watch::Receiver<bool> {
        self.ended.subscribe()
    }

    pub fn has_ended(&self) -> bool {
        *self.ended.borrow()
    }

    /// Stop the underlying capture. Idempotent; every track is torn down by
    /// the producing backend once it observes the shutdown flag.
    pub fn release(&self) {
        if !self.shutdown.swap(true, Ordering::SeqCst) {
            let _ = self.ended.send(true);
            info!("media stream released");
        }
    }
}

impl Drop for MediaStream {
    fn drop(&mut self) {
        self.release();
    }
}

/// Producer side of a [`MediaStream`], held by the capture backend (or by a
/// test harness standing in for one).
pub struct StreamDriver {
    frames: broadcast::Sender<AudioFrame>,
    ended: Arc<watch::Sender<bool>>,
    shutdown: Arc<AtomicBool>,
}

impl StreamDriver {
    /// Push a frame to all current subscribers. Frames pushed while nobody
    /// is subscribed are dropped, matching live capture semantics.
    pub fn push(&self, frame: AudioFrame) {
        let _ = self.frames.send(frame);
    }

    /// Whether the owning session has released the stream.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Signal that the device was lost or the capture finished on its own.
    pub fn mark_ended(&self) {
        let _ = self.ended.send(true);
    }
}

impl Drop for StreamDriver {
    fn drop(&mut self) {
        // A vanished producer is indistinguishable from device loss.
        let _ = self.ended.send(true);
    }
}

/// Create a connected stream/driver pair.
pub fn stream_pair(spec: StreamSpec) -> (MediaStream, StreamDriver) {
    let (frames, _) = broadcast::channel(FRAME_CHANNEL_CAPACITY);
    let (ended_tx, _) = watch::channel(false);
    let ended = Arc::new(ended_tx);
    let shutdown = Arc::new(AtomicBool::new(false));

    let stream = MediaStream {
        spec,
        frames: frames.clone(),
        ended: Arc::clone(&ended),
        shutdown: Arc::clone(&shutdown),
    };
    let driver = StreamDriver {
        frames,
        ended,
        shutdown,
    };

    (stream, driver)
}
