use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::activity::{ActivityDetector, DetectorHandle, LevelMeter};
use crate::artifact::{append_fragment, Artifact};
use crate::capture::{CaptureBackend, DeviceRequest, MediaStream};
use crate::error::{Result, SessionError};
use crate::gateway::{Episode, EpisodeStatus, PersistenceGateway};
use crate::recorder::{CaptureRecorder, Codec, RecorderHandle};
use crate::script::{InterviewScript, Question};

use super::config::SessionConfig;
use super::snapshot::SessionSnapshot;
use super::state::SessionState;

/// Lock a std mutex, recovering from poison: the guarded data stays valid
/// even if a previous holder panicked.
fn lock<T>(mutex: &StdMutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// The session's resource slots, cloneable so the device-loss watchdog can
/// run the same cleanup path as user-driven lifecycle calls. Whoever takes
/// a slot first owns that piece of the cleanup; the other path finds the
/// slot empty and moves on.
#[derive(Clone)]
struct SessionResources {
    state: Arc<StdMutex<SessionState>>,
    stream: Arc<Mutex<Option<MediaStream>>>,
    detector: Arc<Mutex<Option<DetectorHandle>>>,
    recorder: Arc<Mutex<Option<RecorderHandle>>>,
    appender: Arc<Mutex<Option<JoinHandle<()>>>>,
    chunks: Arc<StdMutex<Vec<Vec<u8>>>>,
    meter: Arc<LevelMeter>,
}

impl SessionResources {
    fn new() -> Self {
        Self {
            state: Arc::new(StdMutex::new(SessionState::Idle)),
            stream: Arc::new(Mutex::new(None)),
            detector: Arc::new(Mutex::new(None)),
            recorder: Arc::new(Mutex::new(None)),
            appender: Arc::new(Mutex::new(None)),
            chunks: Arc::new(StdMutex::new(Vec::new())),
            meter: Arc::new(LevelMeter::new()),
        }
    }

    fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    fn set_state(&self, next: SessionState) {
        *lock(&self.state) = next;
    }

    async fn stop_detector(&self) {
        if let Some(mut handle) = self.detector.lock().await.take() {
            handle.stop().await;
        }
    }

    /// Flush the recorder and wait for the appender to observe the final
    /// fragment. Returns the recorder's result when one was active.
    async fn flush_recorder(&self) -> Option<Result<()>> {
        let taken = self.recorder.lock().await.take();
        let result = match taken {
            Some(mut handle) => Some(handle.stop().await),
            None => None,
        };
        if let Some(appender) = self.appender.lock().await.take() {
            if let Err(e) = appender.await {
                error!("fragment appender task failed: {e}");
            }
        }
        result
    }

    async fn release_stream(&self) {
        if let Some(stream) = self.stream.lock().await.take() {
            stream.release();
        }
    }

    /// Unconditional cleanup: detector, then recorder (flushing, which
    /// preserves captured fragments), then the stream.
    async fn release_all(&self) {
        self.stop_detector().await;
        let _ = self.flush_recorder().await;
        self.release_stream().await;
    }
}

/// Live recording session controller.
///
/// Owns the capture stream, the activity detector loop, and the recorder
/// for one recording attempt, and exposes the lifecycle state machine. The
/// HTTP surface and the persistence gateway interact with the session only
/// through this type.
pub struct RecordingSession {
    episode: Episode,
    attempt_id: Uuid,
    config: SessionConfig,
    started_at: DateTime<Utc>,
    backend: Arc<dyn CaptureBackend>,
    gateway: Arc<dyn PersistenceGateway>,
    script: StdMutex<InterviewScript>,
    negotiated: StdMutex<Option<Codec>>,
    watchdog: Mutex<Option<JoinHandle<()>>>,
    resources: SessionResources,
}

impl RecordingSession {
    /// Create a fresh session for one recording attempt. Questions arrive
    /// from the gateway once, at session start, and are immutable after.
    pub fn new(
        episode: Episode,
        questions: Vec<Question>,
        config: SessionConfig,
        backend: Arc<dyn CaptureBackend>,
        gateway: Arc<dyn PersistenceGateway>,
    ) -> Self {
        let attempt_id = Uuid::new_v4();
        info!(
            episode = %episode.id,
            %attempt_id,
            questions = questions.len(),
            "recording session created"
        );
        Self {
            episode,
            attempt_id,
            config,
            started_at: Utc::now(),
            backend,
            gateway,
            script: StdMutex::new(InterviewScript::new(questions)),
            negotiated: StdMutex::new(None),
            watchdog: Mutex::new(None),
            resources: SessionResources::new(),
        }
    }

    pub fn episode(&self) -> &Episode {
        &self.episode
    }

    pub fn state(&self) -> SessionState {
        self.resources.state()
    }

    /// Acquire devices and start the activity detector.
    ///
    /// Valid from `Idle` and, for retry, from `Failed`. On failure every
    /// partially acquired resource is released before the transition to
    /// `Failed` completes.
    pub async fn initialize(&self) -> Result<()> {
        {
            let mut state = lock(&self.resources.state);
            match *state {
                SessionState::Idle | SessionState::Failed => {
                    *state = SessionState::Initializing;
                }
                state => {
                    return Err(SessionError::InvalidTransition {
                        state,
                        operation: "initialize",
                    })
                }
            }
        }

        info!(episode = %self.episode.id, "initializing recording session");
        let request = DeviceRequest {
            wants_video: self.episode.wants_video(),
        };

        match self.backend.acquire(request).await {
            Ok(stream) => {
                let detector = ActivityDetector::start(&stream, Arc::clone(&self.resources.meter));
                *self.resources.stream.lock().await = Some(stream);
                *self.resources.detector.lock().await = Some(detector);
                self.resources.set_state(SessionState::Ready);
                info!(episode = %self.episode.id, "session ready");
                Ok(())
            }
            Err(e) => {
                // Acquisition failed before anything was held.
                self.resources.set_state(SessionState::Failed);
                warn!(episode = %self.episode.id, "initialization failed: {e}");
                Err(e)
            }
        }
    }

    /// Start the recorder over the acquired stream.
    ///
    /// Only valid from `Ready`. Persists `status=recording` best-effort; a
    /// gateway failure is logged and does not block local recording. An
    /// `UnsupportedFormat` outcome is fatal: resources are released and the
    /// session moves to `Failed`.
    pub async fn start_recording(&self) -> Result<()> {
        {
            let mut state = lock(&self.resources.state);
            match *state {
                SessionState::Ready => *state = SessionState::Recording,
                state => {
                    return Err(SessionError::InvalidTransition {
                        state,
                        operation: "start recording",
                    })
                }
            }
        }

        let started = {
            let stream = self.resources.stream.lock().await;
            match stream.as_ref() {
                Some(stream) => CaptureRecorder::start(stream, self.config.preferred_codec),
                None => Err(SessionError::DeviceUnavailable(
                    "no acquired stream".to_string(),
                )),
            }
        };

        let (handle, mut fragments) = match started {
            Ok(pair) => pair,
            Err(e) => {
                error!(episode = %self.episode.id, "recorder start failed: {e}");
                self.abort_watchdog().await;
                self.resources.release_all().await;
                self.resources.set_state(SessionState::Failed);
                return Err(e);
            }
        };

        *lock(&self.negotiated) = Some(handle.codec());
        *self.resources.recorder.lock().await = Some(handle);

        // Appender: sole writer to `chunks`. It exits exactly when the
        // final fragment has been appended, which is the signal
        // `stop_recording` awaits.
        let chunks = Arc::clone(&self.resources.chunks);
        let appender = tokio::spawn(async move {
            while let Some(fragment) = fragments.recv().await {
                let last = fragment.is_last;
                {
                    let mut chunks = lock(&chunks);
                    append_fragment(&mut chunks, fragment);
                }
                if last {
                    break;
                }
            }
        });
        *self.resources.appender.lock().await = Some(appender);

        self.spawn_watchdog().await;

        if let Err(e) = self
            .gateway
            .update_episode_status(&self.episode.id, EpisodeStatus::Recording)
            .await
        {
            warn!(
                episode = %self.episode.id,
                "status update failed, recording continues: {e}"
            );
        }

        info!(episode = %self.episode.id, codec = ?self.codec(), "recording started");
        Ok(())
    }

    /// Watch for the stream ending underneath an active recording. Device
    /// loss is fatal: the watchdog runs the full cleanup (flushing the
    /// recorder so captured fragments survive) and fails the session.
    async fn spawn_watchdog(&self) {
        let mut ended = match self.resources.stream.lock().await.as_ref() {
            Some(stream) => stream.ended(),
            None => return,
        };

        let resources = self.resources.clone();
        let episode_id = self.episode.id.clone();
        let watchdog = tokio::spawn(async move {
            loop {
                if *ended.borrow() {
                    break;
                }
                // A dropped sender is indistinguishable from device loss.
                if ended.changed().await.is_err() {
                    break;
                }
            }

            // A normal release flips the same signal after the state has
            // already moved on; only a loss during recording is fatal.
            if resources.state() != SessionState::Recording {
                return;
            }
            error!(episode = %episode_id, "capture stream ended mid-recording");
            resources.release_all().await;
            let mut state = lock(&resources.state);
            if *state == SessionState::Recording {
                *state = SessionState::Failed;
            }
        });

        *self.watchdog.lock().await = Some(watchdog);
    }

    async fn abort_watchdog(&self) {
        if let Some(watchdog) = self.watchdog.lock().await.take() {
            watchdog.abort();
        }
    }

    /// Stop the recorder and finalize `chunks`.
    ///
    /// Only valid from `Recording`. Resolves after the encoder has flushed
    /// and the appender has observed the final fragment — never earlier, so
    /// the artifact can not be truncated by a fast caller.
    pub async fn stop_recording(&self) -> Result<()> {
        let state = self.resources.state();
        if state != SessionState::Recording {
            return Err(SessionError::InvalidTransition {
                state,
                operation: "stop recording",
            });
        }

        let result = self.resources.flush_recorder().await;
        self.abort_watchdog().await;

        {
            // The watchdog may have failed the session while the flush was
            // in flight; a loss-triggered `Failed` wins over `Stopped`.
            let mut state = lock(&self.resources.state);
            if *state == SessionState::Recording {
                *state = SessionState::Stopped;
            }
        }

        info!(
            episode = %self.episode.id,
            chunks = self.chunk_count(),
            "recording stopped"
        );

        match result {
            Some(Err(e)) => Err(e),
            _ => Ok(()),
        }
    }

    /// Persist `status=completed`, save the artifact locally, and finish
    /// the session. Only valid from `Stopped`.
    ///
    /// The artifact is saved but never uploaded here; the saved path is
    /// returned so the surrounding application can take it from there.
    pub async fn complete(&self) -> Result<PathBuf> {
        let state = self.resources.state();
        if state != SessionState::Stopped {
            return Err(SessionError::InvalidTransition {
                state,
                operation: "complete",
            });
        }

        if let Err(e) = self
            .gateway
            .update_episode_status(&self.episode.id, EpisodeStatus::Completed)
            .await
        {
            warn!(
                episode = %self.episode.id,
                "completed status update failed, artifact still saved: {e}"
            );
        }

        let codec = self.codec().unwrap_or(self.config.preferred_codec);
        let artifact = {
            let chunks = lock(&self.resources.chunks);
            Artifact::from_chunks(codec, &chunks)
        };
        let path = artifact.save(&self.config.recordings_dir, &self.episode.title)?;

        self.resources.set_state(SessionState::Completed);
        info!(episode = %self.episode.id, path = %path.display(), "session completed");
        Ok(path)
    }

    /// Unconditional cleanup, callable from any state; invoked on view
    /// exit. Stops the detector, flushes the recorder if one is active
    /// (exit during `Recording` is a forced stop, not a leak), and releases
    /// the stream.
    pub async fn teardown(&self) {
        info!(episode = %self.episode.id, state = ?self.state(), "tearing down session");
        self.abort_watchdog().await;
        let was_recording = self.resources.state() == SessionState::Recording;
        self.resources.release_all().await;
        if was_recording {
            let mut state = lock(&self.resources.state);
            if *state == SessionState::Recording {
                *state = SessionState::Stopped;
            }
        }
    }

    // ------------------------------------------------------------------
    // Question navigation — independent of recording state by design: the
    // host may look ahead mid-take.
    // ------------------------------------------------------------------

    pub fn current_question(&self) -> Option<Question> {
        lock(&self.script).current().cloned()
    }

    pub fn next_question(&self) -> Option<Question> {
        lock(&self.script).next().cloned()
    }

    pub fn previous_question(&self) -> Option<Question> {
        lock(&self.script).previous().cloned()
    }

    pub fn jump_to_question(&self, index: usize) -> Result<Question> {
        lock(&self.script).jump_to(index).map(Question::clone)
    }

    // ------------------------------------------------------------------
    // Observation
    // ------------------------------------------------------------------

    pub fn chunk_count(&self) -> usize {
        lock(&self.resources.chunks).len()
    }

    /// Copy of the captured fragments, in arrival order.
    pub fn chunks(&self) -> Vec<Vec<u8>> {
        lock(&self.resources.chunks).clone()
    }

    /// Codec negotiated at recorder start, once recording has begun.
    pub fn codec(&self) -> Option<Codec> {
        *lock(&self.negotiated)
    }

    pub fn audio_level(&self) -> f32 {
        self.resources.meter.level()
    }

    pub fn is_speaking(&self) -> bool {
        self.resources.meter.is_speaking()
    }

    /// Whether any acquired resource is still held. `teardown()` brings
    /// this to `false` from every state.
    pub async fn holds_resources(&self) -> bool {
        self.resources.stream.lock().await.is_some()
            || self.resources.detector.lock().await.is_some()
            || self.resources.recorder.lock().await.is_some()
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let (current_question_index, question_count) = {
            let script = lock(&self.script);
            (script.current_index(), script.len())
        };
        SessionSnapshot {
            episode_id: self.episode.id.clone(),
            attempt_id: self.attempt_id,
            state: self.state(),
            started_at: self.started_at,
            audio_level: self.resources.meter.level(),
            is_speaking: self.resources.meter.is_speaking(),
            current_question_index,
            question_count,
            chunk_count: self.chunk_count(),
            codec: self.codec(),
        }
    }
}
