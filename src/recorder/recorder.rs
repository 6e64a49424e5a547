use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::capture::MediaStream;
use crate::error::{Result, SessionError};

use super::encoder::{negotiate, Codec, Fragment};

/// Depth of the fragment channel between the recorder task and the
/// appender. Fragments are far coarser than frames, so this never fills in
/// practice; if it does, the recorder task simply waits.
const FRAGMENT_CHANNEL_CAPACITY: usize = 64;

/// Capture recorder: encodes a stream into an ordered fragment sequence.
pub struct CaptureRecorder;

impl CaptureRecorder {
    /// Negotiate an encoder and start encoding `stream`.
    ///
    /// Returns the control handle and the fragment receiver. Fragments
    /// arrive in encoding order and the sequence always terminates with an
    /// `is_last` fragment, whether recording stops on request, because the
    /// stream ended, or because the encoder failed.
    pub fn start(
        stream: &MediaStream,
        preferred: Codec,
    ) -> Result<(RecorderHandle, mpsc::Receiver<Fragment>)> {
        let mut encoder = negotiate(preferred, &stream.spec())?;
        let codec = encoder.codec();
        let mut frames = stream.subscribe();

        let (fragment_tx, fragment_rx) = mpsc::channel(FRAGMENT_CHANNEL_CAPACITY);
        let (stop_tx, mut stop_rx) = watch::channel(false);

        info!(?codec, "recorder started");

        let task: JoinHandle<Result<()>> = tokio::spawn(async move {
            let mut sequence: u64 = 0;
            let mut encode_error: Option<SessionError> = None;

            'capture: loop {
                tokio::select! {
                    _ = stop_rx.changed() => break 'capture,
                    result = frames.recv() => match result {
                        Ok(frame) => match encoder.encode(&frame) {
                            Ok(Some(bytes)) => {
                                let fragment = Fragment { sequence, bytes, is_last: false };
                                sequence += 1;
                                if fragment_tx.send(fragment).await.is_err() {
                                    break 'capture;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                error!("encoder rejected frame: {e}");
                                encode_error = Some(e);
                                break 'capture;
                            }
                        },
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            warn!(skipped, "recorder lagged behind capture");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break 'capture,
                    },
                }
            }

            // Drain frames that were already captured before the stop
            // signal won the race, so a stop right after capture loses
            // nothing.
            while encode_error.is_none() {
                let frame = match frames.try_recv() {
                    Ok(frame) => frame,
                    Err(tokio::sync::broadcast::error::TryRecvError::Lagged(skipped)) => {
                        warn!(skipped, "recorder lagged during drain");
                        continue;
                    }
                    Err(_) => break,
                };
                match encoder.encode(&frame) {
                    Ok(Some(bytes)) => {
                        let fragment = Fragment { sequence, bytes, is_last: false };
                        sequence += 1;
                        if fragment_tx.send(fragment).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!("encoder rejected frame during drain: {e}");
                        encode_error = Some(e);
                    }
                }
            }

            // The final fragment is emitted unconditionally: it is the
            // signal the appender and `stop_recording` wait on.
            let tail = match encoder.finish() {
                Ok(bytes) => bytes,
                Err(e) => {
                    error!("encoder flush failed: {e}");
                    if encode_error.is_none() {
                        encode_error = Some(e);
                    }
                    Vec::new()
                }
            };
            let _ = fragment_tx
                .send(Fragment {
                    sequence,
                    bytes: tail,
                    is_last: true,
                })
                .await;

            info!(fragments = sequence + 1, "recorder flushed");
            match encode_error {
                Some(e) => Err(e),
                None => Ok(()),
            }
        });

        Ok((
            RecorderHandle {
                codec,
                stop: stop_tx,
                task: Some(task),
            },
            fragment_rx,
        ))
    }
}

/// Handle to a running recorder. `stop` requests a flush and resolves once
/// the encoder has emitted its final fragment; safe to call repeatedly.
#[derive(Debug)]
pub struct RecorderHandle {
    codec: Codec,
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<Result<()>>>,
}

impl RecorderHandle {
    pub fn codec(&self) -> Codec {
        self.codec
    }

    /// Signal the recorder to flush and wait for it to finish. The final
    /// fragment is guaranteed to have been sent (not necessarily yet
    /// appended — the appender owns that) when this returns.
    pub async fn stop(&mut self) -> Result<()> {
        let _ = self.stop.send(true);
        match self.task.take() {
            Some(task) => match task.await {
                Ok(result) => result,
                Err(e) => Err(SessionError::Encoder(format!("recorder task panicked: {e}"))),
            },
            None => Ok(()),
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.task.is_none()
    }
}
