//! Notifier Boundary
//!
//! Hands finished frames and sound cues to the platform. The tick loop only
//! ever calls [`Notifier::notify`], which must return immediately; platform
//! calls run elsewhere and their failures are logged, never returned.
//!
//! [`DispatchNotifier`] is the standard implementation: a bounded queue
//! drained by a blocking worker that owns the [`Platform`].

use std::path::PathBuf;

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use crate::render::RenderFrame;

/// Queue depth between the tick loop and the platform worker
pub const DEFAULT_DISPATCH_CAPACITY: usize = 8;

/// Sound to play on state entry
#[derive(Clone, Debug, PartialEq)]
pub struct SoundCue {
    /// Sound file
    pub path: PathBuf,
    /// Playback volume (0-1)
    pub volume: f32,
}

/// Failures reported by platform primitives
#[derive(Debug, Error)]
pub enum PlatformError {
    /// The window could not be updated
    #[error("display update failed: {0}")]
    Display(String),

    /// The sound could not be played
    #[error("audio playback failed: {0}")]
    Audio(String),

    /// Underlying IO failure
    #[error("platform IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// OS display and audio primitives
///
/// Calls may block; they run on the dispatch worker, never on the tick loop.
pub trait Platform: Send + 'static {
    /// Show a frame
    ///
    /// # Errors
    ///
    /// Any display failure; it is logged and the frame is skipped.
    fn show(&mut self, frame: &RenderFrame) -> Result<(), PlatformError>;

    /// Start playing a sound without waiting for it
    ///
    /// # Errors
    ///
    /// Any audio failure; it is logged and the cue is dropped.
    fn play(&mut self, cue: &SoundCue) -> Result<(), PlatformError>;

    /// Release the display
    ///
    /// # Errors
    ///
    /// Any failure releasing resources; it is logged.
    fn hide(&mut self) -> Result<(), PlatformError> {
        Ok(())
    }
}

/// Receiver of frames and sound cues
pub trait Notifier: Send {
    /// Hand over a frame and an optional sound; never blocks
    fn notify(&mut self, frame: RenderFrame, sound: Option<SoundCue>);

    /// Hand over a sound with no frame (overlay disabled); never blocks
    fn play(&mut self, cue: SoundCue);

    /// Release any held display resource
    fn close(&mut self) {}
}

enum Dispatch {
    Frame(Box<RenderFrame>),
    Sound(SoundCue),
}

/// Non-blocking notifier backed by a platform worker
#[derive(Debug)]
pub struct DispatchNotifier {
    tx: Option<mpsc::Sender<Dispatch>>,
    dropped_frames: u64,
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Frame(frame) => write!(f, "Frame({})", frame.state),
            Self::Sound(cue) => write!(f, "Sound({})", cue.path.display()),
        }
    }
}

impl DispatchNotifier {
    /// Start the worker for `platform`
    ///
    /// Must be called inside a tokio runtime. The returned handle finishes
    /// once the notifier is closed or dropped and the queue has drained.
    pub fn spawn<P: Platform>(mut platform: P, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<Dispatch>(capacity.max(1));

        let worker = tokio::task::spawn_blocking(move || {
            while let Some(msg) = rx.blocking_recv() {
                let result = match &msg {
                    Dispatch::Frame(frame) => platform.show(frame),
                    Dispatch::Sound(cue) => platform.play(cue),
                };
                if let Err(e) = result {
                    warn!(error = %e, ?msg, "Platform call failed");
                }
            }
            // Channel closed: every sender is gone, release the display
            if let Err(e) = platform.hide() {
                warn!(error = %e, "Failed to release display");
            }
            debug!("Dispatch worker stopped");
        });

        (
            Self {
                tx: Some(tx),
                dropped_frames: 0,
            },
            worker,
        )
    }

    /// Frames skipped because the worker was behind
    #[must_use]
    pub fn dropped_frames(&self) -> u64 {
        self.dropped_frames
    }

    fn send(&mut self, msg: Dispatch) -> bool {
        let Some(tx) = &self.tx else {
            return false;
        };
        match tx.try_send(msg) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(msg)) => {
                trace!(?msg, "Dispatch queue full");
                false
            }
            Err(mpsc::error::TrySendError::Closed(msg)) => {
                warn!(?msg, "Dispatch worker gone, dropping");
                self.tx = None;
                false
            }
        }
    }
}

impl Notifier for DispatchNotifier {
    fn notify(&mut self, frame: RenderFrame, sound: Option<SoundCue>) {
        if let Some(cue) = sound {
            self.play(cue);
        }
        // A later frame supersedes this one, so a full queue just skips it
        if !self.send(Dispatch::Frame(Box::new(frame))) {
            self.dropped_frames += 1;
        }
    }

    fn play(&mut self, cue: SoundCue) {
        let path = cue.path.clone();
        if !self.send(Dispatch::Sound(cue)) {
            debug!(path = %path.display(), "Sound cue dropped");
        }
    }

    fn close(&mut self) {
        if self.tx.take().is_some() {
            info!(dropped_frames = self.dropped_frames, "Notifier closed");
        }
    }
}

impl Drop for DispatchNotifier {
    fn drop(&mut self) {
        self.close();
    }
}

/// Platform that records frames and cues to the log
///
/// Used by the daemon when no window system is attached.
#[derive(Debug, Default)]
pub struct LogPlatform {
    last_state: Option<crate::state::CompanionState>,
}

impl Platform for LogPlatform {
    fn show(&mut self, frame: &RenderFrame) -> Result<(), PlatformError> {
        if self.last_state != Some(frame.state) {
            info!(
                state = %frame.state,
                asset = ?frame.asset,
                bubble = frame.bubble.as_ref().map(|b| b.text.as_str()),
                "Display state changed"
            );
            self.last_state = Some(frame.state);
        }
        trace!(
            offset_x = frame.offset_x,
            offset_y = frame.offset_y,
            scale = frame.scale,
            rotation = frame.rotation,
            "Frame"
        );
        Ok(())
    }

    fn play(&mut self, cue: &SoundCue) -> Result<(), PlatformError> {
        info!(path = %cue.path.display(), volume = cue.volume, "Play sound");
        Ok(())
    }

    fn hide(&mut self) -> Result<(), PlatformError> {
        info!("Display released");
        self.last_state = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use crate::render::{RenderInput, RenderPipeline};
    use crate::settings::Settings;
    use crate::state::CompanionState;

    #[derive(Clone, Default)]
    struct Recorder {
        calls: Arc<Mutex<Vec<String>>>,
        fail: bool,
    }

    impl Platform for Recorder {
        fn show(&mut self, frame: &RenderFrame) -> Result<(), PlatformError> {
            self.calls.lock().unwrap().push(format!("show {}", frame.state));
            if self.fail {
                return Err(PlatformError::Display("no window".into()));
            }
            Ok(())
        }

        fn play(&mut self, cue: &SoundCue) -> Result<(), PlatformError> {
            self.calls.lock().unwrap().push(format!("play {}", cue.path.display()));
            if self.fail {
                return Err(PlatformError::Audio("no device".into()));
            }
            Ok(())
        }

        fn hide(&mut self) -> Result<(), PlatformError> {
            self.calls.lock().unwrap().push("hide".into());
            Ok(())
        }
    }

    fn frame(state: CompanionState) -> RenderFrame {
        RenderPipeline::new(Arc::new(Settings::default()))
            .render(&RenderInput::new(state, Duration::ZERO, Duration::ZERO))
    }

    #[tokio::test]
    async fn test_dispatch_reaches_platform_in_order() {
        let recorder = Recorder::default();
        let calls = Arc::clone(&recorder.calls);
        let (mut notifier, worker) = DispatchNotifier::spawn(recorder, 16);

        notifier.notify(
            frame(CompanionState::Success),
            Some(SoundCue {
                path: PathBuf::from("success.wav"),
                volume: 0.5,
            }),
        );
        notifier.close();
        worker.await.unwrap();

        assert_eq!(
            *calls.lock().unwrap(),
            vec!["play success.wav", "show success", "hide"]
        );
    }

    #[tokio::test]
    async fn test_platform_failures_are_swallowed() {
        let recorder = Recorder {
            fail: true,
            ..Recorder::default()
        };
        let calls = Arc::clone(&recorder.calls);
        let (mut notifier, worker) = DispatchNotifier::spawn(recorder, 4);

        notifier.notify(frame(CompanionState::Error), None);
        notifier.play(SoundCue {
            path: PathBuf::from("error.wav"),
            volume: 1.0,
        });
        notifier.notify(frame(CompanionState::Idle), None);
        drop(notifier);
        worker.await.unwrap();

        assert_eq!(calls.lock().unwrap().len(), 4);
    }

    struct SlowPlatform {
        hidden: Arc<Mutex<bool>>,
    }

    impl Platform for SlowPlatform {
        fn show(&mut self, _frame: &RenderFrame) -> Result<(), PlatformError> {
            std::thread::sleep(Duration::from_millis(50));
            Ok(())
        }

        fn play(&mut self, _cue: &SoundCue) -> Result<(), PlatformError> {
            Ok(())
        }

        fn hide(&mut self) -> Result<(), PlatformError> {
            *self.hidden.lock().unwrap() = true;
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_close_releases_display_when_queue_is_full() {
        let hidden = Arc::new(Mutex::new(false));
        let platform = SlowPlatform {
            hidden: Arc::clone(&hidden),
        };
        let (mut notifier, worker) = DispatchNotifier::spawn(platform, 1);

        for _ in 0..4 {
            notifier.notify(frame(CompanionState::Working), None);
        }
        assert!(notifier.dropped_frames() > 0);
        notifier.close();
        worker.await.unwrap();

        assert!(*hidden.lock().unwrap());
    }

    #[tokio::test]
    async fn test_notify_after_close_is_noop() {
        let (mut notifier, worker) = DispatchNotifier::spawn(LogPlatform::default(), 1);
        notifier.close();
        notifier.notify(frame(CompanionState::Idle), None);
        assert_eq!(notifier.dropped_frames(), 1);
        worker.await.unwrap();
    }
}
