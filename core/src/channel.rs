//! Channel state machine
//!
//! A channel is one logical input source (one joystick). It is either idle,
//! recording its live input to a log, or playing a log back in place of live
//! input. Callers always read input through the channel, whatever its mode.
//!
//! ```text
//!            start_recording                 start_playback
//!   Recording ◄────────────── Idle ──────────────► Playing
//!       │   stop / duration    ▲   stop / exhausted    │
//!       └──────────────────────┴───────────────────────┘
//! ```
//!
//! Getters never perform I/O: they return the snapshot cached by the most
//! recent [`Channel::advance`].

use std::fmt;
use std::sync::Arc;

use crate::error::{ChannelError, LogError};
use crate::live::LiveInput;
use crate::log_store::{LogReader, LogStore, LogWriter};
use crate::snapshot::{ChannelShape, InputSnapshot};

/// Stable handle of a registered channel (its registration index)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub(crate) usize);

impl ChannelId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Current mode of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    Idle,
    Recording,
    Playing,
}

impl fmt::Display for ChannelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::Recording => "recording",
            Self::Playing => "playing",
        })
    }
}

/// Session that ended during a tick
#[derive(Debug)]
pub enum ChannelEvent {
    /// Requested duration reached
    RecordingFinished { log: String, samples: u64 },
    /// Append or close failed; the recording was stopped
    RecordingFailed {
        log: String,
        samples: u64,
        error: LogError,
    },
    /// Log exhausted
    PlaybackFinished { log: String, samples: u64 },
    /// Log unreadable; the channel fell back to live input
    PlaybackFailed {
        log: String,
        samples: u64,
        error: LogError,
    },
}

impl ChannelEvent {
    pub fn log(&self) -> &str {
        match self {
            Self::RecordingFinished { log, .. }
            | Self::RecordingFailed { log, .. }
            | Self::PlaybackFinished { log, .. }
            | Self::PlaybackFailed { log, .. } => log,
        }
    }

    pub fn samples(&self) -> u64 {
        match self {
            Self::RecordingFinished { samples, .. }
            | Self::RecordingFailed { samples, .. }
            | Self::PlaybackFinished { samples, .. }
            | Self::PlaybackFailed { samples, .. } => *samples,
        }
    }

    pub fn error(&self) -> Option<&LogError> {
        match self {
            Self::RecordingFailed { error, .. } | Self::PlaybackFailed { error, .. } => Some(error),
            _ => None,
        }
    }
}

struct RecordingSession {
    writer: LogWriter,
    duration_ticks: u64,
    ticks: u64,
}

struct PlaybackSession {
    reader: LogReader,
    ticks: u64,
}

enum ChannelState {
    Idle,
    Recording(RecordingSession),
    Playing(PlaybackSession),
}

/// What `advance` must do after the per-mode step
enum Step {
    Continue,
    EndRecording(Option<LogError>),
    EndPlayback(Option<LogError>),
}

pub struct Channel {
    name: String,
    shape: ChannelShape,
    store: Arc<dyn LogStore>,
    live: Box<dyn LiveInput>,
    state: ChannelState,
    current: InputSnapshot,
    last_tick: Option<u64>,
    idle_ticks: u64,
}

impl Channel {
    pub fn new(
        name: impl Into<String>,
        shape: ChannelShape,
        store: Arc<dyn LogStore>,
        live: Box<dyn LiveInput>,
    ) -> Self {
        Self {
            name: name.into(),
            shape,
            store,
            live,
            state: ChannelState::Idle,
            current: InputSnapshot::neutral(shape),
            last_tick: None,
            idle_ticks: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> ChannelShape {
        self.shape
    }

    pub fn mode(&self) -> ChannelMode {
        match self.state {
            ChannelState::Idle => ChannelMode::Idle,
            ChannelState::Recording(_) => ChannelMode::Recording,
            ChannelState::Playing(_) => ChannelMode::Playing,
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self.state, ChannelState::Idle)
    }

    /// Ticks advanced since the current mode was entered
    pub fn ticks_in_mode(&self) -> u64 {
        match &self.state {
            ChannelState::Idle => self.idle_ticks,
            ChannelState::Recording(rec) => rec.ticks,
            ChannelState::Playing(play) => play.ticks,
        }
    }

    /// Log name of the active session
    pub fn session_name(&self) -> Option<&str> {
        match &self.state {
            ChannelState::Idle => None,
            ChannelState::Recording(rec) => Some(rec.writer.name()),
            ChannelState::Playing(play) => Some(play.reader.name()),
        }
    }

    /// Ticks left before an active recording stops on its own
    pub fn remaining_ticks(&self) -> Option<u64> {
        match &self.state {
            ChannelState::Recording(rec) => Some(rec.duration_ticks - rec.ticks),
            _ => None,
        }
    }

    /// Index of the last tick this channel advanced on
    pub fn last_tick(&self) -> Option<u64> {
        self.last_tick
    }

    fn ensure_idle(&self) -> Result<(), ChannelError> {
        if self.is_idle() {
            Ok(())
        } else {
            Err(ChannelError::AlreadyActive {
                channel: self.name.clone(),
                mode: self.mode(),
            })
        }
    }

    /// Start recording live input to `log` for `duration_ticks` ticks.
    ///
    /// The log is truncated. Exactly `duration_ticks` samples are written
    /// unless the recording is stopped or fails first.
    pub fn start_recording(&mut self, log: &str, duration_ticks: u64) -> Result<(), ChannelError> {
        self.ensure_idle()?;
        if duration_ticks == 0 {
            return Err(ChannelError::InvalidDuration { ticks: 0 });
        }

        let writer = self.store.open_for_write(log, self.shape)?;
        tracing::info!(
            "Channel '{}' recording to '{}' for {} ticks",
            self.name,
            log,
            duration_ticks
        );
        self.state = ChannelState::Recording(RecordingSession {
            writer,
            duration_ticks,
            ticks: 0,
        });
        Ok(())
    }

    /// Start replaying `log` in place of live input until it is exhausted
    pub fn start_playback(&mut self, log: &str) -> Result<(), ChannelError> {
        self.ensure_idle()?;

        let reader = self.store.open_for_read(log, self.shape)?;
        tracing::info!("Channel '{}' playing back '{}'", self.name, log);
        self.state = ChannelState::Playing(PlaybackSession { reader, ticks: 0 });
        Ok(())
    }

    /// Stop an active recording and close its log.
    ///
    /// No-op unless the channel is recording. The channel is idle on return
    /// even if closing the log fails.
    pub fn stop_recording(&mut self) -> Result<(), ChannelError> {
        if !matches!(self.state, ChannelState::Recording(_)) {
            return Ok(());
        }
        match self.end_recording(None) {
            Some(ChannelEvent::RecordingFailed { error, .. }) => Err(error.into()),
            _ => Ok(()),
        }
    }

    /// Stop an active playback and close its log.
    ///
    /// No-op unless the channel is playing.
    pub fn stop_playback(&mut self) -> Result<(), ChannelError> {
        if matches!(self.state, ChannelState::Playing(_)) {
            self.end_playback(None);
        }
        Ok(())
    }

    /// Advance the channel by one tick.
    ///
    /// Ticks must be strictly increasing; a repeated or older tick index is
    /// ignored. Returns the event for a session that ended on this tick.
    pub fn advance(&mut self, tick: u64) -> Option<ChannelEvent> {
        if let Some(last) = self.last_tick
            && tick <= last
        {
            tracing::warn!(
                "Channel '{}' ignored tick {} (already advanced to {})",
                self.name,
                tick,
                last
            );
            return None;
        }
        self.last_tick = Some(tick);

        let step = match &mut self.state {
            ChannelState::Idle => {
                self.current = sample_live(self.live.as_mut(), self.shape);
                self.idle_ticks += 1;
                Step::Continue
            }
            ChannelState::Recording(rec) => {
                self.current = sample_live(self.live.as_mut(), self.shape);
                match rec.writer.append(&self.current) {
                    Ok(()) => {
                        rec.ticks += 1;
                        if rec.ticks >= rec.duration_ticks {
                            Step::EndRecording(None)
                        } else {
                            Step::Continue
                        }
                    }
                    Err(error) => Step::EndRecording(Some(error)),
                }
            }
            ChannelState::Playing(play) => match play.reader.read_next() {
                Ok(Some(snapshot)) => {
                    play.ticks += 1;
                    self.current = snapshot;
                    Step::Continue
                }
                Ok(None) => Step::EndPlayback(None),
                Err(error) => Step::EndPlayback(Some(error)),
            },
        };

        match step {
            Step::Continue => None,
            Step::EndRecording(error) => self.end_recording(error),
            Step::EndPlayback(error) => {
                let event = self.end_playback(error);
                // Playback is over: this tick already reflects live input
                self.current = sample_live(self.live.as_mut(), self.shape);
                self.idle_ticks = 1;
                event
            }
        }
    }

    /// Close the recording and return to idle
    fn end_recording(&mut self, error: Option<LogError>) -> Option<ChannelEvent> {
        let ChannelState::Recording(rec) = std::mem::replace(&mut self.state, ChannelState::Idle)
        else {
            return None;
        };
        self.idle_ticks = 0;

        let log = rec.writer.name().to_string();
        let samples = rec.ticks;
        let error = match error {
            Some(e) => Some(e),
            None => rec.writer.finish().err(),
        };

        match error {
            None => {
                tracing::info!(
                    "Channel '{}' finished recording '{}' ({} samples)",
                    self.name,
                    log,
                    samples
                );
                Some(ChannelEvent::RecordingFinished { log, samples })
            }
            Some(error) => {
                tracing::warn!(
                    "Channel '{}' stopped recording '{}' after {} samples: {}",
                    self.name,
                    log,
                    samples,
                    error
                );
                Some(ChannelEvent::RecordingFailed {
                    log,
                    samples,
                    error,
                })
            }
        }
    }

    /// Close the playback and return to idle
    fn end_playback(&mut self, error: Option<LogError>) -> Option<ChannelEvent> {
        let ChannelState::Playing(play) = std::mem::replace(&mut self.state, ChannelState::Idle)
        else {
            return None;
        };
        self.idle_ticks = 0;

        let log = play.reader.name().to_string();
        let samples = play.ticks;
        drop(play);

        match error {
            None => {
                tracing::info!(
                    "Channel '{}' finished playing '{}' ({} samples)",
                    self.name,
                    log,
                    samples
                );
                Some(ChannelEvent::PlaybackFinished { log, samples })
            }
            Some(error) => {
                tracing::warn!(
                    "Channel '{}' abandoned playback of '{}' after {} samples: {}; using live input",
                    self.name,
                    log,
                    samples,
                    error
                );
                Some(ChannelEvent::PlaybackFailed {
                    log,
                    samples,
                    error,
                })
            }
        }
    }

    /// Snapshot cached by the last tick
    pub fn current(&self) -> &InputSnapshot {
        &self.current
    }

    /// Axis value for this tick
    pub fn current_axis(&self, index: usize) -> Result<f32, ChannelError> {
        self.current
            .axis(index)
            .ok_or(ChannelError::IndexOutOfRange {
                kind: "axis",
                index,
                len: self.shape.axis_count(),
            })
    }

    /// Button state for this tick
    pub fn current_button(&self, index: usize) -> Result<bool, ChannelError> {
        self.current
            .button(index)
            .ok_or(ChannelError::IndexOutOfRange {
                kind: "button",
                index,
                len: self.shape.button_count(),
            })
    }
}

impl fmt::Debug for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Channel")
            .field("name", &self.name)
            .field("shape", &self.shape)
            .field("mode", &self.mode())
            .field("session", &self.session_name())
            .field("ticks_in_mode", &self.ticks_in_mode())
            .finish()
    }
}

fn sample_live(live: &mut dyn LiveInput, shape: ChannelShape) -> InputSnapshot {
    live.sample().conform(shape)
}
