//! Session manager
//!
//! Owns the channel set and the tick coordinator, and is the single entry
//! point for starting and stopping recordings and playbacks. Requests made
//! between ticks take effect immediately; requests sent through a
//! [`SessionControl`] from another thread are applied at the start of the next
//! tick, before any channel advances.

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use hashbrown::HashMap;

use crate::channel::{Channel, ChannelId};
use crate::config::{ChannelConfig, ReplayConfig, TimingConfig};
use crate::coordinator::{TickCoordinator, TickReport};
use crate::error::ChannelError;
use crate::live::LiveInput;
use crate::log_store::LogStore;
use crate::snapshot::ChannelShape;

/// Deferred request, applied at the start of the next tick
#[derive(Debug, Clone)]
pub enum SessionCommand {
    StartRecording {
        channel: ChannelId,
        name: String,
        duration: Duration,
    },
    StartPlayback {
        channel: ChannelId,
        name: String,
    },
    StopRecording {
        channel: ChannelId,
    },
    StopPlayback {
        channel: ChannelId,
    },
    /// Record every channel to `<session>_<channel>`
    StartRecordingAll {
        session: String,
        duration: Duration,
    },
    /// Play every channel from `<session>_<channel>`
    StartPlaybackAll {
        session: String,
    },
    StopAll,
}

/// Cloneable handle for queueing session commands from another thread
#[derive(Debug, Clone)]
pub struct SessionControl {
    tx: mpsc::Sender<SessionCommand>,
}

impl SessionControl {
    /// Queue a command.
    ///
    /// Returns `false` if the manager has been dropped.
    pub fn submit(&self, command: SessionCommand) -> bool {
        self.tx.send(command).is_ok()
    }

    pub fn start_recording(&self, channel: ChannelId, name: &str, duration: Duration) -> bool {
        self.submit(SessionCommand::StartRecording {
            channel,
            name: name.to_string(),
            duration,
        })
    }

    pub fn start_playback(&self, channel: ChannelId, name: &str) -> bool {
        self.submit(SessionCommand::StartPlayback {
            channel,
            name: name.to_string(),
        })
    }

    pub fn stop_all(&self) -> bool {
        self.submit(SessionCommand::StopAll)
    }
}

pub struct SessionManager {
    store: Arc<dyn LogStore>,
    channels: Vec<Channel>,
    by_name: HashMap<String, ChannelId>,
    coordinator: TickCoordinator,
    timing: TimingConfig,
    tx: mpsc::Sender<SessionCommand>,
    rx: mpsc::Receiver<SessionCommand>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn LogStore>, timing: &TimingConfig) -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            store,
            channels: Vec::new(),
            by_name: HashMap::new(),
            coordinator: TickCoordinator::new(timing.tick_period(), timing.cpu_budget()),
            timing: timing.clone(),
            tx,
            rx,
        }
    }

    /// Build a manager with every configured channel.
    ///
    /// `live` supplies the live input of each channel.
    pub fn from_config(
        config: &ReplayConfig,
        store: Arc<dyn LogStore>,
        mut live: impl FnMut(&ChannelConfig) -> Box<dyn LiveInput>,
    ) -> Result<Self, ChannelError> {
        let mut manager = Self::new(store, &config.timing);
        for channel in &config.channels {
            manager.add_channel(&channel.name, channel.shape(), live(channel))?;
        }
        Ok(manager)
    }

    /// Register a channel. Channels advance in registration order.
    pub fn add_channel(
        &mut self,
        name: &str,
        shape: ChannelShape,
        live: Box<dyn LiveInput>,
    ) -> Result<ChannelId, ChannelError> {
        if self.by_name.contains_key(name) {
            return Err(ChannelError::DuplicateChannel(name.to_string()));
        }
        if shape.record_size() == 0 {
            return Err(ChannelError::EmptyShape(name.to_string()));
        }
        let id = ChannelId(self.channels.len());
        self.channels
            .push(Channel::new(name, shape, Arc::clone(&self.store), live));
        self.by_name.insert(name.to_string(), id);
        tracing::debug!("Registered channel '{}' ({}) as {}", name, shape, id);
        Ok(id)
    }

    pub fn channel(&self, id: ChannelId) -> Result<&Channel, ChannelError> {
        self.channels
            .get(id.0)
            .ok_or_else(|| ChannelError::UnknownChannel(id.to_string()))
    }

    fn channel_mut(&mut self, id: ChannelId) -> Result<&mut Channel, ChannelError> {
        self.channels
            .get_mut(id.0)
            .ok_or_else(|| ChannelError::UnknownChannel(id.to_string()))
    }

    /// Look up a channel handle by name
    pub fn channel_id(&self, name: &str) -> Option<ChannelId> {
        self.by_name.get(name).copied()
    }

    pub fn channel_by_name(&self, name: &str) -> Result<&Channel, ChannelError> {
        let id = self
            .channel_id(name)
            .ok_or_else(|| ChannelError::UnknownChannel(name.to_string()))?;
        self.channel(id)
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn store(&self) -> &Arc<dyn LogStore> {
        &self.store
    }

    pub fn timing(&self) -> &TimingConfig {
        &self.timing
    }

    /// Index of the last completed tick
    pub fn tick_index(&self) -> u64 {
        self.coordinator.tick_index()
    }

    pub fn all_idle(&self) -> bool {
        self.channels.iter().all(Channel::is_idle)
    }

    /// Handle for queueing commands from another thread
    pub fn control(&self) -> SessionControl {
        SessionControl {
            tx: self.tx.clone(),
        }
    }

    /// Log name of one channel's share of a session
    pub fn log_name(session: &str, channel: &str) -> String {
        format!("{}_{}", session, channel)
    }

    /// Record a channel's live input for `duration`, rounded to whole ticks
    pub fn start_recording(
        &mut self,
        id: ChannelId,
        name: &str,
        duration: Duration,
    ) -> Result<(), ChannelError> {
        let ticks = self.timing.ticks_for(duration)?;
        self.start_recording_ticks(id, name, ticks)
    }

    pub fn start_recording_ticks(
        &mut self,
        id: ChannelId,
        name: &str,
        ticks: u64,
    ) -> Result<(), ChannelError> {
        self.ensure_log_free(id, name)?;
        self.channel_mut(id)?.start_recording(name, ticks)
    }

    pub fn start_playback(&mut self, id: ChannelId, name: &str) -> Result<(), ChannelError> {
        self.ensure_log_free(id, name)?;
        self.channel_mut(id)?.start_playback(name)
    }

    /// A log is owned by at most one channel at a time
    fn ensure_log_free(&self, id: ChannelId, log: &str) -> Result<(), ChannelError> {
        let holder = self
            .channels
            .iter()
            .enumerate()
            .find(|(index, channel)| *index != id.0 && channel.session_name() == Some(log));
        match holder {
            Some((_, channel)) => Err(ChannelError::LogInUse {
                log: log.to_string(),
                channel: channel.name().to_string(),
            }),
            None => Ok(()),
        }
    }

    pub fn stop_recording(&mut self, id: ChannelId) -> Result<(), ChannelError> {
        self.channel_mut(id)?.stop_recording()
    }

    pub fn stop_playback(&mut self, id: ChannelId) -> Result<(), ChannelError> {
        self.channel_mut(id)?.stop_playback()
    }

    fn ensure_all_idle(&self) -> Result<(), ChannelError> {
        match self.channels.iter().find(|c| !c.is_idle()) {
            Some(busy) => Err(ChannelError::AlreadyActive {
                channel: busy.name().to_string(),
                mode: busy.mode(),
            }),
            None => Ok(()),
        }
    }

    /// Record every channel to `<session>_<channel>`.
    ///
    /// All channels must be idle. If any channel fails to start, the channels
    /// already started by this call are stopped again.
    pub fn start_recording_all(
        &mut self,
        session: &str,
        duration: Duration,
    ) -> Result<(), ChannelError> {
        let ticks = self.timing.ticks_for(duration)?;
        self.ensure_all_idle()?;

        for index in 0..self.channels.len() {
            let log = Self::log_name(session, self.channels[index].name());
            if let Err(error) = self.channels[index].start_recording(&log, ticks) {
                self.roll_back(index);
                return Err(error);
            }
        }
        tracing::info!(
            "Recording session '{}' on {} channels",
            session,
            self.channels.len()
        );
        Ok(())
    }

    /// Play every channel from `<session>_<channel>`.
    ///
    /// All channels must be idle. If any channel's log cannot be opened, the
    /// channels already started by this call are stopped again.
    pub fn start_playback_all(&mut self, session: &str) -> Result<(), ChannelError> {
        self.ensure_all_idle()?;

        for index in 0..self.channels.len() {
            let log = Self::log_name(session, self.channels[index].name());
            if let Err(error) = self.channels[index].start_playback(&log) {
                self.roll_back(index);
                return Err(error);
            }
        }
        tracing::info!(
            "Playing session '{}' on {} channels",
            session,
            self.channels.len()
        );
        Ok(())
    }

    /// Stop the first `count` channels after a failed batch start
    fn roll_back(&mut self, count: usize) {
        for channel in &mut self.channels[..count] {
            let stopped = channel
                .stop_recording()
                .and_then(|()| channel.stop_playback());
            if let Err(e) = stopped {
                tracing::warn!("Rollback of channel '{}' failed: {}", channel.name(), e);
            }
        }
    }

    /// Stop every active session.
    ///
    /// Every channel is stopped even if one fails; the first error is returned.
    pub fn stop_all(&mut self) -> Result<(), ChannelError> {
        let mut first_error = None;
        for channel in &mut self.channels {
            let stopped = channel
                .stop_recording()
                .and_then(|()| channel.stop_playback());
            if let Err(e) = stopped {
                tracing::warn!("Failed to stop channel '{}': {}", channel.name(), e);
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Start playback of a selected session, if any.
    ///
    /// `None` means "don't play back". Returns whether playback started.
    pub fn apply_playback_selection(
        &mut self,
        selection: Option<&str>,
    ) -> Result<bool, ChannelError> {
        match selection {
            Some(session) => self.start_playback_all(session).map(|()| true),
            None => Ok(false),
        }
    }

    /// Start recording a selected session, if any.
    ///
    /// `None` means "don't record". Returns whether recording started.
    pub fn apply_recording_selection(
        &mut self,
        selection: Option<&str>,
        duration: Duration,
    ) -> Result<bool, ChannelError> {
        match selection {
            Some(session) => self.start_recording_all(session, duration).map(|()| true),
            None => Ok(false),
        }
    }

    fn apply(&mut self, command: &SessionCommand) -> Result<(), ChannelError> {
        match command {
            SessionCommand::StartRecording {
                channel,
                name,
                duration,
            } => self.start_recording(*channel, name, *duration),
            SessionCommand::StartPlayback { channel, name } => self.start_playback(*channel, name),
            SessionCommand::StopRecording { channel } => self.stop_recording(*channel),
            SessionCommand::StopPlayback { channel } => self.stop_playback(*channel),
            SessionCommand::StartRecordingAll { session, duration } => {
                self.start_recording_all(session, *duration)
            }
            SessionCommand::StartPlaybackAll { session } => self.start_playback_all(session),
            SessionCommand::StopAll => self.stop_all(),
        }
    }

    /// Run one control-loop tick.
    ///
    /// Queued commands are applied first, then every channel advances once.
    /// Nothing here returns an error: failed commands and sessions that ended
    /// are reported in the [`TickReport`].
    pub fn tick(&mut self) -> TickReport {
        let mut rejected = Vec::new();
        while let Ok(command) = self.rx.try_recv() {
            if let Err(error) = self.apply(&command) {
                tracing::warn!("Rejected {:?}: {}", command, error);
                rejected.push((command, error));
            }
        }

        let mut report = self.coordinator.advance(&mut self.channels);
        report.rejected = rejected;
        report
    }
}
