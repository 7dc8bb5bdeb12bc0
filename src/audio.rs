use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioTrack {
    #[default]
    Meditation,
    Beach,
    Forest,
}

impl AudioTrack {
    pub const ALL: [AudioTrack; 3] = [AudioTrack::Meditation, AudioTrack::Beach, AudioTrack::Forest];

    pub fn as_str(&self) -> &'static str {
        match self {
            AudioTrack::Meditation => "meditation",
            AudioTrack::Beach => "beach",
            AudioTrack::Forest => "forest",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.mp3", self.as_str())
    }

    pub fn next(self) -> Self {
        let i = Self::ALL.iter().position(|t| *t == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }
}

/// Output side of audio playback.
pub trait Player {
    /// Starts `track` from the beginning and loops it until stopped.
    fn start(&mut self, track: AudioTrack) -> Result<()>;

    fn stop(&mut self, track: AudioTrack);
}

impl<P: Player + ?Sized> Player for Box<P> {
    fn start(&mut self, track: AudioTrack) -> Result<()> {
        (**self).start(track)
    }

    fn stop(&mut self, track: AudioTrack) {
        (**self).stop(track)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing(AudioTrack),
}

pub struct AudioController<P: Player> {
    player: P,
    state: PlaybackState,
    last_track: AudioTrack,
}

impl<P: Player> AudioController<P> {
    pub fn new(player: P) -> Self {
        Self {
            player,
            state: PlaybackState::Stopped,
            last_track: AudioTrack::default(),
        }
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        matches!(self.state, PlaybackState::Playing(_))
    }

    /// The playing track, or the one `toggle` would resume.
    pub fn current_track(&self) -> AudioTrack {
        self.last_track
    }

    pub fn play(&mut self, track: AudioTrack) -> Result<()> {
        if let PlaybackState::Playing(current) = self.state {
            self.player.stop(current);
            self.state = PlaybackState::Stopped;
        }

        self.last_track = track;
        self.player.start(track)?;
        self.state = PlaybackState::Playing(track);
        tracing::debug!("Playing {}", track.as_str());
        Ok(())
    }

    pub fn stop(&mut self) {
        if let PlaybackState::Playing(current) = self.state {
            self.player.stop(current);
            self.state = PlaybackState::Stopped;
        }
    }

    pub fn toggle(&mut self) -> Result<()> {
        match self.state {
            PlaybackState::Playing(_) => {
                self.stop();
                Ok(())
            }
            PlaybackState::Stopped => self.play(self.last_track),
        }
    }

    pub fn next_track(&mut self) -> Result<()> {
        self.play(self.last_track.next())
    }

    /// Hiding stops playback; becoming visible again does not resume it.
    pub fn set_visible(&mut self, visible: bool) {
        if !visible && self.is_playing() {
            tracing::debug!("Pausing audio while hidden");
            self.stop();
        }
    }
}

/// Plays tracks by spawning an external player, e.g. `ffplay -loop 0`.
pub struct CommandPlayer {
    sounds_dir: PathBuf,
    command: Vec<String>,
    child: Option<Child>,
}

impl CommandPlayer {
    pub fn new(sounds_dir: impl Into<PathBuf>, command: Vec<String>) -> Self {
        Self {
            sounds_dir: sounds_dir.into(),
            command,
            child: None,
        }
    }

    fn kill_child(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill() {
                tracing::debug!("Audio player already exited: {}", e);
            }
            let _ = child.wait();
        }
    }
}

impl Player for CommandPlayer {
    fn start(&mut self, track: AudioTrack) -> Result<()> {
        self.kill_child();

        let Some((program, args)) = self.command.split_first() else {
            return Err(AppError::Audio("no audio player configured".into()));
        };

        let path = self.sounds_dir.join(track.file_name());
        if !path.exists() {
            return Err(AppError::Audio(format!("missing sound file {}", path.display())));
        }

        let child = Command::new(program)
            .args(args)
            .arg(&path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| AppError::Audio(format!("failed to start {program}: {e}")))?;

        self.child = Some(child);
        Ok(())
    }

    fn stop(&mut self, _track: AudioTrack) {
        self.kill_child();
    }
}

impl Drop for CommandPlayer {
    fn drop(&mut self) {
        self.kill_child();
    }
}
