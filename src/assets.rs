use std::collections::HashMap;

use glam::Vec3;
use log::{debug, warn};

use crate::shell::ShellCommand;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadState {
    Pending,
    Ready,
}

/// A playback the cache owes the shell once its sound arrives.
#[derive(Debug, Clone, Copy, PartialEq)]
struct DeferredPlay {
    position: Vec3,
    looping: bool,
}

#[derive(Debug)]
struct SoundEntry {
    state: LoadState,
    deferred: Option<DeferredPlay>,
}

/// Get-or-load cache for shell-loaded assets, keyed by path.
///
/// The first request for a sound issues a load command. Requests against a
/// still-pending sound overwrite a single remembered playback, which is
/// released when the shell reports the load complete. Requests against a
/// ready sound play immediately.
#[derive(Debug, Default)]
pub struct AssetCache {
    sounds: HashMap<String, SoundEntry>,
    font_ready: bool,
}

impl AssetCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn font_ready(&self) -> bool {
        self.font_ready
    }

    pub fn set_font_ready(&mut self) {
        self.font_ready = true;
    }

    pub fn is_ready(&self, path: &str) -> bool {
        self.sounds
            .get(path)
            .map_or(false, |entry| entry.state == LoadState::Ready)
    }

    /// Plays a one-shot sound now or as soon as it has loaded.
    pub fn play(&mut self, path: &str, position: Vec3) -> Vec<ShellCommand> {
        self.request(path, position, false)
    }

    /// Starts a positional loop now or as soon as it has loaded.
    pub fn start_loop(&mut self, path: &str, position: Vec3) -> Vec<ShellCommand> {
        self.request(path, position, true)
    }

    fn request(&mut self, path: &str, position: Vec3, looping: bool) -> Vec<ShellCommand> {
        match self.sounds.get_mut(path) {
            Some(entry) if entry.state == LoadState::Ready => {
                vec![play_command(path, position, looping)]
            }
            Some(entry) => {
                // Only the latest playback survives the wait.
                entry.deferred = Some(DeferredPlay { position, looping });
                Vec::new()
            }
            None => {
                self.sounds.insert(
                    path.to_string(),
                    SoundEntry {
                        state: LoadState::Pending,
                        deferred: Some(DeferredPlay { position, looping }),
                    },
                );
                vec![ShellCommand::LoadSound {
                    path: path.to_string(),
                }]
            }
        }
    }

    /// Marks a sound ready and releases its remembered playback.
    pub fn sound_loaded(&mut self, path: &str) -> Vec<ShellCommand> {
        let entry = self.sounds.entry(path.to_string()).or_insert_with(|| {
            debug!("sound {path:?} loaded without a request");
            SoundEntry {
                state: LoadState::Pending,
                deferred: None,
            }
        });
        entry.state = LoadState::Ready;
        match entry.deferred.take() {
            Some(play) => vec![play_command(path, play.position, play.looping)],
            None => Vec::new(),
        }
    }

    /// Forgets a failed sound so a later request can retry the load.
    pub fn sound_failed(&mut self, path: &str) {
        warn!("sound {path:?} failed to load");
        self.sounds.remove(path);
    }

    /// Drops any playback still waiting on this sound's load.
    pub fn cancel_deferred(&mut self, path: &str) {
        if let Some(entry) = self.sounds.get_mut(path) {
            entry.deferred = None;
        }
    }
}

fn play_command(path: &str, position: Vec3, looping: bool) -> ShellCommand {
    if looping {
        ShellCommand::StartLoop {
            path: path.to_string(),
            position,
        }
    } else {
        ShellCommand::PlaySound {
            path: path.to_string(),
            position,
        }
    }
}
