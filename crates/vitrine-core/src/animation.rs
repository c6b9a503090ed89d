//! Animation clip selection
//!
//! Reconciles what the catalog declares about a product's animations with
//! the clips the loaded asset actually contains.

use serde::{Deserialize, Serialize};

use crate::product::AnimationMeta;

/// Direction for stepping through the clip list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleDirection {
    Next,
    Previous,
}

/// Pick the clip that plays automatically after a load.
///
/// Rules, first match wins:
/// 1. auto-play disabled or no clips: nothing plays
/// 2. the declared default, when non-empty and present in `clips`
/// 3. the first clip in loader order
pub fn select_default_animation<S: AsRef<str>>(
    clips: &[S],
    declared_default: Option<&str>,
    auto_play: bool,
) -> Option<String> {
    if !auto_play || clips.is_empty() {
        return None;
    }

    if let Some(wanted) = declared_default.filter(|d| !d.is_empty()) {
        if let Some(found) = clips.iter().find(|c| c.as_ref() == wanted) {
            return Some(found.as_ref().to_string());
        }
    }

    clips.first().map(|c| c.as_ref().to_string())
}

/// Step to the neighbouring clip with wraparound.
///
/// When `current` is absent or unknown, `Next` resolves to the first clip
/// and `Previous` to the last. An empty list yields `None`.
pub fn cycle_animation<S: AsRef<str>>(
    clips: &[S],
    current: Option<&str>,
    direction: CycleDirection,
) -> Option<String> {
    let len = clips.len();
    if len == 0 {
        return None;
    }

    let position = current.and_then(|cur| clips.iter().position(|c| c.as_ref() == cur));
    let idx = match (position, direction) {
        (Some(i), CycleDirection::Next) => (i + 1) % len,
        (Some(i), CycleDirection::Previous) => (i + len - 1) % len,
        (None, CycleDirection::Next) => 0,
        (None, CycleDirection::Previous) => len - 1,
    };

    Some(clips[idx].as_ref().to_string())
}

/// Clip selection and play/stop state for one loaded model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnimationState {
    clips: Vec<String>,
    current: Option<String>,
    playing: bool,
}

impl AnimationState {
    /// Apply the default selection policy to a freshly loaded clip list
    pub fn from_clips(clips: Vec<String>, meta: &AnimationMeta) -> Self {
        let current = select_default_animation(&clips, meta.declared_default(), meta.auto_play);
        let playing = current.is_some();
        Self {
            clips,
            current,
            playing,
        }
    }

    pub fn clips(&self) -> &[String] {
        &self.clips
    }

    /// Selected clip, whether or not it is playing
    pub fn selected(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn is_playing(&self) -> bool {
        self.playing && self.current.is_some()
    }

    /// Clip that should currently be driving the model
    pub fn active(&self) -> Option<&str> {
        if self.playing {
            self.current.as_deref()
        } else {
            None
        }
    }

    /// Play a specific clip, ignoring the auto-play policy.
    ///
    /// Unknown names clear the selection and stop playback. Returns whether
    /// the clip was found.
    pub fn play(&mut self, name: &str) -> bool {
        if self.clips.iter().any(|c| c == name) {
            self.current = Some(name.to_string());
            self.playing = true;
            true
        } else {
            self.current = None;
            self.playing = false;
            false
        }
    }

    /// Step to the neighbouring clip and play it. No-op without clips.
    pub fn cycle(&mut self, direction: CycleDirection) {
        if let Some(next) = cycle_animation(&self.clips, self.current.as_deref(), direction) {
            self.current = Some(next);
            self.playing = true;
        }
    }

    pub fn next(&mut self) {
        self.cycle(CycleDirection::Next);
    }

    pub fn previous(&mut self) {
        self.cycle(CycleDirection::Previous);
    }

    /// Stop playback, keeping the selection
    pub fn stop(&mut self) {
        self.playing = false;
    }
}
