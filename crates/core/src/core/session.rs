//! The session object: settings, engine and tally owned together.
//!
//! Everything a front end needs goes through here; nothing is global, so any
//! number of sessions can live side by side (one per test, one per client).

use std::collections::HashSet;
use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[cfg(feature = "serde")]
use crate::codec;
use crate::engine::{CellSource, History, SequenceEngine, StimulusFrame};
use crate::error::{Error, Result};
use crate::grid::GridShape;
use crate::keymap;
use crate::prng::Prng;
use crate::settings::{Settings, ThemePreset, MAX_INTENSITY};
use crate::stats::SessionStats;

/// Outcome of a player's "match" response for one box.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(tag = "result", rename_all = "snake_case"))]
pub enum Verdict {
    Match { box_index: usize },
    Miss { box_index: usize },
    /// Not yet applicable (too early, unknown box, no session). Never an error.
    Refused { reason: String },
}

impl Verdict {
    pub fn is_refused(&self) -> bool {
        matches!(self, Verdict::Refused { .. })
    }

    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match { .. })
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Match { box_index } => write!(f, "Box {}: MATCH!", box_index + 1),
            Verdict::Miss { box_index } => write!(f, "Box {}: MISS!", box_index + 1),
            Verdict::Refused { reason } => write!(f, "not yet applicable: {reason}"),
        }
    }
}

/// Read-only view handed to front ends.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SessionSnapshot {
    pub running: bool,
    pub turn: Option<u64>,
    pub step: u64,
    pub settings: Settings,
    /// Settings the current or last session runs with.
    pub session_settings: Settings,
    pub stats: SessionStats,
    pub last_frame: Option<StimulusFrame>,
}

#[derive(Debug)]
pub struct Session<R = Prng> {
    settings: Settings,
    engine: SequenceEngine<R>,
    stats: SessionStats,
    answered_turn: Option<u64>,
    answered_boxes: HashSet<usize>,
    epoch: u64,
}

impl Session<Prng> {
    pub fn new(settings: Settings) -> Self {
        Self::with_source(settings, Prng::from_time())
    }

    pub fn with_seed(settings: Settings, seed: u64) -> Self {
        Self::with_source(settings, Prng::new(seed))
    }
}

impl Default for Session<Prng> {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl<R: CellSource> Session<R> {
    pub fn with_source(settings: Settings, source: R) -> Self {
        Self {
            settings,
            engine: SequenceEngine::with_source(source),
            stats: SessionStats::new(),
            answered_turn: None,
            answered_boxes: HashSet::new(),
            epoch: 0,
        }
    }

    /// Editable settings; used by the next [`start_session`](Self::start_session).
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn engine(&self) -> &SequenceEngine<R> {
        &self.engine
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn history(&self) -> &History {
        self.engine.history()
    }

    pub fn is_running(&self) -> bool {
        self.engine.is_running()
    }

    pub fn current_turn(&self) -> Option<u64> {
        self.engine.current_turn()
    }

    /// One-based step number of the newest turn; `0` before any turn.
    pub fn step_count(&self) -> u64 {
        self.engine.current_turn().map_or(0, |t| t + 1)
    }

    /// Shape of the running (or last) session, falling back to the editable
    /// settings before the first start.
    pub fn shape(&self) -> Result<GridShape> {
        match self.engine.shape() {
            Some(shape) => Ok(shape),
            None => self.settings.shape(),
        }
    }

    /// Changes every time a session starts or stops. A tick scheduled under an
    /// older epoch must not produce a turn.
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Replace the settings wholesale. Nothing changes on a validation failure.
    ///
    /// A new grid shape cannot apply to a running session, so it stops it.
    pub fn set_settings(&mut self, settings: Settings) -> Result<()> {
        settings.validate()?;
        let reshaped = !self.engine.settings().same_shape(&settings);
        self.settings = settings;
        if self.is_running() && reshaped {
            self.stop_session();
        }
        Ok(())
    }

    #[cfg(feature = "serde")]
    pub fn export_settings(&self) -> Result<String> {
        codec::encode(&self.settings)
    }

    #[cfg(feature = "serde")]
    pub fn import_settings(&mut self, token: &str) -> Result<()> {
        let settings = codec::decode(token)?;
        self.set_settings(settings)
    }

    pub fn set_intensity(&mut self, intensity: u32) -> u8 {
        let v = intensity.min(u32::from(MAX_INTENSITY)) as u8;
        self.settings.intensity = v;
        v
    }

    pub fn apply_theme_preset(&mut self, preset: ThemePreset) -> u8 {
        self.set_intensity(u32::from(preset.intensity()))
    }

    /// Start (or restart) a session and produce turn 0 right away.
    ///
    /// `raw` replaces the editable settings when given. On failure nothing
    /// changes, including a session that is already running.
    pub fn start_session(&mut self, raw: Option<Settings>) -> Result<&StimulusFrame> {
        let settings = raw.unwrap_or(self.settings);
        self.engine.start(&settings)?;

        self.settings = settings;
        self.stats = SessionStats::new();
        self.answered_turn = None;
        self.answered_boxes.clear();
        self.epoch = self.epoch.wrapping_add(1);

        self.engine.last_frame().ok_or(Error::NotRunning)
    }

    /// Idempotent.
    pub fn stop_session(&mut self) {
        self.engine.stop();
        self.epoch = self.epoch.wrapping_add(1);
    }

    pub fn next_turn(&mut self) -> Result<&StimulusFrame> {
        self.engine.next_turn()
    }

    /// Produce the next turn only if `epoch` still names the running session.
    pub fn advance(&mut self, epoch: u64) -> Option<StimulusFrame> {
        if epoch != self.epoch || !self.is_running() {
            return None;
        }
        self.engine.next_turn().ok().cloned()
    }

    /// Judge a "match" response for `box_index` against the newest turn.
    ///
    /// Only the first response per box and turn counts toward the tally.
    pub fn respond(&mut self, box_index: usize) -> Verdict {
        let is_match = match self.engine.check(box_index) {
            Ok(m) => m,
            Err(e) => {
                return Verdict::Refused {
                    reason: e.to_string(),
                }
            }
        };

        if self.answered_turn != self.engine.current_turn() {
            self.answered_turn = self.engine.current_turn();
            self.answered_boxes.clear();
        }
        if self.answered_boxes.insert(box_index) {
            self.stats.record_response(is_match);
        }

        if is_match {
            Verdict::Match { box_index }
        } else {
            Verdict::Miss { box_index }
        }
    }

    /// Keybinding entry point: `"1"` answers for box 0, and so on.
    pub fn respond_key(&mut self, key: &str) -> Verdict {
        let box_count = self.shape().map(|s| s.box_count()).unwrap_or(0);
        match keymap::box_for_key_name(key, box_count) {
            Some(box_index) => self.respond(box_index),
            None => Verdict::Refused {
                reason: format!("key {key:?} is not bound to a box"),
            },
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            running: self.is_running(),
            turn: self.current_turn(),
            step: self.step_count(),
            settings: self.settings,
            session_settings: *self.engine.settings(),
            stats: self.stats.clone(),
            last_frame: self.engine.last_frame().cloned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn respond_before_n_is_refused_silently() {
        let mut s = Session::with_seed(Settings::default(), 1);
        assert!(s.respond(0).is_refused());

        s.start_session(None).unwrap();
        assert!(s.respond(0).is_refused());
        s.next_turn().unwrap();
        assert!(s.respond(0).is_refused());
        assert_eq!(s.stats().responses, 0);

        s.next_turn().unwrap();
        assert!(!s.respond(0).is_refused());
        assert_eq!(s.stats().responses, 1);
    }

    #[test]
    fn verdict_feedback_uses_one_based_boxes() {
        assert_eq!(Verdict::Match { box_index: 0 }.to_string(), "Box 1: MATCH!");
        assert_eq!(Verdict::Miss { box_index: 3 }.to_string(), "Box 4: MISS!");
    }

    #[test]
    fn repeated_responses_count_once_per_turn() {
        let mut s = Session::with_seed(Settings::default().with_grid(1, 1, 1).with_n(1), 1);
        s.start_session(None).unwrap();
        s.next_turn().unwrap();
        assert!(s.respond(0).is_match());
        assert!(s.respond(0).is_match());
        assert_eq!(s.stats().responses, 1);

        s.next_turn().unwrap();
        assert!(s.respond(0).is_match());
        assert_eq!(s.stats().responses, 2);
        assert_eq!(s.stats().accuracy(), Some(1.0));
    }

    #[test]
    fn failed_start_leaves_state_untouched() {
        let mut s = Session::with_seed(Settings::default(), 2);
        s.start_session(None).unwrap();
        s.next_turn().unwrap();
        let epoch = s.epoch();

        assert!(s.start_session(Some(Settings::default().with_n(0))).is_err());
        assert_eq!(s.settings(), &Settings::default());
        assert_eq!(s.epoch(), epoch);
        assert_eq!(s.step_count(), 2);
        assert!(s.is_running());
    }

    #[test]
    fn reshaping_settings_stops_a_running_session() {
        let mut s = Session::with_seed(Settings::default(), 3);
        s.start_session(None).unwrap();

        s.set_settings(Settings::default().with_n(3)).unwrap();
        assert!(s.is_running(), "lag change waits for the next start");
        assert_eq!(s.engine().settings().n, 2);

        s.set_settings(Settings::default().with_grid(2, 2, 3)).unwrap();
        assert!(!s.is_running());
        assert_eq!(s.history().len(), 1);
    }

    #[test]
    fn invalid_settings_are_rejected_whole() {
        let mut s = Session::with_seed(Settings::default(), 3);
        let before = *s.settings();
        assert!(s.set_settings(Settings::default().with_grid(2, 0, 3)).is_err());
        assert_eq!(s.settings(), &before);
    }

    #[test]
    fn advance_ignores_stale_epochs() {
        let mut s = Session::with_seed(Settings::default(), 4);
        s.start_session(None).unwrap();
        let epoch = s.epoch();
        assert!(s.advance(epoch).is_some());

        s.stop_session();
        assert!(s.advance(epoch).is_none());
        assert!(s.advance(s.epoch()).is_none());

        s.start_session(None).unwrap();
        assert!(s.advance(epoch).is_none());
        assert_eq!(s.advance(s.epoch()).map(|f| f.turn), Some(1));
    }

    #[test]
    fn stop_is_idempotent_and_keeps_history() {
        let mut s = Session::with_seed(Settings::default(), 4);
        s.stop_session();
        s.start_session(None).unwrap();
        s.next_turn().unwrap();
        s.stop_session();
        s.stop_session();
        assert_eq!(s.history().len(), 2);
        assert!(s.next_turn().is_err());
    }

    #[test]
    fn keys_route_to_boxes() {
        let mut s = Session::with_seed(Settings::default().with_grid(1, 2, 1).with_n(1), 5);
        s.start_session(None).unwrap();
        s.next_turn().unwrap();
        assert_eq!(s.respond_key("2"), Verdict::Match { box_index: 1 });
        assert!(s.respond_key("3").is_refused());
        assert!(s.respond_key("x").is_refused());
    }

    #[test]
    fn theme_presets_only_touch_intensity() {
        let mut s = Session::with_seed(Settings::default(), 6);
        assert_eq!(s.apply_theme_preset(ThemePreset::Light), 10);
        assert_eq!(s.set_intensity(500), 100);
        assert_eq!(
            s.settings(),
            &Settings {
                intensity: 100,
                ..Settings::default()
            }
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn import_replaces_and_bad_import_changes_nothing() {
        let mut s = Session::with_seed(Settings::default().with_n(5), 7);
        let token = codec::encode(&Settings::default().with_grid(2, 2, 2)).unwrap();
        s.import_settings(&token).unwrap();
        assert_eq!(s.settings(), &Settings::default().with_grid(2, 2, 2));

        let before = *s.settings();
        let err = s.import_settings("garbage").unwrap_err();
        assert!(matches!(err, Error::InvalidSaveData(_)));
        assert_eq!(s.settings(), &before);
        assert_eq!(s.export_settings().unwrap(), token);
    }
}
