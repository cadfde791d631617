#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::GridShape;

/// Periods below this are accepted but hard to play.
pub const RECOMMENDED_MIN_INTERVAL_MS: u32 = 100;

pub const MAX_INTENSITY: u8 = 100;

/// Exercise parameters.
///
/// Read by the engine only when a session starts; edits made while a session
/// is running take effect on the next start.
///
/// Field order is the serialization order of the settings token and must stay
/// stable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase", default))]
pub struct Settings {
    /// Lag distance of the match rule.
    pub n: u32,
    pub grid_rows: u32,
    pub grid_cols: u32,
    /// Each box holds `grid_res * grid_res` cells.
    pub grid_res: u32,
    /// Cosmetic background intensity in [0,100]; never read by the engine.
    pub intensity: u8,
    /// Period between turns.
    pub interval_ms: u32,
    /// How long a stimulus stays lit. Should be below `interval_ms`.
    pub flash_ms: u32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            n: 2,
            grid_rows: 1,
            grid_cols: 1,
            grid_res: 3,
            intensity: 95,
            interval_ms: 3000,
            flash_ms: 600,
        }
    }
}

impl Settings {
    pub fn with_n(mut self, n: u32) -> Self {
        self.n = n;
        self
    }

    pub fn with_grid(mut self, rows: u32, cols: u32, res: u32) -> Self {
        self.grid_rows = rows;
        self.grid_cols = cols;
        self.grid_res = res;
        self
    }

    pub fn with_timing(mut self, interval_ms: u32, flash_ms: u32) -> Self {
        self.interval_ms = interval_ms;
        self.flash_ms = flash_ms;
        self
    }

    /// Check every field a session depends on.
    pub fn validate(&self) -> Result<()> {
        if self.n == 0 {
            return Err(Error::config("n", "must be at least 1"));
        }
        if self.interval_ms == 0 {
            return Err(Error::config("intervalMs", "must be positive"));
        }
        if self.flash_ms == 0 {
            return Err(Error::config("flashMs", "must be positive"));
        }
        if self.intensity > MAX_INTENSITY {
            return Err(Error::config("intensity", "must be within 0..=100"));
        }
        self.shape().map(|_| ())
    }

    pub fn shape(&self) -> Result<GridShape> {
        GridShape::new(self.grid_rows, self.grid_cols, self.grid_res)
    }

    /// Stimuli overlap perceptually when a flash outlasts the turn period.
    pub fn flash_overlaps(&self) -> bool {
        self.flash_ms >= self.interval_ms
    }

    pub fn interval_below_recommended(&self) -> bool {
        self.interval_ms < RECOMMENDED_MIN_INTERVAL_MS
    }

    pub fn same_shape(&self, other: &Settings) -> bool {
        self.grid_rows == other.grid_rows
            && self.grid_cols == other.grid_cols
            && self.grid_res == other.grid_res
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum ThemePreset {
    Amoled,
    Dark,
    Light,
}

impl ThemePreset {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "amoled" => Some(ThemePreset::Amoled),
            "dark" => Some(ThemePreset::Dark),
            "light" => Some(ThemePreset::Light),
            _ => None,
        }
    }

    pub fn intensity(self) -> u8 {
        match self {
            ThemePreset::Amoled => 100,
            ThemePreset::Dark => 90,
            ThemePreset::Light => 10,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ThemePreset::Amoled => "amoled",
            ThemePreset::Dark => "dark",
            ThemePreset::Light => "light",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let s = Settings::default();
        assert!(s.validate().is_ok());
        assert!(!s.flash_overlaps());
        assert_eq!(s.shape().unwrap().box_count(), 1);
        assert_eq!(s.shape().unwrap().cells_per_box(), 9);
    }

    #[test]
    fn zero_fields_are_rejected() {
        let cases = [
            (Settings::default().with_n(0), "n"),
            (Settings::default().with_grid(0, 1, 3), "gridRows"),
            (Settings::default().with_grid(1, 0, 3), "gridCols"),
            (Settings::default().with_grid(1, 1, 0), "gridRes"),
            (Settings::default().with_timing(0, 600), "intervalMs"),
            (Settings::default().with_timing(3000, 0), "flashMs"),
        ];
        for (s, field) in cases {
            match s.validate() {
                Err(Error::InvalidConfiguration { field: f, .. }) => assert_eq!(f, field),
                other => panic!("expected InvalidConfiguration for {field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn overlap_is_reported_not_enforced() {
        let s = Settings::default().with_timing(500, 800);
        assert!(s.validate().is_ok());
        assert!(s.flash_overlaps());
    }

    #[test]
    fn presets_map_to_intensity() {
        assert_eq!(ThemePreset::parse("AMOLED"), Some(ThemePreset::Amoled));
        assert_eq!(ThemePreset::Dark.intensity(), 90);
        assert_eq!(ThemePreset::Light.intensity(), 10);
        assert_eq!(ThemePreset::parse("sepia"), None);
    }
}
