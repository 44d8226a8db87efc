// Strong typing over strings. Newtypes for timestamps, canvas geometry, and phases.
// Everything crossing the JS boundary is serde-serializable.

use std::fmt;
use std::ops::{Add, AddAssign, Mul, Sub};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::effects::EffectSettings;
use crate::error::EngineError;

/// Host clock reading in microseconds. Newtype for type safety.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct Timestamp(u64);

impl Timestamp {
    pub fn from_micros(us: u64) -> Self {
        Timestamp(us)
    }

    /// Host clocks (`performance.now()`, `Date.now()`) report fractional milliseconds.
    pub fn from_millis_f64(ms: f64) -> Self {
        if ms.is_finite() && ms > 0.0 {
            Timestamp((ms * 1000.0).round() as u64)
        } else {
            Timestamp(0)
        }
    }

    pub fn as_micros(&self) -> u64 {
        self.0
    }

    pub fn as_millis(&self) -> u64 {
        self.0 / 1000
    }

    pub fn as_secs(&self) -> u64 {
        self.0 / 1_000_000
    }

    pub fn after_millis(&self, ms: u64) -> Self {
        Timestamp(self.0.saturating_add(ms.saturating_mul(1000)))
    }
}

/// 2D vector in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Vec2 { x, y }
    }

    pub fn length(self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Rotated 90° counter-clockwise.
    pub fn perp(self) -> Vec2 {
        Vec2::new(-self.y, self.x)
    }

    pub fn normalize_or_zero(self) -> Vec2 {
        let len = self.length();
        if len > 0.0 {
            Vec2::new(self.x / len, self.y / len)
        } else {
            Vec2::ZERO
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        Vec2::new(self.x * rhs, self.y * rhs)
    }
}

/// Canvas size in CSS pixels (device pixel ratio is the host's concern).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CanvasSize {
    pub width: f32,
    pub height: f32,
}

impl CanvasSize {
    pub fn new(width: f32, height: f32) -> Self {
        CanvasSize {
            width: width.max(0.0),
            height: height.max(0.0),
        }
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(self.width / 2.0, self.height / 2.0)
    }
}

/// Stage of the loading animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Swirl,
    Forming,
    Formed,
    /// Looping variant only.
    Holding,
    /// Looping variant only.
    Dissolving,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Swirl => "swirl",
            Phase::Forming => "forming",
            Phase::Formed => "formed",
            Phase::Holding => "holding",
            Phase::Dissolving => "dissolving",
        }
    }
}

/// Which presentation the loader plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SequenceVariant {
    /// swirl → forming → formed, then stop.
    #[default]
    OneShot,
    /// formed → holding → dissolving → swirl, forever.
    Looping,
}

/// The persisted page variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    Rude,
    Normal,
}

impl Preference {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preference::Rude => "rude",
            Preference::Normal => "normal",
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Preference::Rude => Preference::Normal,
            Preference::Normal => Preference::Rude,
        }
    }
}

impl FromStr for Preference {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "rude" => Ok(Preference::Rude),
            "normal" => Ok(Preference::Normal),
            other => Err(EngineError::InvalidPreference(other.to_string())),
        }
    }
}

impl fmt::Display for Preference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Loader timing and content, passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceConfig {
    #[serde(default = "default_word")]
    pub word: String,
    /// Number of decorative glyphs, in addition to one glyph per word character.
    #[serde(default = "default_decorative_count")]
    pub decorative_count: usize,
    /// Frames (~60fps).
    #[serde(default = "default_swirl_duration")]
    pub swirl_duration: u32,
    #[serde(default = "default_form_duration")]
    pub form_duration: u32,
    #[serde(default = "default_hold_duration")]
    pub hold_duration: u32,
    #[serde(default = "default_dissolve_duration")]
    pub dissolve_duration: u32,
    #[serde(default)]
    pub variant: SequenceVariant,
    #[serde(default)]
    pub seed: u64,
    #[serde(default)]
    pub reveal: RevealTiming,
}

fn default_word() -> String {
    "CNMSB".to_string()
}

fn default_decorative_count() -> usize {
    55
}

fn default_swirl_duration() -> u32 {
    180 // 3s
}

fn default_form_duration() -> u32 {
    120 // 2s
}

fn default_hold_duration() -> u32 {
    120
}

fn default_dissolve_duration() -> u32 {
    90
}

impl Default for SequenceConfig {
    fn default() -> Self {
        SequenceConfig {
            word: default_word(),
            decorative_count: default_decorative_count(),
            swirl_duration: default_swirl_duration(),
            form_duration: default_form_duration(),
            hold_duration: default_hold_duration(),
            dissolve_duration: default_dissolve_duration(),
            variant: SequenceVariant::default(),
            seed: 0,
            reveal: RevealTiming::default(),
        }
    }
}

impl SequenceConfig {
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.word.chars().next().is_none() {
            return Err(EngineError::InvalidConfig("word must not be empty".into()));
        }
        Ok(())
    }

    /// Frames from the first swirl frame to the formed transition.
    pub fn total_duration(&self) -> u32 {
        self.swirl_duration.saturating_add(self.form_duration)
    }
}

/// Delays of the reveal cascade after the word has formed (milliseconds).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealTiming {
    #[serde(default = "default_subtitle_delay")]
    pub subtitle_ms: u64,
    #[serde(default = "default_selector_delay")]
    pub version_selector_ms: u64,
    #[serde(default = "default_progress_delay")]
    pub progress_bar_ms: u64,
}

fn default_subtitle_delay() -> u64 {
    200
}

fn default_selector_delay() -> u64 {
    500
}

fn default_progress_delay() -> u64 {
    800
}

impl Default for RevealTiming {
    fn default() -> Self {
        RevealTiming {
            subtitle_ms: default_subtitle_delay(),
            version_selector_ms: default_selector_delay(),
            progress_bar_ms: default_progress_delay(),
        }
    }
}

/// Site controller configuration passed from JS.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteConfig {
    #[serde(default)]
    pub sequence: SequenceConfig,
    /// Delay between choosing a preference and dismissing the loader.
    #[serde(default = "default_dismiss_delay")]
    pub dismiss_delay_ms: u64,
    /// Force the formed word and selector visible if the animation stalls. `null` disables.
    #[serde(default = "default_fallback_reveal")]
    pub fallback_reveal_ms: Option<u64>,
    /// Delay between dismissal and starting scroll/terminal effects.
    #[serde(default = "default_page_effects_delay")]
    pub page_effects_delay_ms: u64,
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
}

fn default_dismiss_delay() -> u64 {
    500
}

fn default_fallback_reveal() -> Option<u64> {
    Some(6000)
}

fn default_page_effects_delay() -> u64 {
    300
}

fn default_storage_key() -> String {
    "cnmsb-version".to_string()
}

impl Default for SiteConfig {
    fn default() -> Self {
        SiteConfig {
            sequence: SequenceConfig::default(),
            dismiss_delay_ms: default_dismiss_delay(),
            fallback_reveal_ms: default_fallback_reveal(),
            page_effects_delay_ms: default_page_effects_delay(),
            storage_key: default_storage_key(),
        }
    }
}

/// Everything the browser engine needs, passed from JS as one JSON object.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    #[serde(flatten)]
    pub site: SiteConfig,
    #[serde(default)]
    pub effects: EffectSettings,
}

/// Page elements revealed by the cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevealTarget {
    FormedWord,
    Subtitle,
    VersionSelector,
    ProgressBar,
}

/// Instruction for the JS host. Commands for elements the page lacks are skipped by the host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PageCommand {
    ShowLoadingScreen,
    HideLoadingScreen,
    ShowMainContent,
    ShowNav,
    /// Toggles the `loading` class on `<body>`.
    SetBodyLoading { loading: bool },
    /// Show elements tagged for `variant`, hide the other tagged set.
    ApplyVariant { variant: Preference },
    /// Update the always-available version switch.
    SetVersionSwitch { current: Preference },
    Reveal { target: RevealTarget },
    SetProgress { percent: u8 },
    /// Cancel the pending animation frame.
    StopAnimation,
    /// Wire up scroll, terminal and parallax effects.
    StartPageEffects,
}

/// A phase transition, as delivered to `on_phase_change` listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseChange {
    pub from: Phase,
    pub to: Phase,
    /// Completed loop cycles before this transition (always 0 for one-shot).
    pub cycle: u32,
}

/// Result of one host animation frame.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FrameOutput {
    pub commands: Vec<PageCommand>,
    /// Whether the host should call `requestAnimationFrame` again.
    pub request_frame: bool,
}
