use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const TITLE: &str = "karakara.player.title";
pub const THEME: &str = "karakara.player.theme";
pub const PREVIEW_VOLUME: &str = "karakara.player.video.preview_volume";
pub const SKIP_SECONDS: &str = "karakara.player.video.skip.seconds";
/// Seconds to wait before starting the head track, 0 disables autoplay
pub const AUTOPLAY: &str = "karakara.player.autoplay";
pub const SUBS_ON_SCREEN: &str = "karakara.player.subs_on_screen";
pub const EVENT_END: &str = "karakara.event.end";
pub const PODIUM_VIDEO_LAG: &str = "karakara.podium.video_lag";
pub const PODIUM_SOFT_SUB_LAG: &str = "karakara.podium.soft_sub_lag";

/// A single server-configured value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Number(f64),
    Text(String),
    Null,
    /// Lists and objects are carried along but never read
    Other(serde_json::Value),
}

impl SettingValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            SettingValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            SettingValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SettingValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl From<f64> for SettingValue {
    fn from(n: f64) -> Self {
        SettingValue::Number(n)
    }
}

impl From<bool> for SettingValue {
    fn from(b: bool) -> Self {
        SettingValue::Bool(b)
    }
}

impl From<&str> for SettingValue {
    fn from(s: &str) -> Self {
        SettingValue::Text(s.to_string())
    }
}

/// Partial settings as delivered by the server
pub type SettingsPatch = BTreeMap<String, SettingValue>;

/// Settings mapping, always seeded with the built-in defaults
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    values: BTreeMap<String, SettingValue>,
}

impl Default for Settings {
    fn default() -> Self {
        let values = [
            (TITLE, SettingValue::from("KaraKara")),
            (THEME, SettingValue::from("metalghosts")),
            (PREVIEW_VOLUME, SettingValue::from(0.2)),
            (SKIP_SECONDS, SettingValue::from(20.0)),
            (AUTOPLAY, SettingValue::from(0.0)),
            (SUBS_ON_SCREEN, SettingValue::from(true)),
            (EVENT_END, SettingValue::Null),
            (PODIUM_VIDEO_LAG, SettingValue::from(0.50)),
            (PODIUM_SOFT_SUB_LAG, SettingValue::from(0.35)),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value))
        .collect();

        Self { values }
    }
}

impl Settings {
    /// Overlay `patch` on the current values; keys not in `patch` are kept
    pub fn merge(&mut self, patch: SettingsPatch) {
        self.values.extend(patch);
    }

    pub fn get(&self, key: &str) -> Option<&SettingValue> {
        self.values.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &SettingValue)> {
        self.values.iter()
    }

    /// Autoplay threshold in seconds; anything that is not a positive number disables it
    pub fn autoplay_seconds(&self) -> f64 {
        self.get(AUTOPLAY)
            .and_then(SettingValue::as_f64)
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(0.0)
    }

    pub fn title(&self) -> &str {
        self.get(TITLE).and_then(SettingValue::as_str).unwrap_or("KaraKara")
    }
}
