//! Expression vocabulary and channel resolution
//!
//! Source curve channels (blend shape names, usually) are mapped to
//! expression keys once per export, before resampling. Channels that do not
//! resolve are dropped from every later stage.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::curve::{Curve, CurveBinding};

macro_rules! expression_presets {
    ($($variant:ident => $name:literal,)*) => {
        /// Preset expression of the VRM 1.0 vocabulary
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(rename_all = "camelCase")]
        #[repr(u8)]
        pub enum ExpressionPreset {
            $($variant,)*
        }

        impl ExpressionPreset {
            /// Every preset, in slot order
            pub const ALL: &'static [ExpressionPreset] = &[$(ExpressionPreset::$variant,)*];

            /// VRM name of the preset (e.g. `blinkLeft`)
            pub const fn name(self) -> &'static str {
                match self {
                    $(ExpressionPreset::$variant => $name,)*
                }
            }
        }
    };
}

expression_presets! {
    Happy => "happy",
    Angry => "angry",
    Sad => "sad",
    Relaxed => "relaxed",
    Surprised => "surprised",
    Aa => "aa",
    Ih => "ih",
    Ou => "ou",
    Ee => "ee",
    Oh => "oh",
    Blink => "blink",
    BlinkLeft => "blinkLeft",
    BlinkRight => "blinkRight",
    LookUp => "lookUp",
    LookDown => "lookDown",
    LookLeft => "lookLeft",
    LookRight => "lookRight",
    Neutral => "neutral",
}

impl ExpressionPreset {
    /// Number of preset slots
    pub const COUNT: usize = Self::ALL.len();

    /// Slot index in `0..COUNT`
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Case-insensitive lookup (`"Happy"`, `"HAPPY"` and `"happy"` all match)
    pub fn from_name_ignore_case(name: &str) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|preset| preset.name().eq_ignore_ascii_case(name))
    }
}

/// Expression identifier: a known preset or a custom name.
///
/// Equality, hashing and ordering all go through [`ExpressionKey::name`]
/// with ordinal byte comparison, so `Preset(Happy)` and `Custom("happy")`
/// denote the same expression.
#[derive(Clone, Debug)]
pub enum ExpressionKey {
    Preset(ExpressionPreset),
    Custom(String),
}

impl ExpressionKey {
    pub fn custom(name: impl Into<String>) -> Self {
        Self::Custom(name.into())
    }

    /// Resolve a free-form name: a case-insensitive preset match wins,
    /// anything else is kept verbatim as a custom expression.
    pub fn parse(name: &str) -> Self {
        match ExpressionPreset::from_name_ignore_case(name) {
            Some(preset) => Self::Preset(preset),
            None => Self::Custom(name.to_string()),
        }
    }

    /// Display name (preset VRM name or custom name verbatim)
    pub fn name(&self) -> &str {
        match self {
            Self::Preset(preset) => preset.name(),
            Self::Custom(name) => name,
        }
    }

    pub fn preset(&self) -> Option<ExpressionPreset> {
        match self {
            Self::Preset(preset) => Some(*preset),
            Self::Custom(_) => None,
        }
    }
}

impl From<ExpressionPreset> for ExpressionKey {
    fn from(preset: ExpressionPreset) -> Self {
        Self::Preset(preset)
    }
}

impl PartialEq for ExpressionKey {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for ExpressionKey {}

impl Hash for ExpressionKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl PartialOrd for ExpressionKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ExpressionKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name().as_bytes().cmp(other.name().as_bytes())
    }
}

impl std::fmt::Display for ExpressionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Serialize for ExpressionKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for ExpressionKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Self::parse(&name))
    }
}

/// Caller-supplied explicit channel name -> expression key map
pub type ExpressionMap = HashMap<String, ExpressionKey>;

/// A source channel that resolved to an expression
#[derive(Clone, Debug)]
pub struct ExpressionBinding<'a> {
    pub channel: &'a str,
    pub key: ExpressionKey,
    /// Raw curve in the source's native (0-100) scale
    pub curve: &'a Curve,
}

/// Resolve one channel name.
///
/// With an explicit map, only mapped channels resolve (to exactly the mapped
/// key). Without one, preset names match case-insensitively and everything
/// else becomes a custom expression.
pub fn resolve_channel(channel: &str, map: Option<&ExpressionMap>) -> Option<ExpressionKey> {
    match map {
        Some(map) => map.get(channel).cloned(),
        None => Some(ExpressionKey::parse(channel)),
    }
}

/// Resolve every curve binding of a clip.
///
/// Results keep the bindings' order. A repeated channel name, or a second
/// channel resolving to an already claimed key, is skipped: the first
/// binding wins.
pub fn resolve_bindings<'a>(
    bindings: &'a [CurveBinding],
    map: Option<&ExpressionMap>,
) -> Vec<ExpressionBinding<'a>> {
    let mut seen_channels: HashSet<&str> = HashSet::new();
    let mut seen_keys: HashSet<ExpressionKey> = HashSet::new();
    let mut resolved = Vec::new();

    for binding in bindings {
        let channel = binding.channel.as_str();
        if !seen_channels.insert(channel) {
            tracing::warn!("Duplicate expression channel '{}' skipped", channel);
            continue;
        }

        let Some(key) = resolve_channel(channel, map) else {
            tracing::debug!("Channel '{}' is not in the expression map, dropped", channel);
            continue;
        };

        if !seen_keys.insert(key.clone()) {
            tracing::warn!(
                "Channel '{}' resolves to expression '{}' which is already bound, skipped",
                channel,
                key
            );
            continue;
        }

        tracing::debug!("Channel '{}' -> expression '{}'", channel, key);
        resolved.push(ExpressionBinding {
            channel,
            key,
            curve: &binding.curve,
        });
    }

    resolved
}
