//! Export config (`vrma.toml`)
//!
//! Optional overrides for root selection, clip selection, humanoid bone
//! assignment and the expression channel map.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

use vrma_core::{ExpressionKey, ExpressionMap, HumanoidBone};

/// Root config structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExportConfig {
    /// Node used as the designated root transform
    #[serde(default)]
    pub root: Option<String>,
    /// Default animation (name or index)
    #[serde(default)]
    pub animation: Option<String>,
    /// Canonical bone name -> node name
    #[serde(default)]
    pub humanoid: BTreeMap<String, String>,
    /// Channel name -> expression name. Present means explicit map.
    #[serde(default)]
    pub expressions: Option<BTreeMap<String, String>>,
}

impl ExportConfig {
    /// Humanoid table with bone names parsed (case-insensitive)
    pub fn humanoid_bones(&self) -> Result<BTreeMap<HumanoidBone, &str>> {
        let mut bones = BTreeMap::new();
        for (bone, node) in &self.humanoid {
            let Some(id) = HumanoidBone::from_name_ignore_case(bone) else {
                bail!("Unknown humanoid bone '{}' in [humanoid]", bone);
            };
            if bones.insert(id, node.as_str()).is_some() {
                bail!("Humanoid bone '{}' assigned twice in [humanoid]", id);
            }
        }
        Ok(bones)
    }

    /// Explicit expression map, if configured
    pub fn expression_map(&self) -> Option<ExpressionMap> {
        self.expressions.as_ref().map(|table| {
            table
                .iter()
                .map(|(channel, name)| (channel.clone(), ExpressionKey::parse(name)))
                .collect()
        })
    }
}

/// Parse config text
pub fn parse_config(content: &str) -> Result<ExportConfig> {
    toml::from_str(content).context("Failed to parse export config")
}

/// Load and parse a config file
pub fn load_config(path: &Path) -> Result<ExportConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {:?}", path))?;
    parse_config(&content).with_context(|| format!("Invalid config: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use vrma_core::ExpressionPreset;

    #[test]
    fn test_empty_config() {
        let config = parse_config("").unwrap();
        assert!(config.root.is_none());
        assert!(config.humanoid.is_empty());
        assert!(config.expression_map().is_none());
    }

    #[test]
    fn test_full_config() {
        let config = parse_config(
            r#"
root = "Armature"
animation = "Dance"

[humanoid]
hips = "J_Bip_C_Hips"
LeftUpperArm = "J_Bip_L_UpperArm"

[expressions]
"Fcl_EYE_Close" = "Blink"
"Fcl_MTH_Tongue" = "tongueOut"
"#,
        )
        .unwrap();

        assert_eq!(config.root.as_deref(), Some("Armature"));
        assert_eq!(config.animation.as_deref(), Some("Dance"));

        let bones = config.humanoid_bones().unwrap();
        assert_eq!(bones[&HumanoidBone::Hips], "J_Bip_C_Hips");
        assert_eq!(bones[&HumanoidBone::LeftUpperArm], "J_Bip_L_UpperArm");

        let map = config.expression_map().unwrap();
        assert_eq!(map["Fcl_EYE_Close"], ExpressionKey::Preset(ExpressionPreset::Blink));
        assert_eq!(map["Fcl_MTH_Tongue"], ExpressionKey::custom("tongueOut"));
    }

    #[test]
    fn test_empty_expression_table_is_explicit() {
        let config = parse_config("[expressions]\n").unwrap();
        assert!(config.expression_map().unwrap().is_empty());
    }

    #[test]
    fn test_unknown_bone_rejected() {
        let config = parse_config("[humanoid]\ntail = \"Tail\"\n").unwrap();
        assert!(config.humanoid_bones().is_err());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(parse_config("fps = 60\n").is_err());
    }

    #[test]
    fn test_load_config_matches_parse() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vrma.toml");
        let content = "root = \"Armature\"\n\n[expressions]\nBlink = \"blink\"\n";
        std::fs::write(&path, content).unwrap();

        let loaded = load_config(&path).unwrap();
        let parsed = parse_config(content).unwrap();
        assert_eq!(loaded.root, parsed.root);
        assert_eq!(loaded.expressions, parsed.expressions);
    }

    #[test]
    fn test_load_config_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "fps = 60\n").unwrap();

        let err = load_config(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("broken.toml"));
        assert!(load_config(&dir.path().join("missing.toml")).is_err());
    }
}
