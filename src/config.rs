use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShapeConfig {
    /// Grow an else slot when a statement connection is hovered.
    pub auto_else: bool,
    /// Upper bound applied to persisted else-if counts.
    pub max_else_if: usize,
}

impl Default for ShapeConfig {
    fn default() -> Self {
        Self {
            auto_else: true,
            max_else_if: 1024,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Config {
    pub shape: ShapeConfig,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShapeConfigFile {
    auto_else: Option<bool>,
    max_else_if: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConfigFile {
    shape: Option<ShapeConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let Some(path) = path else {
        return Ok(Config::default());
    };
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

pub fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let parsed: ConfigFile = match serde_json::from_str(contents) {
        Ok(parsed) => parsed,
        Err(json_err) => json5::from_str(contents)
            .map_err(|_| anyhow::anyhow!("invalid config file: {json_err}"))?,
    };

    if let Some(shape) = parsed.shape {
        if let Some(v) = shape.auto_else {
            config.shape.auto_else = v;
        }
        if let Some(v) = shape.max_else_if {
            config.shape.max_else_if = v;
        }
    }

    Ok(config)
}
