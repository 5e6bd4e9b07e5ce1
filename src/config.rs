use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{RenderError, RenderResult};

/// Engine-wide configuration. Read-only once an [`crate::Engine`] is built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    pub render: RenderDefaults,
    pub scripts: ScriptLimits,
    pub parser: ParserConfig,
    pub requests: RequestConfig,
    pub policy: ErrorPolicy,
}

impl EngineConfig {
    pub fn from_json_str(s: &str) -> RenderResult<Self> {
        let cfg: Self = serde_json::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> RenderResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            RenderError::config(format!("failed to read config '{}'", path.display()))
                .with_source(e)
        })?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> RenderResult<()> {
        if self.render.parallelism == 0 {
            return Err(RenderError::config("render.parallelism must be >= 1"));
        }
        if !self.render.fps.is_finite() || self.render.fps <= 0.0 {
            return Err(RenderError::config("render.fps must be finite and > 0"));
        }
        if self.scripts.recursion_limit == 0 {
            return Err(RenderError::config("scripts.recursion_limit must be >= 1"));
        }
        if self.parser.bind_prefix.is_empty()
            || self.parser.spread_open.is_empty()
            || self.parser.spread_close.is_empty()
        {
            return Err(RenderError::config("parser delimiters must be non-empty"));
        }
        Ok(())
    }
}

/// Fallbacks used when a template leaves a value unspecified.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderDefaults {
    /// Canvas width, as a size literal.
    pub width: String,
    /// Canvas height, as a size literal.
    pub height: String,
    pub font_size: String,
    pub font_family: Option<String>,
    pub fps: f64,
    /// GIF repeat count; `0` loops forever.
    pub repeat: u16,
    /// Maximum number of animation frames rendered concurrently.
    pub parallelism: usize,
    /// Animation duration, as a time literal.
    pub duration: Option<String>,
}

impl Default for RenderDefaults {
    fn default() -> Self {
        Self {
            width: "500px".to_owned(),
            height: "500px".to_owned(),
            font_size: "16px".to_owned(),
            font_family: None,
            fps: 15.0,
            repeat: 0,
            parallelism: 5,
            duration: None,
        }
    }
}

/// Resource ceilings applied to every script execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScriptLimits {
    pub timeout_ms: u64,
    pub recursion_limit: u32,
    pub memory_limit_mb: f64,
}

impl Default for ScriptLimits {
    fn default() -> Self {
        Self {
            timeout_ms: 10_000,
            recursion_limit: 900,
            memory_limit_mb: 4.0,
        }
    }
}

/// Attribute delimiters recognized by the markup parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub bind_prefix: String,
    pub spread_open: String,
    pub spread_close: String,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            bind_prefix: ":".to_owned(),
            spread_open: "{".to_owned(),
            spread_close: "}".to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestConfig {
    /// Directory of the content-addressed download cache.
    pub cache_dir: PathBuf,
    pub user_agent: String,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            cache_dir: PathBuf::from("cache"),
            user_agent: concat!("framewright/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

/// What to do when a recoverable binding problem is found.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAction {
    #[default]
    Raise,
    Skip,
}

impl PolicyAction {
    pub fn raises(self) -> bool {
        matches!(self, Self::Raise)
    }
}

/// Per-class switches between raising and logging-and-skipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ErrorPolicy {
    /// No registered element matches a tag.
    pub element_not_found: PolicyAction,
    /// More than one registered element matches a tag.
    pub element_ambiguous: PolicyAction,
    /// An element factory failed.
    pub invalid_instance: PolicyAction,
    /// An attribute name matches more than one field.
    pub attribute_ambiguous: PolicyAction,
    /// A bind attribute targets a field that cannot hold an expression.
    pub attribute_bind_invalid: PolicyAction,
    /// Children were given to an element that takes none.
    pub element_invalid_child: PolicyAction,
}

impl ErrorPolicy {
    /// A policy that logs and skips every recoverable problem.
    pub fn lenient() -> Self {
        Self {
            element_not_found: PolicyAction::Skip,
            element_ambiguous: PolicyAction::Skip,
            invalid_instance: PolicyAction::Skip,
            attribute_ambiguous: PolicyAction::Skip,
            attribute_bind_invalid: PolicyAction::Skip,
            element_invalid_child: PolicyAction::Skip,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.render.width, "500px");
        assert_eq!(cfg.render.fps, 15.0);
        assert_eq!(cfg.render.parallelism, 5);
        assert_eq!(cfg.scripts.timeout_ms, 10_000);
        assert_eq!(cfg.scripts.recursion_limit, 900);
        assert_eq!(cfg.parser.bind_prefix, ":");
        assert!(cfg.policy.element_not_found.raises());
        cfg.validate().unwrap();
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let cfg = EngineConfig::from_json_str(
            r#"{ "render": { "fps": 24 }, "policy": { "element_not_found": "skip" } }"#,
        )
        .unwrap();
        assert_eq!(cfg.render.fps, 24.0);
        assert_eq!(cfg.render.height, "500px");
        assert_eq!(cfg.policy.element_not_found, PolicyAction::Skip);
        assert_eq!(cfg.policy.element_ambiguous, PolicyAction::Raise);
    }

    #[test]
    fn zero_parallelism_is_rejected() {
        let err = EngineConfig::from_json_str(r#"{ "render": { "parallelism": 0 } }"#).unwrap_err();
        assert!(err.to_string().contains("parallelism"));
    }
}
