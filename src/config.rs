//! Engine policy, loaded from TOML
use super::line::LinePolicy;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Rejecting without a comment is a validation error when set.
    pub require_reject_comment: bool,
    /// Whether the drafter may also appear in their own approval line.
    pub allow_self_approval: bool,
    pub max_approvers: usize,
    /// bech32 human readable prefix for document ids
    pub document_hrp: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            require_reject_comment: true,
            allow_self_approval: true,
            max_approvers: 16,
            document_hrp: "doc_".to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let config: EngineConfig = toml::from_str(raw).context("invalid engine config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.max_approvers == 0 {
            anyhow::bail!("max_approvers must be at least 1");
        }
        bech32::Hrp::parse(&self.document_hrp)
            .with_context(|| format!("document_hrp {:?} is not a valid bech32 prefix", self.document_hrp))?;
        Ok(())
    }

    pub fn line_policy(&self) -> LinePolicy {
        LinePolicy {
            max_approvers: self.max_approvers,
            allow_self_approval: self.allow_self_approval,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_keys_fall_back_to_defaults() {
        let config = EngineConfig::from_toml_str("max_approvers = 4").unwrap();

        assert_eq!(config.max_approvers, 4);
        assert!(config.require_reject_comment);
        assert_eq!(config.document_hrp, "doc_");
    }

    #[test]
    fn zero_approvers_is_refused() {
        assert!(EngineConfig::from_toml_str("max_approvers = 0").is_err());
    }

    #[test]
    fn bad_prefix_is_refused() {
        assert!(EngineConfig::from_toml_str("document_hrp = \"\"").is_err());
    }
}
