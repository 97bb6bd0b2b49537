use std::fs;

use rust_decimal::Decimal;
use serde::Deserialize;

use crate::domain::ObjectType;
use crate::error::{NormalizeError, Result};
use crate::mapper::MatchMode;

/// Per-source normalization profile.
///
/// A site adapter ships one of these next to its scraping code; everything a
/// source needs to tune about the shared engine lives here.
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SourceProfile {
    /// Compare keys by full equality instead of containment.
    pub exact_match: bool,
    /// Fail on keys no mapping rule recognizes instead of dropping them.
    pub strict: bool,
    /// Scale factor applied to decoded prices (e.g. 1000000 for sources
    /// quoting millions of rubles).
    pub price_multiplier: Decimal,
    /// Base URL that relative plan links are resolved against.
    pub plan_base_url: Option<String>,
    /// Run the promo-text reconciliation pass before finalization.
    pub reconcile_promotions: bool,
    /// Object type every record of this source starts with, for sources that
    /// only ever list one category.
    pub default_type: Option<ObjectType>,
}

impl Default for SourceProfile {
    fn default() -> Self {
        Self {
            exact_match: false,
            strict: false,
            price_multiplier: Decimal::ONE,
            plan_base_url: None,
            reconcile_promotions: true,
            default_type: None,
        }
    }
}

impl SourceProfile {
    pub fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            NormalizeError::Config(format!("Failed to read profile '{}': {}", path, e))
        })?;

        let profile: SourceProfile = toml::from_str(&content)?;
        Ok(profile)
    }

    pub fn match_mode(&self) -> MatchMode {
        if self.exact_match {
            MatchMode::Exact
        } else {
            MatchMode::Substring
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_profile_load() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            "exact_match = true\nprice_multiplier = 1000000\ndefault_type = \"flat\"\n"
        )
        .unwrap();

        let profile = SourceProfile::load(file.path().to_str().unwrap()).unwrap();
        assert!(profile.exact_match);
        assert_eq!(profile.price_multiplier, Decimal::from(1_000_000));
        assert_eq!(profile.default_type, Some(ObjectType::Flat));
        assert!(profile.reconcile_promotions);
    }

    #[test]
    fn test_profile_defaults() {
        let profile = SourceProfile::default();
        assert_eq!(profile.match_mode(), MatchMode::Substring);
        assert_eq!(profile.price_multiplier, Decimal::ONE);
    }
}
