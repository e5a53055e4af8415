use serde::{Deserialize, Serialize};

/// Static identity and fundamentals for one listed fund.
///
/// Immutable after the fundamentals store is loaded; the numeric
/// fields come from periodic KRX exports and may be missing for
/// newly listed or thinly reported products.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instrument {
    /// Exchange code, e.g. "069500". Unique key across all stores.
    pub code: String,
    pub name: String,

    /// Classification keywords: scheme labels, reference index,
    /// issuer. Matched case-insensitively by the keyword filter.
    pub tags: Vec<String>,

    /// Ordinal 1 (safest) to 5 (most volatile/complex).
    pub risk_tier: u8,

    pub return_1y: Option<f64>,
    pub volatility: Option<f64>,
    pub expense_ratio: Option<f64>,
    pub aum: Option<f64>,
    pub avg_volume: Option<f64>,

    /// Last recorded close from the export; the resolver's static
    /// default quote uses this when every live tier fails.
    pub last_close: Option<f64>,
}

impl Instrument {
    pub fn matches_keyword(&self, keyword: &str) -> bool {
        let needle = keyword.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        if self.name.to_lowercase().contains(&needle) {
            return true;
        }
        self.tags
            .iter()
            .any(|t| t.to_lowercase().contains(&needle))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(name: &str, tags: &[&str]) -> Instrument {
        Instrument {
            code: "069500".to_string(),
            name: name.to_string(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            risk_tier: 3,
            return_1y: None,
            volatility: None,
            expense_ratio: None,
            aum: None,
            avg_volume: None,
            last_close: None,
        }
    }

    #[test]
    fn keyword_matches_name_and_tags_case_insensitively() {
        let i = inst("KODEX 200", &["국내주식", "KOSPI 200"]);
        assert!(i.matches_keyword("kodex"));
        assert!(i.matches_keyword("kospi"));
        assert!(i.matches_keyword("국내"));
        assert!(!i.matches_keyword("미국"));
    }

    #[test]
    fn empty_keyword_matches_everything() {
        let i = inst("TIGER 미국S&P500", &[]);
        assert!(i.matches_keyword(""));
        assert!(i.matches_keyword("   "));
    }
}
