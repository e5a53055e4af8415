use crate::domain::error::CoreError;
use crate::domain::recommendation::DimensionVector;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// WMTI investor archetype. Selects the weight vector the scorer
/// applies over the five scoring dimensions.
///
/// Four-letter code: A/I (active vs. introspective) + P/B (expert vs.
/// prudent) + W/M + L/C. The sixteen combinations each carry a fixed
/// weight table; weights per archetype sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Archetype {
    Apwl,
    Apml,
    Apwc,
    Apmc,
    Abwl,
    Abml,
    Abwc,
    Abmc,
    Ipwl,
    Ipml,
    Ipwc,
    Ipmc,
    Ibwl,
    Ibml,
    Ibwc,
    Ibmc,
}

impl Archetype {
    pub const ALL: [Archetype; 16] = [
        Archetype::Apwl,
        Archetype::Apml,
        Archetype::Apwc,
        Archetype::Apmc,
        Archetype::Abwl,
        Archetype::Abml,
        Archetype::Abwc,
        Archetype::Abmc,
        Archetype::Ipwl,
        Archetype::Ipml,
        Archetype::Ipwc,
        Archetype::Ipmc,
        Archetype::Ibwl,
        Archetype::Ibml,
        Archetype::Ibwc,
        Archetype::Ibmc,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Archetype::Apwl => "APWL",
            Archetype::Apml => "APML",
            Archetype::Apwc => "APWC",
            Archetype::Apmc => "APMC",
            Archetype::Abwl => "ABWL",
            Archetype::Abml => "ABML",
            Archetype::Abwc => "ABWC",
            Archetype::Abmc => "ABMC",
            Archetype::Ipwl => "IPWL",
            Archetype::Ipml => "IPML",
            Archetype::Ipwc => "IPWC",
            Archetype::Ipmc => "IPMC",
            Archetype::Ibwl => "IBWL",
            Archetype::Ibml => "IBML",
            Archetype::Ibwc => "IBWC",
            Archetype::Ibmc => "IBMC",
        }
    }

    /// Fixed weight vector over (return, risk-adjusted, cost,
    /// liquidity, stability). AP* archetypes tilt toward raw return,
    /// IB* toward cost and stability.
    pub fn weights(&self) -> DimensionVector {
        let (ret, risk_adjusted, cost, liquidity, stability) = match self {
            Archetype::Apwl => (0.35, 0.30, 0.15, 0.15, 0.05),
            Archetype::Apml => (0.40, 0.25, 0.15, 0.15, 0.05),
            Archetype::Apwc => (0.35, 0.25, 0.20, 0.15, 0.05),
            Archetype::Apmc => (0.40, 0.25, 0.15, 0.15, 0.05),
            Archetype::Abwl => (0.30, 0.25, 0.20, 0.15, 0.10),
            Archetype::Abml => (0.30, 0.25, 0.20, 0.15, 0.10),
            Archetype::Abwc => (0.25, 0.25, 0.25, 0.15, 0.10),
            Archetype::Abmc => (0.30, 0.25, 0.20, 0.15, 0.10),
            Archetype::Ipwl => (0.25, 0.30, 0.25, 0.10, 0.10),
            Archetype::Ipml => (0.30, 0.30, 0.20, 0.10, 0.10),
            Archetype::Ipwc => (0.25, 0.30, 0.25, 0.10, 0.10),
            Archetype::Ipmc => (0.30, 0.30, 0.20, 0.10, 0.10),
            Archetype::Ibwl => (0.20, 0.25, 0.25, 0.15, 0.15),
            Archetype::Ibml => (0.25, 0.25, 0.25, 0.15, 0.10),
            Archetype::Ibwc => (0.20, 0.25, 0.30, 0.15, 0.10),
            Archetype::Ibmc => (0.25, 0.25, 0.25, 0.15, 0.10),
        };
        DimensionVector {
            ret,
            risk_adjusted,
            cost,
            liquidity,
            stability,
        }
    }
}

impl FromStr for Archetype {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Archetype::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == code)
            .ok_or_else(|| CoreError::InvalidProfile(format!("unknown archetype: {s}")))
    }
}

impl fmt::Display for Archetype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// MPTI explanation style. Presentation-only: it shapes the tone the
/// explanation collaborator is asked for and never affects scoring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExplanationStyle {
    Fact,
    Opinion,
    Intensive,
    Extensive,
    Skimming,
    Perusing,
}

impl ExplanationStyle {
    /// Lenient parse: unrecognized tags fall back to Fact, matching
    /// the original product's default rather than failing a request
    /// over a cosmetic field.
    pub fn parse_or_default(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "opinion" => ExplanationStyle::Opinion,
            "intensive" => ExplanationStyle::Intensive,
            "extensive" => ExplanationStyle::Extensive,
            "skimming" => ExplanationStyle::Skimming,
            "perusing" => ExplanationStyle::Perusing,
            _ => ExplanationStyle::Fact,
        }
    }

    pub fn prompt_line(&self) -> &'static str {
        match self {
            ExplanationStyle::Fact => "객관적 데이터와 검증 가능한 수치를 중심으로 설명하세요.",
            ExplanationStyle::Opinion => "전문가 관점의 해석과 전망을 포함해 설명하세요.",
            ExplanationStyle::Intensive => "가장 중요한 포인트에만 집중해 간결하게 설명하세요.",
            ExplanationStyle::Extensive => "여러 관점과 배경 맥락을 함께 폭넓게 설명하세요.",
            ExplanationStyle::Skimming => "핵심만 짧게 요약해 빠르게 읽히도록 설명하세요.",
            ExplanationStyle::Perusing => "지표와 시장 동향까지 포함해 깊이 있게 설명하세요.",
        }
    }
}

/// Per-request user profile. Not persisted by the core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    /// Experience level, ordinal 1 (beginner) to 5 (expert).
    pub level: u8,
    pub archetype: Archetype,
    pub style: ExplanationStyle,
}

impl UserProfile {
    pub fn new(level: i64, archetype: &str, style: &str) -> Result<Self, CoreError> {
        Ok(Self {
            level: clamp_level(level),
            archetype: archetype.parse()?,
            style: ExplanationStyle::parse_or_default(style),
        })
    }

    /// Maximum allowed instrument risk tier for this profile.
    pub fn risk_ceiling(&self) -> u8 {
        risk_ceiling(self.level)
    }
}

/// Level-to-risk-tier ceiling. Level n unlocks tiers 1..=n, so a
/// level-1 beginner only sees tier-1 products and level 5 sees the
/// whole universe.
pub fn risk_ceiling(level: u8) -> u8 {
    clamp_level(level as i64)
}

fn clamp_level(level: i64) -> u8 {
    level.clamp(1, 5) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_weight_vectors_sum_to_one() {
        for archetype in Archetype::ALL {
            let sum = archetype.weights().sum();
            assert!(
                (sum - 1.0).abs() < 1e-9,
                "{archetype} weights sum to {sum}"
            );
        }
    }

    #[test]
    fn archetype_parse_is_case_insensitive() {
        assert_eq!("apwl".parse::<Archetype>().unwrap(), Archetype::Apwl);
        assert_eq!(" IBMC ".parse::<Archetype>().unwrap(), Archetype::Ibmc);
    }

    #[test]
    fn unknown_archetype_is_invalid_profile() {
        let err = UserProfile::new(3, "ZZZZ", "fact").unwrap_err();
        assert!(matches!(err, CoreError::InvalidProfile(_)));
    }

    #[test]
    fn level_is_clamped_into_range() {
        assert_eq!(UserProfile::new(0, "APWL", "fact").unwrap().level, 1);
        assert_eq!(UserProfile::new(9, "APWL", "fact").unwrap().level, 5);
        assert_eq!(UserProfile::new(3, "APWL", "fact").unwrap().level, 3);
    }

    #[test]
    fn risk_ceiling_tracks_level() {
        for level in 1..=5u8 {
            assert_eq!(risk_ceiling(level), level);
        }
    }

    #[test]
    fn unknown_style_defaults_to_fact() {
        assert_eq!(
            ExplanationStyle::parse_or_default("whatever"),
            ExplanationStyle::Fact
        );
        assert_eq!(
            ExplanationStyle::parse_or_default("PERUSING"),
            ExplanationStyle::Perusing
        );
    }
}
