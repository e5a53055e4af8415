//! Builds the score export the API loads at startup. Each instrument
//! gets five normalized dimension scores in [0, 1]; a dimension with
//! no underlying data scores a neutral 0.5.

use anyhow::{Context, Result};
use etfpick_core::domain::instrument::Instrument;
use etfpick_core::domain::recommendation::DimensionVector;
use etfpick_core::store::FundamentalsStore;
use std::path::Path;

// Normalization anchors: 1-year returns are mapped from -50..+50%,
// Sharpe from -2..+2, expense ratios against a 3% worst case, volume
// against 1M shares/day and AUM against 100B KRW.
const RETURN_SPAN_PCT: f64 = 50.0;
const SHARPE_SPAN: f64 = 2.0;
const MAX_EXPENSE_PCT: f64 = 3.0;
const FULL_LIQUIDITY_VOLUME: f64 = 1.0e6;
const FULL_STABILITY_AUM: f64 = 1.0e11;

const NEUTRAL: f64 = 0.5;

pub fn score_instrument(instrument: &Instrument) -> DimensionVector {
    DimensionVector {
        ret: normalize_return(instrument.return_1y),
        risk_adjusted: normalize_risk_adjusted(instrument.return_1y, instrument.volatility),
        cost: normalize_cost(instrument.expense_ratio),
        liquidity: normalize_liquidity(instrument.avg_volume),
        stability: normalize_stability(instrument.aum),
    }
}

fn normalize_return(return_1y: Option<f64>) -> f64 {
    match return_1y {
        Some(r) => clamp01((r + RETURN_SPAN_PCT) / (2.0 * RETURN_SPAN_PCT)),
        None => NEUTRAL,
    }
}

fn normalize_risk_adjusted(return_1y: Option<f64>, volatility: Option<f64>) -> f64 {
    match (return_1y, volatility) {
        (Some(r), Some(v)) if v > 0.0 => {
            let sharpe = r / v;
            clamp01((sharpe + SHARPE_SPAN) / (2.0 * SHARPE_SPAN))
        }
        _ => NEUTRAL,
    }
}

fn normalize_cost(expense_ratio: Option<f64>) -> f64 {
    match expense_ratio {
        Some(e) => clamp01(1.0 - e / MAX_EXPENSE_PCT),
        None => NEUTRAL,
    }
}

fn normalize_liquidity(avg_volume: Option<f64>) -> f64 {
    match avg_volume {
        Some(v) => clamp01(v / FULL_LIQUIDITY_VOLUME),
        None => NEUTRAL,
    }
}

fn normalize_stability(aum: Option<f64>) -> f64 {
    match aum {
        Some(a) => clamp01(a / FULL_STABILITY_AUM),
        None => NEUTRAL,
    }
}

fn clamp01(v: f64) -> f64 {
    v.clamp(0.0, 1.0)
}

pub fn render_csv(fundamentals: &FundamentalsStore) -> String {
    let mut codes: Vec<&str> = fundamentals.iter().map(|i| i.code.as_str()).collect();
    codes.sort_unstable();

    let mut out = String::from("code,ret,risk_adjusted,cost,liquidity,stability\n");
    for code in codes {
        let Some(instrument) = fundamentals.get(code) else {
            continue;
        };
        let s = score_instrument(instrument);
        out.push_str(&format!(
            "{},{:.6},{:.6},{:.6},{:.6},{:.6}\n",
            instrument.code, s.ret, s.risk_adjusted, s.cost, s.liquidity, s.stability
        ));
    }
    out
}

/// Write the export atomically: readers either see the old file or
/// the complete new one, never a partial write.
pub fn write_csv(fundamentals: &FundamentalsStore, out_path: &Path) -> Result<usize> {
    let csv = render_csv(fundamentals);
    let tmp_path = out_path.with_extension("csv.tmp");
    std::fs::write(&tmp_path, &csv)
        .with_context(|| format!("write {} failed", tmp_path.display()))?;
    std::fs::rename(&tmp_path, out_path)
        .with_context(|| format!("rename into {} failed", out_path.display()))?;
    Ok(fundamentals.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inst(
        return_1y: Option<f64>,
        volatility: Option<f64>,
        expense_ratio: Option<f64>,
        aum: Option<f64>,
        avg_volume: Option<f64>,
    ) -> Instrument {
        Instrument {
            code: "069500".to_string(),
            name: "KODEX 200".to_string(),
            tags: vec![],
            risk_tier: 3,
            return_1y,
            volatility,
            expense_ratio,
            aum,
            avg_volume,
            last_close: None,
        }
    }

    #[test]
    fn return_maps_span_onto_unit_interval() {
        assert_eq!(normalize_return(Some(-50.0)), 0.0);
        assert_eq!(normalize_return(Some(0.0)), 0.5);
        assert_eq!(normalize_return(Some(50.0)), 1.0);
        assert_eq!(normalize_return(Some(120.0)), 1.0);
        assert_eq!(normalize_return(None), 0.5);
    }

    #[test]
    fn risk_adjusted_needs_both_inputs() {
        assert_eq!(normalize_risk_adjusted(Some(14.0), Some(7.0)), 1.0);
        assert_eq!(normalize_risk_adjusted(Some(0.0), Some(10.0)), 0.5);
        assert_eq!(normalize_risk_adjusted(Some(10.0), None), 0.5);
        assert_eq!(normalize_risk_adjusted(Some(10.0), Some(0.0)), 0.5);
    }

    #[test]
    fn cost_penalizes_high_expense_ratios() {
        assert_eq!(normalize_cost(Some(0.0)), 1.0);
        assert!((normalize_cost(Some(0.15)) - 0.95).abs() < 1e-12);
        assert_eq!(normalize_cost(Some(4.5)), 0.0);
        assert_eq!(normalize_cost(None), 0.5);
    }

    #[test]
    fn liquidity_and_stability_saturate() {
        assert_eq!(normalize_liquidity(Some(5.0e6)), 1.0);
        assert_eq!(normalize_liquidity(Some(2.5e5)), 0.25);
        assert_eq!(normalize_stability(Some(2.0e11)), 1.0);
        assert_eq!(normalize_stability(Some(5.0e10)), 0.5);
    }

    #[test]
    fn sparse_instrument_scores_neutral_everywhere() {
        let s = score_instrument(&inst(None, None, None, None, None));
        assert_eq!(s.ret, 0.5);
        assert_eq!(s.risk_adjusted, 0.5);
        assert_eq!(s.cost, 0.5);
        assert_eq!(s.liquidity, 0.5);
        assert_eq!(s.stability, 0.5);
    }

    #[test]
    fn csv_has_header_and_sorted_rows() {
        use etfpick_core::store::table::Table;
        let fundamentals = FundamentalsStore::from_table(&Table::parse(
            b"code,name,risk_tier,return_1y\n360750,TIGER S&P500,3,21.0\n069500,KODEX 200,3,12.5\n",
        ));
        let csv = render_csv(&fundamentals);
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "code,ret,risk_adjusted,cost,liquidity,stability");
        assert!(lines[1].starts_with("069500,"));
        assert!(lines[2].starts_with("360750,"));
    }

    #[test]
    fn write_replaces_file_atomically() {
        use etfpick_core::store::table::Table;
        let dir = std::env::temp_dir().join(format!("scores-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let out = dir.join("scores.csv");

        let fundamentals = FundamentalsStore::from_table(&Table::parse(
            b"code,name,risk_tier\n069500,KODEX 200,3\n",
        ));
        let n = write_csv(&fundamentals, &out).unwrap();
        assert_eq!(n, 1);
        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.contains("069500"));
        assert!(!out.with_extension("csv.tmp").exists());

        std::fs::remove_dir_all(&dir).ok();
    }
}
