//! Precomputed per-instrument dimension scores, refreshed out of band
//! by the worker and loaded read-only at startup.

use crate::domain::recommendation::DimensionVector;
use crate::store::fundamentals::FundamentalsStore;
use crate::store::table::Table;
use std::collections::HashMap;
use std::path::Path;

pub struct ScoreCache {
    by_code: HashMap<String, DimensionVector>,
}

impl ScoreCache {
    /// Load from `scores.csv` under `data_dir`. Rows for codes the
    /// fundamentals store does not know are dropped, keeping the
    /// cache a subset of the instrument universe. Missing file means
    /// an empty cache and therefore empty recommendation sets.
    pub fn load(data_dir: &Path, fundamentals: &FundamentalsStore) -> Self {
        let path = data_dir.join("scores.csv");
        let table = match Table::read(&path) {
            Ok(t) => t,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "score export unavailable, starting empty"
                );
                return Self {
                    by_code: HashMap::new(),
                };
            }
        };
        let cache = Self::from_table(&table, fundamentals);
        tracing::info!(scored = cache.len(), "score cache loaded");
        cache
    }

    pub fn from_table(table: &Table, fundamentals: &FundamentalsStore) -> Self {
        let mut by_code = HashMap::new();
        for row in table.rows() {
            let Some(code) = row.text("code") else {
                continue;
            };
            if !fundamentals.contains(&code) {
                tracing::warn!(%code, "score row for unknown instrument, dropping");
                continue;
            }
            let breakdown = DimensionVector {
                ret: row.num("ret").unwrap_or(0.0),
                risk_adjusted: row.num("risk_adjusted").unwrap_or(0.0),
                cost: row.num("cost").unwrap_or(0.0),
                liquidity: row.num("liquidity").unwrap_or(0.0),
                stability: row.num("stability").unwrap_or(0.0),
            };
            by_code.insert(code, breakdown);
        }
        Self { by_code }
    }

    pub fn get(&self, code: &str) -> Option<&DimensionVector> {
        self.by_code.get(code)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }
}
