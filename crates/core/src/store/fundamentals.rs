//! In-memory store of instrument identity and fundamentals, loaded
//! once at startup from the periodic KRX export and read-only after.

use crate::domain::instrument::Instrument;
use crate::store::table::Table;
use std::collections::HashMap;
use std::path::Path;

pub struct FundamentalsStore {
    by_code: HashMap<String, Instrument>,
}

impl FundamentalsStore {
    /// Load from `fundamentals.csv` under `data_dir`. A missing or
    /// undecodable file yields an empty store so the service can
    /// still come up; every lookup will then be NotFound.
    pub fn load(data_dir: &Path) -> Self {
        let path = data_dir.join("fundamentals.csv");
        let table = match Table::read(&path) {
            Ok(t) => t,
            Err(err) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %err,
                    "fundamentals export unavailable, starting empty"
                );
                return Self {
                    by_code: HashMap::new(),
                };
            }
        };
        let store = Self::from_table(&table);
        tracing::info!(instruments = store.len(), "fundamentals loaded");
        store
    }

    pub fn from_table(table: &Table) -> Self {
        let mut by_code: HashMap<String, Instrument> = HashMap::new();
        for row in table.rows() {
            let Some(code) = row.text("code") else {
                continue;
            };
            let Some(name) = row.text("name") else {
                tracing::warn!(%code, "skipping instrument without a name");
                continue;
            };
            // Keep-first on duplicate codes; the export is ordered
            // newest-listing-last.
            if by_code.contains_key(&code) {
                tracing::warn!(%code, "duplicate instrument code, keeping first");
                continue;
            }

            let tags = row
                .text("tags")
                .map(|t| {
                    t.split('|')
                        .map(str::trim)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            let risk_tier = row
                .num("risk_tier")
                .map(|v| (v as i64).clamp(1, 5) as u8)
                .unwrap_or(3);

            by_code.insert(
                code.clone(),
                Instrument {
                    code,
                    name,
                    tags,
                    risk_tier,
                    return_1y: row.num("return_1y"),
                    volatility: row.num("volatility"),
                    expense_ratio: row.num("expense_ratio"),
                    aum: row.num("aum"),
                    avg_volume: row.num("avg_volume"),
                    last_close: row.num("last_close"),
                },
            );
        }
        Self { by_code }
    }

    pub fn get(&self, code: &str) -> Option<&Instrument> {
        self.by_code.get(code)
    }

    pub fn contains(&self, code: &str) -> bool {
        self.by_code.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.by_code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_code.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instrument> {
        self.by_code.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &[u8] = b"code,name,tags,risk_tier,return_1y,volatility,expense_ratio,aum,avg_volume,last_close\n\
069500,KODEX 200,\xea\xb5\xad\xeb\x82\xb4\xec\xa3\xbc\xec\x8b\x9d|KOSPI 200,3,12.5,14.2,0.15,6.1e12,5.2e6,36000\n\
360750,TIGER \xeb\xaf\xb8\xea\xb5\xadS&P500,\xed\x95\xb4\xec\x99\xb8\xec\xa3\xbc\xec\x8b\x9d,3,21.0,,0.07,3.5e12,1.8e6,19500\n\
069500,DUPLICATE,,5,,,,,,\n";

    fn store() -> FundamentalsStore {
        FundamentalsStore::from_table(&Table::parse(CSV))
    }

    #[test]
    fn loads_instruments_with_split_tags() {
        let s = store();
        assert_eq!(s.len(), 2);
        let i = s.get("069500").unwrap();
        assert_eq!(i.tags, vec!["국내주식", "KOSPI 200"]);
        assert_eq!(i.return_1y, Some(12.5));
    }

    #[test]
    fn duplicate_codes_keep_first_record() {
        let s = store();
        assert_eq!(s.get("069500").unwrap().name, "KODEX 200");
    }

    #[test]
    fn blank_numeric_fields_stay_missing() {
        let s = store();
        let i = s.get("360750").unwrap();
        assert_eq!(i.volatility, None);
        assert_eq!(i.expense_ratio, Some(0.07));
    }

    #[test]
    fn missing_file_loads_empty() {
        let s = FundamentalsStore::load(Path::new("/nonexistent/dir"));
        assert!(s.is_empty());
        assert!(s.get("069500").is_none());
    }
}
