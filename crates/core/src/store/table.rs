//! Tolerant reader for the comma-separated export files the stores
//! load at startup. Exports come from mixed tooling: some are UTF-8
//! (with or without a BOM), older ones are CP949. Rows that do not
//! line up with the header are skipped, not fatal.

use anyhow::{Context, Result};
use encoding_rs::EUC_KR;
use std::collections::HashMap;
use std::path::Path;

pub struct Table {
    header: HashMap<String, usize>,
    rows: Vec<Vec<String>>,
}

impl Table {
    pub fn read(path: &Path) -> Result<Table> {
        let bytes = std::fs::read(path)
            .with_context(|| format!("read table file failed: {}", path.display()))?;
        Ok(Self::parse(&bytes))
    }

    pub fn parse(bytes: &[u8]) -> Table {
        let text = decode_text(bytes);
        let mut lines = text.lines().filter(|l| !l.trim().is_empty());

        let header: HashMap<String, usize> = match lines.next() {
            Some(first) => split_fields(first)
                .into_iter()
                .enumerate()
                .map(|(i, name)| (name.trim().to_ascii_lowercase(), i))
                .collect(),
            None => HashMap::new(),
        };

        let mut rows = Vec::new();
        for line in lines {
            let fields = split_fields(line);
            if fields.len() != header.len() {
                tracing::warn!(
                    expected = header.len(),
                    got = fields.len(),
                    "skipping malformed row"
                );
                continue;
            }
            rows.push(fields);
        }

        Table { header, rows }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |fields| Row {
            header: &self.header,
            fields,
        })
    }
}

pub struct Row<'a> {
    header: &'a HashMap<String, usize>,
    fields: &'a [String],
}

impl Row<'_> {
    pub fn get(&self, column: &str) -> Option<&str> {
        let idx = *self.header.get(column)?;
        self.fields.get(idx).map(|s| s.trim())
    }

    /// Required string column. None when absent or blank.
    pub fn text(&self, column: &str) -> Option<String> {
        self.get(column)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    }

    /// Numeric column, treating blank and unparsable values as missing.
    pub fn num(&self, column: &str) -> Option<f64> {
        self.get(column).and_then(parse_num)
    }
}

fn parse_num(s: &str) -> Option<f64> {
    let t = s.trim();
    if t.is_empty() {
        return None;
    }
    t.parse::<f64>().ok()
}

/// Split a line on commas, honoring double-quoted fields so names
/// containing commas survive.
fn split_fields(line: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                chars.next();
                cur.push('"');
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => out.push(std::mem::take(&mut cur)),
            _ => cur.push(c),
        }
    }
    out.push(cur);
    out
}

/// Decode as UTF-8 when the bytes are valid UTF-8 (stripping a BOM if
/// present), otherwise fall back to CP949.
fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xef\xbb\xbf").unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (cow, _, _) = EUC_KR.decode(bytes);
            cow.into_owned()
        }
    }
}
