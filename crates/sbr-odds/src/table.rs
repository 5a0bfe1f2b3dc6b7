//! Tabular view of translated records
//!
//! Nested objects flatten into dotted column names (`source.name`); arrays
//! stay as single cells. Columns appear in first-seen order across rows, and
//! a row missing a column holds `null` there.

use std::collections::HashMap;
use std::io::Write;

use serde_json::{Map, Value};

use crate::error::Result;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

fn flatten_into(prefix: &str, map: &Map<String, Value>, out: &mut Vec<(String, Value)>) {
    for (k, v) in map {
        let key = if prefix.is_empty() { k.clone() } else { format!("{}.{}", prefix, k) };
        match v {
            Value::Object(inner) if !inner.is_empty() => flatten_into(&key, inner, out),
            other => out.push((key, other.clone())),
        }
    }
}

fn cell_text(v: &Value) -> String {
    match v {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl Table {
    pub fn from_records(records: &[Value]) -> Self {
        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        let mut flat_rows: Vec<Vec<(String, Value)>> = Vec::with_capacity(records.len());

        for record in records {
            let mut flat = Vec::new();
            match record {
                Value::Object(map) => flatten_into("", map, &mut flat),
                other => flat.push(("value".to_string(), other.clone())),
            }
            for (k, _) in &flat {
                if !positions.contains_key(k) {
                    positions.insert(k.clone(), columns.len());
                    columns.push(k.clone());
                }
            }
            flat_rows.push(flat);
        }

        let rows = flat_rows
            .into_iter()
            .map(|flat| {
                let mut row = vec![Value::Null; columns.len()];
                for (k, v) in flat {
                    row[positions[&k]] = v;
                }
                row
            })
            .collect();

        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Cell at `row` under `column`
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.columns.iter().position(|c| c == column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Write the table as CSV with a header row
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut w = csv::Writer::from_writer(writer);
        w.write_record(&self.columns)?;
        for row in &self.rows {
            w.write_record(row.iter().map(cell_text))?;
        }
        w.flush().map_err(csv::Error::from)?;
        Ok(())
    }

    pub fn to_csv_string(&self) -> Result<String> {
        let mut buf = Vec::new();
        self.write_csv(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flattens_nested_objects() {
        let records = vec![
            json!({"event id": 1, "source": {"name": "Atlanta", "abbreviation": "ATL"}, "scores": [1, 2]}),
            json!({"event id": 2, "extra": true}),
        ];
        let table = Table::from_records(&records);

        assert_eq!(table.len(), 2);
        assert_eq!(table.get(0, "source.name"), Some(&json!("Atlanta")));
        assert_eq!(table.get(0, "scores"), Some(&json!([1, 2])));
        assert_eq!(table.get(1, "source.name"), Some(&Value::Null));
        assert_eq!(table.get(1, "extra"), Some(&json!(true)));
        assert_eq!(table.get(5, "extra"), None);
        assert_eq!(table.columns().last().map(String::as_str), Some("extra"));
    }

    #[test]
    fn test_csv_export() {
        let table = Table::from_records(&[json!({"a": 1, "b": "x, y"}), json!({"a": null})]);
        let csv = table.to_csv_string().unwrap();
        assert_eq!(csv, "a,b\n1,\"x, y\"\n,\n");
    }

    #[test]
    fn test_empty() {
        let table = Table::from_records(&[]);
        assert!(table.is_empty());
        assert!(table.columns().is_empty());
    }
}
