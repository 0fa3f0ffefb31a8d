//! CSV parsing of estimate files into validated records.
//!
//! Row-level failures never abort the batch: valid rows are returned
//! alongside human-readable error strings for the bad ones.

use std::collections::HashMap;

use chrono::NaiveDate;
use csv::{ReaderBuilder, StringRecord, Trim};

use crate::models::EstimateRecord;

const REQUIRED_COLUMNS: [&str; 7] = [
    "id",
    "name",
    "material",
    "diameter_mm",
    "length_mm",
    "application",
    "price",
];

/// Parses CSV bytes into records plus row-error strings.
///
/// Row numbers in error strings are the file's actual line numbers
/// (header is line 1, first data row is line 2).
pub fn parse_file(content: &[u8], filename: &str) -> (Vec<EstimateRecord>, Vec<String>) {
    if filename.ends_with(".xlsx") {
        return (
            Vec::new(),
            vec!["Excelファイルには対応していません。CSV形式で再アップロードしてください。".to_string()],
        );
    }

    let text = String::from_utf8_lossy(content);
    let text = text.strip_prefix('\u{feff}').unwrap_or(&text);

    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns: HashMap<String, usize> = match reader.headers() {
        Ok(headers) => headers
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect(),
        Err(err) => return (Vec::new(), vec![format!("ヘッダー行を読み取れません: {}", err)]),
    };

    let mut missing: Vec<&str> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|col| !columns.contains_key(*col))
        .collect();
    if !missing.is_empty() {
        missing.sort_unstable();
        return (
            Vec::new(),
            vec![format!("必須列が不足しています: {}", missing.join(", "))],
        );
    }

    let mut records = Vec::new();
    let mut errors = Vec::new();

    for (idx, row) in reader.records().enumerate() {
        let row_num = idx + 2;
        let row = match row {
            Ok(row) => row,
            Err(err) => {
                errors.push(format!("行{}: {}", row_num, err));
                continue;
            }
        };

        match parse_row(&columns, &row) {
            Ok(record) => records.push(record),
            Err(reason) => errors.push(format!("行{}: {}", row_num, reason)),
        }
    }

    (records, errors)
}

fn parse_row(
    columns: &HashMap<String, usize>,
    row: &StringRecord,
) -> Result<EstimateRecord, String> {
    let field = |name: &str| -> Option<&str> {
        columns
            .get(name)
            .and_then(|&i| row.get(i))
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };

    let required = |name: &str| -> Result<&str, String> {
        field(name).ok_or_else(|| format!("{}が空です", name))
    };

    Ok(EstimateRecord {
        id: parse_number(required("id")?, "id")?,
        name: required("name")?.to_string(),
        material: required("material")?.to_string(),
        diameter_mm: parse_number(required("diameter_mm")?, "diameter_mm")?,
        length_mm: parse_number(required("length_mm")?, "length_mm")?,
        weight_kg: parse_optional(field("weight_kg"), "weight_kg")?,
        application: required("application")?.to_string(),
        grade: field("grade").map(str::to_string),
        price: parse_number(required("price")?, "price")?,
        quantity: parse_optional(field("quantity"), "quantity")?,
        unit_price: parse_optional(field("unit_price"), "unit_price")?,
        customer: field("customer").map(str::to_string),
        notes: field("notes").map(str::to_string),
        estimate_date: field("estimate_date").map(parse_date).transpose()?,
    })
}

fn parse_number<T: std::str::FromStr>(value: &str, name: &str) -> Result<T, String> {
    value
        .parse::<T>()
        .map_err(|_| format!("{}を数値に変換できません: {}", name, value))
}

fn parse_optional<T: std::str::FromStr>(
    value: Option<&str>,
    name: &str,
) -> Result<Option<T>, String> {
    value.map(|v| parse_number(v, name)).transpose()
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y/%m/%d"))
        .map_err(|_| format!("estimate_dateを日付に変換できません: {}", value))
}
