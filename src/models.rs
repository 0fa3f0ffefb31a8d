//! Domain model for priced manufacturing estimates.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An immutable snapshot of a priced manufacturing job.
///
/// `id` is the sole stable identity: re-importing a record with the same id
/// overwrites the stored point instead of duplicating it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EstimateRecord {
    pub id: u64,
    pub name: String,
    pub material: String,
    pub diameter_mm: f64,
    pub length_mm: f64,
    pub weight_kg: Option<f64>,
    pub application: String,
    pub grade: Option<String>,
    pub price: i64,
    pub quantity: Option<i64>,
    pub unit_price: Option<i64>,
    pub customer: Option<String>,
    pub notes: Option<String>,
    pub estimate_date: Option<NaiveDate>,
}

impl EstimateRecord {
    /// Text fed to the embedding model.
    ///
    /// Price, quantity, unit price, customer and date are deliberately
    /// excluded so that similarity reflects the physical job, not its
    /// commercial or temporal context.
    pub fn embedding_text(&self) -> String {
        let mut parts = vec![
            self.name.clone(),
            self.material.clone(),
            format!("Φ{}×{}mm", self.diameter_mm, self.length_mm),
        ];
        if let Some(weight) = self.weight_kg {
            parts.push(format!("{}kg", weight));
        }
        parts.push(self.application.clone());
        if let Some(grade) = &self.grade {
            parts.push(grade.clone());
        }
        if let Some(notes) = &self.notes {
            parts.push(notes.clone());
        }
        parts.join(" ")
    }

    /// Payload stored alongside the vector: the full record minus `id`,
    /// plus the embedding text under `"text"`.
    pub fn payload(&self) -> Value {
        let mut payload = serde_json::to_value(self).unwrap_or(Value::Null);
        if let Some(obj) = payload.as_object_mut() {
            obj.remove("id");
            obj.insert("text".to_string(), Value::String(self.embedding_text()));
        }
        payload
    }
}

/// Outcome of one import call.
///
/// `new_count`/`updated_count` partition the input ids against the store
/// snapshot taken at check time. The pipeline itself raises no row-level
/// errors; `errors` exists so callers can merge in parse failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportResult {
    pub new_count: usize,
    pub updated_count: usize,
    pub errors: Vec<String>,
    pub total_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_record() -> EstimateRecord {
        EstimateRecord {
            id: 42,
            name: "シャフト".to_string(),
            material: "SUS304".to_string(),
            diameter_mm: 30.0,
            length_mm: 200.0,
            weight_kg: Some(1.2),
            application: "ポンプ軸".to_string(),
            grade: Some("研磨仕上げ".to_string()),
            price: 15000,
            quantity: Some(10),
            unit_price: Some(1500),
            customer: Some("テスト工業".to_string()),
            notes: Some("端面C1".to_string()),
            estimate_date: NaiveDate::from_ymd_opt(2024, 6, 3),
        }
    }

    #[test]
    fn embedding_text_includes_physical_fields() {
        let text = full_record().embedding_text();
        assert!(text.contains("シャフト"));
        assert!(text.contains("SUS304"));
        assert!(text.contains("Φ30×200mm"));
        assert!(text.contains("1.2kg"));
        assert!(text.contains("ポンプ軸"));
        assert!(text.contains("研磨仕上げ"));
        assert!(text.contains("端面C1"));
    }

    #[test]
    fn embedding_text_excludes_commercial_fields() {
        let text = full_record().embedding_text();
        assert!(!text.contains("15000"));
        assert!(!text.contains("1500"));
        assert!(!text.contains("10"));
        assert!(!text.contains("テスト工業"));
        assert!(!text.contains("2024"));
    }

    #[test]
    fn embedding_text_skips_absent_optionals() {
        let record = EstimateRecord {
            weight_kg: None,
            grade: None,
            notes: None,
            ..full_record()
        };
        assert_eq!(
            record.embedding_text(),
            "シャフト SUS304 Φ30×200mm ポンプ軸"
        );
    }

    #[test]
    fn payload_drops_id_and_carries_text() {
        let payload = full_record().payload();
        let obj = payload.as_object().unwrap();
        assert!(!obj.contains_key("id"));
        assert_eq!(obj["material"], "SUS304");
        assert_eq!(obj["price"], 15000);
        assert_eq!(obj["estimate_date"], "2024-06-03");
        assert_eq!(obj["text"], full_record().embedding_text());
    }
}
