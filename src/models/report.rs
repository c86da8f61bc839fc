use std::collections::BTreeMap;

use serde::{Serialize, Serializer};

/// One contributing row's billing detail within a report group.
///
/// Absent fields are omitted from the JSON object. Numeric fields that hold a
/// non-finite value are present but serialized as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChargeLine {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub charge_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_unit_type: Option<String>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "finite_or_null"
    )]
    pub quantity: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "finite_or_null"
    )]
    pub price_per_hour: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "finite_or_null"
    )]
    pub hours: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "finite_or_null"
    )]
    pub subtotal: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "finite_or_null"
    )]
    pub discount: Option<f64>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "finite_or_null"
    )]
    pub total_cost: Option<f64>,
    /// Tag key (the column header) to value. `None` when the row has no
    /// non-null tag cell, so the key is left out entirely.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

/// One distinct (cluster id, cluster name, plan type, region, start date,
/// end date) combination and its charge lines, in row order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportGroup {
    pub subscription_id: String,
    pub cluster_name: String,
    pub plan_type: String,
    pub region: String,
    pub start_date: String,
    pub end_date: String,
    pub charges: Vec<ChargeLine>,
}

/// Body of a successful report response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportResponse {
    pub data: Vec<ReportGroup>,
    /// Number of groups in `data`.
    pub total_rows: usize,
}

impl ReportResponse {
    pub fn new(data: Vec<ReportGroup>) -> Self {
        Self {
            total_rows: data.len(),
            data,
        }
    }
}

/// Replace a non-finite float with `None`.
pub fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

/// Serialize an optional float, writing NaN and infinities as `null`.
fn finite_or_null<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value.and_then(finite) {
        Some(v) => serializer.serialize_some(&v),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_absent_fields_omitted() {
        let line = ChargeLine {
            charge_type: Some("Compute".to_string()),
            total_cost: Some(12.5),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&line).unwrap(),
            json!({"charge_type": "Compute", "total_cost": 12.5})
        );
    }

    #[test]
    fn test_non_finite_fields_emitted_as_null() {
        let line = ChargeLine {
            quantity: Some(f64::NAN),
            hours: Some(f64::INFINITY),
            discount: Some(f64::NEG_INFINITY),
            subtotal: Some(3.0),
            ..Default::default()
        };

        let text = serde_json::to_string(&line).unwrap();
        assert_eq!(
            text,
            r#"{"quantity":null,"hours":null,"subtotal":3.0,"discount":null}"#
        );
    }

    #[test]
    fn test_tags_serialized_when_present() {
        let line = ChargeLine {
            tags: Some(BTreeMap::from([(
                "key1:value".to_string(),
                "team-a".to_string(),
            )])),
            ..Default::default()
        };

        assert_eq!(
            serde_json::to_value(&line).unwrap(),
            json!({"tags": {"key1:value": "team-a"}})
        );
    }

    #[test]
    fn test_response_counts_groups() {
        let response = ReportResponse::new(vec![]);
        assert_eq!(
            serde_json::to_value(&response).unwrap(),
            json!({"data": [], "total_rows": 0})
        );
    }
}
