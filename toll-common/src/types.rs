use serde::{Deserialize, Serialize};

/// One telemetry sample emitted by an on-board unit, as read off the queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TelemetryEvent {
    #[serde(rename = "obuID")]
    pub obu_id: i64,
    #[serde(rename = "currLat")]
    pub curr_lat: f64,
    #[serde(rename = "currLong")]
    pub curr_long: f64,
    #[serde(rename = "prevLat")]
    pub prev_lat: f64,
    #[serde(rename = "prevLong")]
    pub prev_long: f64,
    #[serde(
        rename = "requestId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_string_as_none"
    )]
    pub request_id: Option<String>,
}

/// A distance delta travelled by one vehicle, sent to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceSample {
    pub value: f64,
    #[serde(rename = "obuID")]
    pub obu_id: i64,
    /// Producer-side timestamp, nanoseconds since the unix epoch.
    #[serde(default)]
    pub unix: i64,
    #[serde(
        rename = "requestId",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "empty_string_as_none"
    )]
    pub request_id: Option<String>,
}

impl DistanceSample {
    pub fn new(obu_id: i64, value: f64, unix: i64, request_id: Option<String>) -> Self {
        Self {
            value,
            obu_id,
            unix,
            request_id,
        }
    }

    /// Only finite, non-negative distances can be accumulated.
    pub fn is_valid(&self) -> bool {
        self.value.is_finite() && self.value >= 0.0
    }
}

/// Computed view over the accumulated distance of one vehicle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    #[serde(rename = "obuID")]
    pub obu_id: i64,
    #[serde(rename = "totalDistance")]
    pub total_distance: f64,
    #[serde(rename = "totalAmount")]
    pub total_amount: f64,
}

/// Parse an OBU id as given in a query string. Surrounding whitespace is ignored.
pub fn parse_obu_id(raw: &str) -> Option<i64> {
    raw.trim().parse().ok()
}

// Upstream producers send `"requestId": ""` when they have no correlation id.
fn empty_string_as_none<'de, D>(de: D) -> Result<Option<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(de)?;
    Ok(opt.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    #[test]
    fn telemetry_event_uses_queue_field_names() {
        let raw = r#"{"obuID":12,"currLat":1.5,"currLong":2.5,"prevLat":0.5,"prevLong":0.25,"requestId":"abc"}"#;
        let event: TelemetryEvent = serde_json::from_str(raw).unwrap();

        assert_eq!(event.obu_id, 12);
        assert_eq!(event.curr_lat, 1.5);
        assert_eq!(event.prev_long, 0.25);
        assert_eq!(event.request_id.as_deref(), Some("abc"));
    }

    #[test]
    fn empty_request_id_is_none() {
        let raw = r#"{"obuID":1,"currLat":0,"currLong":0,"prevLat":0,"prevLong":0,"requestId":""}"#;
        let event: TelemetryEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.request_id, None);

        let raw = r#"{"obuID":1,"currLat":0,"currLong":0,"prevLat":0,"prevLong":0}"#;
        let event: TelemetryEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.request_id, None);
    }

    #[test]
    fn distance_sample_requires_id_and_value() {
        assert!(serde_json::from_str::<DistanceSample>(r#"{"obuID":1}"#).is_err());
        assert!(serde_json::from_str::<DistanceSample>(r#"{"value":1.0}"#).is_err());

        let sample: DistanceSample = serde_json::from_str(r#"{"obuID":1,"value":2.5}"#).unwrap();
        assert_eq!(sample, DistanceSample::new(1, 2.5, 0, None));
    }

    #[test]
    fn distance_sample_validity() {
        assert!(DistanceSample::new(1, 0.0, 0, None).is_valid());
        assert!(DistanceSample::new(1, 4.2, 0, None).is_valid());
        assert!(!DistanceSample::new(1, -0.1, 0, None).is_valid());
        assert!(!DistanceSample::new(1, f64::NAN, 0, None).is_valid());
        assert!(!DistanceSample::new(1, f64::INFINITY, 0, None).is_valid());
    }

    #[test]
    fn parses_obu_ids() {
        assert_eq!(parse_obu_id("42"), Some(42));
        assert_eq!(parse_obu_id(" 7 "), Some(7));
        assert_eq!(parse_obu_id("-3"), Some(-3));
        assert_eq!(parse_obu_id(""), None);
        assert_eq!(parse_obu_id("1.5"), None);
        assert_eq!(parse_obu_id("9223372036854775808"), None);
    }

    #[test]
    fn invoice_serializes_with_wire_names() {
        let invoice = Invoice {
            obu_id: 7,
            total_distance: 10.0,
            total_amount: 37.0,
        };

        assert_json_eq!(
            serde_json::to_value(&invoice).unwrap(),
            json!({"obuID": 7, "totalDistance": 10.0, "totalAmount": 37.0})
        );
    }
}
