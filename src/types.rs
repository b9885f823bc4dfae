/// Core domain types for lorascope
///
/// Uplink records and join events mirror the schema written by the external
/// gateway logger. Records are read-only once stored; this crate never
/// mutates them. Signal quality is a pure classification derived from the
/// radio metrics and is never persisted.
use chrono::{DateTime, FixedOffset, NaiveDateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// RECORDS
// ============================================================================

/// One inbound radio uplink from a device, as stored by the gateway logger.
///
/// Timestamps are kept as the raw text the logger wrote (naive local format,
/// e.g. `2025-08-01T01:11:09.845112`); interpretation happens in the
/// configured reference zone via [`parse_record_timestamp`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UplinkRecord {
    pub id: i64,
    pub timestamp: String,
    pub application_id: String,
    pub device_id: String,
    pub dev_eui: Option<String>,
    pub payload_base64: Option<String>,
    pub payload_hex: Option<String>,
    pub payload_text: Option<String>,
    pub payload_size: Option<i32>,
    pub frame_count: Option<i32>,
    pub f_port: Option<i32>,
    pub frequency: Option<i32>,
    pub data_rate: Option<i32>,
    pub rssi: Option<f64>,
    pub snr: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hostname: Option<String>,
    pub raw_topic: Option<String>,
    pub created_at: Option<String>,
}

impl UplinkRecord {
    /// Signal quality bucket for this record's radio metrics.
    pub fn signal_quality(&self) -> SignalQuality {
        SignalQuality::classify(self.rssi, self.snr)
    }
}

/// A device-network join occurrence. Structurally parallel to
/// [`UplinkRecord`] but a distinct stream with its own table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinEvent {
    pub id: i64,
    pub timestamp: String,
    pub application_id: String,
    pub device_id: String,
    pub dev_eui: String,
    pub join_eui: Option<String>,
    pub dev_addr: Option<String>,
    pub frequency: Option<i32>,
    pub data_rate: Option<i32>,
    pub rssi: Option<f64>,
    pub snr: Option<f64>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub hostname: Option<String>,
    pub raw_topic: Option<String>,
    pub created_at: Option<String>,
}

// ============================================================================
// SIGNAL QUALITY
// ============================================================================

/// Signal quality buckets derived from (rssi, snr).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignalQuality {
    Excellent,
    Good,
    Fair,
    Poor,
}

impl SignalQuality {
    /// Classify radio metrics into a quality bucket.
    ///
    /// Thresholds are checked in order, first match wins; the tiers are
    /// non-overlapping since each rssi/snr floor strictly exceeds the next.
    /// Missing rssi or snr always classifies as `Poor`.
    pub fn classify(rssi: Option<f64>, snr: Option<f64>) -> Self {
        match (rssi, snr) {
            (Some(rssi), Some(snr)) => {
                if rssi > -70.0 && snr > 10.0 {
                    SignalQuality::Excellent
                } else if rssi > -85.0 && snr > 5.0 {
                    SignalQuality::Good
                } else if rssi > -100.0 && snr > 0.0 {
                    SignalQuality::Fair
                } else {
                    SignalQuality::Poor
                }
            }
            _ => SignalQuality::Poor,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalQuality::Excellent => "EXCELLENT",
            SignalQuality::Good => "GOOD",
            SignalQuality::Fair => "FAIR",
            SignalQuality::Poor => "POOR",
        }
    }
}

// ============================================================================
// REFERENCE ZONE & TIMESTAMPS
// ============================================================================

/// Timestamp format the gateway logger writes into the store. Strings in
/// this format sort lexicographically in time order, which the range
/// queries rely on.
pub const STORE_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.6f";

/// Fixed-offset reference zone used for every timestamp comparison.
pub fn reference_offset(utc_offset_hours: i32) -> FixedOffset {
    // Clamped range keeps east_opt infallible.
    let secs = utc_offset_hours.clamp(-23, 23) * 3600;
    FixedOffset::east_opt(secs).unwrap()
}

/// Current wall-clock time expressed in the reference zone.
pub fn now_in_reference(offset: &FixedOffset) -> NaiveDateTime {
    Utc::now().with_timezone(offset).naive_local()
}

/// Parse a stored record timestamp into the reference zone.
///
/// Accepts the logger's naive ISO format (with or without fraction, `T` or
/// space separated) and RFC 3339 with an explicit offset. Returns `None`
/// for anything else; callers exclude such records rather than failing.
pub fn parse_record_timestamp(raw: &str, offset: &FixedOffset) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(parsed);
        }
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|parsed| parsed.with_timezone(offset).naive_local())
}

/// Format a reference-zone instant for store range queries.
pub fn format_store_timestamp(ts: &NaiveDateTime) -> String {
    ts.format(STORE_TIMESTAMP_FORMAT).to_string()
}

/// Truncate to the containing wall-clock hour boundary.
pub fn truncate_to_hour(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_minute(0)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(ts)
}

/// Label for an hourly histogram bucket, e.g. `2025-08-01 14:00:00`.
pub fn hour_label(bucket: &NaiveDateTime) -> String {
    bucket.format("%Y-%m-%d %H:00:00").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_tiers_in_order() {
        assert_eq!(
            SignalQuality::classify(Some(-60.0), Some(12.0)),
            SignalQuality::Excellent
        );
        assert_eq!(
            SignalQuality::classify(Some(-80.0), Some(7.0)),
            SignalQuality::Good
        );
        assert_eq!(
            SignalQuality::classify(Some(-95.0), Some(2.0)),
            SignalQuality::Fair
        );
        assert_eq!(
            SignalQuality::classify(Some(-110.0), Some(-3.0)),
            SignalQuality::Poor
        );
    }

    #[test]
    fn classify_boundaries_are_strict() {
        // Exactly on the excellent thresholds is NOT excellent.
        assert_eq!(
            SignalQuality::classify(Some(-70.0), Some(10.0)),
            SignalQuality::Good
        );
        // Just inside is.
        assert_eq!(
            SignalQuality::classify(Some(-69.9), Some(10.1)),
            SignalQuality::Excellent
        );
        // Strong rssi alone does not lift the tier.
        assert_eq!(
            SignalQuality::classify(Some(-60.0), Some(0.5)),
            SignalQuality::Fair
        );
    }

    #[test]
    fn classify_missing_metrics_is_poor() {
        assert_eq!(SignalQuality::classify(None, Some(10.0)), SignalQuality::Poor);
        assert_eq!(SignalQuality::classify(Some(-60.0), None), SignalQuality::Poor);
        assert_eq!(SignalQuality::classify(None, None), SignalQuality::Poor);
    }

    #[test]
    fn parse_logger_timestamp_formats() {
        let offset = reference_offset(0);

        let parsed = parse_record_timestamp("2025-08-01T01:11:09.845112", &offset).unwrap();
        assert_eq!(parsed.to_string(), "2025-08-01 01:11:09.845112");

        assert!(parse_record_timestamp("2025-08-01T01:11:09", &offset).is_some());
        assert!(parse_record_timestamp("2025-08-01 01:11:09.5", &offset).is_some());
        assert!(parse_record_timestamp("2025-08-01T01:11:09+02:00", &offset).is_some());
    }

    #[test]
    fn parse_rejects_garbage() {
        let offset = reference_offset(0);
        assert!(parse_record_timestamp("", &offset).is_none());
        assert!(parse_record_timestamp("   ", &offset).is_none());
        assert!(parse_record_timestamp("not-a-timestamp", &offset).is_none());
        assert!(parse_record_timestamp("2025-13-40T99:99:99", &offset).is_none());
    }

    #[test]
    fn rfc3339_is_shifted_into_reference_zone() {
        let offset = reference_offset(2);
        let parsed = parse_record_timestamp("2025-08-01T00:00:00Z", &offset).unwrap();
        assert_eq!(parsed.to_string(), "2025-08-01 02:00:00");
    }

    #[test]
    fn hour_truncation_and_label() {
        let offset = reference_offset(0);
        let ts = parse_record_timestamp("2025-08-01T14:37:22.123456", &offset).unwrap();
        let bucket = truncate_to_hour(ts);
        assert_eq!(hour_label(&bucket), "2025-08-01 14:00:00");
    }

    #[test]
    fn wire_fields_are_camel_case() {
        let record = UplinkRecord {
            id: 1,
            timestamp: "2025-08-01T01:11:09.845112".to_string(),
            application_id: "app-1".to_string(),
            device_id: "dev-1".to_string(),
            dev_eui: Some("0011223344556677".to_string()),
            payload_base64: None,
            payload_hex: None,
            payload_text: None,
            payload_size: None,
            frame_count: None,
            f_port: None,
            frequency: Some(868100000),
            data_rate: Some(5),
            rssi: Some(-72.0),
            snr: Some(8.5),
            latitude: None,
            longitude: None,
            hostname: None,
            raw_topic: None,
            created_at: None,
        };

        let value = serde_json::to_value(&record).unwrap();
        assert!(value.get("deviceId").is_some());
        assert!(value.get("applicationId").is_some());
        assert!(value.get("devEui").is_some());
        assert!(value.get("dataRate").is_some());
        assert!(value.get("payloadBase64").is_some());
        assert!(value.get("device_id").is_none());
    }
}
