/// Statistics engine
///
/// On-demand aggregation over the message store for dashboard rendering:
/// stream totals, trailing-window recency counts, active devices, per-device
/// counts, a signal-quality histogram and a zero-filled hourly histogram.
///
/// Every timestamp comparison happens in the configured reference zone, on
/// the source-reported `timestamp` column. A record whose timestamp cannot
/// be parsed is excluded from the aggregate in progress; a failed store
/// query aborts the whole snapshot instead of returning a partial one.
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::Arc;

use chrono::{Duration, FixedOffset, NaiveDateTime};
use serde::Serialize;

use crate::config::StatisticsConfig;
use crate::database::{Database, StoreError};
use crate::types::{
    hour_label, now_in_reference, parse_record_timestamp, reference_offset, truncate_to_hour,
    SignalQuality,
};

// ============================================================================
// SNAPSHOT SCHEMA
// ============================================================================

/// Aggregate snapshot served to dashboard clients. Constructed fresh per
/// request, never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatisticsSnapshot {
    pub total_messages: u64,
    pub last24_hour_messages: u64,
    pub active_devices: u64,
    pub total_join_events: u64,
    pub recent_join_events: u64,
    pub device_counts: Vec<DeviceCount>,
    pub signal_quality: SignalQualityStats,
    pub hourly_counts: Vec<HourlyCount>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCount {
    pub device_id: String,
    pub count: u64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SignalQualityStats {
    pub excellent: u64,
    pub good: u64,
    pub fair: u64,
    pub poor: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct HourlyCount {
    pub hour: String,
    pub count: u64,
}

// ============================================================================
// ENGINE
// ============================================================================

/// Read-only aggregation over the store. Cheap to clone; holds no locks
/// across a computation, so concurrent snapshots are independent.
#[derive(Clone)]
pub struct StatisticsEngine {
    db: Arc<Database>,
    window_hours: i64,
    device_counts_windowed: bool,
    offset: FixedOffset,
}

impl StatisticsEngine {
    pub fn new(db: Arc<Database>, config: &StatisticsConfig) -> Self {
        Self {
            db,
            window_hours: config.window_hours,
            device_counts_windowed: config.device_counts_windowed,
            offset: reference_offset(config.utc_offset_hours),
        }
    }

    /// Snapshot ending at the current wall-clock time.
    pub fn snapshot_now(&self) -> Result<StatisticsSnapshot, StoreError> {
        self.compute_snapshot(now_in_reference(&self.offset))
    }

    /// Snapshot for the trailing window ending at `now`.
    pub fn compute_snapshot(&self, now: NaiveDateTime) -> Result<StatisticsSnapshot, StoreError> {
        let window_start = now - Duration::hours(self.window_hours);

        let total_messages = self.db.count_uplinks()?;
        let total_join_events = self.db.count_join_events()?;

        let windowed = self.db.uplinks_since(&window_start)?;

        let mut recent_messages = 0u64;
        let mut active_devices: BTreeSet<&str> = BTreeSet::new();
        let mut quality = SignalQualityStats::default();
        let mut windowed_device_counts: HashMap<String, u64> = HashMap::new();

        // Hour-aligned buckets covering the window, zero-filled up front so
        // empty hours stay present in the output.
        let mut hourly: BTreeMap<NaiveDateTime, u64> = BTreeMap::new();
        let last_bucket = truncate_to_hour(now);
        for i in 0..self.window_hours {
            hourly.insert(last_bucket - Duration::hours(self.window_hours - 1 - i), 0);
        }

        for record in &windowed {
            let ts = match parse_record_timestamp(&record.timestamp, &self.offset) {
                Some(ts) => ts,
                None => continue,
            };
            if ts < window_start || ts > now {
                continue;
            }

            recent_messages += 1;
            active_devices.insert(record.device_id.as_str());
            *windowed_device_counts
                .entry(record.device_id.clone())
                .or_insert(0) += 1;

            match SignalQuality::classify(record.rssi, record.snr) {
                SignalQuality::Excellent => quality.excellent += 1,
                SignalQuality::Good => quality.good += 1,
                SignalQuality::Fair => quality.fair += 1,
                SignalQuality::Poor => quality.poor += 1,
            }

            if let Some(count) = hourly.get_mut(&truncate_to_hour(ts)) {
                *count += 1;
            }
        }

        let active_devices = active_devices.len() as u64;

        let device_counts = if self.device_counts_windowed {
            let mut counts: Vec<DeviceCount> = windowed_device_counts
                .into_iter()
                .map(|(device_id, count)| DeviceCount { device_id, count })
                .collect();
            sort_device_counts(&mut counts);
            counts
        } else {
            let mut counts = Vec::new();
            for device_id in self.db.distinct_device_ids()? {
                let count = self.db.count_uplinks_for_device(&device_id)?;
                counts.push(DeviceCount { device_id, count });
            }
            sort_device_counts(&mut counts);
            counts
        };

        let recent_join_events = self
            .db
            .joins_since(&window_start)?
            .iter()
            .filter(|event| {
                parse_record_timestamp(&event.timestamp, &self.offset)
                    .map(|ts| ts >= window_start && ts <= now)
                    .unwrap_or(false)
            })
            .count() as u64;

        let hourly_counts = hourly
            .into_iter()
            .map(|(bucket, count)| HourlyCount {
                hour: hour_label(&bucket),
                count,
            })
            .collect();

        Ok(StatisticsSnapshot {
            total_messages,
            last24_hour_messages: recent_messages,
            active_devices,
            total_join_events,
            recent_join_events,
            device_counts,
            signal_quality: quality,
            hourly_counts,
        })
    }
}

/// Descending by count, ties broken by device id ascending so the ordering
/// is deterministic.
fn sort_device_counts(counts: &mut [DeviceCount]) {
    counts.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.device_id.cmp(&b.device_id))
    });
}
