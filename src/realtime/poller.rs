/// Watermark poller
///
/// Discovers newly stored uplink records and feeds them to the WebSocket
/// hub. Each tick fetches `[watermark, now)` oldest-first and publishes in
/// store order; the watermark then advances to the `now` captured at fetch
/// start, so a record written mid-fetch is picked up next tick. A store
/// failure leaves the watermark unadvanced and the same window is retried
/// (at-least-once on the push path).
///
/// The watermark has exactly one writer: this task. When no viewers are
/// connected the fetch is skipped entirely.
use std::sync::Arc;
use std::time::Duration;

use chrono::{FixedOffset, NaiveDateTime};
use tokio::sync::watch;

use crate::arguments::is_debug_realtime_enabled;
use crate::database::{Database, StoreError};
use crate::logger::{self, LogTag};
use crate::types::{now_in_reference, reference_offset};
use crate::webserver::ws::WsHub;

pub struct RealtimePoller {
    db: Arc<Database>,
    hub: Arc<WsHub>,
    watermark: NaiveDateTime,
    offset: FixedOffset,
}

impl RealtimePoller {
    /// The initial watermark is "now": records stored before startup are
    /// history, not realtime traffic.
    pub fn new(db: Arc<Database>, hub: Arc<WsHub>, utc_offset_hours: i32) -> Self {
        let offset = reference_offset(utc_offset_hours);
        Self {
            db,
            hub,
            watermark: now_in_reference(&offset),
            offset,
        }
    }

    pub fn watermark(&self) -> NaiveDateTime {
        self.watermark
    }

    /// One poll cycle against the given `now`. Returns the number of
    /// records published.
    pub async fn tick(&mut self, now: NaiveDateTime) -> Result<usize, StoreError> {
        // Nobody is watching: skip the store query, keep the watermark.
        if self.hub.session_count().await == 0 {
            return Ok(0);
        }

        let batch = self.db.uplinks_in_range(&self.watermark, &now)?;

        for record in &batch {
            self.hub.broadcast_uplink(record).await;
        }

        // Advance to the fetch-start instant, not the post-dispatch time.
        self.watermark = now;

        Ok(batch.len())
    }

    /// Drive the tick loop until the shutdown signal fires.
    pub async fn run(
        mut self,
        poll_interval: Duration,
        status_interval: Duration,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        let mut status_ticker = tokio::time::interval(status_interval);

        logger::info(
            LogTag::Realtime,
            &format!(
                "Realtime poller started (interval={}s)",
                poll_interval.as_secs()
            ),
        );

        loop {
            tokio::select! {
                biased;

                _ = shutdown.changed() => {
                    logger::info(LogTag::Realtime, "Realtime poller stopping");
                    break;
                }

                _ = ticker.tick() => {
                    let now = now_in_reference(&self.offset);
                    match self.tick(now).await {
                        Ok(0) => {}
                        Ok(published) => {
                            logger::info(
                                LogTag::Realtime,
                                &format!("Published {} new uplink records", published),
                            );
                        }
                        Err(e) => {
                            logger::warning(
                                LogTag::Realtime,
                                &format!("Store query failed, watermark held for retry: {}", e),
                            );
                        }
                    }
                }

                _ = status_ticker.tick() => {
                    let sessions = self.hub.session_count().await;
                    if sessions > 0 {
                        logger::info(
                            LogTag::Realtime,
                            &format!("Active viewer sessions: {}", sessions),
                        );
                    } else if is_debug_realtime_enabled() {
                        logger::debug(LogTag::Realtime, "No active viewer sessions");
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{format_store_timestamp, UplinkRecord};
    use chrono::Duration as ChronoDuration;

    fn uplink_at(device: &str, ts: &NaiveDateTime) -> UplinkRecord {
        UplinkRecord {
            id: 0,
            timestamp: format_store_timestamp(ts),
            application_id: "app-1".to_string(),
            device_id: device.to_string(),
            dev_eui: None,
            payload_base64: None,
            payload_hex: None,
            payload_text: None,
            payload_size: None,
            frame_count: None,
            f_port: None,
            frequency: None,
            data_rate: None,
            rssi: Some(-75.0),
            snr: Some(6.0),
            latitude: None,
            longitude: None,
            hostname: None,
            raw_topic: None,
            created_at: None,
        }
    }

    #[tokio::test]
    async fn skips_fetch_when_no_sessions() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let hub = WsHub::new(8);
        let mut poller = RealtimePoller::new(db.clone(), hub.clone(), 0);

        let before = poller.watermark();
        db.insert_uplink(&uplink_at("dev-a", &(before + ChronoDuration::seconds(1)))).unwrap();

        let now = before + ChronoDuration::seconds(10);
        let published = poller.tick(now).await.unwrap();

        assert_eq!(published, 0);
        // Watermark untouched: the skipped window is still pending.
        assert_eq!(poller.watermark(), before);
    }

    #[tokio::test]
    async fn publishes_new_records_in_store_order() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let hub = WsHub::new(8);
        let (_id, mut rx) = hub.register_session().await;
        let mut poller = RealtimePoller::new(db.clone(), hub.clone(), 0);

        let base = poller.watermark();
        for (i, device) in ["dev-1", "dev-2", "dev-3"].iter().enumerate() {
            let ts = base + ChronoDuration::seconds(i as i64 + 1);
            db.insert_uplink(&uplink_at(device, &ts)).unwrap();
        }

        let now = base + ChronoDuration::seconds(30);
        let published = poller.tick(now).await.unwrap();
        assert_eq!(published, 3);
        assert_eq!(poller.watermark(), now);

        for expected in ["dev-1", "dev-2", "dev-3"] {
            let frame = rx.recv().await.unwrap();
            assert!(frame.contains(expected));
        }
    }

    #[tokio::test]
    async fn watermark_advances_to_fetch_start_and_never_regresses() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let hub = WsHub::new(8);
        let (_id, _rx) = hub.register_session().await;
        let mut poller = RealtimePoller::new(db, hub, 0);

        let base = poller.watermark();
        let mut previous = base;
        for i in 1..=4 {
            let now = base + ChronoDuration::seconds(i * 10);
            poller.tick(now).await.unwrap();
            assert_eq!(poller.watermark(), now);
            assert!(poller.watermark() >= previous);
            previous = poller.watermark();
        }
    }

    #[tokio::test]
    async fn record_between_ticks_is_not_skipped() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let hub = WsHub::new(8);
        let (_id, mut rx) = hub.register_session().await;
        let mut poller = RealtimePoller::new(db.clone(), hub.clone(), 0);

        let base = poller.watermark();
        let fetch_start = base + ChronoDuration::seconds(10);
        poller.tick(fetch_start).await.unwrap();

        // A record stamped inside the previous window but stored after that
        // fetch completed: the next tick's `[watermark, now)` covers it
        // because the watermark is the fetch-start instant.
        db.insert_uplink(&uplink_at("dev-late", &(fetch_start + ChronoDuration::seconds(1)))).unwrap();

        poller.tick(base + ChronoDuration::seconds(20)).await.unwrap();
        let frame = rx.recv().await.unwrap();
        assert!(frame.contains("dev-late"));
    }

    #[tokio::test]
    async fn store_failure_leaves_watermark_for_retry() {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let hub = WsHub::new(8);
        let (_id, _rx) = hub.register_session().await;
        let mut poller = RealtimePoller::new(db.clone(), hub, 0);

        let before = poller.watermark();
        db.execute_raw("DROP TABLE uplink_messages").unwrap();

        let result = poller.tick(before + ChronoDuration::seconds(10)).await;
        assert!(result.is_err());
        assert_eq!(poller.watermark(), before);
    }
}
