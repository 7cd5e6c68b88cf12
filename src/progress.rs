//! Sync progress and ETA reporting
//!
//! Owned by the consumer side of the pipeline. The ledger maximum is cached
//! and only re-queried while the sync has not yet been seen to finish.

use crate::config::SyncConfig;
use crate::ledger::LedgerReader;
use crate::notify::Notifier;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};

/// One emitted progress line.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub cursor: u64,
    pub max: u64,
    pub percentage: f64,
    pub remaining: Option<Duration>,
}

/// Process-lifetime progress state.
#[derive(Debug)]
pub struct Progress {
    init_time: Instant,
    start_cursor: u64,
    last_report: Option<Instant>,
    max_id: Option<u64>,
    refresh: bool,
    finished: bool,
    notified: bool,
    report_interval: Duration,
    min_notify_runtime: Duration,
}

impl Progress {
    pub fn new(start_cursor: u64, now: Instant, config: &SyncConfig) -> Self {
        Self {
            init_time: now,
            start_cursor,
            last_report: None,
            max_id: None,
            refresh: false,
            finished: false,
            notified: false,
            report_interval: config.report_interval,
            min_notify_runtime: config.min_notify_runtime,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Force the ledger maximum to be queried again on the next update.
    pub fn invalidate(&mut self) {
        self.refresh = true;
        self.finished = false;
    }

    async fn refresh_max<L>(&mut self, cursor: u64, ledger: &L) -> Option<u64>
    where
        L: LedgerReader + ?Sized,
    {
        let stale = match self.max_id {
            None => true,
            Some(_) if self.refresh => true,
            Some(max) => !self.finished && cursor >= max,
        };
        if stale {
            match ledger.max_entry_id().await {
                Ok(max) => {
                    self.max_id = Some(max);
                    self.refresh = false;
                    if cursor >= max {
                        self.finished = true;
                    }
                }
                Err(e) => warn!(error = %e, "Failed to refresh ledger maximum"),
            }
        }
        self.max_id
    }

    /// Record that everything up to `cursor` has been processed.
    ///
    /// Returns the report if one was emitted.
    pub async fn update<L, N>(
        &mut self,
        cursor: u64,
        now: Instant,
        ledger: &L,
        notifier: &N,
    ) -> Option<ProgressReport>
    where
        L: LedgerReader + ?Sized,
        N: Notifier + ?Sized,
    {
        let max = self.refresh_max(cursor, ledger).await?;

        let caught_up = cursor >= max;
        if let Some(last) = self.last_report {
            if !caught_up && now.duration_since(last) < self.report_interval {
                return None;
            }
        }

        let report = self.estimate(cursor, max, now);
        info!(
            cursor,
            max,
            percentage = %format!("{:.4}", report.percentage),
            remaining = %report.remaining.map(format_duration).unwrap_or_else(|| "unknown".to_string()),
            "Contract sync progress"
        );
        self.last_report = Some(now);

        if self.finished && !self.notified {
            self.notified = true;
            let elapsed = now.duration_since(self.init_time);
            if elapsed >= self.min_notify_runtime {
                let body = format!(
                    "Synced through entry {} after {}",
                    cursor,
                    format_duration(elapsed)
                );
                notifier.notify("Contract sync complete", &body).await;
            }
        }

        Some(report)
    }

    fn estimate(&self, cursor: u64, max: u64, now: Instant) -> ProgressReport {
        let percentage = if max == 0 || cursor >= max {
            100.0
        } else {
            cursor as f64 / max as f64 * 100.0
        };

        let done = cursor.saturating_sub(self.start_cursor);
        let left = max.saturating_sub(cursor);
        let elapsed = now.duration_since(self.init_time).as_secs_f64();
        let remaining = if left == 0 {
            Some(Duration::ZERO)
        } else if done == 0 || elapsed <= 0.0 {
            None
        } else {
            let rate = done as f64 / elapsed;
            Some(Duration::from_secs_f64(left as f64 / rate))
        };

        ProgressReport {
            cursor,
            max,
            percentage,
            remaining,
        }
    }
}

/// Format a duration as `1h02m03s`, dropping leading zero units.
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{}h{:02}m{:02}s", h, m, s)
    } else if m > 0 {
        format!("{}m{:02}s", m, s)
    } else {
        format!("{}s", s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::{LedgerEntry, MemoryLedger};
    use crate::notify::RecordingNotifier;
    use alloy_primitives::B256;

    fn ledger_up_to(max: u64) -> MemoryLedger {
        MemoryLedger::new(vec![LedgerEntry {
            id: max,
            tx_id: B256::ZERO,
            script: vec![],
        }])
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_secs(5)), "5s");
        assert_eq!(format_duration(Duration::from_secs(65)), "1m05s");
        assert_eq!(format_duration(Duration::from_secs(3723)), "1h02m03s");
    }

    #[tokio::test(start_paused = true)]
    async fn test_reports_are_throttled() {
        let ledger = ledger_up_to(1000);
        let notifier = RecordingNotifier::default();
        let t0 = Instant::now();
        let mut p = Progress::new(0, t0, &SyncConfig::default());

        assert!(p.update(100, t0, &ledger, &notifier).await.is_some());
        assert!(p
            .update(200, t0 + Duration::from_millis(500), &ledger, &notifier)
            .await
            .is_none());
        let report = p
            .update(300, t0 + Duration::from_secs(2), &ledger, &notifier)
            .await
            .unwrap();
        assert!((report.percentage - 30.0).abs() < 1e-9);
        // 300 entries in 2s, 700 left
        let remaining = report.remaining.unwrap().as_secs_f64();
        assert!((remaining - 700.0 / 150.0).abs() < 1e-6);
        assert!(!p.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_completion_always_reported_and_short_run_not_notified() {
        let ledger = ledger_up_to(1000);
        let notifier = RecordingNotifier::default();
        let t0 = Instant::now();
        let mut p = Progress::new(0, t0, &SyncConfig::default());

        p.update(500, t0, &ledger, &notifier).await.unwrap();
        let report = p
            .update(1000, t0 + Duration::from_millis(10), &ledger, &notifier)
            .await
            .unwrap();
        assert_eq!(report.percentage, 100.0);
        assert!(p.is_finished());
        assert!(notifier.sent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_long_run_notifies_once() {
        let ledger = ledger_up_to(1000);
        let notifier = RecordingNotifier::default();
        let t0 = Instant::now();
        let mut p = Progress::new(0, t0, &SyncConfig::default());

        let later = t0 + Duration::from_secs(600);
        p.update(1000, later, &ledger, &notifier).await.unwrap();
        p.update(1000, later + Duration::from_secs(5), &ledger, &notifier)
            .await
            .unwrap();
        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "Contract sync complete");
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_not_requeried_after_finish() {
        let ledger = ledger_up_to(1000);
        let notifier = RecordingNotifier::default();
        let t0 = Instant::now();
        let mut p = Progress::new(0, t0, &SyncConfig::default());

        p.update(1000, t0, &ledger, &notifier).await.unwrap();
        assert!(p.is_finished());

        ledger.append(vec![LedgerEntry {
            id: 2000,
            tx_id: B256::ZERO,
            script: vec![],
        }]);
        let report = p.update(1500, t0, &ledger, &notifier).await.unwrap();
        assert_eq!(report.max, 1000);

        p.invalidate();
        let report = p
            .update(1500, t0 + Duration::from_secs(2), &ledger, &notifier)
            .await
            .unwrap();
        assert_eq!(report.max, 2000);
        assert!(!p.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_max_requeried_when_cursor_reaches_stale_max() {
        let ledger = ledger_up_to(1000);
        let notifier = RecordingNotifier::default();
        let t0 = Instant::now();
        let mut p = Progress::new(0, t0, &SyncConfig::default());

        p.update(10, t0, &ledger, &notifier).await.unwrap();
        ledger.append(vec![LedgerEntry {
            id: 3000,
            tx_id: B256::ZERO,
            script: vec![],
        }]);
        let report = p
            .update(1000, t0 + Duration::from_secs(2), &ledger, &notifier)
            .await
            .unwrap();
        assert_eq!(report.max, 3000);
        assert!(!p.is_finished());
    }
}
