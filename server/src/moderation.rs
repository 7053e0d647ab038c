//! Report bookkeeping and ban escalation
//!
//! Reports accumulate per username and never reset. Crossing a
//! threshold escalates the ban; escalation is monotonic, so a stronger
//! ban is never replaced by a weaker one no matter how concurrent
//! reports interleave. Expired temporary bans read as inactive but the
//! underlying counter is kept.

use crate::utils::unix_time_ms;
use log::info;
use shared::BanStatus;
use std::collections::HashMap;
use tokio::sync::RwLock;

/// Reports needed for the first temporary ban.
pub const TEMP_BAN_THRESHOLD: u32 = 3;
/// Reports needed for the longer temporary ban.
pub const LONG_BAN_THRESHOLD: u32 = 5;
/// Reports needed for a permanent ban.
pub const PERMANENT_BAN_THRESHOLD: u32 = 10;

const TEMP_BAN_MS: u64 = 24 * 60 * 60 * 1000;
const LONG_BAN_MS: u64 = 72 * 60 * 60 * 1000;

#[derive(Debug, Clone, Default)]
struct ReportRecord {
    count: u32,
    status: BanStatus,
}

pub struct ReportTracker {
    records: RwLock<HashMap<String, ReportRecord>>,
}

impl ReportTracker {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Registers one report against `target` and returns the resulting
    /// ban status. Increment and escalation happen under one write
    /// lock, so concurrent reports neither lose counts nor double-apply
    /// an escalation step.
    pub async fn record_report(&self, target: &str) -> BanStatus {
        let mut records = self.records.write().await;
        let record = records.entry(target.to_string()).or_default();

        record.count += 1;
        let escalated = escalate(record.count, unix_time_ms());
        if stronger(&escalated, &record.status) {
            info!(
                "Ban escalation for {}: {} reports -> {:?}",
                target, record.count, escalated
            );
            record.status = escalated;
        }

        record.status
    }

    /// Current ban status. An expired temporary ban reads as `None`;
    /// the stored record (count included) is left untouched.
    pub async fn ban_status(&self, username: &str) -> BanStatus {
        let records = self.records.read().await;
        match records.get(username) {
            Some(record) if record.status.is_active(unix_time_ms()) => record.status,
            _ => BanStatus::None,
        }
    }

    pub async fn is_banned(&self, username: &str) -> bool {
        self.ban_status(username).await != BanStatus::None
    }

    pub async fn report_count(&self, username: &str) -> u32 {
        let records = self.records.read().await;
        records.get(username).map(|r| r.count).unwrap_or(0)
    }
}

impl Default for ReportTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Ban implied by a cumulative report count, anchored at `now_ms`.
fn escalate(count: u32, now_ms: u64) -> BanStatus {
    if count >= PERMANENT_BAN_THRESHOLD {
        BanStatus::Permanent
    } else if count >= LONG_BAN_THRESHOLD {
        BanStatus::Temporary {
            expires_at_ms: now_ms + LONG_BAN_MS,
        }
    } else if count >= TEMP_BAN_THRESHOLD {
        BanStatus::Temporary {
            expires_at_ms: now_ms + TEMP_BAN_MS,
        }
    } else {
        BanStatus::None
    }
}

/// Strict ordering of ban severity; equal-severity temporary bans
/// compare by expiry so a re-triggered ban extends rather than shrinks.
fn stronger(candidate: &BanStatus, current: &BanStatus) -> bool {
    match (candidate, current) {
        (BanStatus::Permanent, BanStatus::Permanent) => false,
        (BanStatus::Permanent, _) => true,
        (BanStatus::Temporary { .. }, BanStatus::None) => true,
        (
            BanStatus::Temporary { expires_at_ms: a },
            BanStatus::Temporary { expires_at_ms: b },
        ) => a > b,
        _ => false,
    }
}
