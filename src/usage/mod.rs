//! Per-period usage accounting and the limit checker.
//!
//! `peek` is read-only and safe to call from status endpoints.
//! `check_and_consume` is the only call that mutates a counter: it reads,
//! compares and increments inside a single redb write transaction, and
//! redb admits one writer at a time, so two requests racing for the last
//! unit of quota cannot both succeed.

pub mod period;

use chrono::{DateTime, Utc};
use redb::{ReadableDatabase, ReadableTable};

use crate::db::{Db, decode, encode, tables};
use crate::error::{AppError, Result};
use crate::models::{Allowance, Tier, UsageRecord, UsageStatus};
use crate::tiers::TierLimits;

pub use period::UsagePeriod;

/// Usage of one user in the current period
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSnapshot {
    pub limits: TierLimits,
    /// Period key, e.g. "2025-10"
    pub period: String,
    pub used: u32,
    pub resets_at: DateTime<Utc>,
}

impl UsageSnapshot {
    pub fn remaining(&self) -> Allowance {
        self.limits.remaining(self.used)
    }

    pub fn can_analyze(&self) -> bool {
        !self.limits.quota_reached(self.used)
    }

    /// Error returned to a caller whose quota is exhausted
    pub fn quota_exceeded(&self) -> AppError {
        let limit = match self.limits.analyses_per_period {
            Allowance::Limited(limit) => limit,
            Allowance::Unlimited => u32::MAX,
        };
        AppError::QuotaExceeded {
            tier: self.limits.tier,
            limit,
            period: self.period.clone(),
            resets_at: self.resets_at,
        }
    }

    pub fn to_status(&self) -> UsageStatus {
        UsageStatus {
            success: true,
            tier: self.limits.tier,
            limit: self.limits.analyses_per_period,
            used: self.used,
            remaining: self.remaining(),
            can_analyze: self.can_analyze(),
            current_month: self.period.clone(),
            resets_at: self.resets_at,
            video_duration_limit: self.limits.max_video_seconds,
        }
    }
}

/// Outcome of `check_and_consume`
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    /// A unit was consumed; the snapshot reflects the new count
    Allowed(UsageSnapshot),
    /// Quota exhausted; nothing was written
    Denied(UsageSnapshot),
}

impl Admission {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Admission::Allowed(_))
    }

    pub fn snapshot(&self) -> &UsageSnapshot {
        match self {
            Admission::Allowed(snapshot) | Admission::Denied(snapshot) => snapshot,
        }
    }
}

/// Counter store keyed by (user, period)
///
/// Methods are blocking; call them from `spawn_blocking`.
#[derive(Clone)]
pub struct UsageLedger {
    db: Db,
    period: UsagePeriod,
}

impl UsageLedger {
    pub fn new(db: Db, period: UsagePeriod) -> Self {
        Self { db, period }
    }

    pub fn period(&self) -> UsagePeriod {
        self.period
    }

    fn snapshot(&self, tier: Tier, period: String, used: u32, now: DateTime<Utc>) -> UsageSnapshot {
        UsageSnapshot {
            limits: TierLimits::for_tier(tier),
            period,
            used,
            resets_at: self.period.next_reset(now),
        }
    }

    /// Current usage without consuming anything
    pub fn peek(&self, user_id: &str, tier: Tier, now: DateTime<Utc>) -> Result<UsageSnapshot> {
        let period = self.period.key(now);

        let read_txn = self.db.begin_read()?;
        let usage = read_txn.open_table(tables::USAGE)?;
        let used = match usage.get((user_id, period.as_str()))? {
            Some(bytes) => decode::<UsageRecord>(bytes.value())?.count,
            None => 0,
        };

        Ok(self.snapshot(tier, period, used, now))
    }

    /// Admit and consume one analysis, or deny without writing
    ///
    /// Unlimited tiers are always admitted; their counter is still kept so
    /// usage stays visible.
    pub fn check_and_consume(
        &self,
        user_id: &str,
        tier: Tier,
        now: DateTime<Utc>,
    ) -> Result<Admission> {
        let period = self.period.key(now);
        let limits = TierLimits::for_tier(tier);

        let write_txn = self.db.begin_write()?;
        let used = {
            let mut usage = write_txn.open_table(tables::USAGE)?;
            let current = match usage.get((user_id, period.as_str()))? {
                Some(bytes) => decode::<UsageRecord>(bytes.value())?.count,
                None => 0,
            };

            if limits.quota_reached(current) {
                tracing::warn!(
                    "Quota reached for user {} on {}: {}/{:?}",
                    user_id,
                    tier,
                    current,
                    limits.analyses_per_period
                );
                // Dropping the transaction aborts it; nothing is written
                return Ok(Admission::Denied(self.snapshot(tier, period, current, now)));
            }

            let record = UsageRecord {
                count: current.saturating_add(1),
                tier,
                updated_at: now.timestamp(),
            };
            let bytes = encode(&record)?;
            usage.insert((user_id, period.as_str()), bytes.as_slice())?;
            record.count
        };
        write_txn.commit()?;

        tracing::debug!("Usage for user {} in {}: {}", user_id, period, used);

        Ok(Admission::Allowed(self.snapshot(tier, period, used, now)))
    }

    /// Number of stored (user, period) counters
    pub fn row_count(&self) -> Result<u64> {
        use redb::ReadableTableMetadata;

        let read_txn = self.db.begin_read()?;
        let usage = read_txn.open_table(tables::USAGE)?;
        Ok(usage.len()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_database;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn ledger(dir: &TempDir, period: UsagePeriod) -> UsageLedger {
        UsageLedger::new(open_database(dir.path().join("test.db")).unwrap(), period)
    }

    fn october() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 10, 17, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_finite_tiers_deny_after_limit() {
        for tier in [Tier::Free, Tier::Starter, Tier::Pro] {
            let dir = TempDir::new().unwrap();
            let ledger = ledger(&dir, UsagePeriod::Monthly);
            let Allowance::Limited(limit) = TierLimits::for_tier(tier).analyses_per_period else {
                panic!("{} should be limited", tier);
            };

            for i in 0..limit {
                let admission = ledger.check_and_consume("user-1", tier, october()).unwrap();
                assert!(admission.is_allowed(), "analysis {} on {} should pass", i, tier);
                assert_eq!(admission.snapshot().used, i + 1);
            }

            let denied = ledger.check_and_consume("user-1", tier, october()).unwrap();
            assert!(!denied.is_allowed());
            assert_eq!(denied.snapshot().remaining(), Allowance::Limited(0));

            // Denials do not write
            ledger.check_and_consume("user-1", tier, october()).unwrap();
            assert_eq!(ledger.peek("user-1", tier, october()).unwrap().used, limit);
        }
    }

    #[test]
    fn test_unlimited_tier_always_allowed() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir, UsagePeriod::Monthly);

        for _ in 0..50 {
            let admission = ledger
                .check_and_consume("vip", Tier::Premium, october())
                .unwrap();
            assert!(admission.is_allowed());
            assert_eq!(admission.snapshot().remaining(), Allowance::Unlimited);
        }
        assert_eq!(ledger.peek("vip", Tier::Premium, october()).unwrap().used, 50);
    }

    #[test]
    fn test_periods_are_independent() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir, UsagePeriod::Monthly);
        let november = Utc.with_ymd_and_hms(2025, 11, 2, 8, 0, 0).unwrap();

        for _ in 0..3 {
            ledger.check_and_consume("user-1", Tier::Free, october()).unwrap();
        }
        assert_eq!(ledger.peek("user-1", Tier::Free, november).unwrap().used, 0);

        ledger.check_and_consume("user-1", Tier::Free, november).unwrap();
        assert_eq!(ledger.peek("user-1", Tier::Free, october()).unwrap().used, 3);
        assert_eq!(ledger.peek("user-1", Tier::Free, november).unwrap().used, 1);
        assert_eq!(ledger.row_count().unwrap(), 2);
    }

    #[test]
    fn test_users_are_independent() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir, UsagePeriod::Monthly);

        for _ in 0..3 {
            ledger.check_and_consume("user-1", Tier::Free, october()).unwrap();
        }
        assert!(
            ledger
                .check_and_consume("user-2", Tier::Free, october())
                .unwrap()
                .is_allowed()
        );
    }

    #[test]
    fn test_upgrade_mid_period_keeps_count() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir, UsagePeriod::Monthly);

        for _ in 0..3 {
            ledger.check_and_consume("user-1", Tier::Free, october()).unwrap();
        }
        let snapshot = ledger.peek("user-1", Tier::Starter, october()).unwrap();
        assert_eq!(snapshot.used, 3);
        assert_eq!(snapshot.remaining(), Allowance::Limited(2));
        assert!(snapshot.can_analyze());
    }

    #[test]
    fn test_daily_period_rolls_over_at_midnight() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir, UsagePeriod::Daily);
        let late = Utc.with_ymd_and_hms(2025, 10, 17, 23, 59, 0).unwrap();
        let next_day = Utc.with_ymd_and_hms(2025, 10, 18, 0, 0, 1).unwrap();

        for _ in 0..3 {
            ledger.check_and_consume("user-1", Tier::Free, late).unwrap();
        }
        assert!(!ledger.check_and_consume("user-1", Tier::Free, late).unwrap().is_allowed());
        assert!(ledger.check_and_consume("user-1", Tier::Free, next_day).unwrap().is_allowed());
    }

    #[test]
    fn test_concurrent_consumers_never_exceed_limit() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir, UsagePeriod::Monthly);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    ledger
                        .check_and_consume("racer", Tier::Free, october())
                        .unwrap()
                        .is_allowed()
                })
            })
            .collect();

        let allowed = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();

        assert_eq!(allowed, 3);
        assert_eq!(ledger.peek("racer", Tier::Free, october()).unwrap().used, 3);
    }

    #[test]
    fn test_status_shape() {
        let dir = TempDir::new().unwrap();
        let ledger = ledger(&dir, UsagePeriod::Monthly);
        ledger.check_and_consume("user-1", Tier::Free, october()).unwrap();

        let status = ledger.peek("user-1", Tier::Free, october()).unwrap().to_status();
        assert_eq!(status.limit, Allowance::Limited(3));
        assert_eq!(status.used, 1);
        assert_eq!(status.remaining, Allowance::Limited(2));
        assert!(status.can_analyze);
        assert_eq!(status.current_month, "2025-10");
        assert_eq!(
            status.resets_at,
            Utc.with_ymd_and_hms(2025, 11, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(status.video_duration_limit, 60);
    }
}
