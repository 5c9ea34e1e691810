//! Referrer attribution statistics
//!
//! Rollup of the leads credited to one referrer: count per attribution
//! method and the cross-device rate, i.e. the share of leads credited
//! through an email or phone visit match. Cookie leads are same-device and
//! direct leads have no referrer, so neither counts as cross-device.

use chrono::{DateTime, Duration, Utc};
use leadtrail_common::{time, AttributionMethod, Error, Result};
use serde::{Deserialize, Serialize};
use sqlx::{Row, SqlitePool};
use tracing::debug;

/// Lead counts keyed by attribution method
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodBreakdown {
    pub cookie: i64,
    pub email_match: i64,
    pub phone_match: i64,
    pub direct: i64,
}

impl MethodBreakdown {
    pub fn get(&self, method: AttributionMethod) -> i64 {
        match method {
            AttributionMethod::Cookie => self.cookie,
            AttributionMethod::EmailMatch => self.email_match,
            AttributionMethod::PhoneMatch => self.phone_match,
            AttributionMethod::Direct => self.direct,
        }
    }

    pub fn add(&mut self, method: AttributionMethod, count: i64) {
        let slot = match method {
            AttributionMethod::Cookie => &mut self.cookie,
            AttributionMethod::EmailMatch => &mut self.email_match,
            AttributionMethod::PhoneMatch => &mut self.phone_match,
            AttributionMethod::Direct => &mut self.direct,
        };
        *slot += count;
    }

    pub fn total(&self) -> i64 {
        AttributionMethod::ALL.iter().map(|m| self.get(*m)).sum()
    }

    pub fn cross_device(&self) -> i64 {
        AttributionMethod::ALL
            .iter()
            .filter(|m| m.is_cross_device())
            .map(|m| self.get(*m))
            .sum()
    }
}

/// Attribution rollup for one referrer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferrerStats {
    pub total_leads: i64,
    pub by_method: MethodBreakdown,
    /// Whole percent, 0 when there are no leads
    pub cross_device_rate: i64,
}

impl ReferrerStats {
    pub fn from_breakdown(by_method: MethodBreakdown) -> Self {
        let total_leads = by_method.total();
        Self {
            total_leads,
            by_method,
            cross_device_rate: cross_device_rate(by_method.cross_device(), total_leads),
        }
    }

    pub fn from_methods<I>(methods: I) -> Self
    where
        I: IntoIterator<Item = AttributionMethod>,
    {
        let mut by_method = MethodBreakdown::default();
        for method in methods {
            by_method.add(method, 1);
        }
        Self::from_breakdown(by_method)
    }
}

/// `round(100 * cross_device / total)`, half rounds up; 0 for no leads
pub fn cross_device_rate(cross_device: i64, total: i64) -> i64 {
    if total <= 0 {
        return 0;
    }
    (200 * cross_device + total) / (2 * total)
}

/// Lead creation-time filter; `since` inclusive, `until` exclusive
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsRange {
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl StatsRange {
    /// All leads, regardless of age
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Leads created in the `days` days before `now`
    pub fn last_days(days: i64, now: DateTime<Utc>) -> Result<Self> {
        let since = Duration::try_days(days)
            .and_then(|window| now.checked_sub_signed(window))
            .ok_or_else(|| Error::InvalidInput(format!("{} days is out of range", days)))?;

        Ok(Self {
            since: Some(since),
            until: None,
        })
    }

    pub fn between(since: Option<DateTime<Utc>>, until: Option<DateTime<Utc>>) -> Result<Self> {
        if let (Some(since), Some(until)) = (since, until) {
            if since > until {
                return Err(Error::InvalidInput(format!(
                    "Range start {} is after range end {}",
                    since, until
                )));
            }
        }
        Ok(Self { since, until })
    }
}

/// Computes [`ReferrerStats`] from the leads table
#[derive(Clone)]
pub struct StatsAggregator {
    db: SqlitePool,
}

impl StatsAggregator {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Stats over every lead attributed to `referrer_username`
    pub async fn get_referrer_attribution_stats(
        &self,
        referrer_username: &str,
    ) -> Result<ReferrerStats> {
        self.get_referrer_attribution_stats_in(referrer_username, StatsRange::unbounded())
            .await
    }

    /// Stats over the leads attributed to `referrer_username` inside `range`
    pub async fn get_referrer_attribution_stats_in(
        &self,
        referrer_username: &str,
        range: StatsRange,
    ) -> Result<ReferrerStats> {
        let since = range.since.map(time::to_millis);
        let until = range.until.map(time::to_millis);

        let rows = sqlx::query(
            r#"
            SELECT attribution_method, COUNT(*) AS lead_count
            FROM leads
            WHERE referrer_username = ?
              AND (? IS NULL OR created_at >= ?)
              AND (? IS NULL OR created_at < ?)
            GROUP BY attribution_method
            "#,
        )
        .bind(referrer_username)
        .bind(since)
        .bind(since)
        .bind(until)
        .bind(until)
        .fetch_all(&self.db)
        .await?;

        let mut by_method = MethodBreakdown::default();
        for row in &rows {
            let method: String = row.try_get("attribution_method")?;
            let count: i64 = row.try_get("lead_count")?;
            let method: AttributionMethod = method
                .parse()
                .map_err(|e: Error| Error::Internal(e.to_string()))?;
            by_method.add(method, count);
        }

        let stats = ReferrerStats::from_breakdown(by_method);

        debug!(
            referrer = %referrer_username,
            total_leads = stats.total_leads,
            cross_device_rate = stats.cross_device_rate,
            "Computed referrer stats"
        );

        Ok(stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::insert_lead;
    use chrono::TimeZone;
    use leadtrail_common::db::init_memory_database;
    use leadtrail_common::AttributionMethod::*;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 0, 0, 0).unwrap()
    }

    fn repeat(method: AttributionMethod, n: usize) -> impl Iterator<Item = AttributionMethod> {
        std::iter::repeat(method).take(n)
    }

    #[test]
    fn test_breakdown_of_seven_leads() {
        let stats = ReferrerStats::from_methods(
            repeat(Cookie, 3)
                .chain(repeat(EmailMatch, 2))
                .chain(repeat(PhoneMatch, 1))
                .chain(repeat(Direct, 1)),
        );

        assert_eq!(stats.total_leads, 7);
        assert_eq!(
            stats.by_method,
            MethodBreakdown {
                cookie: 3,
                email_match: 2,
                phone_match: 1,
                direct: 1,
            }
        );
    }

    #[test]
    fn test_cross_device_rate_half() {
        let stats = ReferrerStats::from_methods(
            repeat(Cookie, 3).chain(repeat(EmailMatch, 2)).chain(repeat(PhoneMatch, 1)),
        );

        assert_eq!(stats.total_leads, 6);
        assert_eq!(stats.cross_device_rate, 50);
    }

    #[test]
    fn test_zero_leads_has_zero_rate() {
        let stats = ReferrerStats::from_methods(std::iter::empty());

        assert_eq!(stats, ReferrerStats::default());
        assert_eq!(stats.cross_device_rate, 0);
    }

    #[test]
    fn test_rate_rounding() {
        assert_eq!(cross_device_rate(1, 3), 33);
        assert_eq!(cross_device_rate(2, 3), 67);
        assert_eq!(cross_device_rate(1, 8), 13);
        assert_eq!(cross_device_rate(7, 7), 100);
        assert_eq!(cross_device_rate(0, 0), 0);
    }

    #[test]
    fn test_stats_serialize_with_dashboard_keys() {
        let value = serde_json::to_value(ReferrerStats::from_methods([EmailMatch])).unwrap();

        assert_eq!(value["totalLeads"], 1);
        assert_eq!(value["byMethod"]["emailMatch"], 1);
        assert_eq!(value["byMethod"]["phoneMatch"], 0);
        assert_eq!(value["crossDeviceRate"], 100);
    }

    #[test]
    fn test_range_rejects_inverted_bounds() {
        let result = StatsRange::between(Some(now()), Some(now() - Duration::days(1)));
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_last_days_out_of_range_rejected() {
        let result = StatsRange::last_days(i64::MAX, now());
        assert!(matches!(result, Err(Error::InvalidInput(_))));

        // Representable as a duration, but before the earliest DateTime
        let result = StatsRange::last_days(100_000_000, now());
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_aggregates_only_requested_referrer() {
        let pool = init_memory_database().await.unwrap();
        for _ in 0..3 {
            insert_lead(&pool, Cookie, Some("johnsmith"), now()).await;
        }
        insert_lead(&pool, EmailMatch, Some("johnsmith"), now()).await;
        insert_lead(&pool, PhoneMatch, Some("janesmith"), now()).await;
        insert_lead(&pool, Direct, None, now()).await;

        let stats = StatsAggregator::new(pool)
            .get_referrer_attribution_stats("johnsmith")
            .await
            .unwrap();

        assert_eq!(stats.total_leads, 4);
        assert_eq!(stats.by_method.cookie, 3);
        assert_eq!(stats.by_method.email_match, 1);
        assert_eq!(stats.by_method.phone_match, 0);
        assert_eq!(stats.cross_device_rate, 25);
    }

    #[tokio::test]
    async fn test_unknown_referrer_is_all_zero() {
        let pool = init_memory_database().await.unwrap();
        insert_lead(&pool, Cookie, Some("johnsmith"), now()).await;

        let stats = StatsAggregator::new(pool)
            .get_referrer_attribution_stats("nobody")
            .await
            .unwrap();

        assert_eq!(stats, ReferrerStats::default());
    }

    #[tokio::test]
    async fn test_range_filters_by_creation_time() {
        let pool = init_memory_database().await.unwrap();
        insert_lead(&pool, Cookie, Some("johnsmith"), now() - Duration::days(45)).await;
        insert_lead(&pool, EmailMatch, Some("johnsmith"), now() - Duration::days(10)).await;
        insert_lead(&pool, PhoneMatch, Some("johnsmith"), now() - Duration::days(1)).await;
        let aggregator = StatsAggregator::new(pool);

        let all = aggregator.get_referrer_attribution_stats("johnsmith").await.unwrap();
        assert_eq!(all.total_leads, 3);

        let last_month = StatsRange::last_days(30, now()).unwrap();
        let recent = aggregator
            .get_referrer_attribution_stats_in("johnsmith", last_month)
            .await
            .unwrap();
        assert_eq!(recent.total_leads, 2);
        assert_eq!(recent.by_method.cookie, 0);
        assert_eq!(recent.cross_device_rate, 100);

        let window = StatsRange::between(
            Some(now() - Duration::days(45)),
            Some(now() - Duration::days(10)),
        )
        .unwrap();
        let older = aggregator
            .get_referrer_attribution_stats_in("johnsmith", window)
            .await
            .unwrap();
        assert_eq!(older.total_leads, 1);
        assert_eq!(older.by_method.cookie, 1);
    }
}
