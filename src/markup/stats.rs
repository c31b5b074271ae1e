use crate::markup::calendar::week_start;
use crate::markup::metrics::{self, TimeframeShare};
use crate::markup::types::{LocalStamp, MarkupEntry, PartialResult, TradeResult};
use chrono::{Datelike, Days, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

// ── Period filters ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Period {
    Day { date: NaiveDate },
    /// Monday-to-Sunday week starting at `start`.
    Week { start: NaiveDate },
    Month { year: i32, month: u32 },
    Year { year: i32 },
    All,
}

impl Period {
    /// Week containing `date`.
    pub fn week_of(date: NaiveDate) -> Self {
        Period::Week {
            start: week_start(date),
        }
    }

    pub fn contains(&self, entry: &MarkupEntry) -> bool {
        let date = entry.datetime_local.date();
        match *self {
            Period::Day { date: day } => date == day,
            Period::Week { start } => date >= start && date < start + Days::new(7),
            Period::Month { year, month } => date.year() == year && date.month() == month,
            Period::Year { year } => date.year() == year,
            Period::All => true,
        }
    }

    /// Granularity of the capital chart for this period.
    pub fn capital_bucket(&self) -> Bucket {
        match self {
            Period::Day { .. } | Period::Week { .. } | Period::Month { .. } => Bucket::Day,
            Period::Year { .. } | Period::All => Bucket::Month,
        }
    }
}

pub fn filter_period(entries: &[MarkupEntry], period: &Period) -> Vec<MarkupEntry> {
    entries.iter().filter(|e| period.contains(e)).cloned().collect()
}

// ── Result statistics ──

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PartialCounts {
    #[serde(rename = "TP1")]
    pub tp1: usize,
    #[serde(rename = "TP2")]
    pub tp2: usize,
    #[serde(rename = "TP3")]
    pub tp3: usize,
}

impl PartialCounts {
    fn record(&mut self, entry: &MarkupEntry, wanted: PartialResult) {
        if entry.result_tp1 == Some(wanted) {
            self.tp1 += 1;
        }
        if entry.result_tp2 == Some(wanted) {
            self.tp2 += 1;
        }
        if entry.result_tp3 == Some(wanted) {
            self.tp3 += 1;
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultStats {
    #[serde(rename = "TP1")]
    pub tp1: usize,
    #[serde(rename = "TP2")]
    pub tp2: usize,
    #[serde(rename = "TP3")]
    pub tp3: usize,
    #[serde(rename = "BE")]
    pub be: usize,
    #[serde(rename = "SL")]
    pub sl: usize,
    pub total: usize,
    pub wins: usize,
    /// Whole percent.
    pub win_rate: u32,
    pub be_by_partial: PartialCounts,
    pub sl_by_partial: PartialCounts,
    /// TP1 + TP2 partials, as the month view reports them.
    #[serde(rename = "totalBEPartials")]
    pub total_be_partials: usize,
    #[serde(rename = "totalSLPartials")]
    pub total_sl_partials: usize,
}

impl ResultStats {
    pub fn from_entries(entries: &[MarkupEntry]) -> Self {
        let mut stats = ResultStats::default();
        for e in entries {
            match e.trade_result {
                Some(TradeResult::Tp1) => stats.tp1 += 1,
                Some(TradeResult::Tp2) => stats.tp2 += 1,
                Some(TradeResult::Tp3) => stats.tp3 += 1,
                Some(TradeResult::Be) => stats.be += 1,
                Some(TradeResult::Sl) => stats.sl += 1,
                None => {}
            }
            if e.trade_result.is_some_and(|r| r.is_win()) {
                stats.wins += 1;
            }
            stats.be_by_partial.record(e, PartialResult::Be);
            stats.sl_by_partial.record(e, PartialResult::Sl);
        }

        stats.total = stats.wins + stats.be + stats.sl;
        stats.win_rate = win_rate(stats.wins, stats.total);
        stats.total_be_partials = stats.be_by_partial.tp1 + stats.be_by_partial.tp2;
        stats.total_sl_partials = stats.sl_by_partial.tp1 + stats.sl_by_partial.tp2;
        stats
    }
}

/// Rounded whole percent, 0 when nothing was tallied.
#[inline]
pub fn win_rate(wins: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (wins as f64 / total as f64 * 100.0).round() as u32
}

// ── Capital evolution ──
//
// Percentages are summed, then applied once to the starting capital:
// capital_i = start * (1 + sum(pct_0..=i) / 100). There is no compounding.

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalStep {
    pub entry_id: String,
    pub datetime_local: LocalStamp,
    pub pct: f64,
    pub cumulative_pct: f64,
    pub capital: f64,
}

#[inline]
pub fn capital_at(starting_capital: f64, cumulative_pct: f64) -> f64 {
    starting_capital * (1.0 + cumulative_pct / 100.0)
}

fn chronological(entries: &[MarkupEntry]) -> Vec<&MarkupEntry> {
    let mut sorted: Vec<&MarkupEntry> = entries.iter().collect();
    sorted.sort_by_key(|e| e.datetime_local);
    sorted
}

/// One step per entry carrying a capital percentage, in time order.
pub fn capital_curve(starting_capital: f64, entries: &[MarkupEntry]) -> Vec<CapitalStep> {
    let mut cumulative = 0.0;
    chronological(entries)
        .into_iter()
        .filter_map(|e| {
            let pct = e.capital_pct?;
            cumulative += pct;
            Some(CapitalStep {
                entry_id: e.id.clone(),
                datetime_local: e.datetime_local,
                pct,
                cumulative_pct: cumulative,
                capital: capital_at(starting_capital, cumulative),
            })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Bucket {
    Day,
    Month,
}

impl Bucket {
    fn key(&self, entry: &MarkupEntry) -> String {
        match self {
            Bucket::Day => metrics::day_key(entry),
            Bucket::Month => entry.datetime_local.date().format("%Y-%m").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CapitalPoint {
    /// `YYYY-MM-DD` or `YYYY-MM`
    pub key: String,
    pub cumulative_pct: f64,
    pub capital: f64,
    /// Capital-bearing trades processed up to and including this bucket.
    pub trades: usize,
}

/// One point per bucket holding entries, in time order. Entries without a
/// capital percentage keep their bucket on the chart but do not move it.
pub fn capital_evolution(starting_capital: f64, entries: &[MarkupEntry], bucket: Bucket) -> Vec<CapitalPoint> {
    let mut buckets: BTreeMap<String, Vec<&MarkupEntry>> = BTreeMap::new();
    for e in chronological(entries) {
        buckets.entry(bucket.key(e)).or_default().push(e);
    }

    let mut cumulative = 0.0;
    let mut trades = 0usize;
    buckets
        .into_iter()
        .map(|(key, list)| {
            for pct in list.iter().filter_map(|e| e.capital_pct) {
                cumulative += pct;
                trades += 1;
            }
            CapitalPoint {
                key,
                cumulative_pct: cumulative,
                capital: capital_at(starting_capital, cumulative),
                trades,
            }
        })
        .collect()
}

// ── Period summary ──

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PeriodSummary {
    pub period: Period,
    pub entry_count: usize,
    pub results: ResultStats,
    pub timeframes: Vec<TimeframeShare>,
    pub hours: [u32; 24],
    pub starting_capital: f64,
    pub final_capital: f64,
    pub capital: Vec<CapitalPoint>,
}

/// Everything a period view shows, computed from the full entry list.
pub fn summarize(entries: &[MarkupEntry], period: Period, starting_capital: f64) -> PeriodSummary {
    let subset = filter_period(entries, &period);
    let capital = capital_evolution(starting_capital, &subset, period.capital_bucket());
    let final_capital = capital.last().map(|p| p.capital).unwrap_or(starting_capital);

    PeriodSummary {
        period,
        entry_count: subset.len(),
        results: ResultStats::from_entries(&subset),
        timeframes: metrics::timeframe_distribution(&subset),
        hours: metrics::count_by_hour(&subset),
        starting_capital,
        final_capital,
        capital,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::types::Timeframe;

    fn entry(id: &str, at: &str) -> MarkupEntry {
        MarkupEntry::new(id, LocalStamp::parse(at).unwrap(), "MSU", Timeframe::M15)
    }

    fn with_result(id: &str, at: &str, result: TradeResult) -> MarkupEntry {
        let mut e = entry(id, at);
        e.trade_result = Some(result);
        e
    }

    fn with_pct(id: &str, at: &str, pct: f64) -> MarkupEntry {
        let mut e = entry(id, at);
        e.capital_pct = Some(pct);
        e
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_three_wins_two_losses_is_sixty() {
        let entries = vec![
            with_result("1", "2024-03-01T09:00", TradeResult::Tp1),
            with_result("2", "2024-03-02T09:00", TradeResult::Tp2),
            with_result("3", "2024-03-03T09:00", TradeResult::Tp3),
            with_result("4", "2024-03-04T09:00", TradeResult::Sl),
            with_result("5", "2024-03-05T09:00", TradeResult::Sl),
            entry("6", "2024-03-06T09:00"),
        ];
        let stats = ResultStats::from_entries(&entries);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.wins, 3);
        assert_eq!(stats.win_rate, 60);
    }

    #[test]
    fn test_win_rate_rounds_not_truncates() {
        assert_eq!(win_rate(2, 3), 67);
        assert_eq!(win_rate(1, 8), 13); // 12.5
        assert_eq!(win_rate(0, 0), 0);
    }

    #[test]
    fn test_empty_stats() {
        let stats = ResultStats::from_entries(&[]);
        assert_eq!(stats, ResultStats::default());
        assert_eq!(stats.win_rate, 0);
    }

    #[test]
    fn test_partials_are_independent_of_result() {
        let mut a = with_result("a", "2024-03-01T09:00", TradeResult::Tp2);
        a.result_tp1 = Some(PartialResult::Be);
        a.result_tp2 = Some(PartialResult::Tp);
        let mut b = with_result("b", "2024-03-01T10:00", TradeResult::Sl);
        b.result_tp1 = Some(PartialResult::Sl);
        b.result_tp2 = Some(PartialResult::Be);
        b.result_tp3 = Some(PartialResult::Be);

        let stats = ResultStats::from_entries(&[a, b]);
        assert_eq!(stats.be, 0);
        assert_eq!(stats.be_by_partial, PartialCounts { tp1: 1, tp2: 1, tp3: 1 });
        assert_eq!(stats.sl_by_partial, PartialCounts { tp1: 1, tp2: 0, tp3: 0 });
        assert_eq!(stats.total_be_partials, 2);
        assert_eq!(stats.total_sl_partials, 1);
    }

    #[test]
    fn test_capital_curve_is_additive() {
        let entries = vec![
            with_pct("c", "2024-03-03T09:00", 0.5),
            with_pct("a", "2024-03-01T09:00", 2.0),
            entry("skip", "2024-03-01T12:00"),
            with_pct("b", "2024-03-02T09:00", -1.0),
        ];
        let curve = capital_curve(100_000.0, &entries);
        let ids: Vec<&str> = curve.iter().map(|s| s.entry_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);

        let cumulative: Vec<f64> = curve.iter().map(|s| s.cumulative_pct).collect();
        let capital: Vec<f64> = curve.iter().map(|s| s.capital).collect();
        for (got, want) in cumulative.iter().zip([2.0, 1.0, 1.5]) {
            assert!(close(*got, want), "cumulative {got} != {want}");
        }
        for (got, want) in capital.iter().zip([102_000.0, 101_000.0, 101_500.0]) {
            assert!(close(*got, want), "capital {got} != {want}");
        }
    }

    #[test]
    fn test_capital_evolution_by_day_and_month() {
        let entries = vec![
            with_pct("a", "2024-03-01T09:00", 2.0),
            with_pct("b", "2024-03-01T15:00", -1.0),
            entry("c", "2024-03-04T09:00"),
            with_pct("d", "2024-04-02T09:00", 0.5),
        ];

        let daily = capital_evolution(100_000.0, &entries, Bucket::Day);
        assert_eq!(daily.len(), 3);
        assert_eq!(daily[0].key, "2024-03-01");
        assert!(close(daily[0].capital, 101_000.0));
        assert_eq!(daily[0].trades, 2);
        assert_eq!(daily[1].key, "2024-03-04");
        assert!(close(daily[1].capital, 101_000.0));
        assert_eq!(daily[1].trades, 2);
        assert!(close(daily[2].capital, 101_500.0));
        assert_eq!(daily[2].trades, 3);

        let monthly = capital_evolution(100_000.0, &entries, Bucket::Month);
        assert_eq!(monthly.iter().map(|p| p.key.as_str()).collect::<Vec<_>>(), vec!["2024-03", "2024-04"]);
        assert!(close(monthly[1].cumulative_pct, 1.5));

        assert!(capital_evolution(100_000.0, &[], Bucket::Day).is_empty());
    }

    #[test]
    fn test_period_filters() {
        let entries = vec![
            entry("sun", "2024-01-14T09:00"),
            entry("mon", "2024-01-15T09:00"),
            entry("sun2", "2024-01-21T23:00"),
            entry("mon2", "2024-01-22T00:00"),
            entry("feb", "2024-02-01T09:00"),
            entry("old", "2023-06-01T09:00"),
        ];
        let date = |s: &str| NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap();
        let ids = |p: Period| -> Vec<String> { filter_period(&entries, &p).into_iter().map(|e| e.id).collect() };

        assert_eq!(ids(Period::Day { date: date("2024-01-15") }), vec!["mon"]);
        assert_eq!(ids(Period::week_of(date("2024-01-18"))), vec!["mon", "sun2"]);
        assert_eq!(ids(Period::Month { year: 2024, month: 1 }).len(), 4);
        assert_eq!(ids(Period::Year { year: 2024 }).len(), 5);
        assert_eq!(ids(Period::All).len(), 6);
    }

    #[test]
    fn test_summary_of_empty_period() {
        let summary = summarize(&[], Period::Year { year: 2024 }, 50_000.0);
        assert_eq!(summary.entry_count, 0);
        assert_eq!(summary.results.win_rate, 0);
        assert!(summary.capital.is_empty());
        assert_eq!(summary.final_capital, 50_000.0);
        assert_eq!(summary.timeframes.len(), 5);
        assert!(summary.timeframes.iter().all(|t| t.pct == 0.0));
    }
}
