use crate::markup::types::{MarkupEntry, Timeframe};
use chrono::{Datelike, Timelike};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

pub const MONTH_LABELS: [&str; 12] = [
    "Janvier",
    "Février",
    "Mars",
    "Avril",
    "Mai",
    "Juin",
    "Juillet",
    "Août",
    "Septembre",
    "Octobre",
    "Novembre",
    "Décembre",
];

/// Years always offered in the overview, whether or not they hold entries.
const LEGACY_YEARS: [i32; 6] = [2020, 2019, 2018, 2017, 2016, 2015];

// ── Temporal derivation ──

#[inline]
pub fn year_of(entry: &MarkupEntry) -> i32 {
    entry.datetime_local.datetime().year()
}

/// 1..=12
#[inline]
pub fn month_of(entry: &MarkupEntry) -> u32 {
    entry.datetime_local.datetime().month()
}

/// `YYYY-MM-DD`
#[inline]
pub fn day_key(entry: &MarkupEntry) -> String {
    entry.datetime_local.date().format("%Y-%m-%d").to_string()
}

/// 0..=23, exactly as written.
#[inline]
pub fn hour_of(entry: &MarkupEntry) -> u32 {
    entry.datetime_local.datetime().hour()
}

// ── Grouping ──

/// Buckets keyed by day, each sorted by timestamp ascending.
pub fn group_by_day(entries: &[MarkupEntry]) -> BTreeMap<String, Vec<MarkupEntry>> {
    let mut map: BTreeMap<String, Vec<MarkupEntry>> = BTreeMap::new();
    for e in entries {
        map.entry(day_key(e)).or_default().push(e.clone());
    }
    for list in map.values_mut() {
        list.sort_by_key(|e| e.datetime_local);
    }
    map
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeframeShare {
    pub timeframe: Timeframe,
    pub count: usize,
    pub pct: f64,
}

/// One row per timeframe, in declared order, zero counts included.
pub fn timeframe_distribution(entries: &[MarkupEntry]) -> Vec<TimeframeShare> {
    let mut counts: HashMap<Timeframe, usize> = HashMap::new();
    for e in entries {
        *counts.entry(e.timeframe).or_insert(0) += 1;
    }
    let total = entries.len().max(1) as f64;

    Timeframe::ALL
        .into_iter()
        .map(|timeframe| {
            let count = counts.get(&timeframe).copied().unwrap_or(0);
            TimeframeShare {
                timeframe,
                count,
                pct: count as f64 / total * 100.0,
            }
        })
        .collect()
}

pub fn count_by_hour(entries: &[MarkupEntry]) -> [u32; 24] {
    let mut hours = [0u32; 24];
    for e in entries {
        hours[hour_of(e) as usize] += 1;
    }
    hours
}

// ── Rankings ──

/// `SYMBOL__TIMEFRAME`
pub fn combo_key(entry: &MarkupEntry) -> String {
    format!("{}__{}", entry.symbol.to_uppercase(), entry.timeframe)
}

pub fn count_by_combo(entries: &[MarkupEntry]) -> HashMap<String, usize> {
    let mut map = HashMap::new();
    for e in entries {
        *map.entry(combo_key(e)).or_insert(0) += 1;
    }
    map
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComboShare {
    pub symbol: String,
    pub timeframe: Timeframe,
    pub count: usize,
    pub pct: f64,
}

/// Most frequent symbol/timeframe pairs. Ties are broken by key so the
/// output is stable.
pub fn top_combos(entries: &[MarkupEntry], limit: usize) -> Vec<ComboShare> {
    let mut counts: HashMap<(String, Timeframe), usize> = HashMap::new();
    for e in entries {
        *counts.entry((e.symbol.to_uppercase(), e.timeframe)).or_insert(0) += 1;
    }
    let total = entries.len().max(1) as f64;

    let mut ranked: Vec<_> = counts.into_iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    ranked
        .into_iter()
        .take(limit)
        .map(|((symbol, timeframe), count)| ComboShare {
            symbol,
            timeframe,
            count,
            pct: count as f64 / total * 100.0,
        })
        .collect()
}

/// Timeframes present in the data, most frequent first.
pub fn top_timeframes(entries: &[MarkupEntry], limit: usize) -> Vec<TimeframeShare> {
    let mut ranked: Vec<TimeframeShare> = timeframe_distribution(entries)
        .into_iter()
        .filter(|s| s.count > 0)
        .collect();
    // stable sort keeps declared order among ties
    ranked.sort_by(|a, b| b.count.cmp(&a.count));
    ranked.truncate(limit);
    ranked
}

// ── Period cards ──

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthCard {
    pub month: u32,
    pub label: &'static str,
    pub count: usize,
    pub pct: f64,
}

/// Twelve cards for one year. `pct` is the month's share of the year.
pub fn month_cards(entries: &[MarkupEntry], year: i32) -> Vec<MonthCard> {
    let mut by_month = [0usize; 12];
    let mut year_total = 0usize;
    for e in entries.iter().filter(|e| year_of(e) == year) {
        by_month[(month_of(e) - 1) as usize] += 1;
        year_total += 1;
    }

    (1..=12u32)
        .map(|month| {
            let count = by_month[(month - 1) as usize];
            let pct = if year_total > 0 {
                count as f64 / year_total as f64 * 100.0
            } else {
                0.0
            };
            MonthCard {
                month,
                label: MONTH_LABELS[(month - 1) as usize],
                count,
                pct,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct YearCard {
    pub year: i32,
    pub count: usize,
    pub pct: f64,
}

/// Years shown in the overview: the next year and the four before the
/// current one, the legacy years, and every year holding data. Newest first.
pub fn year_cards(entries: &[MarkupEntry], current_year: i32) -> Vec<YearCard> {
    let mut by_year: BTreeMap<i32, usize> = BTreeMap::new();
    for y in (0..6).map(|i| current_year + 1 - i).chain(LEGACY_YEARS) {
        by_year.entry(y).or_insert(0);
    }
    for e in entries {
        *by_year.entry(year_of(e)).or_insert(0) += 1;
    }

    let total = entries.len();
    by_year
        .into_iter()
        .rev()
        .map(|(year, count)| YearCard {
            year,
            count,
            pct: if total > 0 {
                count as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        })
        .collect()
}
