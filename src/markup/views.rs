use crate::errors::JournalResult;
use crate::markup::calendar::{build_month_weeks, CalendarDay};
use crate::markup::metrics::{self, ComboShare, MonthCard, TimeframeShare, YearCard, MONTH_LABELS};
use crate::markup::stats::{capital_curve, summarize, CapitalStep, Period, PeriodSummary};
use crate::markup::types::{Characteristic, TradeResult};
use crate::markup::{MarkupEntry, Timeframe};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::HashMap;

pub const DAY_LABELS: [&str; 7] = ["Lundi", "Mardi", "Mercredi", "Jeudi", "Vendredi", "Samedi", "Dimanche"];

const TOP_LIMIT: usize = 6;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub years: Vec<YearCard>,
    /// `SYMBOL__TF` -> count
    pub combo_counts: HashMap<String, usize>,
    pub top_combos: Vec<ComboShare>,
    pub top_timeframes: Vec<TimeframeShare>,
    pub summary: PeriodSummary,
}

pub fn overview(entries: &[MarkupEntry], current_year: i32, starting_capital: f64) -> Overview {
    Overview {
        years: metrics::year_cards(entries, current_year),
        combo_counts: metrics::count_by_combo(entries),
        top_combos: metrics::top_combos(entries, TOP_LIMIT),
        top_timeframes: metrics::top_timeframes(entries, TOP_LIMIT),
        summary: summarize(entries, Period::All, starting_capital),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YearView {
    pub year: i32,
    pub months: Vec<MonthCard>,
    pub summary: PeriodSummary,
}

pub fn year_view(entries: &[MarkupEntry], year: i32, starting_capital: f64) -> YearView {
    YearView {
        year,
        months: metrics::month_cards(entries, year),
        summary: summarize(entries, Period::Year { year }, starting_capital),
    }
}

/// One calendar cell. Padding days still carry their entries so the grid
/// can link into neighbouring months.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayCell {
    pub day_key: String,
    pub day: u32,
    pub in_month: bool,
    pub weekday: u32,
    pub count: usize,
    pub thumbnail: Option<String>,
    pub entries: Vec<MarkupEntry>,
}

impl DayCell {
    fn new(day: &CalendarDay, mut entries: Vec<MarkupEntry>) -> Self {
        entries.sort_by(|a, b| a.datetime_local.cmp(&b.datetime_local));
        let thumbnail = entries.iter().find_map(|e| e.first_screenshot()).map(str::to_string);
        Self {
            day_key: day.day_key(),
            day: day.date.day(),
            in_month: day.in_month,
            weekday: day.weekday,
            count: entries.len(),
            thumbnail,
            entries,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthView {
    pub year: i32,
    pub month: u32,
    pub label: &'static str,
    pub weeks: Vec<Vec<DayCell>>,
    pub summary: PeriodSummary,
}

pub fn month_view(entries: &[MarkupEntry], year: i32, month: u32, starting_capital: f64) -> JournalResult<MonthView> {
    let grid = build_month_weeks(year, month)?;
    let mut by_day = metrics::group_by_day(entries);

    let weeks = grid
        .iter()
        .map(|week| {
            week.iter()
                .map(|day| DayCell::new(day, by_day.remove(&day.day_key()).unwrap_or_default()))
                .collect()
        })
        .collect();

    Ok(MonthView {
        year,
        month,
        label: MONTH_LABELS[(month - 1) as usize],
        weeks,
        summary: summarize(entries, Period::Month { year, month }, starting_capital),
    })
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayView {
    pub day_key: String,
    pub weekday_label: &'static str,
    pub month_label: &'static str,
    /// Oldest first.
    pub entries: Vec<MarkupEntry>,
    /// Per-trade capital over the day, starting from `starting_capital`.
    pub curve: Vec<CapitalStep>,
    pub summary: PeriodSummary,
}

pub fn day_view(entries: &[MarkupEntry], date: NaiveDate, starting_capital: f64) -> DayView {
    let period = Period::Day { date };
    let mut list: Vec<MarkupEntry> = entries.iter().filter(|e| period.contains(e)).cloned().collect();
    list.sort_by(|a, b| a.datetime_local.cmp(&b.datetime_local));

    DayView {
        day_key: date.format("%Y-%m-%d").to_string(),
        weekday_label: DAY_LABELS[date.weekday().num_days_from_monday() as usize],
        month_label: MONTH_LABELS[date.month0() as usize],
        curve: capital_curve(starting_capital, &list),
        entries: list,
        summary: summarize(entries, period, starting_capital),
    }
}

// ── Form vocabularies ──

#[derive(Debug, Clone, Serialize)]
pub struct Choice<T> {
    pub value: T,
    pub label: &'static str,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Vocabulary {
    pub timeframes: Vec<Timeframe>,
    pub characteristics: Vec<Choice<Characteristic>>,
    pub trade_results: Vec<Choice<TradeResult>>,
}

pub fn vocabulary() -> Vocabulary {
    Vocabulary {
        timeframes: Timeframe::ALL.to_vec(),
        characteristics: Characteristic::ALL
            .into_iter()
            .map(|value| Choice { value, label: value.label() })
            .collect(),
        trade_results: TradeResult::ALL
            .into_iter()
            .map(|value| Choice { value, label: value.label() })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markup::types::{LocalStamp, Screenshot};

    fn entry(id: &str, at: &str) -> MarkupEntry {
        MarkupEntry::new(id, LocalStamp::parse(at).unwrap(), "MSU", Timeframe::M15)
    }

    fn shot(id: &str, src: &str) -> Screenshot {
        Screenshot {
            id: id.into(),
            src: src.into(),
            timeframe: Timeframe::M15,
        }
    }

    #[test]
    fn test_month_view_places_entries_and_thumbnails() {
        let mut late = entry("late", "2024-03-05T15:00");
        late.screenshots.push(shot("s2", "data:late"));
        let mut early = entry("early", "2024-03-05T08:00");
        early.screenshots.push(shot("s1", "data:early"));
        let spill = entry("spill", "2024-02-26T10:00");

        let view = month_view(&[late, early, spill], 2024, 3, 100_000.0).unwrap();
        assert_eq!(view.label, "Mars");

        // March 2024 starts on a Friday: the grid opens on Monday Feb 26
        let first = &view.weeks[0][0];
        assert_eq!(first.day_key, "2024-02-26");
        assert!(!first.in_month);
        assert_eq!(first.count, 1);

        let fifth = view
            .weeks
            .iter()
            .flatten()
            .find(|c| c.day_key == "2024-03-05")
            .unwrap();
        assert!(fifth.in_month);
        assert_eq!(fifth.count, 2);
        assert_eq!(fifth.entries[0].id, "early");
        assert_eq!(fifth.thumbnail.as_deref(), Some("data:early"));

        // the summary only counts March
        assert_eq!(view.summary.entry_count, 2);
    }

    #[test]
    fn test_month_view_rejects_bad_month() {
        assert!(month_view(&[], 2024, 13, 100_000.0).is_err());
    }

    #[test]
    fn test_day_view_labels_and_order() {
        let mut win = entry("b", "2024-03-05T15:00");
        win.trade_result = Some(TradeResult::Tp2);
        win.capital_pct = Some(3.0);
        let mut loss = entry("a", "2024-03-05T08:00");
        loss.capital_pct = Some(-1.0);
        let entries = vec![win, loss, entry("other", "2024-03-06T08:00")];

        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        let view = day_view(&entries, date, 100_000.0);
        assert_eq!(view.weekday_label, "Mardi");
        assert_eq!(view.month_label, "Mars");
        let ids: Vec<&str> = view.entries.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert_eq!(view.summary.results.wins, 1);

        assert_eq!(view.curve.len(), 2);
        assert!((view.curve[0].capital - 99_000.0).abs() < 1e-6);
        assert!((view.curve[1].capital - 102_000.0).abs() < 1e-6);
    }

    #[test]
    fn test_year_and_overview() {
        let entries = vec![entry("a", "2024-01-10T09:00"), entry("b", "2024-03-05T09:00"), entry("c", "2023-06-01T09:00")];

        let year = year_view(&entries, 2024, 100_000.0);
        assert_eq!(year.months.len(), 12);
        assert_eq!(year.months[0].count, 1);
        assert_eq!(year.summary.entry_count, 2);

        let all = overview(&entries, 2024, 100_000.0);
        assert_eq!(all.summary.entry_count, 3);
        assert_eq!(all.years[0].year, 2025);
        assert_eq!(all.top_timeframes[0].count, 3);
        assert_eq!(all.combo_counts["MSU__M15"], 3);
    }

    #[test]
    fn test_vocabulary_labels() {
        let vocab = vocabulary();
        assert_eq!(vocab.timeframes.len(), 5);
        assert_eq!(vocab.trade_results[3].label, "Stop Loss");
        let json = serde_json::to_value(&vocab.characteristics[0]).unwrap();
        assert_eq!(json["value"], "sorti_lit_cycle");
    }
}
