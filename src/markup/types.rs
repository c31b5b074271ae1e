use crate::errors::{JournalError, JournalResult};
use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::str::FromStr;

// ── Local timestamp ──

/// Naive local timestamp (`YYYY-MM-DDTHH:MM`). No timezone is attached:
/// the hour written by the user is the hour reported everywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LocalStamp(NaiveDateTime);

impl LocalStamp {
    pub fn parse(raw: &str) -> JournalResult<Self> {
        let raw = raw.trim();
        NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M")
            .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f"))
            .map(Self)
            .map_err(|e| JournalError::Validation(format!("invalid datetimeLocal {raw:?}: {e}")))
    }

    #[inline]
    pub fn datetime(&self) -> NaiveDateTime {
        self.0
    }

    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.0.date()
    }
}

impl FromStr for LocalStamp {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for LocalStamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.0.second() == 0 && self.0.nanosecond() == 0 {
            write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M"))
        } else {
            write!(f, "{}", self.0.format("%Y-%m-%dT%H:%M:%S"))
        }
    }
}

impl Serialize for LocalStamp {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for LocalStamp {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

// ── Vocabularies ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    M5,
    M15,
    M30,
    H1,
    H4,
}

impl Timeframe {
    /// Declared order, used for every chart so bars never move around.
    pub const ALL: [Timeframe; 5] = [Self::M5, Self::M15, Self::M30, Self::H1, Self::H4];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::M5 => "M5",
            Self::M15 => "M15",
            Self::M30 => "M30",
            Self::H1 => "H1",
            Self::H4 => "H4",
        }
    }
}

impl std::fmt::Display for Timeframe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Timeframe {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|tf| tf.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| JournalError::Validation(format!("unknown timeframe: {s}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Characteristic {
    SortiLitCycle,
    SortiBuildup,
    PriseBuildup,
    MsuBaissier,
    MsuHaussier,
}

impl Characteristic {
    pub const ALL: [Characteristic; 5] = [
        Self::SortiLitCycle,
        Self::SortiBuildup,
        Self::PriseBuildup,
        Self::MsuBaissier,
        Self::MsuHaussier,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::SortiLitCycle => "Sorti de lit cycle",
            Self::SortiBuildup => "Sorti de buildup",
            Self::PriseBuildup => "Prise de build up",
            Self::MsuBaissier => "MSU baissier",
            Self::MsuHaussier => "MSU haussier",
        }
    }
}

/// Net outcome of a trade. Mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeResult {
    Tp1,
    Tp2,
    Tp3,
    Sl,
    Be,
}

impl TradeResult {
    pub const ALL: [TradeResult; 5] = [Self::Tp1, Self::Tp2, Self::Tp3, Self::Sl, Self::Be];

    #[inline]
    pub fn is_win(&self) -> bool {
        matches!(self, Self::Tp1 | Self::Tp2 | Self::Tp3)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Tp1 => "TP 1",
            Self::Tp2 => "TP 2",
            Self::Tp3 => "TP 3",
            Self::Sl => "Stop Loss",
            Self::Be => "Break Even",
        }
    }
}

/// Outcome of a single partial exit, independent of the trade's net result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PartialResult {
    Sl,
    Be,
    Tp,
}

// ── Entry ──

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Screenshot {
    pub id: String,
    /// Image data URL.
    pub src: String,
    pub timeframe: Timeframe,
}

pub type Characteristics = SmallVec<[Characteristic; 5]>;

/// One logged trade observation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RawMarkup")]
pub struct MarkupEntry {
    pub id: String,
    pub datetime_local: LocalStamp,
    pub symbol: String,
    pub timeframe: Timeframe,
    pub strategy: String,
    #[serde(skip_serializing_if = "SmallVec::is_empty")]
    pub characteristics: Characteristics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trade_result: Option<TradeResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pips: Option<f64>,
    #[serde(rename = "pipsTP1", skip_serializing_if = "Option::is_none")]
    pub pips_tp1: Option<f64>,
    #[serde(rename = "resultTP1", skip_serializing_if = "Option::is_none")]
    pub result_tp1: Option<PartialResult>,
    #[serde(rename = "pipsTP2", skip_serializing_if = "Option::is_none")]
    pub pips_tp2: Option<f64>,
    #[serde(rename = "resultTP2", skip_serializing_if = "Option::is_none")]
    pub result_tp2: Option<PartialResult>,
    #[serde(rename = "pipsTP3", skip_serializing_if = "Option::is_none")]
    pub pips_tp3: Option<f64>,
    #[serde(rename = "resultTP3", skip_serializing_if = "Option::is_none")]
    pub result_tp3: Option<PartialResult>,
    #[serde(rename = "pipsSL", skip_serializing_if = "Option::is_none")]
    pub pips_sl: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capital_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub screenshots: Vec<Screenshot>,
    /// Legacy single image, superseded by `screenshots[0]`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub screenshot_data_url: Option<String>,
}

impl MarkupEntry {
    /// Bare entry with every optional field unset.
    pub fn new(id: impl Into<String>, datetime_local: LocalStamp, symbol: &str, timeframe: Timeframe) -> Self {
        Self {
            id: id.into(),
            datetime_local,
            symbol: symbol.trim().to_uppercase(),
            timeframe,
            strategy: String::new(),
            characteristics: SmallVec::new(),
            trade_result: None,
            pips: None,
            pips_tp1: None,
            result_tp1: None,
            pips_tp2: None,
            result_tp2: None,
            pips_tp3: None,
            result_tp3: None,
            pips_sl: None,
            capital_pct: None,
            notes: None,
            screenshots: Vec::new(),
            screenshot_data_url: None,
        }
    }

    /// Uppercase the symbol, drop blank notes and promote the legacy
    /// single image into `screenshots` when no screenshot is present.
    /// Applying it twice changes nothing.
    pub fn normalized(mut self) -> Self {
        self.symbol = self.symbol.trim().to_uppercase();
        self.notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if self.screenshots.is_empty() {
            if let Some(src) = self.screenshot_data_url.as_deref() {
                self.screenshots.push(Screenshot {
                    id: legacy_shot_id(&self.id, src, 0),
                    src: src.to_string(),
                    timeframe: self.timeframe,
                });
            }
        }
        self
    }

    /// Thumbnail for calendar cells.
    pub fn first_screenshot(&self) -> Option<&str> {
        self.screenshots
            .first()
            .map(|s| s.src.as_str())
            .or(self.screenshot_data_url.as_deref())
    }
}

fn legacy_shot_id(entry_id: &str, src: &str, index: usize) -> String {
    format!("{entry_id}-shot-{index}-{}", src.len())
}

// ── Lenient decoding ──

/// A stored screenshot: the structured object, or a bare data URL from
/// the first storage format. Anything else lands in `Unknown` and is
/// dropped during normalization, so one bad element never costs the entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawScreenshot {
    Structured {
        #[serde(default)]
        id: Option<String>,
        src: String,
        #[serde(default)]
        timeframe: Option<String>,
    },
    Bare(String),
    Unknown(serde_json::Value),
}

impl From<Screenshot> for RawScreenshot {
    fn from(s: Screenshot) -> Self {
        RawScreenshot::Structured {
            id: Some(s.id),
            src: s.src,
            timeframe: Some(s.timeframe.as_str().to_string()),
        }
    }
}

/// Turn stored screenshots into their canonical form. Missing ids are
/// derived from the entry id, missing or unknown timeframes inherit the
/// entry's. The legacy single image is used only when nothing else decoded.
pub fn normalize_screenshots(
    entry_id: &str,
    entry_timeframe: Timeframe,
    raw: Vec<RawScreenshot>,
    legacy_url: Option<&str>,
) -> Vec<Screenshot> {
    let mut shots: Vec<Screenshot> = raw
        .into_iter()
        .enumerate()
        .filter_map(|(i, shot)| match shot {
            RawScreenshot::Bare(src) => Some(Screenshot {
                id: legacy_shot_id(entry_id, &src, i),
                src,
                timeframe: entry_timeframe,
            }),
            RawScreenshot::Structured { id, src, timeframe } => Some(Screenshot {
                id: id.unwrap_or_else(|| legacy_shot_id(entry_id, &src, i)),
                timeframe: timeframe
                    .and_then(|tf| tf.parse().ok())
                    .unwrap_or(entry_timeframe),
                src,
            }),
            RawScreenshot::Unknown(value) => {
                tracing::warn!(entry_id, index = i, %value, "dropping malformed screenshot");
                None
            }
        })
        .collect();

    if shots.is_empty() {
        if let Some(src) = legacy_url {
            shots.push(Screenshot {
                id: legacy_shot_id(entry_id, src, 0),
                src: src.to_string(),
                timeframe: entry_timeframe,
            });
        }
    }
    shots
}

/// Keep first occurrences only.
pub fn dedup_characteristics(list: impl IntoIterator<Item = Characteristic>) -> Characteristics {
    let mut out = Characteristics::new();
    for c in list {
        if !out.contains(&c) {
            out.push(c);
        }
    }
    out
}

/// Every shape an entry has been persisted in. Decoding always goes
/// through here and then through normalization.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawMarkup {
    id: String,
    datetime_local: LocalStamp,
    symbol: String,
    timeframe: Timeframe,
    #[serde(default)]
    strategy: Option<String>,
    #[serde(default)]
    characteristics: Option<Vec<Characteristic>>,
    #[serde(default)]
    trade_result: Option<TradeResult>,
    #[serde(default)]
    pips: Option<f64>,
    #[serde(default, rename = "pipsTP1")]
    pips_tp1: Option<f64>,
    #[serde(default, rename = "resultTP1")]
    result_tp1: Option<PartialResult>,
    #[serde(default, rename = "pipsTP2")]
    pips_tp2: Option<f64>,
    #[serde(default, rename = "resultTP2")]
    result_tp2: Option<PartialResult>,
    #[serde(default, rename = "pipsTP3")]
    pips_tp3: Option<f64>,
    #[serde(default, rename = "resultTP3")]
    result_tp3: Option<PartialResult>,
    #[serde(default, rename = "pipsSL")]
    pips_sl: Option<f64>,
    #[serde(default)]
    capital_pct: Option<f64>,
    #[serde(default)]
    notes: Option<String>,
    #[serde(default)]
    screenshots: Option<Vec<RawScreenshot>>,
    #[serde(default)]
    screenshot_data_url: Option<String>,
}

impl From<RawMarkup> for MarkupEntry {
    fn from(raw: RawMarkup) -> Self {
        let screenshots = normalize_screenshots(
            &raw.id,
            raw.timeframe,
            raw.screenshots.unwrap_or_default(),
            raw.screenshot_data_url.as_deref(),
        );
        Self {
            id: raw.id,
            datetime_local: raw.datetime_local,
            symbol: raw.symbol,
            timeframe: raw.timeframe,
            strategy: raw.strategy.unwrap_or_default(),
            characteristics: dedup_characteristics(raw.characteristics.unwrap_or_default()),
            trade_result: raw.trade_result,
            pips: raw.pips,
            pips_tp1: raw.pips_tp1,
            result_tp1: raw.result_tp1,
            pips_tp2: raw.pips_tp2,
            result_tp2: raw.result_tp2,
            pips_tp3: raw.pips_tp3,
            result_tp3: raw.result_tp3,
            pips_sl: raw.pips_sl,
            capital_pct: raw.capital_pct,
            notes: raw.notes,
            screenshots,
            screenshot_data_url: raw.screenshot_data_url,
        }
    }
}

/// Decode a legacy cache document. Records that don't decode are skipped,
/// anything other than a JSON array yields nothing.
pub fn decode_entries_lenient(json: &str) -> Vec<MarkupEntry> {
    let values: Vec<serde_json::Value> = match serde_json::from_str(json) {
        Ok(serde_json::Value::Array(values)) => values,
        Ok(_) => {
            tracing::warn!("legacy cache is not a JSON array, ignoring");
            return Vec::new();
        }
        Err(e) => {
            tracing::warn!(error = %e, "legacy cache is not valid JSON, ignoring");
            return Vec::new();
        }
    };

    values
        .into_iter()
        .enumerate()
        .filter_map(|(i, value)| match serde_json::from_value::<MarkupEntry>(value) {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::warn!(index = i, error = %e, "skipping undecodable markup");
                None
            }
        })
        .collect()
}

// ── API input ──

/// Body of create and edit requests.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMarkup {
    #[serde(default)]
    pub id: Option<String>,
    pub datetime_local: LocalStamp,
    pub symbol: String,
    pub timeframe: Timeframe,
    #[serde(default)]
    pub strategy: Option<String>,
    #[serde(default)]
    pub characteristics: Vec<Characteristic>,
    #[serde(default)]
    pub trade_result: Option<TradeResult>,
    #[serde(default)]
    pub pips: Option<f64>,
    #[serde(default, rename = "pipsTP1")]
    pub pips_tp1: Option<f64>,
    #[serde(default, rename = "resultTP1")]
    pub result_tp1: Option<PartialResult>,
    #[serde(default, rename = "pipsTP2")]
    pub pips_tp2: Option<f64>,
    #[serde(default, rename = "resultTP2")]
    pub result_tp2: Option<PartialResult>,
    #[serde(default, rename = "pipsTP3")]
    pub pips_tp3: Option<f64>,
    #[serde(default, rename = "resultTP3")]
    pub result_tp3: Option<PartialResult>,
    #[serde(default, rename = "pipsSL")]
    pub pips_sl: Option<f64>,
    #[serde(default)]
    pub capital_pct: Option<f64>,
    #[serde(default)]
    pub notes: Option<String>,
    /// `None` keeps the screenshots of an edited entry.
    #[serde(default)]
    pub screenshots: Option<Vec<RawScreenshot>>,
}

impl NewMarkup {
    /// Trim and uppercase the symbol, drop blank notes, reject non-finite numbers.
    pub fn validated(mut self) -> JournalResult<Self> {
        self.symbol = self.symbol.trim().to_uppercase();
        if self.symbol.is_empty() {
            return Err(JournalError::Validation("symbol must not be empty".into()));
        }

        self.notes = self
            .notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let numbers = [
            ("pips", self.pips),
            ("pipsTP1", self.pips_tp1),
            ("pipsTP2", self.pips_tp2),
            ("pipsTP3", self.pips_tp3),
            ("pipsSL", self.pips_sl),
            ("capitalPct", self.capital_pct),
        ];
        for (name, value) in numbers {
            if matches!(value, Some(v) if !v.is_finite()) {
                return Err(JournalError::Validation(format!("{name} must be a finite number")));
            }
        }

        if matches!(self.id.as_deref(), Some(id) if id.trim().is_empty()) {
            self.id = None;
        }
        Ok(self)
    }

    pub fn into_entry(self) -> MarkupEntry {
        let id = self
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let base = MarkupEntry::new(id, self.datetime_local, &self.symbol, self.timeframe);
        self.apply(base)
    }

    /// Replace the editable fields of `prev`. The id never changes.
    pub fn apply(self, prev: MarkupEntry) -> MarkupEntry {
        let screenshots = match self.screenshots {
            Some(raw) => normalize_screenshots(&prev.id, self.timeframe, raw, None),
            None => prev.screenshots,
        };
        let screenshot_data_url = screenshots.first().map(|s| s.src.clone());

        MarkupEntry {
            id: prev.id,
            datetime_local: self.datetime_local,
            symbol: self.symbol,
            timeframe: self.timeframe,
            strategy: self.strategy.unwrap_or(prev.strategy),
            characteristics: dedup_characteristics(self.characteristics),
            trade_result: self.trade_result,
            pips: self.pips,
            pips_tp1: self.pips_tp1,
            result_tp1: self.result_tp1,
            pips_tp2: self.pips_tp2,
            result_tp2: self.result_tp2,
            pips_tp3: self.pips_tp3,
            result_tp3: self.result_tp3,
            pips_sl: self.pips_sl,
            capital_pct: self.capital_pct,
            notes: self.notes,
            screenshots,
            screenshot_data_url,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stamp(raw: &str) -> LocalStamp {
        LocalStamp::parse(raw).unwrap()
    }

    #[test]
    fn test_stamp_round_trips_minute_format() {
        let s = stamp("2025-12-16T09:15");
        assert_eq!(s.to_string(), "2025-12-16T09:15");
        assert_eq!(serde_json::to_string(&s).unwrap(), "\"2025-12-16T09:15\"");
        assert!(LocalStamp::parse("2025-12-16T09:15:30").is_ok());
        assert!(LocalStamp::parse("16/12/2025 09:15").is_err());
        assert!(LocalStamp::parse("2025-02-30T09:15").is_err());
    }

    #[test]
    fn test_vocabulary_wire_names() {
        assert_eq!(serde_json::to_string(&TradeResult::Tp2).unwrap(), "\"TP2\"");
        assert_eq!(serde_json::to_string(&PartialResult::Be).unwrap(), "\"BE\"");
        assert_eq!(serde_json::to_string(&Characteristic::SortiLitCycle).unwrap(), "\"sorti_lit_cycle\"");
        assert_eq!("h4".parse::<Timeframe>().unwrap(), Timeframe::H4);
        assert!("D1".parse::<Timeframe>().is_err());
    }

    #[test]
    fn test_legacy_string_screenshots_are_wrapped() {
        let json = r#"{
            "id": "e1",
            "datetimeLocal": "2024-01-13T15:10",
            "symbol": "MSU",
            "timeframe": "H1",
            "strategy": "",
            "screenshots": ["data:image/webp;base64,AAAA", {"src": "data:image/png;base64,BB", "timeframe": "M5"}]
        }"#;
        let entry: MarkupEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.screenshots.len(), 2);
        assert_eq!(entry.screenshots[0].id, "e1-shot-0-27");
        assert_eq!(entry.screenshots[0].timeframe, Timeframe::H1);
        assert_eq!(entry.screenshots[1].id, "e1-shot-1-24");
        assert_eq!(entry.screenshots[1].timeframe, Timeframe::M5);
    }

    #[test]
    fn test_legacy_data_url_is_promoted() {
        let json = r#"{
            "id": "e2",
            "datetimeLocal": "2024-01-13T15:10",
            "symbol": "MSU",
            "timeframe": "M15",
            "strategy": "",
            "screenshotDataUrl": "data:image/webp;base64,XYZ"
        }"#;
        let entry: MarkupEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.screenshots.len(), 1);
        assert_eq!(entry.screenshots[0].src, "data:image/webp;base64,XYZ");
        assert_eq!(entry.first_screenshot(), Some("data:image/webp;base64,XYZ"));
    }

    #[test]
    fn test_normalizing_twice_is_a_no_op() {
        let mut entry = MarkupEntry::new("e3", stamp("2024-05-02T10:00"), "msu", Timeframe::M30);
        entry.screenshot_data_url = Some("data:image/png;base64,QQ".into());
        let once = entry.normalized();
        let twice = once.clone().normalized();
        assert_eq!(once, twice);

        let json = serde_json::to_string(&once).unwrap();
        let decoded: MarkupEntry = serde_json::from_str(&json).unwrap();
        assert_eq!(decoded, once);
    }

    #[test]
    fn test_malformed_screenshot_drops_only_itself() {
        let json = r#"[{
            "id": "e4",
            "datetimeLocal": "2024-01-13T15:10",
            "symbol": "MSU",
            "timeframe": "M15",
            "screenshots": [{"id": "ok", "src": "data:image/png;base64,AA"}, {"id": "broken"}, 42]
        }]"#;
        let entries = decode_entries_lenient(json);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].screenshots.len(), 1);
        assert_eq!(entries[0].screenshots[0].id, "ok");
    }

    #[test]
    fn test_normalized_cleans_symbol_and_notes() {
        let json = r#"{"id": "e5", "datetimeLocal": "2024-01-13T15:10", "symbol": " eurusd ",
                       "timeframe": "M15", "notes": "  "}"#;
        let entry: MarkupEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.symbol, " eurusd ");

        let entry = entry.normalized();
        assert_eq!(entry.symbol, "EURUSD");
        assert_eq!(entry.notes, None);
    }

    #[test]
    fn test_lenient_decode_skips_bad_records() {
        let json = r#"[
            {"id": "ok", "datetimeLocal": "2023-03-15T09:15", "symbol": "MSU", "timeframe": "M15", "strategy": "Breakout"},
            {"id": "bad-tf", "datetimeLocal": "2023-03-15T09:15", "symbol": "MSU", "timeframe": "D1", "strategy": ""},
            {"id": "bad-date", "datetimeLocal": "yesterday", "symbol": "MSU", "timeframe": "M5", "strategy": ""}
        ]"#;
        let entries = decode_entries_lenient(json);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, "ok");
        assert!(decode_entries_lenient("{\"not\": \"an array\"}").is_empty());
        assert!(decode_entries_lenient("garbage").is_empty());
    }

    #[test]
    fn test_new_markup_validation() {
        let input: NewMarkup = serde_json::from_str(
            r#"{"datetimeLocal": "2025-01-02T08:30", "symbol": "  eurusd ", "timeframe": "M5",
                "characteristics": ["msu_haussier", "msu_haussier", "prise_buildup"],
                "notes": "   ", "tradeResult": "TP1", "capitalPct": 1.5}"#,
        )
        .unwrap();
        let entry = input.validated().unwrap().into_entry();
        assert_eq!(entry.symbol, "EURUSD");
        assert_eq!(entry.notes, None);
        assert_eq!(entry.characteristics.as_slice(), &[Characteristic::MsuHaussier, Characteristic::PriseBuildup]);
        assert!(!entry.id.is_empty());

        let blank: NewMarkup = serde_json::from_str(
            r#"{"datetimeLocal": "2025-01-02T08:30", "symbol": "  ", "timeframe": "M5"}"#,
        )
        .unwrap();
        assert!(matches!(blank.validated(), Err(JournalError::Validation(_))));
    }

    #[test]
    fn test_apply_keeps_id_and_screenshots() {
        let mut prev = MarkupEntry::new("keep", stamp("2025-01-02T08:30"), "MSU", Timeframe::M5);
        prev.strategy = "Breakout".into();
        prev.screenshots.push(Screenshot { id: "s".into(), src: "data:x".into(), timeframe: Timeframe::M5 });

        let edit: NewMarkup = serde_json::from_str(
            r#"{"id": "other", "datetimeLocal": "2025-01-03T09:00", "symbol": "GBPUSD", "timeframe": "H1"}"#,
        )
        .unwrap();
        let next = edit.validated().unwrap().apply(prev);
        assert_eq!(next.id, "keep");
        assert_eq!(next.strategy, "Breakout");
        assert_eq!(next.screenshots.len(), 1);
        assert_eq!(next.screenshot_data_url.as_deref(), Some("data:x"));
        assert_eq!(next.timeframe, Timeframe::H1);
    }
}
