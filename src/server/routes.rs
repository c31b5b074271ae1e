use crate::errors::{JournalError, JournalResult};
use crate::markup::stats::{summarize, Period, PeriodSummary};
use crate::markup::types::Screenshot;
use crate::markup::views::{self, DayView, MonthView, Overview, Vocabulary, YearView};
use crate::markup::{MarkupEntry, NewMarkup, Timeframe};
use crate::repository::SyncReport;
use crate::state::{AppState, WsMessage};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use chrono::{Datelike, NaiveDate};
use portable_atomic::Ordering::Relaxed;
use std::sync::Arc;

// ── Error mapping ──

#[derive(Debug)]
pub struct ApiError(JournalError);

impl From<JournalError> for ApiError {
    fn from(e: JournalError) -> Self {
        ApiError(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            JournalError::Validation(_) | JournalError::Parse(_) => StatusCode::BAD_REQUEST,
            JournalError::NotFound(_) => StatusCode::NOT_FOUND,
            JournalError::Conflict(_) => StatusCode::CONFLICT,
            JournalError::Network(_) | JournalError::Store { .. } => StatusCode::BAD_GATEWAY,
            JournalError::Database(_) | JournalError::Config(_) | JournalError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Count backend failures before handing the error to the client.
fn store_error(state: &AppState, e: JournalError) -> ApiError {
    if matches!(
        e,
        JournalError::Database(_) | JournalError::Network(_) | JournalError::Store { .. }
    ) {
        state.counters.store_failures.fetch_add(1, Relaxed);
    }
    ApiError(e)
}

fn parse_day(raw: &str) -> JournalResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| JournalError::Validation(format!("invalid day: {raw}")))
}

fn check_screenshot_count(state: &AppState, count: usize) -> JournalResult<()> {
    screenshot_limit(count, state.images.max_per_entry)
}

fn screenshot_limit(count: usize, max: usize) -> JournalResult<()> {
    if count > max {
        return Err(JournalError::Validation(format!("too many screenshots: {count} (max {max})")));
    }
    Ok(())
}

/// Bulk input skips `NewMarkup`, so apply its checks here; the repository
/// normalizes symbol and notes.
fn validate_bulk(entries: &[MarkupEntry], max_screenshots: usize) -> JournalResult<()> {
    for entry in entries {
        if entry.id.trim().is_empty() {
            return Err(JournalError::Validation("id must not be empty".into()));
        }
        if entry.symbol.trim().is_empty() {
            return Err(JournalError::Validation(format!("{}: symbol must not be empty", entry.id)));
        }
        screenshot_limit(entry.screenshots.len(), max_screenshots)?;
    }
    Ok(())
}

// ── Entries ──

/// GET /api/markups -- all entries, newest first
pub async fn list_markups(State(state): State<Arc<AppState>>) -> Json<Vec<MarkupEntry>> {
    Json(state.repo.list().await)
}

/// GET /api/markups/{id}
pub async fn get_markup(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<Json<MarkupEntry>> {
    let entry = state.repo.get(&id).await;
    entry.map(Json).ok_or(ApiError(JournalError::NotFound(id)))
}

/// POST /api/markups
pub async fn create_markup(
    State(state): State<Arc<AppState>>,
    Json(input): Json<NewMarkup>,
) -> ApiResult<(StatusCode, Json<MarkupEntry>)> {
    let input = input.validated()?;
    check_screenshot_count(&state, input.screenshots.as_ref().map_or(0, Vec::len))?;

    let entry = state
        .repo
        .add(input.into_entry())
        .await
        .map_err(|e| store_error(&state, e))?;

    state.counters.entries_created.fetch_add(1, Relaxed);
    tracing::info!(id = %entry.id, symbol = %entry.symbol, "markup created");
    state.broadcast(WsMessage::EntryCreated { entry: entry.clone() });
    Ok((StatusCode::CREATED, Json(entry)))
}

/// PUT /api/markups/{id} -- replace the editable fields
pub async fn update_markup(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(input): Json<NewMarkup>,
) -> ApiResult<Json<MarkupEntry>> {
    let input = input.validated()?;
    check_screenshot_count(&state, input.screenshots.as_ref().map_or(0, Vec::len))?;

    let entry = state
        .repo
        .update(&id, move |prev| input.apply(prev))
        .await
        .map_err(|e| store_error(&state, e))?;

    state.counters.entries_updated.fetch_add(1, Relaxed);
    tracing::info!(id = %entry.id, "markup updated");
    state.broadcast(WsMessage::EntryUpdated { entry: entry.clone() });
    Ok(Json(entry))
}

/// DELETE /api/markups/{id}
pub async fn delete_markup(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> ApiResult<StatusCode> {
    state.repo.remove(&id).await.map_err(|e| store_error(&state, e))?;

    state.counters.entries_deleted.fetch_add(1, Relaxed);
    tracing::info!(id = %id, "markup deleted");
    state.broadcast(WsMessage::EntryDeleted { id });
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/markups -- make the journal equal to the posted list
pub async fn replace_markups(
    State(state): State<Arc<AppState>>,
    Json(entries): Json<Vec<MarkupEntry>>,
) -> ApiResult<Json<SyncReport>> {
    validate_bulk(&entries, state.images.max_per_entry)?;
    let report = state
        .repo
        .replace_all(entries)
        .await
        .map_err(|e| store_error(&state, e))?;

    state.broadcast(WsMessage::JournalReplaced { report: report.clone() });
    Ok(Json(report))
}

#[derive(serde::Deserialize)]
pub struct ScreenshotQuery {
    pub timeframe: Option<Timeframe>,
}

/// POST /api/markups/{id}/screenshots -- raw image body appended to the entry
pub async fn upload_screenshot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(params): Query<ScreenshotQuery>,
    body: Bytes,
) -> ApiResult<Json<MarkupEntry>> {
    let current = state
        .repo
        .get(&id)
        .await
        .ok_or_else(|| ApiError(JournalError::NotFound(id.clone())))?;
    check_screenshot_count(&state, current.screenshots.len() + 1)?;

    let shot = Screenshot {
        id: uuid::Uuid::new_v4().to_string(),
        src: state.images.to_data_url(&body)?,
        timeframe: params.timeframe.unwrap_or(current.timeframe),
    };

    let entry = state
        .repo
        .update(&id, move |mut prev| {
            prev.screenshots.push(shot);
            prev.screenshot_data_url = prev.screenshots.first().map(|s| s.src.clone());
            prev
        })
        .await
        .map_err(|e| store_error(&state, e))?;

    state.counters.entries_updated.fetch_add(1, Relaxed);
    tracing::info!(id = %entry.id, bytes = body.len(), "screenshot attached");
    state.broadcast(WsMessage::EntryUpdated { entry: entry.clone() });
    Ok(Json(entry))
}

// ── Aggregated views ──

/// GET /api/overview -- year cards, rankings and all-time stats
pub async fn get_overview(State(state): State<Arc<AppState>>) -> Json<Overview> {
    let entries = state.repo.list().await;
    let current_year = chrono::Local::now().year();
    Json(views::overview(&entries, current_year, state.config.starting_capital))
}

/// GET /api/years/{year}
pub async fn get_year(State(state): State<Arc<AppState>>, Path(year): Path<i32>) -> Json<YearView> {
    let entries = state.repo.list().await;
    Json(views::year_view(&entries, year, state.config.starting_capital))
}

/// GET /api/years/{year}/months/{month} -- calendar grid
pub async fn get_month(
    State(state): State<Arc<AppState>>,
    Path((year, month)): Path<(i32, u32)>,
) -> ApiResult<Json<MonthView>> {
    let entries = state.repo.list().await;
    Ok(Json(views::month_view(&entries, year, month, state.config.starting_capital)?))
}

/// GET /api/days/{day} -- `YYYY-MM-DD`
pub async fn get_day(State(state): State<Arc<AppState>>, Path(day): Path<String>) -> ApiResult<Json<DayView>> {
    let date = parse_day(&day)?;
    let entries = state.repo.list().await;
    Ok(Json(views::day_view(&entries, date, state.config.starting_capital)))
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct StatsQuery {
    pub period: Option<String>,
    pub date: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
}

impl StatsQuery {
    fn to_period(&self) -> JournalResult<Period> {
        let need_date = || -> JournalResult<NaiveDate> {
            let raw = self
                .date
                .as_deref()
                .ok_or_else(|| JournalError::Validation("date is required".into()))?;
            parse_day(raw)
        };
        let need_year = || {
            self.year
                .ok_or_else(|| JournalError::Validation("year is required".into()))
        };

        match self.period.as_deref().unwrap_or("all") {
            "all" => Ok(Period::All),
            "day" => Ok(Period::Day { date: need_date()? }),
            "week" => Ok(Period::week_of(need_date()?)),
            "month" => {
                let month = self
                    .month
                    .filter(|m| (1..=12).contains(m))
                    .ok_or_else(|| JournalError::Validation("month must be 1..=12".into()))?;
                Ok(Period::Month { year: need_year()?, month })
            }
            "year" => Ok(Period::Year { year: need_year()? }),
            other => Err(JournalError::Validation(format!("unknown period: {other}"))),
        }
    }
}

/// GET /api/stats -- `PeriodSummary` for any period
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Query(params): Query<StatsQuery>,
) -> ApiResult<Json<PeriodSummary>> {
    let period = params.to_period()?;
    let entries = state.repo.list().await;
    Ok(Json(summarize(&entries, period, state.config.starting_capital)))
}

/// GET /api/vocabulary -- form choices with display labels
pub async fn get_vocabulary() -> Json<Vocabulary> {
    Json(views::vocabulary())
}

/// GET /api/counters -- service counters (lock-free reads)
pub async fn get_counters(State(state): State<Arc<AppState>>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "entries_created": state.counters.entries_created.load(Relaxed),
        "entries_updated": state.counters.entries_updated.load(Relaxed),
        "entries_deleted": state.counters.entries_deleted.load(Relaxed),
        "store_failures": state.counters.store_failures.load(Relaxed),
        "ws_messages_sent": state.counters.ws_messages_sent.load(Relaxed),
        "ws_subscribers": state.ws_tx.receiver_count(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(period: &str) -> StatsQuery {
        StatsQuery {
            period: Some(period.into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_stats_query_periods() {
        assert_eq!(StatsQuery::default().to_period().unwrap(), Period::All);

        let mut q = query("week");
        q.date = Some("2024-01-18".into());
        assert_eq!(
            q.to_period().unwrap(),
            Period::Week {
                start: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap()
            }
        );

        let mut q = query("month");
        q.year = Some(2024);
        q.month = Some(2);
        assert_eq!(q.to_period().unwrap(), Period::Month { year: 2024, month: 2 });
    }

    #[test]
    fn test_stats_query_rejects_incomplete() {
        assert!(query("day").to_period().is_err());
        assert!(query("year").to_period().is_err());
        assert!(query("fortnight").to_period().is_err());

        let mut q = query("month");
        q.year = Some(2024);
        q.month = Some(13);
        assert!(q.to_period().is_err());

        let mut q = query("day");
        q.date = Some("18/01/2024".into());
        assert!(q.to_period().is_err());
    }

    #[test]
    fn test_bulk_input_checks() {
        let entries: Vec<MarkupEntry> = serde_json::from_str(
            r#"[{"id": "x", "datetimeLocal": "2024-03-01T09:00", "symbol": "eurusd", "timeframe": "M15"}]"#,
        )
        .unwrap();
        assert!(validate_bulk(&entries, 12).is_ok());

        let mut blank = entries.clone();
        blank[0].symbol = "  ".into();
        assert!(matches!(validate_bulk(&blank, 12), Err(JournalError::Validation(_))));

        let crowded: Vec<MarkupEntry> = serde_json::from_str(
            r#"[{"id": "y", "datetimeLocal": "2024-03-01T09:00", "symbol": "MSU", "timeframe": "M15",
                 "screenshots": ["data:a", "data:b", "data:c"]}]"#,
        )
        .unwrap();
        assert!(validate_bulk(&crowded, 2).is_err());
        assert!(validate_bulk(&crowded, 3).is_ok());
    }

    #[test]
    fn test_error_status_mapping() {
        let status = |e: JournalError| ApiError(e).into_response().status();
        assert_eq!(status(JournalError::Validation("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status(JournalError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status(JournalError::Conflict("x".into())), StatusCode::CONFLICT);
        assert_eq!(
            status(JournalError::Store {
                status: 500,
                body: String::new()
            }),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(status(JournalError::Database("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
