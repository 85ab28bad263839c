//! Study session services - Sessioni live e registrate, statistiche

use super::course::load_owned_course;
use crate::core::{AppError, AppJson, AppPath, AppQuery, AppState};
use crate::dtos::{
    CourseStudyTotalDTO, CreateStudySessionDTO, CreateStudySessionRequestDTO,
    DailyStudyTotalDTO, EndStudySessionDTO, StatsQuery, StudySessionDTO, StudySessionQuery,
    StudyStatsDTO, UpdateStudySessionDTO, UpdateStudySessionRequestDTO,
};
use crate::entities::{StudySession, User, duration_between};
use crate::repositories::{Create, Delete, Update};
use axum::{
    Extension,
    body::Bytes,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::{Days, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

const DEFAULT_LIST_LIMIT: i64 = 100;
const MAX_LIST_LIMIT: i64 = 500;
const DEFAULT_STATS_DAYS: i64 = 30;
const MAX_STATS_DAYS: i64 = 365;

async fn load_owned_session(
    state: &AppState,
    session_id: i64,
    user_id: i64,
) -> Result<StudySession, AppError> {
    state
        .sessions
        .find_owned(session_id, user_id)
        .await?
        .ok_or_else(|| {
            warn!("Study session {} not found for user {}", session_id, user_id);
            AppError::not_found("Study session not found")
        })
}

#[instrument(skip(state, current_user, query), fields(user_id = %current_user.id))]
pub async fn list_sessions(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppQuery(query): AppQuery<StudySessionQuery>,
) -> Result<Json<Vec<StudySessionDTO>>, AppError> {
    debug!("Listing study sessions");
    let limit = query
        .limit
        .unwrap_or(DEFAULT_LIST_LIMIT)
        .clamp(1, MAX_LIST_LIMIT);

    let sessions = state
        .sessions
        .find_many_by_user(current_user.id, &query, limit)
        .await?;

    info!("Retrieved {} study sessions", sessions.len());
    Ok(Json(sessions.into_iter().map(StudySessionDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn create_session(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppJson(body): AppJson<CreateStudySessionRequestDTO>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Creating study session");
    // 1. Validare e controllare che l'eventuale corso appartenga all'utente
    // 2. Senza fine si avvia una sessione live, ne può esistere una sola aperta
    // 3. Con la fine si registra una sessione conclusa, la fine non può precedere l'inizio
    body.validate()?;
    if let Some(course_id) = body.course_id {
        load_owned_course(&state, course_id, current_user.id).await?;
    }

    let started_at = body.started_at.unwrap_or_else(Utc::now);
    let duration_secs = match body.ended_at {
        None => {
            if state.sessions.find_open_by_user(current_user.id).await?.is_some() {
                warn!("A study session is already running");
                return Err(AppError::conflict("A study session is already in progress"));
            }
            None
        }
        Some(ended_at) if ended_at < started_at => {
            return Err(AppError::bad_request("ended_at must not be before started_at"));
        }
        Some(ended_at) => Some(duration_between(started_at, ended_at)),
    };

    let session = state
        .sessions
        .create(&CreateStudySessionDTO {
            user_id: current_user.id,
            course_id: body.course_id,
            started_at,
            ended_at: body.ended_at,
            duration_secs,
            notes: body.notes,
        })
        .await?;

    info!("Study session {} created (open: {})", session.id, session.is_open());
    Ok((StatusCode::CREATED, Json(StudySessionDTO::from(session))))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn get_session(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppPath(session_id): AppPath<i64>,
) -> Result<Json<StudySessionDTO>, AppError> {
    debug!("Fetching study session");
    let session = load_owned_session(&state, session_id, current_user.id).await?;
    Ok(Json(StudySessionDTO::from(session)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn end_session(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppPath(session_id): AppPath<i64>,
    body: Bytes,
) -> Result<Json<StudySessionDTO>, AppError> {
    debug!("Ending study session");
    // Il body è opzionale, uno vuoto termina la sessione senza note
    let body: EndStudySessionDTO = if body.iter().all(u8::is_ascii_whitespace) {
        EndStudySessionDTO::default()
    } else {
        serde_json::from_slice(&body).map_err(|e| {
            AppError::bad_request("Invalid JSON body").with_details(e.to_string())
        })?
    };
    body.validate()?;

    let session = load_owned_session(&state, session_id, current_user.id).await?;
    if !session.is_open() {
        warn!("Study session {} already ended", session.id);
        return Err(AppError::conflict("Study session already ended"));
    }

    let ended_at = Utc::now().max(session.started_at);
    let updated = state
        .sessions
        .update(
            &session.id,
            &UpdateStudySessionDTO {
                ended_at: Some(ended_at),
                duration_secs: Some(duration_between(session.started_at, ended_at)),
                notes: body.notes,
                ..Default::default()
            },
        )
        .await?;

    info!("Study session ended after {:?}s", updated.duration_secs);
    Ok(Json(StudySessionDTO::from(updated)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn update_session(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppPath(session_id): AppPath<i64>,
    AppJson(body): AppJson<UpdateStudySessionRequestDTO>,
) -> Result<Json<StudySessionDTO>, AppError> {
    debug!("Updating study session");
    body.validate()?;
    let session = load_owned_session(&state, session_id, current_user.id).await?;

    if let Some(Some(course_id)) = body.course_id {
        load_owned_course(&state, course_id, current_user.id).await?;
    }
    if body.ended_at.is_some_and(|ended_at| ended_at < session.started_at) {
        return Err(AppError::bad_request("ended_at must not be before started_at"));
    }

    let duration_secs = body
        .ended_at
        .or(session.ended_at)
        .map(|ended_at| duration_between(session.started_at, ended_at));

    let updated = state
        .sessions
        .update(
            &session.id,
            &UpdateStudySessionDTO {
                course_id: body.course_id,
                ended_at: body.ended_at,
                duration_secs,
                notes: body.notes,
            },
        )
        .await?;

    info!("Study session updated");
    Ok(Json(StudySessionDTO::from(updated)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn delete_session(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppPath(session_id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    debug!("Deleting study session");
    let session = load_owned_session(&state, session_id, current_user.id).await?;
    state.sessions.delete(&session.id).await?;

    info!("Study session {} deleted", session.id);
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, current_user, query), fields(user_id = %current_user.id))]
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppQuery(query): AppQuery<StatsQuery>,
) -> Result<Json<StudyStatsDTO>, AppError> {
    debug!("Computing study statistics");
    // 1. Finestra di `days` giorni di calendario che termina oggi (UTC)
    // 2. Caricare le sessioni concluse nella finestra e i titoli dei loro corsi
    // 3. Aggregare in memoria
    let days = query
        .days
        .unwrap_or(DEFAULT_STATS_DAYS)
        .clamp(1, MAX_STATS_DAYS);
    let today = Utc::now().date_naive();
    let first_day = today
        .checked_sub_days(Days::new(days as u64 - 1))
        .unwrap_or(NaiveDate::MIN);
    let since = first_day.and_time(chrono::NaiveTime::MIN).and_utc();

    let sessions = state
        .sessions
        .find_finished_since(current_user.id, since)
        .await?;

    let mut course_ids: Vec<i64> = sessions.iter().filter_map(|s| s.course_id).collect();
    course_ids.sort_unstable();
    course_ids.dedup();
    let titles: HashMap<i64, String> = state
        .courses
        .find_titles(&course_ids)
        .await?
        .into_iter()
        .collect();

    let stats = summarize(&sessions, &titles, today, days);
    info!(
        "Stats over {} days: {} sessions, {}s",
        days, stats.total_sessions, stats.total_duration_secs
    );
    Ok(Json(stats))
}

/// Aggrega le sessioni concluse in totali, gruppi per corso e per giorno
/// e la serie di giorni attuale
pub fn summarize(
    sessions: &[StudySession],
    titles: &HashMap<i64, String>,
    today: NaiveDate,
    days: i64,
) -> StudyStatsDTO {
    let mut by_course: HashMap<Option<i64>, (i64, i64)> = HashMap::new();
    let mut daily: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut total_duration_secs = 0;

    for session in sessions {
        let duration = session.duration_secs.unwrap_or(0);
        total_duration_secs += duration;

        let entry = by_course.entry(session.course_id).or_default();
        entry.0 += 1;
        entry.1 += duration;

        *daily.entry(session.started_at.date_naive()).or_default() += duration;
    }

    let total_sessions = sessions.len() as i64;
    let average_duration_secs = if total_sessions == 0 {
        0
    } else {
        total_duration_secs / total_sessions
    };

    let mut by_course: Vec<CourseStudyTotalDTO> = by_course
        .into_iter()
        .map(|(course_id, (count, secs))| CourseStudyTotalDTO {
            course_id,
            course_title: course_id.and_then(|id| titles.get(&id).cloned()),
            sessions: count,
            total_duration_secs: secs,
        })
        .collect();
    by_course.sort_by(|a, b| {
        b.total_duration_secs
            .cmp(&a.total_duration_secs)
            .then(a.course_id.cmp(&b.course_id))
    });

    let studied: HashSet<NaiveDate> = daily
        .iter()
        .filter(|(_, secs)| **secs > 0)
        .map(|(date, _)| *date)
        .collect();

    StudyStatsDTO {
        days,
        total_sessions,
        total_duration_secs,
        average_duration_secs,
        current_streak_days: current_streak(&studied, today),
        by_course,
        daily: daily
            .into_iter()
            .map(|(date, total_duration_secs)| DailyStudyTotalDTO {
                date,
                total_duration_secs,
            })
            .collect(),
    }
}

/// Giorni consecutivi di studio fino a oggi, o fino a ieri se oggi è ancora vuoto
fn current_streak(studied: &HashSet<NaiveDate>, today: NaiveDate) -> i64 {
    let mut day = if studied.contains(&today) {
        today
    } else {
        match today.pred_opt() {
            Some(yesterday) => yesterday,
            None => return 0,
        }
    };

    let mut streak = 0;
    while studied.contains(&day) {
        streak += 1;
        match day.pred_opt() {
            Some(previous) => day = previous,
            None => break,
        }
    }
    streak
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn session(course_id: Option<i64>, day: u32, secs: i64) -> StudySession {
        let started_at = at(day, 9);
        StudySession {
            id: 0,
            user_id: 1,
            course_id,
            started_at,
            ended_at: Some(started_at + chrono::Duration::seconds(secs)),
            duration_secs: Some(secs),
            notes: None,
            created_at: started_at,
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 10).unwrap()
    }

    #[test]
    fn test_summarize_empty() {
        let stats = summarize(&[], &HashMap::new(), today(), 30);
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.average_duration_secs, 0);
        assert_eq!(stats.current_streak_days, 0);
        assert!(stats.by_course.is_empty());
        assert!(stats.daily.is_empty());
    }

    #[test]
    fn test_summarize_totals_and_buckets() {
        let sessions = vec![
            session(Some(1), 8, 600),
            session(Some(1), 9, 1200),
            session(None, 9, 300),
            session(Some(2), 10, 3000),
        ];
        let titles = HashMap::from([(1, "Rust".to_string())]);
        let stats = summarize(&sessions, &titles, today(), 7);

        assert_eq!(stats.days, 7);
        assert_eq!(stats.total_sessions, 4);
        assert_eq!(stats.total_duration_secs, 5100);
        assert_eq!(stats.average_duration_secs, 1275);

        assert_eq!(stats.by_course[0].course_id, Some(2));
        assert_eq!(stats.by_course[0].course_title, None);
        assert_eq!(stats.by_course[1].course_title.as_deref(), Some("Rust"));
        assert_eq!(stats.by_course[1].sessions, 2);
        assert_eq!(stats.by_course[2].course_id, None);

        assert_eq!(stats.daily.len(), 3);
        assert_eq!(stats.daily[1].date, NaiveDate::from_ymd_opt(2024, 3, 9).unwrap());
        assert_eq!(stats.daily[1].total_duration_secs, 1500);
        assert_eq!(stats.current_streak_days, 3);
    }

    #[test]
    fn test_streak_counts_from_yesterday_when_today_is_empty() {
        let sessions = vec![session(None, 7, 60), session(None, 8, 60), session(None, 9, 60)];
        let stats = summarize(&sessions, &HashMap::new(), today(), 30);
        assert_eq!(stats.current_streak_days, 3);
    }

    #[test]
    fn test_streak_breaks_on_gap() {
        let sessions = vec![session(None, 5, 60), session(None, 7, 60), session(None, 8, 60)];
        let stats = summarize(&sessions, &HashMap::new(), today(), 30);
        assert_eq!(stats.current_streak_days, 0);

        let sessions = vec![session(None, 5, 60), session(None, 9, 60), session(None, 10, 60)];
        let stats = summarize(&sessions, &HashMap::new(), today(), 30);
        assert_eq!(stats.current_streak_days, 2);
    }

    #[test]
    fn test_zero_length_sessions_do_not_count_for_streak() {
        let sessions = vec![session(None, 10, 0)];
        let stats = summarize(&sessions, &HashMap::new(), today(), 30);
        assert_eq!(stats.total_sessions, 1);
        assert_eq!(stats.current_streak_days, 0);
    }
}
