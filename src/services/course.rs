//! Course services - CRUD dei corsi e avanzamento delle lezioni

use crate::core::{AppError, AppJson, AppPath, AppQuery, AppState};
use crate::dtos::{
    CourseDTO, CourseQuery, CreateCourseDTO, CreateCourseRequestDTO, LessonProgressDTO,
    UpdateCourseDTO, UpdateCourseRequestDTO,
};
use crate::entities::{Course, CourseStatus, User, compute_progress, status_after_progress};
use crate::repositories::{Create, Delete, Update};
use crate::storage::FileStorage;
use axum::{
    Extension,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Corso di proprietà di `user_id`, altrimenti NOT_FOUND (anche per i corsi di altri)
pub(crate) async fn load_owned_course(
    state: &AppState,
    course_id: i64,
    user_id: i64,
) -> Result<Course, AppError> {
    state
        .courses
        .find_owned(course_id, user_id)
        .await?
        .ok_or_else(|| {
            warn!("Course {} not found for user {}", course_id, user_id);
            AppError::not_found("Course not found")
        })
}

#[instrument(skip(state, current_user, query), fields(user_id = %current_user.id))]
pub async fn list_courses(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppQuery(query): AppQuery<CourseQuery>,
) -> Result<Json<Vec<CourseDTO>>, AppError> {
    debug!("Listing courses");
    let courses = state
        .courses
        .find_many_by_user(current_user.id, &query)
        .await?;

    info!("Retrieved {} courses", courses.len());
    Ok(Json(courses.into_iter().map(CourseDTO::from).collect()))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn create_course(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppJson(body): AppJson<CreateCourseRequestDTO>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Creating course");
    // 1. Validare il body
    // 2. Calcolare il progresso dai moduli inviati, un corso con tutte le
    //    lezioni completate parte come completed
    // 3. Salvarlo come proprietà dell'utente corrente
    body.validate()?;

    let progress = compute_progress(&body.modules);
    let status = status_after_progress(CourseStatus::Active, &body.modules);

    let course = state
        .courses
        .create(&CreateCourseDTO {
            user_id: current_user.id,
            title: body.title.trim().to_string(),
            description: body.description,
            subject: body.subject,
            difficulty: body.difficulty.unwrap_or_default(),
            status,
            progress,
            modules: body.modules,
        })
        .await?;

    info!("Course {} created", course.id);
    Ok((StatusCode::CREATED, Json(CourseDTO::from(course))))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn get_course(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppPath(course_id): AppPath<i64>,
) -> Result<Json<CourseDTO>, AppError> {
    debug!("Fetching course");
    let course = load_owned_course(&state, course_id, current_user.id).await?;
    Ok(Json(CourseDTO::from(course)))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn update_course(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppPath(course_id): AppPath<i64>,
    AppJson(body): AppJson<UpdateCourseRequestDTO>,
) -> Result<Json<CourseDTO>, AppError> {
    debug!("Updating course");
    // 1. Validare e controllare la proprietà
    // 2. Nuovi moduli significano nuovo progresso, lo stato lo segue a meno che
    //    il body non ne imposti uno esplicitamente
    // 3. Scrivere solo i campi forniti
    body.validate()?;
    let course = load_owned_course(&state, course_id, current_user.id).await?;

    let (progress, status) = match &body.modules {
        Some(modules) => {
            let progress = compute_progress(modules);
            let status = body
                .status
                .unwrap_or_else(|| status_after_progress(course.status, modules));
            (Some(progress), Some(status))
        }
        None => (None, body.status),
    };

    let updated = state
        .courses
        .update(
            &course.id,
            &UpdateCourseDTO {
                title: body.title.map(|t| t.trim().to_string()),
                description: body.description,
                subject: body.subject,
                difficulty: body.difficulty,
                status,
                progress,
                modules: body.modules,
            },
        )
        .await?;

    info!("Course updated");
    Ok(Json(CourseDTO::from(updated)))
}

#[instrument(skip(state, current_user), fields(user_id = %current_user.id))]
pub async fn delete_course(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppPath(course_id): AppPath<i64>,
) -> Result<StatusCode, AppError> {
    debug!("Deleting course");
    // 1. Controllare la proprietà
    // 2. Rimuovere i file del corso (best effort)
    // 3. Eliminare il corso, i materiali seguono per cascade e le sessioni vengono scollegate
    let course = load_owned_course(&state, course_id, current_user.id).await?;

    state
        .storage
        .purge_prefix(&FileStorage::course_prefix(current_user.id, course.id))
        .await;
    state.courses.delete(&course.id).await?;

    info!("Course {} deleted", course.id);
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id, completed = body.completed))]
pub async fn set_lesson_completion(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppPath((course_id, module_index, lesson_index)): AppPath<(i64, usize, usize)>,
    AppJson(body): AppJson<LessonProgressDTO>,
) -> Result<Json<CourseDTO>, AppError> {
    debug!("Setting lesson completion");
    // 1. Controllare la proprietà e trovare la lezione, NOT_FOUND per un indice errato
    // 2. Aggiornare il flag e ricalcolare il progresso
    // 3. Spostare lo stato tra active e completed quando serve
    let course = load_owned_course(&state, course_id, current_user.id).await?;
    let current_status = course.status;
    let mut modules = course.modules.0;

    let lesson = modules
        .get_mut(module_index)
        .and_then(|m| m.lessons.get_mut(lesson_index))
        .ok_or_else(|| {
            warn!("Lesson {}/{} does not exist", module_index, lesson_index);
            AppError::not_found("Lesson not found")
        })?;
    lesson.completed = body.completed;

    let progress = compute_progress(&modules);
    let status = status_after_progress(current_status, &modules);

    let updated = state
        .courses
        .update(
            &course_id,
            &UpdateCourseDTO {
                status: Some(status),
                progress: Some(progress),
                modules: Some(modules),
                ..Default::default()
            },
        )
        .await?;

    info!("Course progress is now {}%", progress);
    Ok(Json(CourseDTO::from(updated)))
}
