//! AI services - Generazione di lezioni, quiz, flashcard e corsi, chat con il tutor

use super::course::load_owned_course;
use super::material::load_owned_material;
use crate::ai::output::{CourseOutline, FlashcardReply, QuizReply};
use crate::ai::prompts::{self, SourceText};
use crate::ai::extract_json;
use crate::core::{AppError, AppJson, AppState};
use crate::dtos::{
    ChatReplyDTO, ChatRequestDTO, CourseDTO, CreateCourseDTO, FlashcardSetDTO,
    GenerateCourseRequestDTO, GenerateFlashcardsRequestDTO, GenerateLessonRequestDTO,
    GenerateQuizRequestDTO, LessonContentDTO, QuizDTO, UpdateCourseDTO,
};
use crate::entities::{CourseStatus, Difficulty, Material, User};
use crate::repositories::{Create, Update};
use axum::{
    Extension,
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use object_store::path::Path as StoragePath;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

/// Caratteri di testo dei materiali inseriti in un prompt
const MAX_SOURCE_CHARS: usize = 12_000;
const DEFAULT_QUIZ_QUESTIONS: u32 = 5;
const DEFAULT_FLASHCARDS: u32 = 10;
const DEFAULT_COURSE_MODULES: u32 = 5;

/// Argomento e testo di riferimento per i prompt di quiz e flashcard
struct Source {
    topic: String,
    title: String,
    text: Option<String>,
}

impl Source {
    fn as_prompt_source(&self) -> Option<SourceText<'_>> {
        self.text.as_deref().map(|text| SourceText {
            title: &self.title,
            text,
        })
    }
}

/// Ricava argomento e testo dalla richiesta. Il materiale ha la precedenza sul
/// corso, un corso fornisce il testo di tutti i suoi materiali testuali.
async fn resolve_source(
    state: &AppState,
    user_id: i64,
    topic: Option<String>,
    course_id: Option<i64>,
    material_id: Option<i64>,
) -> Result<Source, AppError> {
    let topic = topic.map(|t| t.trim().to_string()).filter(|t| !t.is_empty());

    if let Some(material_id) = material_id {
        let material = load_owned_material(state, material_id, user_id).await?;
        let text = read_materials_text(state, std::slice::from_ref(&material)).await;
        return Ok(Source {
            topic: topic.unwrap_or_else(|| material.title.clone()),
            title: material.title,
            text,
        });
    }

    if let Some(course_id) = course_id {
        let course = load_owned_course(state, course_id, user_id).await?;
        let materials = state
            .materials
            .find_many_by_user(user_id, Some(course.id))
            .await?;
        let text = read_materials_text(state, &materials).await;
        return Ok(Source {
            topic: topic.unwrap_or_else(|| course.title.clone()),
            title: course.title,
            text,
        });
    }

    match topic {
        Some(topic) => Ok(Source {
            title: topic.clone(),
            topic,
            text: None,
        }),
        None => Err(AppError::bad_request(
            "Provide a topic, a course_id or a material_id",
        )),
    }
}

/// Testo dei materiali testuali, al massimo MAX_SOURCE_CHARS in totale.
/// I file non leggibili vengono saltati.
async fn read_materials_text(state: &AppState, materials: &[Material]) -> Option<String> {
    let mut text = String::new();
    for material in materials.iter().filter(|m| m.is_text()) {
        let remaining = MAX_SOURCE_CHARS.saturating_sub(text.chars().count());
        if remaining == 0 {
            break;
        }
        let key = StoragePath::from(material.storage_key.as_str());
        match state.storage.read_text(&key, remaining).await {
            Ok(chunk) => {
                if !text.is_empty() {
                    text.push_str("\n\n");
                }
                text.push_str(&chunk);
            }
            Err(e) => warn!("Skipping material {}: {}", material.id, e),
        }
    }
    let text: String = text.chars().take(MAX_SOURCE_CHARS).collect();
    (!text.trim().is_empty()).then_some(text)
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn generate_lesson(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppJson(body): AppJson<GenerateLessonRequestDTO>,
) -> Result<Json<LessonContentDTO>, AppError> {
    debug!("Generating lesson");
    // 1. Se è indicata una lezione di un corso, questa fornisce argomento e contesto
    // 2. Altrimenti il topic è obbligatorio
    // 3. Il contenuto generato per una lezione viene salvato nella lezione
    body.validate()?;

    let lesson_ref = match (body.course_id, body.module_index, body.lesson_index) {
        (Some(course_id), Some(module_index), Some(lesson_index)) => {
            let course = load_owned_course(&state, course_id, current_user.id).await?;
            let module = course.modules.get(module_index).ok_or_else(|| {
                AppError::not_found("Module not found")
            })?;
            let lesson = module.lessons.get(lesson_index).ok_or_else(|| {
                AppError::not_found("Lesson not found")
            })?;
            let topic = lesson.title.clone();
            let context = format!("the module \"{}\" of the course \"{}\"", module.title, course.title);
            Some((course, module_index, lesson_index, topic, context))
        }
        _ => None,
    };

    let prompt = match &lesson_ref {
        Some((course, _, _, topic, context)) => prompts::lesson(
            topic,
            Some(context.as_str()),
            body.difficulty.unwrap_or(course.difficulty),
        ),
        None => {
            let topic = body
                .topic
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .ok_or_else(|| AppError::bad_request("Provide a topic or a course lesson"))?;
            prompts::lesson(topic, None, body.difficulty.unwrap_or_default())
        }
    };

    let content = state.ai.generate(&prompt).await?.trim().to_string();
    if content.is_empty() {
        warn!("Model returned an empty lesson");
        return Err(AppError::bad_gateway("AI returned an empty lesson"));
    }

    let Some((course, module_index, lesson_index, _, _)) = lesson_ref else {
        info!("Lesson generated ({} chars)", content.len());
        return Ok(Json(LessonContentDTO {
            content,
            course: None,
        }));
    };

    let mut modules = course.modules.0;
    if let Some(lesson) = modules
        .get_mut(module_index)
        .and_then(|m| m.lessons.get_mut(lesson_index))
    {
        lesson.content = Some(content.clone());
    }
    let updated = state
        .courses
        .update(
            &course.id,
            &UpdateCourseDTO {
                modules: Some(modules),
                ..Default::default()
            },
        )
        .await?;

    info!("Lesson content saved into course {}", updated.id);
    Ok(Json(LessonContentDTO {
        content,
        course: Some(CourseDTO::from(updated)),
    }))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn generate_quiz(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppJson(body): AppJson<GenerateQuizRequestDTO>,
) -> Result<Json<QuizDTO>, AppError> {
    debug!("Generating quiz");
    body.validate()?;
    let count = body.num_questions.unwrap_or(DEFAULT_QUIZ_QUESTIONS);
    let source = resolve_source(
        &state,
        current_user.id,
        body.topic,
        body.course_id,
        body.material_id,
    )
    .await?;

    let prompt = prompts::quiz(
        &source.topic,
        count,
        body.difficulty.unwrap_or_default(),
        source.as_prompt_source().as_ref(),
    );
    let reply = state.ai.generate(&prompt).await?;
    let questions = extract_json::<QuizReply>(&reply)?.into_questions(count as usize);

    if questions.is_empty() {
        warn!("No usable question in model reply");
        return Err(AppError::bad_gateway("AI returned no usable questions"));
    }

    info!("Quiz generated with {} questions", questions.len());
    Ok(Json(QuizDTO {
        topic: source.topic,
        questions,
    }))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id))]
pub async fn generate_flashcards(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppJson(body): AppJson<GenerateFlashcardsRequestDTO>,
) -> Result<Json<FlashcardSetDTO>, AppError> {
    debug!("Generating flashcards");
    body.validate()?;
    let count = body.count.unwrap_or(DEFAULT_FLASHCARDS);
    let source = resolve_source(
        &state,
        current_user.id,
        body.topic,
        body.course_id,
        body.material_id,
    )
    .await?;

    let prompt = prompts::flashcards(&source.topic, count, source.as_prompt_source().as_ref());
    let reply = state.ai.generate(&prompt).await?;
    let flashcards = extract_json::<FlashcardReply>(&reply)?.into_cards(count as usize);

    if flashcards.is_empty() {
        warn!("No usable flashcard in model reply");
        return Err(AppError::bad_gateway("AI returned no usable flashcards"));
    }

    info!("Generated {} flashcards", flashcards.len());
    Ok(Json(FlashcardSetDTO {
        topic: source.topic,
        flashcards,
    }))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id, topic = %body.topic))]
pub async fn generate_course(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppJson(body): AppJson<GenerateCourseRequestDTO>,
) -> Result<impl IntoResponse, AppError> {
    debug!("Generating course outline");
    // 1. Chiedere al modello la struttura del corso
    // 2. Tenere al massimo il numero di moduli richiesto, scartare i titoli vuoti
    // 3. Salvare il risultato come nuovo corso attivo senza progressi
    body.validate()?;
    let topic = body.topic.trim();
    if topic.is_empty() {
        return Err(AppError::bad_request("Topic must not be blank"));
    }
    let difficulty: Difficulty = body.difficulty.unwrap_or_default();
    let num_modules = body.num_modules.unwrap_or(DEFAULT_COURSE_MODULES);

    let reply = state
        .ai
        .generate(&prompts::course_outline(topic, num_modules, difficulty))
        .await?;
    let outline = extract_json::<CourseOutline>(&reply)?;

    let title = Some(outline.title.trim().to_string())
        .filter(|t| !t.is_empty())
        .unwrap_or_else(|| topic.to_string());
    let description = outline.description.clone();
    let modules = outline.into_modules(num_modules as usize);
    if modules.is_empty() {
        warn!("Outline without modules");
        return Err(AppError::bad_gateway("AI returned an empty course outline"));
    }

    let course = state
        .courses
        .create(&CreateCourseDTO {
            user_id: current_user.id,
            title,
            description,
            subject: Some(topic.to_string()),
            difficulty,
            status: CourseStatus::Active,
            progress: 0,
            modules,
        })
        .await?;

    info!("Generated course {} with {} modules", course.id, course.modules.len());
    Ok((StatusCode::CREATED, Json(CourseDTO::from(course))))
}

#[instrument(skip(state, current_user, body), fields(user_id = %current_user.id, turns = body.history.len()))]
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Extension(current_user): Extension<User>,
    AppJson(body): AppJson<ChatRequestDTO>,
) -> Result<Json<ChatReplyDTO>, AppError> {
    debug!("Tutor chat");
    body.validate()?;

    let reply = state
        .ai
        .generate(&prompts::chat(&body.message, &body.history))
        .await?
        .trim()
        .to_string();
    if reply.is_empty() {
        return Err(AppError::bad_gateway("AI returned an empty reply"));
    }

    info!("Chat reply of {} chars", reply.len());
    Ok(Json(ChatReplyDTO { reply }))
}
