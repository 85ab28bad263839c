//! AI DTOs - Body di richiesta e risposta per le routes /api/ai

use super::course::CourseDTO;
use crate::entities::Difficulty;
use serde::{Deserialize, Serialize};
use validator::Validate;

#[derive(Deserialize, Debug, Validate)]
pub struct GenerateLessonRequestDTO {
    #[validate(length(min = 1, max = 300, message = "Topic must be between 1 and 300 characters"))]
    pub topic: Option<String>,
    pub course_id: Option<i64>,
    pub module_index: Option<usize>,
    pub lesson_index: Option<usize>,
    pub difficulty: Option<Difficulty>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct LessonContentDTO {
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<CourseDTO>,
}

#[derive(Deserialize, Debug, Validate)]
pub struct GenerateQuizRequestDTO {
    #[validate(length(min = 1, max = 300, message = "Topic must be between 1 and 300 characters"))]
    pub topic: Option<String>,
    pub course_id: Option<i64>,
    pub material_id: Option<i64>,

    #[validate(range(min = 1, max = 20, message = "num_questions must be between 1 and 20"))]
    pub num_questions: Option<u32>,

    pub difficulty: Option<Difficulty>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct QuizQuestionDTO {
    pub question: String,
    pub options: Vec<String>,
    pub correct_answer: usize,
    pub explanation: Option<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct QuizDTO {
    pub topic: String,
    pub questions: Vec<QuizQuestionDTO>,
}

#[derive(Deserialize, Debug, Validate)]
pub struct GenerateFlashcardsRequestDTO {
    #[validate(length(min = 1, max = 300, message = "Topic must be between 1 and 300 characters"))]
    pub topic: Option<String>,
    pub course_id: Option<i64>,
    pub material_id: Option<i64>,

    #[validate(range(min = 1, max = 50, message = "count must be between 1 and 50"))]
    pub count: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct FlashcardDTO {
    pub front: String,
    pub back: String,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct FlashcardSetDTO {
    pub topic: String,
    pub flashcards: Vec<FlashcardDTO>,
}

#[derive(Deserialize, Debug, Validate)]
pub struct GenerateCourseRequestDTO {
    #[validate(length(min = 1, max = 300, message = "Topic must be between 1 and 300 characters"))]
    pub topic: String,
    pub difficulty: Option<Difficulty>,

    #[validate(range(min = 1, max = 12, message = "num_modules must be between 1 and 12"))]
    pub num_modules: Option<u32>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct ChatTurnDTO {
    pub role: String,
    pub content: String,
}

#[derive(Deserialize, Debug, Validate)]
pub struct ChatRequestDTO {
    #[validate(length(min = 1, max = 4000, message = "Message must be between 1 and 4000 characters"))]
    pub message: String,

    #[serde(default)]
    #[validate(length(max = 40, message = "History is limited to 40 turns"))]
    pub history: Vec<ChatTurnDTO>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ChatReplyDTO {
    pub reply: String,
}
