//! Formati delle risposte del modello e normalizzazione nei DTO dell'API
//!
//! Le risposte sono accettate sia dentro un oggetto sia come array semplice,
//! con i nomi delle chiavi che i modelli usano più spesso.

use crate::dtos::{FlashcardDTO, QuizQuestionDTO};
use crate::entities::{CourseModule, Lesson};
use serde::Deserialize;
use serde_json::Value;

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum QuizReply {
    Wrapped { questions: Vec<RawQuizQuestion> },
    Bare(Vec<RawQuizQuestion>),
}

#[derive(Deserialize, Debug)]
pub struct RawQuizQuestion {
    #[serde(alias = "q", alias = "prompt")]
    pub question: String,
    #[serde(default, alias = "choices", alias = "answers")]
    pub options: Vec<String>,
    #[serde(default, alias = "correctAnswer", alias = "answer", alias = "correct")]
    pub correct_answer: Value,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl QuizReply {
    /// Domande rimaste dopo la normalizzazione, al massimo `limit`
    pub fn into_questions(self, limit: usize) -> Vec<QuizQuestionDTO> {
        let raw = match self {
            QuizReply::Wrapped { questions } => questions,
            QuizReply::Bare(questions) => questions,
        };
        raw.into_iter()
            .filter_map(RawQuizQuestion::normalize)
            .take(limit)
            .collect()
    }
}

impl RawQuizQuestion {
    /// `None` se la domanda non è utilizzabile: meno di due opzioni o una
    /// risposta che non indica nessuna opzione
    pub fn normalize(self) -> Option<QuizQuestionDTO> {
        let options: Vec<String> = self
            .options
            .into_iter()
            .map(|o| strip_option_label(&o).to_string())
            .filter(|o| !o.is_empty())
            .collect();
        if options.len() < 2 || self.question.trim().is_empty() {
            return None;
        }
        let correct_answer = answer_index(&self.correct_answer, &options)?;
        Some(QuizQuestionDTO {
            question: self.question.trim().to_string(),
            options,
            correct_answer,
            explanation: self.explanation.filter(|e| !e.trim().is_empty()),
        })
    }
}

/// Accetta un indice da zero, il testo dell'opzione o una lettera ("B")
fn answer_index(answer: &Value, options: &[String]) -> Option<usize> {
    let index = match answer {
        Value::Number(n) => n.as_u64().map(|n| n as usize),
        Value::String(s) => {
            let text = strip_option_label(s);
            options
                .iter()
                .position(|o| o.eq_ignore_ascii_case(text))
                .or_else(|| letter_index(s.trim()))
                .or_else(|| s.trim().parse::<usize>().ok())
        }
        _ => None,
    }?;
    (index < options.len()).then_some(index)
}

fn letter_index(s: &str) -> Option<usize> {
    let mut chars = s.trim_end_matches([')', '.']).chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphabetic() => {
            Some((c.to_ascii_uppercase() as u8 - b'A') as usize)
        }
        _ => None,
    }
}

/// "A) Paris" / "b. Paris" -> "Paris"
fn strip_option_label(option: &str) -> &str {
    let trimmed = option.trim();
    let bytes = trimmed.as_bytes();
    if bytes.len() > 2
        && bytes[0].is_ascii_alphabetic()
        && matches!(bytes[1], b')' | b'.' | b':')
        && bytes[2] == b' '
    {
        trimmed[3..].trim()
    } else {
        trimmed
    }
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum FlashcardReply {
    Wrapped {
        #[serde(alias = "cards")]
        flashcards: Vec<RawFlashcard>,
    },
    Bare(Vec<RawFlashcard>),
}

#[derive(Deserialize, Debug)]
pub struct RawFlashcard {
    #[serde(alias = "question", alias = "term")]
    pub front: String,
    #[serde(alias = "answer", alias = "definition")]
    pub back: String,
}

impl FlashcardReply {
    pub fn into_cards(self, limit: usize) -> Vec<FlashcardDTO> {
        let raw = match self {
            FlashcardReply::Wrapped { flashcards } => flashcards,
            FlashcardReply::Bare(cards) => cards,
        };
        raw.into_iter()
            .filter(|c| !c.front.trim().is_empty() && !c.back.trim().is_empty())
            .map(|c| FlashcardDTO {
                front: c.front.trim().to_string(),
                back: c.back.trim().to_string(),
            })
            .take(limit)
            .collect()
    }
}

#[derive(Deserialize, Debug)]
pub struct CourseOutline {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub modules: Vec<OutlineModule>,
}

#[derive(Deserialize, Debug)]
pub struct OutlineModule {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lessons: Vec<OutlineLesson>,
}

#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum OutlineLesson {
    Titled {
        title: String,
        #[serde(default, alias = "durationMinutes", alias = "duration")]
        duration_minutes: Option<u32>,
    },
    Plain(String),
}

impl CourseOutline {
    /// Moduli pronti da salvare, le lezioni partono non completate e senza contenuto
    pub fn into_modules(self, max_modules: usize) -> Vec<CourseModule> {
        self.modules
            .into_iter()
            .filter(|m| !m.title.trim().is_empty())
            .take(max_modules)
            .map(|m| CourseModule {
                title: m.title.trim().to_string(),
                description: m.description,
                lessons: m
                    .lessons
                    .into_iter()
                    .map(|l| match l {
                        OutlineLesson::Titled {
                            title,
                            duration_minutes,
                        } => (title, duration_minutes),
                        OutlineLesson::Plain(title) => (title, None),
                    })
                    .filter(|(title, _)| !title.trim().is_empty())
                    .map(|(title, duration_minutes)| Lesson {
                        title: title.trim().to_string(),
                        content: None,
                        duration_minutes,
                        completed: false,
                    })
                    .collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::extract_json;
    use serde_json::json;

    fn raw(options: &[&str], answer: Value) -> RawQuizQuestion {
        RawQuizQuestion {
            question: "Capital of France?".to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
            correct_answer: answer,
            explanation: None,
        }
    }

    #[test]
    fn test_answer_forms() {
        let opts = ["Berlin", "Paris", "Rome"];
        assert_eq!(raw(&opts, json!(1)).normalize().unwrap().correct_answer, 1);
        assert_eq!(raw(&opts, json!("B")).normalize().unwrap().correct_answer, 1);
        assert_eq!(raw(&opts, json!("paris")).normalize().unwrap().correct_answer, 1);
        assert_eq!(raw(&opts, json!("2")).normalize().unwrap().correct_answer, 2);
        assert_eq!(raw(&["3", "4"], json!("4")).normalize().unwrap().correct_answer, 1);
    }

    #[test]
    fn test_invalid_questions_are_dropped() {
        assert!(raw(&["only one"], json!(0)).normalize().is_none());
        assert!(raw(&["a", "b"], json!(5)).normalize().is_none());
        assert!(raw(&["a", "b"], json!("Z")).normalize().is_none());
        assert!(raw(&["a", "b"], Value::Null).normalize().is_none());
    }

    #[test]
    fn test_option_labels_are_stripped() {
        let q = raw(&["A) Berlin", "B) Paris"], json!("B) Paris")).normalize().unwrap();
        assert_eq!(q.options, vec!["Berlin", "Paris"]);
        assert_eq!(q.correct_answer, 1);
    }

    #[test]
    fn test_quiz_reply_accepts_bare_array_and_aliases() {
        let reply = r#"[{"question": "2+2?", "choices": ["3", "4"], "correctAnswer": 1, "explanation": "math"}]"#;
        let quiz: QuizReply = extract_json(reply).unwrap();
        let questions = quiz.into_questions(10);
        assert_eq!(questions.len(), 1);
        assert_eq!(questions[0].options, vec!["3", "4"]);
        assert_eq!(questions[0].explanation.as_deref(), Some("math"));
    }

    #[test]
    fn test_flashcards_aliases_and_limit() {
        let reply = r#"{"cards": [
            {"term": "ATP", "definition": "energy currency"},
            {"question": "DNA?", "answer": "genetic material"},
            {"front": " ", "back": "blank front is dropped"}
        ]}"#;
        let cards: FlashcardReply = extract_json(reply).unwrap();
        let cards = cards.into_cards(1);
        assert_eq!(cards, vec![FlashcardDTO { front: "ATP".into(), back: "energy currency".into() }]);
    }

    #[test]
    fn test_outline_into_modules() {
        let reply = r#"{"title": "Rust", "modules": [
            {"title": "Basics", "lessons": ["Ownership", {"title": "Borrowing", "durationMinutes": 20}]},
            {"title": "Async", "lessons": []}
        ]}"#;
        let outline: CourseOutline = extract_json(reply).unwrap();
        assert_eq!(outline.title, "Rust");
        let modules = outline.into_modules(1);
        assert_eq!(modules.len(), 1);
        assert_eq!(modules[0].lessons.len(), 2);
        assert_eq!(modules[0].lessons[1].duration_minutes, Some(20));
        assert!(!modules[0].lessons[0].completed);
    }
}
