//! Costruzione dei prompt per gli endpoint di generazione

use crate::dtos::ChatTurnDTO;
use crate::entities::Difficulty;
use std::fmt::Write;

/// Materiale di riferimento passato insieme al prompt
pub struct SourceText<'a> {
    pub title: &'a str,
    pub text: &'a str,
}

pub fn lesson(topic: &str, context: Option<&str>, difficulty: Difficulty) -> String {
    let mut prompt = format!(
        "Write a complete lesson about \"{topic}\" for a {} learner.\n",
        difficulty.as_str()
    );
    if let Some(context) = context {
        let _ = writeln!(prompt, "The lesson is part of: {context}.");
    }
    prompt.push_str(
        "Use Markdown with headings, short explanations, concrete examples and a brief \
         summary at the end. Reply with the lesson only.",
    );
    prompt
}

pub fn quiz(
    topic: &str,
    count: u32,
    difficulty: Difficulty,
    source: Option<&SourceText<'_>>,
) -> String {
    let mut prompt = format!(
        "Create {count} multiple-choice questions about \"{topic}\" at {} level.\n",
        difficulty.as_str()
    );
    push_source(&mut prompt, source);
    prompt.push_str(
        "Reply with JSON only, no commentary, in this exact shape:\n\
         {\"questions\": [{\"question\": \"...\", \"options\": [\"...\", \"...\", \"...\", \"...\"], \
         \"correct_answer\": 0, \"explanation\": \"...\"}]}\n\
         correct_answer is the zero-based index of the right option.",
    );
    prompt
}

pub fn flashcards(topic: &str, count: u32, source: Option<&SourceText<'_>>) -> String {
    let mut prompt = format!("Create {count} study flashcards about \"{topic}\".\n");
    push_source(&mut prompt, source);
    prompt.push_str(
        "Keep each front to one question or term and each back to one or two sentences.\n\
         Reply with JSON only, no commentary, in this exact shape:\n\
         {\"flashcards\": [{\"front\": \"...\", \"back\": \"...\"}]}",
    );
    prompt
}

pub fn course_outline(topic: &str, modules: u32, difficulty: Difficulty) -> String {
    format!(
        "Design a {level} course about \"{topic}\" with {modules} modules of 3 to 5 lessons each.\n\
         Reply with JSON only, no commentary, in this exact shape:\n\
         {{\"title\": \"...\", \"description\": \"...\", \"modules\": [{{\"title\": \"...\", \
         \"description\": \"...\", \"lessons\": [{{\"title\": \"...\", \"duration_minutes\": 15}}]}}]}}",
        level = difficulty.as_str()
    )
}

pub fn chat(message: &str, history: &[ChatTurnDTO]) -> String {
    let mut prompt = String::from(
        "You are a patient study assistant. Answer clearly and concisely, \
         and ask a follow-up question when the student seems stuck.\n\n",
    );
    for turn in history {
        let speaker = if turn.role.eq_ignore_ascii_case("user") {
            "Student"
        } else {
            "Assistant"
        };
        let _ = writeln!(prompt, "{speaker}: {}", turn.content.trim());
    }
    let _ = write!(prompt, "Student: {}\nAssistant:", message.trim());
    prompt
}

fn push_source(prompt: &mut String, source: Option<&SourceText<'_>>) {
    if let Some(source) = source {
        let _ = write!(
            prompt,
            "Base the content on the following material titled \"{}\":\n<<<\n{}\n>>>\n",
            source.title, source.text
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quiz_prompt_mentions_count_and_source() {
        let source = SourceText {
            title: "Cells",
            text: "Mitochondria produce ATP.",
        };
        let prompt = quiz("Biology", 7, Difficulty::Advanced, Some(&source));
        assert!(prompt.contains("Create 7 multiple-choice"));
        assert!(prompt.contains("advanced"));
        assert!(prompt.contains("Mitochondria produce ATP."));
        assert!(prompt.contains("\"questions\""));
    }

    #[test]
    fn test_course_outline_prompt_is_valid_template() {
        let prompt = course_outline("Rust", 4, Difficulty::Beginner);
        assert!(prompt.contains("with 4 modules"));
        assert!(prompt.contains("{\"title\": \"...\""));
    }

    #[test]
    fn test_chat_prompt_replays_history() {
        let history = vec![
            ChatTurnDTO { role: "user".into(), content: "What is a closure?".into() },
            ChatTurnDTO { role: "assistant".into(), content: "A function value.".into() },
        ];
        let prompt = chat("Give an example", &history);
        let student = prompt.find("Student: What is a closure?").unwrap();
        let assistant = prompt.find("Assistant: A function value.").unwrap();
        assert!(student < assistant);
        assert!(prompt.ends_with("Student: Give an example\nAssistant:"));
    }

    #[test]
    fn test_lesson_prompt_without_context() {
        let prompt = lesson("Ownership", None, Difficulty::Intermediate);
        assert!(prompt.contains("\"Ownership\""));
        assert!(!prompt.contains("part of"));
    }
}
