//! Course entity - Corso con la lista incorporata di moduli e lezioni

use super::enums::{CourseStatus, Difficulty};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, types::Json};

#[derive(Serialize, Deserialize, Debug, Clone, FromRow)]
pub struct Course {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub description: Option<String>,
    pub subject: Option<String>,
    pub difficulty: Difficulty,
    pub status: CourseStatus,
    pub progress: i64,
    pub modules: Json<Vec<CourseModule>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct CourseModule {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Lesson {
    pub title: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub completed: bool,
}

/// Lezioni `(completate, totali)` su tutti i moduli
pub fn lesson_counts(modules: &[CourseModule]) -> (u32, u32) {
    modules
        .iter()
        .flat_map(|m| m.lessons.iter())
        .fold((0u32, 0u32), |(done, total), lesson| {
            (done + u32::from(lesson.completed), total + 1)
        })
}

/// Percentuale arrotondata di lezioni completate. Un corso senza lezioni è a 0.
pub fn compute_progress(modules: &[CourseModule]) -> i64 {
    let (done, total) = lesson_counts(modules);
    if total == 0 {
        return 0;
    }
    ((f64::from(done) * 100.0) / f64::from(total)).round() as i64
}

/// Vero solo se c'è almeno una lezione e nessuna è ancora aperta.
/// Il progresso arrotondato può valere 100 con una lezione ancora aperta.
pub fn all_lessons_completed(modules: &[CourseModule]) -> bool {
    let (done, total) = lesson_counts(modules);
    total > 0 && done == total
}

/// Stato che deve assumere un corso dopo la modifica dei suoi moduli.
/// I corsi archiviati non cambiano mai stato automaticamente.
pub fn status_after_progress(current: CourseStatus, modules: &[CourseModule]) -> CourseStatus {
    let finished = all_lessons_completed(modules);
    match current {
        CourseStatus::Active if finished => CourseStatus::Completed,
        CourseStatus::Completed if !finished => CourseStatus::Active,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(completed: bool) -> Lesson {
        Lesson {
            title: "l".to_string(),
            content: None,
            duration_minutes: None,
            completed,
        }
    }

    fn module(lessons: Vec<Lesson>) -> CourseModule {
        CourseModule {
            title: "m".to_string(),
            description: None,
            lessons,
        }
    }

    #[test]
    fn test_progress_empty_course_is_zero() {
        assert_eq!(compute_progress(&[]), 0);
        assert_eq!(compute_progress(&[module(vec![])]), 0);
    }

    #[test]
    fn test_progress_counts_across_modules() {
        let modules = vec![
            module(vec![lesson(true), lesson(false)]),
            module(vec![lesson(true)]),
        ];
        // 2 of 3
        assert_eq!(compute_progress(&modules), 67);
    }

    #[test]
    fn test_progress_all_done() {
        let modules = vec![module(vec![lesson(true), lesson(true)])];
        assert_eq!(compute_progress(&modules), 100);
    }

    #[test]
    fn test_status_transitions() {
        let done = vec![module(vec![lesson(true), lesson(true)])];
        let half = vec![module(vec![lesson(true), lesson(false)])];

        assert_eq!(
            status_after_progress(CourseStatus::Active, &done),
            CourseStatus::Completed
        );
        assert_eq!(
            status_after_progress(CourseStatus::Completed, &half),
            CourseStatus::Active
        );
        assert_eq!(
            status_after_progress(CourseStatus::Archived, &done),
            CourseStatus::Archived
        );
        assert_eq!(
            status_after_progress(CourseStatus::Active, &[module(vec![])]),
            CourseStatus::Active
        );
    }

    #[test]
    fn test_one_open_lesson_out_of_200_keeps_course_active() {
        let mut lessons: Vec<Lesson> = (0..200).map(|_| lesson(true)).collect();
        lessons[137].completed = false;
        let modules = vec![module(lessons)];

        // 199/200 rounds up to 100
        assert_eq!(compute_progress(&modules), 100);
        assert!(!all_lessons_completed(&modules));
        assert_eq!(
            status_after_progress(CourseStatus::Active, &modules),
            CourseStatus::Active
        );
        assert_eq!(
            status_after_progress(CourseStatus::Completed, &modules),
            CourseStatus::Active
        );
    }

    #[test]
    fn test_lesson_counts() {
        let modules = vec![
            module(vec![lesson(true), lesson(false)]),
            module(vec![]),
            module(vec![lesson(true)]),
        ];
        assert_eq!(lesson_counts(&modules), (2, 3));
    }
}
