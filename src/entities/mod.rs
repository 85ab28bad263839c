//! Entities module - Entità di dominio
//!
//! Ogni entità corrisponde a una tabella. I documenti incorporati (moduli dei
//! corsi, preferenze utente) sono salvati come colonne JSON.

pub mod course;
pub mod enums;
pub mod material;
pub mod study_session;
pub mod user;

pub use course::{Course, CourseModule, Lesson, compute_progress, status_after_progress};
pub use enums::{CourseStatus, Difficulty};
pub use material::Material;
pub use study_session::{StudySession, duration_between};
pub use user::{User, UserPreferences};
