//! Repositories module - Un repository per ogni entità
//!
//! Ogni repository possiede un handle al pool condiviso ed espone i trait CRUD
//! generici più le ricerche specifiche richieste dai services.
//!
//! Le query sono costruite a runtime (`query_as` + `FromRow`, o `QueryBuilder`
//! per i filtri opzionali) così il crate compila senza un database attivo.

pub mod course;
pub mod material;
pub mod study_session;
pub mod traits;
pub mod user;

pub use traits::{Create, Delete, Read, Update};

pub use course::CourseRepository;
pub use material::MaterialRepository;
pub use study_session::StudySessionRepository;
pub use user::UserRepository;

/// Alias del tipo di pool, il backend del database è definito solo qui
pub type PoolType = sqlx::SqlitePool;
