//! DTOs module - Data Transfer Objects
//!
//! I DTO separano la rappresentazione dell'API dalle entità salvate.

pub mod ai;
pub mod course;
pub mod material;
pub mod query;
pub mod study_session;
pub mod user;

pub use ai::{
    ChatReplyDTO, ChatRequestDTO, ChatTurnDTO, FlashcardDTO, FlashcardSetDTO,
    GenerateCourseRequestDTO, GenerateFlashcardsRequestDTO, GenerateLessonRequestDTO,
    GenerateQuizRequestDTO, LessonContentDTO, QuizDTO, QuizQuestionDTO,
};
pub use course::{
    CourseDTO, CreateCourseDTO, CreateCourseRequestDTO, LessonProgressDTO, UpdateCourseDTO,
    UpdateCourseRequestDTO,
};
pub use material::{CreateMaterialDTO, MaterialDTO, MaterialUrlDTO, UpdateMaterialDTO};
pub use query::{CourseQuery, MaterialQuery, StatsQuery, StudySessionQuery};
pub use study_session::{
    CourseStudyTotalDTO, CreateStudySessionDTO, CreateStudySessionRequestDTO, DailyStudyTotalDTO,
    EndStudySessionDTO, StudySessionDTO, StudyStatsDTO, UpdateStudySessionDTO,
    UpdateStudySessionRequestDTO,
};
pub use user::{
    AuthResponseDTO, ChangePasswordDTO, CreateUserDTO, LoginDTO, RegisterDTO, UpdateProfileDTO,
    UpdateUserDTO, UserDTO,
};
