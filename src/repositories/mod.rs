pub mod session_repository;
pub mod user_repository;

pub use session_repository::{SessionRepository, SqliteSessionRepository};
pub use user_repository::{
    RepositoryError, RepositoryResult, SqliteUserRepository, UserRepository,
};
