pub mod session;
pub mod user;

pub use session::UserSession;
pub use user::{AuthProvider, NewUser, User, UserRole};
