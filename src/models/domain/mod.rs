pub mod attempt;
pub mod question;
pub mod user;
pub use attempt::{AttemptRecord, SubmitResult};
pub use question::{Question, QuestionType, QuestionTypeInfo};
pub use user::{User, UserRole};
