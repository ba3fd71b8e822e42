pub mod claims;
pub mod session_store;

pub use claims::TokenClaims;
pub use session_store::{AuthSession, SessionStore};
