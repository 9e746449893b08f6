pub mod manager;
pub mod store;

pub use manager::{SessionConfig, SessionError, SessionManager};
pub use store::{SessionId, SessionRecord, SessionStore};
