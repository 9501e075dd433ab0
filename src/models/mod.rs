pub mod event;
pub mod user;

pub use event::{Event, EventStatus};
pub use user::{Role, User, UserSummary};
