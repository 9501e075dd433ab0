pub mod auth;

pub use auth::{authenticate, AuthUser, ADMIN_ONLY, STAFF};
