pub mod auth;
pub mod error;
pub mod profile;

pub use auth::{JwtClaims, User};
pub use error::AppError;
pub use profile::{NotificationPreferences, UserProfile};
