pub mod auth_service;
pub mod email_service;
pub mod gemini_service;
pub mod google_service;
pub mod maintenance_service;
pub mod tire_service;
pub mod user_service;

pub use email_service::EmailService;
pub use gemini_service::{ChatProvider, GeminiClient};
