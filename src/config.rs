use crate::utils::error::AppError;
use std::env;

const DEFAULT_SECRET_KEY: &str = "your-secret-key-keep-it-secret";

/// Runtime configuration, read once from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    /// Overrides the database named in the URI.
    pub mongodb_database: Option<String>,
    pub secret_key: String,
    pub token_ttl_minutes: i64,
    pub frontend_url: String,
    /// Empty means any origin.
    pub cors_allowed_origins: Vec<String>,
    pub dev_mode: bool,
    pub admin_email: String,
    pub admin_password: String,
    pub google: GoogleSettings,
    pub email: EmailSettings,
    pub gemini: GeminiSettings,
}

#[derive(Debug, Clone)]
pub struct GoogleSettings {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub redirect_uri: String,
}

#[derive(Debug, Clone)]
pub struct EmailSettings {
    pub smtp_server: String,
    pub smtp_port: u16,
    pub username: String,
    pub password: String,
    pub from_address: String,
    pub app_name: String,
}

impl EmailSettings {
    pub fn is_configured(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct GeminiSettings {
    pub api_key: Option<String>,
    pub model: String,
    pub api_base: String,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn optional_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &str, default: T) -> Result<T, AppError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| AppError::Config(format!("{} has an invalid value: {}", name, raw))),
        Err(_) => Ok(default),
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, AppError> {
        let dev_mode = matches!(
            var_or("APP_ENV", "production").to_lowercase().as_str(),
            "development" | "dev"
        );

        let secret_key = var_or("SECRET_KEY", DEFAULT_SECRET_KEY);
        if secret_key == DEFAULT_SECRET_KEY && !dev_mode {
            log::warn!("⚠️  SECRET_KEY not set, using the built-in default. Set it in production!");
        }

        let cors_allowed_origins = var_or("CORS_ALLOWED_ORIGINS", "")
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect();

        Ok(Settings {
            host: var_or("HOST", "0.0.0.0"),
            port: parse_var("PORT", 8000)?,
            mongodb_uri: var_or("MONGODB_URI", "mongodb://localhost:27017/CAR"),
            mongodb_database: optional_var("MONGODB_DATABASE"),
            secret_key,
            token_ttl_minutes: parse_var("ACCESS_TOKEN_EXPIRE_MINUTES", 30)?,
            frontend_url: var_or("FRONTEND_URL", "http://localhost:8080")
                .trim_end_matches('/')
                .to_string(),
            cors_allowed_origins,
            dev_mode,
            admin_email: var_or("ADMIN_EMAIL", "admin@example.com"),
            admin_password: var_or("ADMIN_PASSWORD", "admin123"),
            google: GoogleSettings {
                client_id: optional_var("GOOGLE_CLIENT_ID"),
                client_secret: optional_var("GOOGLE_CLIENT_SECRET"),
                redirect_uri: var_or(
                    "GOOGLE_REDIRECT_URI",
                    "http://localhost:8080/api/auth/google/callback",
                ),
            },
            email: EmailSettings {
                smtp_server: var_or("SMTP_SERVER", "smtp.gmail.com"),
                smtp_port: parse_var("SMTP_PORT", 587)?,
                username: var_or("EMAIL_USERNAME", ""),
                password: var_or("EMAIL_PASSWORD", ""),
                from_address: var_or("EMAIL_FROM", "noreply@carcarepro.com"),
                app_name: "CarCare Pro".to_string(),
            },
            gemini: GeminiSettings {
                api_key: optional_var("GEMINI_API_KEY"),
                model: var_or("GEMINI_MODEL", "gemini-1.5-pro"),
                api_base: var_or(
                    "GEMINI_API_BASE",
                    "https://generativelanguage.googleapis.com/v1beta",
                )
                .trim_end_matches('/')
                .to_string(),
            },
        })
    }

    pub fn mode(&self) -> &'static str {
        if self.dev_mode {
            "development"
        } else {
            "production"
        }
    }

    /// Fixed settings for tests; never touches the process environment.
    #[cfg(test)]
    pub fn for_tests() -> Self {
        Settings {
            host: "127.0.0.1".to_string(),
            port: 0,
            mongodb_uri: "mongodb://localhost:27017/CAR_TEST".to_string(),
            mongodb_database: None,
            secret_key: "test-secret".to_string(),
            token_ttl_minutes: 30,
            frontend_url: "http://localhost:8080".to_string(),
            cors_allowed_origins: vec![],
            dev_mode: true,
            admin_email: "admin@example.com".to_string(),
            admin_password: "admin123".to_string(),
            google: GoogleSettings {
                client_id: Some("client-id.apps.googleusercontent.com".to_string()),
                client_secret: Some("client-secret".to_string()),
                redirect_uri: "http://localhost:8080/api/auth/google/callback".to_string(),
            },
            email: EmailSettings {
                smtp_server: "smtp.example.com".to_string(),
                smtp_port: 587,
                username: String::new(),
                password: String::new(),
                from_address: "noreply@carcarepro.com".to_string(),
                app_name: "CarCare Pro".to_string(),
            },
            gemini: GeminiSettings {
                api_key: None,
                model: "gemini-1.5-pro".to_string(),
                api_base: "http://127.0.0.1:9".to_string(),
            },
        }
    }
}
