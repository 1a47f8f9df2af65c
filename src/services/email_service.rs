//! Outgoing account email: verification codes and password reset links.
//!
//! Delivery problems never fail the request that triggered them. Callers get
//! `Ok(false)` and the log carries the code or link instead.

use crate::config::{EmailSettings, Settings};
use crate::utils::error::{AppError, AppResult};
use lettre::{
    message::{header::ContentType, Mailbox, MultiPart, SinglePart},
    transport::smtp::authentication::Credentials,
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use serde::Serialize;
use std::time::Duration;

const SMTP_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct EmailService {
    config: EmailSettings,
    dev_mode: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SmtpStatus {
    Success,
    NotConfigured,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SmtpErrorType {
    BadCredentials,
    Authentication,
    Timeout,
    Unknown,
}

impl SmtpErrorType {
    pub fn classify(message: &str) -> Self {
        if is_gmail_bad_credentials(message) {
            SmtpErrorType::BadCredentials
        } else if message.to_lowercase().contains("authentication") {
            SmtpErrorType::Authentication
        } else if message.contains("timed out") || message.contains("timeout") {
            SmtpErrorType::Timeout
        } else {
            SmtpErrorType::Unknown
        }
    }

    pub fn help(self) -> Option<&'static str> {
        match self {
            SmtpErrorType::BadCredentials => Some(
                "You need to use an App Password for Gmail. Enable 2-Step Verification and generate an App Password.",
            ),
            SmtpErrorType::Authentication => {
                Some("Authentication failed. Check your email and password.")
            }
            SmtpErrorType::Timeout => {
                Some("Connection timed out. Check your SMTP server and port settings.")
            }
            SmtpErrorType::Unknown => None,
        }
    }
}

/// Result of `GET /api/auth/admin/test-email`.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SmtpReport {
    pub configured: bool,
    pub status: SmtpStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_type: Option<SmtpErrorType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[schema(value_type = Object)]
    pub details: serde_json::Value,
}

fn is_gmail_bad_credentials(message: &str) -> bool {
    message.contains("535") && message.contains("5.7.8") && message.contains("BadCredentials")
}

fn log_delivery_hint(message: &str) {
    if is_gmail_bad_credentials(message) {
        log::error!("🔐 Gmail rejected the credentials. Use an App Password:");
        log::error!("   1. Enable 2-Step Verification on the Google account");
        log::error!("   2. Create one at https://myaccount.google.com/apppasswords");
        log::error!("   3. Put it in EMAIL_PASSWORD");
    } else if message.to_lowercase().contains("authentication") {
        log::error!("🔐 SMTP authentication failed. Check EMAIL_USERNAME / EMAIL_PASSWORD.");
    }
}

impl EmailService {
    pub fn new(settings: &Settings) -> Self {
        let service = Self {
            config: settings.email.clone(),
            dev_mode: settings.dev_mode,
        };

        if !service.is_configured() {
            log::warn!("⚠️  Email credentials not configured. Codes and reset links will only be logged.");
            log::warn!("   Set EMAIL_USERNAME and EMAIL_PASSWORD to enable delivery.");
        }

        service
    }

    pub fn is_configured(&self) -> bool {
        self.config.is_configured()
    }

    fn transport(&self) -> AppResult<AsyncSmtpTransport<Tokio1Executor>> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&self.config.smtp_server)
            .map_err(|e| AppError::Email(format!("Invalid SMTP relay: {}", e)))?
            .port(self.config.smtp_port)
            .credentials(Credentials::new(
                self.config.username.clone(),
                self.config.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();

        Ok(transport)
    }

    fn build_message(&self, to: &str, subject: &str, html: String, text: String) -> AppResult<Message> {
        let from: Mailbox = format!("{} <{}>", self.config.app_name, self.config.from_address)
            .parse()
            .map_err(|e| AppError::Email(format!("Invalid sender address: {}", e)))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| AppError::Email(format!("Invalid recipient address: {}", e)))?;

        Message::builder()
            .from(from)
            .to(to)
            .subject(subject)
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(html),
                    ),
            )
            .map_err(|e| AppError::Email(e.to_string()))
    }

    async fn deliver(&self, message: Message) -> AppResult<()> {
        self.transport()?
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| AppError::Email(e.to_string()))
    }

    pub async fn send_verification_email(&self, to: &str, code: &str) -> AppResult<bool> {
        if !self.is_configured() {
            log::info!("📧 Verification code for {}: {}", to, code);
            return Ok(false);
        }

        let subject = format!("{} - Verify Your Email", self.config.app_name);
        let message = self.build_message(
            to,
            &subject,
            render_verification_html(&self.config.app_name, code),
            render_verification_text(&self.config.app_name, code),
        )?;

        match self.deliver(message).await {
            Ok(()) => {
                log::info!("✅ Verification email sent to {}", to);
                Ok(true)
            }
            Err(e) => {
                let reason = e.to_string();
                log::error!("❌ Failed to send verification email to {}: {}", to, reason);
                log_delivery_hint(&reason);
                if self.dev_mode {
                    log::info!("🛠️  DEVELOPMENT MODE: verification code for {}: {}", to, code);
                }
                Ok(false)
            }
        }
    }

    pub async fn send_password_reset_email(&self, to: &str, link: &str) -> AppResult<bool> {
        if !self.is_configured() {
            log::info!("📧 Password reset link for {}: {}", to, link);
            return Ok(false);
        }

        let subject = format!("{} - Reset Your Password", self.config.app_name);
        let message = self.build_message(
            to,
            &subject,
            render_reset_html(&self.config.app_name, link),
            render_reset_text(&self.config.app_name, link),
        )?;

        match self.deliver(message).await {
            Ok(()) => {
                log::info!("✅ Password reset email sent to {}", to);
                Ok(true)
            }
            Err(e) => {
                let reason = e.to_string();
                log::error!("❌ Failed to send password reset email to {}: {}", to, reason);
                log_delivery_hint(&reason);
                if self.dev_mode {
                    log::info!("🛠️  DEVELOPMENT MODE: reset link for {}: {}", to, link);
                }
                Ok(false)
            }
        }
    }

    /// Connects and authenticates against the relay without sending anything.
    pub async fn test_configuration(&self) -> SmtpReport {
        if !self.is_configured() {
            return SmtpReport {
                configured: false,
                status: SmtpStatus::NotConfigured,
                message: "Email credentials not configured".to_string(),
                error_type: None,
                help: None,
                details: serde_json::json!({
                    "smtp_server": self.config.smtp_server,
                    "smtp_port": self.config.smtp_port,
                    "username_set": !self.config.username.is_empty(),
                    "password_set": !self.config.password.is_empty(),
                }),
            };
        }

        let outcome = match self.transport() {
            Ok(transport) => transport
                .test_connection()
                .await
                .map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(true) => SmtpReport {
                configured: true,
                status: SmtpStatus::Success,
                message: "Successfully connected to SMTP server".to_string(),
                error_type: None,
                help: None,
                details: serde_json::json!({
                    "smtp_server": self.config.smtp_server,
                    "smtp_port": self.config.smtp_port,
                    "username": self.config.username,
                    "from_address": self.config.from_address,
                }),
            },
            Ok(false) => self.error_report("SMTP server refused the connection".to_string()),
            Err(reason) => self.error_report(reason),
        }
    }

    fn error_report(&self, reason: String) -> SmtpReport {
        let error_type = SmtpErrorType::classify(&reason);
        SmtpReport {
            configured: true,
            status: SmtpStatus::Error,
            message: format!("Failed to connect to SMTP server: {}", reason),
            error_type: Some(error_type),
            help: error_type.help().map(str::to_string),
            details: serde_json::json!({
                "smtp_server": self.config.smtp_server,
                "smtp_port": self.config.smtp_port,
                "username": self.config.username,
                "error": reason,
            }),
        }
    }
}

fn render_verification_html(app_name: &str, code: &str) -> String {
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #ddd; border-radius: 5px;">
        <h2 style="color: #3498db;">Email Verification</h2>
        <p>Thank you for registering with {app_name}!</p>
        <p>Your verification code is:</p>
        <div style="background-color: #f8f9fa; padding: 15px; text-align: center; font-size: 24px; font-weight: bold; letter-spacing: 5px; margin: 20px 0;">
            {code}
        </div>
        <p>Enter this code on the verification page to complete your registration.</p>
        <p>This code will expire in 24 hours.</p>
        <p>If you didn't request this verification, please ignore this email.</p>
        <p>Best regards,<br>The {app_name} Team</p>
    </div>
</body>
</html>"#
    )
}

fn render_verification_text(app_name: &str, code: &str) -> String {
    format!(
        "Thank you for registering with {app_name}!\n\n\
         Your verification code is: {code}\n\n\
         This code will expire in 24 hours.\n\
         If you didn't request this verification, please ignore this email.\n"
    )
}

fn render_reset_html(app_name: &str, link: &str) -> String {
    format!(
        r#"<html>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333;">
    <div style="max-width: 600px; margin: 0 auto; padding: 20px; border: 1px solid #ddd; border-radius: 5px;">
        <h2 style="color: #3498db;">Password Reset</h2>
        <p>You requested to reset your password for {app_name}.</p>
        <div style="text-align: center; margin: 25px 0;">
            <a href="{link}" style="background-color: #3498db; color: white; padding: 10px 20px; text-decoration: none; border-radius: 5px; font-weight: bold;">Reset Password</a>
        </div>
        <p>Or copy and paste this link in your browser:</p>
        <p style="word-break: break-all; background-color: #f8f9fa; padding: 10px; font-size: 14px;">{link}</p>
        <p>This link will expire in 1 hour.</p>
        <p>If you didn't request a password reset, please ignore this email.</p>
        <p>Best regards,<br>The {app_name} Team</p>
    </div>
</body>
</html>"#
    )
}

fn render_reset_text(app_name: &str, link: &str) -> String {
    format!(
        "You requested to reset your password for {app_name}.\n\n\
         Open this link to choose a new password:\n{link}\n\n\
         This link will expire in 1 hour.\n"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_gmail_app_password_errors() {
        let msg = "permanent error (535): 5.7.8 Username and Password not accepted. BadCredentials";
        assert_eq!(SmtpErrorType::classify(msg), SmtpErrorType::BadCredentials);
        assert!(SmtpErrorType::BadCredentials.help().unwrap().contains("App Password"));
    }

    #[test]
    fn classifies_other_failures() {
        assert_eq!(
            SmtpErrorType::classify("Authentication failed"),
            SmtpErrorType::Authentication
        );
        assert_eq!(
            SmtpErrorType::classify("connection timed out"),
            SmtpErrorType::Timeout
        );
        assert_eq!(
            SmtpErrorType::classify("connection refused"),
            SmtpErrorType::Unknown
        );
        assert!(SmtpErrorType::Unknown.help().is_none());
    }

    #[actix_web::test]
    async fn unconfigured_service_only_logs() {
        let service = EmailService::new(&Settings::for_tests());
        assert!(!service.is_configured());
        assert!(!service.send_verification_email("jane@example.com", "123456").await.unwrap());
        assert!(!service
            .send_password_reset_email("jane@example.com", "http://localhost/reset")
            .await
            .unwrap());
    }

    #[actix_web::test]
    async fn unconfigured_report_lists_missing_credentials() {
        let report = EmailService::new(&Settings::for_tests()).test_configuration().await;
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["status"], "not_configured");
        assert_eq!(json["configured"], false);
        assert_eq!(json["details"]["username_set"], false);
        assert!(json.get("error_type").is_none());
    }

    #[test]
    fn message_carries_both_bodies() {
        let mut settings = Settings::for_tests();
        settings.email.username = "sender@example.com".into();
        settings.email.password = "app-password".into();
        let service = EmailService::new(&settings);

        let message = service
            .build_message(
                "jane@example.com",
                "CarCare Pro - Verify Your Email",
                render_verification_html("CarCare Pro", "654321"),
                render_verification_text("CarCare Pro", "654321"),
            )
            .unwrap();
        let raw = String::from_utf8(message.formatted()).unwrap();

        assert!(raw.contains("Subject: CarCare Pro - Verify Your Email"));
        assert!(raw.contains("text/html"));
        assert!(raw.contains("654321"));
    }

    #[test]
    fn bad_recipient_is_an_error() {
        let service = EmailService::new(&Settings::for_tests());
        let result = service.build_message("not an address", "s", String::new(), String::new());
        assert!(matches!(result, Err(AppError::Email(_))));
    }
}
