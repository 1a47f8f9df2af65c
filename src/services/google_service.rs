//! Google Sign-In (OAuth 2.0 authorization code flow).
//!
//! The identity is read from the `id_token` returned by the token endpoint.
//! That response comes straight from Google over TLS, so the payload is used
//! without re-checking the signature. The userinfo endpoint is the fallback.

use crate::{
    config::Settings,
    database::MongoDB,
    models::User,
    services::{
        auth_service::{self, generate_token, issue_verification_code, verify_email_path},
        email_service::EmailService,
        user_service,
    },
    utils::{
        cache::{consume_oauth_state, issue_oauth_state},
        error::{AppError, AppResult},
    },
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use lazy_static::lazy_static;
use serde::Deserialize;
use std::time::Duration;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";
const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

lazy_static! {
    // One pool for every OAuth round trip
    static ref HTTP: reqwest::Client = reqwest::Client::builder()
        .timeout(HTTP_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            log::warn!("⚠️  Falling back to default HTTP client for Google: {}", e);
            reqwest::Client::new()
        });
}

#[derive(Debug, Deserialize)]
struct TokenExchange {
    access_token: String,
    #[serde(default)]
    id_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GoogleIdentity {
    pub sub: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub picture: Option<String>,
}

/// Where the browser goes once the callback is done.
#[derive(Debug, PartialEq)]
pub enum SignIn {
    /// New or unverified account; the frontend asks for the emailed code.
    NeedsVerification { email: String },
    Complete { token: String },
}

impl SignIn {
    pub fn redirect_url(&self, settings: &Settings) -> String {
        match self {
            SignIn::NeedsVerification { email } => verify_email_path(email),
            SignIn::Complete { token } => format!(
                "{}/auth-success?token={}",
                settings.frontend_url,
                urlencoding::encode(token)
            ),
        }
    }
}

pub fn error_redirect(settings: &Settings, message: &str) -> String {
    format!(
        "{}/login?error={}",
        settings.frontend_url,
        urlencoding::encode(message)
    )
}

fn client_credentials(settings: &Settings) -> AppResult<(&str, &str)> {
    match (
        settings.google.client_id.as_deref(),
        settings.google.client_secret.as_deref(),
    ) {
        (Some(id), Some(secret)) => Ok((id, secret)),
        _ => Err(AppError::Unavailable(
            "Google Sign-In is not configured".to_string(),
        )),
    }
}

/// Consent page URL carrying a fresh single-use `state`.
pub fn authorization_url(settings: &Settings) -> AppResult<String> {
    let (client_id, _) = client_credentials(settings)?;
    let state = issue_oauth_state();

    Ok(format!(
        "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&access_type=online&prompt=select_account",
        GOOGLE_AUTH_URL,
        urlencoding::encode(client_id),
        urlencoding::encode(&settings.google.redirect_uri),
        urlencoding::encode("openid email profile"),
        urlencoding::encode(&state),
    ))
}

/// Decodes the claims segment of an id_token.
pub fn identity_from_id_token(id_token: &str) -> Option<GoogleIdentity> {
    let payload = id_token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}

async fn exchange_code(settings: &Settings, code: &str) -> AppResult<TokenExchange> {
    let (client_id, client_secret) = client_credentials(settings)?;

    let response = HTTP
        .post(GOOGLE_TOKEN_URL)
        .form(&[
            ("code", code),
            ("client_id", client_id),
            ("client_secret", client_secret),
            ("redirect_uri", settings.google.redirect_uri.as_str()),
            ("grant_type", "authorization_code"),
        ])
        .send()
        .await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        log::error!("❌ Google token exchange failed ({}): {}", status, body);
        return Err(AppError::BadRequest(
            "Could not exchange authorization code with Google".to_string(),
        ));
    }

    Ok(response.json::<TokenExchange>().await?)
}

async fn fetch_userinfo(access_token: &str) -> AppResult<GoogleIdentity> {
    let response = HTTP
        .get(GOOGLE_USERINFO_URL)
        .bearer_auth(access_token)
        .send()
        .await?;

    if !response.status().is_success() {
        return Err(AppError::BadRequest(
            "Could not fetch user info from Google".to_string(),
        ));
    }

    Ok(response.json::<GoogleIdentity>().await?)
}

/// Creates or links the account for a Google identity.
pub async fn complete_sign_in(
    db: &MongoDB,
    settings: &Settings,
    mailer: &EmailService,
    identity: GoogleIdentity,
) -> AppResult<SignIn> {
    let now = Utc::now();

    let user = match user_service::find_user(db, &identity.email).await? {
        Some(mut user) => {
            user.google_id = Some(identity.sub);
            if identity.picture.is_some() {
                user.picture = identity.picture;
            }
            user.is_google_auth = true;
            user.last_login = Some(now);
            user_service::save_user(db, &user).await?;
            log::info!("🔗 Google account linked: {}", user.email);
            user
        }
        None => {
            let mut user = User {
                name: identity.name.unwrap_or_else(|| identity.email.clone()),
                email: identity.email,
                google_id: Some(identity.sub),
                picture: identity.picture,
                is_google_auth: true,
                created_at: Some(now),
                ..Default::default()
            };
            let code = issue_verification_code(&mut user, now);
            user_service::insert_user(db, &user).await?;
            auth_service::notify(mailer.send_verification_email(&user.email, &code).await, &user.email);
            log::info!("✅ Google user created: {}", user.email);
            user
        }
    };

    if !user.email_verified {
        return Ok(SignIn::NeedsVerification { email: user.email });
    }

    Ok(SignIn::Complete {
        token: generate_token(&user.email, settings)?,
    })
}

pub async fn handle_callback(
    db: &MongoDB,
    settings: &Settings,
    mailer: &EmailService,
    code: &str,
    state: &str,
) -> AppResult<SignIn> {
    if !consume_oauth_state(state) {
        return Err(AppError::BadRequest("Invalid or expired OAuth state".to_string()));
    }
    if code.is_empty() {
        return Err(AppError::BadRequest("Missing authorization code".to_string()));
    }

    let tokens = exchange_code(settings, code).await?;

    let identity = match tokens.id_token.as_deref().and_then(identity_from_id_token) {
        Some(identity) => identity,
        None => fetch_userinfo(&tokens.access_token).await?,
    };

    complete_sign_in(db, settings, mailer, identity).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_id_token(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"RS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        format!("{}.{}.signature", header, payload)
    }

    #[test]
    fn oauth_calls_share_one_client() {
        let first: &reqwest::Client = &HTTP;
        let second: &reqwest::Client = &HTTP;
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn reads_identity_from_id_token() {
        let token = fake_id_token(serde_json::json!({
            "iss": "https://accounts.google.com",
            "sub": "1098",
            "email": "jane@gmail.com",
            "name": "Jane Doe",
            "picture": "https://lh3.googleusercontent.com/a/x"
        }));

        let identity = identity_from_id_token(&token).unwrap();
        assert_eq!(identity.sub, "1098");
        assert_eq!(identity.email, "jane@gmail.com");
        assert_eq!(identity.name.as_deref(), Some("Jane Doe"));
    }

    #[test]
    fn malformed_id_token_falls_through() {
        assert!(identity_from_id_token("only-one-part").is_none());
        assert!(identity_from_id_token("a.!!!.c").is_none());
        let no_email = fake_id_token(serde_json::json!({ "sub": "1" }));
        assert!(identity_from_id_token(&no_email).is_none());
    }

    #[test]
    fn authorization_url_carries_a_live_state() {
        let settings = Settings::for_tests();
        let url = authorization_url(&settings).unwrap();

        assert!(url.starts_with(GOOGLE_AUTH_URL));
        assert!(url.contains("scope=openid%20email%20profile"));
        assert!(url.contains("redirect_uri=http%3A%2F%2Flocalhost%3A8080%2Fapi%2Fauth%2Fgoogle%2Fcallback"));

        let state = url.split("state=").nth(1).unwrap().split('&').next().unwrap();
        assert!(consume_oauth_state(state));
    }

    #[test]
    fn missing_client_id_is_unavailable() {
        let mut settings = Settings::for_tests();
        settings.google.client_id = None;
        assert!(matches!(
            authorization_url(&settings),
            Err(AppError::Unavailable(_))
        ));
    }

    #[test]
    fn redirects_point_at_the_frontend() {
        let settings = Settings::for_tests();
        let done = SignIn::Complete { token: "abc.def".into() };
        assert_eq!(
            done.redirect_url(&settings),
            "http://localhost:8080/auth-success?token=abc.def"
        );

        let pending = SignIn::NeedsVerification { email: "jane@gmail.com".into() };
        assert_eq!(
            pending.redirect_url(&settings),
            "/verify-email?email=jane%40gmail.com"
        );

        assert_eq!(
            error_redirect(&settings, "Access denied"),
            "http://localhost:8080/login?error=Access%20denied"
        );
    }
}
