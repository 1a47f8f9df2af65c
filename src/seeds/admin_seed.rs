use crate::config::Settings;
use crate::database::MongoDB;
use crate::models::{User, UserRole};
use crate::services::{auth_service, user_service};
use crate::utils::error::AppResult;
use chrono::Utc;

/// Makes sure at least one administrator exists.
/// Never fails startup: problems are logged and the server keeps going.
pub async fn seed_first_admin(db: &MongoDB, settings: &Settings) {
    match ensure_admin(db, settings).await {
        Ok(AdminSeed::AlreadyPresent) => {
            log::info!("🛡️  Admin account: already present, skipping seed");
        }
        Ok(AdminSeed::Promoted) => {
            log::info!("   ✅ Promoted existing user {} to admin", settings.admin_email);
        }
        Ok(AdminSeed::Created) => {
            log::info!("   ✅ Created admin user {}", settings.admin_email);
            if settings.admin_password == "admin123" {
                log::warn!("   ⚠️  Admin uses the default password. Change ADMIN_PASSWORD!");
            }
        }
        Err(e) => {
            log::error!("   ❌ Failed to seed admin user: {}", e);
        }
    }
}

#[derive(Debug, PartialEq)]
enum AdminSeed {
    AlreadyPresent,
    Promoted,
    Created,
}

async fn ensure_admin(db: &MongoDB, settings: &Settings) -> AppResult<AdminSeed> {
    let users = user_service::list_users(db).await?;
    if users.iter().any(User::is_admin) {
        return Ok(AdminSeed::AlreadyPresent);
    }

    log::info!("🛡️  Admin account: none found, seeding {}...", settings.admin_email);

    if let Some(mut user) = users.into_iter().find(|u| u.email == settings.admin_email) {
        user.role = UserRole::Admin;
        user.email_verified = true;
        user_service::save_user(db, &user).await?;
        return Ok(AdminSeed::Promoted);
    }

    let admin = User {
        name: "Admin".to_string(),
        email: settings.admin_email.clone(),
        password: Some(auth_service::hash_password(settings.admin_password.clone()).await?),
        email_verified: true,
        role: UserRole::Admin,
        created_at: Some(Utc::now()),
        ..Default::default()
    };
    user_service::insert_user(db, &admin).await?;

    Ok(AdminSeed::Created)
}
