//! Storage of user accounts in the `USER` collection.
//!
//! Every document holds the email in clear (the lookup key) and the rest of
//! the account as a compressed blob, so every change is a read-modify-write
//! of the whole blob.

use crate::database::{is_duplicate_key, MongoDB, USERS};
use crate::models::{User, UserRecord};
use crate::utils::error::{AppError, AppResult};
use futures::stream::TryStreamExt;
use mongodb::bson::doc;

fn users(db: &MongoDB) -> mongodb::Collection<UserRecord> {
    db.collection::<UserRecord>(USERS)
}

pub async fn find_user(db: &MongoDB, email: &str) -> AppResult<Option<User>> {
    match users(db).find_one(doc! { "email": email }).await? {
        Some(record) => Ok(Some(record.user()?)),
        None => Ok(None),
    }
}

pub async fn email_exists(db: &MongoDB, email: &str) -> AppResult<bool> {
    Ok(users(db).find_one(doc! { "email": email }).await?.is_some())
}

/// Inserts a new account; a taken email is reported as a bad request.
pub async fn insert_user(db: &MongoDB, user: &User) -> AppResult<()> {
    let record = user.to_record()?;

    match users(db).insert_one(&record).await {
        Ok(_) => Ok(()),
        Err(e) if is_duplicate_key(&e) => {
            Err(AppError::BadRequest("Email already registered".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Rewrites the stored blob for `user.email`.
pub async fn save_user(db: &MongoDB, user: &User) -> AppResult<()> {
    let record = user.to_record()?;

    let result = users(db)
        .update_one(
            doc! { "email": &user.email },
            doc! { "$set": { "data": record.data } },
        )
        .await?;

    if result.matched_count == 0 {
        return Err(AppError::NotFound("User not found".to_string()));
    }
    Ok(())
}

pub async fn list_users(db: &MongoDB) -> AppResult<Vec<User>> {
    let mut cursor = users(db).find(doc! {}).await?;
    let mut list = Vec::new();

    while let Some(record) = cursor.try_next().await? {
        match record.user() {
            Ok(user) => list.push(user),
            Err(e) => log::warn!("⚠️  Skipping unreadable user document {}: {}", record.email, e),
        }
    }

    Ok(list)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore] // Requires MongoDB to be running
    async fn unique_index_turns_a_second_insert_into_400() {
        let db = crate::database::test_db().await;
        let user = User {
            name: "Jane".into(),
            email: format!("{}@example.com", uuid::Uuid::new_v4()),
            ..Default::default()
        };

        insert_user(&db, &user).await.unwrap();
        let err = insert_user(&db, &user).await.unwrap_err();
        assert_eq!(err.to_string(), "Email already registered");

        assert!(email_exists(&db, &user.email).await.unwrap());
        assert_eq!(find_user(&db, &user.email).await.unwrap().unwrap().name, "Jane");
    }
}
