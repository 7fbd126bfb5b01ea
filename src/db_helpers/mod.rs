use sqlx::{Sqlite, SqlitePool};

use crate::{errors::RequestError, models::User};

mod article_helpers;
mod comment_helpers;
mod user_helpers;

pub use article_helpers::*;
pub use comment_helpers::*;
pub use user_helpers::*;

// ----------------- Shared lookups -----------------

pub async fn get_user_by_id(pool: &SqlitePool, id: i64) -> Result<Option<User>, RequestError> {
    let result = sqlx::query_as::<Sqlite, User>("SELECT * FROM users WHERE id = $1")
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn get_user_by_email(
    pool: &SqlitePool,
    email: &str,
) -> Result<Option<User>, RequestError> {
    let result = sqlx::query_as::<Sqlite, User>("SELECT * FROM users WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

pub async fn get_user_by_username(
    pool: &SqlitePool,
    username: &str,
) -> Result<Option<User>, RequestError> {
    let result = sqlx::query_as::<Sqlite, User>("SELECT * FROM users WHERE username = $1")
        .bind(username)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}
