use sqlx::{Sqlite, SqlitePool};

use crate::{
    data_formats::UpdateProfileRequest, errors::RequestError, models::User,
};

use super::get_user_by_id;

pub async fn user_exists(
    pool: &SqlitePool,
    username: &str,
    email: &str,
) -> Result<bool, RequestError> {
    let result: i64 = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 OR email = $2)",
    )
    .bind(username)
    .bind(email)
    .fetch_one(pool)
    .await?;
    Ok(result != 0)
}

/// Inserts a new account; the password must already be hashed. The display
/// name defaults to the username.
pub async fn insert_user(
    pool: &SqlitePool,
    username: &str,
    email: &str,
    password_hash: &str,
) -> Result<User, RequestError> {
    let user = sqlx::query_as::<Sqlite, User>(
        r#"
        INSERT INTO users (username, email, password, display_name)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(username)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

/// Follower/following counts for profile responses.
pub async fn get_follow_counts(pool: &SqlitePool, id: i64) -> Result<(i64, i64), RequestError> {
    let followers: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE followed_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
    let following: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM follows WHERE follower_id = $1")
            .bind(id)
            .fetch_one(pool)
            .await?;
    Ok((followers, following))
}

/// Profile fields are replaced wholesale when present; social links are the
/// exception and merge field-by-field onto the stored values.
pub async fn update_profile_in_db(
    pool: &SqlitePool,
    id: i64,
    request: UpdateProfileRequest,
) -> Result<User, RequestError> {
    let mut user = match get_user_by_id(pool, id).await? {
        Some(user) => user,
        None => return Err(RequestError::NotFound("User not found")),
    };

    // Empty strings are ignored, so a patch can never blank the display name.
    if let Some(display_name) = request.display_name.filter(|d| !d.is_empty()) {
        user.display_name = display_name;
    }
    if let Some(bio) = request.bio.filter(|b| !b.is_empty()) {
        user.bio = bio;
    }
    if let Some(skills) = request.skills {
        user.skills = serde_json::to_string(&skills).map_err(|_| RequestError::ServerError)?;
    }
    if let Some(location) = request.location.filter(|l| !l.is_empty()) {
        user.location = location;
    }
    if let Some(links) = request.social_links {
        if let Some(github) = links.github {
            user.social_github = github;
        }
        if let Some(linkedin) = links.linkedin {
            user.social_linkedin = linkedin;
        }
        if let Some(twitter) = links.twitter {
            user.social_twitter = twitter;
        }
        if let Some(website) = links.website {
            user.social_website = website;
        }
    }

    let user = sqlx::query_as::<Sqlite, User>(
        r#"
        UPDATE users
        SET display_name = $1,
            bio = $2,
            skills = $3,
            location = $4,
            social_github = $5,
            social_linkedin = $6,
            social_twitter = $7,
            social_website = $8,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $9
        RETURNING *
        "#,
    )
    .bind(user.display_name)
    .bind(user.bio)
    .bind(user.skills)
    .bind(user.location)
    .bind(user.social_github)
    .bind(user.social_linkedin)
    .bind(user.social_twitter)
    .bind(user.social_website)
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(user)
}
