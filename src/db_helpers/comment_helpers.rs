use std::collections::HashMap;

use sqlx::{Sqlite, SqlitePool};

use crate::{errors::RequestError, models::Comment};

const COMMENT_SELECT: &str = r#"
    SELECT comments.id,
           comments.article_id,
           comments.author_id,
           comments.content,
           comments.parent_id,
           comments.likes,
           comments.edited,
           comments.created_at,
           comments.updated_at,
           users.username        AS author_username,
           users.display_name    AS author_display_name,
           users.profile_picture AS author_profile_picture
    FROM   comments
           JOIN users ON comments.author_id = users.id
"#;

pub async fn get_comment_by_id_in_db(
    pool: &SqlitePool,
    id: i64,
) -> Result<Option<Comment>, RequestError> {
    let query = format!("{COMMENT_SELECT} WHERE comments.id = $1");
    let result = sqlx::query_as::<Sqlite, Comment>(&query)
        .bind(id)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

/// Two-pass thread fetch: top-level comments newest-first, then every reply
/// on the article oldest-first, bucketed under its parent. Nesting stops at
/// one level.
pub async fn list_comments_for_article_in_db(
    pool: &SqlitePool,
    article_id: i64,
) -> Result<Vec<(Comment, Vec<Comment>)>, RequestError> {
    let query = format!(
        "{COMMENT_SELECT} \
         WHERE comments.article_id = $1 AND comments.parent_id IS NULL \
         ORDER BY comments.created_at DESC"
    );
    let top_level = sqlx::query_as::<Sqlite, Comment>(&query)
        .bind(article_id)
        .fetch_all(pool)
        .await?;

    let query = format!(
        "{COMMENT_SELECT} \
         WHERE comments.article_id = $1 AND comments.parent_id IS NOT NULL \
         ORDER BY comments.created_at ASC"
    );
    let replies = sqlx::query_as::<Sqlite, Comment>(&query)
        .bind(article_id)
        .fetch_all(pool)
        .await?;

    let mut by_parent: HashMap<i64, Vec<Comment>> = HashMap::new();
    for reply in replies {
        if let Some(parent_id) = reply.parent_id {
            by_parent.entry(parent_id).or_default().push(reply);
        }
    }

    Ok(top_level
        .into_iter()
        .map(|comment| {
            let replies = by_parent.remove(&comment.id).unwrap_or_default();
            (comment, replies)
        })
        .collect())
}

/// Inserts the comment and bumps the article's comment counter in the same
/// transaction, so the counter cannot drift from the insert.
pub async fn add_comment_to_article_in_db(
    pool: &SqlitePool,
    author_id: i64,
    article_id: i64,
    content: &str,
    parent_id: Option<i64>,
) -> Result<Comment, RequestError> {
    let mut tx = pool.begin().await?;

    if let Some(parent_id) = parent_id {
        let parent = sqlx::query_as::<Sqlite, (i64, Option<i64>)>(
            "SELECT article_id, parent_id FROM comments WHERE id = $1",
        )
        .bind(parent_id)
        .fetch_optional(&mut *tx)
        .await?;
        let (parent_article_id, parent_parent_id) = match parent {
            Some(parent) => parent,
            None => return Err(RequestError::NotFound("Parent comment not found")),
        };
        // One level of nesting only: a reply's parent must itself be a
        // top-level comment on the same article.
        if parent_article_id != article_id || parent_parent_id.is_some() {
            return Err(RequestError::Validation(
                "Replies must target a top-level comment on the same article",
            ));
        }
    }

    let comment_id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO comments (article_id, author_id, content, parent_id)
        VALUES ($1, $2, $3, $4)
        RETURNING id
        "#,
    )
    .bind(article_id)
    .bind(author_id)
    .bind(content)
    .bind(parent_id)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE articles SET comments_count = comments_count + 1 WHERE id = $1")
        .bind(article_id)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    let comment = get_comment_by_id_in_db(pool, comment_id)
        .await?
        .ok_or(RequestError::ServerError)?;
    Ok(comment)
}

pub async fn update_comment_in_db(
    pool: &SqlitePool,
    author_id: i64,
    comment_id: i64,
    content: &str,
) -> Result<Comment, RequestError> {
    let comment = match get_comment_by_id_in_db(pool, comment_id).await? {
        Some(comment) => comment,
        None => return Err(RequestError::NotFound("Comment not found")),
    };
    if comment.author_id != author_id {
        return Err(RequestError::Forbidden("Not authorized"));
    }

    sqlx::query(
        r#"
        UPDATE comments
        SET content = $1, edited = TRUE, updated_at = CURRENT_TIMESTAMP
        WHERE id = $2
        "#,
    )
    .bind(content)
    .bind(comment_id)
    .execute(pool)
    .await?;

    let comment = get_comment_by_id_in_db(pool, comment_id)
        .await?
        .ok_or(RequestError::ServerError)?;
    Ok(comment)
}

/// Removes the comment and decrements the article's comment counter by one,
/// floored at zero, in a single transaction. Replies of a deleted top-level
/// comment are promoted to top level by the foreign key's SET NULL action.
pub async fn delete_comment_in_db(
    pool: &SqlitePool,
    author_id: i64,
    comment_id: i64,
) -> Result<(), RequestError> {
    let mut tx = pool.begin().await?;

    let row = sqlx::query_as::<Sqlite, (i64, i64)>(
        "SELECT article_id, author_id FROM comments WHERE id = $1",
    )
    .bind(comment_id)
    .fetch_optional(&mut *tx)
    .await?;
    let (article_id, owner_id) = match row {
        Some(row) => row,
        None => return Err(RequestError::NotFound("Comment not found")),
    };
    if owner_id != author_id {
        return Err(RequestError::Forbidden("Not authorized"));
    }

    sqlx::query("DELETE FROM comments WHERE id = $1")
        .bind(comment_id)
        .execute(&mut *tx)
        .await?;

    sqlx::query(
        "UPDATE articles SET comments_count = MAX(comments_count - 1, 0) WHERE id = $1",
    )
    .bind(article_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}
