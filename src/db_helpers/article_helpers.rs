use rand::{distributions::Alphanumeric, Rng};
use sqlx::{Sqlite, SqlitePool};

use crate::content::{default_excerpt, normalize_tags, reading_time, slugify};
use crate::data_formats::{ArticleQueryParams, CreateArticleRequest, UpdateArticleRequest};
use crate::errors::RequestError;
use crate::models::{Article, ArticleSummary};

/// Probing past this many numbered candidates falls back to a random suffix
/// so pathological title collisions cannot loop unbounded.
const MAX_SLUG_PROBES: u32 = 50;
const DEFAULT_CATEGORY: &str = "General";

const ARTICLE_DETAIL_SELECT: &str = r#"
    SELECT articles.id,
           articles.slug,
           articles.title,
           articles.content,
           articles.excerpt,
           articles.cover_image,
           articles.author_id,
           articles.tags,
           articles.category,
           articles.published,
           articles.published_at,
           articles.views,
           articles.reading_time,
           articles.reaction_likes,
           articles.reaction_hearts,
           articles.reaction_unicorns,
           articles.reaction_bookmarks,
           articles.comments_count,
           articles.created_at,
           articles.updated_at,
           users.username        AS author_username,
           users.display_name    AS author_display_name,
           users.profile_picture AS author_profile_picture,
           users.bio             AS author_bio
    FROM   articles
           JOIN users ON articles.author_id = users.id
"#;

/// List form leaves the content body out entirely.
const ARTICLE_SUMMARY_SELECT: &str = r#"
    SELECT articles.id,
           articles.slug,
           articles.title,
           articles.excerpt,
           articles.cover_image,
           articles.author_id,
           articles.tags,
           articles.category,
           articles.published,
           articles.published_at,
           articles.views,
           articles.reading_time,
           articles.reaction_likes,
           articles.reaction_hearts,
           articles.reaction_unicorns,
           articles.reaction_bookmarks,
           articles.comments_count,
           articles.created_at,
           articles.updated_at,
           users.username        AS author_username,
           users.display_name    AS author_display_name,
           users.profile_picture AS author_profile_picture
    FROM   articles
           JOIN users ON articles.author_id = users.id
"#;

const LIST_FILTER: &str = r#"
    WHERE  articles.published = TRUE
           AND ( $1 IS NULL OR users.username = $1 )
           AND ( $2 IS NULL OR articles.tags LIKE '%"' || $2 || '"%' )
           AND ( $3 IS NULL
                 OR articles.title LIKE '%' || $3 || '%'
                 OR articles.content LIKE '%' || $3 || '%' )
"#;

async fn slug_taken(pool: &SqlitePool, slug: &str) -> Result<bool, RequestError> {
    let taken: i64 = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM articles WHERE slug = $1)")
        .bind(slug)
        .fetch_one(pool)
        .await?;
    Ok(taken != 0)
}

/// Finds an unused slug for the given title by probing `base`, `base-1`,
/// `base-2`, ... The probe sequence is capped; past the cap a random suffix
/// is used instead. Concurrent creations can still race on the same slug, in
/// which case the UNIQUE constraint on the column is the backstop.
pub async fn find_free_slug(pool: &SqlitePool, title: &str) -> Result<String, RequestError> {
    let base = slugify(title);
    // A title made entirely of stripped characters slugs to nothing.
    let base = if base.is_empty() {
        "article".to_string()
    } else {
        base
    };

    let mut candidate = base.clone();
    let mut counter = 1;
    while slug_taken(pool, &candidate).await? {
        if counter > MAX_SLUG_PROBES {
            let suffix: String = rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(6)
                .map(|c| (c as char).to_ascii_lowercase())
                .collect();
            candidate = format!("{}-{}", base, suffix);
            break;
        }
        candidate = format!("{}-{}", base, counter);
        counter += 1;
    }
    Ok(candidate)
}

pub async fn get_article_id_by_slug_in_db(
    pool: &SqlitePool,
    slug: &str,
) -> Result<i64, RequestError> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM articles WHERE slug = $1")
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    id.ok_or(RequestError::NotFound("Article not found"))
}

pub async fn get_article_by_slug_in_db(
    pool: &SqlitePool,
    slug: &str,
) -> Result<Option<Article>, RequestError> {
    let query = format!("{ARTICLE_DETAIL_SELECT} WHERE articles.slug = $1");
    let result = sqlx::query_as::<Sqlite, Article>(&query)
        .bind(slug)
        .fetch_optional(pool)
        .await?;
    Ok(result)
}

/// Counted once per public read of a published article; draft reads never
/// reach this.
pub async fn increment_article_views(pool: &SqlitePool, id: i64) -> Result<(), RequestError> {
    sqlx::query("UPDATE articles SET views = views + 1 WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn create_article_in_db(
    pool: &SqlitePool,
    author_id: i64,
    request: CreateArticleRequest,
) -> Result<Article, RequestError> {
    let slug = find_free_slug(pool, &request.title).await?;
    let excerpt = match request.excerpt {
        Some(excerpt) if !excerpt.is_empty() => excerpt,
        _ => default_excerpt(&request.content),
    };
    let tags = serde_json::to_string(&normalize_tags(request.tags))
        .map_err(|_| RequestError::ServerError)?;
    let published_at = request
        .published
        .then(|| chrono::Utc::now().naive_utc());

    sqlx::query(
        r#"
        INSERT INTO articles
            (slug, title, content, excerpt, cover_image, author_id, tags,
             category, reading_time, published, published_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(&slug)
    .bind(&request.title)
    .bind(&request.content)
    .bind(excerpt)
    .bind(request.cover_image.unwrap_or_default())
    .bind(author_id)
    .bind(tags)
    .bind(request.category.unwrap_or_else(|| DEFAULT_CATEGORY.to_string()))
    .bind(reading_time(&request.content))
    .bind(request.published)
    .bind(published_at)
    .execute(pool)
    .await?;

    let article = get_article_by_slug_in_db(pool, &slug)
        .await?
        .ok_or(RequestError::ServerError)?;
    Ok(article)
}

pub async fn update_article_in_db(
    pool: &SqlitePool,
    author_id: i64,
    slug: &str,
    request: UpdateArticleRequest,
) -> Result<Article, RequestError> {
    let mut article = match get_article_by_slug_in_db(pool, slug).await? {
        Some(article) => article,
        None => return Err(RequestError::NotFound("Article not found")),
    };
    if article.author_id != author_id {
        return Err(RequestError::Forbidden(
            "Not authorized to update this article",
        ));
    }

    // The slug never changes after creation, even when the title does.
    // Empty strings are ignored rather than persisted: an article created
    // under the non-empty title/content rule cannot be emptied by an update.
    if let Some(title) = request.title.filter(|t| !t.is_empty()) {
        article.title = title;
    }
    if let Some(content) = request.content.filter(|c| !c.is_empty()) {
        article.reading_time = reading_time(&content);
        article.content = content;
    }
    if let Some(excerpt) = request.excerpt.filter(|e| !e.is_empty()) {
        article.excerpt = excerpt;
    }
    // An empty cover image is meaningful: it clears the current one.
    if let Some(cover_image) = request.cover_image {
        article.cover_image = cover_image;
    }
    if let Some(tags) = request.tags {
        article.tags = serde_json::to_string(&normalize_tags(tags))
            .map_err(|_| RequestError::ServerError)?;
    }
    if let Some(category) = request.category.filter(|c| !c.is_empty()) {
        article.category = category;
    }
    if let Some(published) = request.published {
        article.published = published;
        // Stamped once, on the first transition to published. Republishing
        // never rewrites it.
        if published && article.published_at.is_none() {
            article.published_at = Some(chrono::Utc::now().naive_utc());
        }
    }

    sqlx::query(
        r#"
        UPDATE articles
        SET title = $1,
            content = $2,
            excerpt = $3,
            cover_image = $4,
            tags = $5,
            category = $6,
            reading_time = $7,
            published = $8,
            published_at = $9,
            updated_at = CURRENT_TIMESTAMP
        WHERE id = $10
        "#,
    )
    .bind(article.title)
    .bind(article.content)
    .bind(article.excerpt)
    .bind(article.cover_image)
    .bind(article.tags)
    .bind(article.category)
    .bind(article.reading_time)
    .bind(article.published)
    .bind(article.published_at)
    .bind(article.id)
    .execute(pool)
    .await?;

    let article = get_article_by_slug_in_db(pool, slug)
        .await?
        .ok_or(RequestError::ServerError)?;
    Ok(article)
}

/// Deleting an article also deletes its comments (foreign key cascade).
pub async fn delete_article_in_db(
    pool: &SqlitePool,
    author_id: i64,
    slug: &str,
) -> Result<(), RequestError> {
    let row = sqlx::query_as::<Sqlite, (i64, i64)>(
        "SELECT id, author_id FROM articles WHERE slug = $1",
    )
    .bind(slug)
    .fetch_optional(pool)
    .await?;
    let (id, owner_id) = match row {
        Some(row) => row,
        None => return Err(RequestError::NotFound("Article not found")),
    };
    if owner_id != author_id {
        return Err(RequestError::Forbidden(
            "Not authorized to delete this article",
        ));
    }

    sqlx::query("DELETE FROM articles WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(())
}

pub async fn list_articles_in_db(
    pool: &SqlitePool,
    ArticleQueryParams {
        page,
        limit,
        tag,
        author,
        search,
    }: ArticleQueryParams,
) -> Result<(Vec<ArticleSummary>, i64), RequestError> {
    let page = page.max(1);
    let limit = limit.max(1) as i64;
    let offset = (page as i64 - 1) * limit;
    let tag = tag.map(|t| t.to_lowercase());

    let query = format!(
        "{ARTICLE_SUMMARY_SELECT} {LIST_FILTER} \
         ORDER BY articles.published_at DESC LIMIT $4 OFFSET $5"
    );
    let articles = sqlx::query_as::<Sqlite, ArticleSummary>(&query)
        .bind(&author)
        .bind(&tag)
        .bind(&search)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;

    let count_query = format!(
        "SELECT COUNT(*) FROM articles \
         JOIN users ON articles.author_id = users.id {LIST_FILTER}"
    );
    let total: i64 = sqlx::query_scalar(&count_query)
        .bind(&author)
        .bind(&tag)
        .bind(&search)
        .fetch_one(pool)
        .await?;

    Ok((articles, total))
}

pub async fn list_trending_articles_in_db(
    pool: &SqlitePool,
) -> Result<Vec<ArticleSummary>, RequestError> {
    let query = format!(
        "{ARTICLE_SUMMARY_SELECT} WHERE articles.published = TRUE \
         ORDER BY articles.views DESC, articles.reaction_likes DESC LIMIT 10"
    );
    let articles = sqlx::query_as::<Sqlite, ArticleSummary>(&query)
        .fetch_all(pool)
        .await?;
    Ok(articles)
}

pub async fn list_user_drafts_in_db(
    pool: &SqlitePool,
    author_id: i64,
) -> Result<Vec<ArticleSummary>, RequestError> {
    let query = format!(
        "{ARTICLE_SUMMARY_SELECT} \
         WHERE articles.author_id = $1 AND articles.published = FALSE \
         ORDER BY articles.updated_at DESC"
    );
    let articles = sqlx::query_as::<Sqlite, ArticleSummary>(&query)
        .bind(author_id)
        .fetch_all(pool)
        .await?;
    Ok(articles)
}

pub async fn list_published_by_author_in_db(
    pool: &SqlitePool,
    author_id: i64,
) -> Result<Vec<ArticleSummary>, RequestError> {
    let query = format!(
        "{ARTICLE_SUMMARY_SELECT} \
         WHERE articles.author_id = $1 AND articles.published = TRUE \
         ORDER BY articles.published_at DESC"
    );
    let articles = sqlx::query_as::<Sqlite, ArticleSummary>(&query)
        .bind(author_id)
        .fetch_all(pool)
        .await?;
    Ok(articles)
}
