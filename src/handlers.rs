use std::sync::Arc;

use axum::{
    extract::{Path, Query},
    http::{StatusCode, Uri},
    Extension, Json,
};
use sqlx::SqlitePool;

use crate::{
    authentication::{
        get_jwt_token, hash_password_argon2, verify_password_argon2, AuthUser, MaybeUser,
    },
    data_formats::{
        ArticleListResponse, ArticleQueryParams, ArticleResponse, ArticleSummaryResponse,
        AuthResponse, CommentResponse, CommentThreadResponse, CreateArticleRequest,
        CreateCommentRequest, LoginRequest, MessageResponse, RegisterRequest,
        UpdateArticleRequest, UpdateCommentRequest, UpdateProfileRequest, UserProfileResponse,
        UserResponse,
    },
    db_helpers::{
        add_comment_to_article_in_db, create_article_in_db, delete_article_in_db,
        delete_comment_in_db, get_article_by_slug_in_db, get_article_id_by_slug_in_db,
        get_follow_counts, get_user_by_email, get_user_by_id, get_user_by_username,
        increment_article_views, insert_user, list_articles_in_db,
        list_comments_for_article_in_db, list_published_by_author_in_db,
        list_trending_articles_in_db, list_user_drafts_in_db, update_article_in_db,
        update_comment_in_db, update_profile_in_db, user_exists,
    },
    errors::RequestError,
};

type JsonResult<T> = Result<Json<T>, RequestError>;
type CreatedResult<T> = Result<(StatusCode, Json<T>), RequestError>;

const MAX_COMMENT_LENGTH: usize = 1000;

// ----------------- Helper Handlers -----------------
pub async fn alive() -> &'static str {
    "alive"
}

pub async fn not_found(uri: Uri) -> Result<(), (StatusCode, String)> {
    Err((
        StatusCode::NOT_FOUND,
        format!("URL {} provided was not found", uri),
    ))
}

// ----------------- Auth Handlers -----------------
pub async fn register_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Json(request): Json<RegisterRequest>,
) -> CreatedResult<AuthResponse> {
    if request.username.is_empty() || request.email.is_empty() || request.password.is_empty() {
        return Err(RequestError::Validation(
            "Please provide all required fields",
        ));
    }
    if user_exists(&pool, &request.username, &request.email).await? {
        return Err(RequestError::Validation(
            "User already exists with this email or username",
        ));
    }

    let password_hash = hash_password_argon2(request.password)
        .await
        .map_err(|_| RequestError::ServerError)?;
    let user = insert_user(&pool, &request.username, &request.email, &password_hash).await?;
    let token = get_jwt_token(user.id).map_err(|_| RequestError::ServerError)?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse::new(user, token)),
    ))
}

pub async fn login_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Json(request): Json<LoginRequest>,
) -> JsonResult<AuthResponse> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(RequestError::Validation(
            "Please provide email and password",
        ));
    }

    let user = match get_user_by_email(&pool, &request.email).await? {
        Some(user) => user,
        None => return Err(RequestError::NotAuthorized("Invalid email or password")),
    };
    let is_password_correct = verify_password_argon2(request.password, &user.password)
        .await
        .map_err(|_| RequestError::ServerError)?;
    if !is_password_correct {
        return Err(RequestError::NotAuthorized("Invalid email or password"));
    }

    let token = get_jwt_token(user.id).map_err(|_| RequestError::ServerError)?;
    Ok(Json(AuthResponse::new(user, token)))
}

pub async fn get_current_user(
    Extension(pool): Extension<Arc<SqlitePool>>,
    AuthUser { id }: AuthUser,
) -> JsonResult<UserResponse> {
    let user = match get_user_by_id(&pool, id).await? {
        Some(user) => user,
        None => return Err(RequestError::NotFound("User not found")),
    };
    let (followers, following) = get_follow_counts(&pool, id).await?;
    Ok(Json(UserResponse::new(user, followers, following)))
}

pub async fn update_profile(
    Extension(pool): Extension<Arc<SqlitePool>>,
    AuthUser { id }: AuthUser,
    Json(request): Json<UpdateProfileRequest>,
) -> JsonResult<UserResponse> {
    let user = update_profile_in_db(&pool, id, request).await?;
    let (followers, following) = get_follow_counts(&pool, id).await?;
    Ok(Json(UserResponse::new(user, followers, following)))
}

pub async fn get_user_profile(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(username): Path<String>,
) -> JsonResult<UserProfileResponse> {
    let user = match get_user_by_username(&pool, &username).await? {
        Some(user) => user,
        None => return Err(RequestError::NotFound("User not found")),
    };
    let (followers, following) = get_follow_counts(&pool, user.id).await?;
    let articles = list_published_by_author_in_db(&pool, user.id).await?;
    Ok(Json(UserProfileResponse {
        user: UserResponse::new(user, followers, following),
        articles: articles
            .into_iter()
            .map(ArticleSummaryResponse::new)
            .collect(),
    }))
}

// ----------------- Article Handlers -----------------
pub async fn list_articles(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Query(params): Query<ArticleQueryParams>,
) -> JsonResult<ArticleListResponse> {
    let current_page = params.page.max(1);
    let limit = params.limit.max(1) as i64;
    let (articles, total) = list_articles_in_db(&pool, params).await?;
    Ok(Json(ArticleListResponse {
        articles: articles
            .into_iter()
            .map(ArticleSummaryResponse::new)
            .collect(),
        total_pages: (total + limit - 1) / limit,
        current_page,
        total,
    }))
}

pub async fn get_trending_articles(
    Extension(pool): Extension<Arc<SqlitePool>>,
) -> JsonResult<Vec<ArticleSummaryResponse>> {
    let articles = list_trending_articles_in_db(&pool).await?;
    Ok(Json(
        articles
            .into_iter()
            .map(ArticleSummaryResponse::new)
            .collect(),
    ))
}

pub async fn get_user_drafts(
    Extension(pool): Extension<Arc<SqlitePool>>,
    AuthUser { id }: AuthUser,
) -> JsonResult<Vec<ArticleSummaryResponse>> {
    let drafts = list_user_drafts_in_db(&pool, id).await?;
    Ok(Json(
        drafts
            .into_iter()
            .map(ArticleSummaryResponse::new)
            .collect(),
    ))
}

pub async fn get_article(
    Extension(pool): Extension<Arc<SqlitePool>>,
    maybe_user: MaybeUser,
    Path(slug): Path<String>,
) -> JsonResult<ArticleResponse> {
    let mut article = match get_article_by_slug_in_db(&pool, &slug).await? {
        Some(article) => article,
        None => return Err(RequestError::NotFound("Article not found")),
    };

    if article.published {
        increment_article_views(&pool, article.id).await?;
        article.views += 1;
    } else if maybe_user.get_id() != Some(article.author_id) {
        // Drafts are visible to their author only; everyone else gets the
        // same answer as for a slug that does not exist.
        return Err(RequestError::NotFound("Article not found"));
    }

    Ok(Json(ArticleResponse::new(article)))
}

pub async fn create_article(
    Extension(pool): Extension<Arc<SqlitePool>>,
    AuthUser { id }: AuthUser,
    Json(request): Json<CreateArticleRequest>,
) -> CreatedResult<ArticleResponse> {
    if request.title.is_empty() || request.content.is_empty() {
        return Err(RequestError::Validation("Title and content are required"));
    }
    let article = create_article_in_db(&pool, id, request).await?;
    Ok((StatusCode::CREATED, Json(ArticleResponse::new(article))))
}

pub async fn update_article(
    Extension(pool): Extension<Arc<SqlitePool>>,
    AuthUser { id }: AuthUser,
    Path(slug): Path<String>,
    Json(request): Json<UpdateArticleRequest>,
) -> JsonResult<ArticleResponse> {
    let article = update_article_in_db(&pool, id, &slug, request).await?;
    Ok(Json(ArticleResponse::new(article)))
}

pub async fn delete_article(
    Extension(pool): Extension<Arc<SqlitePool>>,
    AuthUser { id }: AuthUser,
    Path(slug): Path<String>,
) -> JsonResult<MessageResponse> {
    delete_article_in_db(&pool, id, &slug).await?;
    Ok(Json(MessageResponse::new("Article deleted successfully")))
}

// ----------------- Comment Handlers -----------------
pub async fn get_comments(
    Extension(pool): Extension<Arc<SqlitePool>>,
    Path(slug): Path<String>,
) -> JsonResult<Vec<CommentThreadResponse>> {
    let article_id = get_article_id_by_slug_in_db(&pool, &slug).await?;
    let threads = list_comments_for_article_in_db(&pool, article_id).await?;
    Ok(Json(
        threads
            .into_iter()
            .map(|(comment, replies)| CommentThreadResponse {
                comment: CommentResponse::new(comment),
                replies: replies.into_iter().map(CommentResponse::new).collect(),
            })
            .collect(),
    ))
}

pub async fn create_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    AuthUser { id }: AuthUser,
    Path(slug): Path<String>,
    Json(request): Json<CreateCommentRequest>,
) -> CreatedResult<CommentResponse> {
    if request.content.is_empty() {
        return Err(RequestError::Validation("Comment content is required"));
    }
    if request.content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(RequestError::Validation(
            "Comment cannot exceed 1000 characters",
        ));
    }
    let article_id = get_article_id_by_slug_in_db(&pool, &slug).await?;
    let comment = add_comment_to_article_in_db(
        &pool,
        id,
        article_id,
        &request.content,
        request.parent_comment,
    )
    .await?;
    Ok((StatusCode::CREATED, Json(CommentResponse::new(comment))))
}

pub async fn update_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    AuthUser { id }: AuthUser,
    Path(comment_id): Path<i64>,
    Json(request): Json<UpdateCommentRequest>,
) -> JsonResult<CommentResponse> {
    if request.content.is_empty() {
        return Err(RequestError::Validation("Comment content is required"));
    }
    if request.content.chars().count() > MAX_COMMENT_LENGTH {
        return Err(RequestError::Validation(
            "Comment cannot exceed 1000 characters",
        ));
    }
    let comment = update_comment_in_db(&pool, id, comment_id, &request.content).await?;
    Ok(Json(CommentResponse::new(comment)))
}

pub async fn delete_comment(
    Extension(pool): Extension<Arc<SqlitePool>>,
    AuthUser { id }: AuthUser,
    Path(comment_id): Path<i64>,
) -> JsonResult<MessageResponse> {
    delete_comment_in_db(&pool, id, comment_id).await?;
    Ok(Json(MessageResponse::new("Comment deleted successfully")))
}
