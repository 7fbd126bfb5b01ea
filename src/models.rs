use chrono::NaiveDateTime;

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub bio: String,
    pub profile_picture: String,
    pub cover_image: String,
    pub location: String,
    /// JSON-encoded array of strings.
    pub skills: String,
    pub social_github: String,
    pub social_linkedin: String,
    pub social_twitter: String,
    pub social_website: String,
    /// JSON-encoded array of strings.
    pub following_tags: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Full article row. Every article query joins `users` so the author columns
/// are always populated.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Article {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub cover_image: String,
    pub author_id: i64,
    /// JSON-encoded array of strings.
    pub tags: String,
    pub category: String,
    pub published: bool,
    pub published_at: Option<NaiveDateTime>,
    pub views: i64,
    pub reading_time: i64,
    pub reaction_likes: i64,
    pub reaction_hearts: i64,
    pub reaction_unicorns: i64,
    pub reaction_bookmarks: i64,
    pub comments_count: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub author_username: String,
    pub author_display_name: String,
    pub author_profile_picture: String,
    pub author_bio: String,
}

/// List-form article row; the content body is never selected for lists.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ArticleSummary {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub cover_image: String,
    pub author_id: i64,
    pub tags: String,
    pub category: String,
    pub published: bool,
    pub published_at: Option<NaiveDateTime>,
    pub views: i64,
    pub reading_time: i64,
    pub reaction_likes: i64,
    pub reaction_hearts: i64,
    pub reaction_unicorns: i64,
    pub reaction_bookmarks: i64,
    pub comments_count: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub author_username: String,
    pub author_display_name: String,
    pub author_profile_picture: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub article_id: i64,
    pub author_id: i64,
    pub content: String,
    pub parent_id: Option<i64>,
    pub likes: i64,
    pub edited: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub author_username: String,
    pub author_display_name: String,
    pub author_profile_picture: String,
}
