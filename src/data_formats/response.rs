use serde::Serialize;

use crate::models::{Article, ArticleSummary, Comment, User};

fn parse_string_list(json: &str) -> Vec<String> {
    serde_json::from_str(json).unwrap_or_default()
}

// ----------------- Auth / User Responses -----------------
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub profile_picture: String,
    pub token: String,
}

impl AuthResponse {
    pub fn new(user: User, token: String) -> Self {
        AuthResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            profile_picture: user.profile_picture,
            token,
        }
    }
}

#[derive(Serialize, Debug)]
pub struct SocialLinks {
    pub github: String,
    pub linkedin: String,
    pub twitter: String,
    pub website: String,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub display_name: String,
    pub bio: String,
    pub profile_picture: String,
    pub cover_image: String,
    pub location: String,
    pub skills: Vec<String>,
    pub social_links: SocialLinks,
    pub following_tags: Vec<String>,
    pub followers_count: i64,
    pub following_count: i64,
    pub created_at: String,
}

impl UserResponse {
    pub fn new(user: User, followers_count: i64, following_count: i64) -> Self {
        UserResponse {
            id: user.id,
            username: user.username,
            email: user.email,
            display_name: user.display_name,
            bio: user.bio,
            profile_picture: user.profile_picture,
            cover_image: user.cover_image,
            location: user.location,
            skills: parse_string_list(&user.skills),
            social_links: SocialLinks {
                github: user.social_github,
                linkedin: user.social_linkedin,
                twitter: user.social_twitter,
                website: user.social_website,
            },
            following_tags: parse_string_list(&user.following_tags),
            followers_count,
            following_count,
            created_at: user.created_at.to_string(),
        }
    }
}

// ----------------- Article Responses -----------------
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct AuthorResponse {
    pub username: String,
    pub display_name: String,
    pub profile_picture: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct Reactions {
    pub likes: i64,
    pub hearts: i64,
    pub unicorns: i64,
    pub bookmarks: i64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ArticleResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub cover_image: String,
    pub author: AuthorResponse,
    pub tags: Vec<String>,
    pub category: String,
    pub published: bool,
    pub published_at: Option<String>,
    pub views: i64,
    pub reading_time: i64,
    pub reactions: Reactions,
    pub comments_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl ArticleResponse {
    pub fn new(article: Article) -> Self {
        ArticleResponse {
            id: article.id,
            slug: article.slug,
            title: article.title,
            content: article.content,
            excerpt: article.excerpt,
            cover_image: article.cover_image,
            author: AuthorResponse {
                username: article.author_username,
                display_name: article.author_display_name,
                profile_picture: article.author_profile_picture,
                bio: Some(article.author_bio),
            },
            tags: parse_string_list(&article.tags),
            category: article.category,
            published: article.published,
            published_at: article.published_at.map(|t| t.to_string()),
            views: article.views,
            reading_time: article.reading_time,
            reactions: Reactions {
                likes: article.reaction_likes,
                hearts: article.reaction_hearts,
                unicorns: article.reaction_unicorns,
                bookmarks: article.reaction_bookmarks,
            },
            comments_count: article.comments_count,
            created_at: article.created_at.to_string(),
            updated_at: article.updated_at.to_string(),
        }
    }
}

/// List form: everything but the content body.
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ArticleSummaryResponse {
    pub id: i64,
    pub slug: String,
    pub title: String,
    pub excerpt: String,
    pub cover_image: String,
    pub author: AuthorResponse,
    pub tags: Vec<String>,
    pub category: String,
    pub published: bool,
    pub published_at: Option<String>,
    pub views: i64,
    pub reading_time: i64,
    pub reactions: Reactions,
    pub comments_count: i64,
    pub created_at: String,
    pub updated_at: String,
}

impl ArticleSummaryResponse {
    pub fn new(article: ArticleSummary) -> Self {
        ArticleSummaryResponse {
            id: article.id,
            slug: article.slug,
            title: article.title,
            excerpt: article.excerpt,
            cover_image: article.cover_image,
            author: AuthorResponse {
                username: article.author_username,
                display_name: article.author_display_name,
                profile_picture: article.author_profile_picture,
                bio: None,
            },
            tags: parse_string_list(&article.tags),
            category: article.category,
            published: article.published,
            published_at: article.published_at.map(|t| t.to_string()),
            views: article.views,
            reading_time: article.reading_time,
            reactions: Reactions {
                likes: article.reaction_likes,
                hearts: article.reaction_hearts,
                unicorns: article.reaction_unicorns,
                bookmarks: article.reaction_bookmarks,
            },
            comments_count: article.comments_count,
            created_at: article.created_at.to_string(),
            updated_at: article.updated_at.to_string(),
        }
    }
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct ArticleListResponse {
    pub articles: Vec<ArticleSummaryResponse>,
    pub total_pages: i64,
    pub current_page: u32,
    pub total: i64,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct UserProfileResponse {
    pub user: UserResponse,
    pub articles: Vec<ArticleSummaryResponse>,
}

// ----------------- Comment Responses -----------------
#[derive(Serialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct CommentResponse {
    pub id: i64,
    pub article_id: i64,
    pub author: AuthorResponse,
    pub content: String,
    pub parent_comment: Option<i64>,
    pub likes: i64,
    pub edited: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl CommentResponse {
    pub fn new(comment: Comment) -> Self {
        CommentResponse {
            id: comment.id,
            article_id: comment.article_id,
            author: AuthorResponse {
                username: comment.author_username,
                display_name: comment.author_display_name,
                profile_picture: comment.author_profile_picture,
                bio: None,
            },
            content: comment.content,
            parent_comment: comment.parent_id,
            likes: comment.likes,
            edited: comment.edited,
            created_at: comment.created_at.to_string(),
            updated_at: comment.updated_at.to_string(),
        }
    }
}

/// Top-level comment annotated with its replies (one level only).
#[derive(Serialize, Debug)]
pub struct CommentThreadResponse {
    #[serde(flatten)]
    pub comment: CommentResponse,
    pub replies: Vec<CommentResponse>,
}

#[derive(Serialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: &str) -> Self {
        MessageResponse {
            message: message.to_string(),
        }
    }
}
