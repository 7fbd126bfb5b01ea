use std::sync::Arc;

use axum::Extension;
use devnest::{get_random_free_port, init_db_with_url, make_router};
use serde_json::{json, Value};

/// Boots the full router against a fresh sqlite database on a random port and
/// returns the base url.
async fn spawn_app(test_name: &str) -> String {
    std::env::set_var("JWT_SECRET", "test-secret");
    let db_path = std::env::temp_dir().join(format!(
        "devnest-{}-{}.db",
        test_name,
        std::process::id()
    ));
    let _ = std::fs::remove_file(&db_path);
    let db_url = format!("sqlite://{}", db_path.display());
    let pool = init_db_with_url(&db_url)
        .await
        .expect("failed to init test db");

    let (port, addr) = get_random_free_port();
    let app = make_router().layer(Extension(Arc::new(pool)));
    tokio::spawn(async move {
        axum::Server::bind(&addr)
            .serve(app.into_make_service())
            .await
            .unwrap();
    });

    let base = format!("http://localhost:{}", port);
    for _ in 0..50 {
        if reqwest::get(format!("{base}/check_health")).await.is_ok() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }
    base
}

async fn register(client: &reqwest::Client, base: &str, username: &str) -> String {
    let res = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({
            "username": username,
            "email": format!("{username}@example.com"),
            "password": "password123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let body: Value = res.json().await.unwrap();
    body["token"].as_str().unwrap().to_string()
}

async fn create_article(
    client: &reqwest::Client,
    base: &str,
    token: &str,
    body: Value,
) -> Value {
    let res = client
        .post(format!("{base}/api/articles"))
        .bearer_auth(token)
        .json(&body)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    res.json().await.unwrap()
}

#[tokio::test]
async fn health_check_works() {
    let base = spawn_app("health").await;
    let res = reqwest::get(format!("{base}/check_health")).await.unwrap();
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "alive");
}

#[tokio::test]
async fn register_login_and_me() {
    let base = spawn_app("auth").await;
    let client = reqwest::Client::new();

    let token = register(&client, &base, "alice").await;

    // Duplicate registration is rejected before any write.
    let res = client
        .post(format!("{base}/api/auth/register"))
        .json(&json!({
            "username": "alice",
            "email": "other@example.com",
            "password": "password123",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let res = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({"email": "alice@example.com", "password": "wrong"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);

    let res = client
        .post(format!("{base}/api/auth/login"))
        .json(&json!({"email": "alice@example.com", "password": "password123"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .get(format!("{base}/api/auth/me"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let me: Value = res.json().await.unwrap();
    assert_eq!(me["username"], "alice");
    assert_eq!(me["displayName"], "alice");
    assert!(me.get("password").is_none());

    let res = client
        .get(format!("{base}/api/auth/me"))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 401);
}

#[tokio::test]
async fn profile_update_merges_social_links() {
    let base = spawn_app("profile").await;
    let client = reqwest::Client::new();
    let token = register(&client, &base, "bob").await;

    let res = client
        .put(format!("{base}/api/auth/profile"))
        .bearer_auth(&token)
        .json(&json!({
            "displayName": "Bob Builder",
            "skills": ["rust", "sql"],
            "socialLinks": {"github": "https://github.com/bob"},
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // A later patch touching one link leaves the others in place.
    let res = client
        .put(format!("{base}/api/auth/profile"))
        .bearer_auth(&token)
        .json(&json!({"socialLinks": {"twitter": "https://twitter.com/bob"}}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let profile: Value = res.json().await.unwrap();
    assert_eq!(profile["displayName"], "Bob Builder");
    assert_eq!(profile["skills"], json!(["rust", "sql"]));
    assert_eq!(profile["socialLinks"]["github"], "https://github.com/bob");
    assert_eq!(profile["socialLinks"]["twitter"], "https://twitter.com/bob");
}

#[tokio::test]
async fn article_slug_collision_and_publish_lifecycle() {
    let base = spawn_app("lifecycle").await;
    let client = reqwest::Client::new();
    let token = register(&client, &base, "carol").await;

    let first = create_article(
        &client,
        &base,
        &token,
        json!({"title": "Hello, World!", "content": "a draft body"}),
    )
    .await;
    assert_eq!(first["slug"], "hello-world");
    assert_eq!(first["published"], false);
    assert!(first["publishedAt"].is_null());
    assert_eq!(first["readingTime"], 1);
    assert_eq!(first["category"], "General");

    // Same base slug gets a numbered suffix.
    let second = create_article(
        &client,
        &base,
        &token,
        json!({"title": "Hello World", "content": "another body"}),
    )
    .await;
    assert_eq!(second["slug"], "hello-world-1");

    // Drafts are invisible to the public and to other users.
    let res = reqwest::get(format!("{base}/api/articles/hello-world"))
        .await
        .unwrap();
    assert_eq!(res.status(), 404);

    // The author still sees their own draft, and the read is not counted.
    let res = client
        .get(format!("{base}/api/articles/hello-world"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let draft: Value = res.json().await.unwrap();
    assert_eq!(draft["views"], 0);

    // Publishing stamps publishedAt once.
    let res = client
        .put(format!("{base}/api/articles/hello-world"))
        .bearer_auth(&token)
        .json(&json!({"published": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let published: Value = res.json().await.unwrap();
    let published_at = published["publishedAt"].as_str().unwrap().to_string();

    // Editing content later recomputes reading time but never touches the
    // publish timestamp.
    let long_content = vec!["word"; 201].join(" ");
    let res = client
        .put(format!("{base}/api/articles/hello-world"))
        .bearer_auth(&token)
        .json(&json!({"content": long_content, "published": true}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let edited: Value = res.json().await.unwrap();
    assert_eq!(edited["publishedAt"].as_str().unwrap(), published_at);
    assert_eq!(edited["readingTime"], 2);
    assert_eq!(edited["slug"], "hello-world");

    // A public read of the published article counts one view.
    let res = reqwest::get(format!("{base}/api/articles/hello-world"))
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched["views"], 1);
}

#[tokio::test]
async fn only_the_author_can_mutate_an_article() {
    let base = spawn_app("ownership").await;
    let client = reqwest::Client::new();
    let author_token = register(&client, &base, "dave").await;
    let other_token = register(&client, &base, "eve").await;

    let article = create_article(
        &client,
        &base,
        &author_token,
        json!({"title": "Mine", "content": "body", "published": true}),
    )
    .await;
    let slug = article["slug"].as_str().unwrap();

    let res = client
        .put(format!("{base}/api/articles/{slug}"))
        .bearer_auth(&other_token)
        .json(&json!({"title": "Stolen"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let res = client
        .delete(format!("{base}/api/articles/{slug}"))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    // The failed attempts left the article unchanged.
    let res = reqwest::get(format!("{base}/api/articles/{slug}"))
        .await
        .unwrap();
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched["title"], "Mine");
}

#[tokio::test]
async fn article_validation_and_excerpt_default() {
    let base = spawn_app("validation").await;
    let client = reqwest::Client::new();
    let token = register(&client, &base, "frank").await;

    let res = client
        .post(format!("{base}/api/articles"))
        .bearer_auth(&token)
        .json(&json!({"title": "No content"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let content = "x".repeat(300);
    let article = create_article(
        &client,
        &base,
        &token,
        json!({"title": "Excerpted", "content": content}),
    )
    .await;
    assert_eq!(article["excerpt"].as_str().unwrap().len(), 150);
}

#[tokio::test]
async fn update_ignores_empty_title_and_content() {
    let base = spawn_app("empty-update").await;
    let client = reqwest::Client::new();
    let token = register(&client, &base, "kim").await;

    let long_content = vec!["word"; 201].join(" ");
    let article = create_article(
        &client,
        &base,
        &token,
        json!({"title": "Keep me", "content": long_content.clone(), "published": true}),
    )
    .await;
    let slug = article["slug"].as_str().unwrap();

    // An article created under the non-empty rule cannot be emptied later;
    // blank strings in a patch are skipped, not persisted.
    let res = client
        .put(format!("{base}/api/articles/{slug}"))
        .bearer_auth(&token)
        .json(&json!({"title": "", "content": "", "category": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let updated: Value = res.json().await.unwrap();
    assert_eq!(updated["title"], "Keep me");
    assert_eq!(updated["content"].as_str().unwrap().len(), long_content.len());
    assert_eq!(updated["readingTime"], 2);
    assert_eq!(updated["category"], "General");

    // Same rule on profiles: a blank display name is ignored.
    let res = client
        .put(format!("{base}/api/auth/profile"))
        .bearer_auth(&token)
        .json(&json!({"displayName": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let profile: Value = res.json().await.unwrap();
    assert_eq!(profile["displayName"], "kim");
}

#[tokio::test]
async fn slug_probing_caps_with_a_random_suffix() {
    let base = spawn_app("slug-cap").await;
    let client = reqwest::Client::new();
    let token = register(&client, &base, "lena").await;

    let mut slugs = Vec::new();
    for _ in 0..52 {
        let article = create_article(
            &client,
            &base,
            &token,
            json!({"title": "Crowded", "content": "body"}),
        )
        .await;
        slugs.push(article["slug"].as_str().unwrap().to_string());
    }

    // The first 51 creations walk the numbered sequence.
    assert_eq!(slugs[0], "crowded");
    for (i, slug) in slugs.iter().enumerate().take(51).skip(1) {
        assert_eq!(slug, &format!("crowded-{i}"));
    }

    // Past the probe cap the slug gets an opaque 6-char suffix instead.
    let capped = &slugs[51];
    let suffix = capped.strip_prefix("crowded-").unwrap();
    assert_eq!(suffix.len(), 6);
    assert!(suffix.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_ne!(suffix, "51");

    // Every slug handed out is still unique.
    let mut deduped = slugs.clone();
    deduped.sort();
    deduped.dedup();
    assert_eq!(deduped.len(), slugs.len());
}

#[tokio::test]
async fn public_reads_ignore_invalid_tokens() {
    let base = spawn_app("public-token").await;
    let client = reqwest::Client::new();
    let token = register(&client, &base, "mallory").await;

    create_article(
        &client,
        &base,
        &token,
        json!({"title": "Open post", "content": "body", "published": true}),
    )
    .await;
    create_article(
        &client,
        &base,
        &token,
        json!({"title": "Hidden draft", "content": "body"}),
    )
    .await;

    // A garbage token does not break a public read of a published article.
    let res = client
        .get(format!("{base}/api/articles/open-post"))
        .header("Authorization", "Bearer not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    // It grants nothing either: the caller counts as anonymous for drafts.
    let res = client
        .get(format!("{base}/api/articles/hidden-draft"))
        .header("Authorization", "Bearer not-a-token")
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}

#[tokio::test]
async fn comment_threading_and_counter() {
    let base = spawn_app("comments").await;
    let client = reqwest::Client::new();
    let token = register(&client, &base, "grace").await;
    let other_token = register(&client, &base, "heidi").await;

    let article = create_article(
        &client,
        &base,
        &token,
        json!({"title": "Discuss", "content": "body", "published": true}),
    )
    .await;
    let slug = article["slug"].as_str().unwrap();
    let comments_url = format!("{base}/api/articles/{slug}/comments");

    let res = client
        .post(&comments_url)
        .bearer_auth(&token)
        .json(&json!({"content": ""}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    let res = client
        .post(&comments_url)
        .bearer_auth(&token)
        .json(&json!({"content": "first!"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let first: Value = res.json().await.unwrap();
    let first_id = first["id"].as_i64().unwrap();

    let res = client
        .post(&comments_url)
        .bearer_auth(&other_token)
        .json(&json!({"content": "second"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    let res = client
        .post(&comments_url)
        .bearer_auth(&other_token)
        .json(&json!({"content": "a reply", "parentComment": first_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);
    let reply: Value = res.json().await.unwrap();
    let reply_id = reply["id"].as_i64().unwrap();
    assert_eq!(reply["parentComment"].as_i64().unwrap(), first_id);

    // Replying to a reply is rejected; nesting stops at one level.
    let res = client
        .post(&comments_url)
        .bearer_auth(&token)
        .json(&json!({"content": "too deep", "parentComment": reply_id}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 400);

    // Counter tracks live comments.
    let res = client
        .get(format!("{base}/api/articles/{slug}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched["commentsCount"], 3);

    // The thread view nests the reply under its parent.
    let res = reqwest::get(&comments_url).await.unwrap();
    assert_eq!(res.status(), 200);
    let threads: Value = res.json().await.unwrap();
    let threads = threads.as_array().unwrap();
    assert_eq!(threads.len(), 2);
    let first_thread = threads
        .iter()
        .find(|t| t["id"].as_i64() == Some(first_id))
        .unwrap();
    assert_eq!(first_thread["replies"].as_array().unwrap().len(), 1);

    // Only the comment's author may edit or delete it.
    let res = client
        .put(format!("{base}/api/comments/{first_id}"))
        .bearer_auth(&other_token)
        .json(&json!({"content": "hijacked"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let res = client
        .put(format!("{base}/api/comments/{first_id}"))
        .bearer_auth(&token)
        .json(&json!({"content": "first, edited"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let edited: Value = res.json().await.unwrap();
    assert_eq!(edited["edited"], true);

    let res = client
        .delete(format!("{base}/api/comments/{reply_id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 403);

    let res = client
        .delete(format!("{base}/api/comments/{reply_id}"))
        .bearer_auth(&other_token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = client
        .get(format!("{base}/api/articles/{slug}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    let fetched: Value = res.json().await.unwrap();
    assert_eq!(fetched["commentsCount"], 2);
}

#[tokio::test]
async fn listing_filters_pagination_and_trending() {
    let base = spawn_app("listing").await;
    let client = reqwest::Client::new();
    let token = register(&client, &base, "ivan").await;

    for i in 0..3 {
        create_article(
            &client,
            &base,
            &token,
            json!({
                "title": format!("Rust post {i}"),
                "content": "all about rust",
                "tags": ["Rust"],
                "published": true,
            }),
        )
        .await;
    }
    create_article(
        &client,
        &base,
        &token,
        json!({
            "title": "Cooking post",
            "content": "all about food",
            "tags": ["cooking"],
            "published": true,
        }),
    )
    .await;
    create_article(
        &client,
        &base,
        &token,
        json!({"title": "Secret draft", "content": "unfinished"}),
    )
    .await;

    // Drafts never show up in the public list; content is never included.
    let res = reqwest::get(format!("{base}/api/articles")).await.unwrap();
    let listing: Value = res.json().await.unwrap();
    assert_eq!(listing["total"], 4);
    for article in listing["articles"].as_array().unwrap() {
        assert!(article.get("content").is_none());
    }

    // Tag filter is case-insensitive because tags normalize to lowercase.
    let res = reqwest::get(format!("{base}/api/articles?tag=rust"))
        .await
        .unwrap();
    let listing: Value = res.json().await.unwrap();
    assert_eq!(listing["total"], 3);

    let res = reqwest::get(format!("{base}/api/articles?search=food"))
        .await
        .unwrap();
    let listing: Value = res.json().await.unwrap();
    assert_eq!(listing["total"], 1);

    let res = reqwest::get(format!("{base}/api/articles?page=2&limit=3"))
        .await
        .unwrap();
    let listing: Value = res.json().await.unwrap();
    assert_eq!(listing["articles"].as_array().unwrap().len(), 1);
    assert_eq!(listing["totalPages"], 2);
    assert_eq!(listing["currentPage"], 2);

    // Drive some views so trending has an order to report.
    for _ in 0..2 {
        reqwest::get(format!("{base}/api/articles/cooking-post"))
            .await
            .unwrap();
    }
    let res = reqwest::get(format!("{base}/api/articles/trending"))
        .await
        .unwrap();
    let trending: Value = res.json().await.unwrap();
    let trending = trending.as_array().unwrap();
    assert_eq!(trending[0]["slug"], "cooking-post");
    assert!(trending.len() <= 10);

    // Drafts endpoint returns only the caller's unpublished work.
    let res = client
        .get(format!("{base}/api/articles/user/drafts"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);
    let drafts: Value = res.json().await.unwrap();
    let drafts = drafts.as_array().unwrap();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0]["slug"], "secret-draft");

    // Public profile lists only published articles.
    let res = reqwest::get(format!("{base}/api/users/ivan")).await.unwrap();
    assert_eq!(res.status(), 200);
    let profile: Value = res.json().await.unwrap();
    assert_eq!(profile["user"]["username"], "ivan");
    assert_eq!(profile["articles"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn deleting_an_article_removes_its_comments() {
    let base = spawn_app("cascade").await;
    let client = reqwest::Client::new();
    let token = register(&client, &base, "judy").await;

    let article = create_article(
        &client,
        &base,
        &token,
        json!({"title": "Short lived", "content": "body", "published": true}),
    )
    .await;
    let slug = article["slug"].as_str().unwrap();

    let res = client
        .post(format!("{base}/api/articles/{slug}/comments"))
        .bearer_auth(&token)
        .json(&json!({"content": "goodbye"}))
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 201);

    let res = client
        .delete(format!("{base}/api/articles/{slug}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(res.status(), 200);

    let res = reqwest::get(format!("{base}/api/articles/{slug}/comments"))
        .await
        .unwrap();
    assert_eq!(res.status(), 404);
}
