//! API layer - HTTP handlers and routing
//!
//! All endpoints live under the `/_api` prefix:
//! - Auth (register/login/logout/me)
//! - User profiles
//! - Posts and Hot-or-Not voting
//! - Comments
//! - Friends
//! - Conversations and messages
//! - Notifications
//! - Style combos
//! - Saved items
//! - AI stylist

pub mod auth;
pub mod comments;
pub mod common;
pub mod friends;
pub mod messages;
pub mod middleware;
pub mod notifications;
pub mod posts;
pub mod saved_items;
pub mod style_combos;
pub mod stylist;
pub mod users;

use axum::{
    http::{header, HeaderValue, Method},
    middleware as axum_middleware,
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub use middleware::{ApiError, AppState, AuthenticatedUser};

/// Build the main API router
pub fn build_api_router(state: AppState) -> Router<AppState> {
    // Protected routes (need a valid session)
    let protected_routes = Router::new()
        .nest("/auth", auth::protected_router())
        .nest("/users", users::protected_router())
        .nest("/posts", posts::protected_router())
        .nest("/comments", comments::protected_router())
        .nest("/friends", friends::router())
        .nest("/messages", messages::router())
        .nest("/notifications", notifications::router())
        .nest("/style-combos", style_combos::protected_router())
        .nest("/saved-items", saved_items::router())
        .nest("/stylist", stylist::router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    // Single-post reads work logged-out but include the viewer's vote
    // when a session is present
    let optional_auth_routes = Router::new()
        .nest("/posts", posts::public_router())
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::optional_auth,
        ));

    // Public routes
    Router::new()
        .nest("/auth", auth::public_router())
        .nest("/users", users::public_router())
        .nest("/comments", comments::public_router())
        .nest("/style-combos", style_combos::public_router())
        .merge(optional_auth_routes)
        .merge(protected_routes)
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, cors_origin: &str) -> Router {
    let cors = match cors_origin.parse::<HeaderValue>() {
        Ok(origin) => CorsLayer::new()
            .allow_origin(origin)
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION, header::COOKIE])
            .allow_credentials(true),
        Err(e) => {
            tracing::warn!("Invalid CORS origin {:?}, allowing none: {}", cors_origin, e);
            CorsLayer::new()
        }
    };

    Router::new()
        .nest("/_api", build_api_router(state.clone()))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum_test::TestServer;
    use serde_json::{json, Value};

    use crate::db::repositories::{
        SqlxCommentRepository, SqlxFriendRepository, SqlxMessageRepository,
        SqlxNotificationRepository, SqlxPostRepository, SqlxSavedItemRepository,
        SqlxSessionRepository, SqlxStyleComboRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::services::{
        affiliate::AffiliateTagger, comment::CommentService, friend::FriendService,
        message::MessageService, notification::NotificationService, post::PostService,
        saved_item::SavedItemService, style_combo::StyleComboService,
        stylist::{StylistClient, StylistService},
        user::UserService, LoginRateLimiter,
    };

    struct StubStylist;

    #[async_trait::async_trait]
    impl StylistClient for StubStylist {
        async fn chat(
            &self,
            _system: &str,
            _user_text: &str,
            _image_url: Option<&str>,
        ) -> anyhow::Result<String> {
            Ok(json!({
                "season": "Warm autumn",
                "palette": ["rust", "camel"],
                "outfit_suggestions": ["camel knit"],
                "makeup_suggestions": ["peach blush"],
                "search_terms": ["camel knit sweater"]
            })
            .to_string())
        }

        async fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
            // Deterministic 2-axis vector so ranking is stable
            let warm = text.to_lowercase().matches("warm").count() as f32 + 1.0;
            Ok(vec![warm, 1.0])
        }
    }

    async fn test_server() -> TestServer {
        let pool = create_test_pool().await.expect("pool");
        migrations::run_migrations(&pool).await.expect("migrations");

        let user_repo = SqlxUserRepository::boxed(pool.clone());
        let session_repo = SqlxSessionRepository::boxed(pool.clone());
        let post_repo = SqlxPostRepository::boxed(pool.clone());
        let comment_repo = SqlxCommentRepository::boxed(pool.clone());
        let friend_repo = SqlxFriendRepository::boxed(pool.clone());
        let message_repo = SqlxMessageRepository::boxed(pool.clone());
        let notification_repo = SqlxNotificationRepository::boxed(pool.clone());
        let style_combo_repo = SqlxStyleComboRepository::boxed(pool.clone());
        let saved_item_repo = SqlxSavedItemRepository::boxed(pool.clone());

        let user_service = Arc::new(UserService::new(user_repo.clone(), session_repo));
        let style_combo_service = Arc::new(StyleComboService::new(
            style_combo_repo.clone(),
            AffiliateTagger::new("glamscan-20"),
        ));

        let state = AppState {
            user_service: user_service.clone(),
            post_service: Arc::new(PostService::new(
                post_repo.clone(),
                user_repo.clone(),
                notification_repo.clone(),
            )),
            comment_service: Arc::new(CommentService::new(
                comment_repo,
                post_repo.clone(),
                user_repo.clone(),
                notification_repo.clone(),
            )),
            friend_service: Arc::new(FriendService::new(
                friend_repo.clone(),
                user_repo.clone(),
                notification_repo.clone(),
            )),
            message_service: Arc::new(MessageService::new(
                message_repo,
                friend_repo,
                user_repo.clone(),
                notification_repo.clone(),
            )),
            notification_service: Arc::new(NotificationService::new(notification_repo)),
            style_combo_service: style_combo_service.clone(),
            saved_item_service: Arc::new(SavedItemService::new(
                saved_item_repo,
                post_repo,
                style_combo_repo,
            )),
            stylist_service: Arc::new(StylistService::new(
                Arc::new(StubStylist),
                style_combo_service,
            )),
            rate_limiter: Arc::new(LoginRateLimiter::new()),
            session_lifetime_days: 30,
        };

        let app = build_router(state, "http://localhost:3000");
        TestServer::new(app).expect("test server")
    }

    async fn register(server: &TestServer, username: &str) -> (i64, String) {
        let response = server
            .post("/_api/auth/register")
            .json(&json!({
                "username": username,
                "email": format!("{}@example.com", username),
                "password": "hunter2secret"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CREATED);
        let body: Value = response.json();
        (
            body["user"]["id"].as_i64().expect("user id"),
            body["token"].as_str().expect("token").to_string(),
        )
    }

    #[tokio::test]
    async fn test_register_login_me_flow() {
        let server = test_server().await;
        let (_, token) = register(&server, "mia").await;

        let me = server
            .get("/_api/auth/me")
            .authorization_bearer(&token)
            .await;
        me.assert_status_ok();
        let body: Value = me.json();
        assert_eq!(body["username"], "mia");
        assert_eq!(body["email"], "mia@example.com");

        let login = server
            .post("/_api/auth/login")
            .json(&json!({ "username_or_email": "mia", "password": "hunter2secret" }))
            .await;
        login.assert_status_ok();
    }

    #[tokio::test]
    async fn test_login_bad_password_is_generic_401() {
        let server = test_server().await;
        register(&server, "mia").await;

        let response = server
            .post("/_api/auth/login")
            .json(&json!({ "username_or_email": "mia", "password": "wrong-password" }))
            .await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
        let body: Value = response.json();
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");
        assert_eq!(body["error"]["message"], "Invalid username or password");
    }

    #[tokio::test]
    async fn test_login_rate_limited_after_failures() {
        let server = test_server().await;
        register(&server, "mia").await;

        for _ in 0..5 {
            server
                .post("/_api/auth/login")
                .json(&json!({ "username_or_email": "mia", "password": "wrong-password" }))
                .await
                .assert_status(axum::http::StatusCode::UNAUTHORIZED);
        }

        let limited = server
            .post("/_api/auth/login")
            .json(&json!({ "username_or_email": "mia", "password": "hunter2secret" }))
            .await;
        limited.assert_status(axum::http::StatusCode::TOO_MANY_REQUESTS);
        let body: Value = limited.json();
        assert_eq!(body["error"]["code"], "RATE_LIMITED");
        assert!(body["error"]["details"]["retry_after"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_duplicate_register_conflicts() {
        let server = test_server().await;
        register(&server, "mia").await;

        let response = server
            .post("/_api/auth/register")
            .json(&json!({
                "username": "mia",
                "email": "other@example.com",
                "password": "hunter2secret"
            }))
            .await;
        response.assert_status(axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn test_protected_routes_require_auth() {
        let server = test_server().await;

        let response = server.get("/_api/posts/feed").await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);

        let response = server.get("/_api/notifications").await;
        response.assert_status(axum::http::StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_post_vote_and_feed_exclusions() {
        let server = test_server().await;
        let (_, mia) = register(&server, "mia").await;
        let (_, noor) = register(&server, "noor").await;

        let created = server
            .post("/_api/posts")
            .authorization_bearer(&mia)
            .json(&json!({
                "image_url": "https://cdn.example.com/look.jpg",
                "caption": "Festival fit",
                "product_tags": []
            }))
            .await;
        created.assert_status(axum::http::StatusCode::CREATED);
        let post: Value = created.json();
        let post_id = post["id"].as_i64().expect("post id");

        // Own post never shows in the author's feed
        let feed: Value = server
            .get("/_api/posts/feed")
            .authorization_bearer(&mia)
            .await
            .json();
        assert_eq!(feed.as_array().unwrap().len(), 0);

        // Other users see it until they vote
        let feed: Value = server
            .get("/_api/posts/feed")
            .authorization_bearer(&noor)
            .await
            .json();
        assert_eq!(feed.as_array().unwrap().len(), 1);

        let voted = server
            .post(&format!("/_api/posts/{}/vote", post_id))
            .authorization_bearer(&noor)
            .json(&json!({ "value": 1 }))
            .await;
        voted.assert_status_ok();
        let voted: Value = voted.json();
        assert_eq!(voted["upvotes"], 1);
        assert_eq!(voted["my_vote"], 1);

        let feed: Value = server
            .get("/_api/posts/feed")
            .authorization_bearer(&noor)
            .await
            .json();
        assert_eq!(feed.as_array().unwrap().len(), 0);

        // Self-voting is rejected
        let own_vote = server
            .post(&format!("/_api/posts/{}/vote", post_id))
            .authorization_bearer(&mia)
            .json(&json!({ "value": 1 }))
            .await;
        own_vote.assert_status(axum::http::StatusCode::BAD_REQUEST);

        // The upvote produced a notification for the author
        let notifications: Value = server
            .get("/_api/notifications")
            .authorization_bearer(&mia)
            .await
            .json();
        let notifications = notifications.as_array().unwrap();
        assert_eq!(notifications.len(), 1);
        assert_eq!(notifications[0]["kind"], "vote");
    }

    #[tokio::test]
    async fn test_single_post_public_read() {
        let server = test_server().await;
        let (_, mia) = register(&server, "mia").await;

        let post: Value = server
            .post("/_api/posts")
            .authorization_bearer(&mia)
            .json(&json!({
                "image_url": "https://cdn.example.com/look.jpg",
                "product_tags": []
            }))
            .await
            .json();
        let post_id = post["id"].as_i64().expect("post id");

        // No session: readable, my_vote absent
        let anon = server.get(&format!("/_api/posts/{}", post_id)).await;
        anon.assert_status_ok();
        let body: Value = anon.json();
        assert!(body["my_vote"].is_null());
    }

    #[tokio::test]
    async fn test_messaging_requires_friendship() {
        let server = test_server().await;
        let (_, mia) = register(&server, "mia").await;
        let (noor_id, noor) = register(&server, "noor").await;

        let blocked = server
            .post("/_api/messages/conversations")
            .authorization_bearer(&mia)
            .json(&json!({ "user_id": noor_id }))
            .await;
        blocked.assert_status(axum::http::StatusCode::FORBIDDEN);

        // Friend up, then the conversation opens
        let request: Value = server
            .post("/_api/friends/requests")
            .authorization_bearer(&mia)
            .json(&json!({ "addressee_id": noor_id }))
            .await
            .json();
        let request_id = request["id"].as_i64().expect("request id");

        server
            .post(&format!("/_api/friends/requests/{}/respond", request_id))
            .authorization_bearer(&noor)
            .json(&json!({ "accept": true }))
            .await
            .assert_status_ok();

        let opened = server
            .post("/_api/messages/conversations")
            .authorization_bearer(&mia)
            .json(&json!({ "user_id": noor_id }))
            .await;
        opened.assert_status(axum::http::StatusCode::CREATED);
        let conversation: Value = opened.json();
        let conversation_id = conversation["id"].as_i64().expect("conversation id");

        server
            .post(&format!("/_api/messages/conversations/{}", conversation_id))
            .authorization_bearer(&mia)
            .json(&json!({ "body": "love that jacket" }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let unread: Value = server
            .get("/_api/messages/unread-count")
            .authorization_bearer(&noor)
            .await
            .json();
        assert_eq!(unread["unread"], 1);

        // Reading the page clears the badge
        server
            .get(&format!("/_api/messages/conversations/{}", conversation_id))
            .authorization_bearer(&noor)
            .await
            .assert_status_ok();

        let unread: Value = server
            .get("/_api/messages/unread-count")
            .authorization_bearer(&noor)
            .await
            .json();
        assert_eq!(unread["unread"], 0);
    }

    #[tokio::test]
    async fn test_style_combo_listing_is_affiliate_tagged() {
        let server = test_server().await;
        let (_, mia) = register(&server, "mia").await;

        server
            .post("/_api/style-combos")
            .authorization_bearer(&mia)
            .json(&json!({
                "title": "Warm autumn staples",
                "cover_image_url": "https://cdn.example.com/combo.jpg",
                "shop_url": "https://www.amazon.com/dp/B01",
                "items": [
                    { "label": "Camel coat", "url": "https://www.amazon.com/dp/B02" },
                    { "label": "Rust scarf", "url": "https://boutique.example.com/scarf" }
                ]
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let list: Value = server.get("/_api/style-combos").await.json();
        let combo = &list.as_array().unwrap()[0];
        assert!(combo["shop_url"].as_str().unwrap().contains("tag=glamscan-20"));
        assert!(combo["items"][0]["url"]
            .as_str()
            .unwrap()
            .contains("tag=glamscan-20"));
        // Non-Amazon item URLs stay untouched
        assert_eq!(
            combo["items"][1]["url"],
            "https://boutique.example.com/scarf"
        );
    }

    #[tokio::test]
    async fn test_stylist_recommend_and_match() {
        let server = test_server().await;
        let (_, mia) = register(&server, "mia").await;

        let profile = server
            .post("/_api/stylist/recommendations")
            .authorization_bearer(&mia)
            .json(&json!({ "image_url": "https://cdn.example.com/selfie.jpg" }))
            .await;
        profile.assert_status_ok();
        let profile: Value = profile.json();
        assert_eq!(profile["season"], "Warm autumn");

        server
            .post("/_api/style-combos")
            .authorization_bearer(&mia)
            .json(&json!({
                "title": "Warm staples",
                "cover_image_url": "https://cdn.example.com/combo.jpg",
                "shop_url": "https://boutique.example.com/shop",
                "items": [{ "label": "Coat", "url": "https://boutique.example.com/coat" }]
            }))
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let matched = server
            .post("/_api/stylist/match-combos")
            .authorization_bearer(&mia)
            .json(&json!({ "profile": profile }))
            .await;
        matched.assert_status_ok();
        let ranked: Value = matched.json();
        let ranked = ranked.as_array().unwrap();
        assert_eq!(ranked.len(), 1);
        assert!(ranked[0]["score"].as_f64().unwrap() > 0.0);
    }

    #[tokio::test]
    async fn test_saved_items_round_trip() {
        let server = test_server().await;
        let (_, mia) = register(&server, "mia").await;

        let post: Value = server
            .post("/_api/posts")
            .authorization_bearer(&mia)
            .json(&json!({
                "image_url": "https://cdn.example.com/look.jpg",
                "product_tags": []
            }))
            .await
            .json();
        let post_id = post["id"].as_i64().expect("post id");

        let body = json!({ "target_type": "post", "target_id": post_id });

        server
            .post("/_api/saved-items")
            .authorization_bearer(&mia)
            .json(&body)
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        // Saving again is a no-op success
        server
            .post("/_api/saved-items")
            .authorization_bearer(&mia)
            .json(&body)
            .await
            .assert_status(axum::http::StatusCode::CREATED);

        let saved: Value = server
            .get("/_api/saved-items")
            .authorization_bearer(&mia)
            .await
            .json();
        assert_eq!(saved.as_array().unwrap().len(), 1);

        server
            .delete("/_api/saved-items")
            .authorization_bearer(&mia)
            .json(&body)
            .await
            .assert_status(axum::http::StatusCode::NO_CONTENT);

        let missing = server
            .post("/_api/saved-items")
            .authorization_bearer(&mia)
            .json(&json!({ "target_type": "style_combo", "target_id": 9999 }))
            .await;
        missing.assert_status(axum::http::StatusCode::NOT_FOUND);
    }
}
