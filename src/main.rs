//! GlamScan - Social fashion backend

use anyhow::Result;
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use glamscan::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxCommentRepository, SqlxFriendRepository, SqlxMessageRepository,
            SqlxNotificationRepository, SqlxPostRepository, SqlxSavedItemRepository,
            SqlxSessionRepository, SqlxStyleComboRepository, SqlxUserRepository,
        },
    },
    services::{
        affiliate::AffiliateTagger,
        comment::CommentService,
        friend::FriendService,
        message::MessageService,
        notification::NotificationService,
        post::PostService,
        saved_item::SavedItemService,
        style_combo::StyleComboService,
        stylist::{HttpStylistClient, StylistService},
        user::UserService,
        LoginRateLimiter,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "glamscan=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting GlamScan backend...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    config.validate()?;
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {}", config.database.url);

    // Run migrations
    let applied = db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed ({} applied)", applied);

    // Create repositories
    let user_repo = SqlxUserRepository::boxed(pool.clone());
    let session_repo = SqlxSessionRepository::boxed(pool.clone());
    let post_repo = SqlxPostRepository::boxed(pool.clone());
    let comment_repo = SqlxCommentRepository::boxed(pool.clone());
    let friend_repo = SqlxFriendRepository::boxed(pool.clone());
    let message_repo = SqlxMessageRepository::boxed(pool.clone());
    let notification_repo = SqlxNotificationRepository::boxed(pool.clone());
    let style_combo_repo = SqlxStyleComboRepository::boxed(pool.clone());
    let saved_item_repo = SqlxSavedItemRepository::boxed(pool.clone());

    // Initialize services
    let user_service = Arc::new(UserService::with_session_expiration(
        user_repo.clone(),
        session_repo,
        config.session.lifetime_days,
    ));
    let post_service = Arc::new(PostService::new(
        post_repo.clone(),
        user_repo.clone(),
        notification_repo.clone(),
    ));
    let comment_service = Arc::new(CommentService::new(
        comment_repo,
        post_repo.clone(),
        user_repo.clone(),
        notification_repo.clone(),
    ));
    let friend_service = Arc::new(FriendService::new(
        friend_repo.clone(),
        user_repo.clone(),
        notification_repo.clone(),
    ));
    let message_service = Arc::new(MessageService::new(
        message_repo,
        friend_repo,
        user_repo.clone(),
        notification_repo.clone(),
    ));
    let notification_service = Arc::new(NotificationService::new(notification_repo));

    let tagger = AffiliateTagger::new(&config.affiliate.tag);
    let style_combo_service = Arc::new(StyleComboService::new(style_combo_repo.clone(), tagger));
    let saved_item_service = Arc::new(SavedItemService::new(
        saved_item_repo,
        post_repo,
        style_combo_repo,
    ));

    let stylist_client = HttpStylistClient::boxed(&config.stylist)?;
    let stylist_service = Arc::new(StylistService::new(
        stylist_client,
        style_combo_service.clone(),
    ));
    tracing::info!("Stylist provider: {}", config.stylist.base_url);

    let rate_limiter = Arc::new(LoginRateLimiter::new());

    // Build application state
    let state = AppState {
        user_service: user_service.clone(),
        post_service,
        comment_service,
        friend_service,
        message_service,
        notification_service,
        style_combo_service,
        saved_item_service,
        stylist_service,
        rate_limiter: rate_limiter.clone(),
        session_lifetime_days: config.session.lifetime_days,
    };

    // Rate limiter cleanup task (runs every 5 minutes)
    {
        let limiter = rate_limiter.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(300));
            loop {
                interval.tick().await;
                limiter.cleanup().await;
            }
        });
    }

    // Expired session sweep (runs hourly)
    {
        let users = user_service.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(tokio::time::Duration::from_secs(3600));
            loop {
                interval.tick().await;
                match users.cleanup_expired_sessions().await {
                    Ok(0) => {}
                    Ok(n) => tracing::info!("Swept {} expired sessions", n),
                    Err(e) => tracing::warn!("Session sweep failed: {}", e),
                }
            }
        });
    }

    // Build router
    let app = api::build_router(state, &config.server.cors_origin);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
