//! Repository layer
//!
//! One trait per aggregate with a SQLx-backed implementation. Services hold
//! `Arc<dyn ...Repository>` so tests can substitute fakes.

pub mod comment;
pub mod friend;
pub mod message;
pub mod notification;
pub mod post;
pub mod saved_item;
pub mod session;
pub mod style_combo;
pub mod user;

pub use comment::{CommentRepository, SqlxCommentRepository};
pub use friend::{FriendRepository, SqlxFriendRepository};
pub use message::{MessageRepository, SqlxMessageRepository};
pub use notification::{NotificationRepository, SqlxNotificationRepository};
pub use post::{PostRepository, SqlxPostRepository};
pub use saved_item::{SavedItemRepository, SqlxSavedItemRepository};
pub use session::{SessionRepository, SqlxSessionRepository};
pub use style_combo::{SqlxStyleComboRepository, StyleComboRepository};
pub use user::{SqlxUserRepository, UserRepository};
