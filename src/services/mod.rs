//! Services layer - Business logic
//!
//! Services implement the business rules on top of the repositories:
//! validation, ownership checks, notification fan-out, and the AI stylist
//! integration. Handlers talk to services, never to repositories directly.

pub mod affiliate;
pub mod comment;
pub mod friend;
pub mod message;
pub mod notification;
pub mod password;
pub mod post;
pub mod rate_limiter;
pub mod recommend;
pub mod saved_item;
pub mod style_combo;
pub mod stylist;
pub mod user;

pub use affiliate::AffiliateTagger;
pub use comment::{CommentService, CommentServiceError};
pub use friend::{FriendService, FriendServiceError};
pub use message::{MessageService, MessageServiceError};
pub use notification::NotificationService;
pub use password::{hash_password, verify_password};
pub use post::{PostService, PostServiceError};
pub use rate_limiter::LoginRateLimiter;
pub use recommend::{rank_by_similarity, RankedCombo};
pub use saved_item::{SavedItemService, SavedItemServiceError};
pub use style_combo::{StyleComboService, StyleComboServiceError};
pub use stylist::{
    HttpStylistClient, StyleProfile, StylistClient, StylistService, StylistServiceError,
};
pub use user::{LoginInput, RegisterInput, UserService, UserServiceError};
