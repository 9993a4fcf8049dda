//! Domain models
//!
//! Plain entity structs mirroring the relational schema, plus the input
//! structs the services accept.

pub mod comment;
pub mod friend;
pub mod message;
pub mod notification;
pub mod post;
pub mod saved_item;
pub mod session;
pub mod style_combo;
pub mod user;

pub use comment::{Comment, CommentWithMeta, CreateCommentInput};
pub use friend::{Friend, FriendRequestView, FriendStatus, FriendView};
pub use message::{Conversation, ConversationSummary, Message};
pub use notification::{Notification, NotificationKind};
pub use post::{CreatePostInput, Post, PostWithVotes, ProductTag, Vote, VoteValue};
pub use saved_item::{SavedItem, SavedTargetType};
pub use session::Session;
pub use style_combo::{
    CreateStyleComboInput, StyleCombo, StyleComboItem, StyleComboItemInput, StyleComboWithItems,
};
pub use user::{CreateUserInput, UpdateProfileInput, User};
