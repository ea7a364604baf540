pub mod book;
pub mod comment;
pub mod notification;
pub mod review;
pub mod social;
pub mod user;

pub use book::{BookDetails, BookSource, CustomBook, DashboardBooks, RecommendedBook};
pub use comment::{Comment, CommentLikeOutcome, CommentPage, CommentView, LikeAction};
pub use notification::{NotificationKind, NotificationView, TargetType};
pub use review::{
    BookReview, ReactionKind, ReactionStatus, Review, ReviewDetail, ReviewStats, UserReview,
};
pub use social::{FollowState, FollowerEntry, FollowersPage, FollowingEntry, FollowingPage};
pub use user::{UserProfile, UserSummary};
