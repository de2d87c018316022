// Domain services layered over the store, cache and social graph
pub mod comments;
pub mod interaction;
pub mod likes;
pub mod notifications;
pub mod posts;

pub use comments::CommentTree;
pub use interaction::{HealthReport, InteractionService};
pub use likes::LikeManager;
pub use notifications::{FanoutNotifier, FanoutOutcome, FanoutReport};
pub use posts::PostManager;
