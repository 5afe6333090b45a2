mod auth;
mod likes;
mod optimistic;
mod session;

pub use auth::{FileTokenStore, MemoryTokenStore, TOKEN_FILE_NAME, TokenManager, TokenStore};
pub use likes::LikedSongs;
pub use optimistic::{MutationState, Optimistic, Outcome, PendingMutation};
pub use session::{SESSION_FILE_NAME, SessionCache};
