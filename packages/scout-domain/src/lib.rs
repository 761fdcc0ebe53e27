pub mod candidate;
pub mod conversation;
pub mod principal;
pub mod prompt;
pub mod query;

pub use candidate::{CandidateRecord, Education, Experience};
pub use conversation::{ConversationContext, ConversationThread, MatchSummary, Turn, TurnRole};
pub use principal::{Principal, Role};
