pub mod context;
pub mod dispatch;
pub mod transcript;

pub use context::ConversationContext;
pub use dispatch::{execute_batch, invoke_direct, DispatchLoop, ExecutedCall, TurnMode, TurnReport};
pub use transcript::Transcript;
