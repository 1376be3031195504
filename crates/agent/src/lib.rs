//! The dispatch path of relaybot.
//!
//! An inbound event flows through:
//!
//! 1. **Window** the user's recent turns from the conversation store
//! 2. **Build** the request: history, then the new prompt (optionally with an image)
//! 3. **Dispatch** to the model backend
//! 4. **Log** the user turn and the assistant turn
//! 5. **Reply** through the channel
//!
//! Slash commands short-circuit this path and are answered directly.

pub mod assistant;
pub mod builder;
pub mod exchange;

pub use assistant::{parse_command, serve, Assistant, Handled};
pub use builder::{select_model, BuiltRequest, ImagePayload, RequestBuilder, TEXT_MODEL, VISION_MODEL};
pub use exchange::{Exchange, ExchangeOutcome, ExchangeState};
