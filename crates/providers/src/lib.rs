//! Model backend providers for relaybot.
//!
//! All providers implement the `relaybot_core::Provider` trait. The
//! [`DispatchClient`] wraps the configured provider with fixed generation
//! parameters and user-safe error mapping.

pub mod dispatch;
pub mod openai_compat;

pub use dispatch::DispatchClient;
pub use openai_compat::OpenAiCompatProvider;
