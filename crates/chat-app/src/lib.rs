#![deny(unsafe_code)]

/// Conversation model, store, and the exchange controller.
pub mod chat;
/// Settings persistence for the completion endpoint.
pub mod settings;
