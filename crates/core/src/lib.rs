//! Domain types, prompt construction and model-reply extraction shared by
//! every roomcraft crate.
//!
//! Nothing in this crate performs I/O: the prompt builders and the response
//! extractor are pure functions so they can be tested without a provider.

pub mod error;
pub mod extraction;
pub mod prompts;
pub mod room;
pub mod stage;
pub mod types;
