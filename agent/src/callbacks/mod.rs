use crate::Result;
use crate::llm::Message;
use async_trait::async_trait;

mod logger;
pub use logger::TranscriptLogger;

/// Runs after every agent step with the full history. May rewrite it.
#[async_trait]
pub trait Callback {
    async fn call(&mut self, messages: Vec<Message>) -> Result<Vec<Message>>;
}
