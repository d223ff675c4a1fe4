//! The seam between the narrator and the network.

use async_trait::async_trait;
use gemini::{Gemini, Request};
use std::time::Duration;

/// Delivers one prompt to one model and returns the raw candidate text.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, gemini::Error>;
}

#[async_trait]
impl Transport for Gemini {
    async fn send(
        &self,
        credential: &str,
        model: &str,
        prompt: &str,
        timeout: Duration,
    ) -> Result<String, gemini::Error> {
        let request = Request::new(prompt)
            .with_model(model)
            .with_timeout(timeout);
        self.generate_text(credential, &request).await
    }
}
