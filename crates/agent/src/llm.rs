use anyhow::Result;
use async_trait::async_trait;
use tokenize_core::TurnInput;

/// Produces raw reply text, possibly carrying inline markup, for one turn.
///
/// The keyword responder is the in-process implementation; a network-backed
/// model client would implement the same trait.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(&self, input: &TurnInput) -> Result<String>;
}

#[async_trait]
impl<G> ResponseGenerator for std::sync::Arc<G>
where
    G: ResponseGenerator + ?Sized,
{
    async fn generate(&self, input: &TurnInput) -> Result<String> {
        (**self).generate(input).await
    }
}
