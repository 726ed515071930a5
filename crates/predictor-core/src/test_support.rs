//! Test doubles shared by the crate's unit tests

use async_trait::async_trait;
use mockall::mock;
use predictor_llm::{
    CompletionRequest, CompletionResponse, LLMProvider, Message, StopReason, TokenUsage,
};

mock! {
    pub Provider {}

    #[async_trait]
    impl LLMProvider for Provider {
        async fn complete(&self, request: CompletionRequest) -> predictor_llm::Result<CompletionResponse>;
        fn name(&self) -> &'static str;
    }
}

/// A successful completion carrying `text`
pub fn completion(text: &str) -> CompletionResponse {
    CompletionResponse {
        message: Message::assistant(text),
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage {
            input_tokens: 40,
            output_tokens: 20,
        },
    }
}
