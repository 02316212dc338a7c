pub mod chat_completions;
pub mod prompt;

use std::future::Future;

use crate::analysis::AnalysisResult;
use crate::error::AnalyzeError;

pub use chat_completions::{parse_completion, ChatCompletionsClient};
pub use prompt::build_prompt;

/// Turns an ingredient list into a structured analysis
pub trait IngredientAnalyzer: Send + Sync {
    fn analyze(
        &self,
        ingredients: &[String],
    ) -> impl Future<Output = Result<AnalysisResult, AnalyzeError>> + Send;
}
