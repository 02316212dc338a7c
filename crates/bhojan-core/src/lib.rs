pub mod ai;
pub mod analysis;
pub mod config;
pub mod error;
pub mod history;
pub mod ingredients;
pub mod ocr;
pub mod provider;
pub mod session;
pub mod state;

// Re-export main types for convenience
pub use ai::{ChatCompletionsClient, IngredientAnalyzer};
pub use analysis::{AnalysisResult, IntentLabel, RiskLevel};
pub use config::Config;
pub use error::AnalyzeError;
pub use history::{HistoryItem, HistoryStore, HISTORY_LIMIT};
pub use ingredients::parse_ingredients;
pub use ocr::{TesseractOcr, TextRecognizer};
pub use provider::Provider;
pub use session::{run_turn, Conversation, TurnInput, TurnOutcome, FALLBACK_MESSAGE};
pub use state::{ChatMessage, ChatRole};
