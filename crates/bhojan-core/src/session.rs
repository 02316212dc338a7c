//! The send pipeline: one user turn from raw input to assistant reply.

use std::path::PathBuf;

use tracing::{error, info};

use crate::ai::IngredientAnalyzer;
use crate::analysis::AnalysisResult;
use crate::error::AnalyzeError;
use crate::history::HistoryItem;
use crate::ingredients::parse_ingredients;
use crate::ocr::TextRecognizer;
use crate::state::{ChatMessage, ChatRole};

/// Shown in place of an analysis whenever any step of a turn fails
pub const FALLBACK_MESSAGE: &str = "I couldn't reliably infer the product's alignment from this input. \
More context or clearer ingredient patterns may be needed.";

/// Ingredients quoted in a history entry's summary line
const SUMMARY_INGREDIENTS: usize = 3;

/// What the user submitted for one turn
#[derive(Debug, Clone, PartialEq)]
pub struct TurnInput {
    pub text: String,
    pub image: Option<PathBuf>,
}

/// The assistant side of a finished turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub message: ChatMessage,
    pub ingredients: Vec<String>,
}

impl TurnOutcome {
    pub fn fallback() -> Self {
        Self {
            message: ChatMessage::assistant(FALLBACK_MESSAGE, None),
            ingredients: Vec::new(),
        }
    }

    pub fn analysis(&self) -> Option<&AnalysisResult> {
        self.message.analysis.as_ref()
    }
}

/// Run OCR (when an image is attached), parse, analyze and summarize.
///
/// Never fails: every error is logged and replaced by [`FALLBACK_MESSAGE`].
pub async fn run_turn<R, A>(recognizer: &R, analyzer: &A, input: TurnInput) -> TurnOutcome
where
    R: TextRecognizer,
    A: IngredientAnalyzer,
{
    match analyze_turn(recognizer, analyzer, &input).await {
        Ok((ingredients, analysis, summary)) => TurnOutcome {
            message: ChatMessage::assistant(summary, Some(analysis)),
            ingredients,
        },
        Err(e) => {
            error!("ingredient analysis failed: {}", e);
            TurnOutcome::fallback()
        }
    }
}

async fn analyze_turn<R, A>(
    recognizer: &R,
    analyzer: &A,
    input: &TurnInput,
) -> Result<(Vec<String>, AnalysisResult, String), AnalyzeError>
where
    R: TextRecognizer,
    A: IngredientAnalyzer,
{
    // An attached label replaces whatever was typed
    let text = match &input.image {
        Some(path) => recognizer.recognize(path).await?,
        None => input.text.clone(),
    };

    let ingredients = parse_ingredients(&text);
    info!(count = ingredients.len(), "analyzing ingredient list");

    let analysis = analyzer.analyze(&ingredients).await?;
    let summary = analysis.summary_text().ok_or(AnalyzeError::MissingIntent)?;

    Ok((ingredients, analysis, summary))
}

/// Messages of the conversation currently on screen
#[derive(Debug, Default, Clone)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Append the user's message and hand back the turn to run.
    ///
    /// Blank text with no image is ignored and appends nothing.
    pub fn submit(&mut self, text: &str, image: Option<PathBuf>) -> Option<TurnInput> {
        if text.trim().is_empty() && image.is_none() {
            return None;
        }

        self.messages.push(ChatMessage::user(text, image.clone()));
        Some(TurnInput {
            text: text.to_string(),
            image,
        })
    }

    /// Append the assistant reply; a successful analysis also yields the
    /// history entry to persist.
    pub fn complete(&mut self, outcome: TurnOutcome) -> Option<HistoryItem> {
        let TurnOutcome { message, ingredients } = outcome;
        self.messages.push(message);

        let analysis = self.messages.last()?.analysis.as_ref()?;
        let intent = analysis.inferred_intent.as_ref()?;

        Some(HistoryItem::new(
            history_summary(&intent.label, &ingredients),
            analysis.overall_assessment.clone(),
            self.messages.clone(),
        ))
    }

    pub fn restore(&mut self, item: &HistoryItem) {
        self.messages = item.messages.clone();
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn last_assistant(&self) -> Option<&ChatMessage> {
        self.messages.iter().rev().find(|m| m.role == ChatRole::Assistant)
    }
}

fn history_summary(label: &str, ingredients: &[String]) -> String {
    if ingredients.is_empty() {
        return label.to_string();
    }

    let mut listed = ingredients
        .iter()
        .take(SUMMARY_INGREDIENTS)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if ingredients.len() > SUMMARY_INGREDIENTS {
        listed.push_str(", …");
    }
    format!("{} · {}", label, listed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::parse_completion;
    use std::path::Path;
    use std::sync::Mutex;

    const GOOD_REPLY: &str = r#"{
        "inferred_intent": {"label": "energy_focus", "confidence": 0.72, "reasoning": ["Caffeine present"]},
        "primary_conflicts": [],
        "secondary_tradeoffs": [],
        "overall_assessment": "A stimulation-forward drink.",
        "uncertainty_notes": []
    }"#;

    struct FakeOcr {
        text: Option<&'static str>,
    }

    impl TextRecognizer for FakeOcr {
        async fn recognize(&self, _image: &Path) -> Result<String, AnalyzeError> {
            self.text
                .map(str::to_string)
                .ok_or_else(|| AnalyzeError::Ocr("engine crashed".to_string()))
        }
    }

    struct FakeAnalyzer {
        reply: &'static str,
        seen: Mutex<Vec<Vec<String>>>,
    }

    impl FakeAnalyzer {
        fn new(reply: &'static str) -> Self {
            Self { reply, seen: Mutex::new(Vec::new()) }
        }
    }

    impl IngredientAnalyzer for FakeAnalyzer {
        async fn analyze(&self, ingredients: &[String]) -> Result<AnalysisResult, AnalyzeError> {
            self.seen.lock().unwrap().push(ingredients.to_vec());
            parse_completion(self.reply)
        }
    }

    fn text_turn(text: &str) -> TurnInput {
        TurnInput { text: text.to_string(), image: None }
    }

    #[test]
    fn test_blank_submit_is_noop() {
        let mut conversation = Conversation::new();
        assert!(conversation.submit("", None).is_none());
        assert!(conversation.submit("   \n\t", None).is_none());
        assert!(conversation.is_empty());
    }

    #[test]
    fn test_image_only_submit_is_accepted() {
        let mut conversation = Conversation::new();
        let turn = conversation.submit("", Some(PathBuf::from("label.jpg"))).unwrap();
        assert_eq!(turn.image.as_deref(), Some(Path::new("label.jpg")));
        assert_eq!(conversation.messages().len(), 1);
        assert_eq!(conversation.messages()[0].role, ChatRole::User);
    }

    #[tokio::test]
    async fn test_successful_turn_summarizes() {
        let analyzer = FakeAnalyzer::new(GOOD_REPLY);
        let outcome = run_turn(&FakeOcr { text: None }, &analyzer, text_turn("water, caffeine ,, taurine")).await;

        assert_eq!(outcome.ingredients, vec!["water", "caffeine", "taurine"]);
        assert!(outcome.message.content.starts_with("Inferred intent: energy_focus\nConfidence: 72%"));
        assert!(outcome.analysis().is_some());
        assert_eq!(analyzer.seen.lock().unwrap()[0], vec!["water", "caffeine", "taurine"]);
    }

    #[tokio::test]
    async fn test_malformed_model_output_yields_fallback() {
        let analyzer = FakeAnalyzer::new("I think this is a protein bar!");
        let outcome = run_turn(&FakeOcr { text: None }, &analyzer, text_turn("whey, cocoa")).await;

        assert_eq!(outcome.message.role, ChatRole::Assistant);
        assert_eq!(outcome.message.content, FALLBACK_MESSAGE);
        assert!(outcome.analysis().is_none());
    }

    #[tokio::test]
    async fn test_missing_intent_yields_fallback() {
        let analyzer = FakeAnalyzer::new(r#"{"overall_assessment": "balanced"}"#);
        let outcome = run_turn(&FakeOcr { text: None }, &analyzer, text_turn("oats")).await;
        assert_eq!(outcome.message.content, FALLBACK_MESSAGE);
    }

    #[tokio::test]
    async fn test_image_text_replaces_typed_text() {
        let analyzer = FakeAnalyzer::new(GOOD_REPLY);
        let input = TurnInput {
            text: "ignored, typed".to_string(),
            image: Some(PathBuf::from("label.png")),
        };
        run_turn(&FakeOcr { text: Some("Sugar, Guarana\nExtract, Water") }, &analyzer, input).await;

        assert_eq!(analyzer.seen.lock().unwrap()[0], vec!["Sugar", "Guarana\nExtract", "Water"]);
    }

    #[tokio::test]
    async fn test_ocr_failure_yields_fallback_without_calling_model() {
        let analyzer = FakeAnalyzer::new(GOOD_REPLY);
        let input = TurnInput { text: String::new(), image: Some(PathBuf::from("label.png")) };
        let outcome = run_turn(&FakeOcr { text: None }, &analyzer, input).await;

        assert_eq!(outcome.message.content, FALLBACK_MESSAGE);
        assert!(analyzer.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_complete_builds_history_item_only_on_success() {
        let analyzer = FakeAnalyzer::new(GOOD_REPLY);
        let ocr = FakeOcr { text: None };
        let mut conversation = Conversation::new();

        let turn = conversation.submit("water, caffeine, taurine, sugar", None).unwrap();
        let item = conversation.complete(run_turn(&ocr, &analyzer, turn).await).unwrap();
        assert_eq!(item.summary, "energy_focus · water, caffeine, taurine, …");
        assert_eq!(item.overall_assessment, "A stimulation-forward drink.");
        assert_eq!(item.messages.len(), 2);

        conversation.submit("???", None).unwrap();
        assert!(conversation.complete(TurnOutcome::fallback()).is_none());
        assert_eq!(conversation.messages().len(), 4);
        assert_eq!(conversation.last_assistant().unwrap().content, FALLBACK_MESSAGE);
    }

    #[test]
    fn test_restore_replaces_messages() {
        let mut conversation = Conversation::new();
        conversation.submit("salt", None);

        let item = HistoryItem::new(
            "general_health · oats".to_string(),
            "Balanced.".to_string(),
            vec![
                ChatMessage::user("oats", None),
                ChatMessage::assistant("Inferred intent: general_health", None),
            ],
        );
        conversation.restore(&item);
        assert_eq!(conversation.messages(), item.messages.as_slice());
    }

    #[test]
    fn test_history_summary_short_lists() {
        assert_eq!(history_summary("fat_loss", &[]), "fat_loss");
        assert_eq!(
            history_summary("fat_loss", &["glucomannan".to_string(), "water".to_string()]),
            "fat_loss · glucomannan, water"
        );
    }
}
