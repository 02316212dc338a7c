//! Structured analysis returned by the model, plus presentation helpers.
//!
//! Nothing here validates the model's output: labels, confidences and risk
//! levels are carried as the model wrote them. The helpers only classify
//! strings for display.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisResult {
    pub inferred_intent: Option<InferredIntent>,
    pub primary_conflicts: Vec<Conflict>,
    pub secondary_tradeoffs: Vec<Tradeoff>,
    pub overall_assessment: String,
    pub uncertainty_notes: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InferredIntent {
    pub label: String,
    pub confidence: f64,
    pub reasoning: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Conflict {
    pub ingredient: String,
    pub risk_level: String,
    pub why_it_matters: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tradeoff {
    pub ingredient: String,
    pub explanation: String,
}

impl InferredIntent {
    /// Confidence as a whole percentage, rounded half away from zero
    pub fn confidence_percent(&self) -> i64 {
        (self.confidence * 100.0).round() as i64
    }

    pub fn kind(&self) -> IntentLabel {
        IntentLabel::parse(&self.label)
    }
}

impl Conflict {
    pub fn risk(&self) -> RiskLevel {
        RiskLevel::parse(&self.risk_level)
    }
}

impl AnalysisResult {
    /// Plain-text co-pilot summary shown in the chat and printed by the CLI.
    ///
    /// `None` when the model omitted `inferred_intent`; callers treat that the
    /// same as an unusable reply.
    pub fn summary_text(&self) -> Option<String> {
        let intent = self.inferred_intent.as_ref()?;

        let mut sections = vec![
            format!(
                "Inferred intent: {}\nConfidence: {}%",
                intent.label,
                intent.confidence_percent()
            ),
            self.overall_assessment.clone(),
        ];

        if !self.primary_conflicts.is_empty() {
            sections.push(bulleted(
                "Alignment frictions:",
                self.primary_conflicts.iter().map(|c| c.why_it_matters.as_str()),
            ));
        }
        if !self.secondary_tradeoffs.is_empty() {
            sections.push(bulleted(
                "Tradeoffs:",
                self.secondary_tradeoffs.iter().map(|t| t.explanation.as_str()),
            ));
        }
        if !self.uncertainty_notes.is_empty() {
            sections.push(bulleted(
                "Uncertainty:",
                self.uncertainty_notes.iter().map(String::as_str),
            ));
        }

        Some(
            sections
                .into_iter()
                .filter(|s| !s.trim().is_empty())
                .collect::<Vec<_>>()
                .join("\n\n"),
        )
    }

    /// Card footer status: "Verified" or "N uncertainties"
    pub fn uncertainty_status(&self) -> String {
        match self.uncertainty_notes.len() {
            0 => "Verified".to_string(),
            1 => "1 uncertainty".to_string(),
            n => format!("{} uncertainties", n),
        }
    }
}

fn bulleted<'a>(heading: &str, items: impl Iterator<Item = &'a str>) -> String {
    let mut out = heading.to_string();
    for item in items {
        out.push_str("\n• ");
        out.push_str(item);
    }
    out
}

/// Known intent labels, used to pick an icon and colour
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntentLabel {
    MuscleBuilding,
    FatLoss,
    AllergyAvoidance,
    DietaryConstraint,
    DigestiveComfort,
    EnergyFocus,
    MedicalManagement,
    GeneralHealth,
    Other,
}

impl IntentLabel {
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "muscle_building" => IntentLabel::MuscleBuilding,
            "fat_loss" => IntentLabel::FatLoss,
            "allergy_avoidance" => IntentLabel::AllergyAvoidance,
            "dietary_constraint" => IntentLabel::DietaryConstraint,
            "digestive_comfort" => IntentLabel::DigestiveComfort,
            "energy_focus" => IntentLabel::EnergyFocus,
            "medical_management" => IntentLabel::MedicalManagement,
            "general_health" => IntentLabel::GeneralHealth,
            _ => IntentLabel::Other,
        }
    }

    pub fn icon(&self) -> &'static str {
        match self {
            IntentLabel::MuscleBuilding => "💪",
            IntentLabel::FatLoss => "⚖",
            IntentLabel::AllergyAvoidance => "🛡",
            IntentLabel::DietaryConstraint => "🌿",
            IntentLabel::DigestiveComfort => "🍃",
            IntentLabel::EnergyFocus => "⚡",
            IntentLabel::MedicalManagement => "❤",
            IntentLabel::GeneralHealth => "✓",
            IntentLabel::Other => "✦",
        }
    }
}

/// Qualitative alignment-mismatch indicator. Not a safety signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Unknown,
}

impl RiskLevel {
    pub fn parse(level: &str) -> Self {
        match level.trim().to_lowercase().as_str() {
            "low" => RiskLevel::Low,
            "medium" => RiskLevel::Medium,
            "high" => RiskLevel::High,
            _ => RiskLevel::Unknown,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RiskLevel::Low => "LOW",
            RiskLevel::Medium => "MEDIUM",
            RiskLevel::High => "HIGH",
            RiskLevel::Unknown => "?",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AnalysisResult {
        serde_json::from_str(
            r#"{
                "inferred_intent": {
                    "label": "muscle_building",
                    "confidence": 0.85,
                    "reasoning": ["Whey protein isolate is listed first"]
                },
                "primary_conflicts": [
                    {"ingredient": "maltodextrin", "risk_level": "medium", "why_it_matters": "Filler carbohydrate sits outside a protein-dense profile"}
                ],
                "secondary_tradeoffs": [
                    {"ingredient": "sucralose", "explanation": "Typical sweetener for the category"}
                ],
                "overall_assessment": "A functional, protein-forward formulation.",
                "uncertainty_notes": ["No quantities given"]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_summary_text_layout() {
        let summary = sample().summary_text().unwrap();
        assert_eq!(
            summary,
            "Inferred intent: muscle_building\nConfidence: 85%\n\n\
             A functional, protein-forward formulation.\n\n\
             Alignment frictions:\n• Filler carbohydrate sits outside a protein-dense profile\n\n\
             Tradeoffs:\n• Typical sweetener for the category\n\n\
             Uncertainty:\n• No quantities given"
        );
    }

    #[test]
    fn test_summary_skips_empty_sections() {
        let mut result = sample();
        result.primary_conflicts.clear();
        result.secondary_tradeoffs.clear();
        result.uncertainty_notes.clear();
        let summary = result.summary_text().unwrap();
        assert!(!summary.contains("frictions"));
        assert!(!summary.contains("Tradeoffs"));
        assert!(!summary.contains("Uncertainty"));
        assert!(summary.ends_with("protein-forward formulation."));
    }

    #[test]
    fn test_missing_fields_default() {
        let result: AnalysisResult = serde_json::from_str(r#"{"overall_assessment": "ok"}"#).unwrap();
        assert!(result.inferred_intent.is_none());
        assert!(result.primary_conflicts.is_empty());
        assert!(result.summary_text().is_none());
    }

    #[test]
    fn test_out_of_range_values_are_kept() {
        let result: AnalysisResult = serde_json::from_str(
            r#"{"inferred_intent": {"label": "snack_time", "confidence": 1.7},
                "primary_conflicts": [{"ingredient": "x", "risk_level": "extreme"}]}"#,
        )
        .unwrap();
        let intent = result.inferred_intent.as_ref().unwrap();
        assert_eq!(intent.confidence_percent(), 170);
        assert_eq!(intent.kind(), IntentLabel::Other);
        assert_eq!(result.primary_conflicts[0].risk(), RiskLevel::Unknown);
        assert_eq!(result.primary_conflicts[0].risk_level, "extreme");
    }

    #[test]
    fn test_risk_level_parse_is_case_insensitive() {
        assert_eq!(RiskLevel::parse("HIGH"), RiskLevel::High);
        assert_eq!(RiskLevel::parse(" low "), RiskLevel::Low);
        assert_eq!(RiskLevel::parse("low | medium | high"), RiskLevel::Unknown);
    }

    #[test]
    fn test_uncertainty_status() {
        let mut result = sample();
        assert_eq!(result.uncertainty_status(), "1 uncertainty");
        result.uncertainty_notes.push("Category unclear".into());
        assert_eq!(result.uncertainty_status(), "2 uncertainties");
        result.uncertainty_notes.clear();
        assert_eq!(result.uncertainty_status(), "Verified");
    }
}
