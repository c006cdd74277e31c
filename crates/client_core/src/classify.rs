//! Label taxonomy for inference results.
//!
//! The classifier is a priority-ordered rule list over lower-cased
//! substrings; the first rule with a matching needle decides the category.
//! Negations sit first so that "No TB" never reads as positive.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelCategory {
    Negative,
    Positive,
    Unclassified,
}

struct LabelRule {
    needles: &'static [&'static str],
    category: LabelCategory,
}

impl LabelRule {
    fn matches(&self, lowered: &str) -> bool {
        self.needles.iter().any(|needle| lowered.contains(needle))
    }
}

const LABEL_RULES: &[LabelRule] = &[
    LabelRule {
        needles: &["no tb", "no tuberculosis", "no cancer", "normal", "negative"],
        category: LabelCategory::Negative,
    },
    LabelRule {
        needles: &["tb", "tuberculosis", "positive"],
        category: LabelCategory::Positive,
    },
];

pub fn classify_label(label: &str) -> LabelCategory {
    let lowered = label.to_lowercase();
    LABEL_RULES
        .iter()
        .find(|rule| rule.matches(&lowered))
        .map(|rule| rule.category)
        .unwrap_or(LabelCategory::Unclassified)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionTheme {
    pub color: &'static str,
    pub soft: &'static str,
    pub border: &'static str,
    pub gradient: &'static str,
}

pub const NEGATIVE_THEME: PredictionTheme = PredictionTheme {
    color: "#16A34A",
    soft: "rgba(22,163,74,0.15)",
    border: "rgba(22,163,74,0.25)",
    gradient: "linear-gradient(90deg, #16A34A, #22C55E)",
};

pub const POSITIVE_THEME: PredictionTheme = PredictionTheme {
    color: "#DC2626",
    soft: "rgba(220,38,38,0.16)",
    border: "rgba(220,38,38,0.28)",
    gradient: "linear-gradient(90deg, #DC2626, #F97316)",
};

impl LabelCategory {
    pub fn theme(self) -> PredictionTheme {
        match self {
            LabelCategory::Positive => POSITIVE_THEME,
            LabelCategory::Negative | LabelCategory::Unclassified => NEGATIVE_THEME,
        }
    }
}

pub fn prediction_theme(label: &str) -> PredictionTheme {
    classify_label(label).theme()
}

/// `None` for missing or non-finite confidences.
pub fn confidence_percent(confidence: Option<f64>) -> Option<i64> {
    confidence
        .filter(|c| c.is_finite())
        .map(|c| (c * 100.0 + 0.5).floor() as i64)
}

pub fn prediction_summary(label: &str, confidence: Option<f64>) -> String {
    let pct_text = confidence_percent(confidence)
        .map(|pct| format!(" ({pct}% confidence)"))
        .unwrap_or_default();

    match classify_label(label) {
        LabelCategory::Negative => format!(
            "The AI suggests that: this X-ray looks more consistent with normal patterns{pct_text}."
        ),
        LabelCategory::Positive => format!(
            "The AI suggests that: this X-ray shows patterns consistent with tuberculosis{pct_text}."
        ),
        LabelCategory::Unclassified => {
            format!("The AI suggests that: this X-ray is closer to \"{label}\"{pct_text}.")
        }
    }
}
