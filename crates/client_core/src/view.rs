//! Immutable view model for a rendering layer. Nothing here holds closures
//! or references back into the controller.

use shared::domain::ProcessState;

use crate::{
    classify::{
        classify_label, confidence_percent, prediction_summary, LabelCategory, PredictionTheme,
    },
    flow::FlowSnapshot,
};

pub const ERROR_TITLE: &str = "Something went wrong";
pub const ERROR_FALLBACK_TEXT: &str = "AI request failed. Please try again.";
pub const EMPTY_TEXT: &str = "No prediction yet. Run a prediction to see results and confidence.";
pub const UPLOADING_NOTE: &str = "Uploading your X-ray and registering the scan.";
pub const RUNNING_NOTE: &str = "Running the model and assembling your summary.";

const MIN_BAR_FILL: u8 = 6;

pub const PROCESSING_STEPS: [(ProcessState, &str); 3] = [
    (ProcessState::Uploading, "Uploading image"),
    (ProcessState::Running, "Running AI"),
    (ProcessState::Ready, "Prediction summary"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    Pending,
    Active,
    Done,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepView {
    pub key: ProcessState,
    pub label: &'static str,
    pub status: StepStatus,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub label: String,
    pub category: LabelCategory,
    pub theme: PredictionTheme,
    pub confidence_percent: Option<i64>,
    /// Meter width in percent, clamped to `[0, 100]`.
    pub meter_fill: f64,
    pub summary: String,
    pub explanation: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Panel {
    Result(ResultView),
    Processing {
        steps: Vec<StepView>,
        bar_fill: u8,
        note: &'static str,
    },
    Error {
        title: &'static str,
        text: String,
    },
    Empty {
        text: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FlowView {
    pub state: ProcessState,
    pub progress: u8,
    pub is_processing: bool,
    pub has_error: bool,
    pub last_image_url: Option<String>,
    pub panel: Panel,
}

impl FlowView {
    /// A stored result always wins the panel, then an in-flight phase, then
    /// an error, then the empty placeholder.
    pub fn from_snapshot(snapshot: &FlowSnapshot) -> Self {
        let state = snapshot.state;
        let panel = if let Some(result) = &snapshot.result {
            let category = classify_label(&result.label);
            Panel::Result(ResultView {
                label: result.label.clone(),
                category,
                theme: category.theme(),
                confidence_percent: confidence_percent(Some(result.confidence)),
                meter_fill: clamp_fill(result.confidence * 100.0),
                summary: prediction_summary(&result.label, Some(result.confidence)),
                explanation: result.explanation.clone(),
            })
        } else if state.is_processing() {
            Panel::Processing {
                steps: processing_steps(state),
                bar_fill: snapshot.progress.clamp(MIN_BAR_FILL, 100),
                note: if state == ProcessState::Uploading {
                    UPLOADING_NOTE
                } else {
                    RUNNING_NOTE
                },
            }
        } else if state == ProcessState::Error {
            Panel::Error {
                title: ERROR_TITLE,
                text: if snapshot.message.is_empty() {
                    ERROR_FALLBACK_TEXT.to_string()
                } else {
                    snapshot.message.clone()
                },
            }
        } else {
            Panel::Empty { text: EMPTY_TEXT }
        };

        Self {
            state,
            progress: snapshot.progress,
            is_processing: state.is_processing(),
            has_error: state == ProcessState::Error,
            last_image_url: snapshot.last_image_url.clone(),
            panel,
        }
    }
}

pub fn processing_steps(state: ProcessState) -> Vec<StepView> {
    let current = PROCESSING_STEPS.iter().position(|(key, _)| *key == state);
    PROCESSING_STEPS
        .iter()
        .enumerate()
        .map(|(index, (key, label))| StepView {
            key: *key,
            label: *label,
            status: match current {
                Some(current) if current == index => StepStatus::Active,
                Some(current) if current > index => StepStatus::Done,
                _ => StepStatus::Pending,
            },
        })
        .collect()
}

fn clamp_fill(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{NEGATIVE_THEME, POSITIVE_THEME};
    use shared::protocol::PredictionResult;

    fn result(label: &str, confidence: f64) -> PredictionResult {
        PredictionResult {
            label: label.into(),
            confidence,
            probs: None,
            explanation: Some("Opacities in the upper lobes.".into()),
        }
    }

    #[test]
    fn idle_snapshot_shows_empty_panel() {
        let view = FlowView::from_snapshot(&FlowSnapshot::default());
        assert_eq!(view.panel, Panel::Empty { text: EMPTY_TEXT });
        assert!(!view.is_processing);
        assert!(!view.has_error);
    }

    #[test]
    fn running_marks_upload_step_done() {
        let view = FlowView::from_snapshot(&FlowSnapshot {
            state: ProcessState::Running,
            progress: 60,
            ..FlowSnapshot::default()
        });
        let Panel::Processing {
            steps,
            bar_fill,
            note,
        } = view.panel
        else {
            panic!("expected processing panel");
        };
        assert_eq!(
            steps.iter().map(|s| s.status).collect::<Vec<_>>(),
            vec![StepStatus::Done, StepStatus::Active, StepStatus::Pending]
        );
        assert_eq!(bar_fill, 60);
        assert_eq!(note, RUNNING_NOTE);
    }

    #[test]
    fn processing_bar_has_minimum_visible_fill() {
        let view = FlowView::from_snapshot(&FlowSnapshot {
            state: ProcessState::Uploading,
            progress: 0,
            ..FlowSnapshot::default()
        });
        assert!(matches!(
            view.panel,
            Panel::Processing { bar_fill: 6, note: UPLOADING_NOTE, .. }
        ));
    }

    #[test]
    fn error_panel_falls_back_to_generic_text() {
        let view = FlowView::from_snapshot(&FlowSnapshot {
            state: ProcessState::Error,
            ..FlowSnapshot::default()
        });
        assert_eq!(
            view.panel,
            Panel::Error {
                title: ERROR_TITLE,
                text: ERROR_FALLBACK_TEXT.to_string()
            }
        );
    }

    #[test]
    fn positive_result_uses_red_theme_and_clamped_meter() {
        let view = FlowView::from_snapshot(&FlowSnapshot {
            state: ProcessState::Ready,
            progress: 100,
            result: Some(result("TB", 1.2)),
            ..FlowSnapshot::default()
        });
        let Panel::Result(card) = view.panel else {
            panic!("expected result panel");
        };
        assert_eq!(card.theme, POSITIVE_THEME);
        assert_eq!(card.meter_fill, 100.0);
        assert_eq!(card.confidence_percent, Some(120));
        assert!(card.summary.contains("tuberculosis"));
        assert_eq!(card.explanation.as_deref(), Some("Opacities in the upper lobes."));
    }

    #[test]
    fn result_wins_over_error_state() {
        let view = FlowView::from_snapshot(&FlowSnapshot {
            state: ProcessState::Error,
            message: "network down".into(),
            result: Some(result("Normal", 0.8)),
            ..FlowSnapshot::default()
        });
        let Panel::Result(card) = view.panel else {
            panic!("expected result panel");
        };
        assert_eq!(card.theme, NEGATIVE_THEME);
        assert!(view.has_error);
    }
}
