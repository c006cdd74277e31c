//! Plain-text rendering of the flow view model.

use client_core::view::{FlowView, Panel, StepStatus};

pub fn render(view: &FlowView) -> Vec<String> {
    let mut lines = vec![format!(
        "Latest X-ray: {}",
        view.last_image_url.as_deref().unwrap_or("no upload yet")
    )];

    match &view.panel {
        Panel::Result(card) => {
            lines.push(format!("Prediction: {} [{}]", card.label, card.theme.color));
            if let Some(pct) = card.confidence_percent {
                lines.push(format!("Confidence: {pct}% {}", meter(card.meter_fill)));
            }
            lines.push(card.summary.clone());
            if let Some(explanation) = &card.explanation {
                lines.push(explanation.clone());
            }
        }
        Panel::Processing {
            steps,
            bar_fill,
            note,
        } => {
            for step in steps {
                let marker = match step.status {
                    StepStatus::Done => "[x]",
                    StepStatus::Active => "[>]",
                    StepStatus::Pending => "[ ]",
                };
                lines.push(format!("{marker} {}", step.label));
            }
            lines.push(meter(f64::from(*bar_fill)));
            lines.push((*note).to_string());
        }
        Panel::Error { title, text } => {
            lines.push((*title).to_string());
            lines.push(text.clone());
        }
        Panel::Empty { text } => lines.push((*text).to_string()),
    }

    lines
}

fn meter(fill: f64) -> String {
    const WIDTH: usize = 20;
    let filled = ((fill.clamp(0.0, 100.0) / 100.0) * WIDTH as f64).round() as usize;
    format!("[{}{}]", "#".repeat(filled), ".".repeat(WIDTH - filled))
}

#[cfg(test)]
mod tests {
    use super::*;
    use client_core::FlowSnapshot;
    use shared::{domain::ProcessState, protocol::PredictionResult};

    #[test]
    fn renders_ready_result_with_summary() {
        let view = FlowView::from_snapshot(&FlowSnapshot {
            state: ProcessState::Ready,
            progress: 100,
            last_image_url: Some("https://cdn.example/x.png".into()),
            result: Some(PredictionResult {
                label: "Normal".into(),
                confidence: 0.5,
                probs: None,
                explanation: None,
            }),
            ..FlowSnapshot::default()
        });
        let lines = render(&view);
        assert_eq!(lines[0], "Latest X-ray: https://cdn.example/x.png");
        assert_eq!(lines[1], "Prediction: Normal [#16A34A]");
        assert_eq!(lines[2], format!("Confidence: 50% [{}{}]", "#".repeat(10), ".".repeat(10)));
        assert!(lines[3].contains("normal patterns"));
    }

    #[test]
    fn renders_error_panel() {
        let view = FlowView::from_snapshot(&FlowSnapshot {
            state: ProcessState::Error,
            message: "bad image".into(),
            ..FlowSnapshot::default()
        });
        assert_eq!(
            render(&view),
            vec![
                "Latest X-ray: no upload yet".to_string(),
                "Something went wrong".to_string(),
                "bad image".to_string(),
            ]
        );
    }
}
