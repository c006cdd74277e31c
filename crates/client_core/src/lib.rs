pub mod classify;
pub mod flow;
pub mod persistence;
pub mod predict;
pub mod progress;
pub mod view;

pub use classify::{classify_label, prediction_summary, prediction_theme, LabelCategory};
pub use flow::{FlowEvent, FlowSnapshot, UploadFlowController};
pub use persistence::{MissingScanStore, ScanStore};
pub use predict::{HttpPredictionClient, PredictionService, DEFAULT_PREDICT_URL};
pub use progress::ProgressRamp;
pub use view::FlowView;
