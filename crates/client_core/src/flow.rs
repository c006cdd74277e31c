//! Upload → predict → persist sequencing and its UI status projection.
//!
//! The controller owns every write to the flow state. The upload widget
//! drives it through the three `on_upload_*` callbacks, the inference
//! service is reached through [`PredictionService`] and scan records through
//! [`ScanStore`]. Overlapping uploads are not guarded: whichever prediction
//! finishes last decides the final state.

use std::sync::{Arc, Weak};

use shared::{
    domain::{ProcessState, ScanId},
    error::FlowError,
    protocol::{PredictionResult, ScanPredictionUpdate},
};
use tokio::{
    sync::{broadcast, Mutex},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tracing::{debug, info, warn};

use crate::{
    persistence::ScanStore,
    predict::PredictionService,
    progress::{settled_progress, ProgressRamp, RampPhase},
    view::FlowView,
};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlowSnapshot {
    pub state: ProcessState,
    pub message: String,
    pub last_image_url: Option<String>,
    pub result: Option<PredictionResult>,
    pub progress: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    StateChanged {
        state: ProcessState,
        message: String,
    },
    ProgressChanged(u8),
    PredictionReady(PredictionResult),
    PersistenceFailed {
        scan_id: ScanId,
        reason: String,
    },
}

#[derive(Default)]
struct FlowInner {
    snapshot: FlowSnapshot,
    ticker: Option<JoinHandle<()>>,
}

impl FlowInner {
    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

pub struct UploadFlowController {
    predictor: Arc<dyn PredictionService>,
    scans: Arc<dyn ScanStore>,
    ramp: ProgressRamp,
    inner: Arc<Mutex<FlowInner>>,
    events: broadcast::Sender<FlowEvent>,
}

impl UploadFlowController {
    pub fn new(predictor: Arc<dyn PredictionService>, scans: Arc<dyn ScanStore>) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            predictor,
            scans,
            ramp: ProgressRamp::default(),
            inner: Arc::new(Mutex::new(FlowInner::default())),
            events,
        }
    }

    pub fn with_ramp(mut self, ramp: ProgressRamp) -> Self {
        self.ramp = ramp;
        self
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<FlowEvent> {
        self.events.subscribe()
    }

    pub async fn snapshot(&self) -> FlowSnapshot {
        self.inner.lock().await.snapshot.clone()
    }

    pub async fn view(&self) -> FlowView {
        FlowView::from_snapshot(&self.snapshot().await)
    }

    pub async fn on_upload_start(&self) {
        let mut inner = self.inner.lock().await;
        inner.snapshot.message.clear();
        inner.snapshot.result = None;
        self.set_progress(&mut inner, 0);
        self.enter_state(&mut inner, ProcessState::Uploading);
    }

    pub async fn on_upload_error(&self, message: impl Into<String>) {
        let error = FlowError::Upload(message.into());
        let mut inner = self.inner.lock().await;
        self.fail(&mut inner, &error);
    }

    /// Runs the prediction for a finished upload and returns the state the
    /// flow settled in. A persistence update is spawned for `scan_id` on
    /// success and never awaited.
    pub async fn on_upload_complete(
        &self,
        image_url: &str,
        scan_id: Option<ScanId>,
    ) -> ProcessState {
        {
            let mut inner = self.inner.lock().await;
            inner.snapshot.last_image_url = Some(image_url.to_string());
            inner.snapshot.message.clear();
            inner.snapshot.result = None;
            self.enter_state(&mut inner, ProcessState::Running);
        }

        let outcome = self.predictor.predict(image_url).await;

        let mut inner = self.inner.lock().await;
        match outcome {
            Ok(result) => {
                inner.snapshot.result = Some(result.clone());
                inner.snapshot.message.clear();
                self.enter_state(&mut inner, ProcessState::Ready);
                drop(inner);

                let _ = self.events.send(FlowEvent::PredictionReady(result.clone()));
                if let Some(scan_id) = scan_id {
                    self.persist_prediction(scan_id, &result);
                }
                ProcessState::Ready
            }
            Err(err) => {
                self.fail(&mut inner, &err);
                ProcessState::Error
            }
        }
    }

    fn fail(&self, inner: &mut FlowInner, error: &FlowError) {
        warn!(kind = ?error.kind(), "upload flow failed: {error}");
        inner.snapshot.message = error.to_string();
        self.enter_state(inner, ProcessState::Error);
    }

    /// Every state change clears the running ticker before anything else.
    fn enter_state(&self, inner: &mut FlowInner, state: ProcessState) {
        inner.stop_ticker();
        let previous = inner.snapshot.state;
        inner.snapshot.state = state;
        info!(from = %previous, to = %state, "upload flow state changed");

        let _ = self.events.send(FlowEvent::StateChanged {
            state,
            message: inner.snapshot.message.clone(),
        });

        if let Some(progress) = settled_progress(state) {
            self.set_progress(inner, progress);
        }

        if let (Some(phase), Some(period)) = (RampPhase::for_state(state), self.ramp.tick_for(state))
        {
            inner.ticker = Some(spawn_ticker(
                Arc::downgrade(&self.inner),
                self.events.clone(),
                state,
                phase,
                period,
            ));
        }
    }

    fn set_progress(&self, inner: &mut FlowInner, progress: u8) {
        if inner.snapshot.progress != progress {
            inner.snapshot.progress = progress;
            let _ = self.events.send(FlowEvent::ProgressChanged(progress));
        }
    }

    fn persist_prediction(&self, scan_id: ScanId, result: &PredictionResult) {
        let scans = Arc::clone(&self.scans);
        let events = self.events.clone();
        let update = ScanPredictionUpdate::from_result(result);
        tokio::spawn(async move {
            match scans.update_prediction(&scan_id, &update).await {
                Ok(()) => debug!(%scan_id, "scan prediction persisted"),
                Err(err) => {
                    warn!(%scan_id, "failed to persist scan prediction: {err:#}");
                    let _ = events.send(FlowEvent::PersistenceFailed {
                        scan_id,
                        reason: format!("{err:#}"),
                    });
                }
            }
        });
    }
}

impl Drop for UploadFlowController {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.inner.try_lock() {
            inner.stop_ticker();
        }
    }
}

fn spawn_ticker(
    inner: Weak<Mutex<FlowInner>>,
    events: broadcast::Sender<FlowEvent>,
    state: ProcessState,
    phase: RampPhase,
    period: time::Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticks = time::interval_at(Instant::now() + period, period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticks.tick().await;
            let Some(inner) = inner.upgrade() else {
                break;
            };
            let mut guard = inner.lock().await;
            if guard.snapshot.state != state {
                break;
            }
            let next = phase.advance(guard.snapshot.progress);
            if next != guard.snapshot.progress {
                guard.snapshot.progress = next;
                let _ = events.send(FlowEvent::ProgressChanged(next));
            }
            if phase.is_capped(next) {
                break;
            }
        }
    })
}

#[cfg(test)]
#[path = "tests/flow_tests.rs"]
mod tests;
