//! Cosmetic progress ramp. Values never reflect real upload or inference
//! progress; they only keep the bar moving while a phase is active.

use std::time::Duration;

use shared::domain::ProcessState;

pub const UPLOAD_TICK: Duration = Duration::from_millis(260);
pub const RUNNING_TICK: Duration = Duration::from_millis(280);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampPhase {
    pub floor: u8,
    pub step: u8,
    pub cap: u8,
}

pub const UPLOADING_RAMP: RampPhase = RampPhase {
    floor: 15,
    step: 2,
    cap: 45,
};

pub const RUNNING_RAMP: RampPhase = RampPhase {
    floor: 55,
    step: 1,
    cap: 92,
};

impl RampPhase {
    pub fn for_state(state: ProcessState) -> Option<Self> {
        match state {
            ProcessState::Uploading => Some(UPLOADING_RAMP),
            ProcessState::Running => Some(RUNNING_RAMP),
            _ => None,
        }
    }

    /// One tick: lift to the floor, then climb by `step` without passing `cap`.
    pub fn advance(self, current: u8) -> u8 {
        if current < self.floor {
            self.floor
        } else if current < self.cap {
            current.saturating_add(self.step).min(self.cap)
        } else {
            current
        }
    }

    pub fn is_capped(self, current: u8) -> bool {
        current >= self.cap
    }
}

/// Progress a state pins the bar to, if it isn't a ramping state.
pub fn settled_progress(state: ProcessState) -> Option<u8> {
    match state {
        ProcessState::Ready => Some(100),
        ProcessState::Idle | ProcessState::Error => Some(0),
        ProcessState::Uploading | ProcessState::Running => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProgressRamp {
    pub uploading_tick: Duration,
    pub running_tick: Duration,
}

impl Default for ProgressRamp {
    fn default() -> Self {
        Self {
            uploading_tick: UPLOAD_TICK,
            running_tick: RUNNING_TICK,
        }
    }
}

impl ProgressRamp {
    pub fn tick_for(&self, state: ProcessState) -> Option<Duration> {
        match state {
            ProcessState::Uploading => Some(self.uploading_tick),
            ProcessState::Running => Some(self.running_tick),
            _ => None,
        }
    }
}
