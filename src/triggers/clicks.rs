//! Click-burst counter for the header logo.
//!
//! Timing is driven by scheduled resets rather than by comparing timestamps
//! on each click. The detector tells its host when to deliver a reset; every
//! reset carries the epoch it was scheduled under and is ignored once the
//! epoch has moved on. Reaching the threshold bumps the epoch, so the pending
//! window reset can no longer cancel the celebration.

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BurstSettings {
    pub threshold: u32,
    pub window_ms: f64,
    pub display_ms: f64,
}

impl Default for BurstSettings {
    fn default() -> Self {
        Self {
            threshold: 5,
            window_ms: 2_000.0,
            display_ms: 3_000.0,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BurstState {
    pub count: u32,
    pub epoch: u64,
    /// Threshold reached; clicks are ignored until the display reset lands.
    pub celebrating: bool,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BurstEvent {
    Click,
    Reset { epoch: u64 },
}

/// A reset the host must deliver back after `after_ms`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ScheduledReset {
    pub epoch: u64,
    pub after_ms: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BurstStep {
    pub fired: bool,
    pub schedule: Option<ScheduledReset>,
}

pub fn transition(
    state: BurstState,
    event: BurstEvent,
    settings: &BurstSettings,
) -> (BurstState, BurstStep) {
    match event {
        BurstEvent::Click if state.celebrating => (state, BurstStep::default()),
        BurstEvent::Click => {
            let count = state.count + 1;
            if count >= settings.threshold {
                let epoch = state.epoch + 1;
                let next = BurstState {
                    count,
                    epoch,
                    celebrating: true,
                };
                let step = BurstStep {
                    fired: true,
                    schedule: Some(ScheduledReset {
                        epoch,
                        after_ms: settings.display_ms,
                    }),
                };
                (next, step)
            } else if count == 1 {
                let epoch = state.epoch + 1;
                let next = BurstState {
                    count,
                    epoch,
                    celebrating: false,
                };
                let step = BurstStep {
                    fired: false,
                    schedule: Some(ScheduledReset {
                        epoch,
                        after_ms: settings.window_ms,
                    }),
                };
                (next, step)
            } else {
                (BurstState { count, ..state }, BurstStep::default())
            }
        }
        BurstEvent::Reset { epoch } if epoch == state.epoch => (
            BurstState {
                count: 0,
                epoch: state.epoch,
                celebrating: false,
            },
            BurstStep::default(),
        ),
        // stale
        BurstEvent::Reset { .. } => (state, BurstStep::default()),
    }
}

#[derive(Clone, Debug, Default)]
pub struct ClickBurst {
    settings: BurstSettings,
    state: BurstState,
}

impl ClickBurst {
    pub fn new(settings: BurstSettings) -> Self {
        Self {
            settings,
            state: BurstState::default(),
        }
    }

    pub fn click(&mut self) -> BurstStep {
        self.apply(BurstEvent::Click)
    }

    /// Deliver a previously scheduled reset.
    pub fn reset(&mut self, epoch: u64) {
        self.apply(BurstEvent::Reset { epoch });
    }

    fn apply(&mut self, event: BurstEvent) -> BurstStep {
        let (state, step) = transition(self.state, event, &self.settings);
        self.state = state;
        step
    }

    pub fn state(&self) -> BurstState {
        self.state
    }

    pub fn settings(&self) -> &BurstSettings {
        &self.settings
    }
}
