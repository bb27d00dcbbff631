use std::time::Duration;

use crate::queue::{ItemId, QueueItemStatus};
use crate::store::Snapshot;

/// What the engine should do after a tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AutoplayStep {
    /// Nothing to do this tick
    Idle,
    /// Store the new countdown value
    Advance(f64),
    /// Store the final countdown value and ask the server to start the head track
    Start(f64),
}

/// Countdown that starts the head track once it has waited long enough
#[derive(Debug, Clone)]
pub struct Autoplay {
    tick_rate: u32,
    /// Head (id, status) the start request was already issued for
    fired_for: Option<(ItemId, QueueItemStatus)>,
}

impl Autoplay {
    pub fn new(tick_rate: u32) -> Self {
        Self {
            tick_rate: tick_rate.max(1),
            fired_for: None,
        }
    }

    pub fn tick_rate(&self) -> u32 {
        self.tick_rate
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate))
    }

    /// Forget the issued start request so the next tick may send it again
    pub fn rearm(&mut self) {
        self.fired_for = None;
    }

    /// Progress after one more tick, snapped to the tick grid so repeated
    /// steps of `1/tick_rate` add up exactly
    fn advance(&self, progress: f64) -> f64 {
        let rate = f64::from(self.tick_rate);
        ((progress * rate).round() + 1.0) / rate
    }

    pub fn tick(&mut self, snapshot: &Snapshot) -> AutoplayStep {
        if !snapshot.audio_allowed {
            return AutoplayStep::Idle;
        }
        let Some(head) = snapshot.head() else {
            self.fired_for = None;
            return AutoplayStep::Idle;
        };

        let key = (head.id.clone(), head.status);
        if self.fired_for.as_ref().is_some_and(|fired| *fired != key) {
            self.fired_for = None;
        }

        if head.status == QueueItemStatus::Playing {
            return AutoplayStep::Idle;
        }
        let threshold = snapshot.settings.autoplay_seconds();
        if threshold == 0.0 {
            return AutoplayStep::Idle;
        }
        // Waiting for the server to confirm the start
        if self.fired_for.is_some() {
            return AutoplayStep::Idle;
        }

        let progress = if snapshot.progress >= threshold {
            snapshot.progress
        } else {
            self.advance(snapshot.progress)
        };

        if progress >= threshold {
            log::info!("autoplay: starting {} after {:.1}s", head.id, progress);
            self.fired_for = Some(key);
            AutoplayStep::Start(progress)
        } else {
            AutoplayStep::Advance(progress)
        }
    }
}
