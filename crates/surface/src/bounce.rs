use std::{collections::HashMap, time::Duration};

use model::surface::MarkerKind;
use tokio::time::Instant;

use crate::layers::RESTING_ICON_SIZE;

const START_SCALE: f64 = 1.1;
const PEAK_SCALE: f64 = 1.2;

/// Icon scale at `progress` (0..=1) through a bounce: up from 1.1 to 1.2 in
/// the first half, back down to 1.1 in the second.
pub fn bounce_scale(progress: f64) -> f64 {
    let progress = progress.clamp(0.0, 1.0);
    if progress <= 0.5 {
        START_SCALE + (PEAK_SCALE - START_SCALE) * (progress / 0.5)
    } else {
        PEAK_SCALE - (PEAK_SCALE - START_SCALE) * ((progress - 0.5) / 0.5)
    }
}

/// At most one running bounce per marker kind.
#[derive(Debug, Clone)]
pub struct BounceAnimator {
    duration: Duration,
    running: HashMap<MarkerKind, Instant>,
}

impl BounceAnimator {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            running: HashMap::new(),
        }
    }

    /// `false` if a bounce for `kind` is still running.
    pub fn start(&mut self, kind: MarkerKind, now: Instant) -> bool {
        if self.is_running(kind, now) {
            return false;
        }
        self.running.insert(kind, now);
        true
    }

    pub fn is_running(&self, kind: MarkerKind, now: Instant) -> bool {
        self.running
            .get(&kind)
            .is_some_and(|started| now.duration_since(*started) < self.duration)
    }

    pub fn is_animating(&self) -> bool {
        !self.running.is_empty()
    }

    /// Current scale of every running bounce. Finished bounces report the
    /// resting scale once and are dropped.
    pub fn frame(&mut self, now: Instant) -> Vec<(MarkerKind, f64)> {
        let duration = self.duration.as_secs_f64();
        let mut scales: Vec<_> = self
            .running
            .iter()
            .map(|(kind, started)| {
                let elapsed = now.duration_since(*started).as_secs_f64();
                if duration <= 0.0 || elapsed >= duration {
                    (*kind, RESTING_ICON_SIZE)
                } else {
                    (*kind, bounce_scale(elapsed / duration))
                }
            })
            .collect();
        self.running
            .retain(|_, started| now.duration_since(*started) < self.duration);
        scales.sort_by_key(|(kind, _)| *kind);
        scales
    }
}
