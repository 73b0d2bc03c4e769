use std::time::Duration;

/// Coalesces bursts of re-scan requests. Every `schedule` supersedes the
/// ones before it; only the latest generation fires.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    generation: u64,
    pending: bool,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            pending: false,
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn schedule(&mut self) -> u64 {
        self.generation += 1;
        self.pending = true;
        self.generation
    }

    /// `true` exactly once, for the latest scheduled generation.
    pub fn fire(&mut self, generation: u64) -> bool {
        if self.pending && generation == self.generation {
            self.pending = false;
            true
        } else {
            false
        }
    }

    pub fn cancel(&mut self) {
        self.generation += 1;
        self.pending = false;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_latest_generation_fires() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let first = debouncer.schedule();
        let second = debouncer.schedule();
        assert!(!debouncer.fire(first));
        assert!(debouncer.fire(second));
        assert!(!debouncer.fire(second));
    }

    #[test]
    fn cancel_suppresses_pending() {
        let mut debouncer = Debouncer::new(Duration::from_millis(300));
        let generation = debouncer.schedule();
        debouncer.cancel();
        assert!(!debouncer.is_pending());
        assert!(!debouncer.fire(generation));
    }
}
