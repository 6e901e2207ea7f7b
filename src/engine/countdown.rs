//! Single pausable countdown driven by the engine clock.

/// Progress of the running countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountdownProgress<T> {
    /// Payload handed back on expiry.
    pub tag: T,
    /// Time already elapsed.
    pub elapsed_ms: u64,
    /// Total duration.
    pub duration_ms: u64,
    /// Whether the countdown is paused.
    pub paused: bool,
}

#[derive(Debug, Clone)]
struct Running<T> {
    duration_ms: u64,
    elapsed_ms: u64,
    paused: bool,
    on_expire: T,
}

/// A countdown that fires its payload exactly once unless stopped or replaced.
///
/// Nothing here reads a wall clock: time only moves through [`Countdown::tick`], so a
/// paused countdown cannot advance and a stopped one cannot fire.
#[derive(Debug, Clone)]
pub struct Countdown<T> {
    running: Option<Running<T>>,
}

impl<T> Default for Countdown<T> {
    fn default() -> Self {
        Self { running: None }
    }
}

impl<T: Copy> Countdown<T> {
    /// Create an idle countdown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a countdown, returning the payload of the one it replaced.
    pub fn start(&mut self, duration_ms: u64, on_expire: T) -> Option<T> {
        self.running
            .replace(Running {
                duration_ms,
                elapsed_ms: 0,
                paused: false,
                on_expire,
            })
            .map(|previous| previous.on_expire)
    }

    /// Pause the countdown. Returns `false` when nothing was running or it was already paused.
    pub fn pause(&mut self) -> bool {
        match self.running.as_mut() {
            Some(running) if !running.paused => {
                running.paused = true;
                true
            }
            _ => false,
        }
    }

    /// Resume a paused countdown. Returns `false` when there was nothing to resume.
    pub fn resume(&mut self) -> bool {
        match self.running.as_mut() {
            Some(running) if running.paused => {
                running.paused = false;
                true
            }
            _ => false,
        }
    }

    /// Cancel the countdown without firing, returning its payload.
    pub fn stop(&mut self) -> Option<T> {
        self.running.take().map(|running| running.on_expire)
    }

    /// Advance the countdown, returning the payload when it expires.
    pub fn tick(&mut self, delta_ms: u64) -> Option<T> {
        let running = self.running.as_mut()?;
        if running.paused {
            return None;
        }

        running.elapsed_ms = running
            .elapsed_ms
            .saturating_add(delta_ms)
            .min(running.duration_ms);
        if running.elapsed_ms < running.duration_ms {
            return None;
        }

        self.running.take().map(|running| running.on_expire)
    }

    /// Whether a countdown exists, paused or not.
    pub fn is_running(&self) -> bool {
        self.running.is_some()
    }

    /// Whether the countdown exists and is paused.
    pub fn is_paused(&self) -> bool {
        self.running.as_ref().is_some_and(|running| running.paused)
    }

    /// Payload of the current countdown.
    pub fn tag(&self) -> Option<T> {
        self.running.as_ref().map(|running| running.on_expire)
    }

    /// Time left before expiry.
    pub fn remaining_ms(&self) -> Option<u64> {
        self.running
            .as_ref()
            .map(|running| running.duration_ms - running.elapsed_ms)
    }

    /// Snapshot of the current countdown.
    pub fn progress(&self) -> Option<CountdownProgress<T>> {
        self.running.as_ref().map(|running| CountdownProgress {
            tag: running.on_expire,
            elapsed_ms: running.elapsed_ms,
            duration_ms: running.duration_ms,
            paused: running.paused,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Tag {
        Buzz,
        Answer,
    }

    #[test]
    fn fires_once_at_expiry() {
        let mut countdown = Countdown::new();
        countdown.start(100, Tag::Buzz);

        assert_eq!(countdown.tick(60), None);
        assert_eq!(countdown.progress().unwrap().elapsed_ms, 60);
        assert_eq!(countdown.tick(60), Some(Tag::Buzz));
        assert_eq!(countdown.tick(60), None);
        assert!(!countdown.is_running());
    }

    #[test]
    fn paused_countdown_does_not_advance() {
        let mut countdown = Countdown::new();
        countdown.start(100, Tag::Answer);
        countdown.tick(30);

        assert!(countdown.pause());
        assert!(!countdown.pause());
        assert_eq!(countdown.tick(1_000), None);
        assert_eq!(countdown.remaining_ms(), Some(70));

        assert!(countdown.resume());
        assert_eq!(countdown.tick(69), None);
        assert_eq!(countdown.tick(1), Some(Tag::Answer));
    }

    #[test]
    fn stop_never_fires() {
        let mut countdown = Countdown::new();
        countdown.start(10, Tag::Buzz);
        assert_eq!(countdown.stop(), Some(Tag::Buzz));
        assert_eq!(countdown.tick(100), None);
    }

    #[test]
    fn start_replaces_existing_countdown() {
        let mut countdown = Countdown::new();
        countdown.start(10, Tag::Buzz);
        assert_eq!(countdown.start(50, Tag::Answer), Some(Tag::Buzz));
        assert_eq!(countdown.tick(10), None);
        assert_eq!(countdown.tick(40), Some(Tag::Answer));
    }

    #[test]
    fn controls_are_noops_when_idle() {
        let mut countdown: Countdown<Tag> = Countdown::new();
        assert!(!countdown.pause());
        assert!(!countdown.resume());
        assert_eq!(countdown.stop(), None);
        assert_eq!(countdown.tick(10), None);
    }

    #[test]
    fn zero_duration_expires_on_next_tick() {
        let mut countdown = Countdown::new();
        countdown.start(0, Tag::Buzz);
        assert_eq!(countdown.tick(0), Some(Tag::Buzz));
    }
}
