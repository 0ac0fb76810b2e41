//! One-shot countdown used to throttle retry actions such as "resend code".
//!
//! Time only moves through `tick`/`advance`, so the state is a pure function
//! of the start duration and the number of elapsed seconds. Something else
//! (a `CooldownDriver`) has to deliver the ticks.

/// Snapshot for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CooldownState {
    pub active: bool,
    pub remaining: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cooldown {
    active: bool,
    remaining: u32,
    /// Bumped on every start/cancel; drivers stop when it changes under them
    epoch: u64,
}

impl Cooldown {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm with a fresh duration. Restarting replaces the running countdown.
    pub fn start(&mut self, duration_secs: u32) {
        self.epoch += 1;
        self.remaining = duration_secs;
        self.active = duration_secs > 0;
    }

    /// One second elapsed. Returns whether the cooldown is still active.
    pub fn tick(&mut self) -> bool {
        if !self.active {
            return false;
        }
        self.remaining = self.remaining.saturating_sub(1);
        if self.remaining == 0 {
            self.active = false;
        }
        self.active
    }

    /// Several seconds elapsed at once.
    pub fn advance(&mut self, secs: u32) {
        if !self.active {
            return;
        }
        self.remaining = remaining_after(self.remaining, secs);
        self.active = self.remaining > 0;
    }

    pub fn cancel(&mut self) {
        self.epoch += 1;
        self.remaining = 0;
        self.active = false;
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn state(&self) -> CooldownState {
        CooldownState {
            active: self.active,
            remaining: self.remaining,
        }
    }
}

/// Seconds left of a `duration` countdown after `elapsed` seconds.
pub fn remaining_after(duration: u32, elapsed: u32) -> u32 {
    duration.saturating_sub(elapsed)
}
