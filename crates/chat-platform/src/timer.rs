//! Browser cooldown driver: one `tick()` per second on the event loop.

use std::time::Duration;
use gloo_timers::future::sleep;
use wasm_bindgen_futures::spawn_local;
use chat_core::ports::{CooldownDriver, SharedCooldown};

const TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Default, Clone, Copy)]
pub struct IntervalDriver;

impl IntervalDriver {
    pub fn new() -> Self {
        Self
    }
}

impl CooldownDriver for IntervalDriver {
    fn drive(&self, cooldown: SharedCooldown) {
        let epoch = cooldown.borrow().epoch();
        spawn_local(async move {
            loop {
                sleep(TICK).await;
                let mut cd = cooldown.borrow_mut();
                // A restart or cancel hands the countdown to a newer loop
                if cd.epoch() != epoch || !cd.tick() {
                    break;
                }
            }
            log::debug!("Cooldown driver for epoch {} stopped", epoch);
        });
    }
}
