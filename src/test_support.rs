//! Helpers shared by the unit tests.

use std::{
    fmt::Debug,
    sync::{Condvar, Mutex, PoisonError},
    time::Duration,
};

/// Lets one thread wait until another has reached a numbered step.
/// Steps range from 0 to 63. Waiting panics after `timeout` (1 second by default).
pub struct StepGate {
    name: String,
    open_steps: Mutex<u64>,
    cond: Condvar,
    timeout: Duration,
}

impl StepGate {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            open_steps: Mutex::new(0),
            cond: Condvar::new(),
            timeout: Duration::from_secs(1),
        }
    }

    fn mask(step: u8) -> u64 {
        assert!(step < 64, "StepGate step {step} must be between 0 and 63");
        1u64 << step
    }

    /// Blocks until `step` is open.
    pub fn wait_for(&self, step: u8) {
        let mask = Self::mask(step);
        let open = self.open_steps.lock().unwrap_or_else(PoisonError::into_inner);
        let (_open, res) = self
            .cond
            .wait_timeout_while(open, self.timeout, |open| *open & mask == 0)
            .unwrap_or_else(PoisonError::into_inner);
        assert!(
            !res.timed_out(),
            "StepGate '{}' timed out at step {step}",
            self.name
        );
    }

    pub fn open(&self, step: u8) {
        let mask = Self::mask(step);
        *self.open_steps.lock().unwrap_or_else(PoisonError::into_inner) |= mask;
        self.cond.notify_all();
    }
}

/// Prints `msg`, `left`, `right`, and then
/// asserts equality of `left` and `right` with `msg` as the assert message.
pub fn assert_eq_and_println<T: PartialEq + Debug>(left: T, right: T, msg: &str) {
    println!("{msg} - left={left:?}; right={right:?}");
    assert_eq!(left, right, "{msg}");
}

/// Routes `log` output to the test harness. Safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
