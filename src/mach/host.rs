use crate::lang::{Error, LineNumber};
use std::collections::HashMap;

/// ## Everything the runtime needs from the outside world
///
/// Only character output, the clock, random numbers and timers are
/// required. Hardware hooks default to "not present".
pub trait Host {
    fn putchar(&mut self, ch: u8);

    fn print(&mut self, s: &str) {
        for &ch in s.as_bytes() {
            self.putchar(ch);
        }
    }

    /// Shows an error. `listing` is the failing stored line, if any.
    fn report(&mut self, error: &Error, listing: Option<&str>) {
        self.print(&format!("{}\n", error));
        if let Some(listing) = listing {
            self.print(&format!(">> {}\n", listing));
        }
    }

    fn millis(&mut self) -> i32;

    fn random(&mut self) -> i32;

    /// Supply voltage in millivolts.
    fn battery(&mut self) -> i32 {
        3300
    }

    fn pin_read(&mut self, _major: u8, _minor: u8) -> Option<i32> {
        None
    }

    /// False when the pin does not exist.
    fn pin_write(&mut self, _major: u8, _minor: u8, _high: bool) -> bool {
        false
    }

    fn ble_param(&mut self, _param: u16) -> Option<i32> {
        None
    }

    /// Arms timer `id` to call `line` after `timeout` ms. False when the
    /// timer cannot be armed.
    fn timer_start(&mut self, id: u8, timeout: i32, repeat: bool, line: LineNumber) -> bool;

    fn timer_stop(&mut self, id: u8);

    /// Polled between statements. True stops the program.
    fn break_check(&mut self) -> bool {
        false
    }

    /// A variable with a notifier was assigned.
    fn notify(&mut self, _notifier: u16) {}

    fn service_teardown(&mut self, _service: u16) {}

    fn reboot(&mut self) {}
}

/// A timer armed through `Host::timer_start`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timer {
    pub timeout: i32,
    pub repeat: bool,
    pub line: LineNumber,
}

/// Host that keeps everything in memory. Used by tests and as a
/// reference for real hosts.
#[derive(Debug, Default)]
pub struct Recorder {
    pub output: String,
    pub millis: i32,
    pub seed: u32,
    pub battery: i32,
    pub pins: HashMap<(u8, u8), bool>,
    pub ble: HashMap<u16, i32>,
    pub timers: HashMap<u8, Timer>,
    pub notified: Vec<u16>,
    pub torn_down: Vec<u16>,
    pub rebooted: bool,
    /// Statements to allow before reporting a break.
    pub break_after: Option<u32>,
}

impl Recorder {
    pub fn new() -> Recorder {
        Recorder {
            battery: 3300,
            seed: 1,
            ..Recorder::default()
        }
    }

    /// Adds a pin that reads low.
    pub fn with_pin(mut self, major: u8, minor: u8) -> Recorder {
        self.pins.insert((major, minor), false);
        self
    }

    pub fn take_output(&mut self) -> String {
        std::mem::take(&mut self.output)
    }
}

impl Host for Recorder {
    fn putchar(&mut self, ch: u8) {
        self.output.push(ch as char);
    }

    fn millis(&mut self) -> i32 {
        self.millis
    }

    fn random(&mut self) -> i32 {
        // xorshift32
        let mut x = self.seed.max(1);
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.seed = x;
        (x >> 1) as i32
    }

    fn battery(&mut self) -> i32 {
        self.battery
    }

    fn pin_read(&mut self, major: u8, minor: u8) -> Option<i32> {
        self.pins.get(&(major, minor)).map(|&high| high as i32)
    }

    fn pin_write(&mut self, major: u8, minor: u8, high: bool) -> bool {
        match self.pins.get_mut(&(major, minor)) {
            Some(pin) => {
                *pin = high;
                true
            }
            None => false,
        }
    }

    fn ble_param(&mut self, param: u16) -> Option<i32> {
        self.ble.get(&param).copied()
    }

    fn timer_start(&mut self, id: u8, timeout: i32, repeat: bool, line: LineNumber) -> bool {
        if id as usize >= super::MAX_TIMERS {
            return false;
        }
        self.timers.insert(
            id,
            Timer {
                timeout,
                repeat,
                line,
            },
        );
        true
    }

    fn timer_stop(&mut self, id: u8) {
        self.timers.remove(&id);
    }

    fn break_check(&mut self) -> bool {
        match self.break_after {
            Some(0) => {
                self.break_after = None;
                true
            }
            Some(n) => {
                self.break_after = Some(n - 1);
                false
            }
            None => false,
        }
    }

    fn notify(&mut self, notifier: u16) {
        self.notified.push(notifier);
    }

    fn service_teardown(&mut self, service: u16) {
        self.torn_down.push(service);
    }

    fn reboot(&mut self) {
        self.rebooted = true;
    }
}
