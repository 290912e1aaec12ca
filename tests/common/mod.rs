#![allow(dead_code)]
use basic::mach::{Config, Recorder, Runtime, Status};
use basic::store::RamFlash;

pub type Basic = Runtime<RamFlash, Recorder>;

/// Four 256 byte pages hold twelve 64 byte items.
pub const SMALL: Config = Config {
    pages: 4,
    page_size: 256,
    arena_size: 1024,
};

pub fn basic() -> Basic {
    with_host(Config::default(), Recorder::new())
}

pub fn small() -> Basic {
    with_host(SMALL, Recorder::new())
}

pub fn with_host(config: Config, host: Recorder) -> Basic {
    Runtime::new(config, RamFlash::new(config.flash_len()), host)
}

/// Power cycles `runtime`, keeping only its flash.
pub fn reboot(runtime: Basic, config: Config) -> Basic {
    Runtime::new(config, runtime.into_flash(), Recorder::new())
}

/// Enters one line and returns what it printed.
pub fn exec(runtime: &mut Basic, line: &str) -> String {
    runtime.enter(line);
    runtime.host_mut().take_output()
}

/// Stores program lines, failing on any output.
pub fn program(runtime: &mut Basic, lines: &[&str]) {
    for line in lines {
        assert_eq!(runtime.enter(line), Status::Ready, "{}", line);
        assert_eq!(runtime.host_mut().take_output(), "", "{}", line);
    }
}

/// A 64 byte flash item.
pub fn wide(number: u16) -> String {
    format!("{} REM {}", number, "X".repeat(58))
}
