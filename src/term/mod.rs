extern crate ansi_term;
extern crate chrono;
extern crate crc;
extern crate ctrlc;
extern crate linefeed;
extern crate rand;
use crate::lang::{Error, LineNumber};
use crate::mach::{Config, Host, Runtime, Status, DELAY_TIMER, MAX_TIMERS};
use crate::store::{Flash, RamFlash};
use ansi_term::Style;
use chrono::{DateTime, Local};
use crc::crc32::checksum_ieee;
use linefeed::{DefaultTerminal, Interface, ReadResult};
use rand::Rng;
use std::fs;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Flash image used when no file is named on the command line.
pub const DEFAULT_IMAGE: &str = "bluebasic.flash";

const POLL: Duration = Duration::from_millis(10);

pub fn main() {
    let interrupted = Arc::new(AtomicBool::new(false));
    let int_moved = interrupted.clone();
    ctrlc::set_handler(move || {
        int_moved.store(true, Ordering::SeqCst);
    })
    .expect("Error setting Ctrl-C handler");
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_IMAGE.to_string());
    if let Err(error) = main_loop(&path, interrupted) {
        eprintln!("{}", error);
    }
}

fn main_loop(path: &str, interrupted: Arc<AtomicBool>) -> std::io::Result<()> {
    let config = Config::default();
    let interface = Arc::new(Interface::new("BASIC")?);
    let flash = FileFlash::open(path, config.flash_len());
    let console = Console::new(interface.clone(), interrupted);
    let mut runtime = Runtime::new(config, flash, console);
    runtime.setup();

    loop {
        while let Some((id, line)) = runtime.host_mut().due_timer() {
            if runtime.event(line, id != DELAY_TIMER) == Status::Terminate {
                return Ok(());
            }
        }
        match interface.read_line_step(Some(POLL))? {
            Some(ReadResult::Input(input)) => {
                runtime.host_mut().timer_stop(DELAY_TIMER);
                if runtime.enter(&input) == Status::Terminate {
                    break;
                }
                interface.add_history_unique(input);
            }
            Some(ReadResult::Signal(_)) | Some(ReadResult::Eof) => break,
            None => {}
        }
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
struct Armed {
    due: i64,
    timeout: i32,
    repeat: bool,
    line: LineNumber,
}

/// Terminal host. Output goes out a line at a time through linefeed so
/// the prompt is redrawn below it.
struct Console {
    interface: Arc<Interface<DefaultTerminal>>,
    pending: String,
    started: DateTime<Local>,
    timers: [Option<Armed>; MAX_TIMERS],
    interrupted: Arc<AtomicBool>,
}

impl Console {
    fn new(interface: Arc<Interface<DefaultTerminal>>, interrupted: Arc<AtomicBool>) -> Console {
        Console {
            interface,
            pending: String::new(),
            started: Local::now(),
            timers: [None; MAX_TIMERS],
            interrupted,
        }
    }

    fn now(&self) -> i64 {
        (Local::now() - self.started).num_milliseconds()
    }

    fn write(&mut self, s: &str) {
        if let Err(error) = self.interface.write_fmt(format_args!("{}", s)) {
            eprintln!("{}", error);
        }
    }

    /// Takes the first expired timer, rearming it when it repeats.
    fn due_timer(&mut self) -> Option<(u8, LineNumber)> {
        let now = self.now();
        for (id, slot) in self.timers.iter_mut().enumerate() {
            if let Some(armed) = slot {
                if armed.due > now {
                    continue;
                }
                let line = armed.line;
                if armed.repeat {
                    armed.due = now + armed.timeout.max(1) as i64;
                } else {
                    *slot = None;
                }
                return Some((id as u8, line));
            }
        }
        None
    }
}

impl Host for Console {
    fn putchar(&mut self, ch: u8) {
        self.pending.push(ch as char);
        if ch == b'\n' {
            let line = std::mem::take(&mut self.pending);
            self.write(&line);
        }
    }

    fn report(&mut self, error: &Error, listing: Option<&str>) {
        let msg = format!("{}\n", Style::new().bold().paint(error.to_string()));
        self.write(&msg);
        if let Some(listing) = listing {
            self.write(&format!(">> {}\n", listing));
        }
    }

    fn millis(&mut self) -> i32 {
        self.now() as i32
    }

    fn random(&mut self) -> i32 {
        (rand::thread_rng().gen::<u32>() >> 1) as i32
    }

    fn timer_start(&mut self, id: u8, timeout: i32, repeat: bool, line: LineNumber) -> bool {
        if id as usize >= MAX_TIMERS {
            return false;
        }
        self.timers[id as usize] = Some(Armed {
            due: self.now() + timeout.max(0) as i64,
            timeout,
            repeat,
            line,
        });
        true
    }

    fn timer_stop(&mut self, id: u8) {
        if let Some(slot) = self.timers.get_mut(id as usize) {
            *slot = None;
        }
    }

    fn break_check(&mut self) -> bool {
        self.interrupted.swap(false, Ordering::SeqCst)
    }
}

/// Flash kept in a file. The image is followed by its CRC-32 and is
/// rewritten after every change.
pub struct FileFlash {
    path: PathBuf,
    ram: RamFlash,
}

impl FileFlash {
    /// A missing or corrupt image starts out erased.
    pub fn open<P: Into<PathBuf>>(path: P, len: usize) -> FileFlash {
        let path = path.into();
        let image = fs::read(&path)
            .ok()
            .and_then(|image| decode(image, len))
            .unwrap_or_else(|| vec![0xFF; len]);
        FileFlash {
            path,
            ram: RamFlash::from_image(image),
        }
    }

    fn save(&self) {
        if let Err(error) = fs::write(&self.path, encode(self.ram.bytes())) {
            eprintln!("{}: {}", self.path.display(), error);
        }
    }
}

impl Flash for FileFlash {
    fn bytes(&self) -> &[u8] {
        self.ram.bytes()
    }

    fn erase(&mut self, page: usize, page_size: usize) {
        self.ram.erase(page, page_size);
        self.save();
    }

    fn write_words(&mut self, addr: usize, words: &[u8]) {
        self.ram.write_words(addr, words);
        self.save();
    }
}

fn encode(image: &[u8]) -> Vec<u8> {
    let mut file = image.to_vec();
    file.extend_from_slice(&checksum_ieee(image).to_le_bytes());
    file
}

fn decode(mut file: Vec<u8>, len: usize) -> Option<Vec<u8>> {
    if file.len() != len + 4 {
        return None;
    }
    let footer = file.split_off(len);
    let crc = u32::from_le_bytes([footer[0], footer[1], footer[2], footer[3]]);
    if checksum_ieee(&file) == crc {
        Some(file)
    } else {
        None
    }
}
