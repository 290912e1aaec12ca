//! Key namespace for special records.

/// Present when the program should start by itself after boot.
pub const AUTORUN: u32 = 0x0000_0001;

const SETTING_BASE: u32 = 0x0000_0100;
const FILE_BASE: u32 = 0x0010_0000;

/// Numbered settings used by DSAVE and DLOAD.
pub fn setting(n: u8) -> u32 {
    SETTING_BASE + n as u32
}

/// Record `record` of the file named by letter `name`.
pub fn file(name: u8, record: u16) -> u32 {
    (FILE_BASE + (((name - b'A') as u32) << 16)) | record as u32
}
