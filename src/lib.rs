//! # BlueBasic
//!
//! A line-numbered BASIC for small wireless microcontrollers. Programs
//! are tokenized as they are typed and kept in a wear-leveling flash
//! store, so they survive a reboot and run straight from flash.
//!
//! Run the executable and type a program. The flash image is kept in
//! `bluebasic.flash` unless another file is named on the command line.
//! ```text
//! BlueBasic 0.6.0
//! 3988 bytes free.
//! 8176 bytes of flash free.
//! 10 FOR I=1 TO 3
//! 20 PRINT "HELLO ", I
//! 30 NEXT I
//! RUN
//! HELLO 1
//! HELLO 2
//! HELLO 3
//! OK
//! ```

pub mod lang;
pub mod mach;
pub mod store;
pub mod term;
