use crate::error;
use crate::lang::{prepare, tokenize, Cursor, Error};
use crate::mach::{evaluate, Context, Lookup, Mode};


/// Scalars read as their letter position (`A` is 0, `B` is 1 ...).
/// A non-empty `array` makes `A` an array.
#[derive(Default)]
struct Bench {
    array: Vec<u8>,
    random: i32,
}

impl Context for Bench {
    fn lookup(&self, name: u8) -> Lookup<'_> {
        if name == b'A' && !self.array.is_empty() {
            Lookup::Array(&self.array)
        } else {
            Lookup::Scalar((name - b'A') as i32)
        }
    }
    fn millis(&mut self) -> i32 {
        1234
    }
    fn random(&mut self) -> i32 {
        self.random
    }
    fn battery(&mut self) -> i32 {
        3000
    }
    fn pin_read(&mut self, major: u8, minor: u8) -> Option<i32> {
        if major == 0 {
            Some((minor % 2) as i32)
        } else {
            None
        }
    }
    fn ble_param(&mut self, param: u16) -> Option<i32> {
        if param == 0x0305 {
            Some(1)
        } else {
            None
        }
    }
}

fn tokens(s: &str) -> Vec<u8> {
    let mut buf = prepare(s).unwrap();
    tokenize(&mut buf);
    buf
}

fn eval_in(bench: &mut Bench, s: &str, mode: Mode) -> (Result<i32, Error>, Vec<u8>) {
    let buf = tokens(s);
    let mut cursor = Cursor::new(&buf);
    let val = evaluate(&mut cursor, mode, bench);
    (val, cursor.rest().to_vec())
}

fn eval(s: &str) -> Result<i32, Error> {
    eval_in(&mut Bench::default(), s, Mode::Normal).0
}
