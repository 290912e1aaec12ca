use super::{Stack, EXPRESSION_QUEUE_SIZE, EXPRESSION_STACK_SIZE};
use crate::error;
use crate::lang::{constant, Cursor, Error, Token};

type Result<T> = std::result::Result<T, Error>;

/// Where an expression ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// At the end of the line or the first byte that cannot continue it.
    Normal,
    /// At an unmatched `)`, which is consumed.
    Braces,
    /// At a top level `,`, which is consumed.
    Comma,
}

/// What a variable name currently refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<'a> {
    Scalar(i32),
    Array(&'a [u8]),
}

/// Variables and host hooks an expression can reach.
pub trait Context {
    /// `name` is always `A`..`Z`.
    fn lookup(&self, name: u8) -> Lookup<'_>;
    fn millis(&mut self) -> i32;
    fn random(&mut self) -> i32;
    fn battery(&mut self) -> i32;
    fn pin_read(&mut self, major: u8, minor: u8) -> Option<i32>;
    fn ble_param(&mut self, param: u16) -> Option<i32>;
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Op {
    Binary(Token),
    Negate,
    Paren,
    Call(Token),
    Index(u8),
}

const NEGATE_PRECEDENCE: u8 = 2;

impl Op {
    fn precedence(self) -> Option<u8> {
        match self {
            Op::Binary(token) => token.precedence(),
            Op::Negate => Some(NEGATE_PRECEDENCE),
            _ => None,
        }
    }
}

/// Reads digits of `base`, at most `max_len` of them. Stops quietly at
/// the first byte that is not a digit.
pub fn parse_int(cursor: &mut Cursor, max_len: usize, base: u32) -> Result<i32> {
    let mut value: i32 = 0;
    let mut count = 0;
    while count < max_len {
        let digit = match (cursor.peek() as char).to_digit(base) {
            Some(d) => d,
            None => break,
        };
        value = value.wrapping_mul(base as i32).wrapping_add(digit as i32);
        cursor.advance();
        count += 1;
    }
    if count == 0 {
        return Err(error!(Expression));
    }
    Ok(value)
}

pub fn evaluate(cursor: &mut Cursor, mode: Mode, ctx: &mut dyn Context) -> Result<i32> {
    Evaluator::new(ctx).run(cursor, mode)
}

struct Evaluator<'a> {
    ctx: &'a mut dyn Context,
    ops: Stack<Op>,
    vals: Stack<i32>,
}

impl<'a> Evaluator<'a> {
    fn new(ctx: &'a mut dyn Context) -> Evaluator<'a> {
        Evaluator {
            ctx,
            ops: Stack::new(EXPRESSION_STACK_SIZE, "EXPRESSION STACK"),
            vals: Stack::new(EXPRESSION_QUEUE_SIZE, "EXPRESSION QUEUE"),
        }
    }

    fn run(&mut self, cursor: &mut Cursor, mode: Mode) -> Result<i32> {
        let mut operand = true;
        loop {
            let ch = cursor.peek();
            match ch {
                b' ' | b'\t' => cursor.advance(),
                b'0'..=b'9' => {
                    let val = parse_int(cursor, 10, 10)?;
                    self.vals.push(val)?;
                    operand = false;
                }
                b'A'..=b'Z' => {
                    cursor.advance();
                    match self.ctx.lookup(ch) {
                        Lookup::Scalar(val) => {
                            self.vals.push(val)?;
                            operand = false;
                        }
                        Lookup::Array(_) => {
                            self.ops.push(Op::Index(ch))?;
                            operand = true;
                        }
                    }
                }
                b'(' => {
                    cursor.advance();
                    self.ops.push(Op::Paren)?;
                    operand = true;
                }
                b',' => {
                    if self.reduce_to_paren()? {
                        self.ops.push(Op::Paren)?;
                        cursor.advance();
                        operand = true;
                    } else if mode == Mode::Comma {
                        cursor.advance();
                        break;
                    } else {
                        return Err(error!(Expression));
                    }
                }
                b')' => {
                    if !self.reduce_to_paren()? {
                        if mode == Mode::Braces {
                            cursor.advance();
                            break;
                        }
                        return Err(error!(Expression));
                    }
                    cursor.advance();
                    match self.ops.last().copied() {
                        Some(op @ Op::Call(_)) | Some(op @ Op::Index(_)) => {
                            self.ops.pop()?;
                            self.apply(op)?;
                        }
                        _ => {}
                    }
                    operand = false;
                }
                _ => match Token::from_byte(ch) {
                    Some(token) => {
                        if !self.token(cursor, token, &mut operand)? {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        while let Some(&op) = self.ops.last() {
            if op == Op::Paren {
                return Err(error!(Expression));
            }
            self.ops.pop()?;
            self.apply(op)?;
        }
        if self.vals.len() != 1 {
            return Err(error!(Expression));
        }
        self.vals.pop()
    }

    /// Handles one token. False when the token ends the expression.
    fn token(&mut self, cursor: &mut Cursor, token: Token, operand: &mut bool) -> Result<bool> {
        use Token::*;
        match token {
            Constant => {
                cursor.advance();
                let val = match constant(cursor.next()) {
                    Some((_, val)) => val,
                    None => return Err(error!(Expression)),
                };
                self.vals.push(val)?;
                *operand = false;
            }
            Hex => {
                cursor.advance();
                let val = parse_int(cursor, 8, 16)?;
                self.vals.push(val)?;
                *operand = false;
            }
            Millis | Battery => {
                cursor.advance();
                cursor.expect(b')').map_err(|_| error!(Expression))?;
                let val = if token == Millis {
                    self.ctx.millis()
                } else {
                    self.ctx.battery()
                };
                self.vals.push(val)?;
                *operand = false;
            }
            Len => {
                cursor.advance();
                cursor.ignore_blanks();
                let name = cursor.next();
                if !name.is_ascii_uppercase() {
                    return Err(error!(Expression));
                }
                let len = match self.ctx.lookup(name) {
                    Lookup::Array(bytes) => bytes.len() as i32,
                    Lookup::Scalar(_) => return Err(error!(Expression)),
                };
                cursor.expect(b')').map_err(|_| error!(Expression))?;
                self.vals.push(len)?;
                *operand = false;
            }
            Abs | Rnd | PinP0 | PinP1 | PinP2 | BtGet => {
                cursor.advance();
                self.ops.push(Op::Call(token))?;
                self.ops.push(Op::Paren)?;
                *operand = true;
            }
            Sub if *operand => {
                cursor.advance();
                self.ops.push(Op::Negate)?;
            }
            _ => {
                let prec = match token.precedence() {
                    Some(prec) => prec,
                    None => return Ok(false),
                };
                if *operand {
                    return Err(error!(Expression));
                }
                cursor.advance();
                while let Some(&top) = self.ops.last() {
                    match top.precedence() {
                        Some(top_prec) if top_prec <= prec => {
                            self.ops.pop()?;
                            self.apply(top)?;
                        }
                        _ => break,
                    }
                }
                self.ops.push(Op::Binary(token))?;
                *operand = true;
            }
        }
        Ok(true)
    }

    /// Applies pending operators down to the nearest `(`, which is
    /// removed. False when the stack ran out first.
    fn reduce_to_paren(&mut self) -> Result<bool> {
        while let Some(&op) = self.ops.last() {
            self.ops.pop()?;
            if op == Op::Paren {
                return Ok(true);
            }
            self.apply(op)?;
        }
        Ok(false)
    }

    fn apply(&mut self, op: Op) -> Result<()> {
        let val = match op {
            Op::Negate => self.vals.pop()?.wrapping_neg(),
            Op::Binary(token) => {
                let (lhs, rhs) = self.vals.pop_2()?;
                binary(token, lhs, rhs)?
            }
            Op::Call(token) => {
                let arg = self.vals.pop()?;
                self.call(token, arg)?
            }
            Op::Index(name) => {
                let idx = self.vals.pop()?;
                match self.ctx.lookup(name) {
                    Lookup::Array(bytes) if idx >= 0 && (idx as usize) < bytes.len() => {
                        bytes[idx as usize] as i32
                    }
                    _ => return Err(error!(Expression)),
                }
            }
            Op::Paren => return Err(error!(Expression)),
        };
        self.vals.push(val)
    }

    fn call(&mut self, token: Token, arg: i32) -> Result<i32> {
        use Token::*;
        match token {
            Abs => Ok(arg.wrapping_abs()),
            Rnd => {
                if arg == 0 {
                    return Err(error!(DivisionByZero));
                }
                Ok(self.ctx.random().rem_euclid(arg))
            }
            PinP0 | PinP1 | PinP2 => {
                let major = token as u8 - PinP0 as u8;
                if !(0..8).contains(&arg) {
                    return Err(error!(BadPin));
                }
                self.ctx.pin_read(major, arg as u8).ok_or(error!(BadPin))
            }
            BtGet => {
                if !(0..0x8000).contains(&arg) {
                    return Err(error!(Expression));
                }
                self.ctx.ble_param(arg as u16).ok_or(error!(Expression))
            }
            _ => Err(error!(Expression)),
        }
    }
}

fn binary(token: Token, lhs: i32, rhs: i32) -> Result<i32> {
    use Token::*;
    let val = match token {
        Add => lhs.wrapping_add(rhs),
        Sub => lhs.wrapping_sub(rhs),
        Mul => lhs.wrapping_mul(rhs),
        Div | Mod if rhs == 0 => return Err(error!(DivisionByZero)),
        Div => lhs.wrapping_div(rhs),
        Mod => lhs.wrapping_rem(rhs),
        And => lhs & rhs,
        Or => lhs | rhs,
        Xor => lhs ^ rhs,
        Shl => lhs.wrapping_shl(rhs as u32),
        Shr => lhs.wrapping_shr(rhs as u32),
        Ge => (lhs >= rhs) as i32,
        Gt => (lhs > rhs) as i32,
        Le => (lhs <= rhs) as i32,
        Lt => (lhs < rhs) as i32,
        Eq | EqEq => (lhs == rhs) as i32,
        Ne | NeBang => (lhs != rhs) as i32,
        _ => return Err(error!(Expression)),
    };
    Ok(val)
}
