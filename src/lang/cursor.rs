use super::{LineNumber, Token, NL};
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// Read position over tokenized text.
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    text: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(text: &'a [u8]) -> Cursor<'a> {
        Cursor { text, pos: 0 }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn rest(&self) -> &'a [u8] {
        &self.text[self.pos.min(self.text.len())..]
    }

    /// Current byte; reads past the end see `NL`.
    pub fn peek(&self) -> u8 {
        self.text.get(self.pos).copied().unwrap_or(NL)
    }

    pub fn peek_at(&self, offset: usize) -> u8 {
        self.text.get(self.pos + offset).copied().unwrap_or(NL)
    }

    pub fn advance(&mut self) {
        if self.pos < self.text.len() {
            self.pos += 1;
        }
    }

    pub fn next(&mut self) -> u8 {
        let ch = self.peek();
        self.advance();
        ch
    }

    pub fn ignore_blanks(&mut self) {
        while self.peek() == b' ' || self.peek() == b'\t' {
            self.advance();
        }
    }

    pub fn at_eol(&self) -> bool {
        self.peek() == NL
    }

    /// Trailing blanks then end of line, or a general error.
    pub fn expect_eol(&mut self) -> Result<()> {
        self.ignore_blanks();
        if self.at_eol() {
            Ok(())
        } else {
            Err(error!(General))
        }
    }

    pub fn accept(&mut self, byte: u8) -> bool {
        self.ignore_blanks();
        if self.peek() == byte {
            self.advance();
            true
        } else {
            false
        }
    }

    pub fn accept_token(&mut self, token: Token) -> bool {
        self.accept(token as u8)
    }

    pub fn expect(&mut self, byte: u8) -> Result<()> {
        if self.accept(byte) {
            Ok(())
        } else {
            Err(error!(General))
        }
    }

    pub fn expect_token(&mut self, token: Token) -> Result<()> {
        self.expect(token as u8)
    }

    /// A variable name `A`..`Z`.
    pub fn variable(&mut self) -> Result<u8> {
        self.ignore_blanks();
        let ch = self.peek();
        if ch.is_ascii_uppercase() {
            self.advance();
            Ok(ch)
        } else {
            Err(error!(General))
        }
    }

    /// Leading line number. Zero when absent, `LineNumber::max_value()`
    /// when the digits exceed the valid range.
    pub fn line_number(&mut self) -> LineNumber {
        let mut num: u32 = 0;
        while self.peek().is_ascii_digit() {
            if num < 0x10000 {
                num = num * 10 + (self.next() - b'0') as u32;
            } else {
                self.advance();
            }
        }
        if num > MAX_LINE_NUMBER as u32 {
            LineNumber::max_value()
        } else {
            num as LineNumber
        }
    }
}

/// Highest number a stored line may use. The ids above it mark special
/// records and free space in flash.
pub const MAX_LINE_NUMBER: LineNumber = 0xFFFD;
