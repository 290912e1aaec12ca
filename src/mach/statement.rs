use crate::error;
use crate::lang::{Cursor, Error, Token};

type Result<T> = std::result::Result<T, Error>;

/// One statement kind per stored line, chosen by its leading byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statement {
    List,
    New,
    Run,
    Mem,
    Rem,
    Let,
    If,
    Elif,
    Else,
    End,
    Goto,
    Gosub,
    Return,
    For,
    Next,
    Print,
    Dim,
    Timer,
    Delay,
    Autorun,
    Dsave,
    Dload,
    Open,
    Close,
    Read,
    Write,
    Pin(u8),
    Reboot,
}

impl Statement {
    /// Consumes the leading keyword. A bare variable name is an
    /// assignment and is left for the handler.
    pub fn decode(cursor: &mut Cursor) -> Result<Statement> {
        cursor.ignore_blanks();
        let ch = cursor.peek();
        if ch.is_ascii_uppercase() {
            return Ok(Statement::Let);
        }
        use Token::*;
        let statement = match Token::from_byte(ch) {
            Some(List) => Statement::List,
            Some(New) => Statement::New,
            Some(Run) => Statement::Run,
            Some(Mem) => Statement::Mem,
            Some(Rem) | Some(Comment) => Statement::Rem,
            Some(Let) => Statement::Let,
            Some(If) => Statement::If,
            Some(Elif) => Statement::Elif,
            Some(Else) => Statement::Else,
            Some(End) => Statement::End,
            Some(Goto) => Statement::Goto,
            Some(Gosub) => Statement::Gosub,
            Some(Return) => Statement::Return,
            Some(For) => Statement::For,
            Some(Next) => Statement::Next,
            Some(Print) => Statement::Print,
            Some(Dim) => Statement::Dim,
            Some(Timer) => Statement::Timer,
            Some(Delay) => Statement::Delay,
            Some(Autorun) => Statement::Autorun,
            Some(Dsave) => Statement::Dsave,
            Some(Dload) => Statement::Dload,
            Some(Open) => Statement::Open,
            Some(Close) => Statement::Close,
            Some(Read) => Statement::Read,
            Some(Write) => Statement::Write,
            Some(PinP0) => Statement::Pin(0),
            Some(PinP1) => Statement::Pin(1),
            Some(PinP2) => Statement::Pin(2),
            Some(Reboot) => Statement::Reboot,
            _ => return Err(error!(General)),
        };
        cursor.advance();
        Ok(statement)
    }

    /// Statements that only make sense inside a running program.
    pub fn is_program_only(self) -> bool {
        match self {
            Statement::If | Statement::Elif | Statement::Else | Statement::Delay => true,
            _ => false,
        }
    }
}
