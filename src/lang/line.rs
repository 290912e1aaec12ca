use super::token::constant;
use super::{lex, Cursor, LineNumber, Token, NL};
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// ## A typed line after tokenizing
///
/// `number` is zero for direct mode. `text` excludes the line number
/// and always ends with `NL`.
#[derive(Debug, Clone, PartialEq)]
pub struct Line {
    number: LineNumber,
    text: Vec<u8>,
}

impl Line {
    pub fn new(s: &str) -> Result<Line> {
        let mut buf = lex::prepare(s)?;
        lex::tokenize(&mut buf);
        let mut cursor = Cursor::new(&buf);
        let number = cursor.line_number();
        if number == LineNumber::max_value() {
            return Err(error!(General));
        }
        cursor.ignore_blanks();
        let text = cursor.rest().to_vec();
        Ok(Line { number, text })
    }

    pub fn from_stored(number: LineNumber, text: &[u8]) -> Line {
        Line {
            number,
            text: text.to_vec(),
        }
    }

    pub fn number(&self) -> LineNumber {
        self.number
    }

    pub fn is_direct(&self) -> bool {
        self.number == 0
    }

    pub fn is_empty(&self) -> bool {
        self.text.first().map_or(true, |&ch| ch == NL)
    }

    pub fn text(&self) -> &[u8] {
        &self.text
    }
}

impl std::fmt::Display for Line {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        if self.is_direct() {
            write!(f, "{}", listing(&self.text))
        } else {
            write!(f, "{} {}", self.number, listing(&self.text))
        }
    }
}

/// Turns token bytes back into readable text.
pub fn listing(text: &[u8]) -> String {
    let mut out: Vec<u8> = vec![];
    let mut last = b' ';
    let mut quote: Option<u8> = None;
    let mut idx = 0;
    while idx < text.len() {
        let ch = text[idx];
        idx += 1;
        if let Some(q) = quote {
            if ch == NL {
                break;
            }
            out.push(ch);
            if ch == q {
                quote = None;
            }
            last = ch;
            continue;
        }
        if ch == NL {
            break;
        }
        let word = match Token::from_byte(ch) {
            None => {
                if ch == b'"' || ch == b'\'' {
                    quote = Some(ch);
                }
                out.push(ch);
                last = ch;
                continue;
            }
            Some(Token::Constant) => {
                let name = text.get(idx).and_then(|&b| constant(b)).map(|(n, _)| n);
                idx += 1;
                name.unwrap_or("?")
            }
            Some(token) => token.text(),
        };
        if !word.bytes().any(|b| b.is_ascii_alphabetic()) {
            out.extend_from_slice(word.as_bytes());
            last = word.as_bytes()[word.len() - 1];
            continue;
        }
        if last.is_ascii_alphanumeric() || last == b')' || last == b'"' || last == b'\'' {
            out.push(b' ');
        }
        out.extend_from_slice(word.as_bytes());
        let next = text.get(idx).copied().unwrap_or(NL);
        if word.ends_with('(') || word == Token::Hex.text() {
            last = b'(';
        } else if next == NL || next == b',' || next == b')' {
            last = word.as_bytes()[word.len() - 1];
        } else {
            out.push(b' ');
            last = b' ';
        }
    }
    String::from_utf8_lossy(&out).into_owned()
}
