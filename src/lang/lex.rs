use super::token::longest_match;
use super::{MAX_LINE_LEN, NL};
use crate::lang::Error;

type Result<T> = std::result::Result<T, Error>;

/// Uppercases a typed line outside of quotes and terminates it with `NL`.
/// Carriage returns and line feeds from the terminal are dropped.
pub fn prepare(s: &str) -> Result<Vec<u8>> {
    let mut quote: Option<u8> = None;
    let mut buf = Vec::with_capacity(s.len() + 1);
    for &ch in s.as_bytes() {
        match ch {
            b'\r' | b'\n' => continue,
            b'"' | b'\'' => match quote {
                Some(q) if q == ch => quote = None,
                None => quote = Some(ch),
                _ => {}
            },
            _ => {}
        }
        if quote.is_none() {
            buf.push(ch.to_ascii_uppercase());
        } else {
            buf.push(ch);
        }
    }
    if buf.len() > MAX_LINE_LEN {
        return Err(error!(TooBig));
    }
    buf.push(NL);
    Ok(buf)
}

/// Rewrites a prepared line into token bytes in place.
/// The write position never passes the read position.
pub fn tokenize(buf: &mut Vec<u8>) {
    if buf.last() != Some(&NL) {
        buf.push(NL);
    }
    let mut write = 0;
    let mut read = 0;
    loop {
        let ch = buf[read];
        if ch == NL {
            buf[write] = NL;
            buf.truncate(write + 1);
            return;
        }
        if ch == b'"' || ch == b'\'' {
            buf[write] = ch;
            write += 1;
            read += 1;
            while buf[read] != NL {
                let next = buf[read];
                buf[write] = next;
                write += 1;
                read += 1;
                if next == ch {
                    break;
                }
            }
            continue;
        }
        if let Some(keyword) = longest_match(&buf[read..]) {
            if write > 0 && buf[write - 1] == b' ' {
                write -= 1;
            }
            buf[write] = keyword.token as u8;
            write += 1;
            if let Some(constant) = keyword.constant {
                buf[write] = constant;
                write += 1;
            }
            read += keyword.text.len();
            while buf[read] == b' ' || buf[read] == b'\t' {
                read += 1;
            }
            continue;
        }
        if ch.is_ascii_uppercase() {
            while buf[read].is_ascii_uppercase() {
                buf[write] = buf[read];
                write += 1;
                read += 1;
            }
        } else if ch == b' ' || ch == b'\t' {
            if write > 0 && buf[write - 1] != b' ' {
                buf[write] = b' ';
                write += 1;
            }
            while buf[read] == b' ' || buf[read] == b'\t' {
                read += 1;
            }
        } else {
            buf[write] = ch;
            write += 1;
            read += 1;
        }
    }
}
