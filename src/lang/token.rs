/// First byte value used by tokens; everything below is plain ASCII.
pub const TOKEN_BASE: u8 = 0x80;

macro_rules! tokens {
    ($($name:ident => $text:expr,)*) => {
        /// Reserved bytes of the tokenized program text.
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        #[repr(u8)]
        pub enum Token {
            Constant = TOKEN_BASE,
            $($name,)*
        }

        const TOKENS: &[Token] = &[Token::Constant, $(Token::$name,)*];

        impl Token {
            pub fn text(self) -> &'static str {
                match self {
                    Token::Constant => "",
                    $(Token::$name => $text,)*
                }
            }
        }
    };
}

tokens! {
    List => "LIST",
    Mem => "MEM",
    New => "NEW",
    Run => "RUN",
    Next => "NEXT",
    Let => "LET",
    If => "IF",
    Elif => "ELIF",
    Else => "ELSE",
    End => "END",
    Goto => "GOTO",
    Gosub => "GOSUB",
    Return => "RETURN",
    Rem => "REM",
    Comment => "//",
    For => "FOR",
    Print => "PRINT",
    Reboot => "REBOOT",
    Dim => "DIM",
    Timer => "TIMER",
    Delay => "DELAY",
    Autorun => "AUTORUN",
    Open => "OPEN",
    Close => "CLOSE",
    Read => "READ",
    Write => "WRITE",
    Append => "APPEND",
    Dsave => "DSAVE",
    Dload => "DLOAD",
    PinP0 => "P0(",
    PinP1 => "P1(",
    PinP2 => "P2(",
    Add => "+",
    Sub => "-",
    Mul => "*",
    Div => "/",
    Mod => "%",
    And => "&",
    Or => "|",
    Xor => "^",
    Ge => ">=",
    Ne => "<>",
    Gt => ">",
    EqEq => "==",
    Eq => "=",
    Le => "<=",
    Lt => "<",
    NeBang => "!=",
    Shl => "<<",
    Shr => ">>",
    Abs => "ABS(",
    Len => "LEN(",
    Rnd => "RND(",
    Millis => "MILLIS(",
    Battery => "BATTERY(",
    Hex => "0X",
    BtGet => "BTGET(",
    To => "TO",
    Step => "STEP",
    Stop => "STOP",
    Repeat => "REPEAT",
}

impl Token {
    pub fn from_byte(byte: u8) -> Option<Token> {
        if byte < TOKEN_BASE {
            return None;
        }
        TOKENS.get((byte - TOKEN_BASE) as usize).copied()
    }

    pub fn is(byte: u8, token: Token) -> bool {
        byte == token as u8
    }

    /// Binding strength of a binary operator. Lower binds tighter.
    pub fn precedence(self) -> Option<u8> {
        use Token::*;
        match self {
            Mul | Div | Mod => Some(3),
            Add | Sub => Some(4),
            Shl | Shr => Some(5),
            Ge | Gt | Le | Lt => Some(6),
            Ne | EqEq | Eq | NeBang => Some(7),
            And => Some(8),
            Xor => Some(9),
            Or => Some(10),
            _ => None,
        }
    }
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}", self.text())
    }
}

/// Symbolic constants. The byte following `Token::Constant` is the
/// table position with the high bit set.
pub const CONSTANTS: &[(&str, i32)] = &[
    ("TRUE", 1),
    ("FALSE", 0),
    ("ON", 1),
    ("OFF", 0),
    ("YES", 1),
    ("NO", 0),
    ("HIGH", 1),
    ("LOW", 0),
    ("ADVERT_ENABLED", 0x0305),
    ("MIN_CONN_INTERVAL", 0x0311),
    ("MAX_CONN_INTERVAL", 0x0312),
    ("SLAVE_LATENCY", 0x0313),
    ("TIMEOUT_MULTIPLIER", 0x0314),
    ("RXGAIN", 0x0F00),
    ("TXPOWER", 0x0F01),
    ("LIM_DISC_ADV_INT_MIN", 6),
    ("LIM_DISC_ADV_INT_MAX", 7),
    ("GEN_DISC_ADV_INT_MIN", 8),
    ("GEN_DISC_ADV_INT_MAX", 9),
];

pub fn constant(byte: u8) -> Option<(&'static str, i32)> {
    if byte & 0x80 == 0 {
        return None;
    }
    CONSTANTS.get((byte & 0x7F) as usize).copied()
}

#[derive(Debug, Clone, Copy)]
pub struct Keyword {
    pub text: &'static [u8],
    pub token: Token,
    pub constant: Option<u8>,
}

const PARTITIONS: usize = 13;

thread_local!(
    static KEYWORDS: Vec<Vec<Keyword>> = {
        let mut table: Vec<Vec<Keyword>> = vec![vec![]; PARTITIONS];
        let words = TOKENS
            .iter()
            .filter(|t| !t.text().is_empty())
            .map(|&token| Keyword {
                text: token.text().as_bytes(),
                token,
                constant: None,
            });
        let constants = CONSTANTS.iter().enumerate().map(|(idx, (name, _))| Keyword {
            text: name.as_bytes(),
            token: Token::Constant,
            constant: Some(0x80 | idx as u8),
        });
        for keyword in words.chain(constants) {
            table[keyword.text[0] as usize % PARTITIONS].push(keyword);
        }
        for partition in table.iter_mut() {
            partition.sort_by(|a, b| b.text.len().cmp(&a.text.len()));
        }
        table
    };
);

/// Longest keyword that prefixes `input`.
pub fn longest_match(input: &[u8]) -> Option<Keyword> {
    let first = *input.first()?;
    KEYWORDS.with(|table| {
        table[first as usize % PARTITIONS]
            .iter()
            .find(|k| input.starts_with(k.text))
            .copied()
    })
}
