#[derive(Clone, PartialEq, Eq)]
pub struct Error {
    code: ErrorCode,
    message: &'static str,
}

#[doc(hidden)]
#[macro_export]
macro_rules! error {
    ($err:ident) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err)
    };
    ($err:ident; $msg:expr) => {
        $crate::lang::Error::new($crate::lang::ErrorCode::$err).message($msg)
    };
}

impl Error {
    pub fn new(code: ErrorCode) -> Error {
        Error { code, message: "" }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn is_out_of_memory(&self) -> bool {
        self.code == ErrorCode::OutOfMemory
    }

    pub fn message(&self, message: &'static str) -> Error {
        debug_assert_eq!(self.message.len(), 0);
        Error {
            code: self.code,
            message,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    General = 1,
    Expression = 2,
    DivisionByZero = 3,
    OutOfMemory = 4,
    TooBig = 5,
    BadPin = 6,
    Direct = 7,
    EndOfFile = 8,
    Break = 9,
}

impl std::fmt::Debug for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Error {{ {} }}", self.to_string())
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let code_str = match self.code {
            ErrorCode::General => "Error",
            ErrorCode::Expression => "Bad expression",
            ErrorCode::DivisionByZero => "Divide by zero",
            ErrorCode::OutOfMemory => "Out of memory",
            ErrorCode::TooBig => "Too big",
            ErrorCode::BadPin => "Bad pin",
            ErrorCode::Direct => "Not in direct",
            ErrorCode::EndOfFile => "EOF",
            ErrorCode::Break => "Break",
        };
        if self.message.is_empty() {
            write!(f, "{}", code_str)
        } else {
            write!(f, "{}; {}", code_str, self.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(error!(DivisionByZero).to_string(), "Divide by zero");
        assert_eq!(
            error!(OutOfMemory; "EXPRESSION STACK").to_string(),
            "Out of memory; EXPRESSION STACK"
        );
    }

    #[test]
    fn test_code() {
        assert!(error!(OutOfMemory).is_out_of_memory());
        assert_eq!(error!(BadPin).code(), ErrorCode::BadPin);
    }
}
