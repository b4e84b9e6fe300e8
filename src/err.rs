use std::{
    io,
    fmt::{self, Write},
    path::PathBuf,
};
use colored::Colorize;
use crate::ext;

/// General enum, representing possible errors.
#[derive(Debug)]
pub enum Error {
    Io(io::Error, Vec<PathBuf>),
    /// Allele-count matrix has no rows or no columns.
    EmptyInput(String),
    /// Allele-frequency informed cost cannot be calculated (infinite logit, non-positive score).
    DegenerateCost(String),
    /// Sample cost is zero, negative or not finite.
    InvalidCost(String),
    InvalidInput(String),
    InvalidData(String),
    ParsingError(String),
    RuntimeError(String),
    JsonLoad(String),
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e, Vec::new())
    }
}

impl From<json::JsonError> for Error {
    fn from(e: json::JsonError) -> Self {
        Self::JsonLoad(e.to_string())
    }
}

impl Error {
    /// Format error message.
    pub fn display(&self) -> String {
        let mut s = String::new();
        match self {
            Self::Io(e, files) => {
                write!(s, "{} in relation to ", "Input/Output error".red()).unwrap();
                if files.is_empty() {
                    write!(s, "unnamed streams").unwrap();
                } else {
                    write!(s, "{}", ext::fmt::paths(files).cyan()).unwrap();
                }
                write!(s, ": {}", e.kind()).unwrap();
                if let Some(e2) = e.get_ref() {
                    write!(s, ", {}", e2).unwrap();
                }
            }
            Self::EmptyInput(e) => write!(s, "{}: {}", "Empty input".red(), e).unwrap(),
            Self::DegenerateCost(e) => write!(s, "{}: {}", "Degenerate sample cost".red(), e).unwrap(),
            Self::InvalidCost(e) => write!(s, "{}: {}", "Invalid sample cost".red(), e).unwrap(),
            Self::InvalidInput(e) => write!(s, "{}: {}", "Invalid input".red(), e).unwrap(),
            Self::InvalidData(e) => write!(s, "{}: {}", "Invalid data".red(), e).unwrap(),
            Self::ParsingError(e) => write!(s, "{}: {}", "Parsing error".red(), e).unwrap(),
            Self::RuntimeError(e) => write!(s, "{}: {}", "Runtime error".red(), e).unwrap(),
            Self::JsonLoad(e) => write!(s, "{}: {}", "Could not load JSON".red(), e).unwrap(),
        };
        s
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.display())
    }
}

impl std::error::Error for Error {}

macro_rules! validate_param {
    ($cond:expr, $($arg:expr),+) => {{
        if !($cond) {
            (
                Err($crate::Error::InvalidInput(format!($($arg),+)))
            ?)
        }
    }};
}
pub(crate) use validate_param;

macro_rules! add_path {
    (!) => {
        |e| $crate::Error::Io(e, Vec::new())
    };
    ($path:expr) => {
        |e| $crate::Error::Io(e, vec![std::convert::AsRef::<std::path::Path>::as_ref(&$path).to_owned()])
    };
    ($($path:expr),+) => {
        |e| {
            let mut v = Vec::new();
            $(
                v.push(std::convert::AsRef::<std::path::Path>::as_ref(&$path).to_owned());
            )*
            $crate::Error::Io(e, v)
        }
    };
}
pub(crate) use add_path;

macro_rules! error {
    ($var:ident, $($arg:expr),+ $(,)?) => {
        $crate::Error::$var(format!($($arg),+))
    }
}
pub(crate) use error;

/// Wrapper around the standard result.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    fn check_positive(x: i32) -> Result<i32> {
        validate_param!(x > 0, "Value ({}) must be positive", x);
        Ok(x)
    }

    #[test]
    fn validate_macro() {
        assert_eq!(check_positive(3).unwrap(), 3);
        match check_positive(-1) {
            Err(Error::InvalidInput(s)) => assert!(s.contains("-1")),
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn error_macro_and_display() {
        colored::control::set_override(false);
        let e = error!(InvalidCost, "Sample {} has cost {}", "S1", 0.0);
        assert_eq!(e.display(), "Invalid sample cost: Sample S1 has cost 0");
        let io_err = Error::Io(io::Error::new(io::ErrorKind::NotFound, "missing"),
            vec![PathBuf::from("a.tsv"), PathBuf::from("b.tsv")]);
        assert_eq!(io_err.display(), "Input/Output error in relation to a.tsv, b.tsv: entity not found, missing");
    }
}
