use core::{
    fmt::{self, Display},
    result::Result,
};

/// Alloc-abi error type
#[derive(Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum AllocAbiError {
    InvalidStatus(i32),
}

impl Display for AllocAbiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Self::InvalidStatus(code) => {
                write!(f, "Invalid status code: {code}")
            }
        }
    }
}
