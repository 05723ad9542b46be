use crate::AllocAbiError;
use core::{
    fmt::{self, Display},
    mem,
    result::Result,
};

/// Status code returned by [crate::RawAllocator::posix_allocate_aligned]
///
/// Values match the errno codes `posix_memalign`(3) uses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, enumn::N)]
#[repr(i32)]
pub enum Status {
    Ok = 0,
    OutOfMemory = 12,
    InvalidArgument = 22,
}

impl Status {
    /// True if this is [Status::Ok]
    pub const fn is_ok(self) -> bool {
        matches!(self, Self::Ok)
    }
}

impl From<Status> for i32 {
    fn from(status: Status) -> Self {
        status as i32
    }
}

impl TryFrom<i32> for Status {
    type Error = AllocAbiError;
    fn try_from(code: i32) -> Result<Self, AllocAbiError> {
        Self::n(code).ok_or(AllocAbiError::InvalidStatus(code))
    }
}

impl Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::OutOfMemory => write!(f, "out of memory"),
            Self::InvalidArgument => write!(f, "invalid argument"),
        }
    }
}

/// Check an alignment passed to `posix_memalign`
///
/// It must be a power of two and a multiple of the pointer size.
pub const fn check_posix_alignment(align: usize) -> Result<(), Status> {
    if align.is_power_of_two() && align % mem::size_of::<*mut u8>() == 0 {
        Ok(())
    } else {
        Err(Status::InvalidArgument)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_codes() {
        assert_eq!(Status::try_from(0), Ok(Status::Ok));
        assert_eq!(Status::try_from(12), Ok(Status::OutOfMemory));
        assert_eq!(i32::from(Status::InvalidArgument), 22);
        assert_eq!(Status::try_from(7), Err(AllocAbiError::InvalidStatus(7)));
    }

    #[test]
    fn display() {
        assert!(Status::Ok.is_ok());
        assert!(!Status::OutOfMemory.is_ok());
        assert_eq!(Status::OutOfMemory.to_string(), "out of memory");
        assert_eq!(Status::InvalidArgument.to_string(), "invalid argument");
    }

    #[test]
    fn posix_alignment() {
        let word = mem::size_of::<*mut u8>();
        assert_eq!(check_posix_alignment(word), Ok(()));
        assert_eq!(check_posix_alignment(4096), Ok(()));
        assert_eq!(check_posix_alignment(0), Err(Status::InvalidArgument));
        assert_eq!(check_posix_alignment(word * 3), Err(Status::InvalidArgument));
        assert_eq!(check_posix_alignment(1), Err(Status::InvalidArgument));
    }
}
