// Bookkeeping word stored right before every block
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub(crate) struct Header {
    pub size: usize,
}

impl Header {
    pub(crate) const SIZE: usize = core::mem::size_of::<Header>();

    // SAFETY: `data - SIZE` must be valid for a word-aligned write
    pub(crate) unsafe fn write(self, data: *mut u8) {
        unsafe { (data.sub(Self::SIZE) as *mut Header).write(self) }
    }

    // SAFETY: `data` must have been passed to `write` earlier
    pub(crate) unsafe fn read(data: *const u8) -> Header {
        unsafe { (data.sub(Self::SIZE) as *const Header).read() }
    }
}
