//! Utility functions

/// Align `val` up to nearest `SIZE`
///
/// # Panics
/// If `SIZE` is not a power of two
pub const fn align_up<const SIZE: usize>(val: usize) -> usize {
    let mut rv = align_down::<SIZE>(val);
    if !aligned::<SIZE>(val) {
        rv += SIZE;
    }
    rv
}

/// Align `val` down to nearest `SIZE`
///
/// # Panics
/// If `SIZE` is not a power of two
pub const fn align_down<const SIZE: usize>(val: usize) -> usize {
    assert!(SIZE.is_power_of_two());
    val & !(SIZE - 1)
}

/// Return true if `val` is aligned to `SIZE`
///
/// # Panics
/// If `SIZE` is not a power of two
pub const fn aligned<const SIZE: usize>(val: usize) -> bool {
    assert!(SIZE.is_power_of_two());
    val & (SIZE - 1) == 0
}

/// Like [align_up], for alignments only known at runtime
///
/// Returns `None` on overflow or if `align` is not a power of two.
pub const fn checked_align_up(val: usize, align: usize) -> Option<usize> {
    if !align.is_power_of_two() {
        return None;
    }
    match val.checked_add(align - 1) {
        Some(val) => Some(val & !(align - 1)),
        None => None,
    }
}
