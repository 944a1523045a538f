#[inline(always)]
#[cold]
pub(crate) fn cold_path() {}

/// JSON insignificant whitespace.
#[inline]
pub(crate) const fn is_whitespace(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r')
}
