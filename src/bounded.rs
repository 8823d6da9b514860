//! Capacity-bounded strings.
//!
//! Every string that crosses the API boundary lives in a
//! [`heapless::String`] whose capacity is fixed at compile time. Copies into
//! these buffers truncate instead of overflowing: a source longer than the
//! capacity keeps its longest prefix that ends on a `char` boundary.
//!
//! Capacities count data bytes only. A field that was a 64-byte,
//! NUL-terminated array on the wire-compatible C layout is a
//! `BoundedString<63>` here.

use std::fmt::Write as _;

use crate::error::{Error, Result};

/// A string holding at most `N` bytes of UTF-8 data.
pub type BoundedString<const N: usize> = heapless::String<N>;

/// Returns the largest index `<= max` that lies on a `char` boundary of `s`.
#[must_use]
pub fn floor_char_boundary(s: &str, max: usize) -> usize {
    if max >= s.len() {
        return s.len();
    }

    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    end
}

/// Replaces the contents of `dest` with as much of `src` as fits.
///
/// Returns `true` if `src` had to be truncated.
pub fn copy_truncated<const N: usize>(dest: &mut BoundedString<N>, src: &str) -> bool {
    dest.clear();

    let end = floor_char_boundary(src, N);
    // Cannot fail: `end <= N` and `dest` is empty.
    let _ = dest.push_str(&src[..end]);

    end < src.len()
}

/// Creates a bounded string from `src`, truncating silently.
#[must_use]
pub fn truncated<const N: usize>(src: &str) -> BoundedString<N> {
    let mut dest = BoundedString::new();
    copy_truncated(&mut dest, src);
    dest
}

/// Appends `src` to `dest` or fails without modifying `dest`.
///
/// Used where truncation would change meaning, like request paths and
/// form bodies.
pub fn push_exact<const N: usize>(dest: &mut BoundedString<N>, src: &str) -> Result<()> {
    dest.push_str(src).map_err(|()| {
        Error::out_of_range(format!(
            "{} bytes do not fit in a buffer of {N} bytes holding {}",
            src.len(),
            dest.len()
        ))
    })
}

/// Appends formatted text to `dest`, failing on overflow.
///
/// On failure `dest` may hold a partially written prefix; callers discard
/// the buffer.
pub fn push_fmt<const N: usize>(
    dest: &mut BoundedString<N>,
    args: std::fmt::Arguments<'_>,
) -> Result<()> {
    dest.write_fmt(args)
        .map_err(|_| Error::out_of_range(format!("formatted text exceeds {N} bytes")))
}
