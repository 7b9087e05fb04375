//! Owned-buffer replacement and fixed-capacity copy helpers.
//!
//! Two disciplines are used by [`crate::domain::packet::Packet`]:
//!
//! - **Replace**: build a new buffer sized exactly to the new contents and
//!   only then swap it into the destination.  If the allocation fails the
//!   destination still holds its old contents; a caller never observes a
//!   half-written buffer.
//! - **Truncating copy**: copy as much of the source as fits into a
//!   caller-provided slice, never writing past its end.

use thiserror::Error;

/// Errors produced by the replace helpers.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BufferError {
    /// The allocator refused to provide the requested number of bytes.
    #[error("allocation of {requested} bytes failed")]
    Allocation { requested: usize },
}

/// Replaces the contents of `dest` with `src`.
///
/// The new string is allocated with exactly `src.len()` bytes of capacity.
/// Replacing a string with itself is a no-op.
///
/// # Errors
///
/// Returns [`BufferError::Allocation`] when the allocation fails; `dest` is
/// left unchanged in that case.
pub fn replace_text(dest: &mut String, src: &str) -> Result<(), BufferError> {
    if dest.as_str() == src {
        return Ok(());
    }
    let mut fresh = String::new();
    fresh
        .try_reserve_exact(src.len())
        .map_err(|_| BufferError::Allocation {
            requested: src.len(),
        })?;
    fresh.push_str(src);
    *dest = fresh;
    Ok(())
}

/// Replaces the contents of `dest` with `src`.
///
/// `None` or an empty slice clears `dest` and releases its allocation.
///
/// # Errors
///
/// Returns [`BufferError::Allocation`] when the allocation fails; `dest` is
/// left unchanged in that case.
pub fn replace_bytes(dest: &mut Vec<u8>, src: Option<&[u8]>) -> Result<(), BufferError> {
    let src = match src {
        Some(s) if !s.is_empty() => s,
        _ => {
            *dest = Vec::new();
            return Ok(());
        }
    };
    let mut fresh = Vec::new();
    fresh
        .try_reserve_exact(src.len())
        .map_err(|_| BufferError::Allocation {
            requested: src.len(),
        })?;
    fresh.extend_from_slice(src);
    *dest = fresh;
    Ok(())
}

/// Copies as much of `src` as fits into `dest`, returning the number of bytes
/// copied.
pub fn copy_bytes_truncated(dest: &mut [u8], src: &[u8]) -> usize {
    let n = dest.len().min(src.len());
    dest[..n].copy_from_slice(&src[..n]);
    n
}

/// Copies `src` into `dest` as a NUL-terminated string, truncating so that
/// the terminator always fits.
///
/// Returns the number of text bytes copied, not counting the terminator.
/// A zero-length `dest` has no room for the terminator and is left untouched.
pub fn copy_text_truncated(dest: &mut [u8], src: &str) -> usize {
    let Some(limit) = dest.len().checked_sub(1) else {
        return 0;
    };
    let n = copy_bytes_truncated(&mut dest[..limit], src.as_bytes());
    dest[n] = 0;
    n
}
