//! HTTP Range request parsing module
//!
//! Single `bytes=` ranges only (RFC 7233); anything else is served in full.

/// A resolved, inclusive byte range within a representation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: usize,
    pub end: usize,
}

impl ByteRange {
    pub const fn byte_count(&self) -> usize {
        self.end - self.start + 1
    }

    /// `Content-Range` value, e.g. `bytes 0-9/100`
    pub fn content_range(&self, total: usize) -> String {
        format!("bytes {}-{}/{total}", self.start, self.end)
    }
}

/// Outcome of evaluating a `Range` header against a representation size
#[derive(Debug, PartialEq, Eq)]
pub enum RangeOutcome {
    Partial(ByteRange),
    /// Should produce 416
    Unsatisfiable,
    /// Missing, malformed, multi-range or non-bytes: serve the full body
    Full,
}

/// Evaluate a `Range` header
///
/// Supported forms: `bytes=start-end`, `bytes=start-`, `bytes=-suffix`.
pub fn evaluate(range_header: Option<&str>, size: usize) -> RangeOutcome {
    let Some(spec) = range_header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return RangeOutcome::Full;
    };
    if spec.contains(',') {
        return RangeOutcome::Full;
    }
    let Some((first, last)) = spec.split_once('-') else {
        return RangeOutcome::Full;
    };
    let (first, last) = (first.trim(), last.trim());

    if first.is_empty() {
        let Ok(suffix) = last.parse::<usize>() else {
            return RangeOutcome::Full;
        };
        if suffix == 0 || size == 0 {
            return RangeOutcome::Unsatisfiable;
        }
        return RangeOutcome::Partial(ByteRange {
            start: size.saturating_sub(suffix),
            end: size - 1,
        });
    }

    let Ok(start) = first.parse::<usize>() else {
        return RangeOutcome::Full;
    };
    let end = if last.is_empty() {
        None
    } else {
        match last.parse::<usize>() {
            Ok(e) => Some(e),
            Err(_) => return RangeOutcome::Full,
        }
    };

    if start >= size {
        return RangeOutcome::Unsatisfiable;
    }
    let end = end.map_or(size - 1, |e| e.min(size - 1));
    if start > end {
        // e.g. bytes=5-2 is syntactically invalid; ignore it
        return RangeOutcome::Full;
    }
    RangeOutcome::Partial(ByteRange { start, end })
}
