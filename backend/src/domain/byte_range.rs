//! `Range: bytes=<start>-<end>` handling for video streaming.

use crate::domain::Error;

/// Inclusive byte span inside a media object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    /// Parse a single-span range header against an object of `size` bytes.
    ///
    /// A missing end means "to the last byte". Spans that start or end at or
    /// beyond `size` are rejected rather than clamped, as are suffix and
    /// multi-span forms.
    ///
    /// # Examples
    /// ```
    /// use cinema::domain::ByteRange;
    ///
    /// let range = ByteRange::parse("bytes=100-", 1000).expect("valid range");
    /// assert_eq!((range.start, range.end), (100, 999));
    /// ```
    pub fn parse(header: &str, size: u64) -> Result<Self, Error> {
        let invalid = || Error::not_found("invalid range");
        let spec = header.trim().strip_prefix("bytes=").ok_or_else(invalid)?;
        let (start_raw, end_raw) = spec.split_once('-').ok_or_else(invalid)?;
        let start: u64 = start_raw.trim().parse().map_err(|_| invalid())?;
        let end = match end_raw.trim() {
            "" => size.checked_sub(1).ok_or_else(invalid)?,
            raw => raw.parse::<u64>().map_err(|_| invalid())?,
        };
        if start >= size || end >= size || start > end {
            return Err(invalid());
        }
        Ok(Self { start, end })
    }

    /// Number of bytes covered.
    pub const fn len(&self) -> u64 {
        self.end - self.start + 1
    }

    /// Always false; a parsed range covers at least one byte.
    pub const fn is_empty(&self) -> bool {
        false
    }

    /// `Content-Range` header value for an object of `size` bytes.
    pub fn content_range(&self, size: u64) -> String {
        format!("bytes {}-{}/{size}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ErrorCode;
    use rstest::rstest;

    #[rstest]
    #[case("bytes=0-99", 1000, 0, 99)]
    #[case("bytes=500-", 1000, 500, 999)]
    #[case("bytes=999-999", 1000, 999, 999)]
    fn parses_valid_ranges(
        #[case] header: &str,
        #[case] size: u64,
        #[case] start: u64,
        #[case] end: u64,
    ) {
        let range = ByteRange::parse(header, size).expect("valid range");
        assert_eq!(range, ByteRange { start, end });
        assert_eq!(range.len(), end - start + 1);
    }

    #[rstest]
    #[case("bytes=1000-", 1000)]
    #[case("bytes=0-1000", 1000)]
    #[case("bytes=10-5", 1000)]
    #[case("bytes=-500", 1000)]
    #[case("bytes=a-b", 1000)]
    #[case("items=0-1", 1000)]
    #[case("bytes=0-", 0)]
    fn rejects_out_of_bounds_or_malformed(#[case] header: &str, #[case] size: u64) {
        let err = ByteRange::parse(header, size).expect_err("rejected");
        assert_eq!(err.code(), ErrorCode::NotFound);
    }

    #[rstest]
    fn formats_content_range() {
        let range = ByteRange { start: 0, end: 1023 };
        assert_eq!(range.content_range(4096), "bytes 0-1023/4096");
    }
}
