//! Byte offset to (line, column) translation.
//!
//! Errors carry only a byte offset. A single error needs a single scan
//! ([`offset_to_line_col`]); listings that position many tokens build a
//! [`LineOffsetTable`] once and binary-search it.

/// Pre-computed line start offsets.
///
/// ```
/// use devvm_diagnostic::span_utils::LineOffsetTable;
///
/// let source = "int a;\nint b;";
/// let table = LineOffsetTable::build(source);
/// assert_eq!(table.offset_to_line_col(source, 0), (1, 1));
/// assert_eq!(table.offset_to_line_col(source, 11), (2, 5));
/// ```
#[derive(Clone, Debug, Default)]
pub struct LineOffsetTable {
    /// `offsets[n]` is the byte offset where line `n + 1` starts.
    offsets: Vec<u32>,
}

impl LineOffsetTable {
    pub fn build(source: &str) -> Self {
        let mut offsets = vec![0u32];
        offsets.extend(
            source
                .bytes()
                .enumerate()
                .filter(|&(_, b)| b == b'\n')
                .map(|(i, _)| u32::try_from(i + 1).unwrap_or(u32::MAX)),
        );
        LineOffsetTable { offsets }
    }

    /// 1-based line containing `offset`.
    pub fn line_from_offset(&self, offset: u32) -> u32 {
        let line_idx = match self.offsets.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert) => insert.saturating_sub(1),
        };
        u32::try_from(line_idx).unwrap_or(u32::MAX - 1) + 1
    }

    /// 1-based (line, column); columns count characters, not bytes.
    pub fn offset_to_line_col(&self, source: &str, offset: u32) -> (u32, u32) {
        let line = self.line_from_offset(offset);
        let line_start = self.offsets.get((line - 1) as usize).copied().unwrap_or(0);
        (line, column(source, line_start as usize, offset as usize))
    }

    pub fn line_count(&self) -> usize {
        self.offsets.len()
    }
}

/// 1-based (line, column) of `offset` in `source`, by a single scan.
///
/// Offsets past the end are clamped to the end of the source.
pub fn offset_to_line_col(source: &str, offset: u32) -> (u32, u32) {
    let offset = (offset as usize).min(source.len());
    let mut line = 1u32;
    let mut line_start = 0usize;
    for (i, byte) in source.bytes().enumerate().take(offset) {
        if byte == b'\n' {
            line += 1;
            line_start = i + 1;
        }
    }
    (line, column(source, line_start, offset))
}

fn column(source: &str, line_start: usize, offset: usize) -> u32 {
    let end = offset.min(source.len());
    let chars = source.get(line_start..end).map_or(0, |s| s.chars().count());
    u32::try_from(chars).unwrap_or(u32::MAX - 1) + 1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_scan_positions() {
        let source = "abc\ndefgh\nij";
        assert_eq!(offset_to_line_col(source, 0), (1, 1));
        assert_eq!(offset_to_line_col(source, 2), (1, 3));
        assert_eq!(offset_to_line_col(source, 4), (2, 1));
        assert_eq!(offset_to_line_col(source, 7), (2, 4));
        assert_eq!(offset_to_line_col(source, 10), (3, 1));
    }

    #[test]
    fn offset_at_newline_belongs_to_its_line() {
        let source = "ab\ncd";
        assert_eq!(offset_to_line_col(source, 2), (1, 3));
        assert_eq!(offset_to_line_col(source, 3), (2, 1));
    }

    #[test]
    fn offset_past_end_is_clamped() {
        assert_eq!(offset_to_line_col("ab\nc", 100), (2, 2));
    }

    #[test]
    fn table_matches_single_scan() {
        let source = "int a;\n\nfunction void f() {\n  a = 1;\n}\n";
        let table = LineOffsetTable::build(source);
        assert_eq!(table.line_count(), 6);
        for offset in 0..=u32::try_from(source.len()).unwrap_or(0) {
            assert_eq!(
                table.offset_to_line_col(source, offset),
                offset_to_line_col(source, offset),
                "offset {offset}"
            );
        }
    }
}
