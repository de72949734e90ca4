use serde::{Deserialize, Serialize};
use std::fmt;

/// Source location span.
///
/// All line/column values are 1-based. `end_col` is inclusive, so a
/// single-character token has `start_col == end_col`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    #[serde(rename = "line")]
    pub start_line: u32,
    #[serde(rename = "column")]
    pub start_col: u32,
    pub end_line: u32,
    #[serde(rename = "end_column")]
    pub end_col: u32,
}

impl Span {
    pub fn new(start_line: u32, start_col: u32, end_line: u32, end_col: u32) -> Self {
        Self {
            start_line,
            start_col,
            end_line,
            end_col,
        }
    }

    /// Zero-width span at a single position.
    pub fn point(line: u32, col: u32) -> Self {
        Self::new(line, col, line, col)
    }

    /// Smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        let (start_line, start_col) =
            (self.start_line, self.start_col).min((other.start_line, other.start_col));
        let (end_line, end_col) =
            (self.end_line, self.end_col).max((other.end_line, other.end_col));
        Span::new(start_line, start_col, end_line, end_col)
    }

    /// Returns `true` if `other` lies entirely inside `self`.
    pub fn contains(self, other: Span) -> bool {
        (self.start_line, self.start_col) <= (other.start_line, other.start_col)
            && (other.end_line, other.end_col) <= (self.end_line, self.end_col)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start_line, self.start_col)
    }
}

/// A named source text with cached line offsets.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    /// Extract a source line by 1-based line number, without its line ending.
    pub fn line(&self, line_number: u32) -> Option<&str> {
        let idx = line_number.checked_sub(1)? as usize;
        let start = *self.line_starts.get(idx)?;
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| s.saturating_sub(1))
            .unwrap_or(self.source.len());
        Some(self.source[start..end].trim_end_matches('\r'))
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Span covering the whole text.
    pub fn full_span(&self) -> Span {
        let last_line = self.line_count() as u32;
        let last_len = self.line(last_line).map_or(0, |l| l.chars().count()) as u32;
        Span::new(1, 1, last_line, last_len.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_merge_across_lines() {
        let a = Span::new(1, 5, 1, 10);
        let b = Span::new(2, 3, 2, 8);
        assert_eq!(a.merge(b), Span::new(1, 5, 2, 8));
        assert_eq!(b.merge(a), Span::new(1, 5, 2, 8));
    }

    #[test]
    fn test_span_merge_same_line() {
        let merged = Span::new(1, 5, 1, 10).merge(Span::new(1, 3, 1, 8));
        assert_eq!(merged, Span::new(1, 3, 1, 10));
    }

    #[test]
    fn test_span_contains() {
        let outer = Span::new(1, 1, 4, 2);
        assert!(outer.contains(Span::new(2, 7, 3, 1)));
        assert!(outer.contains(outer));
        assert!(!outer.contains(Span::new(4, 1, 4, 3)));
    }

    #[test]
    fn test_span_display() {
        assert_eq!(format!("{}", Span::new(3, 7, 3, 15)), "3:7");
    }

    #[test]
    fn test_span_json_field_names() {
        let json = serde_json::to_string(&Span::new(2, 4, 2, 9)).unwrap();
        assert_eq!(
            json,
            r#"{"line":2,"column":4,"end_line":2,"end_column":9}"#
        );
    }

    #[test]
    fn test_source_file_lines() {
        let src = SourceFile::new("t.by", "def main() {\r\n  return;\r\n}");
        assert_eq!(src.line(1), Some("def main() {"));
        assert_eq!(src.line(2), Some("  return;"));
        assert_eq!(src.line(3), Some("}"));
        assert_eq!(src.line(0), None);
        assert_eq!(src.line(4), None);
        assert_eq!(src.line_count(), 3);
    }

    #[test]
    fn test_source_file_empty() {
        let src = SourceFile::new("t.by", "");
        assert_eq!(src.line_count(), 1);
        assert_eq!(src.line(1), Some(""));
        assert_eq!(src.full_span(), Span::new(1, 1, 1, 1));
    }

    #[test]
    fn test_full_span_covers_last_line() {
        let src = SourceFile::new("t.by", "a\nbcd");
        assert_eq!(src.full_span(), Span::new(1, 1, 2, 3));
    }
}
