//! Source location tracking.
//!
//! A [`Location`] names a contiguous region of one source file: the file
//! name plus line, column and byte offset for both ends. Lines and columns
//! are 1-based, byte offsets 0-based. The start is inclusive, the end
//! exclusive.
//!
//! Locations are built incrementally by the scanner: [`Location::start`]
//! pins the opening cursor, [`Location::end`] the closing one. Tokens clone
//! the scanner's rolling location; parsed nodes merge the locations of
//! their first and last token.

use std::rc::Rc;

/// A region of source text, inclusive of start, exclusive of end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
    /// Name of the file this region belongs to.
    pub file: Rc<str>,
    pub start_line: usize,
    pub start_col: usize,
    /// Byte offset of the first character (inclusive).
    pub start_pos: usize,
    pub end_line: usize,
    pub end_col: usize,
    /// Byte offset past the last character (exclusive).
    pub end_pos: usize,
}

impl Location {
    /// Creates a location pinned to the beginning of `file`.
    pub fn new(file: Rc<str>) -> Self {
        Location {
            file,
            start_line: 1,
            start_col: 1,
            start_pos: 0,
            end_line: 1,
            end_col: 1,
            end_pos: 0,
        }
    }

    /// Sets the opening cursor.
    pub fn start(&mut self, line: usize, col: usize, pos: usize) {
        self.start_line = line;
        self.start_col = col;
        self.start_pos = pos;
    }

    /// Sets the closing cursor.
    pub fn end(&mut self, line: usize, col: usize, pos: usize) {
        self.end_line = line;
        self.end_col = col;
        self.end_pos = pos;
    }

    /// Copies every cursor field of `other`, keeping `self.file`.
    pub fn set_all(&mut self, other: &Location) {
        self.start_line = other.start_line;
        self.start_col = other.start_col;
        self.start_pos = other.start_pos;
        self.end_line = other.end_line;
        self.end_col = other.end_col;
        self.end_pos = other.end_pos;
    }

    /// Location covering from the start of `self` to the end of `other`.
    pub fn merge(&self, other: &Location) -> Location {
        let mut res = self.clone();
        res.end_line = other.end_line;
        res.end_col = other.end_col;
        res.end_pos = other.end_pos;
        res
    }

    /// Length of the region in bytes.
    pub fn len(&self) -> usize {
        self.end_pos.saturating_sub(self.start_pos)
    }

    /// Returns `true` if this location covers no bytes.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_keeps_start_and_adopts_end() {
        let file: Rc<str> = Rc::from("a.c");
        let mut a = Location::new(file.clone());
        a.start(1, 1, 0);
        a.end(1, 4, 3);

        let mut b = Location::new(file);
        b.start(2, 1, 10);
        b.end(2, 6, 15);

        let m = a.merge(&b);
        assert_eq!(m.start_pos, 0);
        assert_eq!(m.end_pos, 15);
        assert_eq!(m.end_line, 2);
    }

    #[test]
    fn set_all_copies_cursor_fields() {
        let mut a = Location::new(Rc::from("a.c"));
        let mut b = Location::new(Rc::from("b.c"));
        b.start(3, 2, 20);
        b.end(3, 9, 27);

        a.set_all(&b);
        assert_eq!(a.start_line, 3);
        assert_eq!(a.end_pos, 27);
        assert_eq!(&*a.file, "a.c");
    }
}
