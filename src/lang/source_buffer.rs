
use std::fmt::{ self,
                Display,
                Formatter };



/// The location in the source code the interpreter is currently working on.  For console input
/// this is the tag "\<console\>" and the line count of the session, for loaded files it is the
/// path of the file and the line being processed.
///
/// This is a read-only structure.  Use the field accessor methods to get the values.
#[derive(Clone, PartialEq, PartialOrd, Eq)]
pub struct SourceLocation
{
    /// Either the path to the file or a description of the source code.
    path: String,

    /// The 1 based line number in the source code.
    line: usize,

    /// The 1 based column number in the source code.
    column: usize
}


/// Used for error reporting to show where in the source code an error originated.
impl Display for SourceLocation
{
    fn fmt(&self, formatter: &mut Formatter<'_>) -> Result<(), fmt::Error>
    {
        write!(formatter, "{} ({}, {})", self.path, self.line, self.column)
    }
}


impl Default for SourceLocation
{
    fn default() -> Self
    {
        Self::new_from_path("<console>")
    }
}


impl SourceLocation
{
    /// Create a new SourceLocation at the start of the given path.
    pub fn new_from_path(path: &str) -> Self
    {
        SourceLocation { path: path.to_owned(), line: 1, column: 1 }
    }

    /// Create a new SourceLocation with all of the needed information.
    pub fn new_from_info(path: &str, line: usize, column: usize) -> Self
    {
        SourceLocation { path: path.to_owned(), line, column }
    }

    /// The path to the source code or a meaningful description of the source code.
    pub fn path(&self) -> &String
    {
        &self.path
    }

    /// The 1 based line number in the source code.
    pub fn line(&self) -> usize
    {
        self.line
    }

    /// The 1 based column number in the source code.
    pub fn column(&self) -> usize
    {
        self.column
    }
}



/// A saved copy of the input buffer.  Nested interpretation (loading a file, the GUI main loop, a
/// ticker callback) takes one of these before reusing the buffer and restores it afterwards.
#[derive(Clone)]
pub struct InputSnapshot
{
    chars: Vec<char>,
    position: usize,
    location: SourceLocation
}



/// The line buffer shared by the tokenizer and the words that read raw text from the input, such
/// as comments and string literals.  The buffer owns the text of one line at a time and a cursor
/// into it.  The cursor only ever moves forward until the next line is loaded.
pub struct InputBuffer
{
    /// The characters of the current line.
    chars: Vec<char>,

    /// Index of the next character to be consumed.
    position: usize,

    /// Where this line came from, used in error reporting.
    location: SourceLocation
}


impl Default for InputBuffer
{
    fn default() -> Self
    {
        Self::new()
    }
}


impl InputBuffer
{
    /// Create a new empty buffer.
    pub fn new() -> InputBuffer
    {
        InputBuffer
            {
                chars: Vec::new(),
                position: 0,
                location: SourceLocation::default()
            }
    }

    /// Replace the buffer's contents with a new line of text and reset the cursor.
    pub fn load(&mut self, text: &str)
    {
        self.chars = text.chars().collect();
        self.position = 0;
        self.location.column = 1;
    }

    /// Replace the buffer's contents and record where the text came from.
    pub fn load_from(&mut self, text: &str, location: SourceLocation)
    {
        self.load(text);
        self.location = location;
    }

    /// Empty the buffer.  Any remaining text on the line is discarded.
    pub fn clear(&mut self)
    {
        self.chars.clear();
        self.position = 0;
    }

    /// The current cursor position.
    pub fn position(&self) -> usize
    {
        self.position
    }

    /// Has every character of the line been consumed?
    pub fn is_exhausted(&self) -> bool
    {
        self.position >= self.chars.len()
    }

    /// Take a peek at the next character without consuming it.
    pub fn peek_next(&self) -> Option<char>
    {
        self.chars.get(self.position).copied()
    }

    /// Get and consume the next character.
    pub fn next_char(&mut self) -> Option<char>
    {
        let next = self.peek_next();

        if next.is_some()
        {
            self.position += 1;
        }

        next
    }

    /// The text that has not been consumed yet.
    pub fn remaining(&self) -> String
    {
        self.chars[self.position.min(self.chars.len())..].iter().collect()
    }

    /// The location of the cursor, the column tracks the cursor position.
    pub fn location(&self) -> SourceLocation
    {
        SourceLocation::new_from_info(&self.location.path,
                                      self.location.line,
                                      self.position + 1)
    }

    /// Save the buffer's contents, cursor and location.
    pub fn snapshot(&self) -> InputSnapshot
    {
        InputSnapshot
            {
                chars: self.chars.clone(),
                position: self.position,
                location: self.location.clone()
            }
    }

    /// Put back a previously saved state of the buffer.
    pub fn restore(&mut self, snapshot: InputSnapshot)
    {
        self.chars = snapshot.chars;
        self.position = snapshot.position;
        self.location = snapshot.location;
    }
}



#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn snapshot_restores_text_and_cursor()
    {
        let mut buffer = InputBuffer::new();

        buffer.load("1 2 +");
        let _ = buffer.next_char();
        let _ = buffer.next_char();

        let saved = buffer.snapshot();

        buffer.load_from("FOO", SourceLocation::new_from_path("lib.f"));
        assert_eq!(buffer.remaining(), "FOO");

        buffer.restore(saved);
        assert_eq!(buffer.position(), 2);
        assert_eq!(buffer.remaining(), "2 +");
        assert_eq!(buffer.location().path(), "<console>");
    }

    #[test]
    fn exhausted_after_last_char()
    {
        let mut buffer = InputBuffer::new();

        buffer.load("A");
        assert!(!buffer.is_exhausted());
        assert_eq!(buffer.next_char(), Some('A'));
        assert!(buffer.is_exhausted());
        assert_eq!(buffer.next_char(), None);
    }
}
