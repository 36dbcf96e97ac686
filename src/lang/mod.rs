/// Module for managing the input line buffer and the location of the code being processed.
pub mod source_buffer;

/// Module for pulling whitespace delimited tokens out of the input buffer and for converting them
/// to and from numbers in the current base.
pub mod tokenizing;

/// Module for defining the cells that make up the body of a compiled word.
pub mod code;

/// Module for building up the body of a new word while the interpreter is in compile mode.  Some
/// words are executed as others are being compiled, those immediate words reach back into the
/// constructor to emit and patch cells.
pub mod compilation;
