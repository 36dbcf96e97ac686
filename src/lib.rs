/// Module for managing the input line, tokenizing it, and the cells that make up compiled words.
pub mod lang;

/// Module for the runtime and the data structures used by the interpreter.  As well as the
/// interpreter itself.
#[macro_use]
pub mod runtime;
