/// The fixed capacity stack used for both the data stack and the control stack.
pub mod bounded_stack;

/// The dictionary module provides the word dictionary used by the interpreter, an arena of entries
/// searched newest first.
pub mod dictionary;

/// The memory cells owned by variable words.
pub mod variable_store;
