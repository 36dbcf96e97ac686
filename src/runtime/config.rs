use std::path::PathBuf;

/// The resource limits and locations an interpreter instance is built with.  The defaults match
/// the memory budget of the controller boards the language was written for.
#[derive(Clone, Debug)]
pub struct InterpreterConfig {
    /// How many values the data stack holds.
    pub data_stack_size: usize,

    /// How many (resume index, word) frames the control stack holds.
    pub control_stack_size: usize,

    /// The most words the dictionary may hold at once, primitives included.
    pub max_words: usize,

    /// The longest allowed word name.
    pub name_max: usize,

    /// The most cells a single compiled definition may hold.
    pub max_code_cells: usize,

    /// Directory standing in for the board's SD card.  `FLOAD` and the init script resolve file
    /// names against it.
    pub sd_root: PathBuf,
}

impl Default for InterpreterConfig {
    fn default() -> Self {
        InterpreterConfig {
            data_stack_size: 50,
            control_stack_size: 25,
            max_words: 512,
            name_max: 15,
            max_code_cells: 100,
            sd_root: PathBuf::from("."),
        }
    }
}
