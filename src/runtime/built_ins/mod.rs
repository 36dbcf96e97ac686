use crate::runtime::{
    built_ins::{
        base_words::register_base_words, board_words::register_board_words,
        gui_words::register_gui_words, io_words::register_io_words,
    },
    interpreter::Interpreter,
};

/// The core words of the language.
pub mod base_words;

/// Words that perform I/O operations, loading source from storage and waiting.
pub mod io_words;

/// Words that drive the board's pins, converters and SPI bus.
pub mod board_words;

/// Words that build and run the touch screen interface.
pub mod gui_words;

/// Register every built-in word with the interpreter.
pub fn register_builtin_words(interpreter: &mut dyn Interpreter) {
    register_base_words(interpreter);
    register_io_words(interpreter);
    register_board_words(interpreter);
    register_gui_words(interpreter);
}
