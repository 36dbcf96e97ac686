/// Mostly words that are used to change or read the state of the interpreter.
mod forth_words;

/// Words that manipulate the data stack.
mod stack_words;

/// Simple constants.
mod constant_words;

/// Words that manipulate and generate byte-code.
mod bytecode_words;

/// Words that work with words.
mod word_words;

/// Words that create new words.
mod word_creation_words;

/// Words that print text and skip comments.
mod string_words;

/// Arithmetic on the top two values.
mod simple_arithmetic_words;

/// Words that work with comparisons, logic and bit manipulation.
mod math_logic_and_bit_words;

use crate::runtime::{
    built_ins::base_words::{
        bytecode_words::register_bytecode_words, constant_words::register_constant_words,
        forth_words::register_forth_words,
        math_logic_and_bit_words::register_math_logic_and_bit_words,
        simple_arithmetic_words::register_simple_arithmetic_words,
        stack_words::register_stack_words, string_words::register_string_words,
        word_creation_words::register_word_creation_words, word_words::register_word_words,
    },
    interpreter::Interpreter,
};

/// Called to register all of the core words of the language.
pub fn register_base_words(interpreter: &mut dyn Interpreter) {
    register_forth_words(interpreter);
    register_stack_words(interpreter);
    register_constant_words(interpreter);
    register_simple_arithmetic_words(interpreter);
    register_bytecode_words(interpreter);
    register_word_words(interpreter);
    register_word_creation_words(interpreter);
    register_string_words(interpreter);
    register_math_logic_and_bit_words(interpreter);
}
