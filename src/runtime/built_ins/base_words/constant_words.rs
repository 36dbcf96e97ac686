use crate::{
    add_native_word,
    runtime::{
        error,
        interpreter::{FORTH_FALSE, FORTH_TRUE, Interpreter},
    },
};

pub fn register_constant_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(
        interpreter,
        "TRUE",
        |interpreter: &mut dyn Interpreter| -> error::Result<()> {
            interpreter.push(FORTH_TRUE);
            Ok(())
        },
        "Push the value true.",
        " -- true"
    );

    add_native_word!(
        interpreter,
        "FALSE",
        |interpreter: &mut dyn Interpreter| -> error::Result<()> {
            interpreter.push(FORTH_FALSE);
            Ok(())
        },
        "Push the value false.",
        " -- false"
    );
}
