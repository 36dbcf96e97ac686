use crate::{
    add_native_word,
    lang::tokenizing::strip_quotes,
    runtime::{data_structures::bounded_stack::StackStatus, error, interpreter::Interpreter},
};
use std::time::Duration;

/// Load and run a file from storage.  The name follows the word and may be quoted.  Lines that
/// fail are reported as they are run, a file that can't be found is reported here.
///
/// Signature: ` -- `
fn word_fload(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let token = interpreter.next_token_quoted();

    if token.is_empty() {
        interpreter.write_output("Insufficient parameters\n");
        return Ok(());
    }

    let name = strip_quotes(&token);

    if let Err(error) = interpreter.process_source_file(&name) {
        interpreter.write_output(&format!("{}\n", error.error()));
    }

    Ok(())
}

/// Wait for the given number of seconds.
///
/// Signature: `seconds -- `
fn word_delay(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (seconds, status) = interpreter.pop();

    if status == StackStatus::Ok && seconds > 0 {
        interpreter
            .board()
            .delay(Duration::from_secs(seconds as u64));
    }

    Ok(())
}

pub fn register_io_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(
        interpreter,
        "FLOAD",
        word_fload,
        "Load and run a source file from storage.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "DELAY",
        word_delay,
        "Wait for a number of seconds.",
        "seconds -- "
    );
}
