use crate::{
    add_native_immediate_word, add_native_word,
    lang::code::Cell,
    runtime::{
        data_structures::{
            bounded_stack::StackStatus,
            dictionary::{WordBody, WordFlags, WordInfo},
        },
        error::{self, script_error, script_error_str},
        interpreter::Interpreter,
    },
};
use tracing::debug;

/// Start compiling a new word, the name is the next token.
///
/// Signature: ` -- `
fn word_start_word(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.set_compiling(true);
    Ok(())
}

/// Finish the word being compiled.
///
/// Signature: ` -- `
fn word_end_word_im(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.set_compiling(false);
    Ok(())
}

/// Create a variable.  The new word pushes the address of a cell that starts out as zero.
///
/// Signature: ` -- `
fn word_variable(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let name = interpreter.next_token();

    if name.is_empty() {
        return script_error_str(interpreter, "VARIABLE needs a name");
    }

    let Some(lit) = interpreter.find_word("LIT") else {
        return script_error_str(interpreter, "LIT is not defined, variables can't be created");
    };

    let address = interpreter.dictionary_mut().variables_mut().allocate();
    let code = vec![Cell::WordRef(lit), Cell::Literal(address as i32)];
    let location = interpreter.current_location();

    let mut info = WordInfo::new(&name, WordFlags::VARIABLE, WordBody::Code(code), location);

    info.variable = Some(address);
    info.description = "A variable.".to_string();
    info.signature = " -- address".to_string();

    match interpreter.define_word(info) {
        Ok(_) => {
            debug!(word = %name, address, "variable allocated");
            Ok(())
        }

        Err(error) => {
            interpreter.dictionary_mut().variables_mut().release(address);
            Err(error)
        }
    }
}

/// Read a variable.
///
/// Signature: `address -- value`
fn word_read_variable(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (address, status) = interpreter.pop();

    if status != StackStatus::Ok {
        return Ok(());
    }

    let value = usize::try_from(address)
        .ok()
        .and_then(|address| interpreter.dictionary().variables().read(address));

    match value {
        Some(value) => {
            interpreter.push(value);
            Ok(())
        }

        None => script_error(interpreter, format!("Invalid address {}", address)),
    }
}

/// Write a variable.
///
/// Signature: `value address -- `
fn word_write_variable(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(values) = interpreter.pop_values(2) else {
        return Ok(());
    };

    let (value, address) = (values[0], values[1]);

    let written = usize::try_from(address)
        .is_ok_and(|address| interpreter.dictionary_mut().variables_mut().write(address, value));

    if !written {
        return script_error(interpreter, format!("Invalid address {}", address));
    }

    Ok(())
}

/// Delete the newest word with the given name.  `FORGET LATEST` deletes the newest word whatever
/// its name.
///
/// Signature: ` -- `
fn word_forget(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let name = interpreter.next_token();

    if name.is_empty() {
        return script_error_str(interpreter, "FORGET needs a word name");
    }

    match interpreter.dictionary_mut().delete(&name) {
        Some(info) => debug!(word = %info.name, "word deleted"),
        None => interpreter.write_output(&format!("{} not found\n", name)),
    }

    Ok(())
}

/// Delete the newest n words.
///
/// Signature: `n -- `
fn word_forget_latest(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (count, status) = interpreter.pop();

    if status == StackStatus::Ok && count > 0 {
        let deleted = interpreter.dictionary_mut().delete_latest(count as usize);

        debug!(count, deleted, "newest words deleted");
    }

    Ok(())
}

pub fn register_word_creation_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(
        interpreter,
        ":",
        word_start_word,
        "Start compiling a new word.",
        " -- "
    );

    add_native_immediate_word!(
        interpreter,
        ";",
        word_end_word_im,
        "Finish compiling the current word.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "VARIABLE",
        word_variable,
        "Create a new variable, the name follows this word.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "@",
        word_read_variable,
        "Read a variable's value.",
        "address -- value"
    );

    add_native_word!(
        interpreter,
        "!",
        word_write_variable,
        "Write a value to a variable.",
        "value address -- "
    );

    add_native_word!(
        interpreter,
        "FORGET",
        word_forget,
        "Delete the newest word with the following name, LATEST deletes the newest word.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "FORGET-LATEST",
        word_forget_latest,
        "Delete the newest n words.",
        "n -- "
    );
}
