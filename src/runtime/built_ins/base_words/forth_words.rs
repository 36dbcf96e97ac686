use crate::{
    add_native_word,
    lang::tokenizing::{MAX_BASE, MIN_BASE},
    runtime::{
        data_structures::bounded_stack::StackStatus,
        error::{self, script_error_str},
        interpreter::Interpreter,
    },
};
use sysinfo::System;

/// Change the numeral base used for parsing and printing.  Bases outside of 2 to 34 are ignored.
///
/// Signature: `base -- `
fn word_base(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (base, status) = interpreter.pop();

    if status == StackStatus::Ok
        && let Ok(base) = u32::try_from(base)
        && (MIN_BASE..=MAX_BASE).contains(&base)
    {
        interpreter.set_base(base);
    }

    Ok(())
}

/// Print the current base, always in decimal.
///
/// Signature: ` -- `
fn word_query_base(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let text = format!(" {} ", interpreter.base());

    interpreter.write_output(&text);
    Ok(())
}

/// Ask the console to stop once the current line has been handled.
///
/// Signature: ` -- `
fn word_exit(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.request_exit();
    Ok(())
}

/// Push the memory used by the interpreter's process, in kilobytes.
///
/// Signature: ` -- kilobytes`
fn word_memory(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let mut system = System::new();

    system.refresh_all();

    let pid = sysinfo::get_current_pid();

    match pid {
        Ok(pid) => match system.process(pid) {
            Some(process) => {
                let kilobytes = (process.memory() / 1024).min(i32::MAX as u64) as i32;

                interpreter.push(kilobytes);
            }

            None => {
                script_error_str(interpreter, "Could not read process memory information.")?;
            }
        },

        Err(_) => {
            script_error_str(interpreter, "Could not get current process id.")?;
        }
    }

    Ok(())
}

pub fn register_forth_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(
        interpreter,
        "BASE",
        word_base,
        "Set the numeral base, from 2 to 34.",
        "base -- "
    );

    add_native_word!(
        interpreter,
        "?BASE",
        word_query_base,
        "Print the current numeral base.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "EXIT",
        word_exit,
        "Leave the interpreter.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "MEM",
        word_memory,
        "Push the memory used by the interpreter in kilobytes.",
        " -- kilobytes"
    );
}
