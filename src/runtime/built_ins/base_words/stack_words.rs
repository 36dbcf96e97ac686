use crate::{
    add_native_word,
    lang::tokenizing::format_number,
    runtime::{error, interpreter::Interpreter},
};

/// Duplicate the top value on the data stack.
///
/// Signature: `value -- value value`
fn word_dup(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    if let Some(values) = interpreter.pop_values(1) {
        interpreter.push(values[0]);
        interpreter.push(values[0]);
    }

    Ok(())
}

/// Drop the top value on the data stack.
///
/// Signature: `value -- `
fn word_drop(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let _ = interpreter.pop();

    Ok(())
}

/// Swap the top 2 values on the data stack.
///
/// Signature: `a b -- b a`
fn word_swap(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    if let Some(values) = interpreter.pop_values(2) {
        interpreter.push(values[1]);
        interpreter.push(values[0]);
    }

    Ok(())
}

/// Make a copy of the second value and place it on top.
///
/// Signature: `a b -- a b a`
fn word_over(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    if let Some(values) = interpreter.pop_values(2) {
        interpreter.push(values[0]);
        interpreter.push(values[1]);
        interpreter.push(values[0]);
    }

    Ok(())
}

/// Print the data stack from the bottom up without changing it.
///
/// Signature: ` -- `
fn word_print_stack(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let text = if interpreter.stack().is_empty() {
        "Data stack empty\n".to_string()
    } else {
        let base = interpreter.base();
        let values: Vec<String> = interpreter
            .stack()
            .iter()
            .map(|value| format_number(*value, base))
            .collect();

        format!("{}\n", values.join(" "))
    };

    interpreter.write_output(&text);
    Ok(())
}

pub fn register_stack_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(
        interpreter,
        "DUP",
        word_dup,
        "Duplicate the top value on the data stack.",
        "value -- value value"
    );

    add_native_word!(
        interpreter,
        "DROP",
        word_drop,
        "Discard the top value on the data stack.",
        "value -- "
    );

    add_native_word!(
        interpreter,
        "SWAP",
        word_swap,
        "Swap the top 2 values on the data stack.",
        "a b -- b a"
    );

    add_native_word!(
        interpreter,
        "OVER",
        word_over,
        "Copy the second value on top of the stack.",
        "a b -- a b a"
    );

    add_native_word!(
        interpreter,
        ".S",
        word_print_stack,
        "Print the data stack, bottom first.",
        " -- "
    );
}
