use crate::{
    add_native_word,
    runtime::{error, interpreter::Interpreter},
};

/// Apply an operation to the top two values and push the result.  With fewer than two values on
/// the stack nothing happens.  An operation that returns None leaves both values popped and pushes
/// nothing.
fn binary_op(
    interpreter: &mut dyn Interpreter,
    op: fn(i32, i32) -> Option<i32>,
) -> error::Result<()> {
    if let Some(values) = interpreter.pop_values(2)
        && let Some(result) = op(values[0], values[1])
    {
        interpreter.push(result);
    }

    Ok(())
}

/// Add the top two values.
///
/// Signature: `a b -- a+b`
fn word_add(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    binary_op(interpreter, |a, b| Some(a.wrapping_add(b)))
}

/// Subtract the top value from the one below it.
///
/// Signature: `a b -- a-b`
fn word_subtract(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    binary_op(interpreter, |a, b| Some(a.wrapping_sub(b)))
}

/// Signature: `a b -- a*b`
fn word_multiply(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    binary_op(interpreter, |a, b| Some(a.wrapping_mul(b)))
}

/// Divide the second value by the top value.  Dividing by zero consumes both values and pushes
/// nothing.
///
/// Signature: `a b -- a/b`
fn word_divide(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    binary_op(interpreter, |a, b| (b != 0).then(|| a.wrapping_div(b)))
}

pub fn register_simple_arithmetic_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(
        interpreter,
        "+",
        word_add,
        "Add two numbers.",
        "a b -- a+b"
    );

    add_native_word!(
        interpreter,
        "-",
        word_subtract,
        "Subtract two numbers.",
        "a b -- a-b"
    );

    add_native_word!(
        interpreter,
        "*",
        word_multiply,
        "Multiply two numbers.",
        "a b -- a*b"
    );

    add_native_word!(
        interpreter,
        "/",
        word_divide,
        "Divide two numbers, does nothing useful for a zero divisor.",
        "a b -- a/b"
    );
}
