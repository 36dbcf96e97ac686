use crate::{
    add_native_word,
    runtime::{error, interpreter::Interpreter},
};

/// Compare or combine the top two values, `a` is the deeper of the two.  With fewer than two
/// values on the stack nothing happens.
fn binary_op(interpreter: &mut dyn Interpreter, op: fn(i32, i32) -> i32) -> error::Result<()> {
    if let Some(values) = interpreter.pop_values(2) {
        interpreter.push(op(values[0], values[1]));
    }

    Ok(())
}

/// Like binary_op, but the result is pushed as a true or false flag.
fn comparison_op(interpreter: &mut dyn Interpreter, op: fn(i32, i32) -> bool) -> error::Result<()> {
    if let Some(values) = interpreter.pop_values(2) {
        interpreter.push_flag(op(values[0], values[1]));
    }

    Ok(())
}

/// Is the given bit of the value set?  Bit positions outside of the cell are never set.
fn bit_is_set(value: i32, bit: i32) -> bool {
    u32::try_from(bit)
        .ok()
        .and_then(|bit| 1i32.checked_shl(bit))
        .is_some_and(|mask| value & mask != 0)
}

fn word_equal(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    comparison_op(interpreter, |a, b| a == b)
}

fn word_greater(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    comparison_op(interpreter, |a, b| a > b)
}

fn word_less(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    comparison_op(interpreter, |a, b| a < b)
}

fn word_less_equal(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    comparison_op(interpreter, |a, b| a <= b)
}

fn word_greater_equal(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    comparison_op(interpreter, |a, b| a >= b)
}

/// Logical not, zero becomes true and everything else becomes false.
///
/// Signature: `value -- flag`
fn word_not(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    if let Some(values) = interpreter.pop_values(1) {
        interpreter.push_flag(values[0] == 0);
    }

    Ok(())
}

fn word_and(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    binary_op(interpreter, |a, b| a & b)
}

fn word_or(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    binary_op(interpreter, |a, b| a | b)
}

fn word_xor(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    binary_op(interpreter, |a, b| a ^ b)
}

/// Test a bit of a value, the bit position is on top.
///
/// Signature: `value bit -- flag`
fn word_bit_set(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    comparison_op(interpreter, bit_is_set)
}

/// Signature: `value bit -- flag`
fn word_bit_clear(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    comparison_op(interpreter, |value, bit| !bit_is_set(value, bit))
}

pub fn register_math_logic_and_bit_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(
        interpreter,
        "=",
        word_equal,
        "Are the top two values equal?",
        "a b -- flag"
    );

    add_native_word!(
        interpreter,
        ">",
        word_greater,
        "Is a greater than b?",
        "a b -- flag"
    );

    add_native_word!(
        interpreter,
        "<",
        word_less,
        "Is a less than b?",
        "a b -- flag"
    );

    add_native_word!(
        interpreter,
        "<=",
        word_less_equal,
        "Is a less than or equal to b?",
        "a b -- flag"
    );

    add_native_word!(
        interpreter,
        ">=",
        word_greater_equal,
        "Is a greater than or equal to b?",
        "a b -- flag"
    );

    add_native_word!(
        interpreter,
        "NOT",
        word_not,
        "Logically invert the top value.",
        "value -- flag"
    );

    add_native_word!(
        interpreter,
        "AND",
        word_and,
        "Bitwise and of the top two values.",
        "a b -- a&b"
    );

    add_native_word!(
        interpreter,
        "OR",
        word_or,
        "Bitwise or of the top two values.",
        "a b -- a|b"
    );

    add_native_word!(
        interpreter,
        "XOR",
        word_xor,
        "Bitwise exclusive or of the top two values.",
        "a b -- a^b"
    );

    add_native_word!(
        interpreter,
        "?BITSET",
        word_bit_set,
        "Is the given bit of the value set?",
        "value bit -- flag"
    );

    add_native_word!(
        interpreter,
        "?BITCLEAR",
        word_bit_clear,
        "Is the given bit of the value clear?",
        "value bit -- flag"
    );
}

#[cfg(test)]
mod tests {
    use super::bit_is_set;
    use test_case::test_case;

    #[test_case(0b100, 2 => true ; "set bit")]
    #[test_case(0b100, 1 => false ; "clear bit")]
    #[test_case(-1, 31 => true ; "sign bit")]
    #[test_case(-1, 32 => false ; "past the cell")]
    #[test_case(-1, -1 => false ; "negative position")]
    fn bit_tests(value: i32, bit: i32) -> bool {
        bit_is_set(value, bit)
    }
}
