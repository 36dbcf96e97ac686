use crate::{
    add_native_compile_word, add_native_word,
    lang::code::Cell,
    runtime::{
        data_structures::bounded_stack::StackStatus,
        error::{self, script_error, script_error_str},
        interpreter::{Interpreter, ReturnFrame},
    },
};
use tracing::warn;

/// Read a cell from the body of the word a return frame points into.
fn frame_cell(interpreter: &dyn Interpreter, frame: &ReturnFrame, offset: usize) -> Option<Cell> {
    interpreter
        .dictionary()
        .get(frame.word)
        .and_then(|word| word.code().get(frame.index + offset).copied())
}

/// Pop the frame pointing at the inline data following a threading word, and read that data as a
/// value.
fn inline_value(interpreter: &mut dyn Interpreter, word: &str) -> error::Result<(ReturnFrame, i32)> {
    let Some(frame) = interpreter.pop_frame() else {
        return script_error(interpreter, format!("{} can only run inside a compiled word", word));
    };

    match frame_cell(interpreter, &frame, 0) {
        Some(Cell::Literal(value)) => Ok((frame, value)),
        _ => script_error(interpreter, format!("{} is missing its inline value", word)),
    }
}

/// Carry on running the caller at the given index relative to the frame.  The target has to be a
/// cell of the caller's body, its end marker included.
fn resume_at(interpreter: &mut dyn Interpreter, frame: &ReturnFrame, offset: i32) -> error::Result<()> {
    let length = interpreter
        .dictionary()
        .get(frame.word)
        .map_or(0, |word| word.code().len());

    let target = frame
        .index
        .checked_add_signed(offset as isize)
        .filter(|&index| index < length);

    let Some(index) = target else {
        return script_error(interpreter, format!("Branch offset {} is out of range", offset));
    };

    if interpreter.push_frame(ReturnFrame::new(index, frame.word)) == StackStatus::Full {
        return script_error_str(interpreter, "Control stack overflow");
    }

    Ok(())
}

/// Push the value stored inline in the calling word, then skip past it.
///
/// Signature: ` -- value`
fn word_lit(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (frame, value) = inline_value(interpreter, "LIT")?;

    interpreter.push(value);

    // No frame is kept when the value is the last cell, the caller is done.
    if !matches!(frame_cell(interpreter, &frame, 1), None | Some(Cell::EndOfBody)) {
        resume_at(interpreter, &frame, 1)?;
    }

    Ok(())
}

/// Branch by the inline offset if the top of the stack is false, otherwise skip the offset.  An
/// empty stack counts as false.
///
/// Signature: `flag -- `
fn word_zero_branch(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (flag, _) = interpreter.pop();
    let (frame, offset) = inline_value(interpreter, "0BRANCH")?;

    resume_at(interpreter, &frame, if flag == 0 { offset } else { 1 })
}

/// Always branch by the inline offset.
///
/// Signature: ` -- `
fn word_branch(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (frame, offset) = inline_value(interpreter, "BRANCH")?;

    resume_at(interpreter, &frame, offset)
}

/// The control words keep their pending branch positions on the data stack.  If it runs dry or
/// fills up the definition is closed with what has been compiled so far.
fn unbalanced(interpreter: &mut dyn Interpreter) {
    let name = interpreter.constructor().name().unwrap_or_default().to_string();

    warn!(word = %name, "unbalanced control structure");
    interpreter.write_output("Unbalanced control structure\n");
    interpreter.set_compiling(false);
}

/// Compile a reference to a threading word.
fn emit_word(interpreter: &mut dyn Interpreter, name: &str) -> error::Result<()> {
    let Some(id) = interpreter.find_word(name) else {
        return script_error(interpreter, format!("{} is not defined", name));
    };

    let _ = interpreter.constructor_mut().emit(Cell::WordRef(id))?;
    Ok(())
}

/// Pop a pending branch position saved by one of the control words.
fn pop_position(interpreter: &mut dyn Interpreter) -> Option<usize> {
    match interpreter.pop() {
        (position, StackStatus::Ok) => usize::try_from(position).ok(),
        _ => None,
    }
}

/// Fill in the placeholder at the given position with the offset to the current position.
fn patch_to_here(interpreter: &mut dyn Interpreter, placeholder: usize) -> error::Result<()> {
    let offset = interpreter.constructor().position() as i32 - placeholder as i32;

    interpreter
        .constructor_mut()
        .patch(placeholder, Cell::Literal(offset))
}

/// Compile a conditional branch with a placeholder offset for `THEN` or `ELSE` to fill in.
fn word_if_im(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    emit_word(interpreter, "0BRANCH")?;

    let position = interpreter.constructor().position();

    if interpreter.push(position as i32) == StackStatus::Full {
        unbalanced(interpreter);
        return Ok(());
    }

    let _ = interpreter.constructor_mut().emit(Cell::Literal(0))?;
    Ok(())
}

/// Point the pending `IF` or `ELSE` branch here.
fn word_then_im(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(placeholder) = pop_position(interpreter) else {
        unbalanced(interpreter);
        return Ok(());
    };

    patch_to_here(interpreter, placeholder)
}

/// Compile a jump over the else part and point the pending `IF` branch just past it.
fn word_else_im(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(if_placeholder) = pop_position(interpreter) else {
        unbalanced(interpreter);
        return Ok(());
    };

    emit_word(interpreter, "BRANCH")?;

    let position = interpreter.constructor_mut().emit(Cell::Literal(0))?;

    if interpreter.push(position as i32) == StackStatus::Full {
        unbalanced(interpreter);
        return Ok(());
    }

    patch_to_here(interpreter, if_placeholder)
}

/// Mark the start of a loop.
fn word_begin_im(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let position = interpreter.constructor().position();

    if interpreter.push(position as i32) == StackStatus::Full {
        unbalanced(interpreter);
    }

    Ok(())
}

/// Compile a conditional branch back to the matching `BEGIN`.
fn word_until_im(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(start) = pop_position(interpreter) else {
        unbalanced(interpreter);
        return Ok(());
    };

    emit_word(interpreter, "0BRANCH")?;

    let offset = start as i32 - interpreter.constructor().position() as i32;
    let _ = interpreter.constructor_mut().emit(Cell::Literal(offset))?;

    Ok(())
}

pub fn register_bytecode_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(
        interpreter,
        "LIT",
        word_lit,
        "Push the value compiled after this word.",
        " -- value"
    );

    add_native_word!(
        interpreter,
        "0BRANCH",
        word_zero_branch,
        "Branch by the compiled offset if the top value is false.",
        "flag -- "
    );

    add_native_word!(
        interpreter,
        "BRANCH",
        word_branch,
        "Branch by the compiled offset.",
        " -- "
    );

    add_native_compile_word!(
        interpreter,
        "IF",
        word_if_im,
        "Run the following code only if the top value is true.",
        "flag -- "
    );

    add_native_compile_word!(
        interpreter,
        "THEN",
        word_then_im,
        "End an IF or IF ELSE block.",
        " -- "
    );

    add_native_compile_word!(
        interpreter,
        "ELSE",
        word_else_im,
        "Start the code run when the IF test was false.",
        " -- "
    );

    add_native_compile_word!(
        interpreter,
        "BEGIN",
        word_begin_im,
        "Start a BEGIN UNTIL loop.",
        " -- "
    );

    add_native_compile_word!(
        interpreter,
        "UNTIL",
        word_until_im,
        "Loop back to BEGIN while the top value is false.",
        "flag -- "
    );
}
