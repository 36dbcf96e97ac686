use crate::{
    add_native_compile_word, add_native_immediate_word, add_native_word,
    lang::{
        code::{Cell, pack_string, unpack_string},
        tokenizing::format_number,
    },
    runtime::{
        built_ins::gui_words::TextTarget,
        data_structures::bounded_stack::StackStatus,
        error::{self, script_error_str},
        interpreter::{Interpreter, ReturnFrame},
    },
};

/// Print the top value in the current base followed by a space.
///
/// Signature: `value -- `
fn word_print(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let (value, status) = interpreter.pop();

    if status == StackStatus::Ok {
        let text = format!("{} ", format_number(value, interpreter.base()));
        interpreter.write_output(&text);
    }

    Ok(())
}

/// Signature: ` -- `
fn word_cr(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.write_output("\n");
    Ok(())
}

/// The run time half of `."`.  Print the text packed into the calling word just after this one,
/// or hand it to the GUI control picked by `SET_ST_TXT` or `SET_BMP`, then carry on past the text.
///
/// Signature: ` -- `
fn word_str(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(frame) = interpreter.pop_frame() else {
        return script_error_str(interpreter, "STR can only run inside a compiled word");
    };

    let Some((text, next)) = interpreter
        .dictionary()
        .get(frame.word)
        .map(|word| unpack_string(word.code(), frame.index))
    else {
        return script_error_str(interpreter, "The word holding the text has been forgotten");
    };

    match interpreter.gui_state().take_text_target() {
        Some(TextTarget::StaticText(id)) => {
            let _ = interpreter.gui().set_static_text(id, &text);
        }

        Some(TextTarget::Bitmap(id)) => {
            let _ = interpreter.gui().set_bitmap(id, &text);
        }

        Some(TextTarget::Discard) => {}

        None => interpreter.write_output(&text),
    }

    if interpreter.push_frame(ReturnFrame::new(next, frame.word)) == StackStatus::Full {
        return script_error_str(interpreter, "Control stack overflow");
    }

    Ok(())
}

/// Compile the text up to the closing quote so that it is printed when the word runs.  A missing
/// closing quote takes the rest of the line.
///
/// Signature: ` -- `
fn word_dot_quote_im(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let Some(str_word) = interpreter.find_word("STR") else {
        return script_error_str(interpreter, "STR is not defined");
    };

    let input = interpreter.input_mut();
    let mut text = String::new();

    // Skip the blank that separates ." from the text.
    let _ = input.next_char();

    while let Some(next) = input.next_char() {
        if next == '"' {
            break;
        }

        text.push(next);
    }

    let _ = interpreter.constructor_mut().emit(Cell::WordRef(str_word))?;

    for cell in pack_string(&text) {
        let _ = interpreter.constructor_mut().emit(cell)?;
    }

    Ok(())
}

/// Skip the rest of the line.
///
/// Signature: ` -- `
fn word_line_comment_im(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    interpreter.input_mut().clear();
    Ok(())
}

/// Skip everything up to and including the next `)` on the line.
///
/// Signature: ` -- `
fn word_paren_comment_im(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let input = interpreter.input_mut();

    while let Some(next) = input.next_char() {
        if next == ')' {
            break;
        }
    }

    Ok(())
}

pub fn register_string_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(
        interpreter,
        ".",
        word_print,
        "Print the top value in the current base.",
        "value -- "
    );

    add_native_word!(
        interpreter,
        "CR",
        word_cr,
        "Print a new line.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "STR",
        word_str,
        "Print the text compiled after this word.",
        " -- "
    );

    add_native_compile_word!(
        interpreter,
        ".\"",
        word_dot_quote_im,
        "Compile the text up to the closing quote for printing.",
        " -- "
    );

    add_native_immediate_word!(
        interpreter,
        "\\",
        word_line_comment_im,
        "Comment to the end of the line.",
        " -- "
    );

    add_native_immediate_word!(
        interpreter,
        "(",
        word_paren_comment_im,
        "Comment up to the closing parenthesis.",
        " -- "
    );
}
