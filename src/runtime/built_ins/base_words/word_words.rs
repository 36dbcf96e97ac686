use crate::{
    add_native_word,
    lang::code::pretty_print_code,
    runtime::{
        error::{self, script_error, script_error_str},
        interpreter::Interpreter,
    },
};

/// List every word in the dictionary, newest first.
///
/// Signature: ` -- `
fn word_print_dictionary(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let listing = interpreter.dictionary().to_string();

    interpreter.write_output(&listing);
    Ok(())
}

/// Show how a word is defined, native words only show their description.
///
/// Signature: ` -- `
fn word_see(interpreter: &mut dyn Interpreter) -> error::Result<()> {
    let name = interpreter.next_token();

    if name.is_empty() {
        return script_error_str(interpreter, "SEE needs a word name");
    }

    let Some(word) = interpreter
        .find_word(&name)
        .and_then(|id| interpreter.dictionary().get(id))
    else {
        return script_error(interpreter, format!("Word {} not found", name));
    };

    let text = if word.is_native() {
        format!(
            "{} is a native word.\n  {}\n  Signature: {}\n",
            word.name, word.description, word.signature
        )
    } else {
        format!(
            "{}  [{}]  defined at {}\n{}",
            word.name,
            word.flags,
            word.location,
            pretty_print_code(interpreter.dictionary(), word.code())
        )
    };

    interpreter.write_output(&text);
    Ok(())
}

pub fn register_word_words(interpreter: &mut dyn Interpreter) {
    add_native_word!(
        interpreter,
        "WORDS",
        word_print_dictionary,
        "List the words in the dictionary.",
        " -- "
    );

    add_native_word!(
        interpreter,
        "SEE",
        word_see,
        "Show the compiled code of the following word.",
        " -- "
    );
}
