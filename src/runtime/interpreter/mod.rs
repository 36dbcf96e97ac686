use crate::{
    lang::{compilation::CodeConstructor, source_buffer::{InputBuffer, SourceLocation}},
    runtime::{
        built_ins::{board_words::Board, gui_words::{Gui, GuiState}},
        config::InterpreterConfig,
        data_structures::{
            bounded_stack::StackStatus,
            dictionary::{Dictionary, WordFlags, WordId, WordInfo},
        },
        error,
    },
};
use std::{
    fmt::{self, Display, Formatter},
    rc::Rc,
    time::Instant,
};

pub mod forth_interpreter;

/// The value the comparison and test words push for true.
pub const FORTH_TRUE: i32 = -1;

/// The value the comparison and test words push for false.
pub const FORTH_FALSE: i32 = 0;

/// A call stack item is a record of the executing word's name and the location within the original
/// source code from which it was defined.  These items are read-only and the fields are accessed by
/// member functions.
#[derive(Clone)]
pub struct CallItem {
    location: SourceLocation,
    word: String,
}

impl CallItem {
    /// Create a new call stack item.
    pub fn new(word: String, location: SourceLocation) -> CallItem {
        CallItem { location, word }
    }

    /// Where was the executing word defined?
    pub fn location(&self) -> &SourceLocation {
        &self.location
    }

    // The name of the word being executed.
    pub fn word(&self) -> &String {
        &self.word
    }
}

/// Make sure that this word can be nicely displayed to the user in event of an error.
impl Display for CallItem {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.location, self.word)
    }
}

/// Type to represent a call stack.  This is built from the control stack when an error is reported
/// so the user can see which words were part way through running.
pub type CallStack = Vec<CallItem>;

/// A saved place in a compiled word, where execution resumes once the word currently running
/// returns.  These are the items of the control stack.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct ReturnFrame {
    /// The index of the next cell to execute in the word's body.
    pub index: usize,

    /// The compiled word the index refers to.
    pub word: WordId,
}

impl ReturnFrame {
    pub fn new(index: usize, word: WordId) -> ReturnFrame {
        ReturnFrame { index, word }
    }
}

/// The result of one step of the outer interpreter.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum InterpretStatus {
    /// The token was handled, carry on with the line.
    Continue,

    /// A definition is still open at the end of the line, more input is expected.
    ContinueCompiling,

    /// The definition being compiled was abandoned.
    CompileError,

    /// Something went wrong running a word or a token made no sense, skip the rest of the line.
    Halt,
}

impl InterpretStatus {
    /// Should the rest of the current line be skipped?
    pub fn is_failure(&self) -> bool {
        matches!(self, InterpretStatus::CompileError | InterpretStatus::Halt)
    }
}

/// Trait for managing the interpreter's data stack.  Intended to be called by immediate/normal
/// words.
///
/// Stack exhaustion isn't an error in this language.  Words check the returned status, or the
/// option returned by `pop_values`, and quietly leave the stack alone if they can't get what they
/// need.
pub trait InterpreterStack {
    /// Use to examine the full data stack when required.  One example is the stack dump command
    /// `.S`.  The values are ordered from the bottom of the stack to the top.
    fn stack(&self) -> &[i32];

    /// Push a value onto the data stack.  A full stack is left untouched.
    fn push(&mut self, value: i32) -> StackStatus;

    /// Pop a value from the data stack.  An empty stack gives back zero along with the empty
    /// status.
    fn pop(&mut self) -> (i32, StackStatus);

    /// Pop the top `count` values, oldest first.  If the stack doesn't hold that many values
    /// nothing is popped.
    fn pop_values(&mut self, count: usize) -> Option<Vec<i32>>;

    /// Push the canonical true or false value.
    fn push_flag(&mut self, flag: bool) -> StackStatus {
        self.push(if flag { FORTH_TRUE } else { FORTH_FALSE })
    }
}

/// Trait for the control stack of return frames used by the threaded code inner interpreter.
///
/// Primitives like `LIT` and `0BRANCH` pop the frame that points just past themselves, read their
/// inline data from it and push back the place where execution should carry on.
pub trait ReturnStack {
    /// Push a return frame.  A full control stack is left untouched.
    fn push_frame(&mut self, frame: ReturnFrame) -> StackStatus;

    /// Pop a frame belonging to the current execution.  Frames pushed by an outer execution, one
    /// that started the current nested one, are never handed out.
    fn pop_frame(&mut self) -> Option<ReturnFrame>;
}

/// Trait for managing the incoming source text and compiling new definitions.
///
/// These functions are mostly of use to immediate words, which run while a definition is being
/// compiled and may read raw text from the input or patch the code compiled so far.
pub trait CodeManagement {
    /// Get the next whitespace separated token from the input.  An empty string means the line is
    /// used up.
    fn next_token(&mut self) -> String;

    /// Get the next token from the input, keeping spaces that are inside double quotes.
    fn next_token_quoted(&mut self) -> String;

    /// Direct access to the input line for words that read raw text, like comments and strings.
    fn input_mut(&mut self) -> &mut InputBuffer;

    /// Is a definition currently being compiled?
    fn is_compiling(&self) -> bool;

    /// Turn compile mode on or off.  If an immediate word turns it off the open definition is
    /// installed with whatever has been compiled so far once that word returns.
    fn set_compiling(&mut self, compiling: bool);

    /// Access the definition being compiled.
    fn constructor(&self) -> &CodeConstructor;

    /// Access the definition being compiled as mutable.
    fn constructor_mut(&mut self) -> &mut CodeConstructor;

    /// The current numeral base.
    fn base(&self) -> u32;

    /// Change the numeral base, the value is expected to already be in range.
    fn set_base(&mut self, base: u32);

    /// Run a single line of console input.  The line is upper cased outside of double quotes and
    /// interpreted until it is used up or a step fails.  The status of the last step is returned.
    fn process_line(&mut self, line: &str) -> InterpretStatus;

    /// Run a line of text without disturbing the line currently being interpreted.  Used by words
    /// that run other source in the middle of a line, such as `ML` calling a button's word.
    fn interpret_nested(&mut self, line: &str) -> InterpretStatus;

    /// Run every line of some source text.  A failing line is reported and skipped, the remaining
    /// lines are still run.  The path is used for error reporting.
    fn process_source(&mut self, path: &str, source: &str) -> error::Result<()>;

    /// Read and run a file from the interpreter's storage root.
    fn process_source_file(&mut self, name: &str) -> error::Result<()>;
}

/// Definition of a word handler function.  This is the function that is called when a native word
/// is to be executed.  Can be a lambda, a callable object or a Rust function.
pub type WordHandler = dyn Fn(&mut dyn Interpreter) -> error::Result<()>;

/// Register a native word with explicit flags.  Used by the macros below.
#[macro_export]
macro_rules! add_native_word_with_flags {
    (
        $interpreter:expr ,
        $name:expr ,
        $function:expr ,
        $description:expr ,
        $signature:expr ,
        $flags:expr
    ) => {{
        use std::rc::Rc;

        // Register the word while recording where in the source code the word was registered
        // from.
        $interpreter.add_word(
            file!().to_string(),
            line!() as usize,
            column!() as usize,
            $name.to_string(),
            Rc::new($function),
            $description.to_string(),
            $signature.to_string(),
            $flags,
        );
    }};
}

/// Simplify registering a native regular word with the interpreter.
///
/// Required parameters are, the interpreter instance to register with.  The name of the word to
/// register.  The word function handler to execute for the word.  A simple description of the word.
/// As well as the word's stack signature.
#[macro_export]
macro_rules! add_native_word {
    (
        $interpreter:expr ,
        $name:expr ,
        $function:expr ,
        $description:expr ,
        $signature:expr
    ) => {{
        $crate::add_native_word_with_flags!(
            $interpreter,
            $name,
            $function,
            $description,
            $signature,
            $crate::runtime::data_structures::dictionary::WordFlags::INBUILT
        );
    }};
}

/// Simplify registering a native immediate word with the interpreter.  That is, this word is
/// executed when it is found while compiling instead of being compiled.
#[macro_export]
macro_rules! add_native_immediate_word {
    (
        $interpreter:expr ,
        $name:expr ,
        $function:expr ,
        $description:expr ,
        $signature:expr
    ) => {{
        use $crate::runtime::data_structures::dictionary::WordFlags;

        $crate::add_native_word_with_flags!(
            $interpreter,
            $name,
            $function,
            $description,
            $signature,
            WordFlags::INBUILT | WordFlags::IMMEDIATE
        );
    }};
}

/// Register an immediate word that is an error to use outside of a definition, the control
/// structure words for example.
#[macro_export]
macro_rules! add_native_compile_word {
    (
        $interpreter:expr ,
        $name:expr ,
        $function:expr ,
        $description:expr ,
        $signature:expr
    ) => {{
        use $crate::runtime::data_structures::dictionary::WordFlags;

        $crate::add_native_word_with_flags!(
            $interpreter,
            $name,
            $function,
            $description,
            $signature,
            WordFlags::INBUILT | WordFlags::IMMEDIATE | WordFlags::COMPILE_ONLY
        );
    }};
}

/// Trait for managing and executing words known to the interpreter.
pub trait WordManagement {
    /// The current position in the source being interpreted.
    fn current_location(&self) -> SourceLocation;

    /// Add a new native word to the interpreter's dictionary.  A word that can't be added is
    /// logged and skipped.
    #[allow(clippy::too_many_arguments)]
    fn add_word(
        &mut self,
        file: String,
        line: usize,
        column: usize,
        name: String,
        handler: Rc<WordHandler>,
        description: String,
        signature: String,
        flags: WordFlags,
    );

    /// Add a fully built word to the dictionary.
    fn define_word(&mut self, info: WordInfo) -> error::Result<WordId>;

    /// Find the newest word with the given name.
    fn find_word(&self, name: &str) -> Option<WordId>;

    /// Execute a word.  Compiled words are run by the threaded code inner interpreter, until the
    /// word's body is exhausted or something switches on compile mode part way through.
    fn execute_word(&mut self, id: WordId) -> error::Result<()>;

    /// The words part way through execution, oldest first.
    fn call_stack(&self) -> CallStack;

    /// The word dictionary.
    fn dictionary(&self) -> &Dictionary;

    /// The word dictionary as mutable.
    fn dictionary_mut(&mut self) -> &mut Dictionary;
}

/// Trait for the hardware the interpreter is driving.
pub trait Peripherals {
    /// The board's pins, converters and SPI bus.
    fn board(&mut self) -> &mut dyn Board;

    /// The touch screen.
    fn gui(&mut self) -> &mut dyn Gui;

    /// State shared by the GUI words, the main loop flag, the pending text target and the ticker.
    fn gui_state(&mut self) -> &mut GuiState;

    /// Run the ticker's word if it has come due.  Returns true if the word was run.
    fn service_ticker(&mut self, now: Instant) -> bool;
}

/// Core interpreter trait.
///
/// This trait brings together the traits that define the functionality of the interpreter.  Managing
/// the data and control stacks, managing input and compilation, managing and executing words and
/// talking to the board.
pub trait Interpreter:
    InterpreterStack + ReturnStack + CodeManagement + WordManagement + Peripherals
{
    /// The limits the interpreter was created with.
    fn config(&self) -> &InterpreterConfig;

    /// Write text to the console.
    fn write_output(&mut self, text: &str);

    /// Hand over everything written to the console since the last call.
    fn take_output(&mut self) -> String;

    /// Ask the console loop to stop once the current line is done.
    fn request_exit(&mut self);

    /// Has `EXIT` been run?
    fn exit_requested(&self) -> bool;

    /// Clear both stacks and abandon any open definition.
    fn reset(&mut self);
}
