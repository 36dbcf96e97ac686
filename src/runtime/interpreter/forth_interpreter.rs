use std::{ fs::read_to_string,
           rc::Rc,
           time::Instant };
use tracing::{ debug, error, info, warn };
use crate::{ lang::{ code::{ Cell,
                             END_OF_BODY_VALUE },
                     compilation::CodeConstructor,
                     source_buffer::{ InputBuffer,
                                      SourceLocation },
                     tokenizing::{ parse_number,
                                   remove_spaces,
                                   to_upper_outside_quotes,
                                   QuotedSpans,
                                   Tokenizer,
                                   DEFAULT_BASE } },
             runtime::{ built_ins::{ board_words::{ Board,
                                                    HostBoard },
                                     gui_words::{ Gui,
                                                  GuiState,
                                                  HostGui },
                                     register_builtin_words },
                        config::InterpreterConfig,
                        data_structures::{ bounded_stack::{ BoundedStack,
                                                            StackStatus },
                                           dictionary::{ Dictionary,
                                                         WordBody,
                                                         WordFlags,
                                                         WordId,
                                                         WordInfo } },
                        error::{ self,
                                 script_error,
                                 ScriptError },
                        interpreter::{ CallItem,
                                       CallStack,
                                       CodeManagement,
                                       InterpretStatus,
                                       Interpreter,
                                       InterpreterStack,
                                       Peripherals,
                                       ReturnFrame,
                                       ReturnStack,
                                       WordHandler,
                                       WordManagement } } };



/// The path used to tag console input in error reports.
const CONSOLE_PATH: &str = "<console>";

/// The most script names read from the init file.
const MAX_INIT_SCRIPTS: usize = 4;



/// What the inner interpreter finds when it looks at the word it is about to run.
enum Step
{
    /// A native word, along with whether it may only be used while compiling.
    Native(Rc<WordHandler>, bool),

    /// A cell of a compiled word, along with whether the cell after it ends the body.
    Cell(Cell, bool)
}



/// The interpreter for the board's Forth dialect.
///
/// One instance owns all of the engine state: both stacks, the dictionary, the line being
/// interpreted and the definition being compiled.  Nothing is shared between instances.
pub struct ForthInterpreter
{
    /// The limits the interpreter was created with.
    config: InterpreterConfig,

    /// The data stack used by the interpreter.
    data_stack: BoundedStack<i32>,

    /// The control stack of return frames used while running compiled words.
    control_stack: BoundedStack<ReturnFrame>,

    /// Control stack depth at the start of the current execution.  Frames below this belong to an
    /// outer execution and are never popped by the current one.
    frame_floor: usize,

    /// The word the inner interpreter is currently running, if any.
    current_word: Option<WordId>,


    /// The dictionary of words known by the interpreter.
    dictionary: Dictionary,


    /// The line being interpreted.
    input: InputBuffer,

    /// Splits the line into tokens.
    tokenizer: Tokenizer,

    /// Count of console lines seen so far, used to tag console input.
    console_line: usize,

    /// The numeral base used to parse and print numbers.
    base: u32,


    /// Is a definition being compiled?
    compiling: bool,

    /// Data stack depth when the current definition was opened.  Control words keep their
    /// back-patch positions above it.
    definition_depth: usize,

    /// The definition being compiled.  It lives here because a definition can span many lines.
    constructor: CodeConstructor,


    /// Text written to the console that the caller hasn't collected yet.
    output: String,

    /// Set by `EXIT`.
    exit_requested: bool,


    /// The board's pins and buses.
    board: Box<dyn Board>,

    /// The touch screen.
    gui: Box<dyn Gui>,

    /// State shared by the GUI words.
    gui_state: GuiState
}


impl Interpreter for ForthInterpreter
{
    fn config(&self) -> &InterpreterConfig
    {
        &self.config
    }

    fn write_output(&mut self, text: &str)
    {
        self.output.push_str(text);
    }

    fn take_output(&mut self) -> String
    {
        std::mem::take(&mut self.output)
    }

    fn request_exit(&mut self)
    {
        self.exit_requested = true;
    }

    fn exit_requested(&self) -> bool
    {
        self.exit_requested
    }

    fn reset(&mut self)
    {
        self.data_stack.clear();
        self.control_stack.clear();
        self.frame_floor = 0;
        self.current_word = None;
        self.compiling = false;
        self.definition_depth = 0;
        self.constructor.reset();
    }
}


impl InterpreterStack for ForthInterpreter
{
    fn stack(&self) -> &[i32]
    {
        self.data_stack.as_slice()
    }

    fn push(&mut self, value: i32) -> StackStatus
    {
        self.data_stack.push(value)
    }

    fn pop(&mut self) -> (i32, StackStatus)
    {
        self.data_stack.pop()
    }

    fn pop_values(&mut self, count: usize) -> Option<Vec<i32>>
    {
        self.data_stack.pop_many(count)
    }
}


impl ReturnStack for ForthInterpreter
{
    fn push_frame(&mut self, frame: ReturnFrame) -> StackStatus
    {
        self.control_stack.push(frame)
    }

    fn pop_frame(&mut self) -> Option<ReturnFrame>
    {
        if self.control_stack.depth() <= self.frame_floor
        {
            return None;
        }

        match self.control_stack.pop()
        {
            ( frame, StackStatus::Ok ) => Some(frame),
            _ => None
        }
    }
}


impl ForthInterpreter
{
    /// Look at the word about to be run without holding on to a borrow of the dictionary.
    fn step(&self, id: WordId, index: usize) -> Option<Step>
    {
        let word = self.dictionary.get(id)?;

        let step = match &word.body
            {
                WordBody::Native(handler) => Step::Native(handler.clone(), word.is_compile_only()),

                WordBody::Code(code) =>
                    {
                        let cell = code.get(index).copied().unwrap_or(Cell::EndOfBody);
                        let next_ends = code.get(index + 1).is_none_or(|next| next.is_end());

                        Step::Cell(cell, next_ends)
                    }
            };

        Some(step)
    }

    /// Where to go once the word just finished has returned.  None means the whole execution is
    /// done.
    fn resume(&mut self) -> Option<( WordId, usize )>
    {
        self.pop_frame().map(|frame| ( frame.word, frame.index ))
    }

    /// The threaded code inner interpreter.
    fn thread(&mut self, root: WordId) -> error::Result<()>
    {
        let was_compiling = self.compiling;
        let mut current = root;
        let mut index = 0;

        loop
        {
            self.current_word = Some(current);

            let Some(step) = self.step(current, index)
            else
            {
                return script_error(self, "Attempted to run a word that has been forgotten."
                                          .to_string());
            };

            match step
            {
                Step::Native(handler, compile_only) =>
                    {
                        if compile_only && !self.compiling
                        {
                            let name = self.word_name(current);
                            return script_error(self,
                                                format!("{} can be used only in compile mode",
                                                        name));
                        }

                        (*handler)(self)?;

                        // A word like : switched on compile mode, the compiler takes over from
                        // here.
                        if self.compiling && !was_compiling
                        {
                            return Ok(());
                        }

                        match self.resume()
                        {
                            Some(( word, resume_index )) =>
                                {
                                    current = word;
                                    index = resume_index;
                                }

                            None => return Ok(())
                        }
                    }

                Step::Cell(Cell::EndOfBody, _) =>
                    {
                        match self.resume()
                        {
                            Some(( word, resume_index )) =>
                                {
                                    current = word;
                                    index = resume_index;
                                }

                            None => return Ok(())
                        }
                    }

                Step::Cell(Cell::WordRef(target), next_ends) =>
                    {
                        if    !next_ends
                           && self.push_frame(ReturnFrame::new(index + 1, current)) == StackStatus::Full
                        {
                            return script_error(self, "Control stack overflow".to_string());
                        }

                        current = target;
                        index = 0;
                    }

                Step::Cell(Cell::Literal(value), _) =>
                    {
                        let name = self.word_name(current);
                        return script_error(self,
                                            format!("Found the value {} where a word was expected \
                                                     in {}",
                                                    value,
                                                    name));
                    }
            }
        }
    }

    /// The name of a word for use in messages.
    fn word_name(&self, id: WordId) -> String
    {
        self.dictionary
            .get(id)
            .map(|word| word.name.clone())
            .unwrap_or_else(|| format!("<forgotten #{}>", id.index()))
    }

    /// Report an error to the console and the log.
    fn report_error(&mut self, error: &ScriptError)
    {
        error!("{}", error);
        self.output.push_str(&format!("{}\n", error.error()));
    }

    /// Throw away the definition being compiled and go back to interpret mode.
    fn abandon_definition(&mut self, error: &ScriptError) -> InterpretStatus
    {
        self.report_error(error);
        self.constructor.reset();
        self.compiling = false;
        self.data_stack.truncate(self.definition_depth);

        InterpretStatus::CompileError
    }

    /// Install the definition that was just compiled.
    fn finish_definition(&mut self) -> InterpretStatus
    {
        let ( name, code ) = self.constructor.take();
        let location = self.input.location();

        self.compiling = false;

        if self.dictionary.find(&name).is_some()
        {
            warn!(word = %name, "word redefined");
            self.output.push_str(&format!("WARNING: {} redefined\n", name));
        }

        match self.dictionary.define(&name, WordFlags::USER, WordBody::Code(code), location)
        {
            Ok(_) =>
                {
                    debug!(word = %name, "word defined");
                    InterpretStatus::Continue
                }

            Err(define_error) =>
                {
                    let message = format!("{}: {}", define_error, name);
                    let error = ScriptError::new(Some(self.input.location()), message, None);

                    self.abandon_definition(&error)
                }
        }
    }

    /// Compile a numeric literal as a reference to LIT followed by the value.
    fn compile_literal(&mut self, value: i32) -> error::Result<()>
    {
        let Some(lit) = self.dictionary.find("LIT")
        else
        {
            return script_error(self, "LIT is not defined, numbers can't be compiled".to_string());
        };

        if value == END_OF_BODY_VALUE
        {
            warn!(value, "literal matches the old end of body marker");
            self.output.push_str(&format!("WARNING: Using {} in compiled code would hang older \
                                           boards\n",
                                          value));
        }

        let _ = self.constructor.emit(Cell::WordRef(lit))?;
        let _ = self.constructor.emit(Cell::Literal(value))?;

        Ok(())
    }

    /// Carry on compiling the open definition with the tokens left on the line.
    fn compile(&mut self) -> InterpretStatus
    {
        if self.constructor.name().is_none()
        {
            let name = self.next_token();

            if name.is_empty()
            {
                self.compiling = false;
                return InterpretStatus::Continue;
            }

            self.constructor.set_name(name);
        }

        loop
        {
            let token = self.next_token();

            if token.is_empty()
            {
                return InterpretStatus::ContinueCompiling;
            }

            let result = match self.dictionary.find(&token)
                {
                    Some(id) =>
                        {
                            let immediate = self.dictionary
                                                .get(id)
                                                .is_some_and(|word| word.is_immediate());

                            if immediate
                            {
                                if let Err(error) = self.execute_word(id)
                                {
                                    return self.abandon_definition(&error);
                                }

                                if !self.compiling
                                {
                                    break;
                                }

                                Ok(())
                            }
                            else
                            {
                                self.constructor.emit(Cell::WordRef(id)).map(|_| ())
                            }
                        }

                    None =>
                        {
                            let ( value, unparsed ) = parse_number(&token, self.base);

                            if unparsed == 0
                            {
                                self.compile_literal(value)
                            }
                            else
                            {
                                script_error(self, format!("Word {} not found", token))
                            }
                        }
                };

            if let Err(error) = result
            {
                return self.abandon_definition(&error);
            }
        }

        self.finish_definition()
    }

    /// One step of the outer interpreter.  In interpret mode a single token is run or pushed, in
    /// compile mode the rest of the line is compiled.
    pub fn interpret(&mut self) -> InterpretStatus
    {
        if !self.compiling
        {
            let token = self.next_token();

            if token.is_empty()
            {
                return InterpretStatus::Continue;
            }

            match self.dictionary.find(&token)
            {
                Some(id) =>
                    {
                        if let Err(error) = self.execute_word(id)
                        {
                            self.report_error(&error);
                            return InterpretStatus::Halt;
                        }

                        if self.exit_requested
                        {
                            return InterpretStatus::Halt;
                        }
                    }

                None =>
                    {
                        let ( value, unparsed ) = parse_number(&token, self.base);

                        if unparsed != 0
                        {
                            let error = ScriptError::new(Some(self.input.location()),
                                                         format!("{} not recognised", token),
                                                         None);

                            self.report_error(&error);
                            return InterpretStatus::Halt;
                        }

                        if self.data_stack.push(value) == StackStatus::Full
                        {
                            self.output.push_str("Data stack full\n");
                        }

                        return InterpretStatus::Continue;
                    }
            }
        }

        if self.compiling
        {
            return self.compile();
        }

        InterpretStatus::Continue
    }

    /// Interpret the line already loaded into the input buffer until it is used up or a step
    /// fails.
    fn interpret_loaded(&mut self) -> InterpretStatus
    {
        let mut status = if self.compiling
            {
                InterpretStatus::ContinueCompiling
            }
            else
            {
                InterpretStatus::Continue
            };

        while !self.input.is_exhausted()
        {
            status = self.interpret();

            if status.is_failure()
            {
                break;
            }
        }

        self.input.clear();
        status
    }

    /// Load and interpret one line from the given location.
    fn process_line_at(&mut self, line: &str, location: SourceLocation) -> InterpretStatus
    {
        let line = to_upper_outside_quotes(line);

        self.input.load_from(&line, location);
        self.interpret_loaded()
    }

    /// Run the scripts named in the init file under the storage root.  A missing init file is not
    /// an error.  Returns how many scripts were run.
    pub fn run_init_script(&mut self, init_name: &str) -> error::Result<usize>
    {
        let path = self.config.sd_root.join(init_name);

        let Ok(source) = read_to_string(&path)
        else
        {
            debug!(path = %path.display(), "no init script");
            return Ok(0);
        };

        let scripts: Vec<String> = source.lines()
                                         .map(remove_spaces)
                                         .filter(|name| !name.is_empty())
                                         .take(MAX_INIT_SCRIPTS)
                                         .collect();

        for script in &scripts
        {
            info!(script = %script, "running init script");

            if let Err(error) = self.process_source_file(script)
            {
                self.report_error(&error);
            }

            if self.exit_requested
            {
                break;
            }
        }

        Ok(scripts.len())
    }

    pub fn new(config: InterpreterConfig) -> ForthInterpreter
    {
        ForthInterpreter::with_peripherals(config,
                                           Box::new(HostBoard::new()),
                                           Box::new(HostGui::new()))
    }

    /// Create an interpreter driving the given board and screen, with all the built-in words
    /// registered.
    pub fn with_peripherals(config: InterpreterConfig,
                            board: Box<dyn Board>,
                            gui: Box<dyn Gui>) -> ForthInterpreter
    {
        let mut interpreter = ForthInterpreter
            {
                data_stack: BoundedStack::new(config.data_stack_size),
                control_stack: BoundedStack::new(config.control_stack_size),
                frame_floor: 0,
                current_word: None,

                dictionary: Dictionary::new(config.max_words, config.name_max),

                input: InputBuffer::new(),
                tokenizer: Tokenizer::new(),
                console_line: 0,
                base: DEFAULT_BASE,

                compiling: false,
                definition_depth: 0,
                constructor: CodeConstructor::new(config.max_code_cells),

                output: String::new(),
                exit_requested: false,

                board,
                gui,
                gui_state: GuiState::default(),

                config
            };

        register_builtin_words(&mut interpreter);
        interpreter
    }
}


impl Default for ForthInterpreter
{
    fn default() -> Self
    {
        Self::new(InterpreterConfig::default())
    }
}


impl CodeManagement for ForthInterpreter
{
    fn next_token(&mut self) -> String
    {
        self.tokenizer.next_token(&mut self.input, QuotedSpans::Split).0
    }

    fn next_token_quoted(&mut self) -> String
    {
        self.tokenizer.next_token(&mut self.input, QuotedSpans::Preserve).0
    }

    fn input_mut(&mut self) -> &mut InputBuffer
    {
        &mut self.input
    }

    fn is_compiling(&self) -> bool
    {
        self.compiling
    }

    fn set_compiling(&mut self, compiling: bool)
    {
        if compiling && !self.compiling
        {
            self.definition_depth = self.data_stack.depth();
        }

        self.compiling = compiling;
    }

    fn constructor(&self) -> &CodeConstructor
    {
        &self.constructor
    }

    fn constructor_mut(&mut self) -> &mut CodeConstructor
    {
        &mut self.constructor
    }

    fn base(&self) -> u32
    {
        self.base
    }

    fn set_base(&mut self, base: u32)
    {
        self.base = base;
    }

    fn process_line(&mut self, line: &str) -> InterpretStatus
    {
        self.console_line += 1;

        let location = SourceLocation::new_from_info(CONSOLE_PATH, self.console_line, 1);
        self.process_line_at(line, location)
    }

    fn interpret_nested(&mut self, line: &str) -> InterpretStatus
    {
        let saved = self.input.snapshot();
        let location = self.input.location();

        let status = self.process_line_at(line, location);

        self.input.restore(saved);
        status
    }

    fn process_source(&mut self, path: &str, source: &str) -> error::Result<()>
    {
        let saved = self.input.snapshot();
        let mut first_failure = None;

        debug!(path, "loading source");

        for ( index, line ) in source.lines().enumerate()
        {
            let location = SourceLocation::new_from_info(path, index + 1, 1);
            let status = self.process_line_at(line, location.clone());

            if status.is_failure() && first_failure.is_none()
            {
                first_failure = Some(location);
            }

            if self.exit_requested
            {
                break;
            }
        }

        self.input.restore(saved);
        debug!(path, "finished loading source");

        match first_failure
        {
            Some(location) =>
                ScriptError::new_as_result(Some(location),
                                           format!("Errors while executing {}", path),
                                           None),

            None => Ok(())
        }
    }

    fn process_source_file(&mut self, name: &str) -> error::Result<()>
    {
        let file_name = remove_spaces(name);
        let path = self.config.sd_root.join(&file_name);

        let Ok(source) = read_to_string(&path)
        else
        {
            return ScriptError::new_as_result(None,
                                              format!("Could not find file {}", file_name),
                                              None);
        };

        self.process_source(&file_name, &source)
    }
}


impl WordManagement for ForthInterpreter
{
    fn current_location(&self) -> SourceLocation
    {
        self.input.location()
    }

    fn add_word(&mut self,
                file: String,
                line: usize,
                column: usize,
                name: String,
                handler: Rc<WordHandler>,
                description: String,
                signature: String,
                flags: WordFlags)
    {
        let location = SourceLocation::new_from_info(&file, line, column);
        let mut info = WordInfo::new(&name, flags, WordBody::Native(handler), location);

        info.description = description;
        info.signature = signature;

        if let Err(define_error) = self.dictionary.insert(info)
        {
            error!(word = %name, "could not register native word: {}", define_error);
        }
    }

    fn define_word(&mut self, info: WordInfo) -> error::Result<WordId>
    {
        let name = info.name.clone();

        match self.dictionary.insert(info)
        {
            Ok(id) =>
                {
                    debug!(word = %name, "word defined");
                    Ok(id)
                }

            Err(define_error) => script_error(self, format!("{}: {}", define_error, name))
        }
    }

    fn find_word(&self, name: &str) -> Option<WordId>
    {
        self.dictionary.find(name)
    }

    fn execute_word(&mut self, id: WordId) -> error::Result<()>
    {
        let saved_floor = self.frame_floor;
        let saved_word = self.current_word;

        self.frame_floor = self.control_stack.depth();

        let result = self.thread(id);

        // Whatever happened, frames pushed by this execution are of no further use.
        self.control_stack.truncate(self.frame_floor);
        self.frame_floor = saved_floor;
        self.current_word = saved_word;

        result
    }

    fn call_stack(&self) -> CallStack
    {
        let frames = self.control_stack.as_slice().iter().map(|frame| frame.word);

        frames.chain(self.current_word)
              .filter_map(|id| self.dictionary.get(id))
              .map(|word| CallItem::new(word.name.clone(), word.location.clone()))
              .collect()
    }

    fn dictionary(&self) -> &Dictionary
    {
        &self.dictionary
    }

    fn dictionary_mut(&mut self) -> &mut Dictionary
    {
        &mut self.dictionary
    }
}


impl Peripherals for ForthInterpreter
{
    fn board(&mut self) -> &mut dyn Board
    {
        self.board.as_mut()
    }

    fn gui(&mut self) -> &mut dyn Gui
    {
        self.gui.as_mut()
    }

    fn gui_state(&mut self) -> &mut GuiState
    {
        &mut self.gui_state
    }

    fn service_ticker(&mut self, now: Instant) -> bool
    {
        // A ticker line run in the middle of a definition would be compiled into it.
        if self.compiling
        {
            return false;
        }

        let Some(word) = self.gui_state.ticker_due(now)
        else
        {
            return false;
        };

        debug!(word = %word, "ticker fired");

        let status = self.interpret_nested(&word);

        if status.is_failure()
        {
            warn!(word = %word, "ticker detached after an error");
            self.gui_state.detach_ticker();
        }

        true
    }
}
