use crate::{
    lang::code::{ByteCode, Cell},
    runtime::error::{self, ScriptError},
};

/// Holds the state of a word definition while the interpreter is in compile mode.  A definition
/// can span many input lines so this state outlives any single call into the interpreter.
///
/// The write cursor is simply the length of the code so far.  Immediate words like `IF` and
/// `THEN` use `position` and `patch` to fill in branch offsets once their targets are known.
pub struct CodeConstructor {
    /// The name of the word being defined, captured once from the first token after `:`.
    name: Option<String>,

    /// The cells compiled so far.
    code: ByteCode,

    /// The most cells a single definition may hold.
    max_cells: usize,
}

impl CodeConstructor {
    /// Create a new, empty constructor.
    pub fn new(max_cells: usize) -> CodeConstructor {
        CodeConstructor {
            name: None,
            code: ByteCode::with_capacity(max_cells),
            max_cells,
        }
    }

    /// The name of the word being defined, if it has been read yet.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn set_name(&mut self, name: String) {
        self.name = Some(name);
    }

    /// The index the next emitted cell will be written to.
    pub fn position(&self) -> usize {
        self.code.len()
    }

    /// The cells compiled so far.
    pub fn code(&self) -> &ByteCode {
        &self.code
    }

    /// Append a cell to the definition, returning the index it was written to.
    pub fn emit(&mut self, cell: Cell) -> error::Result<usize> {
        if self.code.len() >= self.max_cells {
            return ScriptError::new_as_result(
                None,
                format!(
                    "Definition of {} is longer than {} cells.",
                    self.name.as_deref().unwrap_or("<unnamed>"),
                    self.max_cells
                ),
                None,
            );
        }

        self.code.push(cell);
        Ok(self.code.len() - 1)
    }

    /// Overwrite a previously emitted cell.
    pub fn patch(&mut self, index: usize, cell: Cell) -> error::Result<()> {
        match self.code.get_mut(index) {
            Some(slot) => {
                *slot = cell;
                Ok(())
            }

            None => ScriptError::new_as_result(
                None,
                format!("Branch position {} is outside of the current definition.", index),
                None,
            ),
        }
    }

    /// Hand over the finished definition and get ready for the next one.
    pub fn take(&mut self) -> (String, ByteCode) {
        let name = self.name.take().unwrap_or_default();
        let code = std::mem::take(&mut self.code);

        (name, code)
    }

    /// Throw away any partially compiled definition.
    pub fn reset(&mut self) {
        self.name = None;
        self.code.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_returns_positions_and_patch_overwrites() {
        let mut constructor = CodeConstructor::new(8);

        constructor.set_name("TEST".to_string());

        assert_eq!(constructor.emit(Cell::Literal(1)).unwrap(), 0);
        assert_eq!(constructor.emit(Cell::Literal(0)).unwrap(), 1);
        assert_eq!(constructor.position(), 2);

        constructor.patch(1, Cell::Literal(7)).unwrap();
        assert_eq!(constructor.code(), &vec![Cell::Literal(1), Cell::Literal(7)]);

        assert!(constructor.patch(5, Cell::Literal(0)).is_err());
    }

    #[test]
    fn emit_fails_when_full() {
        let mut constructor = CodeConstructor::new(1);

        assert!(constructor.emit(Cell::Literal(1)).is_ok());
        assert!(constructor.emit(Cell::Literal(2)).is_err());
    }

    #[test]
    fn take_resets_for_the_next_definition() {
        let mut constructor = CodeConstructor::new(4);

        constructor.set_name("A".to_string());
        let _ = constructor.emit(Cell::EndOfBody);

        let (name, code) = constructor.take();

        assert_eq!(name, "A");
        assert_eq!(code, vec![Cell::EndOfBody]);
        assert_eq!(constructor.name(), None);
        assert_eq!(constructor.position(), 0);
    }
}
