use crate::{
    lang::{
        code::{ByteCode, Cell},
        source_buffer::SourceLocation,
    },
    runtime::{data_structures::variable_store::VariableStore, interpreter::WordHandler},
};
use std::{
    fmt::{self, Display, Formatter},
    ops::BitOr,
    rc::Rc,
};

/// The single flags a word can carry.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum WordFlag {
    /// The word's body is a native function.
    Inbuilt = 0x01,

    /// The word is executed when found at compile time rather than compiled.
    Immediate = 0x02,

    /// The word was compiled from user source code.
    User = 0x04,

    /// The word may only be used while compiling a definition.
    CompileOnly = 0x08,

    /// The word owns a variable cell.
    Variable = 0x10,
}

/// The set of flags attached to a dictionary entry.
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct WordFlags(u8);

impl WordFlags {
    pub const NONE: WordFlags = WordFlags(0);
    pub const INBUILT: WordFlags = WordFlags(WordFlag::Inbuilt as u8);
    pub const IMMEDIATE: WordFlags = WordFlags(WordFlag::Immediate as u8);
    pub const USER: WordFlags = WordFlags(WordFlag::User as u8);
    pub const COMPILE_ONLY: WordFlags = WordFlags(WordFlag::CompileOnly as u8);
    pub const VARIABLE: WordFlags = WordFlags(WordFlag::Variable as u8);

    pub fn contains(&self, flag: WordFlag) -> bool {
        (self.0 & flag as u8) != 0
    }
}

impl BitOr for WordFlags {
    type Output = WordFlags;

    fn bitor(self, other: WordFlags) -> WordFlags {
        WordFlags(self.0 | other.0)
    }
}

/// Show the flags the way the `WORDS` listing prints them.
impl Display for WordFlags {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        let names = [
            (WordFlag::Immediate, "immediate"),
            (WordFlag::CompileOnly, "compile-only"),
            (WordFlag::User, "user"),
            (WordFlag::Variable, "variable"),
        ];

        let shown: Vec<&str> = names
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect();

        write!(f, "{}", shown.join(" "))
    }
}

/// A stable handle to a dictionary entry.  The generation lets a handle to a deleted word be told
/// apart from the word that later reuses its slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default, Debug)]
pub struct WordId {
    index: u32,
    generation: u32,
}

impl WordId {
    /// The slot this handle refers to.
    pub fn index(&self) -> usize {
        self.index as usize
    }
}

/// What executing a word actually does.
#[derive(Clone)]
pub enum WordBody {
    /// Call a native function.
    Native(Rc<WordHandler>),

    /// Thread through a sequence of cells, always terminated by `Cell::EndOfBody`.
    Code(ByteCode),
}

/// The information stored in the dictionary for each word.
#[derive(Clone)]
pub struct WordInfo {
    /// The name of the word.
    pub name: String,

    /// How the interpreter should treat the word.
    pub flags: WordFlags,

    /// The native function or compiled cells of the word.
    pub body: WordBody,

    /// Address of the cell owned by a `VARIABLE` word.
    pub variable: Option<usize>,

    /// Where the word was defined, Rust source for primitives and Forth source for user words.
    pub location: SourceLocation,

    /// A simple description of the word.
    pub description: String,

    /// The stack signature of the word.
    pub signature: String,
}

impl WordInfo {
    /// Create a new word with no description.
    pub fn new(name: &str, flags: WordFlags, body: WordBody, location: SourceLocation) -> WordInfo {
        WordInfo {
            name: name.to_string(),
            flags,
            body,
            variable: None,
            location,
            description: String::new(),
            signature: String::new(),
        }
    }

    /// Is the body of this word a native function?
    pub fn is_native(&self) -> bool {
        matches!(self.body, WordBody::Native(_))
    }

    pub fn is_immediate(&self) -> bool {
        self.flags.contains(WordFlag::Immediate)
    }

    pub fn is_compile_only(&self) -> bool {
        self.flags.contains(WordFlag::CompileOnly)
    }

    /// The compiled cells of the word, empty for native words.
    pub fn code(&self) -> &[Cell] {
        match &self.body {
            WordBody::Code(code) => code,
            WordBody::Native(_) => &[],
        }
    }
}

/// Why a word could not be added to the dictionary.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum DefineError {
    /// The dictionary already holds as many words as it is allowed.
    OutOfMemory,

    /// The name is longer than the dictionary accepts.
    NameTooLong,
}

impl Display for DefineError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            DefineError::OutOfMemory => write!(f, "Out of dictionary space"),
            DefineError::NameTooLong => write!(f, "Word name is too long"),
        }
    }
}

/// One slot of the dictionary's arena.
struct Slot {
    generation: u32,
    entry: Option<WordInfo>,
}

/// The dictionary of words known to the interpreter.
///
/// Entries live in an arena of slots and are referenced by `WordId`.  A separate list keeps the
/// entries in definition order so lookups can scan from the newest word to the oldest.  Redefining
/// a name adds a new entry that shadows the old one, deleting the new entry makes the old one
/// visible again.
///
/// The dictionary also owns the cells behind `VARIABLE` words, they are released along with the
/// word that owns them.
pub struct Dictionary {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: Vec<WordId>,
    variables: VariableStore,
    max_words: usize,
    name_max: usize,
}

/// List the words newest first, one per line, along with their flags and description.
impl Display for Dictionary {
    fn fmt(&self, formatter: &mut Formatter) -> fmt::Result {
        let max_size = self
            .iter()
            .map(|word| word.name.len())
            .max()
            .unwrap_or(0);

        writeln!(formatter, "{} words defined.\n", self.len())?;

        for word in self.iter() {
            writeln!(
                formatter,
                "{:width$}  {:24}  {}",
                word.name,
                word.flags.to_string(),
                word.description,
                width = max_size
            )?;
        }

        Ok(())
    }
}

impl Dictionary {
    /// Create an empty dictionary.
    pub fn new(max_words: usize, name_max: usize) -> Dictionary {
        Dictionary {
            slots: Vec::new(),
            free: Vec::new(),
            order: Vec::new(),
            variables: VariableStore::new(),
            max_words,
            name_max,
        }
    }

    /// Add a word with the given name, flags and body.  A compiled body gets its end marker
    /// appended here, an empty one becomes a word that does nothing.
    pub fn define(
        &mut self,
        name: &str,
        flags: WordFlags,
        body: WordBody,
        location: SourceLocation,
    ) -> Result<WordId, DefineError> {
        self.insert(WordInfo::new(name, flags, body, location))
    }

    /// Add a fully described word, it becomes the newest entry.
    pub fn insert(&mut self, mut info: WordInfo) -> Result<WordId, DefineError> {
        if info.name.chars().count() > self.name_max {
            return Err(DefineError::NameTooLong);
        }

        if self.order.len() >= self.max_words {
            return Err(DefineError::OutOfMemory);
        }

        if let WordBody::Code(code) = &mut info.body {
            code.push(Cell::EndOfBody);
        }

        let id = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];

                slot.entry = Some(info);
                WordId {
                    index,
                    generation: slot.generation,
                }
            }

            None => {
                self.slots.push(Slot {
                    generation: 0,
                    entry: Some(info),
                });

                WordId {
                    index: (self.slots.len() - 1) as u32,
                    generation: 0,
                }
            }
        };

        self.order.push(id);
        Ok(id)
    }

    /// Find the newest word with exactly this name.
    pub fn find(&self, name: &str) -> Option<WordId> {
        self.order.iter().rev().copied().find(|id| {
            self.get(*id)
                .is_some_and(|word| word.name.len() == name.len() && word.name == name)
        })
    }

    /// Look up a word by handle.  Handles to deleted words give back None.
    pub fn get(&self, id: WordId) -> Option<&WordInfo> {
        self.slots
            .get(id.index())
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.entry.as_ref())
    }

    /// Delete the newest word with the given name.  The name `LATEST` deletes the newest word in
    /// the dictionary whatever it is called.
    pub fn delete(&mut self, name: &str) -> Option<WordInfo> {
        let position = if name == "LATEST" {
            self.order.len().checked_sub(1)?
        } else {
            let id = self.find(name)?;
            self.order.iter().rposition(|found| *found == id)?
        };

        let id = self.order.remove(position);
        self.release(id)
    }

    /// Delete the newest `count` words.  Returns how many were actually deleted.
    pub fn delete_latest(&mut self, count: usize) -> usize {
        let mut deleted = 0;

        while deleted < count {
            match self.order.pop() {
                Some(id) => {
                    let _ = self.release(id);
                    deleted += 1;
                }

                None => break,
            }
        }

        deleted
    }

    /// The number of words in the dictionary.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate over the words from newest to oldest.
    pub fn iter(&self) -> impl Iterator<Item = &WordInfo> {
        self.order.iter().rev().filter_map(|id| self.get(*id))
    }

    /// The cells behind variable words.
    pub fn variables(&self) -> &VariableStore {
        &self.variables
    }

    pub fn variables_mut(&mut self) -> &mut VariableStore {
        &mut self.variables
    }

    /// Tombstone a slot and release the variable cell its word owned.
    fn release(&mut self, id: WordId) -> Option<WordInfo> {
        let slot = self.slots.get_mut(id.index())?;
        let info = slot.entry.take()?;

        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);

        if let Some(address) = info.variable {
            self.variables.release(address);
        }

        Some(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_word(dictionary: &mut Dictionary, name: &str, value: i32) -> WordId {
        dictionary
            .define(
                name,
                WordFlags::USER,
                WordBody::Code(vec![Cell::Literal(value)]),
                SourceLocation::default(),
            )
            .unwrap()
    }

    #[test]
    fn newest_definition_shadows_and_delete_restores() {
        let mut dictionary = Dictionary::new(16, 15);

        let first = code_word(&mut dictionary, "X", 1);
        let second = code_word(&mut dictionary, "X", 2);

        assert_eq!(dictionary.find("X"), Some(second));

        let deleted = dictionary.delete("X").unwrap();
        assert_eq!(deleted.code(), &[Cell::Literal(2), Cell::EndOfBody]);
        assert_eq!(dictionary.find("X"), Some(first));
    }

    #[test]
    fn latest_is_an_alias_for_the_newest_word() {
        let mut dictionary = Dictionary::new(16, 15);

        let _ = code_word(&mut dictionary, "A", 1);
        let _ = code_word(&mut dictionary, "B", 2);

        assert_eq!(dictionary.delete("LATEST").unwrap().name, "B");
        assert!(dictionary.find("B").is_none());
        assert!(dictionary.find("A").is_some());
    }

    #[test]
    fn empty_body_gets_only_the_end_marker() {
        let mut dictionary = Dictionary::new(16, 15);

        let id = dictionary
            .define(
                "NOP",
                WordFlags::USER,
                WordBody::Code(Vec::new()),
                SourceLocation::default(),
            )
            .unwrap();

        assert_eq!(dictionary.get(id).unwrap().code(), &[Cell::EndOfBody]);
    }

    #[test]
    fn stale_handles_do_not_resolve_after_slot_reuse() {
        let mut dictionary = Dictionary::new(16, 15);

        let old = code_word(&mut dictionary, "OLD", 1);
        assert!(dictionary.delete("OLD").is_some());

        let new = code_word(&mut dictionary, "NEW", 2);

        assert_eq!(old.index(), new.index());
        assert!(dictionary.get(old).is_none());
        assert_eq!(dictionary.get(new).unwrap().name, "NEW");
    }

    #[test]
    fn delete_latest_removes_exactly_n_and_frees_variables() {
        let mut dictionary = Dictionary::new(16, 15);

        let _ = code_word(&mut dictionary, "KEEP", 0);

        for name in ["V1", "V2"] {
            let address = dictionary.variables_mut().allocate();
            let mut info = WordInfo::new(
                name,
                WordFlags::VARIABLE,
                WordBody::Code(vec![Cell::Literal(address as i32)]),
                SourceLocation::default(),
            );

            info.variable = Some(address);
            let _ = dictionary.insert(info).unwrap();
        }

        assert_eq!(dictionary.variables().live_count(), 2);
        assert_eq!(dictionary.delete_latest(0), 0);
        assert_eq!(dictionary.delete_latest(2), 2);

        assert!(dictionary.find("V1").is_none());
        assert!(dictionary.find("V2").is_none());
        assert!(dictionary.find("KEEP").is_some());
        assert_eq!(dictionary.variables().live_count(), 0);
    }

    #[test]
    fn limits_are_enforced() {
        let mut dictionary = Dictionary::new(1, 4);

        assert_eq!(
            dictionary.define(
                "TOOLONG",
                WordFlags::USER,
                WordBody::Code(Vec::new()),
                SourceLocation::default()
            ),
            Err(DefineError::NameTooLong)
        );

        let _ = code_word(&mut dictionary, "A", 0);

        assert_eq!(
            dictionary.define(
                "B",
                WordFlags::USER,
                WordBody::Code(Vec::new()),
                SourceLocation::default()
            ),
            Err(DefineError::OutOfMemory)
        );
        assert!(dictionary.find("B").is_none());
    }
}
