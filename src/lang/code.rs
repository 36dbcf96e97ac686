use crate::runtime::data_structures::dictionary::{Dictionary, WordId};
use std::fmt::{self, Display, Formatter};

/// The numeric value the end of a body was marked with on older 32-bit boards.  Cells are
/// tagged now so a literal of this value is harmless, but compiling one still draws a warning as
/// code written for those boards would have hung on it.
pub const END_OF_BODY_VALUE: i32 = -55;

/// Number of characters packed into one literal cell by `."`.
pub const CHARS_PER_CELL: usize = 4;

/// One slot in the body of a compiled word.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Cell {
    /// Plain data read by the word that precedes it, `LIT` values, branch offsets and packed
    /// string text.
    Literal(i32),

    /// A reference to the word to execute.
    WordRef(WordId),

    /// Marks the end of a word's body.  Every compiled body ends with exactly one of these.
    EndOfBody,
}

/// Show the cell without resolving word references.
impl Display for Cell {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            Cell::Literal(value) => write!(f, "{}", value),
            Cell::WordRef(id) => write!(f, "word #{}", id.index()),
            Cell::EndOfBody => write!(f, "END"),
        }
    }
}

impl Cell {
    /// Is this the end of body marker?
    pub fn is_end(&self) -> bool {
        matches!(self, Cell::EndOfBody)
    }
}

/// The body of a compiled word.
pub type ByteCode = Vec<Cell>;

/// Pack text into literal cells, four bytes per cell with the first byte in the low bits.  The text
/// is always followed by a zero byte, which gets a cell of its own if the text fills the last cell
/// exactly.
pub fn pack_string(text: &str) -> ByteCode {
    let mut bytes = text.as_bytes().to_vec();

    bytes.push(0);

    bytes
        .chunks(CHARS_PER_CELL)
        .map(|chunk| {
            let packed = chunk
                .iter()
                .enumerate()
                .fold(0u32, |packed, (index, byte)| packed | ((*byte as u32) << (index * 8)));

            Cell::Literal(packed as i32)
        })
        .collect()
}

/// Read text packed by `pack_string` starting at the given index of a body.  Returns the text and
/// the index of the first cell after the one holding the terminating zero.
pub fn unpack_string(code: &[Cell], start: usize) -> (String, usize) {
    let mut bytes = Vec::new();
    let mut index = start;

    while let Some(Cell::Literal(packed)) = code.get(index) {
        index += 1;

        let packed = *packed as u32;
        let mut terminated = false;

        for shift in 0..CHARS_PER_CELL {
            let byte = ((packed >> (shift * 8)) & 0xff) as u8;

            if byte == 0 {
                terminated = true;
                break;
            }

            bytes.push(byte);
        }

        if terminated {
            break;
        }
    }

    (String::from_utf8_lossy(&bytes).into_owned(), index)
}

/// Pretty print a compiled body for debugging purposes, resolving word references to their names.
pub fn pretty_print_code(dictionary: &Dictionary, code: &[Cell]) -> String {
    use std::fmt::Write;

    let mut result = String::with_capacity(code.len() * 16);

    for (index, cell) in code.iter().enumerate() {
        let text = match cell {
            Cell::WordRef(id) => match dictionary.get(*id) {
                Some(word) => word.name.clone(),
                None => format!("<forgotten #{}>", id.index()),
            },
            _ => cell.to_string(),
        };

        writeln!(&mut result, "{:4}: {}", index, text).expect("Writing to String should never fail.");
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_string_reads_back_and_skips_past_terminator() {
        let mut code = pack_string("Hello there");
        let length = code.len();

        code.push(Cell::EndOfBody);

        assert_eq!(length, 3);
        assert_eq!(unpack_string(&code, 0), ("Hello there".to_string(), 3));
    }

    #[test]
    fn exact_multiple_of_four_gets_terminator_cell() {
        let code = pack_string("ABCD");

        assert_eq!(code.len(), 2);
        assert_eq!(code[1], Cell::Literal(0));
        assert_eq!(unpack_string(&code, 0), ("ABCD".to_string(), 2));
    }

    #[test]
    fn empty_string_is_a_single_zero_cell() {
        assert_eq!(pack_string(""), vec![Cell::Literal(0)]);
    }

    #[test]
    fn unpack_stops_at_non_literal_cells() {
        let code = vec![Cell::Literal(0x4948), Cell::EndOfBody];

        assert_eq!(unpack_string(&code, 0), ("HI".to_string(), 1));
    }
}
