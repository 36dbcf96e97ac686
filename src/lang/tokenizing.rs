use crate::lang::source_buffer::InputBuffer;

/// The lowest numeral base accepted by `BASE`.
pub const MIN_BASE: u32 = 2;

/// The highest numeral base accepted by `BASE`.
pub const MAX_BASE: u32 = 34;

/// The base the interpreter starts up in.
pub const DEFAULT_BASE: u32 = 10;

/// How the tokenizer should treat double quotes while extracting a token.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum QuotedSpans {
    /// Quotes are ordinary characters, a space always ends the token.
    Split,

    /// A double quote opens a span in which spaces do not end the token.  The span is closed by
    /// the next double quote.  Used by words that take quoted names, like `FLOAD "my file"`.
    Preserve,
}

/// Pulls whitespace delimited tokens out of the interpreter's input buffer.  The tokenizer itself
/// only keeps a running count of the tokens it has handed out, the position lives in the buffer.
#[derive(Default)]
pub struct Tokenizer {
    extracted: usize,
}

/// Check if the given character separates tokens.
fn is_whitespace(next: char) -> bool {
    next == ' ' || next == '\t' || next == '\r' || next == '\n'
}

/// Skip over whitespace in the text.  Stopping only at either the end of the buffer or the next
/// non-whitespace character.
fn skip_whitespace(buffer: &mut InputBuffer) {
    while let Some(next) = buffer.peek_next() {
        if !is_whitespace(next) {
            break;
        }

        let _ = buffer.next_char();
    }
}

impl Tokenizer {
    pub fn new() -> Tokenizer {
        Tokenizer { extracted: 0 }
    }

    /// Get the next token from the buffer.  An empty string means the line is used up.  Along with
    /// the token the cumulative number of non-empty tokens extracted so far is returned.
    pub fn next_token(&mut self, buffer: &mut InputBuffer, spans: QuotedSpans) -> (String, usize) {
        skip_whitespace(buffer);

        let mut text = String::new();
        let mut in_quotes = false;

        while let Some(next) = buffer.peek_next() {
            if is_whitespace(next) && !(in_quotes && next == ' ') {
                break;
            }

            if next == '"' && spans == QuotedSpans::Preserve {
                in_quotes = !in_quotes;
            }

            text.push(next);
            let _ = buffer.next_char();
        }

        if !text.is_empty() {
            self.extracted += 1;
        }

        (text, self.extracted)
    }

    /// How many non-empty tokens have been extracted over the tokenizer's lifetime.
    pub fn extracted(&self) -> usize {
        self.extracted
    }
}

/// Map a numeral character to its digit value.  Only upper case letters are digits, input lines
/// are upper cased before they reach the tokenizer.
fn digit_value(next: char) -> Option<u32> {
    match next {
        '0'..='9' => Some(next as u32 - '0' as u32),
        'A'..='Z' => Some(next as u32 - 'A' as u32 + 10),
        _ => None,
    }
}

/// Convert a token to a number in the given base.
///
/// The token is scanned from its last character backwards.  Each character must be a digit that is
/// valid in the base, a leading `-` negates the result and ends the scan.  Scanning stops at the
/// first character that breaks these rules.
///
/// Returns the accumulated value and the count of leading characters that were not consumed.  A
/// count of zero means the whole token is a number, anything else means it is not one and the
/// value should be ignored.
pub fn parse_number(token: &str, base: u32) -> (i32, usize) {
    let chars: Vec<char> = token.chars().collect();
    let mut remaining = chars.len();
    let mut value: i32 = 0;
    let mut place: i32 = 1;
    let mut negative = false;

    while remaining > 0 {
        let next = chars[remaining - 1];

        if next == '-' {
            negative = true;
            remaining -= 1;
            break;
        }

        match digit_value(next) {
            Some(digit) if digit < base => {
                value = value.wrapping_add((digit as i32).wrapping_mul(place));
                place = place.wrapping_mul(base as i32);
                remaining -= 1;
            }

            _ => break,
        }
    }

    if negative {
        value = value.wrapping_neg();
    }

    (value, remaining)
}

/// Format a value in the given base using the same digits `parse_number` accepts.
pub fn format_number(value: i32, base: u32) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

    let base = base.clamp(MIN_BASE, 36);
    let mut magnitude = value.unsigned_abs();
    let mut digits = Vec::new();

    loop {
        digits.push(DIGITS[(magnitude % base) as usize] as char);
        magnitude /= base;

        if magnitude == 0 {
            break;
        }
    }

    if value < 0 {
        digits.push('-');
    }

    digits.iter().rev().collect()
}

/// Upper case a line of input, leaving the text between double quotes untouched.
pub fn to_upper_outside_quotes(text: &str) -> String {
    let mut in_quotes = false;

    text.chars()
        .map(|next| {
            if next == '"' {
                in_quotes = !in_quotes;
            }

            if in_quotes {
                next
            } else {
                next.to_ascii_uppercase()
            }
        })
        .collect()
}

/// Remove a leading and a trailing double quote from a quoted token.
pub fn strip_quotes(text: &str) -> String {
    let text = text.strip_prefix('"').unwrap_or(text);
    let text = text.strip_suffix('"').unwrap_or(text);

    text.to_string()
}

/// Trim a file name taken from user input.  Leading spaces and line endings are dropped and the
/// name ends at the first space after it starts.
pub fn remove_spaces(text: &str) -> String {
    text.chars()
        .filter(|next| *next != '\r' && *next != '\n')
        .skip_while(|next| *next == ' ')
        .take_while(|next| *next != ' ')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use test_case::test_case;

    fn tokens(line: &str, spans: QuotedSpans) -> Vec<String> {
        let mut buffer = InputBuffer::new();
        let mut tokenizer = Tokenizer::new();
        let mut found = Vec::new();

        buffer.load(line);

        loop {
            let (token, _) = tokenizer.next_token(&mut buffer, spans);

            if token.is_empty() {
                break;
            }

            found.push(token);
        }

        found
    }

    #[test]
    fn splits_on_spaces_tabs_and_newlines() {
        assert_eq!(
            tokens("  1 2\t+\n.", QuotedSpans::Split),
            vec!["1", "2", "+", "."]
        );
    }

    #[test]
    fn quoted_span_keeps_spaces_only_when_asked() {
        assert_eq!(
            tokens("\"my file\" X", QuotedSpans::Preserve),
            vec!["\"my file\"", "X"]
        );
        assert_eq!(
            tokens("\"my file\" X", QuotedSpans::Split),
            vec!["\"my", "file\"", "X"]
        );
    }

    #[test]
    fn counts_only_non_empty_tokens() {
        let mut buffer = InputBuffer::new();
        let mut tokenizer = Tokenizer::new();

        buffer.load("A B   ");

        assert_eq!(tokenizer.next_token(&mut buffer, QuotedSpans::Split).1, 1);
        assert_eq!(tokenizer.next_token(&mut buffer, QuotedSpans::Split).1, 2);
        assert_eq!(
            tokenizer.next_token(&mut buffer, QuotedSpans::Split),
            (String::new(), 2)
        );
        assert_eq!(tokenizer.extracted(), 2);
    }

    #[test_case("42", 10 => (42, 0); "decimal")]
    #[test_case("-17", 10 => (-17, 0); "negative decimal")]
    #[test_case("FF", 16 => (255, 0); "hex")]
    #[test_case("101", 2 => (5, 0); "binary")]
    #[test_case("12", 2 => (0, 2); "digit outside base")]
    #[test_case("+3", 10 => (3, 1); "plus sign is not a digit")]
    #[test_case("5-3", 10 => (-3, 1); "minus in the middle")]
    #[test_case("-", 10 => (0, 0); "lone minus")]
    #[test_case("DUP", 10 => (0, 3); "word")]
    #[test_case("", 10 => (0, 0); "empty")]
    fn parses_numbers(token: &str, base: u32) -> (i32, usize) {
        parse_number(token, base)
    }

    #[test_case(255, 16 => "FF")]
    #[test_case(-5, 2 => "-101")]
    #[test_case(0, 34 => "0")]
    #[test_case(i32::MIN, 10 => "-2147483648")]
    fn formats_numbers(value: i32, base: u32) -> String {
        format_number(value, base)
    }

    #[test]
    fn upper_cases_outside_quotes() {
        assert_eq!(
            to_upper_outside_quotes(": hi .\" Hello there\" cr ;"),
            ": HI .\" Hello there\" CR ;"
        );
    }

    #[test_case("\"boot.f\"" => "boot.f")]
    #[test_case("boot.f" => "boot.f")]
    #[test_case("\"" => "")]
    fn strips_quotes(text: &str) -> String {
        strip_quotes(text)
    }

    #[test_case("  init.f\r\n" => "init.f")]
    #[test_case("a b" => "a")]
    fn removes_spaces(text: &str) -> String {
        remove_spaces(text)
    }

    proptest! {
        #[test]
        fn numbers_round_trip(value: i32, base in MIN_BASE..=MAX_BASE) {
            let text = format_number(value, base);
            prop_assert_eq!(parse_number(&text, base), (value, 0));
        }
    }
}
