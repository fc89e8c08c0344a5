use crate::analysis::token::Token;

/// Splits text into lowercase tokens on ASCII non-alphanumeric boundaries.
///
/// Each maximal run of ASCII alphanumerics becomes one token; ASCII letters
/// are folded to lowercase. Bytes outside the ASCII range are kept inside
/// the current token unchanged, so accented words survive as single tokens.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut position = 0u32;

    for ch in text.chars() {
        if ch.is_ascii_alphanumeric() {
            current.push(ch.to_ascii_lowercase());
        } else if !ch.is_ascii() {
            current.push(ch);
        } else if !current.is_empty() {
            tokens.push(Token::new(std::mem::take(&mut current), position));
            position += 1;
        }
    }

    if !current.is_empty() {
        tokens.push(Token::new(current, position));
    }

    tokens
}
