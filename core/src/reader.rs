//! S-expression reader that allocates into a [`HeapImage`].
//!
//! Follows the runtime's own reader: `(`, `)` and `'` are single-character
//! tokens, anything else runs to the next paren or whitespace (at most 39
//! characters), a token that parses completely as a float is a number and
//! everything else is interned as an atom.

use crate::error::{InspectError, Result};
use crate::image::HeapImage;
use crate::tag::Lexp;

const MAX_TOKEN: usize = 39;

// ============================================================================
// Tokenizer
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
enum Token {
    LParen,
    RParen,
    Quote,
    Word(String),
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();

    while let Some(&ch) = chars.peek() {
        match ch {
            '(' => {
                tokens.push(Token::LParen);
                chars.next();
            }
            ')' => {
                tokens.push(Token::RParen);
                chars.next();
            }
            '\'' => {
                tokens.push(Token::Quote);
                chars.next();
            }
            ch if ch.is_whitespace() => {
                chars.next();
            }
            _ => {
                let mut word = String::new();
                while let Some(&ch) = chars.peek() {
                    if ch.is_whitespace() || ch == '(' || ch == ')' || word.len() >= MAX_TOKEN {
                        break;
                    }
                    word.push(ch);
                    chars.next();
                }
                tokens.push(Token::Word(word));
            }
        }
    }

    tokens
}

// ============================================================================
// Parser
// ============================================================================

struct Reader<'a> {
    image: &'a mut HeapImage,
    tokens: Vec<Token>,
    pos: usize,
}

impl Reader<'_> {
    fn next(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        tok
    }

    fn read(&mut self) -> Result<Lexp> {
        match self.next() {
            Some(tok) => self.parse(tok),
            None => Err(InspectError::syntax("unexpected end of input")),
        }
    }

    fn parse(&mut self, tok: Token) -> Result<Lexp> {
        match tok {
            Token::LParen => self.list(),
            Token::Quote => {
                let quoted = self.read()?;
                let quote = self.image.atom("quote")?;
                let tail = self.image.cons(quoted, Lexp::nil())?;
                self.image.cons(quote, tail)
            }
            Token::RParen => Err(InspectError::syntax("unexpected )")),
            Token::Word(w) => self.atomic(&w),
        }
    }

    fn list(&mut self) -> Result<Lexp> {
        let mut items = Vec::new();
        loop {
            match self.next() {
                None => return Err(InspectError::syntax("unclosed parenthesis")),
                Some(Token::RParen) => {
                    return self.build(items, Lexp::nil());
                }
                Some(Token::Word(ref w)) if w == "." => {
                    let last = self.read()?;
                    if self.next() != Some(Token::RParen) {
                        return Err(InspectError::syntax("expected ) after dotted tail"));
                    }
                    return self.build(items, last);
                }
                Some(tok) => items.push(self.parse(tok)?),
            }
        }
    }

    /// Cons up `items` onto `tail` back to front, as the runtime's recursive
    /// `list()` does when it unwinds.
    fn build(&mut self, items: Vec<Lexp>, tail: Lexp) -> Result<Lexp> {
        let mut acc = tail;
        for item in items.into_iter().rev() {
            acc = self.image.cons(item, acc)?;
        }
        Ok(acc)
    }

    fn atomic(&mut self, word: &str) -> Result<Lexp> {
        match word.parse::<f64>() {
            // NaN would alias a tagged reference
            Ok(n) if !n.is_nan() => Ok(Lexp::from_f64(n)),
            _ => self.image.atom(word),
        }
    }
}

/// Read one expression from `input` into `image`.
pub fn read(image: &mut HeapImage, input: &str) -> Result<Lexp> {
    let mut all = read_all(image, input)?;
    match all.len() {
        1 => Ok(all.remove(0)),
        0 => Err(InspectError::syntax("no expression found")),
        n => Err(InspectError::syntax(format!("expected one expression, found {n}"))),
    }
}

/// Read every expression in `input` into `image`, in order.
pub fn read_all(image: &mut HeapImage, input: &str) -> Result<Vec<Lexp>> {
    let tokens = tokenize(input);
    let mut reader = Reader {
        image,
        tokens,
        pos: 0,
    };
    let mut out = Vec::new();
    while reader.pos < reader.tokens.len() {
        out.push(reader.read()?);
    }
    Ok(out)
}
