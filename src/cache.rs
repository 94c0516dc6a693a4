use std::fmt;
use std::io::{BufReader, Bytes, Read};

use crate::error::Result;
use crate::instruction::Instruction;

/// A 1-based line/column position in the program text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn start() -> Self {
        Self { line: 1, column: 1 }
    }

    /// Step past `byte`.
    pub fn advance(&mut self, byte: u8) {
        if byte == b'\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// One non-whitespace character of program text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub byte: u8,
    pub location: Location,
}

impl Token {
    pub fn instruction(&self) -> Instruction {
        Instruction::from_byte(self.byte)
    }
}

/// Whitespace as the C locale defines it; never becomes a token.
fn is_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | 0x0B | 0x0C)
}

/// Lazily loaded, append-only cache of program tokens.
///
/// Tokens are pulled from the source one at a time, only when the read
/// position reaches the end of the cache, so backward jumps into an open
/// loop never re-read the source. The only way entries leave the cache is
/// [`InstructionCache::compact`].
pub struct InstructionCache<R: Read> {
    source: Bytes<BufReader<R>>,
    /// Location of the next unread source byte.
    next_location: Location,
    exhausted: bool,
    tokens: Vec<Token>,
    position: usize,
    /// Number of tokens discarded by compaction so far.
    discarded: usize,
}

impl<R: Read> InstructionCache<R> {
    pub fn new(source: R) -> Self {
        Self {
            source: BufReader::new(source).bytes(),
            next_location: Location::start(),
            exhausted: false,
            tokens: Vec::new(),
            position: 0,
            discarded: 0,
        }
    }

    /// Token at `position`, pulling the next one from the source when
    /// `position` is exactly one past the end of the cache. `Ok(None)`
    /// signals end of program. `position` must be at most one past the end
    /// of the cache.
    pub fn token_at(&mut self, position: usize) -> Result<Option<Token>> {
        debug_assert!(
            position <= self.tokens.len(),
            "read position {position} beyond cache length {}",
            self.tokens.len()
        );
        if let Some(&token) = self.tokens.get(position) {
            return Ok(Some(token));
        }
        match self.pull()? {
            Some(token) => {
                self.tokens.push(token);
                Ok(Some(token))
            }
            None => Ok(None),
        }
    }

    /// Token at the current read position.
    pub fn current(&mut self) -> Result<Option<Token>> {
        self.token_at(self.position)
    }

    pub fn advance(&mut self) {
        self.position += 1;
    }

    /// Move the read position back to a previously cached token.
    pub fn rewind(&mut self, position: usize) {
        debug_assert!(position < self.tokens.len());
        self.position = position;
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Position counted in tokens since the start of the program, unaffected
    /// by compaction.
    pub fn absolute_position(&self) -> usize {
        self.discarded + self.position
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Discard every token before the read position and reset the position
    /// to zero. The caller must guarantee that nothing will rewind into the
    /// discarded range.
    pub fn compact(&mut self) {
        self.tokens.drain(..self.position);
        self.discarded += self.position;
        tracing::trace!(discarded = self.discarded, "instruction cache compacted");
        self.position = 0;
    }

    /// Read the next non-whitespace byte from the source.
    fn pull(&mut self) -> Result<Option<Token>> {
        if self.exhausted {
            return Ok(None);
        }
        for byte in &mut self.source {
            let byte = byte?;
            let location = self.next_location;
            self.next_location.advance(byte);
            if !is_space(byte) {
                return Ok(Some(Token { byte, location }));
            }
        }
        self.exhausted = true;
        Ok(None)
    }
}
