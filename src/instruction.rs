use std::fmt::Write as _;

use crate::cache::Location;

/// The eight meaningful characters of the language. Every other byte is a
/// comment and executes as a no-op.
const GREATER: u8 = b'>';
const LESS: u8 = b'<';
const PLUS: u8 = b'+';
const MINUS: u8 = b'-';
const DOT: u8 = b'.';
const COMMA: u8 = b',';
const LBRACKET: u8 = b'[';
const RBRACKET: u8 = b']';

/// A decoded instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    MoveRight,
    MoveLeft,
    Increment,
    Decrement,
    Output,
    Input,
    LoopOpen,
    LoopClose,
    /// Any other character.
    Comment,
}

impl Instruction {
    pub fn from_byte(byte: u8) -> Self {
        match byte {
            GREATER => Instruction::MoveRight,
            LESS => Instruction::MoveLeft,
            PLUS => Instruction::Increment,
            MINUS => Instruction::Decrement,
            DOT => Instruction::Output,
            COMMA => Instruction::Input,
            LBRACKET => Instruction::LoopOpen,
            RBRACKET => Instruction::LoopClose,
            _ => Instruction::Comment,
        }
    }

    /// Loop brackets are the only instructions processed while skipping.
    pub fn is_bracket(self) -> bool {
        matches!(self, Instruction::LoopOpen | Instruction::LoopClose)
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            Instruction::MoveRight => "RIGHT",
            Instruction::MoveLeft => "LEFT",
            Instruction::Increment => "INC",
            Instruction::Decrement => "DEC",
            Instruction::Output => "OUT",
            Instruction::Input => "IN",
            Instruction::LoopOpen => "OPEN",
            Instruction::LoopClose => "CLOSE",
            Instruction::Comment => "NOP",
        }
    }
}

/// Returns true if the byte is a meaningful instruction (as opposed to a
/// comment).
pub fn is_instruction(byte: u8) -> bool {
    Instruction::from_byte(byte) != Instruction::Comment
}

/// Pretty-print the meaningful instructions of a program, one per line,
/// with their source locations. Loop bodies are indented by nesting depth.
///
/// Unbalanced closes are listed at depth 0; nothing is validated here.
pub fn disassemble(source: &[u8]) -> String {
    let mut out = String::new();
    let mut location = Location::start();
    let mut depth: usize = 0;

    for &byte in source {
        let here = location;
        location.advance(byte);

        if !is_instruction(byte) {
            continue;
        }
        let instruction = Instruction::from_byte(byte);
        if instruction == Instruction::LoopClose {
            depth = depth.saturating_sub(1);
        }
        let _ = writeln!(
            out,
            "{:>5}:{:<4} {}{} '{}'",
            here.line,
            here.column,
            "  ".repeat(depth),
            instruction.mnemonic(),
            byte as char
        );
        if instruction == Instruction::LoopOpen {
            depth += 1;
        }
    }

    out
}
