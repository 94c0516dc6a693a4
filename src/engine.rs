use std::io::{ErrorKind, Read, Write};
use std::str::FromStr;

use tracing::{debug, warn};

use crate::cache::{InstructionCache, Token};
use crate::control::{Close, ControlStack};
use crate::error::{Error, Result};
use crate::instruction::Instruction;
use crate::stats::RunStats;
use crate::tape::{DEFAULT_CELLS, Tape};

/// Default cache position past which consumed instructions are discarded.
pub const DEFAULT_COMPACT_THRESHOLD: usize = 100;

/// What an input instruction stores when the input stream is exhausted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EofPolicy {
    /// Leave the current cell as it is.
    #[default]
    Unchanged,
    /// Store 0.
    Zero,
    /// Store 255.
    Max,
}

impl FromStr for EofPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "unchanged" => Ok(EofPolicy::Unchanged),
            "zero" | "0" => Ok(EofPolicy::Zero),
            "max" | "255" => Ok(EofPolicy::Max),
            other => Err(format!("Unknown EOF policy '{other}', expected unchanged, zero or max")),
        }
    }
}

/// Configuration for a single run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EngineConfig {
    /// Initial number of tape cells.
    pub initial_cells: usize,
    /// Compact the instruction cache once the read position passes this
    /// with no loop open. `None` disables compaction.
    pub compact_threshold: Option<usize>,
    pub eof: EofPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_cells: DEFAULT_CELLS,
            compact_threshold: Some(DEFAULT_COMPACT_THRESHOLD),
            eof: EofPolicy::Unchanged,
        }
    }
}

/// The execution engine: owns the tape, the instruction cache, and the
/// loop stack for the lifetime of one run.
///
/// `S` is the program text, `I` the input stream read by `,` and `O` the
/// output sink written by `.`.
pub struct Engine<S: Read, I: Read, O: Write> {
    config: EngineConfig,
    tape: Tape,
    cache: InstructionCache<S>,
    control: ControlStack,
    input: I,
    output: O,
    stats: RunStats,
}

impl<S: Read, I: Read, O: Write> Engine<S, I, O> {
    pub fn new(source: S, input: I, output: O, config: EngineConfig) -> Self {
        let tape = Tape::new(config.initial_cells);
        let stats = RunStats {
            peak_cells: tape.capacity(),
            ..Default::default()
        };
        Self {
            config,
            tape,
            cache: InstructionCache::new(source),
            control: ControlStack::new(),
            input,
            output,
            stats,
        }
    }

    /// Run until the source is exhausted.
    ///
    /// A program that never terminates never returns.
    pub fn run(&mut self) -> Result<&RunStats> {
        debug!(config = ?self.config, "run started");
        while self.step()? {}

        let open = self.control.depth();
        if open > 0 {
            warn!(open, "source ended with unclosed loops");
        }
        self.stats.unclosed_loops = open;
        self.stats.max_loop_depth = self.control.max_depth();
        debug!(
            fetched = self.stats.fetched,
            cells = self.tape.capacity(),
            compactions = self.stats.compactions,
            "run finished"
        );
        Ok(&self.stats)
    }

    /// Execute one token. Returns `false` at end of program.
    pub fn step(&mut self) -> Result<bool> {
        let skipping = self.control.is_skipping();
        let Some(token) = self.cache.current()? else {
            return Ok(false);
        };
        self.stats.fetched += 1;
        self.stats.peak_cache_len = self.stats.peak_cache_len.max(self.cache.len());

        let instruction = token.instruction();
        if skipping && !instruction.is_bracket() {
            self.stats.skipped += 1;
            self.cache.advance();
            return Ok(true);
        }

        self.stats.dispatched += 1;
        match instruction {
            Instruction::MoveRight => {
                if self.tape.move_right() {
                    self.stats.peak_cells = self.tape.capacity();
                }
            }
            Instruction::MoveLeft => {
                self.tape.move_left().map_err(|_| Error::TapeUnderflow {
                    position: self.cache.absolute_position(),
                    location: token.location,
                })?;
            }
            Instruction::Increment => self.tape.increment(),
            Instruction::Decrement => self.tape.decrement(),
            Instruction::Output => {
                self.output.write_all(&[self.tape.read()])?;
                self.output.flush()?;
                self.stats.bytes_written += 1;
            }
            Instruction::Input => self.input_byte()?,
            Instruction::LoopOpen => self.control.open(self.cache.position(), self.tape.read()),
            Instruction::LoopClose => {
                if self.close_loop(&token)? {
                    return Ok(true);
                }
            }
            Instruction::Comment => {}
        }

        self.cache.advance();
        self.maybe_compact();
        Ok(true)
    }

    /// Returns true if the read position was rewound.
    fn close_loop(&mut self, token: &Token) -> Result<bool> {
        match self.control.close() {
            None => Err(Error::UnbalancedClose {
                position: self.cache.absolute_position(),
                location: token.location,
            }),
            Some(Close::Exit) => Ok(false),
            Some(Close::Repeat(entry)) => {
                self.cache.rewind(entry);
                Ok(true)
            }
        }
    }

    fn input_byte(&mut self) -> Result<()> {
        let mut buf = [0u8; 1];
        let read = loop {
            match self.input.read(&mut buf) {
                Ok(n) => break n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        };

        if read == 1 {
            self.tape.write(buf[0]);
            self.stats.bytes_read += 1;
            return Ok(());
        }

        self.stats.eof_reads += 1;
        match self.config.eof {
            EofPolicy::Unchanged => {}
            EofPolicy::Zero => self.tape.write(0),
            EofPolicy::Max => self.tape.write(u8::MAX),
        }
        Ok(())
    }

    /// Discard the consumed prefix of the instruction cache. Only safe with
    /// no loop open: nothing can rewind past the current position then.
    fn maybe_compact(&mut self) {
        let Some(threshold) = self.config.compact_threshold else {
            return;
        };
        if self.control.is_empty() && self.cache.position() > threshold {
            self.cache.compact();
            self.stats.compactions += 1;
        }
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn output(&self) -> &O {
        &self.output
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    pub fn control(&self) -> &ControlStack {
        &self.control
    }

    pub fn cache(&self) -> &InstructionCache<S> {
        &self.cache
    }

    pub fn into_output(self) -> O {
        self.output
    }
}

/// Everything observable after an in-memory run.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub output: Vec<u8>,
    pub tape: Tape,
    pub stats: RunStats,
}

/// Run `program` against an in-memory input, collecting its output.
pub fn execute(program: &[u8], input: &[u8], config: EngineConfig) -> Result<Outcome> {
    let mut engine = Engine::new(program, input, Vec::new(), config);
    let stats = engine.run()?.clone();
    let tape = engine.tape().clone();
    Ok(Outcome {
        output: engine.into_output(),
        tape,
        stats,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(program: &str) -> Outcome {
        execute(program.as_bytes(), b"", EngineConfig::default()).unwrap()
    }

    fn run_with_input(program: &str, input: &[u8], eof: EofPolicy) -> Outcome {
        let config = EngineConfig {
            eof,
            ..Default::default()
        };
        execute(program.as_bytes(), input, config).unwrap()
    }

    #[test]
    fn test_increment_then_output() {
        let outcome = run("+++.");
        assert_eq!(outcome.output, vec![3]);
    }

    #[test]
    fn test_clear_loop_terminates() {
        let outcome = run("++++[-]");
        assert!(outcome.output.is_empty());
        assert_eq!(outcome.tape.cells()[0], 0);
        assert_eq!(outcome.tape.cursor(), 0);
    }

    #[test]
    fn test_nested_skip_leaves_tape_untouched() {
        let outcome = run("[[+]+]");
        assert!(outcome.output.is_empty());
        assert!(outcome.tape.cells().iter().all(|&c| c == 0));
        assert_eq!(outcome.tape.cursor(), 0);
        assert_eq!(outcome.stats.skipped, 2);
        assert_eq!(outcome.stats.unclosed_loops, 0);
    }

    #[test]
    fn test_multiplication_loop() {
        let outcome = run("++++++++[>++++++++<-]>.");
        assert_eq!(outcome.output, vec![64]);
        assert_eq!(outcome.tape.cells()[0], 0);
        assert_eq!(outcome.tape.cells()[1], 64);
        assert_eq!(outcome.tape.cursor(), 1);
    }

    #[test]
    fn test_nested_loops_execute() {
        // 3 * (2 * 4) = 24, via an inner loop that runs inside an outer one.
        let outcome = run("+++[>++[>++++<-]<-]>>.");
        assert_eq!(outcome.output, vec![24]);
        assert_eq!(outcome.stats.max_loop_depth, 2);
    }

    #[test]
    fn test_loop_at_program_start_rewinds_to_zero() {
        let outcome = run("[]+[-]+.");
        assert_eq!(outcome.output, vec![1]);
    }

    #[test]
    fn test_hello_world() {
        let program = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";
        let outcome = run(program);
        assert_eq!(outcome.output, b"Hello World!\n");
    }

    #[test]
    fn test_whitespace_and_comments_ignored() {
        let outcome = run("add three: + +\n\t+ then print .");
        assert_eq!(outcome.output, vec![3]);
    }

    #[test]
    fn test_decrement_wraps() {
        let outcome = run("-.");
        assert_eq!(outcome.output, vec![255]);
    }

    #[test]
    fn test_tape_grows_past_initial_cells() {
        let config = EngineConfig {
            initial_cells: 2,
            ..Default::default()
        };
        let outcome = execute(b">>>>+", b"", config).unwrap();
        assert_eq!(outcome.tape.capacity(), 8);
        assert_eq!(outcome.tape.cells()[4], 1);
        assert_eq!(outcome.stats.peak_cells, 8);
    }

    #[test]
    fn test_input_copies_bytes() {
        let outcome = run_with_input(",.>,.", b"hi", EofPolicy::Unchanged);
        assert_eq!(outcome.output, b"hi");
        assert_eq!(outcome.stats.bytes_read, 2);
    }

    #[test]
    fn test_cat_until_eof_zero() {
        let outcome = run_with_input(",[.,]", b"abc", EofPolicy::Zero);
        assert_eq!(outcome.output, b"abc");
        assert_eq!(outcome.stats.eof_reads, 1);
    }

    #[test]
    fn test_eof_unchanged_keeps_cell() {
        let outcome = run_with_input("+++++,.", b"", EofPolicy::Unchanged);
        assert_eq!(outcome.output, vec![5]);
    }

    #[test]
    fn test_eof_max_writes_255() {
        let outcome = run_with_input("+,.", b"", EofPolicy::Max);
        assert_eq!(outcome.output, vec![255]);
    }

    #[test]
    fn test_unbalanced_close_is_reported() {
        let err = execute(b"+\n +]", b"", EngineConfig::default()).unwrap_err();
        match err {
            Error::UnbalancedClose { position, location } => {
                assert_eq!(position, 2);
                assert_eq!(location.line, 2);
                assert_eq!(location.column, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unbalanced_close_message() {
        let err = execute(b"]", b"", EngineConfig::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "unbalanced loop close at position 0 (line 1, column 1)"
        );
    }

    #[test]
    fn test_unbalanced_close_position_survives_compaction() {
        let mut program = "+".repeat(150);
        program.push(']');
        let err = execute(program.as_bytes(), b"", EngineConfig::default()).unwrap_err();
        assert!(matches!(err, Error::UnbalancedClose { position: 150, .. }));
    }

    #[test]
    fn test_move_left_of_zero_is_fatal() {
        let err = execute(b"+<", b"", EngineConfig::default()).unwrap_err();
        assert!(matches!(err, Error::TapeUnderflow { position: 1, .. }));
    }

    #[test]
    fn test_move_left_inside_skipped_loop_is_harmless() {
        let outcome = run("[<<<]+.");
        assert_eq!(outcome.output, vec![1]);
    }

    #[test]
    fn test_unclosed_loop_ends_quietly() {
        let outcome = run("+[+.");
        assert_eq!(outcome.output, vec![2]);
        assert_eq!(outcome.stats.unclosed_loops, 1);
    }

    #[test]
    fn test_compaction_bounds_cache() {
        let program = ".".repeat(1000);
        let outcome = run(&program);
        assert_eq!(outcome.output.len(), 1000);
        assert!(outcome.stats.peak_cache_len <= DEFAULT_COMPACT_THRESHOLD + 1);
        assert!(outcome.stats.compactions >= 9);
    }

    #[test]
    fn test_no_compaction_while_loop_open() {
        // The loop body alone is longer than the threshold.
        let body = ">".repeat(150) + &"<".repeat(150);
        let program = format!("++[{body}-]+.");
        let outcome = run(&program);
        assert_eq!(outcome.output, vec![1]);
        assert_eq!(outcome.tape.cursor(), 0);
    }

    #[test]
    fn test_compaction_disabled_keeps_everything() {
        let config = EngineConfig {
            compact_threshold: None,
            ..Default::default()
        };
        let outcome = execute(".".repeat(300).as_bytes(), b"", config).unwrap();
        assert_eq!(outcome.stats.compactions, 0);
        assert_eq!(outcome.stats.peak_cache_len, 300);
    }

    #[test]
    fn test_step_reports_end_of_program() {
        let mut engine = Engine::new(&b"+"[..], &b""[..], Vec::new(), EngineConfig::default());
        assert!(engine.step().unwrap());
        assert!(!engine.step().unwrap());
        assert_eq!(engine.tape().read(), 1);
        assert!(engine.control().is_empty());
        assert_eq!(engine.cache().len(), 1);
    }

    #[test]
    fn test_eof_policy_parses() {
        assert_eq!("unchanged".parse::<EofPolicy>(), Ok(EofPolicy::Unchanged));
        assert_eq!("zero".parse::<EofPolicy>(), Ok(EofPolicy::Zero));
        assert_eq!("255".parse::<EofPolicy>(), Ok(EofPolicy::Max));
        assert!("minus-one".parse::<EofPolicy>().is_err());
    }
}
