//! Console abstraction for program and debugger I/O.
//!
//! The machine never touches stdin/stdout directly. Hosts hand it a
//! [`Console`]; the CLI uses [`StdConsole`], tests and graders use
//! [`ScriptedConsole`].

use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use super::InterruptHandle;

/// Result of a blocking console read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// A line of input, without its terminator.
    Line(String),
    /// Input is exhausted.
    EndOfInput,
    /// The operator interrupted the read.
    Interrupted,
}

/// Line-oriented console used by `read`, `write` and the debugger.
pub trait Console {
    /// Writes text without a trailing newline.
    ///
    /// # Errors
    ///
    /// Propagates host output failures.
    fn write(&mut self, text: &str) -> io::Result<()>;

    /// Blocks for one line of input.
    ///
    /// # Errors
    ///
    /// Propagates host input failures other than interruption.
    fn read_line(&mut self) -> io::Result<ConsoleInput>;

    /// Writes `text` followed by a newline.
    ///
    /// # Errors
    ///
    /// Propagates host output failures.
    fn write_line(&mut self, text: &str) -> io::Result<()> {
        self.write(text)?;
        self.write("\n")
    }

    /// Writes a prompt, then blocks for a line.
    ///
    /// # Errors
    ///
    /// Propagates host I/O failures.
    fn prompt(&mut self, text: &str) -> io::Result<ConsoleInput> {
        self.write(text)?;
        self.read_line()
    }
}

/// How often a blocked read checks for an operator interrupt.
const INTERRUPT_POLL: Duration = Duration::from_millis(50);

type LineResult = io::Result<Option<String>>;

/// Console bound to the process's stdin and stdout.
///
/// Stdin is read on a helper thread so that a read blocked on the
/// terminal still observes the interrupt handle and returns
/// [`ConsoleInput::Interrupted`].
#[derive(Debug, Default)]
pub struct StdConsole {
    interrupt: InterruptHandle,
    lines: Option<Receiver<LineResult>>,
}

impl StdConsole {
    /// Creates a console over the process streams.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a console whose reads give up once `interrupt` fires.
    #[must_use]
    pub const fn with_interrupt(interrupt: InterruptHandle) -> Self {
        Self {
            interrupt,
            lines: None,
        }
    }

    #[cfg(test)]
    fn from_receiver(interrupt: InterruptHandle, lines: Receiver<LineResult>) -> Self {
        Self {
            interrupt,
            lines: Some(lines),
        }
    }
}

impl Console for StdConsole {
    fn write(&mut self, text: &str) -> io::Result<()> {
        let mut out = io::stdout().lock();
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    fn read_line(&mut self) -> io::Result<ConsoleInput> {
        if self.interrupt.is_interrupted() {
            return Ok(ConsoleInput::Interrupted);
        }
        let lines = self.lines.get_or_insert_with(spawn_stdin_reader);
        loop {
            match lines.recv_timeout(INTERRUPT_POLL) {
                Ok(Ok(Some(line))) => return Ok(ConsoleInput::Line(line)),
                Ok(Ok(None)) | Err(RecvTimeoutError::Disconnected) => {
                    return Ok(if self.interrupt.is_interrupted() {
                        ConsoleInput::Interrupted
                    } else {
                        ConsoleInput::EndOfInput
                    });
                }
                Ok(Err(e)) => return Err(e),
                Err(RecvTimeoutError::Timeout) => {
                    if self.interrupt.is_interrupted() {
                        return Ok(ConsoleInput::Interrupted);
                    }
                }
            }
        }
    }
}

/// Forwards stdin lines until end of input, an error, or a dropped console.
fn spawn_stdin_reader() -> Receiver<LineResult> {
    let (sender, receiver) = mpsc::channel();
    thread::spawn(move || {
        let stdin = io::stdin();
        loop {
            let mut line = String::new();
            let item = match stdin.lock().read_line(&mut line) {
                Ok(0) => Ok(None),
                Ok(_) => Ok(Some(line.trim_end_matches(['\n', '\r']).to_string())),
                Err(e) => Err(e),
            };
            let done = !matches!(item, Ok(Some(_)));
            if sender.send(item).is_err() || done {
                break;
            }
        }
    });
    receiver
}

/// Console that replays a fixed script and records everything written.
#[derive(Debug, Clone, Default)]
pub struct ScriptedConsole {
    input: VecDeque<ConsoleInput>,
    output: String,
}

impl ScriptedConsole {
    /// Creates a console that will answer reads with `lines` in order.
    #[must_use]
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            input: lines
                .into_iter()
                .map(|l| ConsoleInput::Line(l.into()))
                .collect(),
            output: String::new(),
        }
    }

    /// Queues another input line.
    pub fn push_line(&mut self, line: impl Into<String>) {
        self.input.push_back(ConsoleInput::Line(line.into()));
    }

    /// Queues an operator interrupt.
    pub fn push_interrupt(&mut self) {
        self.input.push_back(ConsoleInput::Interrupted);
    }

    /// Everything written so far.
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Written output split into lines, with blank lines dropped.
    #[must_use]
    pub fn output_lines(&self) -> Vec<&str> {
        self.output
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect()
    }

    /// Number of unread input entries.
    #[must_use]
    pub fn remaining_input(&self) -> usize {
        self.input.len()
    }
}

impl Console for ScriptedConsole {
    fn write(&mut self, text: &str) -> io::Result<()> {
        self.output.push_str(text);
        Ok(())
    }

    fn read_line(&mut self) -> io::Result<ConsoleInput> {
        Ok(self.input.pop_front().unwrap_or(ConsoleInput::EndOfInput))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_console_replays_then_reports_end_of_input() {
        let mut console = ScriptedConsole::new(["1", "2"]);
        console.push_interrupt();
        assert_eq!(console.read_line().unwrap(), ConsoleInput::Line("1".into()));
        assert_eq!(
            console.prompt("? ").unwrap(),
            ConsoleInput::Line("2".into())
        );
        assert_eq!(console.read_line().unwrap(), ConsoleInput::Interrupted);
        assert_eq!(console.read_line().unwrap(), ConsoleInput::EndOfInput);
        assert_eq!(console.output(), "? ");
    }

    #[test]
    fn std_console_forwards_lines_then_end_of_input() {
        let (sender, receiver) = mpsc::channel();
        let mut console = StdConsole::from_receiver(InterruptHandle::new(), receiver);
        sender.send(Ok(Some("42".to_string()))).unwrap();
        sender.send(Ok(None)).unwrap();
        assert_eq!(console.read_line().unwrap(), ConsoleInput::Line("42".into()));
        assert_eq!(console.read_line().unwrap(), ConsoleInput::EndOfInput);
    }

    #[test]
    fn blocked_std_read_returns_on_interrupt() {
        let (_sender, receiver) = mpsc::channel::<LineResult>();
        let interrupt = InterruptHandle::new();
        let mut console = StdConsole::from_receiver(interrupt.clone(), receiver);

        let operator = thread::spawn(move || {
            thread::sleep(Duration::from_millis(120));
            interrupt.interrupt();
        });
        assert_eq!(console.read_line().unwrap(), ConsoleInput::Interrupted);
        operator.join().unwrap();
    }

    #[test]
    fn interrupted_std_console_does_not_read() {
        let interrupt = InterruptHandle::new();
        interrupt.interrupt();
        let mut console = StdConsole::with_interrupt(interrupt);
        assert_eq!(console.read_line().unwrap(), ConsoleInput::Interrupted);
        assert!(console.lines.is_none());
    }

    #[test]
    fn output_lines_skip_blank_lines() {
        let mut console = ScriptedConsole::default();
        console.write_line("8").unwrap();
        console.write_line("").unwrap();
        console.write_line("-3").unwrap();
        assert_eq!(console.output_lines(), vec!["8", "-3"]);
    }
}
