//! Character sources and sinks for the `in` and `out` instructions.

use std::collections::VecDeque;
use std::io::{self, BufRead, Read, Write};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

/// Source polled by `in`. `None` means no character is available right now;
/// the instruction then leaves its destination untouched.
pub trait CharInput {
    fn read_char(&mut self) -> Option<u8>;
}

/// Sink fed by `out`, one code point per call.
pub trait CharOutput {
    fn write_char(&mut self, code: u16);
}

/// Map an emitted value to the character printed for it. Values that are not
/// Unicode scalar values (the surrogate range) become U+FFFD.
pub fn code_point_to_char(code: u16) -> char {
    char::from_u32(code as u32).unwrap_or(char::REPLACEMENT_CHARACTER)
}

/// Input that never has a character.
#[derive(Debug, Default)]
pub struct NoInput;

impl CharInput for NoInput {
    fn read_char(&mut self) -> Option<u8> {
        None
    }
}

/// In-memory queue of pending characters.
#[derive(Debug, Default, Clone)]
pub struct QueuedInput {
    queue: VecDeque<u8>,
}

impl QueuedInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&mut self, text: &str) {
        self.queue.extend(text.bytes());
    }

    pub fn push_bytes(&mut self, bytes: &[u8]) {
        self.queue.extend(bytes.iter().copied());
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }
}

impl From<&str> for QueuedInput {
    fn from(text: &str) -> Self {
        let mut input = Self::new();
        input.push_str(text);
        input
    }
}

impl CharInput for QueuedInput {
    fn read_char(&mut self) -> Option<u8> {
        self.queue.pop_front()
    }
}

/// Blocking reader: waits for the next byte and reports `None` only once the
/// underlying stream is exhausted or fails.
pub struct ReaderInput<R> {
    reader: R,
}

impl<R: BufRead> ReaderInput<R> {
    pub fn new(reader: R) -> Self {
        Self { reader }
    }
}

impl<R: BufRead> CharInput for ReaderInput<R> {
    fn read_char(&mut self) -> Option<u8> {
        let mut byte = [0u8; 1];
        loop {
            match self.reader.read(&mut byte) {
                Ok(0) => return None,
                Ok(_) => return Some(byte[0]),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => return None,
            }
        }
    }
}

/// Non-blocking stdin: a background thread forwards bytes over a channel and
/// `read_char` only takes what has already arrived.
pub struct PollingStdin {
    rx: Receiver<u8>,
    closed: bool,
}

impl PollingStdin {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let stdin = io::stdin();
            for byte in stdin.lock().bytes() {
                let Ok(byte) = byte else { break };
                if tx.send(byte).is_err() {
                    break;
                }
            }
        });
        Self { rx, closed: false }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl CharInput for PollingStdin {
    fn read_char(&mut self) -> Option<u8> {
        match self.rx.try_recv() {
            Ok(byte) => Some(byte),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => {
                self.closed = true;
                None
            }
        }
    }
}

/// Replays a fixed script first, then falls through to `inner`.
pub struct ScriptedInput<I> {
    script: QueuedInput,
    inner: I,
}

impl<I: CharInput> ScriptedInput<I> {
    pub fn new(script: QueuedInput, inner: I) -> Self {
        Self { script, inner }
    }
}

impl<I: CharInput> CharInput for ScriptedInput<I> {
    fn read_char(&mut self) -> Option<u8> {
        self.script.read_char().or_else(|| self.inner.read_char())
    }
}

impl<T: CharInput + ?Sized> CharInput for Box<T> {
    fn read_char(&mut self) -> Option<u8> {
        (**self).read_char()
    }
}

/// Collects emitted code points.
#[derive(Debug, Default, Clone)]
pub struct BufferOutput {
    codes: Vec<u16>,
}

impl BufferOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn codes(&self) -> &[u16] {
        &self.codes
    }

    pub fn text(&self) -> String {
        self.codes.iter().copied().map(code_point_to_char).collect()
    }
}

impl CharOutput for BufferOutput {
    fn write_char(&mut self, code: u16) {
        self.codes.push(code);
    }
}

/// Writes UTF-8 encoded characters to any `Write`, flushing at each newline.
/// The first write error is kept and later writes are dropped.
pub struct WriterOutput<W: Write> {
    writer: W,
    error: Option<io::Error>,
}

impl<W: Write> WriterOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            error: None,
        }
    }

    pub fn take_error(&mut self) -> Option<io::Error> {
        self.error.take()
    }

    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn emit(&mut self, ch: char) -> io::Result<()> {
        let mut buf = [0u8; 4];
        self.writer.write_all(ch.encode_utf8(&mut buf).as_bytes())?;
        if ch == '\n' {
            self.writer.flush()?;
        }
        Ok(())
    }
}

impl<W: Write> CharOutput for WriterOutput<W> {
    fn write_char(&mut self, code: u16) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.emit(code_point_to_char(code)) {
            self.error = Some(err);
        }
    }
}
