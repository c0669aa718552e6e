//! Record Source: a line cursor shared by every producer.

use crate::error::SourceError;
use crate::sync::{lock, Mutex};
use std::io::BufRead;
use std::iter::Fuse;
use tracing::warn;

/// A sequence of raw input lines that producers claim one at a time.
///
/// Implementations must hand each line to exactly one caller and, once
/// exhausted, keep returning `Ok(None)`.
pub trait LineSource: Send + Sync {
    /// Claims the next unread line, or returns `Ok(None)` when input is consumed.
    fn next_line(&self) -> Result<Option<String>, SourceError>;
}

/// A [`LineSource`] over any line iterator, guarded by a single mutex.
///
/// The lock is held only for the `next()` call on the wrapped iterator;
/// parsing happens in the caller, outside the critical section.
pub struct SharedLines<I: Iterator> {
    cursor: Mutex<Cursor<I>>,
}

struct Cursor<I: Iterator> {
    lines: Fuse<I>,
    claimed: usize,
}

impl<I> SharedLines<I>
where
    I: Iterator<Item = String>,
{
    /// Wraps an iterator of lines.
    pub fn new<T>(lines: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            cursor: Mutex::new(Cursor {
                lines: lines.into_iter().fuse(),
                claimed: 0,
            }),
        }
    }

    /// Number of lines handed out so far.
    pub fn claimed(&self) -> usize {
        lock(&self.cursor).claimed
    }
}

impl SharedLines<std::vec::IntoIter<String>> {
    /// An in-memory source.
    pub fn from_vec(lines: Vec<String>) -> Self {
        Self::new(lines)
    }
}

impl<I> LineSource for SharedLines<I>
where
    I: Iterator<Item = String> + Send,
{
    fn next_line(&self) -> Result<Option<String>, SourceError> {
        let mut cursor = lock(&self.cursor);
        let Some(line) = cursor.lines.next() else {
            return Ok(None);
        };
        cursor.claimed += 1;
        Ok(Some(line))
    }
}

/// A [`LineSource`] reading `\n`-terminated lines from a reader (a file,
/// a socket, stdin).
///
/// Lines are split on raw bytes, so invalid UTF-8 only spoils the line it
/// appears in: that claim fails with [`SourceError::InvalidUtf8`] and the
/// next claim continues with the following line. An I/O error is returned
/// once, after which the source is exhausted.
pub struct ReaderSource<R> {
    state: Mutex<ReaderState<R>>,
}

struct ReaderState<R> {
    reader: R,
    buf: Vec<u8>,
    claimed: usize,
    done: bool,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            state: Mutex::new(ReaderState {
                reader,
                buf: Vec::new(),
                claimed: 0,
                done: false,
            }),
        }
    }

    /// Number of lines handed out so far, including ones that failed to decode.
    pub fn claimed(&self) -> usize {
        lock(&self.state).claimed
    }
}

impl<R: BufRead + Send> LineSource for ReaderSource<R> {
    fn next_line(&self) -> Result<Option<String>, SourceError> {
        let mut guard = lock(&self.state);
        let state = &mut *guard;
        if state.done {
            return Ok(None);
        }

        state.buf.clear();
        match state.reader.read_until(b'\n', &mut state.buf) {
            Ok(0) => {
                state.done = true;
                Ok(None)
            }
            Ok(_) => {
                state.claimed += 1;
                strip_line_ending(&mut state.buf);
                match String::from_utf8(std::mem::take(&mut state.buf)) {
                    Ok(line) => Ok(Some(line)),
                    Err(err) => Err(SourceError::InvalidUtf8 {
                        line: state.claimed,
                        lossy: String::from_utf8_lossy(err.as_bytes()).into_owned(),
                    }),
                }
            }
            Err(source) => {
                warn!(claimed = state.claimed, error = %source, "read error, input exhausted");
                state.done = true;
                Err(SourceError::Io {
                    claimed: state.claimed,
                    source,
                })
            }
        }
    }
}

fn strip_line_ending(buf: &mut Vec<u8>) {
    if buf.last() == Some(&b'\n') {
        buf.pop();
        if buf.last() == Some(&b'\r') {
            buf.pop();
        }
    }
}
