//! Line source
//!
//! Splits a byte stream into newline-delimited [`Line`]s. Used for the
//! device read side, and by sessions to split client input into records.
//!
//! A read error is terminal: the source moves to [`SourceState::Failed`]
//! and never touches the underlying reader again.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

use crate::error::{Error, Result};

use super::line::Line;

/// Default maximum record length (64 KiB)
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Lifecycle of a line source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Lines may still be produced
    Open,
    /// The stream ended cleanly
    Ended,
    /// A read failed; no further lines will be produced
    Failed,
}

/// Newline splitter over an async byte stream
pub struct LineSource<R> {
    reader: BufReader<R>,
    buf: Vec<u8>,
    max_line_length: usize,
    state: SourceState,
}

impl<R: AsyncRead + Unpin> LineSource<R> {
    /// Create a source with the default maximum line length
    pub fn new(reader: R) -> Self {
        Self::with_max_line_length(reader, DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a source with a custom maximum line length
    pub fn with_max_line_length(reader: R, max_line_length: usize) -> Self {
        Self {
            reader: BufReader::new(reader),
            buf: Vec::new(),
            max_line_length,
            state: SourceState::Open,
        }
    }

    /// Current state
    pub fn state(&self) -> SourceState {
        self.state
    }

    /// Read the next line
    ///
    /// Returns `Ok(None)` at end of stream. A trailing `\r` is stripped, and
    /// an unterminated final fragment is returned as a line.
    pub async fn next(&mut self) -> Result<Option<Line>> {
        match self.state {
            SourceState::Failed => return Err(Error::SourceFailed),
            SourceState::Ended => return Ok(None),
            SourceState::Open => {}
        }

        match self.read_record().await {
            Ok(Some(line)) => Ok(Some(line)),
            Ok(None) => {
                self.state = SourceState::Ended;
                Ok(None)
            }
            Err(e) => {
                self.state = SourceState::Failed;
                Err(e)
            }
        }
    }

    async fn read_record(&mut self) -> Result<Option<Line>> {
        self.buf.clear();
        // Room for a trailing `\r`, which does not count toward the limit
        let limit = self.max_line_length.saturating_add(1);

        loop {
            let available = self.reader.fill_buf().await?;

            if available.is_empty() {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                return self.take_line().map(Some);
            }

            if let Some(pos) = available.iter().position(|b| *b == b'\n') {
                ensure_within(self.buf.len() + pos, limit, self.max_line_length)?;
                self.buf.extend_from_slice(&available[..pos]);
                self.reader.consume(pos + 1);
                return self.take_line().map(Some);
            }

            let n = available.len();
            ensure_within(self.buf.len() + n, limit, self.max_line_length)?;
            self.buf.extend_from_slice(available);
            self.reader.consume(n);
        }
    }

    fn take_line(&mut self) -> Result<Line> {
        if self.buf.last() == Some(&b'\r') {
            self.buf.pop();
        }
        ensure_within(self.buf.len(), self.max_line_length, self.max_line_length)?;
        Ok(Line::new(&self.buf))
    }
}

fn ensure_within(len: usize, limit: usize, max: usize) -> Result<()> {
    if len > limit {
        return Err(Error::LineTooLong { max });
    }
    Ok(())
}
