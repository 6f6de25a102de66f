//! JSONL writing operations.
//!
//! This module provides async functionality for writing data in JSONL format
//! with efficient buffering.

use crate::{Error, Result};
use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

/// Serializes a value as a single JSONL line, without the trailing newline.
///
/// The serializer never emits raw newline characters (they are escaped inside
/// JSON strings), so the returned string is always safe to write as one line.
///
/// # Errors
///
/// Returns an error if the value fails to serialize, or if it somehow
/// serializes to text containing a newline (a map key with a non-string
/// representation, for example, would fail earlier).
pub fn encode_line<T: Serialize>(value: &T) -> Result<String> {
    let line = serde_json::to_string(value)?;
    if line.contains('\n') {
        return Err(Error::InvalidFormat(
            "serialized record contains an embedded newline".to_string(),
        ));
    }
    Ok(line)
}

/// Async writer for JSONL (JSON Lines) data.
///
/// `JsonlWriter` wraps an async writer and provides buffered writing of JSONL
/// formatted data. Each JSON value is serialized to a single line followed by
/// a newline character.
///
/// # Examples
///
/// ```no_run
/// use gauntlet_jsonl::JsonlWriter;
/// use tokio::fs::File;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let file = File::create("output.jsonl").await?;
/// let writer = JsonlWriter::new(file);
/// # Ok(())
/// # }
/// ```
pub struct JsonlWriter<W> {
    /// Buffered writer wrapping the underlying async writer.
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> JsonlWriter<W> {
    /// Creates a new `JsonlWriter` wrapping the given async writer.
    ///
    /// The writer is wrapped in a [`BufWriter`] to reduce the number of
    /// system calls when writing many small records.
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Writes a single value to the JSONL output.
    ///
    /// The value is serialized to JSON and written as one line followed by a
    /// newline character. The output is buffered; call [`flush`](Self::flush)
    /// to ensure all data reaches the underlying writer.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or an I/O error occurs.
    pub async fn write<T: Serialize>(&mut self, value: &T) -> Result<()> {
        let line = encode_line(value)?;
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }

    /// Writes multiple values to the JSONL output, one line per value.
    ///
    /// # Errors
    ///
    /// Returns an error if any value fails to serialize or an I/O error
    /// occurs. Values written before the failure stay written.
    pub async fn write_all<T, I>(&mut self, values: I) -> Result<()>
    where
        T: Serialize,
        I: IntoIterator<Item = T>,
    {
        for value in values {
            self.write(&value).await?;
        }
        Ok(())
    }

    /// Writes an already-encoded JSONL line, appending the newline.
    ///
    /// The caller is responsible for `line` being a single JSON document
    /// with no embedded newline; [`encode_line`] produces such lines. This
    /// is used when rewriting retained lines during rotation, where records
    /// must be carried over byte-for-byte rather than re-serialized.
    ///
    /// # Errors
    ///
    /// Returns an error if an I/O error occurs while writing.
    pub async fn write_raw_line(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }

    /// Flushes the buffered writer.
    ///
    /// # Errors
    ///
    /// Returns an error if flushing fails due to an I/O error.
    pub async fn flush(&mut self) -> Result<()> {
        self.writer.flush().await?;
        Ok(())
    }

    /// Consumes the writer, returning the underlying buffered writer.
    ///
    /// Note: this does not flush the buffer. Call [`flush`](Self::flush)
    /// first to ensure all data is written.
    #[must_use]
    pub fn into_inner(self) -> BufWriter<W> {
        self.writer
    }
}
