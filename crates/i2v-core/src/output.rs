//! JSON and JSON Lines output for estimation results.
//!
//! Batch results are written with their position in the batch so that
//! JSONL consumers can join them back to the input images.

use serde::Serialize;
use std::io::{self, Write};

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Single JSON document
    Json,
    /// One JSON object per line (newline-delimited JSON)
    JsonLines,
}

impl OutputFormat {
    /// Parse format from string (case-insensitive).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Some(Self::JsonLines),
            _ => None,
        }
    }
}

/// One result tagged with the index of the image it belongs to.
#[derive(Debug, Serialize)]
pub struct IndexedRecord<'a, T> {
    /// Position of the image in the input batch
    pub index: usize,
    pub result: &'a T,
}

/// Serializes estimation results to an underlying writer.
pub struct OutputWriter<W: Write> {
    writer: W,
    format: OutputFormat,
    pretty: bool,
    items_written: usize,
}

impl<W: Write> OutputWriter<W> {
    /// Create a new output writer.
    ///
    /// `pretty` only affects [`OutputFormat::Json`]; JSON Lines output is
    /// always compact.
    pub fn new(writer: W, format: OutputFormat, pretty: bool) -> Self {
        Self {
            writer,
            format,
            pretty,
            items_written: 0,
        }
    }

    fn write_value<T: Serialize + ?Sized>(&mut self, value: &T) -> io::Result<()> {
        if self.pretty && self.format == OutputFormat::Json {
            serde_json::to_writer_pretty(&mut self.writer, value).map_err(io::Error::other)?;
        } else {
            serde_json::to_writer(&mut self.writer, value).map_err(io::Error::other)?;
        }
        writeln!(self.writer)
    }

    /// Write a single result.
    pub fn write<T: Serialize>(&mut self, item: &T) -> io::Result<()> {
        self.write_value(item)?;
        self.items_written += 1;
        Ok(())
    }

    /// Write the results of one batch call, each paired with its index.
    ///
    /// JSON writes a single array; JSONL writes one record per line.
    pub fn write_batch<T: Serialize>(&mut self, items: &[T]) -> io::Result<()> {
        let records: Vec<IndexedRecord<'_, T>> = items
            .iter()
            .enumerate()
            .map(|(index, result)| IndexedRecord { index, result })
            .collect();

        match self.format {
            OutputFormat::Json => self.write_value(&records)?,
            OutputFormat::JsonLines => {
                for record in &records {
                    self.write_value(record)?;
                }
            }
        }
        self.items_written += records.len();
        tracing::trace!("Wrote {} records", records.len());
        Ok(())
    }

    /// Number of results written so far.
    pub fn items_written(&self) -> usize {
        self.items_written
    }

    /// Flush the underlying writer.
    pub fn flush(&mut self) -> io::Result<()> {
        self.writer.flush()
    }

    /// Consume the writer and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer
    }
}
