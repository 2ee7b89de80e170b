//! Stdout writer - JSON lines output
//!
//! Writes every record as one JSON object per line. Records that hold valid
//! JSON are embedded as-is, so a quoted `"123"` stays a string and a bare
//! `123` is a number. Anything else is written as a UTF-8 string (lossy).
//!
//! # Example Output
//!
//! ```text
//! {"namespace":"app","name":"users","data":{"id":1}}
//! {"namespace":null,"name":"events","data":"plain text"}
//! ```

use std::io::{self, Write};

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;
use spool_buffer::{Batch, StreamDescriptor};
use spool_pipeline::{WriteError, Writer};

use crate::common::DEFAULT_BATCH_SIZE_BYTES;


/// One output line
#[derive(Serialize)]
struct Line<'a> {
    namespace: Option<&'a str>,
    name: &'a str,
    data: Value,
}

/// Writer that prints JSON lines to any `io::Write` target
pub struct StdoutWriter<O = io::Stdout> {
    output: Mutex<O>,
    batch_size_bytes: u64,
}

impl StdoutWriter<io::Stdout> {
    /// Write to the process's stdout
    pub fn new() -> Self {
        Self::with_output(io::stdout(), DEFAULT_BATCH_SIZE_BYTES)
    }
}

impl Default for StdoutWriter<io::Stdout> {
    fn default() -> Self {
        Self::new()
    }
}

impl<O: Write + Send + 'static> StdoutWriter<O> {
    /// Write to `output`, asking for `batch_size_bytes` per flush
    pub fn with_output(output: O, batch_size_bytes: u64) -> Self {
        Self {
            output: Mutex::new(output),
            batch_size_bytes: batch_size_bytes.max(1),
        }
    }

    /// Change the preferred batch size
    pub fn with_batch_size(mut self, batch_size_bytes: u64) -> Self {
        self.batch_size_bytes = batch_size_bytes.max(1);
        self
    }

    /// Consume the writer and return its output
    pub fn into_output(self) -> O {
        self.output.into_inner()
    }

    /// Render the whole batch before touching the output so a bad record
    /// cannot leave half a batch written
    fn render(stream: &StreamDescriptor, batch: &Batch) -> Result<Vec<u8>, WriteError> {
        let mut rendered = Vec::with_capacity(batch.size_bytes() as usize + batch.len() * 48);

        for record in batch {
            let data = match serde_json::from_slice::<Value>(record.data()) {
                Ok(value) => value,
                Err(_) => Value::String(String::from_utf8_lossy(record.data()).into_owned()),
            };

            let line = Line {
                namespace: stream.namespace(),
                name: stream.name(),
                data,
            };

            serde_json::to_writer(&mut rendered, &line)
                .map_err(|e| WriteError::Serialization(e.to_string()))?;
            rendered.push(b'\n');
        }

        Ok(rendered)
    }
}

impl<O: Write + Send + 'static> Writer for StdoutWriter<O> {
    fn name(&self) -> &'static str {
        "stdout"
    }

    fn optimal_batch_size_bytes(&self) -> u64 {
        self.batch_size_bytes
    }

    async fn flush(&self, stream: &StreamDescriptor, batch: &Batch) -> Result<(), WriteError> {
        let rendered = Self::render(stream, batch)?;

        let mut output = self.output.lock();
        output.write_all(&rendered)?;
        output.flush()?;
        Ok(())
    }
}
