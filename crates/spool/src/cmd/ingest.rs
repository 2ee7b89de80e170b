//! NDJSON ingestion
//!
//! Each input line is one record:
//!
//! ```text
//! {"namespace": "app", "name": "users", "data": {"id": 1}}
//! {"name": "events", "data": "plain text"}
//! ```
//!
//! `data` is stored in its compact serialized form, strings included, so a
//! writer that decodes JSON gets back the same value and type. Malformed lines
//! are logged and skipped.

use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;
use spool_buffer::{BufferError, Record, StreamBuffer, StreamDescriptor};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tracing::{debug, warn};

/// One input line
#[derive(Debug, Deserialize)]
struct InputLine {
    #[serde(default)]
    namespace: Option<String>,
    name: String,
    data: Value,
}

impl InputLine {
    fn into_parts(self) -> Result<(StreamDescriptor, Record)> {
        let stream = StreamDescriptor::from_parts(self.namespace.as_deref(), &self.name);
        let record = Record::from(serde_json::to_vec(&self.data)?);
        Ok((stream, record))
    }
}

/// Ingestion totals
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub records: u64,
    pub bytes: u64,
    pub malformed: u64,
}

/// Parse one line; `None` for blank lines
fn parse_line(line: &str) -> Option<Result<(StreamDescriptor, Record)>> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }

    Some(
        serde_json::from_str::<InputLine>(line)
            .map_err(anyhow::Error::from)
            .and_then(InputLine::into_parts),
    )
}

/// Read `reader` to EOF, enqueueing every record
///
/// Waits whenever the buffer is full. Stops early if the buffer is closed.
pub async fn ingest<R>(reader: R, buffer: &StreamBuffer) -> Result<IngestStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut stats = IngestStats::default();
    let mut line_number = 0u64;

    while let Some(line) = lines.next_line().await? {
        line_number += 1;

        let (stream, record) = match parse_line(&line) {
            None => continue,
            Some(Ok(parsed)) => parsed,
            Some(Err(e)) => {
                stats.malformed += 1;
                warn!(line = line_number, error = %e, "skipping malformed input line");
                continue;
            }
        };

        let size = record.size_bytes();
        match buffer.enqueue(&stream, record).await {
            Ok(()) => {
                stats.records += 1;
                stats.bytes += size;
            }
            Err(BufferError::Closed) => {
                debug!(line = line_number, "buffer closed, stopping ingestion");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_object_data() {
        let (stream, record) =
            parse_line(r#"{"namespace":"app","name":"users","data":{"id":1}}"#)
                .unwrap()
                .unwrap();

        assert_eq!(stream, StreamDescriptor::new("app", "users"));
        assert_eq!(record.data().as_ref(), br#"{"id":1}"#);
    }

    #[test]
    fn test_parse_string_data_keeps_quotes() {
        let (stream, record) = parse_line(r#"{"name":"events","data":"plain text"}"#)
            .unwrap()
            .unwrap();

        assert_eq!(stream, StreamDescriptor::unqualified("events"));
        assert_eq!(record.data().as_ref(), br#""plain text""#);
    }

    #[test]
    fn test_numeric_string_stays_a_string() {
        let (_, record) = parse_line(r#"{"name":"events","data":"123"}"#)
            .unwrap()
            .unwrap();
        assert_eq!(record.data().as_ref(), br#""123""#);

        let decoded: Value = serde_json::from_slice(record.data()).unwrap();
        assert_eq!(decoded, Value::String("123".into()));

        let (_, record) = parse_line(r#"{"name":"events","data":123}"#)
            .unwrap()
            .unwrap();
        assert_eq!(record.data().as_ref(), b"123");
    }

    #[test]
    fn test_parse_blank_and_malformed() {
        assert!(parse_line("   ").is_none());
        assert!(parse_line("not json").unwrap().is_err());
        assert!(parse_line(r#"{"data":1}"#).unwrap().is_err());
    }

    #[tokio::test]
    async fn test_ingest_enqueues_and_skips_bad_lines() {
        let input = concat!(
            "{\"namespace\":\"app\",\"name\":\"users\",\"data\":{\"id\":1}}\n",
            "garbage\n",
            "\n",
            "{\"namespace\":\"app\",\"name\":\"users\",\"data\":{\"id\":2}}\n",
            "{\"name\":\"events\",\"data\":\"hello\"}\n",
        );
        let buffer = StreamBuffer::default();

        let stats = ingest(input.as_bytes(), &buffer).await.unwrap();

        assert_eq!(stats.records, 3);
        assert_eq!(stats.malformed, 1);
        // "hello" keeps its quotes
        assert_eq!(stats.bytes, 8 + 8 + 7);
        assert_eq!(
            buffer.queue_size_records(&StreamDescriptor::new("app", "users")),
            2
        );
        assert_eq!(
            buffer.queue_size_records(&StreamDescriptor::unqualified("events")),
            1
        );
    }

    #[tokio::test]
    async fn test_ingest_stops_when_buffer_closed() {
        let buffer = StreamBuffer::default();
        buffer.close();

        let stats = ingest("{\"name\":\"a\",\"data\":1}\n".as_bytes(), &buffer)
            .await
            .unwrap();

        assert_eq!(stats.records, 0);
        assert_eq!(buffer.total_size_bytes(), 0);
    }
}
