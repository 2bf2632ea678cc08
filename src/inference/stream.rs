//! Relay of Ollama's NDJSON generation stream.
//!
//! The pipeline is three lazy stages: [`ndjson_lines`] splits the response
//! body into lines, [`relay_increments`] turns lines into text increments and
//! [`with_terminal_marker`] converts the result into [`StreamChunk`]s that
//! always finish with exactly one `Done`. Nothing is read from the network
//! until the consumer polls, and dropping the stream drops the body.

use std::{fmt::Display, panic::AssertUnwindSafe, time::Duration};

use async_stream::{stream, try_stream};
use futures::{FutureExt, Stream, StreamExt};
use tracing::{debug, error};

use crate::{
    error::InferenceError,
    inference::types::{StreamChunk, StreamLine},
};

#[derive(Debug, PartialEq)]
pub enum LineOutcome {
    Blank,
    Malformed,
    Parsed(StreamLine),
}

pub fn parse_line(line: &str) -> LineOutcome {
    let line = line.trim();
    if line.is_empty() {
        return LineOutcome::Blank;
    }
    match serde_json::from_str::<StreamLine>(line) {
        Ok(parsed) => LineOutcome::Parsed(parsed),
        Err(_) => LineOutcome::Malformed,
    }
}

/// Longest line accepted from the backend before the stream is failed.
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into newline-terminated lines. Each read waits at most
/// `read_timeout`. A trailing line without a newline is still emitted. Lines
/// longer than [`MAX_LINE_BYTES`] fail the stream.
pub fn ndjson_lines<S, B, E>(
    bytes: S,
    read_timeout: Duration,
) -> impl Stream<Item = Result<String, InferenceError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: Display,
{
    try_stream! {
        futures::pin_mut!(bytes);
        let mut buffer: Vec<u8> = Vec::new();
        // bytes before this offset are known to hold no newline
        let mut scanned = 0;

        loop {
            let next = tokio::time::timeout(read_timeout, bytes.next())
                .await
                .map_err(|_| InferenceError::Timeout {
                    after_secs: read_timeout.as_secs(),
                })?;
            let Some(chunk) = next else {
                break;
            };
            let chunk = chunk.map_err(|e| InferenceError::Stream {
                reason: e.to_string(),
            })?;
            buffer.extend_from_slice(chunk.as_ref());

            while let Some(offset) = buffer[scanned..].iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=scanned + offset).collect();
                scanned = 0;
                yield String::from_utf8_lossy(&line)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
            }
            scanned = buffer.len();

            if buffer.len() > MAX_LINE_BYTES {
                Err::<(), _>(InferenceError::Stream {
                    reason: format!("stream line exceeds {MAX_LINE_BYTES} bytes"),
                })?;
            }
        }

        if !buffer.is_empty() {
            yield String::from_utf8_lossy(&buffer).into_owned();
        }
    }
}

/// Yields the raw `response` text of every parsed line and stops at the first
/// `done: true`. Blank and malformed lines are skipped; `max_malformed` bounds
/// how many malformed lines may arrive back to back.
pub fn relay_increments<S>(
    lines: S,
    max_malformed: Option<usize>,
) -> impl Stream<Item = Result<String, InferenceError>>
where
    S: Stream<Item = Result<String, InferenceError>>,
{
    try_stream! {
        let mut consecutive_malformed = 0usize;

        for await line in lines {
            let line = line?;
            match parse_line(&line) {
                LineOutcome::Blank => continue,
                LineOutcome::Malformed => {
                    consecutive_malformed += 1;
                    debug!(len = line.len(), consecutive_malformed, "skipping malformed stream line");
                    if max_malformed.is_some_and(|limit| consecutive_malformed >= limit) {
                        Err::<(), _>(InferenceError::MalformedStream {
                            count: consecutive_malformed,
                        })?;
                    }
                }
                LineOutcome::Parsed(parsed) => {
                    consecutive_malformed = 0;
                    if let Some(message) = parsed.error {
                        Err::<(), _>(InferenceError::Backend { message })?;
                    }
                    if let Some(text) = parsed.response {
                        yield text;
                    }
                    if parsed.done {
                        break;
                    }
                }
            }
        }
    }
}

/// Maps increments to chunks and appends the terminal `Done`. The first error
/// (or a panic inside `increments`) becomes a single `Error` chunk; `Done`
/// follows on every path.
pub fn with_terminal_marker<S>(increments: S) -> impl Stream<Item = StreamChunk>
where
    S: Stream<Item = Result<String, InferenceError>>,
{
    stream! {
        futures::pin_mut!(increments);

        loop {
            match AssertUnwindSafe(increments.next()).catch_unwind().await {
                Ok(Some(Ok(text))) => {
                    yield StreamChunk::Text(text);
                }
                Ok(None) => break,
                Ok(Some(Err(err))) => {
                    error!(error = %err, "streaming article generation failed");
                    yield StreamChunk::Error(format!("Failed to generate article stream: {err}"));
                    break;
                }
                Err(_) => {
                    error!("streaming article generation panicked");
                    yield StreamChunk::Error(
                        "Failed to generate article stream: internal error".to_string(),
                    );
                    break;
                }
            }
        }

        yield StreamChunk::Done;
    }
}

#[cfg(test)]
mod tests {
    use std::task::Poll;

    use futures::stream;

    use super::*;

    const READ_TIMEOUT: Duration = Duration::from_secs(5);

    fn body(parts: &[&str]) -> impl Stream<Item = Result<Vec<u8>, std::io::Error>> {
        let parts: Vec<_> = parts.iter().map(|p| Ok(p.as_bytes().to_vec())).collect();
        stream::iter(parts)
    }

    async fn relay(parts: &[&str], max_malformed: Option<usize>) -> Vec<StreamChunk> {
        let lines = ndjson_lines(body(parts), READ_TIMEOUT);
        with_terminal_marker(relay_increments(lines, max_malformed))
            .collect()
            .await
    }

    #[test]
    fn parse_line_outcomes() {
        assert_eq!(parse_line("   "), LineOutcome::Blank);
        assert_eq!(parse_line("{not json"), LineOutcome::Malformed);
        assert_eq!(
            parse_line(r#"{"response":"hi","done":false,"model":"x"}"#),
            LineOutcome::Parsed(StreamLine {
                response: Some("hi".into()),
                done: false,
                error: None,
            })
        );
    }

    #[tokio::test]
    async fn lines_reassembled_across_chunk_boundaries() {
        let lines: Vec<_> = ndjson_lines(body(&["{\"resp", "onse\":\"a\"}\r\n{\"do", "ne\":true}"]), READ_TIMEOUT)
            .collect()
            .await;
        let lines: Vec<String> = lines.into_iter().map(Result::unwrap).collect();
        assert_eq!(lines, vec![r#"{"response":"a"}"#, r#"{"done":true}"#]);
    }

    #[tokio::test]
    async fn multibyte_text_split_between_reads() {
        let snowman = "{\"response\":\"☃\"}\n".as_bytes();
        let parts = vec![
            Ok::<_, std::io::Error>(snowman[..14].to_vec()),
            Ok(snowman[14..].to_vec()),
        ];
        let chunks: Vec<_> =
            with_terminal_marker(relay_increments(ndjson_lines(stream::iter(parts), READ_TIMEOUT), None))
                .collect()
                .await;
        assert_eq!(chunks, vec![StreamChunk::Text("☃".into()), StreamChunk::Done]);
    }

    #[tokio::test]
    async fn relays_increments_in_order_and_stops_at_done() {
        let chunks = relay(
            &[
                "{\"response\":\"Hel\"}\n",
                "{\"response\":\"lo\"}\n",
                "{\"done\":true}\n",
                "{\"response\":\"ignored\"}\n",
            ],
            Some(16),
        )
        .await;
        assert_eq!(
            chunks,
            vec![
                StreamChunk::Text("Hel".into()),
                StreamChunk::Text("lo".into()),
                StreamChunk::Done,
            ]
        );
    }

    #[tokio::test]
    async fn skips_blank_and_malformed_lines() {
        let chunks = relay(
            &["not json\n", "\n", "{\"response\":\"ok\"}\n", "{\"done\":true}\n"],
            Some(16),
        )
        .await;
        assert_eq!(chunks, vec![StreamChunk::Text("ok".into()), StreamChunk::Done]);
    }

    #[tokio::test]
    async fn only_malformed_input_still_ends_with_done() {
        let chunks = relay(&["{{{\n"], Some(16)).await;
        assert_eq!(chunks, vec![StreamChunk::Done]);
    }

    #[tokio::test]
    async fn empty_body_ends_with_done() {
        let chunks = relay(&[], None).await;
        assert_eq!(chunks, vec![StreamChunk::Done]);
    }

    #[tokio::test]
    async fn consecutive_malformed_limit_fails_the_stream() {
        let chunks = relay(
            &["{\"response\":\"a\"}\n", "x\n", "y\n", "z\n", "{\"response\":\"b\"}\n"],
            Some(3),
        )
        .await;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], StreamChunk::Text("a".into()));
        match &chunks[1] {
            StreamChunk::Error(message) => assert!(message.contains("3 consecutive malformed")),
            other => panic!("expected error chunk, got {other:?}"),
        }
        assert_eq!(chunks[2], StreamChunk::Done);
    }

    #[tokio::test]
    async fn well_formed_line_resets_malformed_count() {
        let chunks = relay(
            &["x\n", "y\n", "{\"response\":\"a\"}\n", "x\n", "y\n", "{\"done\":true}\n"],
            Some(3),
        )
        .await;
        assert_eq!(chunks, vec![StreamChunk::Text("a".into()), StreamChunk::Done]);
    }

    #[tokio::test]
    async fn backend_error_line_becomes_error_chunk() {
        let chunks = relay(
            &["{\"response\":\"a\"}\n", "{\"error\":\"model crashed\"}\n"],
            None,
        )
        .await;
        assert_eq!(chunks[0], StreamChunk::Text("a".into()));
        assert!(matches!(&chunks[1], StreamChunk::Error(m) if m.contains("model crashed")));
        assert_eq!(chunks[2], StreamChunk::Done);
        assert_eq!(chunks.len(), 3);
    }

    #[tokio::test]
    async fn dropped_connection_yields_error_then_done() {
        let parts = vec![
            Ok(b"{\"response\":\"par\"}\n".to_vec()),
            Err(std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset")),
        ];
        let lines = ndjson_lines(stream::iter(parts), READ_TIMEOUT);
        let chunks: Vec<_> = with_terminal_marker(relay_increments(lines, None))
            .collect()
            .await;
        assert_eq!(chunks[0], StreamChunk::Text("par".into()));
        assert!(matches!(&chunks[1], StreamChunk::Error(m) if m.contains("reset")));
        assert_eq!(chunks[2], StreamChunk::Done);
    }

    #[tokio::test]
    async fn unterminated_oversized_line_fails_the_stream() {
        let block = vec![b'a'; 64 * 1024];
        let reads = MAX_LINE_BYTES / block.len() + 2;
        let parts = (0..reads).map(move |_| Ok::<_, std::io::Error>(block.clone()));
        let lines = ndjson_lines(stream::iter(parts), READ_TIMEOUT);
        let chunks: Vec<_> = with_terminal_marker(relay_increments(lines, None))
            .collect()
            .await;
        assert_eq!(chunks.len(), 2);
        assert!(matches!(&chunks[0], StreamChunk::Error(m) if m.contains("exceeds")));
        assert_eq!(chunks[1], StreamChunk::Done);
    }

    #[tokio::test]
    async fn many_small_reads_build_one_line() {
        let line = format!("{{\"response\":\"{}\"}}\n", "x".repeat(4096));
        let parts: Vec<_> = line
            .as_bytes()
            .chunks(7)
            .map(|c| Ok::<_, std::io::Error>(c.to_vec()))
            .collect();
        let lines: Vec<_> = ndjson_lines(stream::iter(parts), READ_TIMEOUT)
            .collect()
            .await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].as_ref().unwrap(), line.trim_end());
    }

    #[tokio::test]
    async fn stalled_read_times_out() {
        let stalled = stream::pending::<Result<Vec<u8>, std::io::Error>>();
        let lines = ndjson_lines(stalled, Duration::from_millis(20));
        let chunks: Vec<_> = with_terminal_marker(relay_increments(lines, None))
            .collect()
            .await;
        assert_eq!(chunks.len(), 2);
        assert!(matches!(&chunks[0], StreamChunk::Error(m) if m.contains("timed out")));
        assert_eq!(chunks[1], StreamChunk::Done);
    }

    #[tokio::test]
    async fn panicking_producer_still_ends_with_done() {
        let mut polled = false;
        let exploding = stream::poll_fn(move |_| -> Poll<Option<Result<String, InferenceError>>> {
            if polled {
                panic!("producer blew up");
            }
            polled = true;
            Poll::Ready(Some(Ok("first".to_string())))
        });
        let chunks: Vec<_> = with_terminal_marker(exploding).collect().await;
        assert_eq!(chunks[0], StreamChunk::Text("first".into()));
        assert!(matches!(&chunks[1], StreamChunk::Error(_)));
        assert_eq!(chunks[2], StreamChunk::Done);
        assert_eq!(chunks.len(), 3);
    }
}
