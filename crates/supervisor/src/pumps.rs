//! Agent output pumps.
//!
//! One task per stream reads whatever the pipe has, splits it into lines and
//! hands each non-empty line on. The loop ends at EOF, on a read error, or
//! when the cancel token fires.

use std::sync::Arc;

use teamradar_line_protocol::{LineExtractor, parse_line};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::sink::NotificationSink;

const READ_BUF_SIZE: usize = 8 * 1024;

/// Longest partial stderr line kept before it is logged as is.
const STDERR_MAX_PENDING: usize = 4 * 1024;

/// Reads agent stdout and forwards every decoded notification to `sink`.
///
/// Returns the number of notifications delivered.
pub(crate) async fn stdout_pump<R>(
    reader: R,
    sink: Arc<dyn NotificationSink>,
    cancel: CancellationToken,
) -> usize
where
    R: AsyncRead + Unpin,
{
    let mut delivered = 0;
    pump(reader, "stdout", None, cancel, |line| {
        if let Some(notification) = parse_line(line) {
            sink.notify(&notification.content);
            delivered += 1;
        }
    })
    .await;
    delivered
}

/// Drains agent stderr so the agent never blocks on a full pipe.
///
/// Lines are not parsed for notifications, only logged at debug level.
/// Output without newlines is logged in pieces so it never piles up.
pub(crate) async fn stderr_pump<R>(reader: R, cancel: CancellationToken)
where
    R: AsyncRead + Unpin,
{
    pump(reader, "stderr", Some(STDERR_MAX_PENDING), cancel, |line| {
        debug!(line = %String::from_utf8_lossy(line), "agent stderr");
    })
    .await;
}

async fn pump<R, F>(
    mut reader: R,
    stream: &'static str,
    max_pending: Option<usize>,
    cancel: CancellationToken,
    mut on_line: F,
) where
    R: AsyncRead + Unpin,
    F: FnMut(&[u8]),
{
    let mut extractor = LineExtractor::new();
    let mut buf = vec![0u8; READ_BUF_SIZE];

    loop {
        let n = tokio::select! {
            _ = cancel.cancelled() => {
                debug!(stream, "pump cancelled");
                break;
            }
            read = reader.read(&mut buf) => match read {
                Ok(0) => {
                    trace!(stream, "agent stream closed");
                    break;
                }
                Ok(n) => n,
                Err(e) => {
                    warn!(stream, error = %e, "agent stream read failed");
                    break;
                }
            },
        };

        for line in split_chunk(&mut extractor, &buf[..n], max_pending) {
            if !line.is_empty() {
                on_line(&line);
            }
        }
    }

    let dropped = extractor.clear();
    if dropped > 0 {
        trace!(stream, bytes = dropped, "unterminated trailing output discarded");
    }
}

/// Feeds `chunk` and, past `max_pending`, flushes the partial line too.
fn split_chunk(
    extractor: &mut LineExtractor,
    chunk: &[u8],
    max_pending: Option<usize>,
) -> Vec<Vec<u8>> {
    let mut lines = extractor.feed(chunk);
    if max_pending.is_some_and(|max| extractor.pending().len() > max) {
        lines.push(extractor.take_pending());
    }
    lines
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::time::Duration;

    use tokio::io::AsyncWriteExt;

    use super::*;

    fn collecting_sink() -> (Arc<dyn NotificationSink>, Arc<Mutex<Vec<String>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = Arc::clone(&seen);
        let sink: Arc<dyn NotificationSink> =
            Arc::new(move |msg: &str| seen2.lock().unwrap().push(msg.to_string()));
        (sink, seen)
    }

    #[tokio::test]
    async fn stdout_pump_decodes_lines() {
        let (sink, seen) = collecting_sink();
        let input: &[u8] = b"INFO start\n\
            INFO 2016-01-01 msg {\"Content\":\"Room A joined\"} trailing text\n\
            \n\
            {\"Content\":null}\n\
            {\"Content\":\"second\"}\n\
            {\"Content\":\"never terminated\"}";

        let delivered = stdout_pump(input, sink, CancellationToken::new()).await;

        assert_eq!(delivered, 2);
        assert_eq!(*seen.lock().unwrap(), vec!["Room A joined", "second"]);
    }

    #[tokio::test]
    async fn stdout_pump_joins_split_reads() {
        let (sink, seen) = collecting_sink();
        let (mut tx, rx) = tokio::io::duplex(64);

        let task = tokio::spawn(stdout_pump(rx, sink, CancellationToken::new()));

        tx.write_all(br#"{"Cont"#).await.unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(seen.lock().unwrap().is_empty());

        tx.write_all(b"ent\":\"hi\"}\n").await.unwrap();
        drop(tx);

        assert_eq!(task.await.unwrap(), 1);
        assert_eq!(*seen.lock().unwrap(), vec!["hi"]);
    }

    #[tokio::test]
    async fn pump_stops_on_cancel() {
        let (sink, _seen) = collecting_sink();
        let (_tx, rx) = tokio::io::duplex(64);
        let cancel = CancellationToken::new();

        let task = tokio::spawn(stdout_pump(rx, sink, cancel.clone()));
        cancel.cancel();

        let delivered = tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("pump did not stop")
            .unwrap();
        assert_eq!(delivered, 0);
    }

    #[test]
    fn bounded_split_caps_partial_line() {
        let mut extractor = LineExtractor::new();
        let chunk = [b'#'; 1024];
        let mut flushed = 0;

        for _ in 0..256 {
            for line in split_chunk(&mut extractor, &chunk, Some(STDERR_MAX_PENDING)) {
                flushed += line.len();
            }
            assert!(extractor.pending().len() <= STDERR_MAX_PENDING);
        }

        assert_eq!(flushed + extractor.pending().len(), 256 * 1024);
    }

    #[test]
    fn unbounded_split_keeps_partial_line() {
        let mut extractor = LineExtractor::new();
        let chunk = [b'#'; 1024];
        for _ in 0..8 {
            assert!(split_chunk(&mut extractor, &chunk, None).is_empty());
        }
        assert_eq!(extractor.pending().len(), 8 * 1024);
    }

    #[tokio::test]
    async fn stderr_pump_drains_to_eof() {
        let big = vec![b'x'; 256 * 1024];
        tokio::time::timeout(
            Duration::from_secs(1),
            stderr_pump(big.as_slice(), CancellationToken::new()),
        )
        .await
        .expect("stderr pump did not finish");
    }
}
