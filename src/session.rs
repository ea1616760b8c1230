//! Streaming session: the pull loop, delivery callbacks, and cancellation.
//!
//! One session covers exactly one HTTP exchange. The loop owns the response
//! byte stream and the per-session decoder and line buffer; nothing is
//! shared across sessions. Chunks are processed strictly in arrival order
//! and callbacks never overlap, because the loop is the only flow of
//! control between a delivery and the next pull.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::sync::watch;
use tracing::{debug, warn};

use crate::client::ClientError;
use crate::decode::Utf8Decoder;
use crate::sse::{classify_line, Frame, LineReassembler};

/// Caller-facing delivery callbacks for one stream session.
///
/// `on_data` is invoked once per accepted payload frame, in stream order.
/// `on_error` is invoked at most once and never for cancellation.
/// `on_complete` is invoked exactly once, on the terminal sentinel or
/// natural end of input, and never after `on_error`.
pub trait StreamHandler: Send + 'static {
    /// One text delta from the stream.
    fn on_data(&mut self, text: &str);

    /// A non-cancellation failure; the session is over.
    fn on_error(&mut self, _error: &ClientError) {}

    /// The stream finished cleanly.
    fn on_complete(&mut self) {}
}

/// Cancellation handle for an in-flight stream session.
///
/// Returned as soon as the session enters its pull loop. Cancelling
/// interrupts the in-flight or next read; the session then stops silently,
/// with no further callbacks.
///
/// Dropping the handle does not cancel anything; the session runs to its
/// natural end and can simply no longer be cancelled.
#[derive(Debug)]
pub struct StreamHandle {
    cancel_tx: watch::Sender<bool>,
}

impl StreamHandle {
    /// Cancel the session.
    ///
    /// Idempotent and safe to call after the session has already finished.
    pub fn cancel(&self) {
        // A finished session has dropped its receiver; the send result is
        // irrelevant either way.
        let _ = self.cancel_tx.send(true);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }
}

/// Spawn the pull loop on its own task and hand back the cancel handle.
pub(crate) fn spawn<S, E, H>(chunks: S, handler: H) -> StreamHandle
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Into<ClientError> + Send + 'static,
    H: StreamHandler,
{
    let (cancel_tx, cancel_rx) = watch::channel(false);
    tokio::spawn(drive(chunks, handler, cancel_rx));
    StreamHandle { cancel_tx }
}

enum LoopControl {
    Continue,
    Stop,
}

/// The session pull loop.
///
/// Drives chunk decoding, line reassembly, and frame classification until
/// the terminal sentinel, end of input, a transport error, or cancellation.
/// The byte stream is dropped on every exit path.
async fn drive<S, E, H>(chunks: S, mut handler: H, mut cancel_rx: watch::Receiver<bool>)
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Into<ClientError>,
    H: StreamHandler,
{
    let mut chunks = std::pin::pin!(chunks);
    let mut decoder = Utf8Decoder::new();
    let mut lines = LineReassembler::new();
    // A dropped handle closes the channel without sending; that must not
    // end the session, so the arm is disabled once the channel is closed.
    let mut cancel_open = true;

    loop {
        let next = tokio::select! {
            biased;
            changed = cancel_rx.changed(), if cancel_open => {
                match changed {
                    Ok(()) if *cancel_rx.borrow() => {
                        debug!("session cancelled by caller");
                        return;
                    }
                    Ok(()) => continue,
                    Err(_) => {
                        cancel_open = false;
                        continue;
                    }
                }
            }
            next = chunks.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                debug!(bytes = chunk.len(), "chunk received");
                let text = decoder.decode(&chunk);
                if let LoopControl::Stop =
                    dispatch_lines(lines.feed(&text), &mut handler, &cancel_rx)
                {
                    return;
                }
            }
            Some(Err(err)) => {
                let err = err.into();
                warn!(error = %err, "stream read failed");
                handler.on_error(&err);
                return;
            }
            None => {
                // Natural end of input: the decoder may hold a partial
                // character and the reassembler an unterminated line.
                let tail = decoder.finish();
                if let LoopControl::Stop =
                    dispatch_lines(lines.feed(&tail), &mut handler, &cancel_rx)
                {
                    return;
                }
                if *cancel_rx.borrow() {
                    return;
                }
                if let Some(line) = lines.flush() {
                    match classify_line(&line) {
                        Frame::Data(payload) => handler.on_data(&payload),
                        // A trailing sentinel without its newline still just
                        // ends the stream
                        Frame::Done | Frame::Ignore => {}
                    }
                }
                debug!("stream ended");
                handler.on_complete();
                return;
            }
        }
    }
}

/// Classify and deliver a batch of reassembled lines.
///
/// Stops at the terminal sentinel, discarding anything already buffered
/// past it, and goes quiet immediately once cancellation is requested.
fn dispatch_lines<H: StreamHandler>(
    lines: Vec<String>,
    handler: &mut H,
    cancel_rx: &watch::Receiver<bool>,
) -> LoopControl {
    for line in lines {
        if *cancel_rx.borrow() {
            return LoopControl::Stop;
        }
        match classify_line(&line) {
            Frame::Data(payload) => handler.on_data(&payload),
            Frame::Done => {
                debug!("terminal sentinel received");
                handler.on_complete();
                return LoopControl::Stop;
            }
            Frame::Ignore => {}
        }
    }
    LoopControl::Continue
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[derive(Debug, Clone, PartialEq)]
    enum Event {
        Data(String),
        Error(String),
        Complete,
    }

    #[derive(Clone, Default)]
    struct Recorder {
        events: Arc<Mutex<Vec<Event>>>,
    }

    impl Recorder {
        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }
    }

    impl StreamHandler for Recorder {
        fn on_data(&mut self, text: &str) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Data(text.to_string()));
        }

        fn on_error(&mut self, error: &ClientError) {
            self.events
                .lock()
                .unwrap()
                .push(Event::Error(error.to_string()));
        }

        fn on_complete(&mut self) {
            self.events.lock().unwrap().push(Event::Complete);
        }
    }

    fn ok_chunks(parts: &[&[u8]]) -> impl Stream<Item = Result<Bytes, ClientError>> {
        let parts: Vec<Result<Bytes, ClientError>> = parts
            .iter()
            .map(|p| Ok(Bytes::copy_from_slice(p)))
            .collect();
        stream::iter(parts)
    }

    async fn run(parts: &[&[u8]]) -> Vec<Event> {
        let recorder = Recorder::default();
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        drive(ok_chunks(parts), recorder.clone(), cancel_rx).await;
        recorder.events()
    }

    #[tokio::test]
    async fn test_lines_split_across_chunks() {
        let events = run(&[b"data: Hel", b"lo\ndata: Wor", b"ld\ndata: [DONE]\n"]).await;
        assert_eq!(
            events,
            vec![
                Event::Data("Hello".to_string()),
                Event::Data("World".to_string()),
                Event::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_payload_line_is_ignored() {
        let events = run(&[b"data: \ndata: ok\n"]).await;
        assert_eq!(
            events,
            vec![Event::Data("ok".to_string()), Event::Complete]
        );
    }

    #[tokio::test]
    async fn test_any_split_point_gives_same_deliveries() {
        // Multi-byte characters force splits mid-character as well as
        // mid-line.
        let full = "data: ét进\ndata: 球ok\n: keep-alive\ndata: [DONE]\n".as_bytes();
        let expected = run(&[full]).await;
        assert_eq!(
            expected,
            vec![
                Event::Data("ét进".to_string()),
                Event::Data("球ok".to_string()),
                Event::Complete,
            ]
        );

        for split in 0..=full.len() {
            let events = run(&[&full[..split], &full[split..]]).await;
            assert_eq!(events, expected, "split at byte {split}");
        }
    }

    #[tokio::test]
    async fn test_sentinel_discards_buffered_tail() {
        let events = run(&[b"data: a\ndata: [DONE]\ndata: never\n"]).await;
        assert_eq!(
            events,
            vec![Event::Data("a".to_string()), Event::Complete]
        );
    }

    #[tokio::test]
    async fn test_unterminated_final_line_is_flushed_once() {
        let events = run(&[b"data: first\ndata: tail"]).await;
        assert_eq!(
            events,
            vec![
                Event::Data("first".to_string()),
                Event::Data("tail".to_string()),
                Event::Complete,
            ]
        );
    }

    #[tokio::test]
    async fn test_whitespace_remainder_is_not_delivered() {
        let events = run(&[b"data: only\n  \t"]).await;
        assert_eq!(
            events,
            vec![Event::Data("only".to_string()), Event::Complete]
        );
    }

    #[tokio::test]
    async fn test_trailing_sentinel_without_newline_completes() {
        let events = run(&[b"data: a\ndata: [DONE]"]).await;
        assert_eq!(
            events,
            vec![Event::Data("a".to_string()), Event::Complete]
        );
    }

    #[tokio::test]
    async fn test_dangling_partial_character_becomes_replacement() {
        let mut bytes = b"data: ok".to_vec();
        bytes.extend_from_slice(&"进".as_bytes()[..2]);
        let events = run(&[&bytes]).await;
        assert_eq!(
            events,
            vec![Event::Data("ok\u{FFFD}".to_string()), Event::Complete]
        );
    }

    #[tokio::test]
    async fn test_read_error_reported_once_without_complete() {
        let recorder = Recorder::default();
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        let chunks = stream::iter(vec![
            Ok(Bytes::from_static(b"data: a\n")),
            Err(ClientError::Config("connection reset".to_string())),
        ]);
        drive(chunks, recorder.clone(), cancel_rx).await;

        assert_eq!(
            recorder.events(),
            vec![
                Event::Data("a".to_string()),
                Event::Error("configuration error: connection reset".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_cancel_goes_silent() {
        let recorder = Recorder::default();
        // One real chunk, then a read that never resolves.
        let chunks = ok_chunks(&[b"data: a\n"]).chain(stream::pending());
        let handle = spawn(chunks, recorder.clone());

        // Wait for the first delivery so we know the loop is parked on the
        // pending read.
        for _ in 0..100 {
            if !recorder.events().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(recorder.events(), vec![Event::Data("a".to_string())]);

        handle.cancel();
        handle.cancel(); // idempotent
        assert!(handle.is_cancelled());

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(recorder.events(), vec![Event::Data("a".to_string())]);
    }

    #[tokio::test]
    async fn test_dropped_handle_does_not_cancel() {
        let recorder = Recorder::default();
        // The chunk arrives only after the handle is long gone.
        let chunks = stream::once(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            Ok::<_, ClientError>(Bytes::from_static(b"data: a\ndata: [DONE]\n"))
        });
        let handle = spawn(chunks, recorder.clone());
        drop(handle);

        for _ in 0..100 {
            if recorder.events().len() >= 2 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(
            recorder.events(),
            vec![Event::Data("a".to_string()), Event::Complete]
        );
    }

    #[tokio::test]
    async fn test_cancel_after_completion_is_safe() {
        let recorder = Recorder::default();
        let handle = spawn(ok_chunks(&[b"data: [DONE]\n"]), recorder.clone());

        for _ in 0..100 {
            if !recorder.events().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert_eq!(recorder.events(), vec![Event::Complete]);

        handle.cancel();
        handle.cancel();
        assert_eq!(recorder.events(), vec![Event::Complete]);
    }

    #[tokio::test]
    async fn test_cancel_before_first_read_delivers_nothing() {
        let recorder = Recorder::default();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let _ = cancel_tx.send(true);
        drive(ok_chunks(&[b"data: a\n"]), recorder.clone(), cancel_rx).await;
        assert_eq!(recorder.events(), vec![]);
    }
}
