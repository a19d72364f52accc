//! Text console speech adapter.
//!
//! Each line typed on stdin counts as one utterance and every spoken line is
//! printed as `BOT: <text>`. Handy for driving the controller without audio
//! hardware.

use super::SpeechIo;
use crate::error::{ControlError, Result};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, Lines, Stdin, Stdout,
};
use tokio::sync::Mutex;

/// Line-oriented speech adapter over any async reader/writer pair.
pub struct ConsoleSpeech<R = BufReader<Stdin>, W = Stdout> {
    input: Mutex<Lines<R>>,
    output: Mutex<W>,
}

impl ConsoleSpeech<BufReader<Stdin>, Stdout> {
    /// Adapter bound to the process's stdin and stdout.
    pub fn stdio() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
    }
}

impl<R, W> ConsoleSpeech<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(input: R, output: W) -> Self {
        Self {
            input: Mutex::new(input.lines()),
            output: Mutex::new(output),
        }
    }
}

#[async_trait]
impl<R, W> SpeechIo for ConsoleSpeech<R, W>
where
    R: AsyncBufRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn speak(&self, text: &str) -> Result<()> {
        let mut out = self.output.lock().await;
        out.write_all(format!("BOT: {text}\n").as_bytes()).await?;
        out.flush().await?;
        Ok(())
    }

    async fn listen(&self, timeout: Duration, _phrase_limit: Duration) -> Result<Option<String>> {
        let mut lines = self.input.lock().await;
        match tokio::time::timeout(timeout, lines.next_line()).await {
            Err(_) => Ok(None),
            Ok(Ok(Some(line))) => {
                let line = line.trim();
                if line.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(line.to_owned()))
                }
            }
            Ok(Ok(None)) => Err(ControlError::AdapterUnavailable(
                "console input closed".to_owned(),
            )),
            Ok(Err(e)) => Err(ControlError::Speech(format!("console read error: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    const WAIT: Duration = Duration::from_secs(1);

    fn console(input: &'static str) -> ConsoleSpeech<&'static [u8], Vec<u8>> {
        ConsoleSpeech::new(input.as_bytes(), Vec::new())
    }

    #[tokio::test]
    async fn listen_returns_trimmed_lines_in_order() {
        let speech = console("  jarvis  \nstart the hand\n");
        assert_eq!(speech.listen(WAIT, WAIT).await.unwrap().as_deref(), Some("jarvis"));
        assert_eq!(
            speech.listen(WAIT, WAIT).await.unwrap().as_deref(),
            Some("start the hand")
        );
    }

    #[tokio::test]
    async fn blank_line_is_no_utterance() {
        let speech = console("   \n");
        assert_eq!(speech.listen(WAIT, WAIT).await.unwrap(), None);
    }

    #[tokio::test]
    async fn eof_reports_adapter_unavailable() {
        let speech = console("");
        let err = speech.listen(WAIT, WAIT).await.unwrap_err();
        assert!(matches!(err, ControlError::AdapterUnavailable(_)));
    }

    #[tokio::test]
    async fn listen_times_out_with_none() {
        let (reader, _writer) = tokio::io::duplex(64);
        let speech = ConsoleSpeech::new(BufReader::new(reader), Vec::new());
        let heard = speech
            .listen(Duration::from_millis(20), Duration::from_millis(20))
            .await
            .unwrap();
        assert_eq!(heard, None);
    }

    #[tokio::test]
    async fn speak_prefixes_bot() {
        let (writer, mut reader) = tokio::io::duplex(256);
        let speech = ConsoleSpeech::new(&b""[..], writer);
        speech.speak("Yes?").await.unwrap();
        speech.speak("Stopped hand.").await.unwrap();
        drop(speech);

        let mut out = String::new();
        tokio::io::AsyncReadExt::read_to_string(&mut reader, &mut out)
            .await
            .unwrap();
        assert_eq!(out, "BOT: Yes?\nBOT: Stopped hand.\n");
    }
}
