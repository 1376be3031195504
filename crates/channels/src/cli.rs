//! CLI channel — interactive terminal-based chat.
//!
//! Reads lines from stdin and prints replies to stdout. Two directives
//! attach local media to a turn:
//!
//! ```text
//! @image <path> [caption]
//! @audio <path>
//! ```

use async_trait::async_trait;
use relaybot_core::channel::{AudioClip, Channel, ChannelId, InboundEvent, Reply};
use relaybot_core::error::ChannelError;
use std::path::{Path, PathBuf};
use tokio::io::{self, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

pub const CLI_CHAT_ID: &str = "cli_session";

/// What one line of terminal input asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineInput {
    Text(String),
    Image { path: PathBuf, caption: Option<String> },
    Audio { path: PathBuf },
    Exit,
}

/// Classify a trimmed, non-empty input line.
pub fn parse_line(line: &str) -> LineInput {
    if matches!(line, "exit" | "quit" | "/exit" | "/quit" | ":q") {
        return LineInput::Exit;
    }

    if let Some(rest) = line.strip_prefix("@image ") {
        let rest = rest.trim();
        let (path, caption) = match rest.split_once(char::is_whitespace) {
            Some((path, caption)) => (path, Some(caption.trim().to_string())),
            None => (rest, None),
        };
        return LineInput::Image {
            path: PathBuf::from(path),
            caption: caption.filter(|c| !c.is_empty()),
        };
    }

    if let Some(rest) = line.strip_prefix("@audio ") {
        return LineInput::Audio {
            path: PathBuf::from(rest.trim()),
        };
    }

    LineInput::Text(line.to_string())
}

/// Interactive CLI channel for terminal-based chat.
pub struct CliChannel {
    id: ChannelId,
    sender_id: String,
}

impl CliChannel {
    pub fn new() -> Self {
        Self::for_user("local_user")
    }

    /// Attribute every line to `sender_id`, which keys its history.
    pub fn for_user(sender_id: impl Into<String>) -> Self {
        Self {
            id: ChannelId("cli".into()),
            sender_id: sender_id.into(),
        }
    }

    /// Build the event for one line, reading any referenced file.
    pub async fn event_for(&self, input: LineInput) -> Result<Option<InboundEvent>, ChannelError> {
        let mut event = InboundEvent {
            channel_id: self.id.clone(),
            sender_id: self.sender_id.clone(),
            sender_name: Some("User".into()),
            chat_id: CLI_CHAT_ID.into(),
            text: None,
            caption: None,
            image: None,
            audio: None,
        };

        match input {
            LineInput::Exit => return Ok(None),
            LineInput::Text(text) => event.text = Some(text),
            LineInput::Image { path, caption } => {
                event.image = Some(read_file(&path).await?);
                event.caption = caption;
            }
            LineInput::Audio { path } => {
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "audio.ogg".into());
                event.audio = Some(AudioClip {
                    bytes: read_file(&path).await?,
                    filename,
                });
            }
        }
        Ok(Some(event))
    }
}

impl Default for CliChannel {
    fn default() -> Self {
        Self::new()
    }
}

async fn read_file(path: &Path) -> Result<Vec<u8>, ChannelError> {
    tokio::fs::read(path)
        .await
        .map_err(|e| ChannelError::DownloadFailed(format!("{}: {e}", path.display())))
}

#[async_trait]
impl Channel for CliChannel {
    fn name(&self) -> &str {
        "cli"
    }

    fn id(&self) -> &ChannelId {
        &self.id
    }

    async fn start(&self) -> Result<mpsc::Receiver<Result<InboundEvent, ChannelError>>, ChannelError> {
        let (tx, rx) = mpsc::channel(32);
        let reader = CliChannel::for_user(self.sender_id.clone());

        tokio::spawn(async move {
            let mut lines = BufReader::new(io::stdin()).lines();

            loop {
                match lines.next_line().await {
                    Ok(Some(line)) => {
                        let line = line.trim();
                        if line.is_empty() {
                            continue;
                        }

                        let event = match reader.event_for(parse_line(line)).await {
                            Ok(Some(event)) => Ok(event),
                            Ok(None) => break,
                            Err(e) => Err(e),
                        };
                        if tx.send(event).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => break, // EOF (Ctrl+D)
                    Err(e) => {
                        let _ = tx.send(Err(ChannelError::ConnectionLost(e.to_string()))).await;
                        break;
                    }
                }
            }
        });

        Ok(rx)
    }

    async fn send(&self, _chat_id: &str, reply: &Reply) -> Result<(), ChannelError> {
        println!("{}", reply.text);
        Ok(())
    }

    fn is_allowed(&self, _sender_id: &str) -> bool {
        true // local user
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn cli_channel_properties() {
        let ch = CliChannel::new();
        assert_eq!(ch.name(), "cli");
        assert_eq!(ch.id().0, "cli");
        assert!(ch.is_allowed("anyone"));
    }

    #[test]
    fn parses_plain_text_and_exit_words() {
        assert_eq!(parse_line("hello there"), LineInput::Text("hello there".into()));
        assert_eq!(parse_line("/task buy milk"), LineInput::Text("/task buy milk".into()));
        assert_eq!(parse_line(":q"), LineInput::Exit);
        assert_eq!(parse_line("quit"), LineInput::Exit);
    }

    #[test]
    fn parses_image_directive() {
        assert_eq!(
            parse_line("@image ./cat.png what breed is this"),
            LineInput::Image {
                path: PathBuf::from("./cat.png"),
                caption: Some("what breed is this".into()),
            }
        );
        assert_eq!(
            parse_line("@image cat.png"),
            LineInput::Image { path: PathBuf::from("cat.png"), caption: None }
        );
    }

    #[test]
    fn parses_audio_directive() {
        assert_eq!(
            parse_line("@audio note.ogg"),
            LineInput::Audio { path: PathBuf::from("note.ogg") }
        );
    }

    #[tokio::test]
    async fn audio_event_reads_file_and_keeps_name() {
        let mut file = tempfile::Builder::new().suffix(".ogg").tempfile().unwrap();
        file.write_all(b"OggS....").unwrap();

        let ch = CliChannel::for_user("alice");
        let event = ch
            .event_for(LineInput::Audio { path: file.path().to_path_buf() })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(event.sender_id, "alice");
        assert_eq!(event.chat_id, CLI_CHAT_ID);
        let clip = event.audio.unwrap();
        assert_eq!(clip.bytes, b"OggS....");
        assert!(clip.filename.ends_with(".ogg"));
    }

    #[tokio::test]
    async fn missing_image_is_a_download_error() {
        let ch = CliChannel::new();
        let err = ch
            .event_for(LineInput::Image {
                path: PathBuf::from("/definitely/not/here.png"),
                caption: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ChannelError::DownloadFailed(_)));
    }

    #[tokio::test]
    async fn exit_produces_no_event() {
        assert!(CliChannel::new().event_for(LineInput::Exit).await.unwrap().is_none());
    }
}
