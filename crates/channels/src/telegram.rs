//! Telegram channel adapter.
//!
//! Talks to the Telegram Bot API directly over HTTPS:
//! - `getUpdates` long polling for inbound messages
//! - `getFile` + file download for photos and voice notes
//! - `sendMessage` (optionally Markdown) and `sendChatAction` for replies

use async_trait::async_trait;
use relaybot_core::channel::{AudioClip, Channel, ChannelId, InboundEvent, Reply};
use relaybot_core::error::ChannelError;
use serde::Deserialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Telegram rejects messages longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 4096;

const DEFAULT_API_BASE: &str = "https://api.telegram.org";
const RETRY_DELAY: Duration = Duration::from_secs(5);

/// Telegram channel configuration.
#[derive(Clone)]
pub struct TelegramConfig {
    /// Bot token from @BotFather.
    pub bot_token: String,
    /// Allowed numeric user IDs. Empty = deny all, ["*"] = allow all.
    pub allowed_users: Vec<String>,
    /// Seconds the server may hold a `getUpdates` call open.
    pub poll_timeout_secs: u64,
    /// Bot API root, overridable for tests.
    pub api_base: String,
}

impl TelegramConfig {
    pub fn new(bot_token: impl Into<String>, allowed_users: Vec<String>) -> Self {
        Self {
            bot_token: bot_token.into(),
            allowed_users,
            poll_timeout_secs: 30,
            api_base: DEFAULT_API_BASE.into(),
        }
    }
}

impl std::fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &"[REDACTED]")
            .field("allowed_users", &self.allowed_users)
            .field("poll_timeout_secs", &self.poll_timeout_secs)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Thin client for the Bot API methods we use.
#[derive(Clone)]
struct BotApi {
    client: reqwest::Client,
    config: TelegramConfig,
}

impl BotApi {
    fn method_url(&self, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            method
        )
    }

    fn file_url(&self, file_path: &str) -> String {
        format!(
            "{}/file/bot{}/{}",
            self.config.api_base.trim_end_matches('/'),
            self.config.bot_token,
            file_path
        )
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        body: &serde_json::Value,
    ) -> Result<T, ChannelError> {
        let response = self
            .client
            .post(self.method_url(method))
            .json(body)
            .send()
            .await
            .map_err(|e| ChannelError::ConnectionLost(format!("{method}: {e}")))?;

        let parsed: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ChannelError::InvalidPayload(format!("{method}: {e}")))?;

        match (parsed.ok, parsed.result) {
            (true, Some(result)) => Ok(result),
            _ => Err(ChannelError::DeliveryFailed {
                channel: "telegram".into(),
                reason: parsed
                    .description
                    .unwrap_or_else(|| format!("{method} returned no result")),
            }),
        }
    }

    async fn get_updates(&self, offset: i64) -> Result<Vec<Update>, ChannelError> {
        self.call(
            "getUpdates",
            &serde_json::json!({
                "offset": offset,
                "timeout": self.config.poll_timeout_secs,
                "allowed_updates": ["message"],
            }),
        )
        .await
    }

    async fn download(&self, file_id: &str) -> Result<(Vec<u8>, Option<String>), ChannelError> {
        let file: TgFile = self
            .call("getFile", &serde_json::json!({ "file_id": file_id }))
            .await
            .map_err(|e| ChannelError::DownloadFailed(e.to_string()))?;
        let path = file
            .file_path
            .ok_or_else(|| ChannelError::DownloadFailed(format!("no file_path for {file_id}")))?;

        let response = self
            .client
            .get(self.file_url(&path))
            .send()
            .await
            .map_err(|e| ChannelError::DownloadFailed(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ChannelError::DownloadFailed(format!(
                "file download returned {}",
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChannelError::DownloadFailed(e.to_string()))?;
        Ok((bytes.to_vec(), Some(path)))
    }

    async fn send_message(&self, chat_id: &str, text: &str, markdown: bool) -> Result<(), ChannelError> {
        let mut body = serde_json::json!({ "chat_id": chat_id, "text": text });
        if markdown {
            body["parse_mode"] = serde_json::json!("Markdown");
        }
        self.call::<serde_json::Value>("sendMessage", &body).await.map(|_| ())
    }
}

/// Telegram channel adapter.
pub struct TelegramChannel {
    api: BotApi,
    channel_id: ChannelId,
    poller: tokio::sync::Mutex<Option<JoinHandle<()>>>,
}

impl TelegramChannel {
    pub fn new(config: TelegramConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.poll_timeout_secs + 30))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            api: BotApi { client, config },
            channel_id: ChannelId("telegram".into()),
            poller: tokio::sync::Mutex::new(None),
        }
    }

    fn config(&self) -> &TelegramConfig {
        &self.api.config
    }
}

fn sender_allowed(allowed_users: &[String], sender_id: &str) -> bool {
    allowed_users.iter().any(|u| u == "*" || u == sender_id)
}

/// Voice notes upload as `.ogg` whatever the stored `.oga` path says.
fn voice_filename(file_id: &str) -> String {
    format!("voice_{file_id}.ogg")
}

/// Upload name for an audio file: its own name, else the stored path's
/// basename, else the voice-note name.
fn audio_filename(file_id: &str, file_name: Option<String>, path: Option<&str>) -> String {
    let name = file_name
        .filter(|n| n.contains('.'))
        .or_else(|| {
            path.and_then(|p| p.rsplit('/').next())
                .filter(|name| name.contains('.'))
                .map(String::from)
        })
        .unwrap_or_else(|| voice_filename(file_id));
    match name.strip_suffix(".oga") {
        Some(stem) => format!("{stem}.ogg"),
        None => name,
    }
}

/// Turn an update into an event, downloading any attached media.
async fn to_event(api: &BotApi, channel_id: &ChannelId, message: TgMessage) -> Result<InboundEvent, ChannelError> {
    let from = message
        .from
        .ok_or_else(|| ChannelError::InvalidPayload("message without sender".into()))?;

    let mut event = InboundEvent {
        channel_id: channel_id.clone(),
        sender_id: from.id.to_string(),
        sender_name: from.username.clone().or(from.first_name.clone()),
        chat_id: message.chat.id.to_string(),
        text: message.text,
        caption: message.caption,
        image: None,
        audio: None,
    };

    let (sender_id, chat_id) = (event.sender_id.clone(), event.chat_id.clone());
    let unavailable = move |e: ChannelError| ChannelError::MediaUnavailable {
        sender_id: sender_id.clone(),
        chat_id: chat_id.clone(),
        reason: e.to_string(),
    };

    if let Some(largest) = message
        .photo
        .as_deref()
        .and_then(|sizes| sizes.iter().max_by_key(|p| u64::from(p.width) * u64::from(p.height)))
    {
        let (bytes, _) = api.download(&largest.file_id).await.map_err(&unavailable)?;
        event.image = Some(bytes);
    }

    let clip = match (&message.voice, &message.audio) {
        (Some(voice), _) => Some((voice.file_id.clone(), None, true)),
        (None, Some(audio)) => Some((audio.file_id.clone(), audio.file_name.clone(), false)),
        (None, None) => None,
    };
    if let Some((file_id, file_name, is_voice)) = clip {
        let (bytes, path) = api.download(&file_id).await.map_err(&unavailable)?;
        let filename = if is_voice {
            voice_filename(&file_id)
        } else {
            audio_filename(&file_id, file_name, path.as_deref())
        };
        event.audio = Some(AudioClip { bytes, filename });
    }

    Ok(event)
}

async fn poll_loop(api: BotApi, channel_id: ChannelId, tx: mpsc::Sender<Result<InboundEvent, ChannelError>>) {
    let mut offset: i64 = 0;
    loop {
        let updates = match api.get_updates(offset).await {
            Ok(updates) => updates,
            Err(e) => {
                warn!(error = %e, "getUpdates failed, retrying");
                tokio::time::sleep(RETRY_DELAY).await;
                continue;
            }
        };

        for update in updates {
            offset = offset.max(update.update_id + 1);
            let Some(message) = update.message else {
                continue;
            };

            let sender_id = message.from.as_ref().map(|u| u.id.to_string()).unwrap_or_default();
            if !sender_allowed(&api.config.allowed_users, &sender_id) {
                warn!(sender = %sender_id, "Ignoring message from unauthorized Telegram user");
                continue;
            }

            let event = to_event(&api, &channel_id, message).await;
            if let Err(e) = &event {
                warn!(update_id = update.update_id, error = %e, "Could not read Telegram update");
            }
            if tx.send(event).await.is_err() {
                debug!("Receiver dropped, stopping Telegram poller");
                return;
            }
        }
    }
}

/// Split `text` into pieces of at most `limit` characters, preferring
/// line breaks as cut points.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    if text.chars().count() <= limit {
        return vec![text.to_string()];
    }

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;

    for line in text.split_inclusive('\n') {
        let line_len = line.chars().count();
        if current_len + line_len > limit && !current.is_empty() {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if line_len > limit {
            let chars: Vec<char> = line.chars().collect();
            for piece in chars.chunks(limit) {
                chunks.push(piece.iter().collect());
            }
            continue;
        }
        current.push_str(line);
        current_len += line_len;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

#[async_trait]
impl Channel for TelegramChannel {
    fn name(&self) -> &str {
        "telegram"
    }

    fn id(&self) -> &ChannelId {
        &self.channel_id
    }

    async fn start(&self) -> Result<mpsc::Receiver<Result<InboundEvent, ChannelError>>, ChannelError> {
        if self.config().bot_token.is_empty() {
            return Err(ChannelError::NotConfigured("Telegram bot token is empty".into()));
        }

        info!("Telegram channel starting (long polling)");
        let (tx, rx) = mpsc::channel(64);
        let handle = tokio::spawn(poll_loop(self.api.clone(), self.channel_id.clone(), tx));

        if let Some(previous) = self.poller.lock().await.replace(handle) {
            previous.abort();
        }
        Ok(rx)
    }

    async fn send(&self, chat_id: &str, reply: &Reply) -> Result<(), ChannelError> {
        for chunk in split_message(&reply.text, MAX_MESSAGE_CHARS) {
            if let Err(e) = self.api.send_message(chat_id, &chunk, reply.markdown).await {
                if !reply.markdown {
                    return Err(e);
                }
                // Unbalanced markup is rejected by the API; resend as plain text.
                debug!(chat_id = %chat_id, error = %e, "Markdown send failed, retrying as plain text");
                self.api.send_message(chat_id, &chunk, false).await?;
            }
        }
        Ok(())
    }

    async fn send_typing(&self, chat_id: &str) -> Result<(), ChannelError> {
        self.api
            .call::<serde_json::Value>(
                "sendChatAction",
                &serde_json::json!({ "chat_id": chat_id, "action": "typing" }),
            )
            .await
            .map(|_| ())
    }

    fn is_allowed(&self, sender_id: &str) -> bool {
        sender_allowed(&self.config().allowed_users, sender_id)
    }

    async fn stop(&self) -> Result<(), ChannelError> {
        info!("Telegram channel stopping");
        if let Some(handle) = self.poller.lock().await.take() {
            handle.abort();
        }
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, ChannelError> {
        if self.config().bot_token.is_empty() {
            return Ok(false);
        }
        Ok(self
            .api
            .call::<serde_json::Value>("getMe", &serde_json::json!({}))
            .await
            .is_ok())
    }
}

// --- Bot API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default = "Option::default")]
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<TgMessage>,
}

#[derive(Debug, Deserialize)]
struct TgMessage {
    #[serde(default)]
    from: Option<TgUser>,
    chat: TgChat,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    caption: Option<String>,
    #[serde(default)]
    photo: Option<Vec<PhotoSize>>,
    #[serde(default)]
    voice: Option<TgVoice>,
    #[serde(default)]
    audio: Option<TgAudio>,
}

#[derive(Debug, Deserialize)]
struct TgUser {
    id: i64,
    #[serde(default)]
    first_name: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct PhotoSize {
    file_id: String,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct TgVoice {
    file_id: String,
}

#[derive(Debug, Deserialize)]
struct TgAudio {
    file_id: String,
    #[serde(default)]
    file_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TgFile {
    #[serde(default)]
    file_path: Option<String>,
}
