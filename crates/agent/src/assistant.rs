//! The assistant: routes inbound events to commands or model exchanges.
//!
//! Slash commands are answered directly and never touch the conversation
//! log. Everything else (text, photos, voice notes) goes through an
//! [`Exchange`].

use std::sync::Arc;

use relaybot_core::channel::{Channel, InboundEvent, Reply};
use relaybot_core::error::ChannelError;
use relaybot_core::integration::IntegrationRegistry;
use relaybot_core::message::UserId;
use relaybot_core::task::{NewTask, TaskStore};
use tracing::{debug, error, info, warn};

use crate::builder::ImagePayload;
use crate::exchange::{Exchange, ExchangeOutcome};

const MEDIA_UNAVAILABLE_TEXT: &str = "❌ I couldn't download your attachment. Please try sending it again.";

/// Prompt used for a photo without a caption.
pub const DEFAULT_IMAGE_PROMPT: &str = "Describe this image";

const WELCOME_TEXT: &str = "Hello! I am your AI Assistant. I can help you with tasks, reminders, \
questions, and more.\nTry sending me a message or use /help to see what I can do.";

const HELP_TEXT: &str = "*Commands:*
/start - Start the bot
/help - Show this help
/task <text> - Add a new task
/list - List pending tasks
/done <id> - Mark a task as completed
/search <query> - Search the web
/gmail [query] - Recent e-mails
/drive - Recent Drive files
/calendar - Upcoming events
/docs <document_id> - Preview a document
/app_status - Check external app status

*Features:*
- Send me any text to chat with AI.
- Send me a photo to analyze it.
- Send me a voice note and I will answer what you said.";

/// What the assistant did with an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Handled {
    /// A slash command was answered.
    Command(String),
    /// A model exchange ran.
    Exchange(ExchangeOutcome),
    /// Audio could not be transcribed; the error was sent back.
    TranscriptionFailed(String),
    /// Nothing to do (empty text, unsupported payload).
    Ignored,
}

pub struct Assistant {
    exchange: Exchange,
    tasks: Arc<dyn TaskStore>,
    integrations: Arc<IntegrationRegistry>,
}

impl Assistant {
    pub fn new(
        exchange: Exchange,
        tasks: Arc<dyn TaskStore>,
        integrations: Arc<IntegrationRegistry>,
    ) -> Self {
        Self {
            exchange,
            tasks,
            integrations,
        }
    }

    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    /// Handle one inbound event, sending replies through `channel`.
    pub async fn handle(
        &self,
        channel: &dyn Channel,
        event: &InboundEvent,
    ) -> Result<Handled, relaybot_core::Error> {
        let user = event.user_id();

        if let Some(text) = event.text.as_deref().map(str::trim) {
            if let Some((command, args)) = parse_command(text) {
                info!(user = %user, command, "Command received");
                let reply = self.run_command(channel, event, &user, command, args).await?;
                self.say(channel, &event.chat_id, &reply).await;
                return Ok(Handled::Command(command.to_string()));
            }
        }

        if let Some(image) = &event.image {
            let prompt = event
                .caption
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .unwrap_or(DEFAULT_IMAGE_PROMPT);
            self.say(channel, &event.chat_id, &Reply::plain("👀 Analyzing image...")).await;
            let outcome = self
                .exchange
                .run(&user, prompt, Some(ImagePayload::Encoded(image.clone())))
                .await?;
            return Ok(Handled::Exchange(self.deliver(channel, &event.chat_id, outcome).await));
        }

        if let Some(audio) = &event.audio {
            let transcript = match self
                .exchange
                .dispatch()
                .transcribe(audio.bytes.clone(), &audio.filename)
                .await
            {
                Ok(text) => text,
                Err(e) => {
                    let message = if e.is_not_configured() {
                        e.to_string()
                    } else {
                        format!("❌ {e}")
                    };
                    self.say(channel, &event.chat_id, &Reply::plain(message.clone())).await;
                    return Ok(Handled::TranscriptionFailed(message));
                }
            };

            if transcript.trim().is_empty() {
                self.say(channel, &event.chat_id, &Reply::plain("🎤 I couldn't hear anything in that recording."))
                    .await;
                return Ok(Handled::Ignored);
            }

            let notice = format!("🗣️ *You said:* \"{transcript}\"\n\n🤔 *Thinking...*");
            self.say(channel, &event.chat_id, &Reply::markdown(notice)).await;
            let outcome = self.exchange.run(&user, &transcript, None).await?;
            return Ok(Handled::Exchange(self.deliver(channel, &event.chat_id, outcome).await));
        }

        match event.text.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => {
                if let Err(e) = channel.send_typing(&event.chat_id).await {
                    debug!(chat = %event.chat_id, error = %e, "Failed to send typing indicator");
                }
                let outcome = self.exchange.run(&user, text, None).await?;
                Ok(Handled::Exchange(self.deliver(channel, &event.chat_id, outcome).await))
            }
            _ => {
                debug!(user = %user, "Ignoring empty event");
                Ok(Handled::Ignored)
            }
        }
    }

    async fn run_command(
        &self,
        channel: &dyn Channel,
        event: &InboundEvent,
        user: &UserId,
        command: &str,
        args: &str,
    ) -> Result<Reply, relaybot_core::Error> {
        let reply = match command {
            "start" => Reply::plain(WELCOME_TEXT),
            "help" => Reply::markdown(HELP_TEXT),
            "task" => {
                if args.is_empty() {
                    return Ok(Reply::plain("Usage: /task <task description>"));
                }
                let id = self.tasks.add(user, NewTask::titled(args)).await?;
                Reply::plain(format!("✅ Task added! (ID: {id})"))
            }
            "list" => {
                let tasks = self.tasks.list(user, true).await?;
                if tasks.is_empty() {
                    return Ok(Reply::plain("No pending tasks."));
                }
                let mut text = String::from("*Your Tasks:*\n");
                for task in &tasks {
                    text.push_str(&format!("{}. {}\n", task.id, task.title));
                }
                Reply::markdown(text)
            }
            "done" => {
                let Some(raw) = args.split_whitespace().next() else {
                    return Ok(Reply::plain("Usage: /done <task_id>"));
                };
                let Ok(id) = raw.parse::<i64>() else {
                    return Ok(Reply::plain("Invalid Task ID."));
                };
                if self.tasks.complete(id, user).await? {
                    Reply::plain(format!("✅ Task {id} marked as done."))
                } else {
                    Reply::plain(format!("❌ Task {id} not found."))
                }
            }
            "search" => {
                if args.is_empty() {
                    return Ok(Reply::plain("Usage: /search <query>"));
                }
                self.say(channel, &event.chat_id, &Reply::plain(format!("🔍 Searching for '{args}'...")))
                    .await;
                Reply::markdown(self.integrations.run("search", args).await)
            }
            "docs" => {
                if args.is_empty() {
                    return Ok(Reply::plain("Usage: /docs <document_id>"));
                }
                Reply::markdown(self.integrations.run("docs", args).await)
            }
            "app_status" => {
                self.say(channel, &event.chat_id, &Reply::plain("Connecting to external app..."))
                    .await;
                Reply::markdown(self.integrations.run("app_status", args).await)
            }
            "gmail" | "drive" | "calendar" => {
                Reply::markdown(self.integrations.run(command, args).await)
            }
            other => Reply::plain(format!("Unknown command /{other}. Use /help to see what I can do.")),
        };
        Ok(reply)
    }

    /// Send the exchange result and advance it to `Replied` when delivered.
    async fn deliver(&self, channel: &dyn Channel, chat_id: &str, outcome: ExchangeOutcome) -> ExchangeOutcome {
        match channel.send(chat_id, &Reply::plain(outcome.reply.clone())).await {
            Ok(()) => outcome.replied(),
            Err(e) => {
                warn!(chat = chat_id, error = %e, state = ?outcome.state, "Reply delivery failed");
                outcome
            }
        }
    }

    async fn say(&self, channel: &dyn Channel, chat_id: &str, reply: &Reply) {
        if let Err(e) = channel.send(chat_id, reply).await {
            warn!(chat = chat_id, error = %e, "Failed to send message");
        }
    }
}

/// Split `/command@bot args` into `("command", "args")`.
pub fn parse_command(text: &str) -> Option<(&str, &str)> {
    let rest = text.strip_prefix('/')?;
    let (head, args) = match rest.find(char::is_whitespace) {
        Some(i) => (&rest[..i], rest[i..].trim()),
        None => (rest, ""),
    };
    let command = head.split('@').next().unwrap_or(head);
    if command.is_empty() {
        return None;
    }
    Some((command, args))
}

/// Consume events from `channel` until it closes, one task per event.
pub async fn serve(assistant: Arc<Assistant>, channel: Arc<dyn Channel>) -> Result<(), relaybot_core::Error> {
    let mut rx = channel.start().await?;
    info!(channel = channel.name(), "Assistant listening");

    while let Some(event) = rx.recv().await {
        let event = match event {
            Ok(event) => event,
            Err(ChannelError::MediaUnavailable { sender_id, chat_id, reason }) => {
                warn!(channel = channel.name(), sender = %sender_id, reason = %reason, "Attachment download failed");
                if channel.is_allowed(&sender_id) {
                    let reply = Reply::plain(MEDIA_UNAVAILABLE_TEXT);
                    if let Err(e) = channel.send(&chat_id, &reply).await {
                        warn!(chat = %chat_id, error = %e, "Failed to send message");
                    }
                }
                continue;
            }
            Err(e) => {
                warn!(channel = channel.name(), error = %e, "Channel error");
                continue;
            }
        };

        if !channel.is_allowed(&event.sender_id) {
            warn!(sender = %event.sender_id, "Dropping event from unauthorized sender");
            continue;
        }

        let assistant = assistant.clone();
        let channel = channel.clone();
        tokio::spawn(async move {
            match assistant.handle(channel.as_ref(), &event).await {
                Ok(handled) => debug!(sender = %event.sender_id, ?handled, "Event handled"),
                Err(e) => error!(sender = %event.sender_id, error = %e, "Exchange aborted"),
            }
        });
    }

    info!(channel = channel.name(), "Channel closed");
    Ok(())
}
