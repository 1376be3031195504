//! `relaybot chat` — Interactive or single-message terminal chat.

use std::io::Write;

use relaybot_agent::Handled;
use relaybot_channels::cli::parse_line;
use relaybot_channels::CliChannel;
use relaybot_core::channel::Channel;
use relaybot_core::memory::ConversationStore;
use relaybot_core::{UserId, MISSING_API_KEY_WARNING};

pub async fn run(message: Option<String>, user: String) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    if !config.has_api_key() {
        eprintln!("  {MISSING_API_KEY_WARNING}");
        eprintln!("  Commands like /task and /list still work.");
        eprintln!();
    }

    let provider = config.provider.clone();
    let runtime = super::assemble(config).await?;
    let channel = CliChannel::for_user(user.clone());

    if let Some(msg) = message {
        // Single message mode
        let Some(event) = channel.event_for(parse_line(msg.trim())).await? else {
            return Ok(());
        };
        runtime.assistant.handle(&channel, &event).await?;
        return Ok(());
    }

    println!();
    println!("  ╔══════════════════════════════════════════════╗");
    println!("  ║          relaybot — Interactive Mode          ║");
    println!("  ╚══════════════════════════════════════════════╝");
    println!();
    println!("  Provider:  {provider}");
    println!("  User:      {user}");
    let logged = runtime.store.count(&UserId::new(user.clone())).await?;
    println!("  History:   {logged} turns logged");
    println!();
    println!("  Type a message, a /command, or attach media with");
    println!("    @image <path> [caption]    @audio <path>");
    println!("  Type 'exit' or Ctrl+C to quit.");
    println!();

    let mut rx = channel.start().await.map_err(|e| format!("Channel error: {e}"))?;

    print!("  You > ");
    std::io::stdout().flush()?;

    while let Some(result) = rx.recv().await {
        match result {
            Ok(event) => {
                println!();
                match runtime.assistant.handle(&channel, &event).await {
                    Ok(Handled::Ignored) => eprintln!("  (nothing to send)"),
                    Ok(_) => {}
                    Err(e) => eprintln!("  [Error] {e}"),
                }
                println!();
            }
            Err(e) => eprintln!("  [Input Error] {e}"),
        }
        print!("  You > ");
        std::io::stdout().flush()?;
    }

    println!("  Goodbye! 👋");
    println!();
    Ok(())
}
