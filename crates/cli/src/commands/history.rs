//! `relaybot history` — Print a user's most recent logged turns.

use relaybot_core::memory::ConversationStore;
use relaybot_core::UserId;

pub async fn run(user: &str, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config()?;
    let store = super::open_store(&config).await?;
    let user_id = UserId::from(user);

    let total = store.count(&user_id).await?;
    let turns = store.recent(&user_id, limit).await?;

    println!("🧠 Conversation history for {user}");
    println!("====================================");
    println!("  Showing {} of {total} logged turns", turns.len());
    println!();

    if turns.is_empty() {
        println!("  (no turns yet)");
        return Ok(());
    }

    for turn in &turns {
        let stamp = turn.created_at.format("%Y-%m-%d %H:%M:%S");
        let mut lines = turn.content.lines();
        let first = lines.next().unwrap_or_default();
        println!("  [{stamp}] {:<9} {first}", format!("{}:", turn.role.as_str()));
        for line in lines {
            println!("  {:<32}{line}", "");
        }
    }

    Ok(())
}
