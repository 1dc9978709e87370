//! `parlor agents` - list the persona catalog.

use anyhow::Result;
use console::style;

use parlor_types::agent::MemoryPolicy;

use crate::state::AppState;

pub fn list_agents(state: &AppState, json: bool) -> Result<()> {
    let summaries = state.catalog.summaries();

    if json {
        println!("{}", serde_json::to_string_pretty(&summaries)?);
        return Ok(());
    }

    println!();
    for agent in &summaries {
        println!("  {}  {}", style(&agent.name).cyan().bold(), style(&agent.description).dim());
        if !agent.tools.is_empty() {
            println!("      tools:  {}", agent.tools.join(", "));
        }
        for placeholder in &agent.placeholders {
            match &placeholder.default {
                Some(default) => println!("      param:  {} (default \"{default}\")", placeholder.name),
                None => println!("      param:  {} (required)", placeholder.name),
            }
        }
        let memory = match agent.memory {
            MemoryPolicy::None => "none".to_string(),
            MemoryPolicy::PerConversation { recall_size } => format!("per conversation, last {recall_size} messages"),
        };
        println!("      memory: {memory}");
        println!();
    }
    Ok(())
}
