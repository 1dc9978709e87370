//! `parlor chat` - run a single turn from the terminal.
//!
//! Memory lives in-process, so a conversation id only matters within one
//! invocation; it still selects the persona's memory path.

use std::collections::HashMap;
use std::io::Write;

use anyhow::Result;
use console::style;
use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;

use parlor_core::agent::{TurnEvent, TurnRequest};

use crate::state::AppState;

pub struct ChatArgs {
    pub agent: String,
    pub message: String,
    pub conversation: Option<String>,
    pub params: Vec<(String, String)>,
    pub stream: bool,
}

pub async fn chat(state: &AppState, args: ChatArgs) -> Result<()> {
    let agent = state.catalog.get(&args.agent)?;
    let request = TurnRequest {
        conversation_id: args.conversation.map(Into::into),
        message: args.message,
        params: args.params.into_iter().collect::<HashMap<_, _>>(),
    };

    // Ctrl+C cancels the turn instead of killing the process mid-write.
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    if args.stream {
        let mut turn = state.orchestrator.stream_turn(agent, request, cancel);
        let mut stdout = std::io::stdout();
        while let Some(event) = turn.next().await {
            match event? {
                TurnEvent::Fragment(text) => {
                    print!("{text}");
                    stdout.flush()?;
                }
                TurnEvent::End { .. } => println!(),
            }
        }
        return Ok(());
    }

    let outcome = state.orchestrator.run_turn(&agent, request, &cancel).await?;
    println!("{}", outcome.content);
    if outcome.tool_rounds > 0 {
        eprintln!(
            "{}",
            style(format!(
                "  ({} tool round{}, {} tokens)",
                outcome.tool_rounds,
                if outcome.tool_rounds == 1 { "" } else { "s" },
                outcome.usage.input_tokens + outcome.usage.output_tokens
            ))
            .dim()
        );
    }
    Ok(())
}
