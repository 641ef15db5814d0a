//! Terminal front-end for the dialogue: reads lines, prints replies.

use anyhow::Result;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::warn;

use crate::config::DialogueConfig;
use crate::dialogue::{ChatDriver, Entry, ResolveBackend, Session};

/// Runs an interactive chat on stdin/stdout until EOF.
pub async fn run_chat(config: &DialogueConfig, backend: Arc<dyn ResolveBackend>) -> Result<()> {
    let session = Session::new(&config.greeting).with_limit(config.history_limit);
    for entry in &session.history {
        println!("bot> {}", entry);
    }

    let (handle, driver) = ChatDriver::spawn(
        session,
        backend,
        StdRng::from_entropy(),
        Duration::from_millis(config.typing_delay_ms),
    );

    let renderer = tokio::spawn(render(handle.entries()));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        handle.input(&line);
        handle.submit(&line);
    }

    drop(handle);
    driver.await?;
    renderer.await?;
    Ok(())
}

/// The terminal line for `entry`. User messages are not echoed, since the
/// user already sees what they typed.
pub fn render_line(entry: &Entry) -> Option<String> {
    match entry {
        Entry::Message(_) => None,
        Entry::Reply(reply) => Some(format!("bot> {}", reply)),
    }
}

async fn render(mut entries: broadcast::Receiver<Entry>) {
    loop {
        match entries.recv().await {
            Ok(entry) => {
                if let Some(line) = render_line(&entry) {
                    println!("{}", line);
                }
            }
            Err(RecvError::Lagged(skipped)) => warn!(skipped, "renderer fell behind"),
            Err(RecvError::Closed) => break,
        }
    }
}
