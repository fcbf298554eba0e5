//! Runs a conversation against a stream of input lines.

use crate::conversation::Conversation;
use anyhow::Result;
use cb_channels::PresentationSink;
use std::time::Duration;
use tokio::sync::mpsc;

async fn sleep_for(wait: Option<Duration>) {
    match wait {
        Some(wait) => tokio::time::sleep(wait).await,
        None => std::future::pending::<()>().await,
    }
}

/// Feed `inputs` through `conversation` one turn at a time, rendering deferred
/// captions as they come due. Returns once the session has ended and drained,
/// or once input closes and outstanding captions are rendered.
#[tracing::instrument(level = "info", skip_all, fields(session_id = %conversation.session().id))]
pub async fn drive(
    mut conversation: Conversation,
    sink: &dyn PresentationSink,
    mut inputs: mpsc::Receiver<String>,
) -> Result<()> {
    // Preloads are fire-and-forget; the handle is only useful to tests.
    let _preload = conversation.start();

    loop {
        if conversation.is_finished() {
            tracing::info!("conversation finished");
            return Ok(());
        }
        let wait = conversation.next_due_in();
        tokio::select! {
            input = inputs.recv() => {
                let Some(input) = input else {
                    break;
                };
                conversation.on_user_turn(&input, sink).await?;
                conversation.flush_due(sink).await?;
            }
            () = sleep_for(wait) => {
                conversation.flush_due(sink).await?;
            }
        }
    }

    while let Some(wait) = conversation.next_due_in() {
        tokio::time::sleep(wait).await;
        conversation.flush_due(sink).await?;
    }
    tracing::info!("conversation input closed");
    Ok(())
}
