//! Watch command implementation.

use crate::BackoffKind;
use frontdesk_protocol::Credential;
use frontdesk_store::Store;
use frontdesk_sync::{
    ConnectionState, DispatchOutcome, LifecycleController, NewRecordPolicy, RetryConfig,
    StatusEvent, SyncConfig, WebSocketTransport,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

/// Options for the watch command.
#[derive(Debug)]
pub struct WatchOptions {
    /// Backend base address.
    pub url: String,
    /// Bearer token.
    pub token: String,
    /// Total attempts per failure episode.
    pub max_attempts: u32,
    /// Base retry delay in milliseconds.
    pub retry_delay_ms: u64,
    /// Delay growth.
    pub backoff: BackoffKind,
    /// Upsert on repeated "new" events.
    pub upsert_new: bool,
}

impl WatchOptions {
    fn sync_config(&self) -> SyncConfig {
        let delay = Duration::from_millis(self.retry_delay_ms);
        let retry = match self.backoff {
            BackoffKind::Fixed => RetryConfig::fixed(self.max_attempts, delay),
            BackoffKind::Exponential => {
                RetryConfig::exponential(self.max_attempts, delay, delay.saturating_mul(10))
                    .with_jitter(true)
            }
        };
        let policy = if self.upsert_new {
            NewRecordPolicy::Upsert
        } else {
            NewRecordPolicy::Insert
        };
        SyncConfig::new(self.url.clone())
            .with_retry(retry)
            .with_new_record_policy(policy)
    }
}

/// Runs the watch command until Ctrl-C or until the retry budget is spent.
pub async fn run(options: WatchOptions) -> Result<(), Box<dyn std::error::Error>> {
    let credential = Credential::non_empty(options.token.clone()).ok_or("token is empty")?;
    let store = Arc::new(Store::new());
    let mut controller = LifecycleController::new(
        options.sync_config(),
        WebSocketTransport::new(),
        store.clone(),
    )?;
    let mut events = controller.subscribe();

    controller.set_credential(Some(credential)).await?;
    println!("Watching {} (Ctrl-C to stop)", options.url);

    let failed = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break false,
            event = events.recv() => match event {
                Ok(StatusEvent::NoticeRaised(notice)) => {
                    println!("! {}", notice);
                    break true;
                }
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Status output fell behind");
                }
                Err(RecvError::Closed) => break false,
            },
        }
    };

    let stats = controller.stats();
    controller.teardown().await;

    let counts = store.stats();
    println!();
    println!("Session summary:");
    println!("  Connects:         {}", stats.connects);
    println!("  Failed attempts:  {}", stats.failed_attempts);
    println!("  Frames received:  {}", stats.frames_received);
    println!("  Frames discarded: {}", stats.frames_discarded);
    println!(
        "  Requests:         {} ({} pending, {} in progress, {} completed)",
        counts.requests.total(),
        counts.requests.pending,
        counts.requests.in_progress,
        counts.requests.completed
    );
    println!(
        "  Feedback:         {} ({} positive, {} negative, {} neutral)",
        counts.feedback.total(),
        counts.feedback.positive,
        counts.feedback.negative,
        counts.feedback.neutral
    );

    if failed {
        return Err("live connection failed".into());
    }
    Ok(())
}

fn print_event(event: &StatusEvent) {
    match event {
        StatusEvent::StateChanged {
            to, retry_counter, ..
        } => match to {
            ConnectionState::Reconnecting => {
                println!("~ connection lost, retry {}", retry_counter)
            }
            other => println!("~ {:?}", other),
        },
        StatusEvent::UpdateApplied {
            kind,
            record_id,
            outcome,
        } => {
            let effect = match outcome {
                DispatchOutcome::Inserted => "inserted",
                DispatchOutcome::Replaced => "replaced",
                DispatchOutcome::Dropped => "dropped (unknown id)",
            };
            println!("+ {} #{}: {}", kind, record_id, effect);
        }
        StatusEvent::FrameDiscarded { reason } => println!("- discarded frame: {}", reason),
        StatusEvent::NoticeRaised(notice) => println!("! {}", notice),
        StatusEvent::NoticeCleared => {}
    }
}
