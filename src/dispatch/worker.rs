use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use uuid::Uuid;

use super::Dispatcher;

/// Handle used by request handlers to hand newsletters off for background delivery
#[derive(Debug, Clone)]
pub struct DispatchQueue {
    sender: mpsc::UnboundedSender<Uuid>,
}

impl DispatchQueue {
    /// Queue a newsletter for delivery, returns as soon as the id is queued
    pub fn enqueue(&self, newsletter_id: Uuid) -> anyhow::Result<()> {
        self.sender
            .send(newsletter_id)
            .map_err(|_| anyhow::anyhow!("Dispatch worker is no longer running"))
    }
}

/// Spawn the background task that delivers queued newsletters one at a time.
///
/// The worker stops once every [`DispatchQueue`] handle has been dropped.
pub fn spawn_worker(dispatcher: Arc<Dispatcher>) -> (DispatchQueue, JoinHandle<()>) {
    let (sender, mut receiver) = mpsc::unbounded_channel::<Uuid>();

    let handle = tokio::spawn(async move {
        while let Some(newsletter_id) = receiver.recv().await {
            if let Err(error) = dispatcher.dispatch(newsletter_id).await {
                tracing::error!(
                    error.cause_chain = ?error,
                    error.message = %error,
                    %newsletter_id,
                    "Failed to dispatch queued newsletter"
                );
            }
        }
        tracing::info!("Dispatch worker stopped");
    });

    (DispatchQueue { sender }, handle)
}
