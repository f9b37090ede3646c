use crate::models::Listing;
use crate::notify::message::build_message;
use crate::notify::telegram::{Messenger, OutgoingMessage, ParseMode};
use crate::store::SeenStore;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info};

/// Sends one message per unseen listing and records what was sent.
///
/// Delivery is fail-fast per batch: the first failed send stops the
/// batch. Listings sent before it are marked seen and persisted; the
/// failed one and everything after it stay unseen and are retried on the
/// next run.
pub struct Dispatcher {
    store: SeenStore,
    messenger: Arc<dyn Messenger>,
    chat_id: String,
}

impl Dispatcher {
    pub fn new(
        store: SeenStore,
        messenger: Arc<dyn Messenger>,
        chat_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            messenger,
            chat_id: chat_id.into(),
        }
    }

    /// Notify about listings not seen before; returns how many were sent
    pub async fn dispatch(&mut self, candidates: &[Listing]) -> usize {
        let mut batch_ids = HashSet::new();
        let fresh: Vec<&Listing> = candidates
            .iter()
            .filter(|l| !self.store.contains(&l.id) && batch_ids.insert(l.id.as_str()))
            .collect();

        if fresh.is_empty() {
            return 0;
        }

        let mut sent = 0;
        for listing in &fresh {
            let message = OutgoingMessage {
                chat_id: self.chat_id.clone(),
                text: build_message(listing),
                parse_mode: ParseMode::Html,
                disable_web_page_preview: true,
            };

            match self.messenger.send(&message).await {
                Ok(()) => {
                    self.store.insert(listing.id.clone());
                    sent += 1;
                }
                Err(e) => {
                    error!(
                        "Notification for {} failed, {} left for next run: {}",
                        listing.id,
                        fresh.len() - sent,
                        e
                    );
                    break;
                }
            }
        }

        if sent > 0 {
            self.store.save().await;
            info!("Sent {} Telegram messages", sent);
        }
        sent
    }

    pub fn seen_count(&self) -> usize {
        self.store.len()
    }
}
