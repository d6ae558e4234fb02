//! Typing-indicator debouncing.
//!
//! Tracks an Idle/Typing state per (sender, receiver) pair. The first typing
//! event for a pair emits `userTyping{isTyping:true}` to the receiver and
//! arms an expiry timer; repeated typing events reset the timer without
//! re-emitting. An explicit stop or the timer expiring emits
//! `userTyping{isTyping:false}` exactly once. Each reset aborts the prior
//! timer task, and every timer carries a generation number checked at expiry
//! so a superseded timer can never fire.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

use super::registry::ConnectionRegistry;
use crate::ws::broadcast::send_to_user;
use crate::ws::protocol::ServerEvent;

type PairKey = (String, String);

#[derive(Debug)]
struct TypingEntry {
    generation: u64,
    timer: JoinHandle<()>,
}

#[derive(Debug, Clone)]
pub struct TypingTracker {
    timeout: Duration,
    pairs: Arc<DashMap<PairKey, TypingEntry>>,
    next_generation: Arc<AtomicU64>,
}

impl TypingTracker {
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            pairs: Arc::new(DashMap::new()),
            next_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Record a `typing(isTyping=true)` event from `sender_id` to
    /// `receiver_id`. Emits to the receiver only on the Idle -> Typing
    /// transition; otherwise just resets the expiry timer.
    pub fn typing_started(
        &self,
        registry: &ConnectionRegistry,
        sender_id: &str,
        receiver_id: &str,
    ) {
        let key = (sender_id.to_string(), receiver_id.to_string());
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let timer = self.spawn_expiry_timer(registry, sender_id, receiver_id, generation);

        let started = match self.pairs.entry(key) {
            Entry::Occupied(mut entry) => {
                entry.get().timer.abort();
                entry.insert(TypingEntry { generation, timer });
                false
            }
            Entry::Vacant(entry) => {
                entry.insert(TypingEntry { generation, timer });
                true
            }
        };

        if started {
            send_to_user(
                registry,
                receiver_id,
                &ServerEvent::UserTyping {
                    sender_id: sender_id.to_string(),
                    is_typing: true,
                },
            );
        }
    }

    /// Record an explicit `typing(isTyping=false)` event. Emits the stop
    /// event and cancels the pending timer if the pair was in the Typing
    /// state; a pair already Idle is a no-op.
    pub fn typing_stopped(
        &self,
        registry: &ConnectionRegistry,
        sender_id: &str,
        receiver_id: &str,
    ) {
        let key = (sender_id.to_string(), receiver_id.to_string());
        if let Some((_, entry)) = self.pairs.remove(&key) {
            entry.timer.abort();
            send_to_user(
                registry,
                receiver_id,
                &ServerEvent::UserTyping {
                    sender_id: sender_id.to_string(),
                    is_typing: false,
                },
            );
        }
    }

    /// Cancel all pending timers for pairs involving `user_id` on either
    /// side. Called when a user goes fully offline so no timer fires into a
    /// closed connection. No stop events are emitted; peers learn about the
    /// disconnect from the offline broadcast.
    pub fn cancel_for_user(&self, user_id: &str) {
        self.pairs.retain(|(sender, receiver), entry| {
            if sender == user_id || receiver == user_id {
                entry.timer.abort();
                false
            } else {
                true
            }
        });
    }

    /// Number of pairs currently in the Typing state.
    pub fn active_pairs(&self) -> usize {
        self.pairs.len()
    }

    fn spawn_expiry_timer(
        &self,
        registry: &ConnectionRegistry,
        sender_id: &str,
        receiver_id: &str,
        generation: u64,
    ) -> JoinHandle<()> {
        let pairs = Arc::clone(&self.pairs);
        let registry = registry.clone();
        let sender = sender_id.to_string();
        let receiver = receiver_id.to_string();
        let timeout = self.timeout;

        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;

            // Only the timer matching the pair's current generation may fire;
            // a reset or explicit stop has already replaced or removed it.
            let key = (sender.clone(), receiver.clone());
            let expired = pairs
                .remove_if(&key, |_, entry| entry.generation == generation)
                .is_some();

            if expired {
                send_to_user(
                    &registry,
                    &receiver,
                    &ServerEvent::UserTyping {
                        sender_id: sender,
                        is_typing: false,
                    },
                );
            }
        })
    }
}
