//! Per-conversation ordering.
//!
//! Each conversation id gets a lazily created ticket lock. Tickets are
//! handed out synchronously when an event is received, so handlers for the
//! same conversation run one at a time in receipt order, while different
//! conversations never wait on each other. A slot is removed as soon as no
//! ticket for it is outstanding.

use std::{collections::BTreeSet, sync::Arc};

use {
    dashmap::{DashMap, mapref::entry::Entry},
    tokio::sync::watch,
};

struct Slot {
    /// Next ticket number to hand out.
    next: u64,
    /// Ticket currently allowed to run.
    serving: u64,
    /// Tickets dropped before their turn came up.
    abandoned: BTreeSet<u64>,
    turn: watch::Sender<u64>,
}

impl Slot {
    fn new() -> Self {
        let (turn, _) = watch::channel(0);
        Self {
            next: 0,
            serving: 0,
            abandoned: BTreeSet::new(),
            turn,
        }
    }
}

/// Keyed ticket locks, one per active conversation.
#[derive(Clone, Default)]
pub struct ConversationLocks {
    slots: Arc<DashMap<String, Slot>>,
}

impl ConversationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next place in line for `conversation_id`. Never blocks.
    pub fn enqueue(&self, conversation_id: &str) -> ConversationTicket {
        let mut slot = self
            .slots
            .entry(conversation_id.to_owned())
            .or_insert_with(Slot::new);
        let number = slot.next;
        slot.next += 1;
        let turn = slot.turn.subscribe();
        drop(slot);

        ConversationTicket {
            locks: self.clone(),
            conversation_id: conversation_id.to_owned(),
            number,
            turn,
        }
    }

    /// Conversations with at least one outstanding ticket.
    pub fn active(&self) -> usize {
        self.slots.len()
    }

    pub fn is_idle(&self, conversation_id: &str) -> bool {
        !self.slots.contains_key(conversation_id)
    }

    fn release(&self, conversation_id: &str, number: u64) {
        let Entry::Occupied(mut occupied) = self.slots.entry(conversation_id.to_owned()) else {
            return;
        };
        let slot = occupied.get_mut();
        if slot.serving != number {
            // Not our turn yet; make sure the line skips us later.
            slot.abandoned.insert(number);
            return;
        }

        slot.serving += 1;
        while slot.abandoned.remove(&slot.serving) {
            slot.serving += 1;
        }
        if slot.serving == slot.next {
            occupied.remove();
        } else {
            slot.turn.send_replace(slot.serving);
        }
    }
}

/// A place in line. Dropping it, before or after its turn, lets the line
/// move on.
pub struct ConversationTicket {
    locks: ConversationLocks,
    conversation_id: String,
    number: u64,
    turn: watch::Receiver<u64>,
}

impl ConversationTicket {
    /// Wait until every earlier ticket for this conversation is released.
    pub async fn acquire(mut self) -> ConversationGuard {
        let number = self.number;
        // The sender lives in the slot, which outlives every ticket for it.
        let _ = self.turn.wait_for(|serving| *serving == number).await;
        ConversationGuard { _ticket: self }
    }
}

impl Drop for ConversationTicket {
    fn drop(&mut self) {
        self.locks.release(&self.conversation_id, self.number);
    }
}

/// Exclusive hold on a conversation; released on drop.
pub struct ConversationGuard {
    _ticket: ConversationTicket,
}
