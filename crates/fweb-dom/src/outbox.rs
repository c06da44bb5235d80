#![forbid(unsafe_code)]

//! Outbound queue and replay history of one client.
//!
//! # Design
//!
//! Element updates and other messages are queued separately. Pending element
//! ids form a set; when the queue is drained they become a single update
//! record, serialized from each element's *current* state, followed by the
//! queued messages in enqueue order. Any number of mutations before a flush
//! therefore yield one record with the last state, and a message never
//! observes an element the browser has not received yet.
//!
//! Every drained frame receives the next sequence number and is retained,
//! together with its recipient, in a bounded [`History`] for replay on
//! reconnect.
//!
//! # Invariants
//!
//! 1. An element id appears at most once in the queue.
//! 2. Drained frames carry strictly increasing sequence numbers; the update
//!    record of a drain precedes its messages.
//! 3. Every element id referenced by a drained update record is either part
//!    of that record or of an earlier one.
//! 4. The history never holds more than its capacity; the highest evicted
//!    sequence number is remembered so stale reconnect markers are detected.
//! 5. Replay never hands a socket a frame addressed to another socket.

use std::collections::{BTreeMap, VecDeque};

use fweb_core::protocol::{ElementState, Frame, Outbound};
use fweb_core::{ElementId, SocketId};
use indexmap::IndexSet;

/// Recipient of an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    /// Every socket currently attached to the client.
    Client,
    /// One physical connection.
    Socket(SocketId),
}

impl Target {
    /// Whether `socket` receives messages addressed to this target.
    #[inline]
    #[must_use]
    pub fn includes(self, socket: SocketId) -> bool {
        match self {
            Self::Client => true,
            Self::Socket(only) => only == socket,
        }
    }
}

#[derive(Debug)]
pub struct Outbox {
    updates: IndexSet<ElementId>,
    messages: VecDeque<(Target, Outbound)>,
    next_seq: u64,
    history: History,
}

impl Outbox {
    #[must_use]
    pub fn new(history_capacity: usize) -> Self {
        Self {
            updates: IndexSet::new(),
            messages: VecDeque::new(),
            next_seq: 1,
            history: History::new(history_capacity),
        }
    }

    /// Queue `id` for a full-state update. Returns `false` if it was already
    /// queued.
    pub fn enqueue_update(&mut self, id: ElementId) -> bool {
        self.updates.insert(id)
    }

    pub fn enqueue_message(&mut self, message: Outbound, target: Target) {
        self.messages.push_back((target, message));
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.updates.is_empty() && self.messages.is_empty()
    }

    /// Number of frames the next drain yields.
    #[must_use]
    pub fn len(&self) -> usize {
        usize::from(!self.updates.is_empty()) + self.messages.len()
    }

    #[must_use]
    pub fn is_queued(&self, id: ElementId) -> bool {
        self.updates.contains(&id)
    }

    /// Forget queued element updates, keeping other messages.
    pub fn discard_updates(&mut self) {
        self.updates.clear();
    }

    /// Drain the queue into sequenced frames.
    ///
    /// `serialize` yields the current state of an element, or `None` if it
    /// was deleted.
    pub fn drain(&mut self, mut serialize: impl FnMut(ElementId) -> Option<ElementState>) -> Vec<(Target, Frame)> {
        let mut frames = Vec::with_capacity(self.len());
        if !self.updates.is_empty() {
            let elements: BTreeMap<_, _> = self.updates.drain(..).map(|id| (id, serialize(id))).collect();
            frames.push(self.sequence(Target::Client, Outbound::Update { elements }));
        }
        while let Some((target, message)) = self.messages.pop_front() {
            frames.push(self.sequence(target, message));
        }
        frames
    }

    fn sequence(&mut self, target: Target, message: Outbound) -> (Target, Frame) {
        let frame = Frame {
            seq: self.next_seq,
            message,
        };
        self.next_seq += 1;
        self.history.push(target, frame.clone());
        (target, frame)
    }

    /// Sequence number of the most recently drained frame (0 before the
    /// first).
    #[must_use]
    pub fn last_seq(&self) -> u64 {
        self.next_seq - 1
    }

    #[must_use]
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Frames newer than `last_seq` that `socket` may receive, or `None` when
    /// they are no longer all retained.
    #[must_use]
    pub fn replay_since(&self, last_seq: u64, socket: SocketId) -> Option<Vec<Frame>> {
        if last_seq > self.last_seq() {
            return None;
        }
        self.history.since(last_seq, socket)
    }
}

/// Ring buffer of delivered frames and their recipients.
#[derive(Debug)]
pub struct History {
    frames: VecDeque<(Target, Frame)>,
    capacity: usize,
    dropped_through: u64,
}

impl History {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            frames: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
            dropped_through: 0,
        }
    }

    pub fn push(&mut self, target: Target, frame: Frame) {
        if self.capacity == 0 {
            self.dropped_through = frame.seq;
            return;
        }
        if self.frames.len() == self.capacity
            && let Some((_, evicted)) = self.frames.pop_front()
        {
            self.dropped_through = evicted.seq;
        }
        self.frames.push_back((target, frame));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Retained frames with `seq > last_seq` addressed to `socket`; `None`
    /// if some were evicted.
    #[must_use]
    pub fn since(&self, last_seq: u64, socket: SocketId) -> Option<Vec<Frame>> {
        if last_seq < self.dropped_through {
            return None;
        }
        Some(
            self.frames
                .iter()
                .filter(|(target, frame)| frame.seq > last_seq && target.includes(socket))
                .map(|(_, frame)| frame.clone())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fweb_core::protocol::NotifyOptions;

    fn state(id: ElementId, tag: &str) -> ElementState {
        ElementState {
            id,
            tag: tag.to_string(),
            text: None,
            classes: Vec::new(),
            style: Default::default(),
            props: Default::default(),
            slots: Default::default(),
            children: Vec::new(),
            events: Vec::new(),
            component: None,
            libraries: Vec::new(),
        }
    }

    fn notify(text: &str) -> Outbound {
        Outbound::Notify {
            options: NotifyOptions::new(text),
        }
    }

    fn socket(raw: u64) -> SocketId {
        SocketId::from_raw(raw)
    }

    #[test]
    fn updates_collapse_into_one_record_ahead_of_messages() {
        let mut outbox = Outbox::new(10);
        let a = ElementId::new(1);
        let b = ElementId::new(2);
        assert!(outbox.enqueue_update(a));
        assert!(outbox.enqueue_update(b));
        assert!(!outbox.enqueue_update(a));
        outbox.enqueue_message(notify("hi"), Target::Client);
        assert!(outbox.enqueue_update(ElementId::new(3)));
        outbox.enqueue_message(notify("bye"), Target::Client);
        assert_eq!(outbox.len(), 3);

        let frames = outbox.drain(|id| Some(state(id, "div")));
        let seqs: Vec<_> = frames.iter().map(|(_, f)| f.seq).collect();
        assert_eq!(seqs, [1, 2, 3]);
        match &frames[0].1.message {
            Outbound::Update { elements } => {
                assert_eq!(elements.keys().copied().collect::<Vec<_>>(), [a, b, ElementId::new(3)]);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(frames[1].1.message, notify("hi"));
        assert_eq!(frames[2].1.message, notify("bye"));
        assert!(outbox.is_empty());
        assert!(!outbox.is_queued(a));
    }

    #[test]
    fn children_queued_after_a_message_ship_with_their_parent() {
        let mut outbox = Outbox::new(10);
        let parent = ElementId::new(1);
        let child = ElementId::new(2);
        outbox.enqueue_update(parent);
        outbox.enqueue_message(notify("between"), Target::Client);
        outbox.enqueue_update(child);
        outbox.enqueue_update(parent);

        let frames = outbox.drain(|id| {
            let mut s = state(id, "div");
            if id == parent {
                s.children = vec![child];
            }
            Some(s)
        });
        assert_eq!(frames.len(), 2);
        let Outbound::Update { elements } = &frames[0].1.message else {
            panic!("expected update first");
        };
        for id in &elements[&parent].as_ref().unwrap().children {
            assert!(elements.contains_key(id));
        }
        assert_eq!(frames[1].1.message.kind(), "notify");
    }

    #[test]
    fn messages_alone_produce_no_update_record() {
        let mut outbox = Outbox::new(10);
        outbox.enqueue_message(notify("only"), Target::Client);
        let frames = outbox.drain(|id| Some(state(id, "div")));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].1.seq, 1);
    }

    #[test]
    fn deleted_elements_serialize_as_none() {
        let mut outbox = Outbox::new(10);
        outbox.enqueue_update(ElementId::new(7));
        let frames = outbox.drain(|_| None);
        let Outbound::Update { elements } = &frames[0].1.message else {
            panic!("expected update");
        };
        assert_eq!(elements[&ElementId::new(7)], None);
    }

    #[test]
    fn discard_updates_keeps_messages() {
        let mut outbox = Outbox::new(10);
        outbox.enqueue_update(ElementId::new(1));
        outbox.enqueue_message(notify("kept"), Target::Socket(socket(9)));
        outbox.discard_updates();
        let frames = outbox.drain(|id| Some(state(id, "div")));
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].0, Target::Socket(socket(9)));
    }

    #[test]
    fn replay_returns_newer_frames() {
        let mut outbox = Outbox::new(3);
        for i in 0..3 {
            outbox.enqueue_message(notify(&i.to_string()), Target::Client);
        }
        outbox.drain(|_| None);
        let replay = outbox.replay_since(1, socket(1)).unwrap();
        assert_eq!(replay.iter().map(|f| f.seq).collect::<Vec<_>>(), [2, 3]);
        assert!(outbox.replay_since(3, socket(1)).unwrap().is_empty());
        assert!(outbox.replay_since(0, socket(1)).is_some());
    }

    #[test]
    fn replay_skips_frames_addressed_to_other_sockets() {
        let mut outbox = Outbox::new(10);
        outbox.enqueue_message(notify("a only"), Target::Socket(socket(1)));
        outbox.enqueue_message(notify("everyone"), Target::Client);
        outbox.enqueue_message(notify("b only"), Target::Socket(socket(2)));
        outbox.drain(|_| None);

        let for_b = outbox.replay_since(0, socket(2)).unwrap();
        assert_eq!(for_b.iter().map(|f| f.seq).collect::<Vec<_>>(), [2, 3]);
        let for_new = outbox.replay_since(0, socket(3)).unwrap();
        assert_eq!(for_new.iter().map(|f| f.seq).collect::<Vec<_>>(), [2]);
    }

    #[test]
    fn replay_reports_exhaustion_after_eviction() {
        let mut outbox = Outbox::new(2);
        for i in 0..5 {
            outbox.enqueue_message(notify(&i.to_string()), Target::Client);
        }
        outbox.drain(|_| None);
        assert_eq!(outbox.history().len(), 2);
        assert!(outbox.replay_since(2, socket(1)).is_none());
        assert_eq!(outbox.replay_since(3, socket(1)).unwrap().len(), 2);
        assert!(outbox.replay_since(99, socket(1)).is_none());
    }

    #[test]
    fn zero_capacity_history_keeps_nothing() {
        let mut outbox = Outbox::new(0);
        outbox.enqueue_message(notify("x"), Target::Client);
        outbox.drain(|_| None);
        assert!(outbox.history().is_empty());
        assert!(outbox.replay_since(0, socket(1)).is_none());
        assert!(outbox.replay_since(1, socket(1)).unwrap().is_empty());
    }
}
