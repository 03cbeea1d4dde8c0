use crate::{
    event::Event,
    platform::{Platform, WindowId},
};
use crossbeam_channel::{Sender, TrySendError};
use std::collections::{HashMap, VecDeque};
use tracing::trace;

/// Lookup of the event queue belonging to a window.
pub trait Sinks {
    fn sink(&self, id: WindowId) -> Option<&Sender<Event>>;
}

impl Sinks for HashMap<WindowId, Sender<Event>> {
    fn sink(&self, id: WindowId) -> Option<&Sender<Event>> {
        self.get(&id)
    }
}

struct Held {
    event: Event,
    polls: u32,
}

/// Moves native events into per-window queues.
///
/// Events for a window that is not registered yet are held and retried on
/// later poll steps. Once a window has a held event, its newer events queue
/// up behind it so a window always observes events in native order.
pub struct EventRouter {
    held: VecDeque<Held>,
    capacity: usize,
    max_polls: u32,
}

impl EventRouter {
    pub fn new(capacity: usize, max_polls: u32) -> Self {
        Self {
            held: VecDeque::with_capacity(capacity),
            capacity,
            max_polls,
        }
    }

    /// One poll step: replays held events, then drains the native queue.
    pub fn poll(&mut self, platform: &mut dyn Platform, sinks: &impl Sinks) {
        self.replay(sinks);
        while let Some(raw) = platform.poll_event() {
            match Event::from_raw(&raw) {
                Some(event) => self.route(event, sinks),
                None => trace!(kind = raw.kind, "discarding unsupported event"),
            }
        }
    }

    #[cfg(test)]
    fn held_len(&self) -> usize {
        self.held.len()
    }

    fn replay(&mut self, sinks: &impl Sinks) {
        for mut held in std::mem::take(&mut self.held) {
            let id = held.event.window_id();
            let blocked = self.is_held(id);
            match sinks.sink(id) {
                Some(sink) if !blocked => deliver(sink, held.event),
                _ => {
                    held.polls += 1;
                    if held.polls >= self.max_polls {
                        trace!(window = %id, event = ?held.event, "window never appeared, dropping event");
                    } else {
                        self.held.push_back(held);
                    }
                }
            }
        }
    }

    fn route(&mut self, event: Event, sinks: &impl Sinks) {
        let id = event.window_id();
        if !self.is_held(id) {
            if let Some(sink) = sinks.sink(id) {
                deliver(sink, event);
                return;
            }
        }
        if self.held.len() >= self.capacity {
            trace!(window = %id, ?event, "retry buffer full, dropping event");
            return;
        }
        self.held.push_back(Held { event, polls: 0 });
    }

    fn is_held(&self, id: WindowId) -> bool {
        self.held.iter().any(|held| held.event.window_id() == id)
    }
}

fn deliver(sink: &Sender<Event>, event: Event) {
    match sink.try_send(event) {
        Ok(()) => {}
        Err(TrySendError::Full(event)) => {
            trace!(window = %event.window_id(), ?event, "event queue full, dropping event")
        }
        Err(TrySendError::Disconnected(event)) => {
            trace!(window = %event.window_id(), ?event, "event queue closed, dropping event")
        }
    }
}
