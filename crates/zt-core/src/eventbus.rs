//! In-process topic-keyed event bus (C13).
//!
//! Each subscriber owns a bounded queue; a full queue drops its oldest
//! entry rather than blocking the publisher, incrementing `bus.drop`.
//! Delivery is at-most-once per subscriber with per-topic ordering.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;

const DEFAULT_QUEUE_CAPACITY: usize = 1024;

#[derive(Debug, Clone)]
pub struct Event {
    pub topic: String,
    pub payload: Value,
}

struct Subscriber {
    queue: Mutex<VecDeque<Event>>,
    capacity: usize,
}

pub struct EventBus {
    subscribers: DashMap<String, Subscriber>,
    topic_subscribers: DashMap<String, Vec<String>>,
    dropped: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscribers: DashMap::new(),
            topic_subscribers: DashMap::new(),
            dropped: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self, subscriber_id: &str, topic: &str) {
        self.subscribers.entry(subscriber_id.to_string()).or_insert_with(|| Subscriber {
            queue: Mutex::new(VecDeque::new()),
            capacity: DEFAULT_QUEUE_CAPACITY,
        });
        let mut topics = self.topic_subscribers.entry(topic.to_string()).or_default();
        if !topics.contains(&subscriber_id.to_string()) {
            topics.push(subscriber_id.to_string());
        }
    }

    /// Fans `event` out to every subscriber of its topic. A full queue
    /// drops its own oldest entry and bumps the drop counter — the
    /// publisher is never blocked.
    pub fn publish(&self, event: Event) {
        let Some(subscriber_ids) = self.topic_subscribers.get(&event.topic) else {
            return;
        };

        for subscriber_id in subscriber_ids.iter() {
            if let Some(subscriber) = self.subscribers.get(subscriber_id) {
                let mut queue = subscriber.queue.lock();
                if queue.len() >= subscriber.capacity {
                    queue.pop_front();
                    self.dropped.fetch_add(1, Ordering::Relaxed);
                }
                queue.push_back(event.clone());
            }
        }
    }

    /// Drains the next queued event for `subscriber_id`, oldest first.
    pub fn poll(&self, subscriber_id: &str) -> Option<Event> {
        let subscriber = self.subscribers.get(subscriber_id)?;
        subscriber.queue.lock().pop_front()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn subscriber_receives_events_in_order() {
        let bus = EventBus::new();
        bus.subscribe("sub1", "decision.made");
        bus.publish(Event { topic: "decision.made".to_string(), payload: json!({"n": 1}) });
        bus.publish(Event { topic: "decision.made".to_string(), payload: json!({"n": 2}) });

        assert_eq!(bus.poll("sub1").unwrap().payload, json!({"n": 1}));
        assert_eq!(bus.poll("sub1").unwrap().payload, json!({"n": 2}));
        assert!(bus.poll("sub1").is_none());
    }

    #[test]
    fn unrelated_topic_is_not_delivered() {
        let bus = EventBus::new();
        bus.subscribe("sub1", "decision.made");
        bus.publish(Event { topic: "session.terminated".to_string(), payload: json!({}) });
        assert!(bus.poll("sub1").is_none());
    }

    #[test]
    fn full_queue_drops_oldest_and_counts_it() {
        let bus = EventBus::new();
        bus.subscribe("sub1", "decision.made");
        for i in 0..(DEFAULT_QUEUE_CAPACITY + 5) {
            bus.publish(Event { topic: "decision.made".to_string(), payload: json!({"n": i}) });
        }
        assert_eq!(bus.dropped_count(), 5);
        assert_eq!(bus.poll("sub1").unwrap().payload, json!({"n": 5}));
    }
}
