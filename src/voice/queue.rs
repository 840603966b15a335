use std::collections::VecDeque;

use crate::coaching::{DeliveryStatus, FeedbackPrompt};
use crate::form::Severity;

pub const DEFAULT_QUEUE_CAPACITY: usize = 3;

/// What happened to a prompt offered to the queue.
#[derive(Debug, Clone, PartialEq)]
pub enum Admission {
    Queued { position: usize },
    /// Queued after pushing a lower-priority item out; `evicted` is marked skipped.
    Displaced { position: usize, evicted: FeedbackPrompt },
    /// Not queued; the prompt comes back marked skipped.
    Rejected(FeedbackPrompt),
}

impl Admission {
    pub fn is_queued(&self) -> bool {
        !matches!(self, Admission::Rejected(_))
    }
}

/// Bounded pending list ordered by severity. Critical items ignore the
/// bound; the bound applies to everything else.
#[derive(Debug, Clone)]
pub struct DeliveryQueue {
    items: VecDeque<FeedbackPrompt>,
    capacity: usize,
}

impl Default for DeliveryQueue {
    fn default() -> Self {
        Self::new(DEFAULT_QUEUE_CAPACITY)
    }
}

impl DeliveryQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            items: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FeedbackPrompt> {
        self.items.iter()
    }

    pub fn push(&mut self, mut prompt: FeedbackPrompt) -> Admission {
        prompt.status = DeliveryStatus::Queued;

        match prompt.severity {
            Severity::Critical => {
                self.items.push_front(prompt);
                Admission::Queued { position: 0 }
            }
            Severity::High => {
                let position = self
                    .items
                    .iter()
                    .take_while(|p| p.severity >= Severity::High)
                    .count();

                if self.items.len() < self.capacity {
                    self.items.insert(position, prompt);
                    return Admission::Queued { position };
                }

                // The evicted item always sits behind `position`.
                match self.last_low_priority().and_then(|i| self.items.remove(i)) {
                    Some(evicted) => {
                        self.items.insert(position, prompt);
                        Admission::Displaced {
                            position,
                            evicted: skipped(evicted),
                        }
                    }
                    None => Admission::Rejected(skipped(prompt)),
                }
            }
            Severity::Normal | Severity::Info => {
                if self.items.len() >= self.capacity {
                    return Admission::Rejected(skipped(prompt));
                }
                self.items.push_back(prompt);
                Admission::Queued {
                    position: self.items.len() - 1,
                }
            }
        }
    }

    pub fn pop_front(&mut self) -> Option<FeedbackPrompt> {
        self.items.pop_front()
    }

    /// Drops every pending non-critical prompt without marking it. Returns
    /// how many were dropped.
    pub fn clear_non_critical(&mut self) -> usize {
        let before = self.items.len();
        self.items.retain(|p| p.severity == Severity::Critical);
        before - self.items.len()
    }

    fn last_low_priority(&self) -> Option<usize> {
        self.items.iter().rposition(|p| p.severity < Severity::High)
    }
}

fn skipped(mut prompt: FeedbackPrompt) -> FeedbackPrompt {
    prompt.status = DeliveryStatus::Skipped;
    prompt
}
