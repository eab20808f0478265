//! Cosmetic playback of already-applied actions.
//!
//! The board is updated before anything is enqueued here; the queue only
//! paces how the presentation layer shows the transition. Navigation calls
//! [`PlaybackQueue::complete_all`] first so logical and visual state never
//! diverge.

use crate::action::Action;
use crate::observer::BoardEvent;
use std::collections::VecDeque;

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStep {
    pub label: String,
    /// Seconds left before the step is done.
    pub remaining: f32,
}

/// The steps showing one action, played in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackSequence {
    steps: VecDeque<PlaybackStep>,
}

impl PlaybackSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn step(mut self, label: impl Into<String>, seconds: f32) -> Self {
        self.steps.push_back(PlaybackStep {
            label: label.into(),
            remaining: seconds,
        });
        self
    }

    /// Path walk, then the main effect, then one flash per explosion.
    pub fn for_action(action: &Action, events: &[BoardEvent], step_seconds: f32) -> Self {
        let mut sequence = Self::new();
        if let Some(movement) = action.movement() {
            for tile in movement.path.iter().skip(1) {
                sequence = sequence.step(format!("move {}", tile), step_seconds);
            }
        }
        if !matches!(action, Action::Move(_) | Action::EndTurn { .. }) {
            sequence = sequence.step(action.name(), step_seconds * 3.0);
        }
        for event in events {
            if let BoardEvent::Explosion { at } = event {
                sequence = sequence.step(format!("explode {}", at), step_seconds * 5.0);
            }
        }
        sequence
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn current(&self) -> Option<&PlaybackStep> {
        self.steps.front()
    }
}

#[derive(Debug, Default)]
pub struct PlaybackQueue {
    sequences: VecDeque<PlaybackSequence>,
}

impl PlaybackQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, sequence: PlaybackSequence) {
        if !sequence.is_empty() {
            self.sequences.push_back(sequence);
        }
    }

    /// Spend `dt` seconds on the head sequence. Time left over after a step
    /// finishes carries into the next step of the same sequence only.
    /// Returns the number of steps finished.
    pub fn advance(&mut self, dt: f32) -> usize {
        let Some(head) = self.sequences.front_mut() else {
            return 0;
        };
        let mut budget = dt;
        let mut finished = 0;
        while let Some(step) = head.steps.front_mut() {
            step.remaining -= budget;
            if step.remaining > 0.0 {
                break;
            }
            budget = -step.remaining;
            head.steps.pop_front();
            finished += 1;
        }
        if head.is_empty() {
            self.sequences.pop_front();
        }
        finished
    }

    /// Finish everything synchronously. Returns the number of steps drained.
    pub fn complete_all(&mut self) -> usize {
        let drained = self.pending_steps();
        if drained > 0 {
            log::trace!("Fast-forwarding {} playback steps", drained);
        }
        self.sequences.clear();
        drained
    }

    pub fn is_idle(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn pending_steps(&self) -> usize {
        self.sequences.iter().map(PlaybackSequence::len).sum()
    }

    pub fn current(&self) -> Option<&PlaybackStep> {
        self.sequences.front().and_then(PlaybackSequence::current)
    }
}
