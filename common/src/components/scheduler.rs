// Copyright (c) 2024 Leela Aurelia, git@elia.garden
//
// Unless otherwise noted, this file is released and thus subject to the
// terms of the Mozilla Public License Version 2.0 (MPL-2.0) or the
// GNU General Public License Version 3 (GPL-3).
// If a copy of these licenses was not distributed with this file, you can
// obtain them at https://mozilla.org/MPL/2.0/ and http://www.gnu.org/licenses/.

use arrayvec::ArrayVec;
use thiserror::Error;

/// Time in scheduler ticks. One tick is one ARM9 cycle.
pub type Time = u64;

/// Maximum amount of events that can be pending at once.
const MAX_EVENTS: usize = 32;

/// An event could not be scheduled since the queue is full.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
#[error("cannot schedule event, {} events are already pending", MAX_EVENTS)]
pub struct SchedulerFull;

/// A scheduler used by the console to interleave both processors with
/// timed events. It is generic over the possible events and keeps them
/// sorted with the next event to fire at the end.
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Scheduler<E: Kind> {
    /// Current time of the scheduler.
    time: Time,
    /// Events currently awaiting execution, latest first.
    #[cfg_attr(feature = "serde", serde(bound = ""))]
    events: ArrayVec<ScheduledEvent<E>, MAX_EVENTS>,
}

impl<E: Kind> Scheduler<E> {
    /// Schedule an event of the given kind after the given amount
    /// of ticks have elapsed from now.
    /// An identical event already pending at the same time is not
    /// scheduled twice.
    pub fn schedule(&mut self, kind: E, after: Time) -> Result<(), SchedulerFull> {
        let execute_at = self.time + after;
        if self
            .events
            .iter()
            .any(|e| e.execute_at == execute_at && e.kind == kind)
        {
            return Ok(());
        }

        let idx = self
            .events
            .iter()
            .position(|e| e.execute_at <= execute_at)
            .unwrap_or(self.events.len());
        self.events
            .try_insert(idx, ScheduledEvent { kind, execute_at })
            .map_err(|_| SchedulerFull)
    }

    /// Advance the timer by the given amount of ticks.
    #[inline]
    pub fn advance(&mut self, by: Time) {
        self.time += by;
    }

    /// Take the next event if it is due.
    #[inline]
    pub fn get_next_pending(&mut self) -> Option<Event<E>> {
        if !self.has_events() {
            return None;
        }
        self.events.pop().map(|event| Event {
            kind: event.kind,
            late_by: self.time - event.execute_at,
        })
    }

    /// Is there an event that is due?
    #[inline]
    pub fn has_events(&self) -> bool {
        self.events
            .last()
            .is_some_and(|e| e.execute_at <= self.time)
    }

    /// Ticks until the next event is due, if there is one.
    /// Used to skip ahead while a processor waits for an interrupt.
    pub fn next_event_in(&self) -> Option<Time> {
        self.events
            .last()
            .map(|e| e.execute_at.saturating_sub(self.time))
    }

    /// Cancel all events of a given type.
    pub fn cancel(&mut self, evt: E) {
        self.events.retain(|e| e.kind != evt);
    }

    #[inline]
    pub fn now(&self) -> Time {
        self.time
    }
}

impl<E: Kind> Default for Scheduler<E> {
    fn default() -> Self {
        Self {
            time: 0,
            events: ArrayVec::new(),
        }
    }
}

/// An event awaiting execution
#[derive(Copy, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
struct ScheduledEvent<E: Kind> {
    #[cfg_attr(feature = "serde", serde(bound = ""))]
    kind: E,
    execute_at: Time,
}

/// Trait for event kinds.
#[cfg(feature = "serde")]
pub trait Kind:
    for<'de> serde::Deserialize<'de> + serde::Serialize + PartialEq + Copy + Clone
{
}
#[cfg(not(feature = "serde"))]
pub trait Kind: PartialEq + Copy + Clone {}

/// Event that is ready to be handled.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Event<E: Kind> {
    /// The kind of event to handle
    pub kind: E,
    /// By how many ticks the event was delayed by.
    pub late_by: Time,
}
