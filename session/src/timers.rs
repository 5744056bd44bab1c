//! One-shot cancellable timers advanced by the session tick.

use std::time::Duration;

/// Handle of a scheduled timer, used to cancel it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug)]
struct Pending<A> {
    id: TimerId,
    remaining: Duration,
    action: A,
}

/// Queue of delayed actions that fire once after their delay elapses.
#[derive(Debug)]
pub struct Timers<A> {
    next_id: u64,
    pending: Vec<Pending<A>>,
}

impl<A> Default for Timers<A> {
    fn default() -> Self {
        Self {
            next_id: 0,
            pending: Vec::new(),
        }
    }
}

impl<A> Timers<A> {
    /// Creates an empty timer queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `action` to fire once `delay` of simulated time has elapsed.
    pub fn schedule(&mut self, delay: Duration, action: A) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.pending.push(Pending {
            id,
            remaining: delay,
            action,
        });
        id
    }

    /// Drops a pending timer. Returns `false` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        match self.pending.iter().position(|timer| timer.id == id) {
            Some(index) => {
                let _ = self.pending.remove(index);
                true
            }
            None => false,
        }
    }

    /// Reports whether `id` is still waiting to fire.
    #[must_use]
    pub fn is_pending(&self, id: TimerId) -> bool {
        self.pending.iter().any(|timer| timer.id == id)
    }

    /// Advances every timer by `dt` and appends the actions that came due.
    ///
    /// Due actions are emitted in deadline order; timers that fall due on the
    /// same tick keep their scheduling order.
    pub fn advance(&mut self, dt: Duration, fired: &mut Vec<A>) {
        let mut due: Vec<(Duration, Pending<A>)> = Vec::new();
        let mut index = 0;
        while index < self.pending.len() {
            let timer = &mut self.pending[index];
            if timer.remaining <= dt {
                let overshoot = dt - timer.remaining;
                due.push((overshoot, self.pending.remove(index)));
            } else {
                timer.remaining -= dt;
                index += 1;
            }
        }

        due.sort_by(|(left, a), (right, b)| right.cmp(left).then(a.id.cmp(&b.id)));
        fired.extend(due.into_iter().map(|(_, timer)| timer.action));
    }

    /// Number of timers waiting to fire.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Reports whether no timer is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drops every pending timer.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
