//! Debounce and staleness guards for picker re-filtering.
//!
//! Typing produces a burst of edits; only the text that survives a quiet
//! period is filtered. Each filter run (and each resolution) takes a
//! generation ticket, and a finished request is applied only if its ticket is
//! still the newest one issued.

use tokio::time::{Duration, Instant};

/// Token handed out when a request is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Ticket(u64);

/// Monotonic request counter.
#[derive(Debug, Default)]
pub struct Generation {
    current: u64,
}

impl Generation {
    pub fn issue(&mut self) -> Ticket {
        self.current += 1;
        Ticket(self.current)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.current
    }
}

/// Coalesces filter-text edits.
#[derive(Debug)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
    pending: Option<String>,
    /// Text of the last filter that actually ran.
    last_run: Option<String>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
            pending: None,
            last_run: None,
        }
    }

    /// Record an edit; pushes the deadline out to `now + delay`.
    pub fn edit(&mut self, text: impl Into<String>, now: Instant) {
        self.pending = Some(text.into());
        self.deadline = Some(now + self.delay);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Text to filter now, if the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<String> {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                let text = self.pending.take()?;
                self.run(text)
            }
            _ => None,
        }
    }

    /// Explicit submission: skip the quiet period.
    pub fn submit(&mut self, text: impl Into<String>) -> Option<String> {
        self.deadline = None;
        self.pending = None;
        self.run(text.into())
    }

    /// Forget the last run so the next request filters even if the text is
    /// unchanged (the catalog itself changed).
    pub fn invalidate(&mut self) {
        self.last_run = None;
    }

    fn run(&mut self, text: String) -> Option<String> {
        if self.last_run.as_deref() == Some(text.as_str()) {
            return None;
        }
        self.last_run = Some(text.clone());
        Some(text)
    }
}
