use std::fmt;
use std::sync::Arc;

use chrono::{NaiveDateTime, Utc};

/// Source of "current time" values for the `time` and `now` directives.
///
/// Defaults to the system clock in UTC. Tests usually pin it:
/// ```rust
/// use sql_template::prelude::*;
/// use chrono::NaiveDate;
///
/// let ts = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap().and_hms_opt(3, 4, 5).unwrap();
/// let clock = Clock::fixed(ts);
/// assert_eq!(clock.now(), ts);
/// ```
#[derive(Clone)]
pub struct Clock(Arc<dyn Fn() -> NaiveDateTime + Send + Sync>);

impl Clock {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> NaiveDateTime + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    #[must_use]
    pub fn system() -> Self {
        Self::new(|| Utc::now().naive_utc())
    }

    #[must_use]
    pub fn fixed(ts: NaiveDateTime) -> Self {
        Self::new(move || ts)
    }

    #[must_use]
    pub fn now(&self) -> NaiveDateTime {
        (self.0)()
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::system()
    }
}

impl fmt::Debug for Clock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Clock")
    }
}

/// Per-render time source: `time` is read once and cached, `now` is read on every call.
#[derive(Debug)]
pub(crate) struct Timer {
    clock: Clock,
    cache: Option<NaiveDateTime>,
    now_count: usize,
}

impl Timer {
    pub(crate) fn new(clock: Clock) -> Self {
        Self {
            clock,
            cache: None,
            now_count: 0,
        }
    }

    pub(crate) fn time(&mut self) -> NaiveDateTime {
        *self.cache.get_or_insert_with(|| self.clock.now())
    }

    /// Fresh reading plus its 1-based sequence number within the render.
    pub(crate) fn now(&mut self) -> (usize, NaiveDateTime) {
        self.now_count += 1;
        (self.now_count, self.clock.now())
    }
}
