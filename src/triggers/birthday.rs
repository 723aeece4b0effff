//! Birthday check, evaluated once at start-up against the host clock.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CalendarDay {
    /// 1-12
    pub month: u32,
    pub day: u32,
}

/// Source of "today" in the host's local time.
pub trait Clock {
    fn today(&self) -> CalendarDay;
}

/// Clock pinned to one day, for tests and previews.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub CalendarDay);

impl Clock for FixedClock {
    fn today(&self) -> CalendarDay {
        self.0
    }
}

pub fn is_match(month: u32, day: u32, clock: &dyn Clock) -> bool {
    let today = clock.today();
    today.month == month && today.day == day
}

pub fn birthday_greeting(name: &str, month: u32, day: u32, clock: &dyn Clock) -> Option<String> {
    is_match(month, day, clock).then(|| format!("Happy Birthday, {name}! 🎂"))
}
