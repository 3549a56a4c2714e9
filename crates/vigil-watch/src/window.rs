//! Active-hours window, timezone aware, with support for windows that
//! wrap past midnight (e.g. 22:00-06:00).

use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;

/// Half-open `[start, end)` hour window in a fixed timezone.
///
/// `start == end` means the window covers the whole day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActiveWindow {
    start_hour: u32,
    end_hour: u32,
    tz: Tz,
}

impl ActiveWindow {
    /// Build a window. Out-of-range hours are clamped by modulo; there is
    /// no invalid input. `24` is kept as-is so `[0, 24)` reads naturally.
    pub fn new(start_hour: u32, end_hour: u32, tz: Tz) -> Self {
        Self {
            start_hour: clamp_hour(start_hour),
            end_hour: clamp_hour(end_hour),
            tz,
        }
    }

    /// Like [`ActiveWindow::new`], with the timezone given by name.
    pub fn with_timezone_name(start_hour: u32, end_hour: u32, timezone: &str) -> Self {
        Self::new(start_hour, end_hour, parse_timezone(timezone))
    }

    /// Is the window active right now?
    pub fn is_active_now(&self) -> bool {
        self.contains(Utc::now())
    }

    /// Is the window active at the given instant?
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        let hour = at.with_timezone(&self.tz).hour();
        hour_in_window(self.start_hour, self.end_hour, hour)
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

/// Parse a timezone name permissively: unknown names fall back to UTC
/// with a warning instead of failing startup.
pub fn parse_timezone(timezone: &str) -> Tz {
    match timezone.parse::<Tz>() {
        Ok(tz) => tz,
        Err(_) => {
            tracing::warn!(timezone, "unknown timezone, falling back to UTC");
            Tz::UTC
        }
    }
}

fn clamp_hour(hour: u32) -> u32 {
    if hour > 24 { hour % 24 } else { hour }
}

/// The pure window predicate over local hours.
fn hour_in_window(start: u32, end: u32, hour: u32) -> bool {
    if start == end {
        // Degenerate window reads as full coverage.
        return true;
    }
    if start < end {
        start <= hour && hour < end
    } else {
        // Wraps past midnight, e.g. 22-6.
        hour >= start || hour < end
    }
}
