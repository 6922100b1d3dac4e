//! Appointment time windows and slot labels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Patient-preferred part of the day.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum TimeWindow {
    Morning,
    Afternoon,
    Evening,
}

impl TimeWindow {
    /// Display label used on the intake form.
    pub fn label(&self) -> &'static str {
        match self {
            TimeWindow::Morning => "Morning (8AM - 12PM)",
            TimeWindow::Afternoon => "Afternoon (12PM - 4PM)",
            TimeWindow::Evening => "Evening (4PM - 8PM)",
        }
    }

    /// Parse a window name or form label. Unknown labels fall back to Morning.
    pub fn from_label(label: &str) -> Self {
        let lower = label.trim().to_lowercase();
        if lower.starts_with("afternoon") {
            TimeWindow::Afternoon
        } else if lower.starts_with("evening") {
            TimeWindow::Evening
        } else {
            TimeWindow::Morning
        }
    }

    /// The four discrete slots of this window, earliest first.
    pub fn slots(&self) -> [SlotTime; 4] {
        match self {
            TimeWindow::Morning => [
                SlotTime::on_the_hour(8, Period::Am),
                SlotTime::on_the_hour(9, Period::Am),
                SlotTime::on_the_hour(10, Period::Am),
                SlotTime::on_the_hour(11, Period::Am),
            ],
            TimeWindow::Afternoon => [
                SlotTime::on_the_hour(12, Period::Pm),
                SlotTime::on_the_hour(1, Period::Pm),
                SlotTime::on_the_hour(2, Period::Pm),
                SlotTime::on_the_hour(3, Period::Pm),
            ],
            TimeWindow::Evening => [
                SlotTime::on_the_hour(4, Period::Pm),
                SlotTime::on_the_hour(5, Period::Pm),
                SlotTime::on_the_hour(6, Period::Pm),
                SlotTime::on_the_hour(7, Period::Pm),
            ],
        }
    }
}

/// AM/PM token of a 12-hour clock label.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Period {
    Am,
    Pm,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Am => "AM",
            Period::Pm => "PM",
        }
    }
}

/// A slot label on the 12-hour clock, e.g. "9:00 AM".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SlotTime {
    /// 1..=12
    pub hour: u8,
    /// 0..=59
    pub minute: u8,
    pub period: Period,
}

impl SlotTime {
    pub fn on_the_hour(hour: u8, period: Period) -> Self {
        Self {
            hour,
            minute: 0,
            period,
        }
    }

    /// One hour later on the 12-hour clock. Hour 12 wraps to 1 and the
    /// period token is kept as is.
    pub fn next_hour(&self) -> Self {
        let hour = if self.hour >= 12 { 1 } else { self.hour + 1 };
        Self { hour, ..*self }
    }
}

impl fmt::Display for SlotTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{:02} {}", self.hour, self.minute, self.period.as_str())
    }
}

impl FromStr for SlotTime {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split_whitespace();
        let (Some(time), Some(period), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(format!("malformed slot label: {:?}", s));
        };

        let period = match period.to_uppercase().as_str() {
            "AM" => Period::Am,
            "PM" => Period::Pm,
            _ => return Err(format!("malformed slot period: {:?}", s)),
        };

        let (hour, minute) = time
            .split_once(':')
            .ok_or_else(|| format!("malformed slot time: {:?}", s))?;
        let hour: u8 = hour
            .parse()
            .map_err(|_| format!("malformed slot hour: {:?}", s))?;
        let minute: u8 = minute
            .parse()
            .map_err(|_| format!("malformed slot minute: {:?}", s))?;

        if !(1..=12).contains(&hour) || minute > 59 {
            return Err(format!("slot out of range: {:?}", s));
        }

        Ok(Self {
            hour,
            minute,
            period,
        })
    }
}
