//! Weekly operating hours of a location.

use serde::{Deserialize, Serialize};

use crate::validation::{FieldErrors, ValidationError, minutes_of_day};

/// Opening hours for one day.
///
/// A `close` of `00:00` means midnight, so `18:00`-`00:00` is valid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DaySchedule {
    pub open: String,
    pub close: String,
    #[serde(default)]
    pub closed: bool,
}

impl DaySchedule {
    #[must_use]
    pub fn open_between(open: &str, close: &str) -> Self {
        Self {
            open: open.to_owned(),
            close: close.to_owned(),
            closed: false,
        }
    }

    #[must_use]
    pub fn closed() -> Self {
        Self {
            open: "00:00".to_owned(),
            close: "00:00".to_owned(),
            closed: true,
        }
    }

    /// Validate this schedule, reporting errors under `prefix.open` /
    /// `prefix.close`.
    pub fn validate_into(&self, prefix: &str, errors: &mut FieldErrors) {
        if self.closed {
            return;
        }
        let open = minutes_of_day(&self.open);
        let close = minutes_of_day(&self.close).map(|m| if m == 0 { 24 * 60 } else { m });
        if open.is_none() {
            errors.insert(format!("{prefix}.open"), ValidationError::InvalidTime);
        }
        if close.is_none() {
            errors.insert(format!("{prefix}.close"), ValidationError::InvalidTime);
        }
        if let (Some(open), Some(close)) = (open, close)
            && open >= close
        {
            errors.insert(format!("{prefix}.close"), ValidationError::OpenAfterClose);
        }
    }
}

/// Operating hours for each weekday plus public holidays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatingHours {
    pub monday: DaySchedule,
    pub tuesday: DaySchedule,
    pub wednesday: DaySchedule,
    pub thursday: DaySchedule,
    pub friday: DaySchedule,
    pub saturday: DaySchedule,
    pub sunday: DaySchedule,
    pub holidays: DaySchedule,
}

impl OperatingHours {
    /// Schedules keyed by their field name, weekdays first.
    #[must_use]
    pub fn days(&self) -> [(&'static str, &DaySchedule); 8] {
        [
            ("monday", &self.monday),
            ("tuesday", &self.tuesday),
            ("wednesday", &self.wednesday),
            ("thursday", &self.thursday),
            ("friday", &self.friday),
            ("saturday", &self.saturday),
            ("sunday", &self.sunday),
            ("holidays", &self.holidays),
        ]
    }

    /// Check every day.
    ///
    /// # Errors
    ///
    /// Returns errors keyed by `<day>.open` / `<day>.close`.
    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        for (day, schedule) in self.days() {
            schedule.validate_into(day, &mut errors);
        }
        errors.into_result()
    }
}

impl Default for OperatingHours {
    fn default() -> Self {
        let day = DaySchedule::open_between("11:00", "23:00");
        Self {
            monday: day.clone(),
            tuesday: day.clone(),
            wednesday: day.clone(),
            thursday: day.clone(),
            friday: day.clone(),
            saturday: day.clone(),
            sunday: day,
            holidays: DaySchedule::closed(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(OperatingHours::default().validate().is_ok());
    }

    #[test]
    fn test_midnight_close() {
        let mut hours = OperatingHours::default();
        hours.friday = DaySchedule::open_between("18:00", "00:00");
        assert!(hours.validate().is_ok());
    }

    #[test]
    fn test_open_after_close() {
        let mut hours = OperatingHours::default();
        hours.monday = DaySchedule::open_between("22:00", "10:00");
        let errors = hours.validate().unwrap_err();
        assert_eq!(
            errors.get("monday.close"),
            Some(ValidationError::OpenAfterClose.to_string().as_str())
        );
    }

    #[test]
    fn test_closed_day_skips_times() {
        let mut hours = OperatingHours::default();
        hours.sunday = DaySchedule {
            open: "garbage".to_owned(),
            close: String::new(),
            closed: true,
        };
        assert!(hours.validate().is_ok());
    }

    #[test]
    fn test_invalid_time_format() {
        let mut hours = OperatingHours::default();
        hours.tuesday.open = "7h".to_owned();
        let errors = hours.validate().unwrap_err();
        assert!(errors.get("tuesday.open").is_some());
        assert_eq!(errors.len(), 1);
    }
}
