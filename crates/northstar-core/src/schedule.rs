use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::NorthstarError;

/// Category handled by the timer (cron) scheduler
pub const TIMER_EVENT: &str = "Timer";
/// Category handled by the device event scheduler
pub const DEVICE_EVENT: &str = "Device";

/// The event or time that triggers a transformation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub event: Event,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Scheduler category, e.g. "Timer" or "Device"
    pub category: String,
    pub name: String,
    /// Cron expression for timer events
    #[serde(default)]
    pub value: String,
}

impl Schedule {
    pub fn new(category: &str, name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            event: Event {
                category: category.to_string(),
                name: name.into(),
                value: value.into(),
            },
            ..Default::default()
        }
    }

    pub fn category(&self) -> &str {
        &self.event.category
    }

    /// Check the fields every category needs. Whether the category itself
    /// is supported is decided by the scheduler registry.
    pub fn validate(&self) -> Result<(), NorthstarError> {
        if self.event.name.is_empty() {
            return Err(NorthstarError::BadRequest("The event name is missing.".to_string()));
        }

        if self.event.category == TIMER_EVENT && self.event.value.is_empty() {
            return Err(NorthstarError::BadRequest(
                "The timer event value is missing.".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(Schedule::new(TIMER_EVENT, "hourly", "0 0 * * * *").validate().is_ok());
        assert!(Schedule::new(DEVICE_EVENT, "door-open", "").validate().is_ok());
        assert!(Schedule::new(TIMER_EVENT, "hourly", "").validate().is_err());
        assert!(Schedule::new(DEVICE_EVENT, "", "").validate().is_err());
    }

    #[test]
    fn test_wire_format() {
        let schedule: Schedule = serde_json::from_value(serde_json::json!({
            "event": { "category": "Device", "name": "door-open" }
        }))
        .unwrap();
        assert_eq!(schedule.category(), DEVICE_EVENT);
        assert_eq!(schedule.event.value, "");

        let json = serde_json::to_value(Schedule::new(TIMER_EVENT, "hourly", "0 * * * *")).unwrap();
        assert!(json.get("id").is_none());
        assert_eq!(json["event"]["value"], "0 * * * *");
    }
}
