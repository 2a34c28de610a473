use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{NorthstarError, StoreError};
use crate::limits::ExecutionLimits;
use crate::schedule::{Schedule, DEVICE_EVENT, TIMER_EVENT};

const MEGABYTE: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CodeType {
    /// Code stored in object storage, referenced by URL
    Object,
    /// Inline source code
    #[default]
    Source,
}

impl CodeType {
    pub fn scheme(&self) -> &'static str {
        match self {
            CodeType::Object => "s3",
            CodeType::Source => "base64",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Code {
    #[serde(rename = "type")]
    pub code_type: CodeType,
    pub value: String,
    #[serde(skip)]
    pub url: String,
}

/// A schedulable unit of code.
///
/// `scheduled`, `scheduler_type` and `scheduler_id` change together through
/// [`Transformation::mark_scheduled`] and [`Transformation::mark_unscheduled`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transformation {
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub account_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_on: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_updated: Option<DateTime<Utc>>,
    pub name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    /// Read only. Ignored on create and update.
    #[serde(default)]
    pub scheduled: bool,
    #[serde(default)]
    pub schedule: Option<Schedule>,
    /// Seconds
    #[serde(default)]
    pub timeout: i64,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub arguments: serde_json::Map<String, serde_json::Value>,
    pub entry_point: String,
    pub language: String,
    pub code: Code,
    /// MB
    #[serde(default)]
    pub memory: u64,

    #[serde(skip)]
    pub scheduler_type: String,
    #[serde(skip)]
    pub scheduler_id: String,
    /// Snippet version this value was read at
    #[serde(skip)]
    pub version: i64,
}

impl Transformation {
    pub fn mark_scheduled(&mut self, scheduler_type: &str, scheduler_id: &str) {
        self.scheduled = true;
        self.scheduler_type = scheduler_type.to_string();
        self.scheduler_id = scheduler_id.to_string();
    }

    pub fn mark_unscheduled(&mut self) {
        self.scheduled = false;
        self.scheduler_type.clear();
        self.scheduler_id.clear();
        self.schedule = None;
    }

    /// Check required fields and bounds, filling in default timeout and memory
    pub fn validate(&mut self, limits: &ExecutionLimits) -> Result<(), NorthstarError> {
        if self.name.is_empty() {
            return Err(NorthstarError::BadRequest("The name is missing.".to_string()));
        }
        if self.language.is_empty() {
            return Err(NorthstarError::BadRequest(
                "The language is missing or invalid.".to_string(),
            ));
        }
        if self.entry_point.is_empty() {
            return Err(NorthstarError::BadRequest("The entry point is missing.".to_string()));
        }

        if self.memory == 0 {
            self.memory = limits.default_memory;
        }
        if self.memory > limits.max_memory {
            return Err(NorthstarError::BadRequest(format!(
                "The requested memory {} is greater than the max of: {}",
                self.memory, limits.max_memory
            )));
        }

        if self.timeout <= 0 {
            self.timeout = limits.max_timeout;
        }
        if self.timeout > limits.max_timeout {
            return Err(NorthstarError::BadRequest(format!(
                "The timeout value is out of range ({} of {}).",
                self.timeout, limits.max_timeout
            )));
        }

        if self.code.value.is_empty() {
            return Err(NorthstarError::BadRequest("The code value is empty.".to_string()));
        }
        if self.code.code_type == CodeType::Source && self.code.value.len() > limits.max_code_size {
            return Err(NorthstarError::BadRequest("The code value is too large.".to_string()));
        }

        Ok(())
    }

    /// Build the API representation from a stored snippet
    pub fn from_snippet(snippet: &Snippet) -> Self {
        let source_url = format!("{}://code", CodeType::Source.scheme());
        let mut code = Code {
            code_type: CodeType::Source,
            value: snippet.code.clone(),
            url: source_url,
        };

        let scheme = snippet.url.split_once("://").map(|(scheme, _)| scheme);
        if scheme == Some(CodeType::Object.scheme()) {
            code.code_type = CodeType::Object;
            code.url = snippet.code.clone();
        }

        let mut transformation = Transformation {
            id: snippet.id.clone(),
            created_on: Some(snippet.created_on),
            last_updated: Some(snippet.updated_on),
            name: snippet.name.clone(),
            description: snippet.description.clone(),
            timeout: snippet.timeout / 1000,
            arguments: snippet.arguments.clone(),
            entry_point: snippet.main_fn.clone(),
            language: snippet.runtime.clone(),
            code,
            memory: snippet.memory / MEGABYTE,
            version: snippet.version,
            ..Default::default()
        };

        match snippet.event_type.category() {
            Some(category) if !snippet.event_id.is_empty() => {
                transformation.mark_scheduled(category, &snippet.event_id);
            }
            _ => transformation.mark_unscheduled(),
        }

        transformation
    }

    /// Build the stored snippet. Fails when the transformation is scheduled
    /// under a category the snippet store cannot represent.
    pub fn to_snippet(&self) -> Result<Snippet, NorthstarError> {
        let event_type = if self.scheduled {
            EventType::from_category(&self.scheduler_type).ok_or_else(|| {
                NorthstarError::Internal(format!(
                    "scheduler type '{}' has no snippet event type",
                    self.scheduler_type
                ))
            })?
        } else {
            EventType::None
        };

        let url = match self.code.code_type {
            CodeType::Object => self.code.value.clone(),
            CodeType::Source => format!("{}://code", CodeType::Source.scheme()),
        };

        let timeout = self.timeout.checked_mul(1000).ok_or_else(|| {
            NorthstarError::BadRequest(format!("The timeout value {} is too large.", self.timeout))
        })?;
        let memory = self.memory.checked_mul(MEGABYTE).ok_or_else(|| {
            NorthstarError::BadRequest(format!("The requested memory {} is too large.", self.memory))
        })?;
        let now = Utc::now();

        Ok(Snippet {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            runtime: self.language.clone(),
            main_fn: self.entry_point.clone(),
            url,
            code: self.code.value.clone(),
            arguments: self.arguments.clone(),
            timeout,
            memory,
            event_type,
            event_id: if self.scheduled {
                self.scheduler_id.clone()
            } else {
                String::new()
            },
            created_on: self.created_on.unwrap_or(now),
            updated_on: now,
            version: self.version,
        })
    }
}

/// How a snippet is triggered, as recorded by the snippet store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[default]
    None,
    Timer,
    Device,
}

impl EventType {
    pub fn from_category(category: &str) -> Option<Self> {
        match category {
            TIMER_EVENT => Some(EventType::Timer),
            DEVICE_EVENT => Some(EventType::Device),
            _ => None,
        }
    }

    pub fn category(&self) -> Option<&'static str> {
        match self {
            EventType::None => None,
            EventType::Timer => Some(TIMER_EVENT),
            EventType::Device => Some(DEVICE_EVENT),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::None => "None",
            EventType::Timer => "Timer",
            EventType::Device => "Device",
        }
    }

    /// Parse the stored form. Unknown values read as `None`.
    pub fn parse(value: &str) -> Self {
        match value {
            "Timer" => EventType::Timer,
            "Device" => EventType::Device,
            _ => EventType::None,
        }
    }
}

/// A transformation as held by the snippet store
#[derive(Debug, Clone, PartialEq)]
pub struct Snippet {
    pub id: String,
    pub name: String,
    pub description: String,
    pub runtime: String,
    pub main_fn: String,
    pub url: String,
    pub code: String,
    pub arguments: serde_json::Map<String, serde_json::Value>,
    /// Milliseconds
    pub timeout: i64,
    /// Bytes
    pub memory: u64,
    pub event_type: EventType,
    pub event_id: String,
    pub created_on: DateTime<Utc>,
    pub updated_on: DateTime<Utc>,
    pub version: i64,
}

/// Per-account store of snippets
#[async_trait]
pub trait SnippetStore: Send + Sync {
    /// Store a new snippet, returning the assigned id
    async fn add_snippet(&self, account_id: &str, snippet: &Snippet) -> Result<String, StoreError>;

    async fn get_snippet(&self, account_id: &str, id: &str) -> Result<Snippet, StoreError>;

    async fn get_snippets(&self, account_id: &str) -> Result<Vec<Snippet>, StoreError>;

    /// Replace `snippet.id` if its stored version is still `expected_version`.
    /// Returns the new version.
    async fn update_snippet(
        &self,
        account_id: &str,
        snippet: &Snippet,
        expected_version: i64,
    ) -> Result<i64, StoreError>;

    async fn delete_snippet(&self, account_id: &str, id: &str) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snippet(url: &str, event_type: EventType, event_id: &str) -> Snippet {
        let now = Utc::now();
        Snippet {
            id: "s123".to_string(),
            name: "name".to_string(),
            description: String::new(),
            runtime: "runtime".to_string(),
            main_fn: "main".to_string(),
            url: url.to_string(),
            code: "code".to_string(),
            arguments: Default::default(),
            timeout: 1000,
            memory: 512 * MEGABYTE,
            event_type,
            event_id: event_id.to_string(),
            created_on: now,
            updated_on: now,
            version: 2,
        }
    }

    #[test]
    fn test_from_snippet_source_device() {
        let t = Transformation::from_snippet(&snippet("base64://code", EventType::Device, "d123"));
        assert_eq!(t.code.code_type, CodeType::Source);
        assert_eq!(t.code.url, "base64://code");
        assert_eq!(t.code.value, "code");
        assert!(t.scheduled);
        assert_eq!(t.scheduler_type, DEVICE_EVENT);
        assert_eq!(t.scheduler_id, "d123");
        assert_eq!(t.timeout, 1);
        assert_eq!(t.memory, 512);
        assert_eq!(t.version, 2);
    }

    #[test]
    fn test_from_snippet_object_timer() {
        let t = Transformation::from_snippet(&snippet("s3://bucket/container", EventType::Timer, "t123"));
        assert_eq!(t.code.code_type, CodeType::Object);
        assert_eq!(t.code.url, "code");
        assert!(t.scheduled);
        assert_eq!(t.scheduler_type, TIMER_EVENT);
        assert_eq!(t.scheduler_id, "t123");
    }

    #[test]
    fn test_from_snippet_unscheduled() {
        for (event_type, event_id) in [(EventType::None, ""), (EventType::None, "stale"), (EventType::Timer, "")] {
            let t = Transformation::from_snippet(&snippet("s3://bucket", event_type, event_id));
            assert!(!t.scheduled);
            assert_eq!(t.scheduler_type, "");
            assert_eq!(t.scheduler_id, "");
        }
    }

    #[test]
    fn test_to_snippet() {
        let mut t = Transformation::from_snippet(&snippet("base64://code", EventType::None, ""));
        let s = t.to_snippet().unwrap();
        assert_eq!(s.event_type, EventType::None);
        assert_eq!(s.event_id, "");
        assert_eq!(s.url, "base64://code");
        assert_eq!(s.timeout, 1000);
        assert_eq!(s.memory, 512 * MEGABYTE);

        t.mark_scheduled(TIMER_EVENT, "job-1");
        let s = t.to_snippet().unwrap();
        assert_eq!(s.event_type, EventType::Timer);
        assert_eq!(s.event_id, "job-1");

        t.code = Code {
            code_type: CodeType::Object,
            value: "s3://bucket/key".to_string(),
            url: String::new(),
        };
        assert_eq!(t.to_snippet().unwrap().url, "s3://bucket/key");

        t.mark_scheduled("Webhook", "w1");
        assert!(matches!(t.to_snippet(), Err(NorthstarError::Internal(_))));
    }

    #[test]
    fn test_validate() {
        let limits = ExecutionLimits::default();
        let base = Transformation {
            name: "t".to_string(),
            language: "python".to_string(),
            entry_point: "main".to_string(),
            code: Code {
                code_type: CodeType::Source,
                value: "def main(): pass".to_string(),
                url: String::new(),
            },
            ..Default::default()
        };

        let mut t = base.clone();
        t.validate(&limits).unwrap();
        assert_eq!(t.memory, limits.default_memory);
        assert_eq!(t.timeout, limits.max_timeout);

        let mut t = base.clone();
        t.name.clear();
        assert!(t.validate(&limits).is_err());

        let mut t = base.clone();
        t.language.clear();
        assert!(t.validate(&limits).is_err());

        let mut t = base.clone();
        t.entry_point.clear();
        assert!(t.validate(&limits).is_err());

        let mut t = base.clone();
        t.memory = limits.max_memory + 1;
        assert!(t.validate(&limits).is_err());

        let mut t = base.clone();
        t.timeout = limits.max_timeout + 1;
        assert!(t.validate(&limits).is_err());

        let mut t = base;
        t.code.value.clear();
        assert!(t.validate(&limits).is_err());
    }

    #[test]
    fn test_oversized_units_are_rejected() {
        let mut t = Transformation {
            memory: u64::MAX / 2,
            ..Default::default()
        };
        assert!(matches!(t.to_snippet(), Err(NorthstarError::BadRequest(_))));

        t.memory = 512;
        t.timeout = i64::MAX / 10;
        assert!(matches!(t.to_snippet(), Err(NorthstarError::BadRequest(_))));

        t.timeout = 60;
        assert_eq!(t.to_snippet().unwrap().timeout, 60_000);
    }

    #[test]
    fn test_scheduled_is_read_only_on_the_wire() {
        let t: Transformation = serde_json::from_value(serde_json::json!({
            "name": "t",
            "entryPoint": "main",
            "language": "python",
            "code": { "type": "Source", "value": "x" },
            "scheduled": true
        }))
        .unwrap();
        // The flag parses, but the scheduler reference never comes from a client
        assert!(t.scheduler_type.is_empty());
        assert!(t.scheduler_id.is_empty());
    }
}
