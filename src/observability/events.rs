//! Observable events for recmgr
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events in recmgr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Configuration
    /// Configuration loaded
    ConfigLoaded,

    // Group lifecycle
    /// Record group created
    GroupCreated,
    /// Index registered on an empty group
    IndexRegistered,
    /// Index registered after records were inserted; it starts empty
    IndexRegisteredLate,

    // Writes
    /// Record inserted or replaced in every index
    RecordWrite,
    /// Record removed from the group
    RecordDelete,

    // Locking
    /// A panic while holding the group lock poisoned it
    LockPoisoned,

    // Stress runs
    /// Stress run started
    StressStart,
    /// Stress run complete
    StressComplete,
    /// Index length disagrees with traversal
    ConsistencyViolation,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::GroupCreated => "GROUP_CREATED",
            Event::IndexRegistered => "INDEX_REGISTERED",
            Event::IndexRegisteredLate => "INDEX_REGISTERED_LATE",
            Event::RecordWrite => "RECORD_WRITE",
            Event::RecordDelete => "RECORD_DELETE",
            Event::LockPoisoned => "LOCK_POISONED",
            Event::StressStart => "STRESS_BEGIN",
            Event::StressComplete => "STRESS_COMPLETE",
            Event::ConsistencyViolation => "CONSISTENCY_VIOLATION",
        }
    }

    /// Returns the severity this event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::RecordWrite | Event::RecordDelete => Severity::Trace,
            Event::IndexRegisteredLate | Event::LockPoisoned => Severity::Warn,
            Event::ConsistencyViolation => Severity::Error,
            _ => Severity::Info,
        }
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        assert_eq!(Event::GroupCreated.as_str(), "GROUP_CREATED");
        assert_eq!(Event::IndexRegisteredLate.to_string(), "INDEX_REGISTERED_LATE");
        assert_eq!(Event::StressStart.as_str(), "STRESS_BEGIN");
    }

    #[test]
    fn test_event_severity() {
        assert_eq!(Event::RecordWrite.severity(), Severity::Trace);
        assert_eq!(Event::LockPoisoned.severity(), Severity::Warn);
        assert_eq!(Event::ConsistencyViolation.severity(), Severity::Error);
        assert_eq!(Event::IndexRegistered.severity(), Severity::Info);
    }
}
