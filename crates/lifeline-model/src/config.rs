//! Finalization settings and the report a finalization run produces.

use lifeline_types::{TimeRange, Timestamp};
use serde::{Deserialize, Serialize};

/// Settings for [`ObjectCollection::finalize`](crate::ObjectCollection::finalize).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalizeConfig {
    /// Close lifetimes still open when ingestion ends.
    pub auto_delete: bool,
    /// Where open lifetimes are closed. Defaults to the latest ingested
    /// timestamp.
    pub end_of_trace: Option<Timestamp>,
    /// Milliseconds added to every timestamp once initialization is done.
    pub shift_forward: f64,
    /// Shift so that the earliest timestamp becomes zero. Takes precedence
    /// over `shift_forward`.
    pub rebase_to_zero: bool,
}

impl Default for FinalizeConfig {
    fn default() -> Self {
        Self {
            auto_delete: true,
            end_of_trace: None,
            shift_forward: 0.0,
            rebase_to_zero: false,
        }
    }
}

impl FinalizeConfig {
    /// Leave open lifetimes open and timestamps untouched.
    pub fn keep_open() -> Self {
        Self {
            auto_delete: false,
            ..Default::default()
        }
    }
}

/// Summary of a finalization run.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FinalizeReport {
    /// Distinct object ids.
    pub ids: usize,
    /// Lifetimes across all ids.
    pub instances: usize,
    /// Snapshots across all lifetimes.
    pub snapshots: usize,
    /// Lifetimes closed by auto-deletion.
    pub auto_deleted: usize,
    /// Milliseconds every timestamp was moved by.
    pub shifted_by: f64,
    /// Union of all lifetime bounds, after shifting.
    pub bounds: TimeRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let c = FinalizeConfig::default();
        assert!(c.auto_delete);
        assert!(c.end_of_trace.is_none());
        assert_eq!(c.shift_forward, 0.0);
        assert!(!c.rebase_to_zero);
    }

    #[test]
    fn keep_open_disables_auto_delete() {
        assert!(!FinalizeConfig::keep_open().auto_delete);
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let c: FinalizeConfig = toml::from_str("end_of_trace = 500.0\nrebase_to_zero = true\n").unwrap();
        assert!(c.auto_delete);
        assert_eq!(c.end_of_trace, Some(Timestamp::from_ms(500.0)));
        assert!(c.rebase_to_zero);
    }
}
