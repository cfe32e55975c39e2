//! Request statuses as they appear in state and on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome of the latest save of one kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SaveStatus {
    #[default]
    #[serde(rename = "not-attempted")]
    NotAttempted,
    #[serde(rename = "pending")]
    Pending,
    #[serde(rename = "no-auth")]
    NoAuth,
    #[serde(rename = "failure")]
    Failure,
    #[serde(rename = "clientFailure")]
    ClientFailure,
    #[serde(rename = "success")]
    Success,
}

impl SaveStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SaveStatus::NotAttempted => "not-attempted",
            SaveStatus::Pending => "pending",
            SaveStatus::NoAuth => "no-auth",
            SaveStatus::Failure => "failure",
            SaveStatus::ClientFailure => "clientFailure",
            SaveStatus::Success => "success",
        }
    }
}

/// Outcome of the latest load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LoadStatus {
    #[default]
    NotAttempted,
    Pending,
    NoAuth,
    Failure,
    Forbidden,
    NotFound,
    InvalidData,
    Success,
}

impl LoadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoadStatus::NotAttempted => "not-attempted",
            LoadStatus::Pending => "pending",
            LoadStatus::NoAuth => "no-auth",
            LoadStatus::Failure => "failure",
            LoadStatus::Forbidden => "forbidden",
            LoadStatus::NotFound => "not-found",
            LoadStatus::InvalidData => "invalid-data",
            LoadStatus::Success => "success",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrefillStatus {
    #[default]
    NotAttempted,
    Pending,
    Success,
    /// Prefill was requested but no data was available.
    Unfilled,
}

impl PrefillStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PrefillStatus::NotAttempted => "not-attempted",
            PrefillStatus::Pending => "pending",
            PrefillStatus::Success => "success",
            PrefillStatus::Unfilled => "unfilled",
        }
    }
}

/// Which save status a save updates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SaveKind {
    /// Background save after a field change.
    Auto,
    /// User-initiated "finish later"; its status is shown to the user.
    SaveAndRedirect,
}

impl fmt::Display for SaveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for LoadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PrefillStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_matches_wire_strings() {
        for s in [
            SaveStatus::NotAttempted,
            SaveStatus::Pending,
            SaveStatus::NoAuth,
            SaveStatus::Failure,
            SaveStatus::ClientFailure,
            SaveStatus::Success,
        ] {
            assert_eq!(serde_json::to_value(s).unwrap(), s.as_str());
        }
        for s in [
            LoadStatus::NotAttempted,
            LoadStatus::NoAuth,
            LoadStatus::NotFound,
            LoadStatus::InvalidData,
        ] {
            assert_eq!(serde_json::to_value(s).unwrap(), s.as_str());
        }
        assert_eq!(
            serde_json::to_value(PrefillStatus::Unfilled).unwrap(),
            "unfilled"
        );
    }
}
