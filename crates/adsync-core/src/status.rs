//! Ad lifecycle status machine and marketplace integration discriminator.
//!
//! Status values are persisted as lowercase strings; the transition table is
//! the single authority on which writes are legal. Callers that want to move
//! a record between states go through [`AdStatus::can_transition_to`] (or the
//! guarded DB update built on it) rather than writing arbitrary strings.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// External marketplace integration a config row or ad record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Marketplace {
    Olx,
    Facebook,
}

impl Marketplace {
    /// Stable key used in the `integration` column and API paths.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Marketplace::Olx => "olx",
            Marketplace::Facebook => "facebook",
        }
    }
}

impl fmt::Display for Marketplace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Marketplace {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "olx" => Ok(Marketplace::Olx),
            "facebook" => Ok(Marketplace::Facebook),
            other => Err(format!("unknown marketplace integration: {other}")),
        }
    }
}

/// Lifecycle state of a local ad record.
///
/// `Processing` is the side channel for asynchronous imports: the remote
/// platform accepted the ad but returned an opaque import token instead of a
/// resolved listing id, so a follow-up status poll is required.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdStatus {
    Pending,
    Processing,
    Advertised,
    Error,
    Paused,
    Removed,
}

/// Attempted status write that the transition table forbids.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid ad status transition: {from} -> {to}")]
pub struct InvalidTransition {
    pub from: AdStatus,
    pub to: AdStatus,
}

impl AdStatus {
    /// Stable string form used in the `status` column.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            AdStatus::Pending => "pending",
            AdStatus::Processing => "processing",
            AdStatus::Advertised => "advertised",
            AdStatus::Error => "error",
            AdStatus::Paused => "paused",
            AdStatus::Removed => "removed",
        }
    }

    /// Whether moving from `self` to `to` is a legal lifecycle transition.
    ///
    /// Any non-removed state may move to `Removed`; `Removed` is terminal.
    /// `Error` may be retried back through `Pending`.
    #[must_use]
    pub fn can_transition_to(self, to: AdStatus) -> bool {
        if self == to {
            return false;
        }
        if to == AdStatus::Removed {
            return self != AdStatus::Removed;
        }
        match self {
            AdStatus::Pending => matches!(
                to,
                AdStatus::Processing | AdStatus::Advertised | AdStatus::Error
            ),
            AdStatus::Processing => matches!(to, AdStatus::Advertised | AdStatus::Error),
            AdStatus::Advertised => matches!(to, AdStatus::Paused | AdStatus::Error),
            AdStatus::Paused => matches!(to, AdStatus::Advertised),
            AdStatus::Error => matches!(to, AdStatus::Pending),
            AdStatus::Removed => false,
        }
    }

    /// Validates a transition, returning the target on success.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidTransition`] if the transition table forbids the move.
    pub fn transition_to(self, to: AdStatus) -> Result<AdStatus, InvalidTransition> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(InvalidTransition { from: self, to })
        }
    }

    /// States that still need a remote id resolved (migration candidates).
    #[must_use]
    pub fn is_unresolved(self) -> bool {
        matches!(self, AdStatus::Pending | AdStatus::Processing)
    }
}

impl fmt::Display for AdStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(AdStatus::Pending),
            "processing" => Ok(AdStatus::Processing),
            "advertised" => Ok(AdStatus::Advertised),
            "error" => Ok(AdStatus::Error),
            "paused" => Ok(AdStatus::Paused),
            "removed" => Ok(AdStatus::Removed),
            other => Err(format!("unknown ad status: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_string_roundtrip() {
        for status in [
            AdStatus::Pending,
            AdStatus::Processing,
            AdStatus::Advertised,
            AdStatus::Error,
            AdStatus::Paused,
            AdStatus::Removed,
        ] {
            assert_eq!(status.as_str().parse::<AdStatus>(), Ok(status));
        }
    }

    #[test]
    fn pending_can_reach_processing_advertised_and_error() {
        assert!(AdStatus::Pending.can_transition_to(AdStatus::Processing));
        assert!(AdStatus::Pending.can_transition_to(AdStatus::Advertised));
        assert!(AdStatus::Pending.can_transition_to(AdStatus::Error));
        assert!(!AdStatus::Pending.can_transition_to(AdStatus::Paused));
    }

    #[test]
    fn processing_resolves_to_advertised_or_error() {
        assert!(AdStatus::Processing.can_transition_to(AdStatus::Advertised));
        assert!(AdStatus::Processing.can_transition_to(AdStatus::Error));
        assert!(!AdStatus::Processing.can_transition_to(AdStatus::Pending));
    }

    #[test]
    fn any_live_state_can_be_removed() {
        for status in [
            AdStatus::Pending,
            AdStatus::Processing,
            AdStatus::Advertised,
            AdStatus::Error,
            AdStatus::Paused,
        ] {
            assert!(status.can_transition_to(AdStatus::Removed), "{status}");
        }
    }

    #[test]
    fn removed_is_terminal() {
        for status in [
            AdStatus::Pending,
            AdStatus::Processing,
            AdStatus::Advertised,
            AdStatus::Error,
            AdStatus::Paused,
            AdStatus::Removed,
        ] {
            assert!(!AdStatus::Removed.can_transition_to(status), "{status}");
        }
    }

    #[test]
    fn self_transition_is_rejected() {
        assert!(!AdStatus::Advertised.can_transition_to(AdStatus::Advertised));
    }

    #[test]
    fn transition_to_reports_the_offending_pair() {
        let err = AdStatus::Removed
            .transition_to(AdStatus::Advertised)
            .expect_err("removed must be terminal");
        assert_eq!(err.from, AdStatus::Removed);
        assert_eq!(err.to, AdStatus::Advertised);
    }

    #[test]
    fn unresolved_states_are_pending_and_processing() {
        assert!(AdStatus::Pending.is_unresolved());
        assert!(AdStatus::Processing.is_unresolved());
        assert!(!AdStatus::Advertised.is_unresolved());
        assert!(!AdStatus::Removed.is_unresolved());
    }

    #[test]
    fn marketplace_keys_are_stable() {
        assert_eq!(Marketplace::Olx.as_str(), "olx");
        assert_eq!("facebook".parse::<Marketplace>(), Ok(Marketplace::Facebook));
        assert!("mercadolivre".parse::<Marketplace>().is_err());
    }
}
