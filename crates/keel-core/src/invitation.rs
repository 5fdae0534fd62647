use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Where an account stands with respect to a campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Accepted,
    Blocked,
    Expelled,
    Ignored,
    Left,
    #[default]
    Pending,
    Refused,
    Request,
    Creator,
}

impl InvitationStatus {
    pub const ALL: [InvitationStatus; 9] = [
        InvitationStatus::Accepted,
        InvitationStatus::Blocked,
        InvitationStatus::Expelled,
        InvitationStatus::Ignored,
        InvitationStatus::Left,
        InvitationStatus::Pending,
        InvitationStatus::Refused,
        InvitationStatus::Request,
        InvitationStatus::Creator,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Blocked => "blocked",
            InvitationStatus::Expelled => "expelled",
            InvitationStatus::Ignored => "ignored",
            InvitationStatus::Left => "left",
            InvitationStatus::Pending => "pending",
            InvitationStatus::Refused => "refused",
            InvitationStatus::Request => "request",
            InvitationStatus::Creator => "creator",
        }
    }

    /// Whether the account takes part in the campaign.
    pub fn is_member(&self) -> bool {
        matches!(self, InvitationStatus::Accepted | InvitationStatus::Creator)
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("Unknown invitation status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for InvitationStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        InvitationStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_pending() {
        assert_eq!(InvitationStatus::default(), InvitationStatus::Pending);
    }

    #[test]
    fn test_every_status_parses_back() {
        for status in InvitationStatus::ALL {
            assert_eq!(status.to_string().parse::<InvitationStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_status_is_an_error() {
        assert_eq!(
            "maybe".parse::<InvitationStatus>(),
            Err(UnknownStatus("maybe".to_string()))
        );
    }

    #[test]
    fn test_membership() {
        assert!(InvitationStatus::Creator.is_member());
        assert!(!InvitationStatus::Pending.is_member());
    }
}
