use serde::{Deserialize, Serialize};

/// Lifecycle state of a list subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    Confirmed,
    Unconfirmed,
    Unsubscribed,
    Blacklisted,
}

impl SubscriberStatus {
    pub const ALL: &'static [SubscriberStatus] = &[
        Self::Confirmed,
        Self::Unconfirmed,
        Self::Unsubscribed,
        Self::Blacklisted,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Unconfirmed => "unconfirmed",
            Self::Unsubscribed => "unsubscribed",
            Self::Blacklisted => "blacklisted",
        }
    }
}

impl std::fmt::Display for SubscriberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubscriberStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| format!("Invalid subscriber status '{}'", s))
    }
}
