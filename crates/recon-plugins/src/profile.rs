//! Scan profiles selecting which plugin set a job runs.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Plugin set selector for a job.
///
/// Each profile owns an independent discovery directory named after it.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    EnumString,
    Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum Profile {
    /// Quick, low-cost probes.
    Lite,
    /// The full probe set.
    #[default]
    Deep,
}

impl Profile {
    /// Every profile, in declaration order.
    pub const ALL: [Self; 2] = [Self::Lite, Self::Deep];

    /// Returns the canonical string form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Lite => "lite",
            Self::Deep => "deep",
        }
    }

    /// Returns the name of the profile's discovery directory.
    #[must_use]
    pub const fn directory_name(self) -> &'static str {
        self.as_str()
    }
}

/// Error returned when text does not name a [`Profile`].
pub type ProfileParseError = strum::ParseError;
