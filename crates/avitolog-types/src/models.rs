use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Category assigned when the marketplace page yields none.
pub const DEFAULT_CATEGORY: &str = "Без категории";

/// Header title served when the settings table is empty.
pub const DEFAULT_HEADER_TITLE: &str = "Авитолог";

/// Ordering of the ads listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdSort {
    /// Most viewed first.
    #[default]
    Popular,
    /// Most recently published first, unknown publication dates last.
    Date,
}

impl AdSort {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdSort::Popular => "popular",
            AdSort::Date => "date",
        }
    }
}

impl fmt::Display for AdSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownSort(pub String);

impl fmt::Display for UnknownSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\" is not a valid choice.", self.0)
    }
}

impl std::error::Error for UnknownSort {}

impl FromStr for AdSort {
    type Err = UnknownSort;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "popular" => Ok(AdSort::Popular),
            "date" => Ok(AdSort::Date),
            other => Err(UnknownSort(other.to_string())),
        }
    }
}
