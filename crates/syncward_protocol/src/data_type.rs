//! Data categories that participate in sync.

use crate::error::{ParseResult, ProtocolParseError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// A category of user data that can be synced independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    /// Bookmarks and folders.
    Bookmarks,
    /// Saved passwords.
    Passwords,
    /// Form autofill entries.
    Autofill,
    /// Typed URL history.
    TypedUrls,
    /// User preferences.
    Preferences,
    /// Installed themes.
    Themes,
    /// Installed extensions.
    Extensions,
    /// Open tabs and windows.
    Sessions,
}

impl DataType {
    /// All data types, in declaration order.
    pub const ALL: [DataType; 8] = [
        DataType::Bookmarks,
        DataType::Passwords,
        DataType::Autofill,
        DataType::TypedUrls,
        DataType::Preferences,
        DataType::Themes,
        DataType::Extensions,
        DataType::Sessions,
    ];

    /// Returns the canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::Bookmarks => "bookmarks",
            DataType::Passwords => "passwords",
            DataType::Autofill => "autofill",
            DataType::TypedUrls => "typed_urls",
            DataType::Preferences => "preferences",
            DataType::Themes => "themes",
            DataType::Extensions => "extensions",
            DataType::Sessions => "sessions",
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = ProtocolParseError;

    fn from_str(s: &str) -> ParseResult<Self> {
        DataType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ProtocolParseError::UnknownDataType(s.to_string()))
    }
}

/// An ordered set of data types.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataTypeSet(BTreeSet<DataType>);

impl DataTypeSet {
    /// Creates an empty set.
    pub fn empty() -> Self {
        Self(BTreeSet::new())
    }

    /// Creates a set containing every data type.
    pub fn all() -> Self {
        DataType::ALL.into_iter().collect()
    }

    /// Adds a data type. Returns true if it was not already present.
    pub fn insert(&mut self, data_type: DataType) -> bool {
        self.0.insert(data_type)
    }

    /// Removes a data type. Returns true if it was present.
    pub fn remove(&mut self, data_type: DataType) -> bool {
        self.0.remove(&data_type)
    }

    /// Returns true if the set contains the data type.
    pub fn has(&self, data_type: DataType) -> bool {
        self.0.contains(&data_type)
    }

    /// Number of data types in the set.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the set is empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the set in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = DataType> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<DataType> for DataTypeSet {
    fn from_iter<I: IntoIterator<Item = DataType>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Display for DataTypeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(|t| t.as_str()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
