use std::fmt;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// What an API key may do: read file state, write file state, or both.
/// Serialized on the wire as an array of permission strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Permission {
    pub read: bool,
    pub write: bool,
}

impl Permission {
    #[must_use]
    pub const fn read_only() -> Permission {
        Permission {
            read: true,
            write: false,
        }
    }

    /// Both permissions, the default grant for a freshly created key.
    #[must_use]
    pub const fn read_write() -> Permission {
        Permission {
            read: true,
            write: true,
        }
    }

    #[must_use]
    pub const fn can_read(self) -> bool {
        self.read
    }

    #[must_use]
    pub const fn can_write(self) -> bool {
        self.write
    }

    /// Builds a permission set from string tokens; any token outside
    /// {"read", "write"} rejects the whole set.
    pub fn parse_many(tokens: &[&str]) -> Option<Permission> {
        let mut perms = Permission::default();
        for token in tokens {
            match *token {
                "read" => perms.read = true,
                "write" => perms.write = true,
                _ => return None,
            }
        }
        Some(perms)
    }

    /// Returns a slice of permission strings for this set.
    #[must_use]
    pub fn to_strings(self) -> Vec<&'static str> {
        let mut tokens = Vec::new();
        if self.read {
            tokens.push("read");
        }
        if self.write {
            tokens.push("write");
        }
        tokens
    }

    /// Column encoding: bit 0 is read, bit 1 is write.
    #[must_use]
    pub const fn to_bits(self) -> i64 {
        (self.read as i64) | ((self.write as i64) << 1)
    }

    #[must_use]
    pub const fn from_bits(bits: i64) -> Permission {
        Permission {
            read: bits & 1 != 0,
            write: bits & 2 != 0,
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_strings().join(", "))
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.to_strings())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tokens = Vec::<String>::deserialize(deserializer)?;
        let tokens: Vec<&str> = tokens.iter().map(String::as_str).collect();
        Permission::parse_many(&tokens)
            .ok_or_else(|| D::Error::custom("permissions must be drawn from {read, write}"))
    }
}
