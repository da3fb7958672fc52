use std::fmt::{self, Write};
use std::str::FromStr;

use chrono::Utc;
use serde::{Deserialize, Serialize};

const ID_LEN: usize = 24;

/// Identifier of a stored record: 24 lowercase hex characters made of a
/// 4-byte seconds timestamp followed by 8 random bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(try_from = "String", into = "String")]
#[sqlx(transparent)]
pub struct RecordId(String);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidRecordId(pub String);

impl fmt::Display for InvalidRecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Invalid ID format: {}", self.0)
    }
}

impl std::error::Error for InvalidRecordId {}

impl RecordId {
    pub fn generate() -> Self {
        let seconds = Utc::now().timestamp() as u32;
        let random: [u8; 8] = rand::random();

        let mut id = String::with_capacity(ID_LEN);
        let _ = write!(id, "{:08x}", seconds);
        for byte in random {
            let _ = write!(id, "{:02x}", byte);
        }
        RecordId(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for RecordId {
    type Err = InvalidRecordId;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == ID_LEN && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(RecordId(s.to_ascii_lowercase()))
        } else {
            Err(InvalidRecordId(s.to_string()))
        }
    }
}

impl TryFrom<String> for RecordId {
    type Error = InvalidRecordId;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RecordId> for String {
    fn from(id: RecordId) -> Self {
        id.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
