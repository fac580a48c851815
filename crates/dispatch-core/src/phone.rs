use serde::{Deserialize, Serialize};

use crate::error::DomainError;

/// Phone number of a staff member or a caller.
///
/// Staff numbers are validated in E.164 format (e.g., "+15105551234"). Callers
/// keep whatever id the provider reports, which may be a short code or
/// `anonymous`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    pub fn new(number: &str) -> Result<Self, DomainError> {
        let number = number.trim();
        if !Self::is_valid_e164(number) {
            return Err(DomainError::InvalidPhoneFormat);
        }
        Ok(Self(number.to_string()))
    }

    /// Caller id as reported by the provider. Only an empty id is rejected.
    pub fn caller(id: &str) -> Result<Self, DomainError> {
        let id = id.trim();
        if id.is_empty() {
            return Err(DomainError::EmptyCallerId);
        }
        Ok(Self(id.to_string()))
    }

    fn is_valid_e164(number: &str) -> bool {
        let bytes = number.as_bytes();
        if bytes.len() < 8 || bytes.len() > 16 {
            return false;
        }
        if bytes[0] != b'+' {
            return false;
        }
        bytes[1..].iter().all(|b| b.is_ascii_digit())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Phone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for Phone {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Phone {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}
