use crate::{
    Result,
    constants::{
        MAX_ENROLL_ID, MIN_ENROLL_ID, TOKEN_CANCEL, TOKEN_ENROLL, TOKEN_SET_ID_PREFIX,
        TOKEN_VERIFY,
    },
    error::Error,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Fingerprint template slot on the controller (0-127)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct EnrollId(u8);

impl EnrollId {
    /// Create a new enroll ID with validation.
    ///
    /// # Errors
    /// Returns `Error::InvalidEnrollId` if the ID is outside the valid range (0-127).
    pub fn new(id: u8) -> Result<Self> {
        Self::try_from(i64::from(id))
    }

    /// Get the raw slot number.
    #[must_use]
    pub fn as_u8(&self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for EnrollId {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self> {
        if !(i64::from(MIN_ENROLL_ID)..=i64::from(MAX_ENROLL_ID)).contains(&value) {
            return Err(Error::InvalidEnrollId {
                value,
                min: MIN_ENROLL_ID,
                max: MAX_ENROLL_ID,
            });
        }
        // Range checked above.
        Ok(EnrollId(value as u8))
    }
}

impl From<EnrollId> for u8 {
    fn from(id: EnrollId) -> Self {
        id.0
    }
}

impl fmt::Display for EnrollId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for EnrollId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id: i64 = s
            .trim()
            .parse()
            .map_err(|_| Error::MalformedEnrollId(s.to_string()))?;
        EnrollId::try_from(id)
    }
}

/// Command understood by the fingerprint controller.
///
/// Each command maps to exactly one wire token; the line terminator is added
/// by the transport layer, not here.
///
/// # Examples
///
/// ```
/// use printgate_core::{Command, EnrollId};
///
/// assert_eq!(Command::Verify.token(), "V");
/// assert_eq!(Command::SetId(EnrollId::new(5).unwrap()).token(), "I5");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Command {
    /// Enter verification mode.
    Verify,
    /// Enter enrollment mode for the slot previously set with `SetId`.
    Enroll,
    /// Abort the enrollment in progress.
    Cancel,
    /// Select the slot the next enrollment writes to.
    SetId(EnrollId),
}

impl Command {
    /// Wire token for this command.
    #[must_use]
    pub fn token(&self) -> String {
        match self {
            Self::Verify => TOKEN_VERIFY.to_string(),
            Self::Enroll => TOKEN_ENROLL.to_string(),
            Self::Cancel => TOKEN_CANCEL.to_string(),
            Self::SetId(id) => format!("{TOKEN_SET_ID_PREFIX}{id}"),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.token())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(64)]
    #[case(127)]
    fn test_enroll_id_accepts_range(#[case] id: u8) {
        let enroll_id = EnrollId::new(id).unwrap();
        assert_eq!(enroll_id.as_u8(), id);
    }

    #[rstest]
    #[case(128)]
    #[case(200)]
    #[case(255)]
    fn test_enroll_id_rejects_above_range(#[case] id: u8) {
        let err = EnrollId::new(id).unwrap_err();
        assert!(matches!(err, Error::InvalidEnrollId { .. }));
    }

    #[test]
    fn test_enroll_id_rejects_negative() {
        let err = EnrollId::try_from(-1i64).unwrap_err();
        assert_eq!(err.to_string(), "Enroll ID must be 0-127, got -1");
    }

    #[test]
    fn test_enroll_id_from_str() {
        assert_eq!("42".parse::<EnrollId>().unwrap().as_u8(), 42);
        assert!(matches!(
            "abc".parse::<EnrollId>(),
            Err(Error::MalformedEnrollId(_))
        ));
        assert!(matches!(
            "128".parse::<EnrollId>(),
            Err(Error::InvalidEnrollId { value: 128, .. })
        ));
    }

    #[test]
    fn test_enroll_id_serde_validates() {
        let id: EnrollId = serde_json::from_str("7").unwrap();
        assert_eq!(id.as_u8(), 7);
        assert_eq!(serde_json::to_string(&id).unwrap(), "7");
        assert!(serde_json::from_str::<EnrollId>("128").is_err());
    }

    #[test]
    fn test_command_tokens() {
        assert_eq!(Command::Verify.token(), "V");
        assert_eq!(Command::Enroll.token(), "E");
        assert_eq!(Command::Cancel.token(), "C");
        assert_eq!(Command::SetId(EnrollId::new(0).unwrap()).token(), "I0");
        assert_eq!(Command::SetId(EnrollId::new(127).unwrap()).to_string(), "I127");
    }
}
