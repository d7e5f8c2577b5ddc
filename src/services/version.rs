use crate::domain::constants::ACTION_VALIDATION_MIN_EXCLUSIVE_MINOR;

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum VersionError {
    #[error("unrecognised server version: {0:?}")]
    Malformed(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServerVersion {
    pub major: u32,
    pub minor: u32,
}

impl ServerVersion {
    /// Parses `MAJOR.MINOR[.PATCH][-suffix]`, e.g. `2.38-embargo` or `2.40.1-SNAPSHOT`.
    pub fn parse(raw: &str) -> Result<Self, VersionError> {
        let malformed = || VersionError::Malformed(raw.to_string());
        let mut parts = raw.trim().split('.');
        let major = parts
            .next()
            .and_then(|p| p.split('-').next())
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
        let minor = parts
            .next()
            .and_then(|p| p.split('-').next())
            .and_then(|p| p.parse().ok())
            .ok_or_else(malformed)?;
        Ok(Self { major, minor })
    }

    /// Action-data validation exists only on minor versions above 37.
    pub fn supports_action_validation(&self) -> bool {
        self.minor > ACTION_VALIDATION_MIN_EXCLUSIVE_MINOR
    }
}
