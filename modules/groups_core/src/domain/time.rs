//! Timestamp value types with ordering invariants.

use chrono::{DateTime, Utc};

use crate::domain::error::ValidationError;

/// Creation and modification times where `modification >= creation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateAndModTimes {
    creation: DateTime<Utc>,
    modification: DateTime<Utc>,
}

impl CreateAndModTimes {
    pub fn new(
        creation: DateTime<Utc>,
        modification: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if modification < creation {
            return Err(ValidationError::illegal_parameter(format!(
                "modification time {} is before creation time {}",
                modification, creation
            )));
        }
        Ok(Self {
            creation,
            modification,
        })
    }

    /// Times where the group has never been modified since creation.
    pub fn from_creation(creation: DateTime<Utc>) -> Self {
        Self {
            creation,
            modification: creation,
        }
    }

    pub fn creation(&self) -> DateTime<Utc> {
        self.creation
    }

    pub fn modification(&self) -> DateTime<Utc> {
        self.modification
    }
}

/// Creation, modification and expiration times for a request, where
/// `creation <= modification < expiration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreateModAndExpireTimes {
    creation: DateTime<Utc>,
    modification: DateTime<Utc>,
    expiration: DateTime<Utc>,
}

impl CreateModAndExpireTimes {
    /// Get a builder. The modification time defaults to the creation time.
    pub fn builder(
        creation: DateTime<Utc>,
        expiration: DateTime<Utc>,
    ) -> CreateModAndExpireTimesBuilder {
        CreateModAndExpireTimesBuilder {
            creation,
            expiration,
            modification: None,
        }
    }

    /// Rebuild times from stored values.
    ///
    /// A closed request may carry a modification time at or past its
    /// expiration (expiry closes the request after the deadline), so only
    /// the creation ordering is enforced here.
    pub fn from_stored(
        creation: DateTime<Utc>,
        modification: DateTime<Utc>,
        expiration: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        if modification < creation {
            return Err(ValidationError::illegal_parameter(format!(
                "modification time {} is before creation time {}",
                modification, creation
            )));
        }
        if expiration <= creation {
            return Err(ValidationError::illegal_parameter(format!(
                "expiration time {} is not later than creation time {}",
                expiration, creation
            )));
        }
        Ok(Self {
            creation,
            modification,
            expiration,
        })
    }

    pub fn creation(&self) -> DateTime<Utc> {
        self.creation
    }

    pub fn modification(&self) -> DateTime<Utc> {
        self.modification
    }

    pub fn expiration(&self) -> DateTime<Utc> {
        self.expiration
    }
}

#[derive(Debug, Clone)]
pub struct CreateModAndExpireTimesBuilder {
    creation: DateTime<Utc>,
    expiration: DateTime<Utc>,
    modification: Option<DateTime<Utc>>,
}

impl CreateModAndExpireTimesBuilder {
    pub fn with_modification_time(mut self, modification: DateTime<Utc>) -> Self {
        self.modification = Some(modification);
        self
    }

    pub fn build(self) -> Result<CreateModAndExpireTimes, ValidationError> {
        let modification = self.modification.unwrap_or(self.creation);
        if modification < self.creation {
            return Err(ValidationError::illegal_parameter(format!(
                "modification time {} is before creation time {}",
                modification, self.creation
            )));
        }
        if self.expiration <= modification {
            return Err(ValidationError::illegal_parameter(format!(
                "expiration time {} is not later than modification time {}",
                self.expiration, modification
            )));
        }
        Ok(CreateModAndExpireTimes {
            creation: self.creation,
            modification,
            expiration: self.expiration,
        })
    }
}
