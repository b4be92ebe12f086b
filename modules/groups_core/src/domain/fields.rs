//! Custom field identifiers, the sparse field update descriptor, and the
//! deployment-wide per-field configuration.

use std::collections::BTreeMap;
use std::fmt;

use crate::domain::error::ValidationError;

const MAX_FIELD_LEN: usize = 50;
const MAX_DESCRIPTION_LEN: usize = 5000;

/// Trim and validate a group description. Both the group builder and the
/// description update run through this, so a value a group cannot be built
/// with can never be persisted by an update either.
pub(crate) fn normalized_description(d: impl Into<String>) -> Result<String, ValidationError> {
    let d = d.into().trim().to_string();
    if d.is_empty() {
        return Err(ValidationError::missing_parameter("description"));
    }
    if d.len() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::illegal_parameter(format!(
            "description exceeds the maximum length of {}",
            MAX_DESCRIPTION_LEN
        )));
    }
    Ok(d)
}

/// A custom field identifier: a base name plus an optional positive numeric
/// suffix separated by a hyphen, e.g. `mapping` or `mapping-3`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NumberedCustomField {
    field: String,
    number: Option<u32>,
}

impl NumberedCustomField {
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::missing_parameter("custom field"));
        }
        let (base, number) = match s.split_once('-') {
            Some((base, suffix)) => {
                let number: u32 = suffix.parse().ok().filter(|n| *n > 0).ok_or_else(|| {
                    ValidationError::illegal_parameter(format!(
                        "Suffix after - of field {} must be an integer > 0",
                        s
                    ))
                })?;
                (base, Some(number))
            }
            None => (s, None),
        };
        if base.is_empty() {
            return Err(ValidationError::missing_parameter("custom field"));
        }
        if base.len() > MAX_FIELD_LEN {
            return Err(ValidationError::illegal_parameter(format!(
                "field {} exceeds the maximum length of {}",
                base, MAX_FIELD_LEN
            )));
        }
        let mut chars = base.chars();
        if let Some(first) = chars.next() {
            if !first.is_ascii_lowercase() {
                return Err(ValidationError::illegal_parameter(format!(
                    "field {} must start with a lowercase ASCII letter",
                    base
                )));
            }
        }
        for c in chars {
            if !(c.is_ascii_lowercase() || c.is_ascii_digit()) {
                return Err(ValidationError::illegal_parameter(format!(
                    "Illegal character in custom field {}: {}",
                    base, c
                )));
            }
        }
        Ok(Self {
            field: base.to_string(),
            number,
        })
    }

    /// The base field name, without any numeric suffix.
    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn number(&self) -> Option<u32> {
        self.number
    }

    pub fn is_numbered(&self) -> bool {
        self.number.is_some()
    }
}

impl fmt::Display for NumberedCustomField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.number {
            Some(n) => write!(f, "{}-{}", self.field, n),
            None => f.write_str(&self.field),
        }
    }
}

/// A three way field update descriptor, distinguishing "the caller did not
/// mention this field" from "the caller wants it cleared".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldUpdate {
    /// No update requested for the field.
    NoAction,
    /// Clear the field.
    Remove,
    /// Set the field to the given non-empty value.
    Set(String),
}

impl FieldUpdate {
    /// A `Set` update; the value may not be empty or whitespace-only.
    pub fn set(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(ValidationError::missing_parameter("field value"));
        }
        Ok(Self::Set(value))
    }

    pub fn has_action(&self) -> bool {
        !matches!(self, Self::NoAction)
    }

    pub fn as_set(&self) -> Option<&str> {
        match self {
            Self::Set(v) => Some(v),
            _ => None,
        }
    }
}

/// Optional field updates for a group: the description plus any custom
/// fields. Fields absent from the custom field map are left unchanged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionalGroupFields {
    description: FieldUpdate,
    custom_fields: BTreeMap<NumberedCustomField, FieldUpdate>,
}

impl OptionalGroupFields {
    pub fn builder() -> OptionalGroupFieldsBuilder {
        OptionalGroupFieldsBuilder {
            description: FieldUpdate::NoAction,
            custom_fields: BTreeMap::new(),
        }
    }

    /// The default set of fields, containing no updates.
    pub fn none() -> Self {
        Self {
            description: FieldUpdate::NoAction,
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn has_update(&self) -> bool {
        self.description.has_action() || !self.custom_fields.is_empty()
    }

    pub fn description(&self) -> &FieldUpdate {
        &self.description
    }

    pub fn custom_fields(&self) -> &BTreeMap<NumberedCustomField, FieldUpdate> {
        &self.custom_fields
    }
}

#[derive(Debug, Clone)]
pub struct OptionalGroupFieldsBuilder {
    description: FieldUpdate,
    custom_fields: BTreeMap<NumberedCustomField, FieldUpdate>,
}

impl OptionalGroupFieldsBuilder {
    pub fn with_description(mut self, update: FieldUpdate) -> Self {
        self.description = update;
        self
    }

    pub fn with_custom_field(mut self, field: NumberedCustomField, update: FieldUpdate) -> Self {
        self.custom_fields.insert(field, update);
        self
    }

    pub fn build(self) -> Result<OptionalGroupFields, ValidationError> {
        let description = match self.description {
            FieldUpdate::Set(d) => FieldUpdate::Set(normalized_description(d)?),
            other => other,
        };
        for (field, update) in &self.custom_fields {
            if !update.has_action() {
                return Err(ValidationError::illegal_parameter(format!(
                    "update for custom field {} may not be a no-op; omit the field instead",
                    field
                )));
            }
        }
        Ok(OptionalGroupFields {
            description,
            custom_fields: self.custom_fields,
        })
    }
}

/// Static, deployment-wide policy for a custom field name.
///
/// All flags default to false and the configuration is immutable once built.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FieldConfiguration {
    numbered: bool,
    public: bool,
    minimal_view: bool,
}

impl FieldConfiguration {
    pub fn builder() -> FieldConfigurationBuilder {
        FieldConfigurationBuilder {
            config: FieldConfiguration::default(),
        }
    }

    /// Whether the field may carry a numeric suffix.
    pub fn is_numbered(&self) -> bool {
        self.numbered
    }

    /// Whether the field is visible to all users regardless of authorization.
    pub fn is_public(&self) -> bool {
        self.public
    }

    /// Whether the field is included in minimal views of the group.
    pub fn is_minimal_view(&self) -> bool {
        self.minimal_view
    }
}

#[derive(Debug, Clone)]
pub struct FieldConfigurationBuilder {
    config: FieldConfiguration,
}

impl FieldConfigurationBuilder {
    pub fn with_numbered(mut self, numbered: bool) -> Self {
        self.config.numbered = numbered;
        self
    }

    pub fn with_public(mut self, public: bool) -> Self {
        self.config.public = public;
        self
    }

    pub fn with_minimal_view(mut self, minimal_view: bool) -> Self {
        self.config.minimal_view = minimal_view;
        self
    }

    pub fn build(self) -> FieldConfiguration {
        self.config
    }
}
