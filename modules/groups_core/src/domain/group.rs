//! The group aggregate and its update parameters.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use crate::domain::error::ValidationError;
use crate::domain::fields::{normalized_description, NumberedCustomField, OptionalGroupFields};
use crate::domain::ids::{GroupId, GroupName, UserName};
use crate::domain::time::CreateAndModTimes;

/// The type of a group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GroupType {
    #[default]
    Organization,
    Project,
    Team,
}

impl GroupType {
    /// The label stored in the database for this group type.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Organization => "organization",
            Self::Project => "project",
            Self::Team => "team",
        }
    }
}

impl FromStr for GroupType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "organization" => Ok(Self::Organization),
            "project" => Ok(Self::Project),
            "team" => Ok(Self::Team),
            _ => Err(ValidationError::illegal_parameter(format!(
                "Invalid group type: {}",
                s
            ))),
        }
    }
}

impl fmt::Display for GroupType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// A group of users with a single owner.
///
/// The owner holds maximal privilege implicitly and is never listed in the
/// member set; builders and the storage layer both reject an owner-member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Group {
    id: GroupId,
    name: GroupName,
    owner: UserName,
    group_type: GroupType,
    times: CreateAndModTimes,
    description: Option<String>,
    members: BTreeSet<UserName>,
    custom_fields: BTreeMap<NumberedCustomField, String>,
}

impl Group {
    pub fn builder(
        id: GroupId,
        name: GroupName,
        owner: UserName,
        times: CreateAndModTimes,
    ) -> GroupBuilder {
        GroupBuilder {
            id,
            name,
            owner,
            times,
            group_type: GroupType::default(),
            description: None,
            members: BTreeSet::new(),
            custom_fields: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &GroupId {
        &self.id
    }

    pub fn name(&self) -> &GroupName {
        &self.name
    }

    pub fn owner(&self) -> &UserName {
        &self.owner
    }

    pub fn group_type(&self) -> GroupType {
        self.group_type
    }

    pub fn times(&self) -> &CreateAndModTimes {
        &self.times
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// The regular members of the group, not including the owner.
    pub fn members(&self) -> &BTreeSet<UserName> {
        &self.members
    }

    pub fn custom_fields(&self) -> &BTreeMap<NumberedCustomField, String> {
        &self.custom_fields
    }

    /// Whether the user is a regular member. The owner is not a member.
    pub fn is_member(&self, user: &UserName) -> bool {
        self.members.contains(user)
    }

    /// Whether the user may administrate the group.
    pub fn is_administrator(&self, user: &UserName) -> bool {
        &self.owner == user
    }
}

#[derive(Debug, Clone)]
pub struct GroupBuilder {
    id: GroupId,
    name: GroupName,
    owner: UserName,
    times: CreateAndModTimes,
    group_type: GroupType,
    description: Option<String>,
    members: BTreeSet<UserName>,
    custom_fields: BTreeMap<NumberedCustomField, String>,
}

impl GroupBuilder {
    pub fn with_type(mut self, group_type: GroupType) -> Self {
        self.group_type = group_type;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_member(mut self, member: UserName) -> Self {
        self.members.insert(member);
        self
    }

    pub fn with_custom_field(mut self, field: NumberedCustomField, value: impl Into<String>) -> Self {
        self.custom_fields.insert(field, value.into());
        self
    }

    pub fn build(self) -> Result<Group, ValidationError> {
        if self.members.contains(&self.owner) {
            return Err(ValidationError::illegal_parameter(format!(
                "Group owner {} may not be a member of the group",
                self.owner
            )));
        }
        let description = self.description.map(normalized_description).transpose()?;
        for (field, value) in &self.custom_fields {
            if value.trim().is_empty() {
                return Err(ValidationError::illegal_parameter(format!(
                    "value for custom field {} may not be empty",
                    field
                )));
            }
        }
        Ok(Group {
            id: self.id,
            name: self.name,
            owner: self.owner,
            group_type: self.group_type,
            times: self.times,
            description,
            members: self.members,
            custom_fields: self.custom_fields,
        })
    }
}

/// Parameters for a sparse group update.
///
/// Absent parts mean "leave unchanged"; the optional fields carry the three
/// way absent / set / remove semantics for the description and custom fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupUpdateParams {
    group_id: GroupId,
    name: Option<GroupName>,
    group_type: Option<GroupType>,
    optional_fields: OptionalGroupFields,
}

impl GroupUpdateParams {
    pub fn builder(group_id: GroupId) -> GroupUpdateParamsBuilder {
        GroupUpdateParamsBuilder {
            group_id,
            name: None,
            group_type: None,
            optional_fields: OptionalGroupFields::none(),
        }
    }

    pub fn group_id(&self) -> &GroupId {
        &self.group_id
    }

    pub fn name(&self) -> Option<&GroupName> {
        self.name.as_ref()
    }

    pub fn group_type(&self) -> Option<GroupType> {
        self.group_type
    }

    pub fn optional_fields(&self) -> &OptionalGroupFields {
        &self.optional_fields
    }

    pub fn has_update(&self) -> bool {
        self.name.is_some() || self.group_type.is_some() || self.optional_fields.has_update()
    }
}

#[derive(Debug, Clone)]
pub struct GroupUpdateParamsBuilder {
    group_id: GroupId,
    name: Option<GroupName>,
    group_type: Option<GroupType>,
    optional_fields: OptionalGroupFields,
}

impl GroupUpdateParamsBuilder {
    pub fn with_name(mut self, name: GroupName) -> Self {
        self.name = Some(name);
        self
    }

    pub fn with_type(mut self, group_type: GroupType) -> Self {
        self.group_type = Some(group_type);
        self
    }

    pub fn with_optional_fields(mut self, fields: OptionalGroupFields) -> Self {
        self.optional_fields = fields;
        self
    }

    pub fn build(self) -> GroupUpdateParams {
        GroupUpdateParams {
            group_id: self.group_id,
            name: self.name,
            group_type: self.group_type,
            optional_fields: self.optional_fields,
        }
    }
}
