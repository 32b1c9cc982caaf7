//! Actions that change the contact. Each one builds a modifier; the
//! modifier decides whether anything actually changed.

use serde::{Deserialize, Serialize};
use switchboard_interchange::{encode_typed, InterchangeError};

use super::{Action, ActionError, ValidationError};
use crate::assets::AssetRef;
use crate::contacts::{is_valid_scheme, ContactUrn};
use crate::envs::Language;
use crate::events::FieldRef;
use crate::flow::RunScope;
use crate::modifiers::{
    FieldModifier, GroupsModification, GroupsModifier, LanguageModifier, Modifier, NameModifier,
    UrnsModification, UrnsModifier,
};

pub(super) const SET_CONTACT_NAME: &str = "set_contact_name";
pub(super) const SET_CONTACT_FIELD: &str = "set_contact_field";
pub(super) const SET_CONTACT_LANGUAGE: &str = "set_contact_language";
pub(super) const ADD_CONTACT_URN: &str = "add_contact_urn";
pub(super) const ADD_CONTACT_GROUPS: &str = "add_contact_groups";
pub(super) const REMOVE_CONTACT_GROUPS: &str = "remove_contact_groups";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetContactNameAction {
    pub uuid: String,
    pub name: String,
}

impl Action for SetContactNameAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        SET_CONTACT_NAME
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        let name = scope.evaluate(&self.name);
        scope.apply_modifier(Modifier::Name(NameModifier {
            name: name.trim().to_string(),
        }));
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(SET_CONTACT_NAME, self)
    }
}

/// Sets a field value; an empty value clears the field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetContactFieldAction {
    pub uuid: String,
    pub field: FieldRef,
    #[serde(default)]
    pub value: String,
}

impl Action for SetContactFieldAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        SET_CONTACT_FIELD
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.field.key.trim().is_empty() {
            return Err(ValidationError::new(self, "field key is required"));
        }
        Ok(())
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        if scope.assets().field(&self.field.key).is_none() {
            scope.error(format!("no such field with key '{}'", self.field.key));
            return Ok(());
        }
        let value = scope.evaluate(&self.value);
        scope.apply_modifier(Modifier::Field(FieldModifier {
            field: self.field.clone(),
            value,
        }));
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(SET_CONTACT_FIELD, self)
    }
}

/// Sets the contact's language from a three-letter code; empty clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetContactLanguageAction {
    pub uuid: String,
    #[serde(default)]
    pub language: String,
}

impl Action for SetContactLanguageAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        SET_CONTACT_LANGUAGE
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        let code = scope.evaluate(&self.language);
        let language = match Language::parse(code.trim()) {
            Ok(language) => language,
            Err(e) => {
                scope.error(e.to_string());
                return Ok(());
            }
        };
        scope.apply_modifier(Modifier::Language(LanguageModifier { language }));
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(SET_CONTACT_LANGUAGE, self)
    }
}

/// Appends a URN with the given scheme; the path is a template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddContactUrnAction {
    pub uuid: String,
    pub scheme: String,
    pub path: String,
}

impl Action for AddContactUrnAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        ADD_CONTACT_URN
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if !is_valid_scheme(&self.scheme) {
            return Err(ValidationError::new(
                self,
                format!("'{}' is not a valid URN scheme", self.scheme),
            ));
        }
        Ok(())
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        let path = scope.evaluate(&self.path);
        let path = path.trim();
        if path.is_empty() {
            scope.error("can't add URN with empty path");
            return Ok(());
        }
        let urn = match ContactUrn::new(&self.scheme, path) {
            Ok(urn) => urn,
            Err(e) => {
                scope.error(format!("unable to add URN '{}:{}': {}", self.scheme, path, e));
                return Ok(());
            }
        };
        scope.apply_modifier(Modifier::Urns(UrnsModifier {
            urns: vec![urn.to_raw(false)],
            modification: UrnsModification::Append,
        }));
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(ADD_CONTACT_URN, self)
    }
}

/// Looks up groups in the session assets, logging unknown ones.
fn resolve_groups(scope: &mut RunScope<'_>, groups: &[AssetRef]) -> Vec<AssetRef> {
    let assets = scope.assets();
    let mut resolved = Vec::with_capacity(groups.len());
    for group in groups {
        match assets.group(&group.uuid) {
            Some(def) => resolved.push(AssetRef::new(def.uuid.clone(), def.name.clone())),
            None => scope.error(format!("no such group with UUID '{}'", group.uuid)),
        }
    }
    resolved
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddContactGroupsAction {
    pub uuid: String,
    pub groups: Vec<AssetRef>,
}

impl Action for AddContactGroupsAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        ADD_CONTACT_GROUPS
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        let groups = resolve_groups(scope, &self.groups);
        if !groups.is_empty() {
            scope.apply_modifier(Modifier::Groups(GroupsModifier {
                groups,
                modification: GroupsModification::Add,
            }));
        }
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(ADD_CONTACT_GROUPS, self)
    }
}

/// Removes the listed groups, or every group when `all_groups` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveContactGroupsAction {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<AssetRef>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub all_groups: bool,
}

impl Action for RemoveContactGroupsAction {
    fn uuid(&self) -> &str {
        &self.uuid
    }

    fn type_name(&self) -> &'static str {
        REMOVE_CONTACT_GROUPS
    }

    fn validate(&self) -> Result<(), ValidationError> {
        if self.all_groups && !self.groups.is_empty() {
            return Err(ValidationError::new(
                self,
                "can't specify groups when removing from all groups",
            ));
        }
        Ok(())
    }

    fn execute(&self, scope: &mut RunScope<'_>) -> Result<(), ActionError> {
        let groups = if self.all_groups {
            scope.contact().groups.clone()
        } else {
            resolve_groups(scope, &self.groups)
        };
        if !groups.is_empty() {
            scope.apply_modifier(Modifier::Groups(GroupsModifier {
                groups,
                modification: GroupsModification::Remove,
            }));
        }
        Ok(())
    }

    fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        encode_typed(REMOVE_CONTACT_GROUPS, self)
    }
}
