//! Modifiers: typed, serializable changes to a contact.
//!
//! Actions never mutate a contact directly. They build a [`Modifier`], which
//! is applied once and then recorded in the sprint. Applying a modifier is
//! idempotent: a second identical application changes nothing and emits
//! nothing. A change emits exactly one event.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use switchboard_interchange::{decode_typed, encode_typed, InterchangeError, Registry};

use crate::assets::{AssetRef, SessionAssets};
use crate::contacts::{coerce_field, Contact, ContactUrn};
use crate::envs::{Environment, Language};
use crate::events::{
    self, ContactFieldChanged, ContactGroupsChanged, ContactLanguageChanged, ContactNameChanged,
    ContactUrnsChanged, EventPayload, FieldRef,
};
use crate::services::Services;
use crate::types::{JsonConfig, Value};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameModifier {
    pub name: String,
}

/// Sets a field from text; empty text clears it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldModifier {
    pub field: FieldRef,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageModifier {
    #[serde(default)]
    pub language: Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UrnsModification {
    Append,
    Remove,
    Set,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrnsModifier {
    pub urns: Vec<String>,
    pub modification: UrnsModification,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupsModification {
    Add,
    Remove,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupsModifier {
    pub groups: Vec<AssetRef>,
    pub modification: GroupsModification,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Modifier {
    Name(NameModifier),
    Field(FieldModifier),
    Language(LanguageModifier),
    Urns(UrnsModifier),
    Groups(GroupsModifier),
}

impl Modifier {
    pub fn type_name(&self) -> &'static str {
        match self {
            Modifier::Name(_) => "name",
            Modifier::Field(_) => "field",
            Modifier::Language(_) => "language",
            Modifier::Urns(_) => "urns",
            Modifier::Groups(_) => "groups",
        }
    }

    pub fn to_json(&self) -> Result<serde_json::Value, InterchangeError> {
        let name = self.type_name();
        match self {
            Modifier::Name(m) => encode_typed(name, m),
            Modifier::Field(m) => encode_typed(name, m),
            Modifier::Language(m) => encode_typed(name, m),
            Modifier::Urns(m) => encode_typed(name, m),
            Modifier::Groups(m) => encode_typed(name, m),
        }
    }

    /// Applies this modifier to `contact`, returning whether it changed.
    pub fn apply(
        &self,
        env: &Environment,
        _services: &Services,
        assets: &SessionAssets,
        contact: &mut Contact,
        log: &mut dyn FnMut(EventPayload),
    ) -> bool {
        match self {
            Modifier::Name(m) => apply_name(m, env, contact, log),
            Modifier::Field(m) => apply_field(m, env, assets, contact, log),
            Modifier::Language(m) => apply_language(m, contact, log),
            Modifier::Urns(m) => apply_urns(m, assets, contact, log),
            Modifier::Groups(m) => apply_groups(m, assets, contact, log),
        }
    }
}

fn apply_name(
    m: &NameModifier,
    env: &Environment,
    contact: &mut Contact,
    log: &mut dyn FnMut(EventPayload),
) -> bool {
    let name = env.truncate(&m.name);
    if contact.name == name {
        return false;
    }
    contact.name = name.clone();
    log(EventPayload::ContactNameChanged(ContactNameChanged { name }));
    true
}

fn apply_field(
    m: &FieldModifier,
    env: &Environment,
    assets: &SessionAssets,
    contact: &mut Contact,
    log: &mut dyn FnMut(EventPayload),
) -> bool {
    let Some(field) = assets.field(&m.field.key) else {
        log(events::error(format!("no such field with key '{}'", m.field.key)));
        return false;
    };

    let text = env.truncate(m.value.trim());
    if text.is_empty() {
        if contact.fields.remove(&field.key).is_none() {
            return false;
        }
        log(EventPayload::ContactFieldChanged(ContactFieldChanged {
            field: FieldRef {
                key: field.key.clone(),
                name: field.name.clone(),
            },
            value: None,
        }));
        return true;
    }

    let value = coerce_field(field.value_type, &Value::Text(text));
    let json = match value.to_json(&JsonConfig::default()) {
        Ok(json) => json,
        Err(e) => {
            log(events::error(format!(
                "invalid value for field '{}': {}",
                field.key, e
            )));
            return false;
        }
    };
    if contact.fields.get(&field.key) == Some(&value) {
        return false;
    }
    contact.fields.insert(field.key.clone(), value);
    log(EventPayload::ContactFieldChanged(ContactFieldChanged {
        field: FieldRef {
            key: field.key.clone(),
            name: field.name.clone(),
        },
        value: Some(json),
    }));
    true
}

fn apply_language(
    m: &LanguageModifier,
    contact: &mut Contact,
    log: &mut dyn FnMut(EventPayload),
) -> bool {
    if contact.language == m.language {
        return false;
    }
    contact.language = m.language.clone();
    log(EventPayload::ContactLanguageChanged(ContactLanguageChanged {
        language: m.language.to_string(),
    }));
    true
}

fn apply_urns(
    m: &UrnsModifier,
    assets: &SessionAssets,
    contact: &mut Contact,
    log: &mut dyn FnMut(EventPayload),
) -> bool {
    let mut parsed = Vec::with_capacity(m.urns.len());
    for raw in &m.urns {
        match ContactUrn::parse(raw) {
            Ok(mut urn) => {
                // channel affinity must point at a known channel
                if let Some(channel) = &urn.channel {
                    urn.channel = assets
                        .channel(&channel.uuid)
                        .map(|c| AssetRef::new(c.uuid.clone(), c.name.clone()));
                }
                parsed.push(urn);
            }
            Err(e) => {
                log(events::error(e.to_string()));
                return false;
            }
        }
    }

    let before = contact.urns.raw(true);
    match m.modification {
        UrnsModification::Append => {
            for urn in parsed {
                if !contact.urns.contains(&urn) {
                    contact.urns.push(urn);
                }
            }
        }
        UrnsModification::Remove => {
            let removing: Vec<String> = parsed.iter().map(ContactUrn::identity).collect();
            contact.urns.retain(|u| !removing.contains(&u.identity()));
        }
        UrnsModification::Set => {
            let mut urns = crate::contacts::UrnList::default();
            for urn in parsed {
                if !urns.contains(&urn) {
                    urns.push(urn);
                }
            }
            contact.urns = urns;
        }
    }

    let after = contact.urns.raw(true);
    if after == before {
        return false;
    }
    log(EventPayload::ContactUrnsChanged(ContactUrnsChanged { urns: after }));
    true
}

fn apply_groups(
    m: &GroupsModifier,
    assets: &SessionAssets,
    contact: &mut Contact,
    log: &mut dyn FnMut(EventPayload),
) -> bool {
    let mut added = Vec::new();
    let mut removed = Vec::new();

    match m.modification {
        GroupsModification::Add => {
            for group in &m.groups {
                let Some(def) = assets.group(&group.uuid) else {
                    log(events::error(format!(
                        "no such group with UUID '{}'",
                        group.uuid
                    )));
                    return false;
                };
                if !contact.in_group(&def.uuid) && !added.iter().any(|g: &AssetRef| g.uuid == def.uuid) {
                    added.push(AssetRef::new(def.uuid.clone(), def.name.clone()));
                }
            }
            contact.groups.extend(added.iter().cloned());
        }
        GroupsModification::Remove => {
            contact.groups.retain(|g| {
                let removing = m.groups.iter().any(|r| r.uuid == g.uuid);
                if removing {
                    removed.push(g.clone());
                }
                !removing
            });
        }
    }

    if added.is_empty() && removed.is_empty() {
        return false;
    }
    log(EventPayload::ContactGroupsChanged(ContactGroupsChanged {
        groups_added: added,
        groups_removed: removed,
    }));
    true
}

fn body<S: DeserializeOwned>(data: &serde_json::Value) -> Result<S, InterchangeError> {
    decode_typed(data, "modifier")
}

/// The decoding table for every modifier type.
pub fn registry() -> Registry<Modifier> {
    Registry::new("modifier")
        .register("name", |d| body(d).map(Modifier::Name))
        .register("field", |d| body(d).map(Modifier::Field))
        .register("language", |d| body(d).map(Modifier::Language))
        .register("urns", |d| body(d).map(Modifier::Urns))
        .register("groups", |d| body(d).map(Modifier::Groups))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Registries;
    use serde_json::json;
    use switchboard_interchange::from_interchange;
    use time::macros::datetime;

    fn assets() -> SessionAssets {
        let bundle = from_interchange(&json!({
            "channels": [{"uuid": "ch-1", "name": "Nexmo", "schemes": ["tel"]}],
            "groups": [
                {"uuid": "g-1", "name": "Testers"},
                {"uuid": "g-2", "name": "Males"}
            ],
            "fields": [
                {"key": "age", "name": "Age", "type": "number"},
                {"key": "nickname", "name": "Nickname"}
            ]
        }))
        .unwrap();
        SessionAssets::from_bundle(bundle, &Registries::standard()).unwrap()
    }

    fn contact() -> Contact {
        Contact::new("c-1", "Bob", datetime!(2018-01-01 0:00 UTC))
    }

    /// Applies `m` and returns (changed, events).
    fn apply(
        m: &Modifier,
        env: &Environment,
        sa: &SessionAssets,
        c: &mut Contact,
    ) -> (bool, Vec<EventPayload>) {
        let mut events = Vec::new();
        let changed = m.apply(env, &Services::default(), sa, c, &mut |e| events.push(e));
        (changed, events)
    }

    fn assert_idempotent(m: &Modifier, env: &Environment, sa: &SessionAssets, c: &mut Contact) {
        let (changed, events) = apply(m, env, sa, c);
        assert!(changed, "first application of {:?} should change", m);
        assert_eq!(events.len(), 1);
        let snapshot = c.clone();
        let (changed, events) = apply(m, env, sa, c);
        assert!(!changed, "second application of {:?} should not change", m);
        assert!(events.is_empty());
        assert_eq!(*c, snapshot);
    }

    #[test]
    fn name_truncates_before_comparing() {
        let env = Environment {
            max_value_length: 5,
            ..Environment::default()
        };
        let sa = assets();
        let mut c = contact();
        let m = Modifier::Name(NameModifier {
            name: "Robert Paulson".to_string(),
        });
        assert_idempotent(&m, &env, &sa, &mut c);
        assert_eq!(c.name, "Rober");
    }

    #[test]
    fn field_set_and_clear() {
        let env = Environment::default();
        let sa = assets();
        let mut c = contact();
        let set = Modifier::Field(FieldModifier {
            field: FieldRef {
                key: "age".to_string(),
                name: "Age".to_string(),
            },
            value: " 33 ".to_string(),
        });
        assert_idempotent(&set, &env, &sa, &mut c);
        assert_eq!(c.fields["age"], Value::from(33i64));

        let clear = Modifier::Field(FieldModifier {
            field: FieldRef {
                key: "age".to_string(),
                name: "Age".to_string(),
            },
            value: String::new(),
        });
        let (_, events) = apply(&clear, &env, &sa, &mut c);
        match &events[0] {
            EventPayload::ContactFieldChanged(e) => assert_eq!(e.value, None),
            other => panic!("unexpected {:?}", other),
        }
        assert!(!c.fields.contains_key("age"));
    }

    #[test]
    fn field_with_bad_value_changes_nothing() {
        let sa = assets();
        let mut c = contact();
        let m = Modifier::Field(FieldModifier {
            field: FieldRef {
                key: "age".to_string(),
                name: "Age".to_string(),
            },
            value: "old".to_string(),
        });
        let (changed, events) = apply(&m, &Environment::default(), &sa, &mut c);
        assert!(!changed);
        assert_eq!(events[0].type_name(), "error");
        assert!(c.fields.is_empty());
    }

    #[test]
    fn language() {
        let sa = assets();
        let mut c = contact();
        let m = Modifier::Language(LanguageModifier {
            language: Language::parse("fra").unwrap(),
        });
        assert_idempotent(&m, &Environment::default(), &sa, &mut c);
        assert_eq!(c.language.as_str(), "fra");
    }

    #[test]
    fn urns_append_remove_set() {
        let env = Environment::default();
        let sa = assets();
        let mut c = contact();
        let append = Modifier::Urns(UrnsModifier {
            urns: vec!["tel:+1?channel=ch-1".to_string(), "twitter:bob".to_string()],
            modification: UrnsModification::Append,
        });
        assert_idempotent(&append, &env, &sa, &mut c);
        assert_eq!(c.urns.raw(true), vec!["tel:+1?channel=ch-1", "twitter:bob"]);

        let remove = Modifier::Urns(UrnsModifier {
            urns: vec!["tel:+1".to_string()],
            modification: UrnsModification::Remove,
        });
        assert_idempotent(&remove, &env, &sa, &mut c);
        assert_eq!(c.urns.raw(false), vec!["twitter:bob"]);

        let set = Modifier::Urns(UrnsModifier {
            urns: vec!["mailto:bob@example.com".to_string()],
            modification: UrnsModification::Set,
        });
        assert_idempotent(&set, &env, &sa, &mut c);
        assert_eq!(c.urns.raw(false), vec!["mailto:bob@example.com"]);
    }

    #[test]
    fn groups_add_and_remove() {
        let env = Environment::default();
        let sa = assets();
        let mut c = contact();
        let add = Modifier::Groups(GroupsModifier {
            groups: vec![AssetRef::new("g-1", "Testers"), AssetRef::new("g-2", "Males")],
            modification: GroupsModification::Add,
        });
        assert_idempotent(&add, &env, &sa, &mut c);
        assert_eq!(c.groups.len(), 2);

        let remove = Modifier::Groups(GroupsModifier {
            groups: vec![AssetRef::new("g-1", "Testers")],
            modification: GroupsModification::Remove,
        });
        assert_idempotent(&remove, &env, &sa, &mut c);
        assert_eq!(c.groups, vec![AssetRef::new("g-2", "Males")]);
    }

    #[test]
    fn json_round_trip_through_registry() {
        let m = Modifier::Urns(UrnsModifier {
            urns: vec!["tel:+1".to_string()],
            modification: UrnsModification::Set,
        });
        let json = m.to_json().unwrap();
        assert_eq!(
            json,
            json!({"type": "urns", "urns": ["tel:+1"], "modification": "set"})
        );
        assert_eq!(registry().read(&json).unwrap(), m);
    }
}
