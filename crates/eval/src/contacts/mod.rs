//! Contacts and their expression context.

pub mod urns;

pub use urns::{is_valid_scheme, ContactUrn, UrnList};

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::assets::{AssetRef, FieldType, SessionAssets};
use crate::context::{Capability, Item, Queryable};
use crate::dates;
use crate::envs::Language;
use crate::numeric;
use crate::types::{JsonConfig, Value, ValueError};

/// The person a session is talking to.
#[derive(Debug, Clone, PartialEq)]
pub struct Contact {
    pub uuid: String,
    pub name: String,
    pub language: Language,
    pub created_on: OffsetDateTime,
    pub urns: UrnList,
    pub groups: Vec<AssetRef>,
    pub fields: BTreeMap<String, Value>,
}

/// Wire form of a contact.
#[derive(Debug, Serialize, Deserialize)]
struct ContactEnvelope {
    uuid: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    language: Language,
    #[serde(with = "dates::rfc3339")]
    created_on: OffsetDateTime,
    #[serde(default)]
    urns: Vec<String>,
    #[serde(default)]
    groups: Vec<AssetRef>,
    #[serde(default)]
    fields: BTreeMap<String, serde_json::Value>,
}

impl Contact {
    pub fn new(uuid: impl Into<String>, name: impl Into<String>, created_on: OffsetDateTime) -> Self {
        Contact {
            uuid: uuid.into(),
            name: name.into(),
            language: Language::default(),
            created_on,
            urns: UrnList::default(),
            groups: Vec::new(),
            fields: BTreeMap::new(),
        }
    }

    /// Reads a contact, checking URN channels, groups and fields against
    /// `assets`. Field values are coerced to their declared type.
    pub fn read(data: &serde_json::Value, assets: &SessionAssets) -> Result<Contact, ValueError> {
        let envelope: ContactEnvelope = serde_json::from_value(data.clone())
            .map_err(|e| ValueError::message(format!("unable to read contact: {}", e)))?;

        let urns = UrnList::read(&envelope.urns, assets)?;

        let mut groups = Vec::with_capacity(envelope.groups.len());
        for group in envelope.groups {
            let def = assets.group(&group.uuid).ok_or_else(|| {
                ValueError::message(format!("no such group with UUID '{}'", group.uuid))
            })?;
            groups.push(AssetRef::new(def.uuid.clone(), def.name.clone()));
        }

        let mut fields = BTreeMap::new();
        for (key, raw) in &envelope.fields {
            let Some(field) = assets.field(key) else {
                tracing::warn!(field = %key, contact = %envelope.uuid, "ignoring value for unknown field");
                continue;
            };
            let value = coerce_field(field.value_type, &Value::from_json(raw));
            if let Value::Error(e) = value {
                return Err(ValueError::message(format!(
                    "invalid value for field '{}': {}",
                    key, e
                )));
            }
            fields.insert(key.clone(), value);
        }

        Ok(Contact {
            uuid: envelope.uuid,
            name: envelope.name,
            language: envelope.language,
            created_on: envelope.created_on,
            urns,
            groups,
            fields,
        })
    }

    pub fn to_json(&self, config: &JsonConfig) -> Result<serde_json::Value, ValueError> {
        let mut fields = BTreeMap::new();
        for (key, value) in &self.fields {
            fields.insert(key.clone(), value.to_json(config)?);
        }
        let envelope = ContactEnvelope {
            uuid: self.uuid.clone(),
            name: self.name.clone(),
            language: self.language.clone(),
            created_on: self.created_on,
            urns: self.urns.raw(true),
            groups: self.groups.clone(),
            fields,
        };
        serde_json::to_value(envelope).map_err(|e| ValueError::message(e.to_string()))
    }

    /// The first word of the name.
    pub fn first_name(&self) -> &str {
        self.name.split_whitespace().next().unwrap_or("")
    }

    pub fn in_group(&self, uuid: &str) -> bool {
        self.groups.iter().any(|g| g.uuid == uuid)
    }

    /// The field value, or empty text when unset.
    pub fn field_value(&self, key: &str) -> Value {
        self.fields.get(key).cloned().unwrap_or_else(|| Value::text(""))
    }
}

/// Coerces a raw value into a field's declared type. Empty text stays empty
/// text for every type and means "clear the field".
pub fn coerce_field(value_type: FieldType, value: &Value) -> Value {
    if let Value::Error(_) = value {
        return value.clone();
    }
    if let Value::Text(s) = value {
        if s.is_empty() {
            return value.clone();
        }
    }
    match value_type {
        FieldType::Text => Value::Text(value.render()),
        FieldType::Number => match numeric::to_number(value) {
            Ok(n) => Value::Number(n),
            Err(e) => Value::Error(e),
        },
        FieldType::DateTime => match value {
            Value::DateTime(_) => value.clone(),
            other => match dates::parse_datetime(&other.render()) {
                Ok(dt) => Value::DateTime(dt),
                Err(e) => Value::Error(e),
            },
        },
    }
}

// ──────────────────────────────────────────────
// Expression context
// ──────────────────────────────────────────────

/// `@fields`: every declared field, unset ones as empty text.
pub struct FieldValues<'a> {
    pub contact: &'a Contact,
    pub assets: &'a SessionAssets,
}

impl FieldValues<'_> {
    fn as_dict(&self) -> Value {
        Value::Dict(
            self.assets
                .fields()
                .map(|f| (f.key.clone(), self.contact.field_value(&f.key)))
                .collect(),
        )
    }
}

impl Queryable for FieldValues<'_> {
    fn describe(&self) -> String {
        "fields".to_string()
    }

    fn capability(&self) -> Capability {
        Capability::Keyed
    }

    fn resolve(&self, key: &str) -> Result<Item<'_>, ValueError> {
        let key = key.to_lowercase();
        if let Some(value) = self.contact.fields.get(&key) {
            return Ok(Item::borrowed(value));
        }
        if self.assets.field(&key).is_some() {
            return Ok(Item::text(""));
        }
        Err(ValueError::NoSuchKey {
            container: "fields".to_string(),
            key,
        })
    }

    fn atomize(&self) -> Option<Value> {
        Some(self.as_dict())
    }
}

/// `@contact`.
pub struct ContactContext<'a> {
    pub contact: &'a Contact,
    pub assets: &'a SessionAssets,
}

impl Queryable for ContactContext<'_> {
    fn describe(&self) -> String {
        "contact".to_string()
    }

    fn capability(&self) -> Capability {
        Capability::Keyed
    }

    fn resolve(&self, key: &str) -> Result<Item<'_>, ValueError> {
        let contact = self.contact;
        Ok(match key {
            "uuid" => Item::text(contact.uuid.clone()),
            "name" => Item::text(contact.name.clone()),
            "first_name" => Item::text(contact.first_name()),
            "language" => Item::text(contact.language.as_str()),
            "created_on" => Item::value(Value::DateTime(contact.created_on)),
            "urns" => Item::Entity(&contact.urns),
            "groups" => Item::value(Value::Array(
                contact
                    .groups
                    .iter()
                    .map(|g| {
                        Value::dict([
                            ("uuid", Value::text(g.uuid.clone())),
                            ("name", Value::text(g.name.clone())),
                        ])
                    })
                    .collect(),
            )),
            "fields" => Item::Owned(Box::new(FieldValues {
                contact,
                assets: self.assets,
            })),
            _ => {
                return Err(ValueError::NoSuchKey {
                    container: "contact".to_string(),
                    key: key.to_string(),
                })
            }
        })
    }

    fn atomize(&self) -> Option<Value> {
        Some(Value::text(self.contact.name.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Registries;
    use crate::resolver::resolve_path;
    use serde_json::json;
    use switchboard_interchange::from_interchange;

    fn assets() -> SessionAssets {
        let bundle = from_interchange(&json!({
            "channels": [{"uuid": "ch-1", "name": "Nexmo", "schemes": ["tel"]}],
            "groups": [{"uuid": "g-1", "name": "Testers"}],
            "fields": [
                {"key": "age", "name": "Age", "type": "number"},
                {"key": "joined", "name": "Joined", "type": "datetime"},
                {"key": "nickname", "name": "Nickname"}
            ]
        }))
        .unwrap();
        SessionAssets::from_bundle(bundle, &Registries::standard()).unwrap()
    }

    fn contact_json() -> serde_json::Value {
        json!({
            "uuid": "c-1",
            "name": "Ryan Lewis",
            "language": "eng",
            "created_on": "2018-06-20T11:40:30.123456789Z",
            "urns": ["tel:+12065551212?channel=ch-1", "twitter:ewok"],
            "groups": [{"uuid": "g-1", "name": "Testers"}],
            "fields": {"age": "33", "joined": "2019-01-02T03:04:05Z", "shoe": "42"}
        })
    }

    #[test]
    fn read_resolves_assets_and_coerces_fields() {
        let sa = assets();
        let contact = Contact::read(&contact_json(), &sa).unwrap();
        assert_eq!(contact.first_name(), "Ryan");
        assert_eq!(contact.urns.len(), 2);
        assert_eq!(
            contact.urns.iter().next().unwrap().channel.as_ref().unwrap().name,
            "Nexmo"
        );
        assert_eq!(contact.fields["age"], Value::from(33i64));
        assert!(matches!(contact.fields["joined"], Value::DateTime(_)));
        assert!(!contact.fields.contains_key("shoe"));
        assert!(contact.in_group("g-1"));
    }

    #[test]
    fn read_rejects_unknown_group_and_bad_field() {
        let sa = assets();
        let mut data = contact_json();
        data["groups"] = json!([{"uuid": "g-9", "name": "Ghosts"}]);
        assert!(Contact::read(&data, &sa).is_err());

        let mut data = contact_json();
        data["fields"]["age"] = json!("old");
        let err = Contact::read(&data, &sa).unwrap_err();
        assert!(err.to_string().contains("field 'age'"));
    }

    #[test]
    fn contact_context() {
        let sa = assets();
        let contact = Contact::read(&contact_json(), &sa).unwrap();
        let ctx = ContactContext {
            contact: &contact,
            assets: &sa,
        };
        assert_eq!(resolve_path(&ctx, "first_name"), Value::text("Ryan"));
        assert_eq!(
            resolve_path(&ctx, "urns.tel.0"),
            Value::text("tel:+12065551212")
        );
        assert_eq!(resolve_path(&ctx, "urns[0].channel.name"), Value::text("Nexmo"));
        assert_eq!(resolve_path(&ctx, "groups[0].name"), Value::text("Testers"));
        assert_eq!(resolve_path(&ctx, "fields.age"), Value::from(33i64));
        assert_eq!(resolve_path(&ctx, "fields.nickname"), Value::text(""));
        assert!(resolve_path(&ctx, "fields.shoe").is_error());
        assert_eq!(ctx.atomize(), Some(Value::text("Ryan Lewis")));
    }

    #[test]
    fn to_json_keeps_channel_affinity() {
        let sa = assets();
        let contact = Contact::read(&contact_json(), &sa).unwrap();
        let json = contact.to_json(&JsonConfig::default()).unwrap();
        assert_eq!(json["urns"][0], "tel:+12065551212?channel=ch-1");
        assert_eq!(json["fields"]["age"].to_string(), "33");
        let again = Contact::read(&json, &sa).unwrap();
        assert_eq!(again, contact);
    }

    #[test]
    fn coerce_field_types() {
        assert_eq!(
            coerce_field(FieldType::Number, &Value::text("1.50")),
            Value::Number("1.50".parse().unwrap())
        );
        assert_eq!(
            coerce_field(FieldType::Text, &Value::from(12i64)),
            Value::text("12")
        );
        assert_eq!(
            coerce_field(FieldType::Number, &Value::text("")),
            Value::text("")
        );
        assert!(coerce_field(FieldType::DateTime, &Value::text("soon")).is_error());
    }
}
