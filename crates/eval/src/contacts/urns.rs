//! Contact URNs: `scheme:path`, with an optional `#display` and an optional
//! `?channel=<uuid>` affinity.

use std::fmt;

use crate::assets::{AssetRef, SessionAssets};
use crate::context::{Capability, Item, Queryable};
use crate::types::{Value, ValueError};

const VALID_SCHEMES: &[&str] = &[
    "discord",
    "ext",
    "facebook",
    "fcm",
    "freshchat",
    "instagram",
    "jiochat",
    "line",
    "mailto",
    "rocketchat",
    "slack",
    "tel",
    "telegram",
    "twitter",
    "twitterid",
    "viber",
    "vk",
    "webchat",
    "wechat",
    "whatsapp",
];

pub fn is_valid_scheme(scheme: &str) -> bool {
    VALID_SCHEMES.contains(&scheme)
}

/// A URN belonging to a contact, with its preferred channel if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContactUrn {
    pub scheme: String,
    pub path: String,
    pub display: Option<String>,
    pub channel: Option<AssetRef>,
}

impl ContactUrn {
    pub fn new(scheme: &str, path: &str) -> Result<ContactUrn, ValueError> {
        let scheme = scheme.to_lowercase();
        if !is_valid_scheme(&scheme) {
            return Err(ValueError::message(format!(
                "unknown URN scheme: {}",
                scheme
            )));
        }
        if path.is_empty() {
            return Err(ValueError::message("URN path can't be empty"));
        }
        Ok(ContactUrn {
            scheme,
            path: path.to_string(),
            display: None,
            channel: None,
        })
    }

    /// Parses `scheme:path[?channel=uuid][#display]`. A channel in the query
    /// is recorded by UUID only; [`UrnList::read`] resolves it.
    pub fn parse(text: &str) -> Result<ContactUrn, ValueError> {
        let (scheme, rest) = text
            .split_once(':')
            .ok_or_else(|| ValueError::message(format!("'{}' is not a valid URN", text)))?;
        let (rest, display) = match rest.split_once('#') {
            Some((r, d)) => (r, Some(d.to_string()).filter(|d| !d.is_empty())),
            None => (rest, None),
        };
        let (path, query) = match rest.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (rest, None),
        };

        let mut urn = ContactUrn::new(scheme, path)?;
        urn.display = display;
        if let Some(query) = query {
            urn.channel = url::form_urlencoded::parse(query.as_bytes())
                .find(|(k, _)| k == "channel")
                .map(|(_, v)| AssetRef::new(v.into_owned(), ""));
        }
        Ok(urn)
    }

    /// `scheme:path`, the identity used when comparing URNs.
    pub fn identity(&self) -> String {
        format!("{}:{}", self.scheme, self.path)
    }

    /// Raw form, optionally with the channel query.
    pub fn to_raw(&self, include_channel: bool) -> String {
        let mut raw = self.identity();
        if include_channel {
            if let Some(channel) = &self.channel {
                raw.push_str("?channel=");
                raw.push_str(&channel.uuid);
            }
        }
        if let Some(display) = &self.display {
            raw.push('#');
            raw.push_str(display);
        }
        raw
    }
}

impl fmt::Display for ContactUrn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_raw(false))
    }
}

impl Queryable for ContactUrn {
    fn describe(&self) -> String {
        "URN".to_string()
    }

    fn capability(&self) -> Capability {
        Capability::Keyed
    }

    fn resolve(&self, key: &str) -> Result<Item<'_>, ValueError> {
        match key {
            "scheme" => Ok(Item::text(self.scheme.clone())),
            "path" => Ok(Item::text(self.path.clone())),
            "display" => Ok(Item::text(self.display.clone().unwrap_or_default())),
            "channel" => Ok(match &self.channel {
                Some(c) => Item::value(Value::dict([
                    ("uuid", Value::text(c.uuid.clone())),
                    ("name", Value::text(c.name.clone())),
                ])),
                None => Item::text(""),
            }),
            _ => Err(ValueError::NoSuchKey {
                container: "URN".to_string(),
                key: key.to_string(),
            }),
        }
    }

    fn atomize(&self) -> Option<Value> {
        Some(Value::text(self.to_raw(false)))
    }
}

/// An ordered list of a contact's URNs, highest priority first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrnList(Vec<ContactUrn>);

impl UrnList {
    pub fn new(urns: Vec<ContactUrn>) -> Self {
        UrnList(urns)
    }

    /// Parses raw URNs, resolving channel affinities against `assets`.
    pub fn read(raw: &[String], assets: &SessionAssets) -> Result<UrnList, ValueError> {
        let mut urns = Vec::with_capacity(raw.len());
        for text in raw {
            let mut urn = ContactUrn::parse(text)?;
            if let Some(channel) = &urn.channel {
                let def = assets.channel(&channel.uuid).ok_or_else(|| {
                    ValueError::message(format!("no such channel with UUID '{}'", channel.uuid))
                })?;
                urn.channel = Some(AssetRef::new(def.uuid.clone(), def.name.clone()));
            }
            urns.push(urn);
        }
        Ok(UrnList(urns))
    }

    pub fn raw(&self, include_channels: bool) -> Vec<String> {
        self.0.iter().map(|u| u.to_raw(include_channels)).collect()
    }

    /// A new list of only the URNs with `scheme`, in their original order.
    pub fn with_scheme(&self, scheme: &str) -> UrnList {
        UrnList(
            self.0
                .iter()
                .filter(|u| u.scheme == scheme)
                .cloned()
                .collect(),
        )
    }

    pub fn contains(&self, urn: &ContactUrn) -> bool {
        let identity = urn.identity();
        self.0.iter().any(|u| u.identity() == identity)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ContactUrn> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn push(&mut self, urn: ContactUrn) {
        self.0.push(urn);
    }

    pub(crate) fn retain(&mut self, f: impl FnMut(&ContactUrn) -> bool) {
        self.0.retain(f);
    }
}

impl<'a> IntoIterator for &'a UrnList {
    type Item = &'a ContactUrn;
    type IntoIter = std::slice::Iter<'a, ContactUrn>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl Queryable for UrnList {
    fn describe(&self) -> String {
        "URNs".to_string()
    }

    fn capability(&self) -> Capability {
        Capability::KeyedIndexed
    }

    fn resolve(&self, key: &str) -> Result<Item<'_>, ValueError> {
        let scheme = key.to_lowercase();
        if !is_valid_scheme(&scheme) {
            return Err(ValueError::message(format!("unknown URN scheme: {}", key)));
        }
        Ok(Item::Owned(Box::new(self.with_scheme(&scheme))))
    }

    fn length(&self) -> usize {
        self.0.len()
    }

    fn index(&self, index: usize) -> Result<Item<'_>, ValueError> {
        self.0
            .get(index)
            .map(|u| Item::Entity(u))
            .ok_or(ValueError::IndexOutOfRange {
                index: index as i64,
                length: self.0.len(),
            })
    }

    fn atomize(&self) -> Option<Value> {
        Some(Value::Array(
            self.0.iter().map(|u| Value::text(u.to_raw(false))).collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Fields;
    use crate::resolver::resolve_path;

    fn list(raw: &[&str]) -> UrnList {
        UrnList::new(raw.iter().map(|r| ContactUrn::parse(r).unwrap()).collect())
    }

    #[test]
    fn parse_parts() {
        let urn = ContactUrn::parse("tel:+12065551212?channel=ch-1#Home").unwrap();
        assert_eq!(urn.scheme, "tel");
        assert_eq!(urn.path, "+12065551212");
        assert_eq!(urn.display.as_deref(), Some("Home"));
        assert_eq!(urn.channel.as_ref().unwrap().uuid, "ch-1");
        assert_eq!(urn.to_raw(false), "tel:+12065551212#Home");
        assert_eq!(urn.to_raw(true), "tel:+12065551212?channel=ch-1#Home");
    }

    #[test]
    fn parse_rejects_bad_urns() {
        assert!(ContactUrn::parse("+12065551212").is_err());
        assert!(ContactUrn::parse("xyz:123").is_err());
        assert!(ContactUrn::parse("tel:").is_err());
        assert_eq!(ContactUrn::parse("TEL:123").unwrap().scheme, "tel");
    }

    #[test]
    fn with_scheme_preserves_order_and_source() {
        let urns = list(&["tel:1", "twitter:bob", "tel:2", "mailto:a@b.com", "tel:3"]);
        let tels = urns.with_scheme("tel");
        assert_eq!(tels.raw(false), vec!["tel:1", "tel:2", "tel:3"]);
        assert_eq!(urns.len(), 5);
        assert!(urns.with_scheme("viber").is_empty());
    }

    #[test]
    fn resolves_in_expressions() {
        let urns = list(&["tel:+1", "twitter:bob", "tel:+2"]);
        let root = Fields::new("root").with("urns", Item::Entity(&urns));
        assert_eq!(resolve_path(&root, "urns.tel.1"), Value::text("tel:+2"));
        assert_eq!(resolve_path(&root, "urns[0].path"), Value::text("+1"));
        assert_eq!(resolve_path(&root, "urns[-1].scheme"), Value::text("tel"));
        assert_eq!(
            resolve_path(&root, "urns.twitter"),
            Value::Array(vec![Value::text("twitter:bob")])
        );
        assert_eq!(
            resolve_path(&root, "urns.xyz"),
            Value::Error(ValueError::message("unknown URN scheme: xyz"))
        );
    }
}
