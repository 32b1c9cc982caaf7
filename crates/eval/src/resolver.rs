//! Path resolution against the queryable context graph.
//!
//! A path like `contact.urns[0].path` or `results["my key"].value` is split
//! into segments and walked one step at a time. Failures never abort: they
//! come back as [`Value::Error`] so templates can render them inline.

use std::iter::Peekable;
use std::str::Chars;

use crate::context::{Item, Queryable};
use crate::types::{Value, ValueError};

/// One path segment. Quoted segments are always treated as keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub text: String,
    pub quoted: bool,
}

impl Segment {
    fn plain(text: impl Into<String>) -> Self {
        Segment {
            text: text.into(),
            quoted: false,
        }
    }

    fn quoted(text: impl Into<String>) -> Self {
        Segment {
            text: text.into(),
            quoted: true,
        }
    }
}

/// Splits a path at unquoted `.` and `[`/`]` boundaries.
pub fn split_path(path: &str) -> Result<Vec<Segment>, ValueError> {
    let invalid = |reason: &str| ValueError::message(format!("invalid path '{}': {}", path, reason));

    let mut segments = Vec::new();
    let mut current = String::new();
    let mut chars = path.chars().peekable();
    // set right after a closing bracket, where a segment may legally be empty
    let mut after_bracket = false;

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if current.is_empty() && !after_bracket {
                    return Err(invalid("empty segment"));
                }
                if !current.is_empty() {
                    segments.push(Segment::plain(std::mem::take(&mut current)));
                }
                after_bracket = false;
                if chars.peek().is_none() {
                    return Err(invalid("trailing '.'"));
                }
            }
            '[' => {
                if !current.is_empty() {
                    segments.push(Segment::plain(std::mem::take(&mut current)));
                } else if segments.is_empty() {
                    return Err(invalid("path can't start with '['"));
                }
                segments.push(read_bracketed(&mut chars).map_err(|r| invalid(r))?);
                after_bracket = true;
                match chars.peek() {
                    None | Some('.') | Some('[') => {}
                    Some(_) => return Err(invalid("expected '.' or '[' after ']'")),
                }
            }
            ']' => return Err(invalid("unexpected ']'")),
            c => {
                after_bracket = false;
                current.push(c);
            }
        }
    }
    if !current.is_empty() {
        segments.push(Segment::plain(current));
    }
    if segments.is_empty() {
        return Err(invalid("empty path"));
    }
    Ok(segments)
}

fn read_bracketed(chars: &mut Peekable<Chars<'_>>) -> Result<Segment, &'static str> {
    while chars.next_if(|c| c.is_whitespace()).is_some() {}

    let segment = match chars.peek().copied() {
        Some(quote @ ('"' | '\'')) => {
            chars.next();
            let mut key = String::new();
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some(escaped) => key.push(escaped),
                        None => return Err("unterminated quoted key"),
                    },
                    Some(c) if c == quote => break,
                    Some(c) => key.push(c),
                    None => return Err("unterminated quoted key"),
                }
            }
            while chars.next_if(|c| c.is_whitespace()).is_some() {}
            Segment::quoted(key)
        }
        _ => {
            let mut key = String::new();
            while let Some(c) = chars.next_if(|c| *c != ']') {
                key.push(c);
            }
            let key = key.trim();
            if key.is_empty() {
                return Err("empty brackets");
            }
            Segment::plain(key)
        }
    };

    match chars.next() {
        Some(']') => Ok(segment),
        _ => Err("unclosed '['"),
    }
}

/// Resolves `path` starting at `root`.
pub fn resolve_path(root: &dyn Queryable, path: &str) -> Value {
    match split_path(path) {
        Ok(segments) => resolve_segments(root, &segments, path),
        Err(e) => Value::Error(e),
    }
}

/// Resolves pre-split segments. `path` is only used in error messages.
pub fn resolve_segments(root: &dyn Queryable, segments: &[Segment], path: &str) -> Value {
    walk(Item::Entity(root), segments, path)
}

// Recursive so that items produced by a step stay alive while later steps
// borrow from them.
fn walk(item: Item<'_>, segments: &[Segment], path: &str) -> Value {
    if let Item::Value(v) = &item {
        if let Value::Error(e) = &**v {
            return Value::Error(e.clone());
        }
    }

    let Some((segment, rest)) = segments.split_first() else {
        return atomize(item, path);
    };

    match step(item.as_queryable(), segment) {
        Ok(next) => walk(next, rest, path),
        Err(e) => Value::Error(e),
    }
}

fn step<'a>(entity: &'a dyn Queryable, segment: &Segment) -> Result<Item<'a>, ValueError> {
    let capability = entity.capability();

    if !segment.quoted && capability.is_indexed() {
        if let Ok(index) = segment.text.parse::<i64>() {
            let length = entity.length();
            let resolved = if index < 0 {
                index + length as i64
            } else {
                index
            };
            if resolved < 0 || resolved >= length as i64 {
                return Err(ValueError::IndexOutOfRange { index, length });
            }
            return entity.index(resolved as usize);
        }
    }

    if capability.is_keyed() {
        return entity.resolve(&segment.text);
    }

    Err(ValueError::NotResolvable {
        key: segment.text.clone(),
        kind: entity.describe(),
    })
}

fn atomize(item: Item<'_>, path: &str) -> Value {
    match item {
        Item::Value(v) => v.into_owned(),
        other => {
            let entity = other.as_queryable();
            entity.atomize().unwrap_or_else(|| {
                let kind = entity.describe();
                tracing::error!(path, kind = %kind, "path resolved to a value outside the value set");
                Value::Error(ValueError::UnsupportedKind {
                    path: path.to_string(),
                    kind,
                })
            })
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Capability, Fields};

    struct Shelf {
        books: Vec<Value>,
    }

    impl Queryable for Shelf {
        fn describe(&self) -> String {
            "shelf".to_string()
        }
        fn capability(&self) -> Capability {
            Capability::KeyedIndexed
        }
        fn resolve(&self, key: &str) -> Result<Item<'_>, ValueError> {
            match key {
                "count" => Ok(Item::value(Value::from(self.books.len() as i64))),
                "0" => Ok(Item::text("key zero")),
                _ => Err(ValueError::NoSuchKey {
                    container: "shelf".to_string(),
                    key: key.to_string(),
                }),
            }
        }
        fn length(&self) -> usize {
            self.books.len()
        }
        fn index(&self, index: usize) -> Result<Item<'_>, ValueError> {
            Ok(Item::borrowed(&self.books[index]))
        }
        fn atomize(&self) -> Option<Value> {
            Some(Value::text(format!("{} books", self.books.len())))
        }
    }

    struct Opaque;

    impl Queryable for Opaque {
        fn describe(&self) -> String {
            "opaque".to_string()
        }
        fn capability(&self) -> Capability {
            Capability::Atomic
        }
        fn atomize(&self) -> Option<Value> {
            None
        }
    }

    fn seg(s: &str) -> Segment {
        Segment::plain(s)
    }

    #[test]
    fn split_dotted_and_bracketed() {
        assert_eq!(
            split_path("contact.urns[0].path").unwrap(),
            vec![seg("contact"), seg("urns"), seg("0"), seg("path")]
        );
        assert_eq!(
            split_path("results[\"my key.with dots\"].value").unwrap(),
            vec![
                seg("results"),
                Segment::quoted("my key.with dots"),
                seg("value")
            ]
        );
        assert_eq!(
            split_path("a['b']['c d']").unwrap(),
            vec![seg("a"), Segment::quoted("b"), Segment::quoted("c d")]
        );
        assert_eq!(split_path("a[-1]").unwrap(), vec![seg("a"), seg("-1")]);
    }

    #[test]
    fn split_rejects_malformed_paths() {
        for path in ["", "a..b", "a.", "[0]", "a[0", "a[\"x]", "a]", "a[]", "a[0]b"] {
            assert!(split_path(path).is_err(), "{:?} should fail", path);
        }
    }

    fn shelf() -> Shelf {
        Shelf {
            books: vec![
                Value::dict([("title", Value::text("Dune"))]),
                Value::dict([("title", Value::text("Emma"))]),
            ],
        }
    }

    #[test]
    fn resolves_keys_and_indexes() {
        let shelf = shelf();
        let root = Fields::new("root").with("shelf", Item::Entity(&shelf));
        assert_eq!(
            resolve_path(&root, "shelf[1].title"),
            Value::text("Emma")
        );
        assert_eq!(resolve_path(&root, "shelf.0.title"), Value::text("Dune"));
        assert_eq!(resolve_path(&root, "shelf.count"), Value::from(2i64));
        assert_eq!(resolve_path(&root, "shelf"), Value::text("2 books"));
    }

    #[test]
    fn quoted_numeric_segment_is_a_key() {
        let shelf = shelf();
        let root = Fields::new("root").with("shelf", Item::Entity(&shelf));
        assert_eq!(resolve_path(&root, "shelf[\"0\"]"), Value::text("key zero"));
    }

    #[test]
    fn negative_indexes_count_from_the_end() {
        let shelf = shelf();
        let root = Fields::new("root").with("shelf", Item::Entity(&shelf));
        assert_eq!(resolve_path(&root, "shelf[-1].title"), Value::text("Emma"));
        assert_eq!(resolve_path(&root, "shelf[-2].title"), Value::text("Dune"));
        assert_eq!(
            resolve_path(&root, "shelf[-3]"),
            Value::Error(ValueError::IndexOutOfRange {
                index: -3,
                length: 2
            })
        );
        assert_eq!(
            resolve_path(&root, "shelf[2]"),
            Value::Error(ValueError::IndexOutOfRange {
                index: 2,
                length: 2
            })
        );
    }

    #[test]
    fn unknown_keys_and_unresolvable_values() {
        let shelf = shelf();
        let root = Fields::new("root").with("shelf", Item::Entity(&shelf));
        assert_eq!(
            resolve_path(&root, "shelf[0].author"),
            Value::Error(ValueError::NoSuchKey {
                container: "dict".to_string(),
                key: "author".to_string()
            })
        );
        assert_eq!(
            resolve_path(&root, "shelf[0].title.length"),
            Value::Error(ValueError::NotResolvable {
                key: "length".to_string(),
                kind: "\"Dune\"".to_string()
            })
        );
    }

    #[test]
    fn non_integer_segment_on_array_is_not_resolvable() {
        let list = Value::Array(vec![Value::from(1i64)]);
        let root = Fields::new("root").with("list", Item::borrowed(&list));
        assert!(matches!(
            resolve_path(&root, "list.first"),
            Value::Error(ValueError::NotResolvable { .. })
        ));
    }

    #[test]
    fn errors_propagate_through_later_segments() {
        let broken = Value::Error(ValueError::message("broken upstream"));
        let root = Fields::new("root").with("broken", Item::borrowed(&broken));
        assert_eq!(
            resolve_path(&root, "broken.a.b"),
            Value::Error(ValueError::message("broken upstream"))
        );
    }

    #[test]
    fn unsupported_terminal_becomes_error_value() {
        let opaque = Opaque;
        let root = Fields::new("root").with("thing", Item::Entity(&opaque));
        assert_eq!(
            resolve_path(&root, "thing"),
            Value::Error(ValueError::UnsupportedKind {
                path: "thing".to_string(),
                kind: "opaque".to_string()
            })
        );
    }

    #[test]
    fn owned_intermediate_items_resolve() {
        struct Maker;
        impl Queryable for Maker {
            fn describe(&self) -> String {
                "maker".to_string()
            }
            fn capability(&self) -> Capability {
                Capability::Keyed
            }
            fn resolve(&self, _key: &str) -> Result<Item<'_>, ValueError> {
                Ok(Item::Owned(Box::new(Fields::new("made").with(
                    "inner",
                    Item::value(Value::dict([("deep", Value::text("found"))])),
                ))))
            }
            fn atomize(&self) -> Option<Value> {
                None
            }
        }
        let maker = Maker;
        let root = Fields::new("root").with("maker", Item::Entity(&maker));
        assert_eq!(
            resolve_path(&root, "maker.anything.inner.deep"),
            Value::text("found")
        );
    }
}
