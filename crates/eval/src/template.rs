//! Template evaluation: substitutes `@` expressions into free text.
//!
//! Supported markers:
//! - `@path` where the first segment is a top-level context key
//!   (`@contact.name`, `@results.color.category`). Any other `@word` is left
//!   as literal text, so email addresses survive untouched.
//! - `@(path)` for paths that need brackets or quoting
//!   (`@(results["my key"].value)`).
//! - `@@` for a literal `@`.
//!
//! Each expression is resolved against the context, rendered, optionally
//! escaped and substituted. Failures render as an inline error marker and are
//! also returned to the caller.

use serde::{Deserialize, Serialize};

use crate::context::Queryable;
use crate::resolver::resolve_path;
use crate::types::{Value, ValueError};

/// Escaping applied to each substituted value (never to the literal text).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Escaping {
    #[default]
    None,
    /// `application/x-www-form-urlencoded` escaping, for URLs.
    Url,
    /// JSON string-literal escaping without the surrounding quotes.
    Json,
}

impl Escaping {
    pub fn apply(self, text: &str) -> String {
        match self {
            Escaping::None => text.to_string(),
            Escaping::Url => url::form_urlencoded::byte_serialize(text.as_bytes()).collect(),
            Escaping::Json => {
                let quoted = serde_json::Value::String(text.to_string()).to_string();
                quoted[1..quoted.len() - 1].to_string()
            }
        }
    }
}

/// Options for a single template evaluation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TemplateOptions {
    pub escaping: Escaping,
    /// Truncate the whole output to this many characters.
    pub max_length: Option<usize>,
}

impl TemplateOptions {
    pub fn truncated(max_length: usize) -> Self {
        TemplateOptions {
            escaping: Escaping::None,
            max_length: Some(max_length),
        }
    }

    pub fn escaped(escaping: Escaping) -> Self {
        TemplateOptions {
            escaping,
            max_length: None,
        }
    }
}

/// A context root plus the top-level keys that bare `@path` markers may use.
pub struct Scope<'a> {
    pub root: &'a dyn Queryable,
    pub top_level: &'a [&'a str],
}

impl<'a> Scope<'a> {
    pub fn new(root: &'a dyn Queryable, top_level: &'a [&'a str]) -> Self {
        Scope { root, top_level }
    }

    /// Resolves a single expression path.
    pub fn resolve(&self, path: &str) -> Value {
        resolve_path(self.root, path)
    }

    /// Evaluates `template`, returning the substituted text and any errors.
    pub fn evaluate(&self, template: &str, options: TemplateOptions) -> (String, Vec<ValueError>) {
        evaluate_template(self, template, options)
    }

    /// Context keys match exactly, like every lookup below them.
    fn is_top_level(&self, name: &str) -> bool {
        self.top_level.contains(&name)
    }
}

enum Token<'t> {
    Literal(&'t str),
    Expression(&'t str),
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Splits a template into literal and expression tokens.
fn tokenize<'t>(template: &'t str, scope: &Scope<'_>) -> Vec<Token<'t>> {
    let mut tokens = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;
    let bytes = template.as_bytes();

    while pos < bytes.len() {
        if bytes[pos] != b'@' {
            pos += 1;
            continue;
        }
        let rest = &template[pos + 1..];

        // @@ is an escaped @
        if rest.starts_with('@') {
            tokens.push(Token::Literal(&template[literal_start..pos + 1]));
            pos += 2;
            literal_start = pos;
            continue;
        }

        if rest.starts_with('(') {
            if let Some(close) = find_closing_paren(rest) {
                tokens.push(Token::Literal(&template[literal_start..pos]));
                tokens.push(Token::Expression(rest[1..close].trim()));
                pos += 1 + close + 1;
                literal_start = pos;
                continue;
            }
            pos += 1;
            continue;
        }

        let ident_len: usize = rest
            .char_indices()
            .find(|(_, c)| !(is_ident_char(*c) || *c == '.'))
            .map(|(i, _)| i)
            .unwrap_or(rest.len());
        let path = rest[..ident_len].trim_end_matches('.');
        let root = path.split('.').next().unwrap_or("");

        if !root.is_empty() && !path.contains("..") && scope.is_top_level(root) {
            tokens.push(Token::Literal(&template[literal_start..pos]));
            tokens.push(Token::Expression(path));
            pos += 1 + path.len();
            literal_start = pos;
        } else {
            pos += 1;
        }
    }
    if literal_start < template.len() {
        tokens.push(Token::Literal(&template[literal_start..]));
    }
    tokens
}

/// Returns the byte offset of the `)` matching the `(` at offset 0, skipping
/// over quoted strings.
fn find_closing_paren(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for (i, c) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == q {
                quote = None;
            }
            continue;
        }
        match c {
            '"' | '\'' => quote = Some(c),
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Evaluates a template against `scope`.
pub fn evaluate_template(
    scope: &Scope<'_>,
    template: &str,
    options: TemplateOptions,
) -> (String, Vec<ValueError>) {
    let mut output = String::with_capacity(template.len());
    let mut errors = Vec::new();

    for token in tokenize(template, scope) {
        match token {
            Token::Literal(text) => output.push_str(text),
            Token::Expression(path) => {
                let value = scope.resolve(path);
                if let Value::Error(e) = &value {
                    errors.push(e.clone());
                }
                output.push_str(&options.escaping.apply(&value.render()));
            }
        }
    }

    if let Some(max) = options.max_length {
        if output.chars().count() > max {
            output = output.chars().take(max).collect();
        }
    }
    (output, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Fields, Item};

    const KEYS: &[&str] = &["contact", "results", "input"];

    fn with_scope<R>(f: impl FnOnce(&Scope<'_>) -> R) -> R {
        let contact = Value::dict([
            ("name", Value::text("Ryan Lewis")),
            ("first_name", Value::text("Ryan")),
            ("age", Value::from(33i64)),
        ]);
        let results = Value::dict([(
            "favorite color",
            Value::dict([("value", Value::text("red & blue"))]),
        )]);
        let root = Fields::new("context")
            .with("contact", Item::borrowed(&contact))
            .with("results", Item::borrowed(&results));
        let scope = Scope::new(&root, KEYS);
        f(&scope)
    }

    fn eval(template: &str) -> (String, Vec<ValueError>) {
        with_scope(|scope| scope.evaluate(template, TemplateOptions::default()))
    }

    #[test]
    fn substitutes_bare_paths() {
        let (out, errors) = eval("Hi @contact.first_name, you are @contact.age.");
        assert_eq!(out, "Hi Ryan, you are 33.");
        assert!(errors.is_empty());
    }

    #[test]
    fn parenthesized_paths_allow_quoted_keys() {
        let (out, errors) = eval("Color: @(results[\"favorite color\"].value)!");
        assert_eq!(out, "Color: red & blue!");
        assert!(errors.is_empty());
    }

    #[test]
    fn unknown_roots_stay_literal() {
        let (out, errors) = eval("Mail bob@example.com or @nobody.here");
        assert_eq!(out, "Mail bob@example.com or @nobody.here");
        assert!(errors.is_empty());
    }

    #[test]
    fn capitalized_roots_stay_literal() {
        let (out, errors) = eval("Hi @Contact.name / @contact.name");
        assert_eq!(out, "Hi @Contact.name / Ryan Lewis");
        assert!(errors.is_empty());
    }

    #[test]
    fn double_at_is_literal() {
        let (out, _) = eval("Tweet @@contact now");
        assert_eq!(out, "Tweet @contact now");
    }

    #[test]
    fn errors_render_inline_and_are_returned() {
        let (out, errors) = eval("Hello @contact.nickname, bye");
        assert_eq!(out, "Hello ERROR: dict has no property 'nickname', bye");
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValueError::NoSuchKey { .. }));
    }

    #[test]
    fn unclosed_paren_is_literal() {
        let (out, errors) = eval("oops @(contact.name");
        assert_eq!(out, "oops @(contact.name");
        assert!(errors.is_empty());
    }

    #[test]
    fn url_escaping_applies_only_to_substitutions() {
        let out = with_scope(|scope| {
            scope
                .evaluate(
                    "http://example.com/?name=@contact.name&c=@(results[\"favorite color\"].value)",
                    TemplateOptions::escaped(Escaping::Url),
                )
                .0
        });
        assert_eq!(
            out,
            "http://example.com/?name=Ryan+Lewis&c=red+%26+blue"
        );
    }

    #[test]
    fn json_escaping() {
        assert_eq!(Escaping::Json.apply("say \"hi\"\n"), "say \\\"hi\\\"\\n");
    }

    #[test]
    fn truncates_whole_output_by_characters() {
        let out = with_scope(|scope| {
            scope
                .evaluate("héllo @contact.first_name", TemplateOptions::truncated(8))
                .0
        });
        assert_eq!(out, "héllo Ry");
    }
}
