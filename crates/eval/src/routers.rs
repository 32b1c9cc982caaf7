//! Switch routers and the tests their cases apply.
//!
//! A router evaluates its operand, tries each case in order and picks the
//! category of the first case that matches, falling back to the default
//! category. Case arguments are templates and are evaluated at routing time.

use std::fmt;

use regex::{Regex, RegexBuilder};
use rust_decimal::Decimal;
use switchboard_interchange::{CaseDef, RouterDef};

use crate::flow::RunScope;
use crate::numeric;
use crate::types::Value;

/// Operand used when a router doesn't declare one.
pub const DEFAULT_OPERAND: &str = "@input.text";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    Msg,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub uuid: String,
    pub name: String,
    pub exit_uuid: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Case {
    pub uuid: String,
    pub test: Test,
    pub arguments: Vec<String>,
    pub category_uuid: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Test {
    HasText,
    HasAnyWord,
    HasAllWords,
    HasPhrase,
    HasOnlyPhrase,
    HasBeginning,
    HasOnlyText,
    HasNumber,
    HasNumberEq,
    HasNumberLt,
    HasNumberLte,
    HasNumberGt,
    HasNumberGte,
    HasNumberBetween,
    HasPattern,
    HasEmail,
    HasCategory,
}

/// What a router tests: the evaluated operand, plus the category of the
/// result it names when the operand is a single result reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Operand {
    pub text: String,
    pub category: Option<String>,
}

impl Operand {
    pub fn text(text: impl Into<String>) -> Self {
        Operand {
            text: text.into(),
            category: None,
        }
    }
}

/// A successful test.
#[derive(Debug, Clone, PartialEq)]
pub struct Match {
    pub value: String,
    pub extra: Option<serde_json::Value>,
}

impl Match {
    fn new(value: impl Into<String>) -> Option<Match> {
        Some(Match {
            value: value.into(),
            extra: None,
        })
    }
}

impl Test {
    pub fn parse(name: &str) -> Option<Test> {
        Some(match name {
            "has_text" => Test::HasText,
            "has_any_word" => Test::HasAnyWord,
            "has_all_words" => Test::HasAllWords,
            "has_phrase" => Test::HasPhrase,
            "has_only_phrase" => Test::HasOnlyPhrase,
            "has_beginning" => Test::HasBeginning,
            "has_only_text" => Test::HasOnlyText,
            "has_number" => Test::HasNumber,
            "has_number_eq" => Test::HasNumberEq,
            "has_number_lt" => Test::HasNumberLt,
            "has_number_lte" => Test::HasNumberLte,
            "has_number_gt" => Test::HasNumberGt,
            "has_number_gte" => Test::HasNumberGte,
            "has_number_between" => Test::HasNumberBetween,
            "has_pattern" => Test::HasPattern,
            "has_email" => Test::HasEmail,
            "has_category" => Test::HasCategory,
            _ => return None,
        })
    }

    pub fn name(self) -> &'static str {
        match self {
            Test::HasText => "has_text",
            Test::HasAnyWord => "has_any_word",
            Test::HasAllWords => "has_all_words",
            Test::HasPhrase => "has_phrase",
            Test::HasOnlyPhrase => "has_only_phrase",
            Test::HasBeginning => "has_beginning",
            Test::HasOnlyText => "has_only_text",
            Test::HasNumber => "has_number",
            Test::HasNumberEq => "has_number_eq",
            Test::HasNumberLt => "has_number_lt",
            Test::HasNumberLte => "has_number_lte",
            Test::HasNumberGt => "has_number_gt",
            Test::HasNumberGte => "has_number_gte",
            Test::HasNumberBetween => "has_number_between",
            Test::HasPattern => "has_pattern",
            Test::HasEmail => "has_email",
            Test::HasCategory => "has_category",
        }
    }

    /// How many arguments the test takes; `None` means one or more.
    fn arity(self) -> Option<usize> {
        match self {
            Test::HasText | Test::HasNumber | Test::HasEmail => Some(0),
            Test::HasNumberBetween => Some(2),
            Test::HasCategory => None,
            _ => Some(1),
        }
    }

    /// Applies the test to `operand` with already-evaluated `args`.
    pub fn evaluate(self, operand: &Operand, args: &[String]) -> Result<Option<Match>, String> {
        let text = operand.text.as_str();
        let arg = |i: usize| args.get(i).map(String::as_str).unwrap_or("");

        Ok(match self {
            Test::HasText => {
                let trimmed = text.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Match::new(trimmed)
                }
            }
            Test::HasAnyWord => {
                let wanted = lowercase_words(arg(0));
                let found: Vec<&str> = words(text)
                    .into_iter()
                    .filter(|w| wanted.contains(&w.to_lowercase()))
                    .collect();
                if found.is_empty() {
                    None
                } else {
                    Match::new(found.join(" "))
                }
            }
            Test::HasAllWords => {
                let input = words(text);
                let lowered: Vec<String> = input.iter().map(|w| w.to_lowercase()).collect();
                let wanted = lowercase_words(arg(0));
                if wanted.is_empty() || !wanted.iter().all(|w| lowered.contains(w)) {
                    None
                } else {
                    let found: Vec<&str> = input
                        .into_iter()
                        .zip(&lowered)
                        .filter(|(_, l)| wanted.contains(*l))
                        .map(|(w, _)| w)
                        .collect();
                    Match::new(found.join(" "))
                }
            }
            Test::HasPhrase => {
                let input = words(text);
                let phrase = lowercase_words(arg(0));
                if phrase.is_empty() {
                    return Ok(Match::new(""));
                }
                input
                    .windows(phrase.len())
                    .find(|window| {
                        window
                            .iter()
                            .zip(&phrase)
                            .all(|(w, p)| w.to_lowercase() == *p)
                    })
                    .and_then(|window| Match::new(window.join(" ")))
            }
            Test::HasOnlyPhrase => {
                let input = words(text);
                let lowered: Vec<String> = input.iter().map(|w| w.to_lowercase()).collect();
                if lowered == lowercase_words(arg(0)) {
                    Match::new(input.join(" "))
                } else {
                    None
                }
            }
            Test::HasBeginning => {
                let input = text.trim();
                let prefix = arg(0).trim();
                let len = prefix.chars().count();
                let head: String = input.chars().take(len).collect();
                if !prefix.is_empty() && head.to_lowercase() == prefix.to_lowercase() {
                    Match::new(head)
                } else {
                    None
                }
            }
            Test::HasOnlyText => {
                if text.trim() == arg(0).trim() {
                    Match::new(text.trim())
                } else {
                    None
                }
            }
            Test::HasNumber => first_number(text, |_| true),
            Test::HasNumberEq => {
                let n = parse_argument(arg(0))?;
                first_number(text, |x| x == n)
            }
            Test::HasNumberLt => {
                let n = parse_argument(arg(0))?;
                first_number(text, |x| x < n)
            }
            Test::HasNumberLte => {
                let n = parse_argument(arg(0))?;
                first_number(text, |x| x <= n)
            }
            Test::HasNumberGt => {
                let n = parse_argument(arg(0))?;
                first_number(text, |x| x > n)
            }
            Test::HasNumberGte => {
                let n = parse_argument(arg(0))?;
                first_number(text, |x| x >= n)
            }
            Test::HasNumberBetween => {
                let min = parse_argument(arg(0))?;
                let max = parse_argument(arg(1))?;
                first_number(text, |x| x >= min && x <= max)
            }
            Test::HasPattern => {
                let pattern = RegexBuilder::new(arg(0))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| format!("invalid regular expression '{}': {}", arg(0), e))?;
                pattern.captures(text).map(|caps| {
                    let groups: serde_json::Map<String, serde_json::Value> = caps
                        .iter()
                        .enumerate()
                        .map(|(i, m)| {
                            let text = m.map_or("", |m| m.as_str());
                            (i.to_string(), serde_json::Value::String(text.to_string()))
                        })
                        .collect();
                    Match {
                        value: caps.get(0).map_or("", |m| m.as_str()).to_string(),
                        extra: Some(serde_json::Value::Object(groups)),
                    }
                })
            }
            Test::HasEmail => email_pattern()?
                .find(text)
                .and_then(|m| Match::new(m.as_str().trim_end_matches('.'))),
            Test::HasCategory => {
                let category = operand.category.as_deref().unwrap_or("");
                if !category.is_empty() && args.iter().any(|a| a.trim().eq_ignore_ascii_case(category)) {
                    Match::new(category)
                } else {
                    None
                }
            }
        })
    }
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Splits text into words at anything that isn't a letter or digit.
fn words(text: &str) -> Vec<&str> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect()
}

fn lowercase_words(text: &str) -> Vec<String> {
    words(text).into_iter().map(str::to_lowercase).collect()
}

fn parse_argument(text: &str) -> Result<Decimal, String> {
    numeric::parse_decimal(text.trim())
        .ok_or_else(|| format!("argument '{}' isn't a number", text))
}

/// The first number in `text` accepted by `accept`.
fn first_number(text: &str, accept: impl Fn(Decimal) -> bool) -> Option<Match> {
    text.split_whitespace()
        .filter_map(|token| {
            let token = token
                .trim_start_matches(|c: char| !(c.is_ascii_digit() || matches!(c, '-' | '+' | '.')))
                .trim_end_matches(|c: char| !c.is_ascii_digit());
            numeric::parse_decimal(token)
        })
        .find(|n| accept(*n))
        .and_then(|n| Match::new(n.normalize().to_string()))
}

fn email_pattern() -> Result<Regex, String> {
    Regex::new(r"[^\s@]+@[^\s@]+\.[^\s@]+").map_err(|e| e.to_string())
}

/// The expression path of an operand that is a single `@path` or `@(path)`.
fn single_path(operand: &str) -> Option<&str> {
    let operand = operand.trim();
    let rest = operand.strip_prefix('@')?;
    if let Some(inner) = rest.strip_prefix('(').and_then(|r| r.strip_suffix(')')) {
        return Some(inner.trim());
    }
    if !rest.is_empty() && rest.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        Some(rest)
    } else {
        None
    }
}

/// Where a router sent a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub category: Category,
    pub value: String,
    pub operand: String,
    pub extra: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    pub wait: Option<Wait>,
    pub result_name: Option<String>,
    pub categories: Vec<Category>,
    pub operand: String,
    pub cases: Vec<Case>,
    pub default_category_uuid: String,
}

impl Router {
    pub fn from_def(def: RouterDef) -> Result<Router, String> {
        if def.router_type != "switch" {
            return Err(format!("unknown router type '{}'", def.router_type));
        }
        let wait = match def.wait {
            None => None,
            Some(w) if w.wait_type == "msg" => Some(Wait::Msg),
            Some(w) => return Err(format!("unknown wait type '{}'", w.wait_type)),
        };
        let cases = def
            .cases
            .into_iter()
            .map(Case::from_def)
            .collect::<Result<Vec<_>, _>>()?;
        let default_category_uuid = def
            .default_category_uuid
            .ok_or_else(|| "router has no default category".to_string())?;

        Ok(Router {
            wait,
            result_name: def.result_name.filter(|n| !n.trim().is_empty()),
            categories: def
                .categories
                .into_iter()
                .map(|c| Category {
                    uuid: c.uuid,
                    name: c.name,
                    exit_uuid: c.exit_uuid,
                })
                .collect(),
            operand: def
                .operand
                .filter(|o| !o.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_OPERAND.to_string()),
            cases,
            default_category_uuid,
        })
    }

    pub fn category(&self, uuid: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.uuid == uuid)
    }

    /// Picks a category. Cases whose arguments can't be used log an error
    /// and are skipped. An operand that fails to evaluate skips every case
    /// and takes the default category with an empty value.
    pub fn route(&self, scope: &mut RunScope<'_>) -> Option<Route> {
        let Some(text) = scope.try_evaluate(&self.operand) else {
            let category = self.category(&self.default_category_uuid)?.clone();
            return Some(Route {
                category,
                value: String::new(),
                operand: String::new(),
                extra: None,
            });
        };

        let mut operand = Operand::text(text);
        if self.cases.iter().any(|c| c.test == Test::HasCategory) {
            if let Some(path) = single_path(&self.operand) {
                operand.category = match scope.resolve(&format!("{}.category", path)) {
                    Value::Error(_) => None,
                    category => Some(category.render()),
                };
            }
        }

        for case in &self.cases {
            let args: Vec<String> = case.arguments.iter().map(|a| scope.evaluate(a)).collect();
            match case.test.evaluate(&operand, &args) {
                Ok(Some(m)) => {
                    let category = self.category(&case.category_uuid)?.clone();
                    return Some(Route {
                        category,
                        value: m.value,
                        operand: operand.text,
                        extra: m.extra,
                    });
                }
                Ok(None) => {}
                Err(message) => scope.error(format!("{}: {}", case.test, message)),
            }
        }

        let category = self.category(&self.default_category_uuid)?.clone();
        Some(Route {
            category,
            value: operand.text.clone(),
            operand: operand.text,
            extra: None,
        })
    }
}

impl Case {
    fn from_def(def: CaseDef) -> Result<Case, String> {
        let test = Test::parse(&def.case_type)
            .ok_or_else(|| format!("unknown test type '{}'", def.case_type))?;
        let ok = match test.arity() {
            Some(n) => def.arguments.len() == n,
            None => !def.arguments.is_empty(),
        };
        if !ok {
            return Err(format!(
                "case '{}' has {} arguments for {}",
                def.uuid,
                def.arguments.len(),
                test
            ));
        }
        Ok(Case {
            uuid: def.uuid,
            test,
            arguments: def.arguments,
            category_uuid: def.category_uuid,
        })
    }
}
