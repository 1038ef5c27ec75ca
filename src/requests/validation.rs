use serde::Serialize;
use std::collections::BTreeMap;
use std::net::IpAddr;
use uuid::Uuid;

/// One violated rule, reported back to the client as `{field, message}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Structural rule applied to a single text field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    Required,
    Ascii,
    Numeric,
    Email,
    Ip,
    Uuid,
    MinLen(usize),
    MaxLen(usize),
}

impl Rule {
    /// `None` when `value` satisfies the rule. Empty optional values pass every
    /// rule except `Required`.
    pub fn check(&self, field: &str, value: &str) -> Option<FieldError> {
        let ok = match self {
            Rule::Required => !value.trim().is_empty(),
            _ if value.is_empty() => true,
            Rule::Ascii => value.is_ascii(),
            Rule::Numeric => value.chars().all(|c| c.is_ascii_digit()),
            Rule::Email => is_email(value),
            Rule::Ip => value.parse::<IpAddr>().is_ok(),
            Rule::Uuid => Uuid::parse_str(value).is_ok(),
            Rule::MinLen(min) => value.chars().count() >= *min,
            Rule::MaxLen(max) => value.chars().count() <= *max,
        };
        if ok {
            return None;
        }

        let message = match self {
            Rule::Required => format!("{} is required", field),
            Rule::Ascii => format!("{} must contain only ASCII characters", field),
            Rule::Numeric => format!("{} must contain only digits", field),
            Rule::Email => format!("{} must be a valid email address", field),
            Rule::Ip => format!("{} must be a valid IP address", field),
            Rule::Uuid => format!("{} must be a valid UUID", field),
            Rule::MinLen(min) => format!("{} must be at least {} characters", field, min),
            Rule::MaxLen(max) => format!("{} must be at most {} characters", field, max),
        };
        Some(FieldError::new(field, message))
    }
}

/// Apply `rules` to `value`. A missing required value reports only the
/// `Required` violation; otherwise every violated rule is reported.
pub fn check_field(field: &str, value: &str, rules: &[Rule]) -> Vec<FieldError> {
    if rules.contains(&Rule::Required) && value.trim().is_empty() {
        return Rule::Required.check(field, value).into_iter().collect();
    }
    rules.iter().filter_map(|rule| rule.check(field, value)).collect()
}

/// Validate every `(field, rules)` pair against `values`, in declaration order
pub fn validate<'a>(
    specs: impl IntoIterator<Item = (&'a str, &'a [Rule])>,
    values: &BTreeMap<String, String>,
) -> Result<(), Vec<FieldError>> {
    let errors: Vec<FieldError> = specs
        .into_iter()
        .flat_map(|(field, rules)| {
            let value = values.get(field).map(String::as_str).unwrap_or_default();
            check_field(field, value, rules)
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_email(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && !value.chars().any(char::is_whitespace)
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}
