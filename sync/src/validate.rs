//! Form validation.
//!
//! Forms in the client (listing creation, housing posts, onboarding) share
//! one validation shape: each field carries an ordered list of rules, a rule
//! is a predicate over the field value and the whole form, and only the first
//! failing rule per field reports. Validation errors are never raised; they
//! are recorded in a per-field error map and surfaced inline.

use crate::FieldName;
use std::collections::{HashMap, HashSet};

/// The current values of a form, keyed by field name.
///
/// Absent fields validate as the empty string.
pub type FormValues = HashMap<FieldName, String>;

/// One validation rule: a predicate plus the message shown when it fails.
pub struct Rule {
    message: String,
    check: Box<dyn Fn(&str, &FormValues) -> bool + Send + Sync>,
}

impl Rule {
    /// Create a rule from a predicate. The predicate returns true when the
    /// value is acceptable.
    pub fn new(
        message: impl Into<String>,
        check: impl Fn(&str, &FormValues) -> bool + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            check: Box::new(check),
        }
    }

    /// The field must be non-empty after trimming.
    pub fn required(message: impl Into<String>) -> Self {
        Self::new(message, |value, _| !value.trim().is_empty())
    }

    /// The field must be at least `min` characters long.
    pub fn min_len(min: usize, message: impl Into<String>) -> Self {
        Self::new(message, move |value, _| value.chars().count() >= min)
    }

    /// The field must contain at least one uppercase letter.
    pub fn has_uppercase(message: impl Into<String>) -> Self {
        Self::new(message, |value, _| value.chars().any(|c| c.is_uppercase()))
    }

    /// The field must contain at least one ASCII digit.
    pub fn has_digit(message: impl Into<String>) -> Self {
        Self::new(message, |value, _| value.chars().any(|c| c.is_ascii_digit()))
    }

    /// The field must equal another field's value (e.g. password confirm).
    pub fn matches_field(other: impl Into<FieldName>, message: impl Into<String>) -> Self {
        let other = other.into();
        Self::new(message, move |value, values| {
            values.get(&other).map(String::as_str).unwrap_or("") == value
        })
    }

    /// The field must parse as a number greater than zero.
    pub fn positive_number(message: impl Into<String>) -> Self {
        Self::new(message, |value, _| {
            value.trim().parse::<f64>().map(|n| n > 0.0).unwrap_or(false)
        })
    }

    fn passes(&self, value: &str, values: &FormValues) -> bool {
        (self.check)(value, values)
    }
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("message", &self.message).finish()
    }
}

/// A mapping from field name to its ordered rule list.
#[derive(Debug, Default)]
pub struct FormValidator {
    fields: Vec<(FieldName, Vec<Rule>)>,
}

impl FormValidator {
    /// Create an empty validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style method to add a field and its rules.
    pub fn field(mut self, name: impl Into<FieldName>, rules: Vec<Rule>) -> Self {
        self.fields.push((name.into(), rules));
        self
    }

    /// Validate one field, running its rules in order and stopping at the
    /// first failure. Returns the failing rule's message, if any.
    pub fn validate_field(&self, name: &str, values: &FormValues) -> Option<String> {
        let rules = self
            .fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, rules)| rules)?;
        let value = values.get(name).map(String::as_str).unwrap_or("");

        rules
            .iter()
            .find(|rule| !rule.passes(value, values))
            .map(|rule| rule.message.clone())
    }

    /// Validate every field, aggregating each field's first failure.
    pub fn validate_all(&self, values: &FormValues) -> HashMap<FieldName, String> {
        self.fields
            .iter()
            .filter_map(|(name, _)| {
                self.validate_field(name, values)
                    .map(|message| (name.clone(), message))
            })
            .collect()
    }

    /// Names of all declared fields.
    pub fn field_names(&self) -> impl Iterator<Item = &FieldName> {
        self.fields.iter().map(|(name, _)| name)
    }
}

/// A live form: values plus touch and error tracking.
///
/// `blur` validates one field the way the UI does on focus loss; `submit`
/// validates the whole form and marks every field touched so all errors
/// render at once.
#[derive(Debug)]
pub struct Form {
    validator: FormValidator,
    values: FormValues,
    errors: HashMap<FieldName, String>,
    touched: HashSet<FieldName>,
}

impl Form {
    /// Create a form over a validator with empty values.
    pub fn new(validator: FormValidator) -> Self {
        Self {
            validator,
            values: FormValues::new(),
            errors: HashMap::new(),
            touched: HashSet::new(),
        }
    }

    /// Set a field's value. Clears that field's recorded error; the next
    /// blur or submit re-validates.
    pub fn set(&mut self, name: impl Into<FieldName>, value: impl Into<String>) {
        let name = name.into();
        self.errors.remove(&name);
        self.values.insert(name, value.into());
    }

    /// Get a field's current value.
    pub fn value(&self, name: &str) -> &str {
        self.values.get(name).map(String::as_str).unwrap_or("")
    }

    /// Validate one field on blur; marks it touched and records its error.
    /// Returns whether the field is valid.
    pub fn blur(&mut self, name: &str) -> bool {
        self.touched.insert(name.to_string());
        match self.validator.validate_field(name, &self.values) {
            Some(message) => {
                self.errors.insert(name.to_string(), message);
                false
            }
            None => {
                self.errors.remove(name);
                true
            }
        }
    }

    /// Validate the whole form on submit; marks every field touched and
    /// rebuilds the error map. Returns whether the form is valid.
    pub fn submit(&mut self) -> bool {
        self.touched
            .extend(self.validator.field_names().cloned());
        self.errors = self.validator.validate_all(&self.values);
        self.errors.is_empty()
    }

    /// The recorded error for a field, if any.
    pub fn error(&self, name: &str) -> Option<&str> {
        self.errors.get(name).map(String::as_str)
    }

    /// All recorded errors.
    pub fn errors(&self) -> &HashMap<FieldName, String> {
        &self.errors
    }

    /// Whether a field has been touched.
    pub fn is_touched(&self, name: &str) -> bool {
        self.touched.contains(name)
    }
}
