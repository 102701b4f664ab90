//! Input validation utilities.
//!
//! Validation collects *every* failing rule before returning, keyed by the camelCase field
//! name the client sent, so a form can highlight all bad fields at once.
//!
//! ```
//! use clinic_core::validation::Validator;
//!
//! let mut v = Validator::new();
//! let name = v.text("firstName", "  ", 100);
//! v.range("painBefore", 11, 0, 10);
//! let err = v.finish_with(|| name).unwrap_err();
//! assert_eq!(err.field_errors().unwrap().len(), 2);
//! ```

use crate::{ClinicError, ClinicResult};
use chrono::NaiveDate;
use clinic_types::{EmailAddress, NonEmptyText, PhoneNumber};
use std::collections::BTreeMap;
use std::fmt;

/// Field-keyed validation failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of fields with at least one error.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, field: &str) -> Option<&Vec<String>> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn as_map(&self) -> &BTreeMap<String, Vec<String>> {
        &self.0
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

/// Accumulates rule failures for one input.
#[derive(Debug, Default)]
pub struct Validator {
    errors: ValidationErrors,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, field: &str, message: impl Into<String>) {
        self.errors.add(field, message);
    }

    /// Records `message` against `field` unless `ok` holds.
    pub fn check(&mut self, ok: bool, field: &str, message: impl Into<String>) {
        if !ok {
            self.errors.add(field, message);
        }
    }

    /// Required, trimmed, bounded text.
    pub fn text(&mut self, field: &str, value: &str, max_chars: usize) -> Option<NonEmptyText> {
        match NonEmptyText::bounded(value, max_chars) {
            Ok(text) => Some(text),
            Err(e) => {
                self.errors.add(field, e.to_string());
                None
            }
        }
    }

    /// Optional bounded text. Blank strings are treated as absent.
    ///
    /// The outer `Option` is `None` only when validation failed.
    pub fn optional_text(
        &mut self,
        field: &str,
        value: Option<&str>,
        max_chars: usize,
    ) -> Option<Option<NonEmptyText>> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Some(None),
            Some(v) => self.text(field, v, max_chars).map(Some),
        }
    }

    pub fn optional_email(
        &mut self,
        field: &str,
        value: Option<&str>,
    ) -> Option<Option<EmailAddress>> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Some(None),
            Some(v) => match EmailAddress::parse(v) {
                Ok(email) => Some(Some(email)),
                Err(e) => {
                    self.errors.add(field, e.to_string());
                    None
                }
            },
        }
    }

    pub fn optional_phone(
        &mut self,
        field: &str,
        value: Option<&str>,
    ) -> Option<Option<PhoneNumber>> {
        match value.map(str::trim).filter(|v| !v.is_empty()) {
            None => Some(None),
            Some(v) => match PhoneNumber::parse(v) {
                Ok(phone) => Some(Some(phone)),
                Err(e) => {
                    self.errors.add(field, e.to_string());
                    None
                }
            },
        }
    }

    /// Inclusive numeric bounds.
    pub fn range<T>(&mut self, field: &str, value: T, min: T, max: T)
    where
        T: PartialOrd + fmt::Display + Copy,
    {
        if value < min || value > max {
            self.errors
                .add(field, format!("must be between {min} and {max}"));
        }
    }

    /// Date must fall within `[earliest, latest]`.
    pub fn date_between(
        &mut self,
        field: &str,
        value: NaiveDate,
        earliest: NaiveDate,
        latest: NaiveDate,
    ) {
        if value < earliest {
            self.errors
                .add(field, format!("must not be before {earliest}"));
        } else if value > latest {
            self.errors.add(field, format!("must not be after {latest}"));
        }
    }

    /// Runs a nested validation, prefixing its field names.
    pub fn nested(&mut self, prefix: &str, item: &impl Validate) {
        let mut inner = Validator::new();
        item.collect_errors(&mut inner);
        for (field, messages) in inner.errors.0 {
            for message in messages {
                self.errors.add(&format!("{prefix}.{field}"), message);
            }
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn finish(self) -> ClinicResult<()> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ClinicError::Validation(self.errors))
        }
    }

    /// Finishes validation and builds the validated value.
    ///
    /// `build` returns `Option` so it can use `?` on the partial results collected above; it
    /// only runs when no rule failed.
    pub fn finish_with<T>(self, build: impl FnOnce() -> Option<T>) -> ClinicResult<T> {
        if !self.errors.is_empty() {
            return Err(ClinicError::Validation(self.errors));
        }
        build().ok_or_else(|| ClinicError::invalid("input", "input is incomplete"))
    }
}

/// Types that can check their own field-level rules.
pub trait Validate {
    fn collect_errors(&self, v: &mut Validator);

    fn validate(&self) -> ClinicResult<()> {
        let mut v = Validator::new();
        self.collect_errors(&mut v);
        v.finish()
    }
}
