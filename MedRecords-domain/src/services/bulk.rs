//! Uniform handling of single-object and array create payloads
//!
//! A create endpoint accepts either one JSON object or an array of them. Every item is
//! validated before anything is written; if any item fails, nothing is persisted and
//! the errors mirror the request shape. On success the response mirrors it too.

use std::collections::BTreeMap;
use std::future::Future;

use serde::de::{DeserializeOwned, Deserializer, Error as _};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::services::ServiceError;

/// Messages keyed by field name
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// A create request body: one object or a list of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload<T> {
    Single(T),
    Batch(Vec<T>),
}

impl<T> Payload<T> {
    /// Whether the request was an array
    pub fn is_batch(&self) -> bool {
        matches!(self, Payload::Batch(_))
    }

    /// Number of items
    pub fn len(&self) -> usize {
        match self {
            Payload::Single(_) => 1,
            Payload::Batch(items) => items.len(),
        }
    }

    /// Whether this is an empty batch
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterate over the items in request order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        match self {
            Payload::Single(item) => std::slice::from_ref(item).iter(),
            Payload::Batch(items) => items.iter(),
        }
    }

    /// Take the items in request order
    pub fn into_vec(self) -> Vec<T> {
        match self {
            Payload::Single(item) => vec![item],
            Payload::Batch(items) => items,
        }
    }
}

// An array is a batch; anything else is parsed as a single item. Inspecting the JSON
// value first keeps an array from being read positionally into a struct.
impl<'de, T: DeserializeOwned> Deserialize<'de> for Payload<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        match serde_json::Value::deserialize(deserializer)? {
            serde_json::Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    serde_json::from_value(item)
                        .map_err(|e| D::Error::custom(format!("item {}: {}", index, e)))
                })
                .collect::<Result<Vec<T>, _>>()
                .map(Payload::Batch),
            other => serde_json::from_value(other)
                .map(Payload::Single)
                .map_err(D::Error::custom),
        }
    }
}

/// Field errors for a rejected create request, shaped like the request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ValidationFailure {
    Single(FieldErrors),
    Batch(Vec<FieldErrors>),
}

impl ValidationFailure {
    /// A single-object failure with one message on one field
    pub fn field(name: &str, message: impl Into<String>) -> Self {
        let mut errors = FieldErrors::new();
        errors.insert(name.to_string(), vec![message.into()]);
        ValidationFailure::Single(errors)
    }
}

/// Render a numeric validator parameter without a trailing `.0`
fn number_param(err: &ValidationError, name: &str) -> Option<String> {
    let value = err.params.get(name)?;
    match (value.as_i64(), value.as_f64()) {
        (Some(i), _) => Some(i.to_string()),
        (None, Some(f)) if f.fract() == 0.0 => Some(format!("{}", f as i64)),
        (None, Some(f)) => Some(f.to_string()),
        _ => None,
    }
}

fn message_for(field: &str, err: &ValidationError) -> String {
    if let Some(message) = &err.message {
        return message.to_string();
    }

    match err.code.as_ref() {
        "required" => "This field is required.".to_string(),
        "email" => "Enter a valid email address.".to_string(),
        "length" => match number_param(err, "max") {
            Some(max) => format!("Ensure this field has no more than {} characters.", max),
            None => format!("Invalid {}", field),
        },
        "range" => {
            let value = err.params.get("value").and_then(|v| v.as_f64());
            let min = err.params.get("min").and_then(|v| v.as_f64());
            match (value, min) {
                (Some(value), Some(min)) if value < min => format!(
                    "Ensure this value is greater than or equal to {}.",
                    number_param(err, "min").unwrap_or_default()
                ),
                _ => format!(
                    "Ensure this value is less than or equal to {}.",
                    number_param(err, "max").unwrap_or_default()
                ),
            }
        }
        _ => format!("Invalid {}", field),
    }
}

/// Convert validator output to `{field: [messages]}`
///
/// A blank value only reports the blank message.
pub fn field_errors(errors: &ValidationErrors) -> FieldErrors {
    errors
        .field_errors()
        .into_iter()
        .map(|(field, errs)| {
            let blank = errs.iter().find(|err| err.code == "blank");
            let messages = match blank {
                Some(err) => vec![message_for(field, err)],
                None => errs.iter().map(|err| message_for(field, err)).collect(),
            };
            (field.to_string(), messages)
        })
        .collect()
}

/// Derive-based validation plus the extra errors from `check`
pub fn validate_item<T, C>(item: &T, check: &C) -> FieldErrors
where
    T: Validate,
    C: Fn(&T) -> FieldErrors,
{
    let mut errors = match item.validate() {
        Ok(()) => FieldErrors::new(),
        Err(e) => field_errors(&e),
    };

    for (field, messages) in check(item) {
        errors.entry(field).or_default().extend(messages);
    }

    errors
}

/// Validate, stamp and persist a single or batch payload
///
/// - `check` adds cross-record errors (e.g. a referenced row must exist)
/// - `stamp` turns a validated item into a storage record (e.g. sets the owner)
/// - `persist` writes all records atomically and returns what was stored
///
/// Nothing reaches `persist` unless every item is valid. An empty batch succeeds
/// without touching storage.
pub async fn create_with_hook<T, R, S, C, K, P, Fut>(
    payload: Payload<T>,
    check: C,
    stamp: K,
    persist: P,
) -> Result<Payload<S>, ServiceError>
where
    T: Validate,
    C: Fn(&T) -> FieldErrors,
    K: Fn(T) -> Result<R, String>,
    P: FnOnce(Vec<R>) -> Fut,
    Fut: Future<Output = Result<Vec<S>, ServiceError>>,
{
    let is_batch = payload.is_batch();
    let items = payload.into_vec();

    let errors: Vec<FieldErrors> = items.iter().map(|item| validate_item(item, &check)).collect();
    if errors.iter().any(|e| !e.is_empty()) {
        let failure = if is_batch {
            ValidationFailure::Batch(errors)
        } else {
            ValidationFailure::Single(errors.into_iter().next().unwrap_or_default())
        };
        return Err(ServiceError::Validation(failure));
    }

    let records = items
        .into_iter()
        .map(stamp)
        .collect::<Result<Vec<R>, String>>()
        .map_err(ServiceError::Unexpected)?;

    let created = if records.is_empty() {
        Vec::new()
    } else {
        persist(records).await?
    };

    if is_batch {
        Ok(Payload::Batch(created))
    } else {
        created
            .into_iter()
            .next()
            .map(Payload::Single)
            .ok_or_else(|| ServiceError::Unexpected("No record was created".to_string()))
    }
}
