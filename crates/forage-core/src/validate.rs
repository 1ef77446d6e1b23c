//! Schema-validation gate: partitions raw records into accepted and rejected
//! while accumulating quality statistics.
//!
//! Validation of one record is a pure function of record + schema; the
//! pipeline instance only accumulates counts and the rejected-record list,
//! which grow monotonically until [`ValidationPipeline::reset`].

use serde_json::Value;
use url::Url;

use crate::error::AppError;
use crate::schema::{Constraint, FieldDef, FieldType, Normalize, RecordSchema};

/// A raw record as parsed from fetched content: a free-form key/value map.
pub type RawRecord = serde_json::Map<String, Value>;

/// One constraint violation on one field.
#[derive(Debug, Clone, serde::Serialize)]
pub struct Violation {
    pub field: String,
    /// Short constraint identifier ("required", "type", "min", "pattern", ...).
    pub constraint: String,
    pub message: String,
}

impl Violation {
    fn new(field: &str, constraint: &str, message: impl Into<String>) -> Self {
        Self {
            field: field.to_string(),
            constraint: constraint.to_string(),
            message: message.into(),
        }
    }
}

/// A rejected record together with every violation found, not just the first.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationFailure {
    pub record: RawRecord,
    pub violations: Vec<Violation>,
}

/// A record that passed every constraint of its schema. Field values are the
/// original inputs after declared normalization (trimmed text, uppercased
/// currency).
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct ValidatedRecord {
    pub schema: String,
    pub fields: RawRecord,
}

/// Snapshot of the running quality statistics.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationReport {
    pub valid_count: usize,
    pub invalid_count: usize,
    /// `valid / (valid + invalid)`, or 0 when nothing has been classified.
    pub success_rate: f64,
    pub errors: Vec<ValidationFailure>,
}

enum Mode {
    Schema(RecordSchema),
    /// Accepts every record unchanged and never counts anything invalid.
    AcceptAll,
}

/// Validates raw records against a schema and keeps a running report.
///
/// Every record passed in is classified as exactly one of valid or invalid;
/// none are silently dropped. Statistics are instance-scoped and mutated
/// only through `&mut self`, so one pipeline belongs to one thread unless
/// access is externally serialized.
pub struct ValidationPipeline {
    mode: Mode,
    valid_count: usize,
    invalid_count: usize,
    failures: Vec<ValidationFailure>,
}

impl Default for ValidationPipeline {
    /// Pipeline over the generic scraped-record schema.
    fn default() -> Self {
        Self::new(RecordSchema::scraped())
    }
}

impl ValidationPipeline {
    pub fn new(schema: RecordSchema) -> Self {
        Self {
            mode: Mode::Schema(schema),
            valid_count: 0,
            invalid_count: 0,
            failures: Vec::new(),
        }
    }

    /// Pipeline that runs with validation disabled: every record is accepted
    /// as-is and `invalid_count` never moves. An explicit configuration
    /// choice, visible to callers and tests.
    pub fn accept_all() -> Self {
        Self {
            mode: Mode::AcceptAll,
            valid_count: 0,
            invalid_count: 0,
            failures: Vec::new(),
        }
    }

    pub fn schema_name(&self) -> &str {
        match &self.mode {
            Mode::Schema(schema) => schema.name(),
            Mode::AcceptAll => "accept_all",
        }
    }

    /// True until the first record is classified, and again after `reset`.
    pub fn is_fresh(&self) -> bool {
        self.valid_count == 0 && self.invalid_count == 0
    }

    /// Validate a single record.
    ///
    /// On success the normalized record is returned and `valid_count`
    /// increments. On rejection — whether a foreseeable constraint violation
    /// or an unexpected internal error — `invalid_count` increments exactly
    /// once and the failure is appended to the running list.
    pub fn validate_one(
        &mut self,
        record: RawRecord,
    ) -> Result<ValidatedRecord, ValidationFailure> {
        let step = match &self.mode {
            Mode::AcceptAll => Ok(ValidatedRecord {
                schema: "accept_all".to_string(),
                fields: record.clone(),
            }),
            Mode::Schema(schema) => apply_schema(schema, &record).map(|fields| ValidatedRecord {
                schema: schema.name().to_string(),
                fields,
            }),
        };

        match step {
            Ok(validated) => {
                self.valid_count += 1;
                Ok(validated)
            }
            Err(Rejection::Violations(violations)) => {
                tracing::warn!(
                    schema = self.schema_name(),
                    violations = violations.len(),
                    "Record failed validation"
                );
                self.invalid_count += 1;
                let failure = ValidationFailure { record, violations };
                self.failures.push(failure.clone());
                Err(failure)
            }
            Err(Rejection::Internal(error)) => {
                tracing::error!(
                    schema = self.schema_name(),
                    error = %error,
                    "Unexpected validation error"
                );
                self.invalid_count += 1;
                let failure = ValidationFailure {
                    record,
                    violations: vec![Violation::new("", "internal", error.to_string())],
                };
                self.failures.push(failure.clone());
                Err(failure)
            }
        }
    }

    /// Validate records in input order, returning the accepted ones in the
    /// same relative order. Rejects stay inspectable via [`report`](Self::report).
    pub fn validate_batch(&mut self, records: Vec<RawRecord>) -> Vec<ValidatedRecord> {
        let total = records.len();
        let mut accepted = Vec::new();

        for record in records {
            if let Ok(validated) = self.validate_one(record) {
                accepted.push(validated);
            }
        }

        tracing::info!(
            total,
            valid = self.valid_count,
            invalid = self.invalid_count,
            "Validated batch"
        );

        accepted
    }

    /// Current counts and the full accumulated failure list.
    pub fn report(&self) -> ValidationReport {
        let classified = self.valid_count + self.invalid_count;
        ValidationReport {
            valid_count: self.valid_count,
            invalid_count: self.invalid_count,
            success_rate: if classified == 0 {
                0.0
            } else {
                self.valid_count as f64 / classified as f64
            },
            errors: self.failures.clone(),
        }
    }

    /// Clear counts and the failure list. The schema is untouched.
    pub fn reset(&mut self) {
        self.valid_count = 0;
        self.invalid_count = 0;
        self.failures.clear();
    }
}

/// Convenience: validate a batch with a fresh pipeline and return the
/// accepted records together with the report in one call.
pub fn validate_records(
    schema: RecordSchema,
    records: Vec<RawRecord>,
) -> (Vec<ValidatedRecord>, ValidationReport) {
    let mut pipeline = ValidationPipeline::new(schema);
    let accepted = pipeline.validate_batch(records);
    let report = pipeline.report();
    (accepted, report)
}

enum Rejection {
    /// The record violated the schema: expected bad-input case.
    Violations(Vec<Violation>),
    /// The schema itself is inconsistent: pipeline bug, not bad input.
    Internal(AppError),
}

impl From<AppError> for Rejection {
    fn from(error: AppError) -> Self {
        Rejection::Internal(error)
    }
}

/// Check every schema field against the record, in declaration order.
/// Returns the normalized field map, or every violation found.
fn apply_schema(schema: &RecordSchema, record: &RawRecord) -> Result<RawRecord, Rejection> {
    let mut violations = Vec::new();
    let mut normalized = record.clone();

    for def in schema.fields() {
        match record.get(def.name()) {
            None | Some(Value::Null) => {
                if def.is_required() {
                    violations.push(Violation::new(
                        def.name(),
                        "required",
                        "required field is missing",
                    ));
                }
                normalized.remove(def.name());
            }
            Some(value) => match check_field(def, value)? {
                FieldOutcome::Value(value) => {
                    normalized.insert(def.name().to_string(), value);
                }
                FieldOutcome::Omit => {
                    normalized.remove(def.name());
                }
                FieldOutcome::Invalid(field_violations) => {
                    violations.extend(field_violations);
                }
            },
        }
    }

    if violations.is_empty() {
        Ok(normalized)
    } else {
        Err(Rejection::Violations(violations))
    }
}

enum FieldOutcome {
    /// Field accepted; carries the normalized value.
    Value(Value),
    /// Optional text field emptied by normalization; dropped from the record.
    Omit,
    Invalid(Vec<Violation>),
}

/// Type-check, normalize, and constraint-check one present field value.
///
/// `Err` means the schema declared something inapplicable to the field's
/// type — an internal error, counted invalid but logged as a pipeline bug.
fn check_field(def: &FieldDef, value: &Value) -> Result<FieldOutcome, AppError> {
    if def.field_type() != FieldType::Text && !def.normalizers().is_empty() {
        return Err(AppError::SchemaError(format!(
            "normalizers declared on non-text field '{}'",
            def.name()
        )));
    }

    match def.field_type() {
        FieldType::Text => check_text(def, value),
        FieldType::Number => check_number(def, value),
        FieldType::Boolean => {
            reject_constraints(def)?;
            match value {
                Value::Bool(_) => Ok(FieldOutcome::Value(value.clone())),
                _ => Ok(type_mismatch(def)),
            }
        }
        FieldType::Timestamp => {
            reject_constraints(def)?;
            match value.as_str() {
                Some(raw) if chrono::DateTime::parse_from_rfc3339(raw).is_ok() => {
                    Ok(FieldOutcome::Value(value.clone()))
                }
                Some(_) => Ok(FieldOutcome::Invalid(vec![Violation::new(
                    def.name(),
                    "type",
                    "expected an RFC 3339 timestamp",
                )])),
                None => Ok(type_mismatch(def)),
            }
        }
        FieldType::Map => {
            reject_constraints(def)?;
            match value {
                Value::Object(_) => Ok(FieldOutcome::Value(value.clone())),
                _ => Ok(type_mismatch(def)),
            }
        }
        FieldType::TextList => {
            reject_constraints(def)?;
            match value {
                Value::Array(items) if items.iter().all(Value::is_string) => {
                    Ok(FieldOutcome::Value(value.clone()))
                }
                _ => Ok(type_mismatch(def)),
            }
        }
        FieldType::Url => {
            reject_constraints(def)?;
            match value.as_str() {
                Some(raw) if is_complete_url(raw) => Ok(FieldOutcome::Value(value.clone())),
                Some(_) => Ok(FieldOutcome::Invalid(vec![Violation::new(
                    def.name(),
                    "url",
                    "must be an absolute URL with scheme and host",
                )])),
                None => Ok(type_mismatch(def)),
            }
        }
    }
}

fn check_text(def: &FieldDef, value: &Value) -> Result<FieldOutcome, AppError> {
    let Some(raw) = value.as_str() else {
        return Ok(type_mismatch(def));
    };

    let mut text = raw.to_string();
    for normalize in def.normalizers() {
        match normalize {
            Normalize::Trim => text = text.trim().to_string(),
            Normalize::Uppercase => text = text.to_uppercase(),
        }
    }

    // An optional text field emptied by trimming is treated as absent.
    if text.is_empty() && !def.is_required() && def.normalizers().contains(&Normalize::Trim) {
        return Ok(FieldOutcome::Omit);
    }

    let mut violations = Vec::new();
    for constraint in def.constraints() {
        match constraint {
            Constraint::MinLength(len) => {
                if text.chars().count() < *len {
                    violations.push(Violation::new(
                        def.name(),
                        constraint.code(),
                        format!("must be at least {len} characters"),
                    ));
                }
            }
            Constraint::MaxLength(len) => {
                if text.chars().count() > *len {
                    violations.push(Violation::new(
                        def.name(),
                        constraint.code(),
                        format!("must be at most {len} characters"),
                    ));
                }
            }
            Constraint::Matches(regex) => {
                if !regex.is_match(&text) {
                    violations.push(Violation::new(
                        def.name(),
                        constraint.code(),
                        format!("must match pattern {}", regex.as_str()),
                    ));
                }
            }
            Constraint::OneOf(allowed) => {
                if !allowed.iter().any(|a| a == &text) {
                    violations.push(Violation::new(
                        def.name(),
                        constraint.code(),
                        format!("must be one of: {}", allowed.join(", ")),
                    ));
                }
            }
            Constraint::Min(_) | Constraint::Max(_) => {
                return Err(AppError::SchemaError(format!(
                    "numeric constraint on text field '{}'",
                    def.name()
                )));
            }
        }
    }

    if violations.is_empty() {
        Ok(FieldOutcome::Value(Value::String(text)))
    } else {
        Ok(FieldOutcome::Invalid(violations))
    }
}

fn check_number(def: &FieldDef, value: &Value) -> Result<FieldOutcome, AppError> {
    let Some(number) = value.as_f64() else {
        return Ok(type_mismatch(def));
    };

    let mut violations = Vec::new();
    for constraint in def.constraints() {
        match constraint {
            Constraint::Min(bound) => {
                if number < *bound {
                    violations.push(Violation::new(
                        def.name(),
                        constraint.code(),
                        format!("must be at least {bound}"),
                    ));
                }
            }
            Constraint::Max(bound) => {
                if number > *bound {
                    violations.push(Violation::new(
                        def.name(),
                        constraint.code(),
                        format!("must be at most {bound}"),
                    ));
                }
            }
            _ => {
                return Err(AppError::SchemaError(format!(
                    "{} constraint on number field '{}'",
                    constraint.code(),
                    def.name()
                )));
            }
        }
    }

    if violations.is_empty() {
        Ok(FieldOutcome::Value(value.clone()))
    } else {
        Ok(FieldOutcome::Invalid(violations))
    }
}

/// Constraints are only defined for text and number fields.
fn reject_constraints(def: &FieldDef) -> Result<(), AppError> {
    if let Some(constraint) = def.constraints().first() {
        return Err(AppError::SchemaError(format!(
            "{} constraint on {} field '{}'",
            constraint.code(),
            def.field_type(),
            def.name()
        )));
    }
    Ok(())
}

fn type_mismatch(def: &FieldDef) -> FieldOutcome {
    FieldOutcome::Invalid(vec![Violation::new(
        def.name(),
        "type",
        format!("expected {}", def.field_type()),
    )])
}

/// Structural URL check: "looks like a URL but isn't complete" is rejected
/// even though the type system would accept a bare string.
fn is_complete_url(raw: &str) -> bool {
    match Url::parse(raw) {
        Ok(url) => url.host_str().is_some_and(|h| !h.is_empty()),
        Err(_) => false,
    }
}
