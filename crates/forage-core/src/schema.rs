//! Typed record schemas: a closed family of named field-definition sets.
//!
//! A schema is immutable once built. Four concrete schemas ship with the
//! crate — generic scraped record, product, article, contact — all extending
//! the scraped record's common fields (url, title, content, timestamp,
//! metadata) with domain-specific fields and constraints.

use regex::Regex;

/// Semantic type of a field value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    /// RFC 3339 timestamp string.
    Timestamp,
    /// Free-form nested map.
    Map,
    /// List of text values.
    TextList,
    /// Structurally complete URL: scheme and host both present.
    Url,
}

impl std::fmt::Display for FieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Number => write!(f, "number"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Timestamp => write!(f, "timestamp"),
            FieldType::Map => write!(f, "map"),
            FieldType::TextList => write!(f, "list of text"),
            FieldType::Url => write!(f, "URL"),
        }
    }
}

/// A declarative constraint on a present field value.
///
/// Length and shape constraints apply to text fields; `Min`/`Max` apply to
/// number fields. Declaring a constraint on a field type it cannot apply to
/// is a schema bug, surfaced as an internal error at validation time.
#[derive(Debug, Clone)]
pub enum Constraint {
    /// Minimum length in characters.
    MinLength(usize),
    /// Maximum length in characters.
    MaxLength(usize),
    /// Inclusive numeric lower bound.
    Min(f64),
    /// Inclusive numeric upper bound.
    Max(f64),
    /// Value must match the regex.
    Matches(Regex),
    /// Value must be one of the enumerated strings.
    OneOf(Vec<String>),
}

impl Constraint {
    /// Short identifier used in violation entries.
    pub fn code(&self) -> &'static str {
        match self {
            Constraint::MinLength(_) => "min_length",
            Constraint::MaxLength(_) => "max_length",
            Constraint::Min(_) => "min",
            Constraint::Max(_) => "max",
            Constraint::Matches(_) => "pattern",
            Constraint::OneOf(_) => "allowed_values",
        }
    }
}

/// Declared normalization applied to a text value before constraint checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalize {
    /// Strip leading/trailing whitespace.
    Trim,
    /// Uppercase the value (e.g. currency codes).
    Uppercase,
}

/// One named, typed, constrained field of a schema.
#[derive(Debug, Clone)]
pub struct FieldDef {
    name: String,
    field_type: FieldType,
    required: bool,
    constraints: Vec<Constraint>,
    normalizers: Vec<Normalize>,
}

impl FieldDef {
    /// Create an optional field with no constraints.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            constraints: Vec::new(),
            normalizers: Vec::new(),
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn min_length(mut self, len: usize) -> Self {
        self.constraints.push(Constraint::MinLength(len));
        self
    }

    pub fn max_length(mut self, len: usize) -> Self {
        self.constraints.push(Constraint::MaxLength(len));
        self
    }

    pub fn min(mut self, bound: f64) -> Self {
        self.constraints.push(Constraint::Min(bound));
        self
    }

    pub fn max(mut self, bound: f64) -> Self {
        self.constraints.push(Constraint::Max(bound));
        self
    }

    /// Require the value to match `pattern`.
    ///
    /// # Panics
    ///
    /// Panics if `pattern` is not a valid regex; schemas are built at
    /// startup, so a bad pattern is a programmer error.
    pub fn matches(mut self, pattern: &str) -> Self {
        let regex = Regex::new(pattern).expect("field pattern is valid regex");
        self.constraints.push(Constraint::Matches(regex));
        self
    }

    pub fn one_of(mut self, allowed: &[&str]) -> Self {
        self.constraints
            .push(Constraint::OneOf(allowed.iter().map(|s| s.to_string()).collect()));
        self
    }

    pub fn trim(mut self) -> Self {
        self.normalizers.push(Normalize::Trim);
        self
    }

    pub fn uppercase(mut self) -> Self {
        self.normalizers.push(Normalize::Uppercase);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_type(&self) -> FieldType {
        self.field_type
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn normalizers(&self) -> &[Normalize] {
        &self.normalizers
    }
}

/// A named, immutable set of field definitions.
///
/// Fields are checked in declaration order. Fields not declared by the
/// schema pass through validation unchanged.
#[derive(Debug, Clone)]
pub struct RecordSchema {
    name: String,
    fields: Vec<FieldDef>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Common fields shared by every shipped schema.
    fn base_fields() -> Vec<FieldDef> {
        vec![
            FieldDef::new("url", FieldType::Url).required(),
            FieldDef::new("title", FieldType::Text).trim().max_length(500),
            FieldDef::new("content", FieldType::Text),
            FieldDef::new("timestamp", FieldType::Timestamp),
            FieldDef::new("metadata", FieldType::Map),
        ]
    }

    /// Generic scraped record: url, title, content, timestamp, metadata.
    pub fn scraped() -> Self {
        Self::new("scraped", Self::base_fields())
    }

    /// Product listing: name, price, currency, rating, and friends.
    pub fn product() -> Self {
        let mut fields = Self::base_fields();
        fields.extend([
            FieldDef::new("name", FieldType::Text)
                .required()
                .trim()
                .min_length(1)
                .max_length(500),
            FieldDef::new("price", FieldType::Number).min(0.0),
            FieldDef::new("currency", FieldType::Text)
                .trim()
                .uppercase()
                .min_length(3)
                .max_length(3),
            FieldDef::new("description", FieldType::Text),
            FieldDef::new("image_url", FieldType::Url),
            FieldDef::new("availability", FieldType::Boolean),
            FieldDef::new("rating", FieldType::Number).min(0.0).max(5.0),
            FieldDef::new("review_count", FieldType::Number).min(0.0),
            FieldDef::new("sku", FieldType::Text),
        ]);
        Self::new("product", fields)
    }

    /// Article/news record: headline, author, publish date, body, tags.
    pub fn article() -> Self {
        let mut fields = Self::base_fields();
        fields.extend([
            FieldDef::new("headline", FieldType::Text)
                .required()
                .trim()
                .min_length(1),
            FieldDef::new("author", FieldType::Text),
            FieldDef::new("publish_date", FieldType::Timestamp),
            FieldDef::new("body", FieldType::Text),
            FieldDef::new("summary", FieldType::Text).max_length(1000),
            FieldDef::new("tags", FieldType::TextList),
            FieldDef::new("category", FieldType::Text),
            FieldDef::new("image_url", FieldType::Url),
            FieldDef::new("source", FieldType::Text),
        ]);
        Self::new("article", fields)
    }

    /// Contact information: name, email, phone, address, company, position.
    pub fn contact() -> Self {
        let mut fields = Self::base_fields();
        fields.extend([
            FieldDef::new("name", FieldType::Text),
            FieldDef::new("email", FieldType::Text).matches(r"^[^@]+@[^@]+\.[^@]+$"),
            FieldDef::new("phone", FieldType::Text),
            FieldDef::new("address", FieldType::Text),
            FieldDef::new("company", FieldType::Text),
            FieldDef::new("position", FieldType::Text),
        ]);
        Self::new("contact", fields)
    }
}
