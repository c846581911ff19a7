//! Query-string state codec.
//!
//! Components that keep their state in the URL describe their persisted
//! fields with a [`Fields`] table, usually built by [`fields!`](crate::fields).
//! Each field is written under its kebab-cased name, optionally prefixed, and
//! zero values are left out.
//!
//! # Example
//!
//! ```rust
//! use daedalus_component::{fields, Fields, QueryCodec};
//!
//! #[derive(Default)]
//! struct Search {
//!     query: String,
//!     page_size: u32,
//!     archived: bool,
//!     tags: Vec<String>,
//! }
//!
//! let table: Fields<Search> = fields!(Search { query, page_size, archived, tags });
//! let codec = QueryCodec::new().with_prefix("search");
//!
//! let search = Search {
//!     query: "rust".into(),
//!     page_size: 20,
//!     tags: vec!["web".into(), "http".into()],
//!     ..Search::default()
//! };
//! let encoded = codec.encode(&search, &table).unwrap();
//! assert_eq!(
//!     encoded,
//!     "search_query=rust&search_page-size=20&search_tags=web&search_tags=http"
//! );
//!
//! let mut decoded = Search::default();
//! codec.decode(&mut decoded, &table, &encoded).unwrap();
//! assert_eq!(decoded.page_size, 20);
//! assert_eq!(decoded.tags, ["web", "http"]);
//! ```

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

use crate::error::{CodecError, CodecResult};

/// Separator between the prefix and the field key.
pub const PREFIX_DIVIDER: char = '_';

/// A single value that can appear in a query string.
pub trait QueryScalar: Sized {
    /// True for the type's zero value.
    fn is_zero(&self) -> bool;

    /// Renders the value.
    fn to_query(&self) -> String;

    /// Parses a value. `None` leaves the field untouched.
    fn from_query(value: &str) -> Option<Self>;
}

/// A field value: a scalar or a repeated scalar.
pub trait QueryValue {
    /// True when the field should be omitted.
    fn is_zero(&self) -> bool;

    /// Appends the rendered values.
    fn encode(&self, out: &mut Vec<String>);

    /// Overwrites `self` from the values found under its key.
    fn decode(&mut self, values: &[&str]);
}

macro_rules! impl_numeric {
    ($($ty:ty),* $(,)?) => {
        $(
            impl QueryScalar for $ty {
                fn is_zero(&self) -> bool {
                    *self == <$ty>::default()
                }

                fn to_query(&self) -> String {
                    self.to_string()
                }

                fn from_query(value: &str) -> Option<Self> {
                    Some(value.parse().unwrap_or_default())
                }
            }
        )*
    };
}

impl_numeric!(i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64);

impl QueryScalar for bool {
    fn is_zero(&self) -> bool {
        !*self
    }

    fn to_query(&self) -> String {
        self.to_string()
    }

    fn from_query(value: &str) -> Option<Self> {
        Some(value == "true")
    }
}

impl QueryScalar for String {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn to_query(&self) -> String {
        self.clone()
    }

    fn from_query(value: &str) -> Option<Self> {
        Some(value.to_string())
    }
}

/// Times travel as integer nanoseconds since the Unix epoch. Times outside
/// the `i64` nanosecond range (before 1677 or after 2262) use RFC 3339.
impl QueryScalar for DateTime<Utc> {
    fn is_zero(&self) -> bool {
        *self == DateTime::<Utc>::default()
    }

    fn to_query(&self) -> String {
        match self.timestamp_nanos_opt() {
            Some(nanos) => nanos.to_string(),
            None => self.to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }

    fn from_query(value: &str) -> Option<Self> {
        match value.parse::<i64>() {
            Ok(nanos) => Some(Utc.timestamp_nanos(nanos)),
            Err(_) => DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|time| time.with_timezone(&Utc)),
        }
    }
}

macro_rules! impl_value_for_scalar {
    ($($ty:ty),* $(,)?) => {
        $(
            impl QueryValue for $ty {
                fn is_zero(&self) -> bool {
                    QueryScalar::is_zero(self)
                }

                fn encode(&self, out: &mut Vec<String>) {
                    out.push(self.to_query());
                }

                fn decode(&mut self, values: &[&str]) {
                    if let [value] = values {
                        if let Some(parsed) = <$ty as QueryScalar>::from_query(value) {
                            *self = parsed;
                        }
                    }
                }
            }
        )*
    };
}

impl_value_for_scalar!(
    i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, f32, f64, bool, String,
    DateTime<Utc>
);

impl<T: QueryScalar> QueryValue for Vec<T> {
    fn is_zero(&self) -> bool {
        self.is_empty()
    }

    fn encode(&self, out: &mut Vec<String>) {
        out.extend(self.iter().map(QueryScalar::to_query));
    }

    fn decode(&mut self, values: &[&str]) {
        if values.is_empty() {
            return;
        }
        *self = values.iter().filter_map(|v| T::from_query(v)).collect();
    }
}

impl<T: QueryScalar> QueryValue for Option<T> {
    fn is_zero(&self) -> bool {
        self.as_ref().map_or(true, QueryScalar::is_zero)
    }

    fn encode(&self, out: &mut Vec<String>) {
        if let Some(value) = self {
            out.push(value.to_query());
        }
    }

    fn decode(&mut self, values: &[&str]) {
        if let [value] = values {
            if let Some(parsed) = T::from_query(value) {
                *self = Some(parsed);
            }
        }
    }
}

/// Encodes a field if it is not zero. Used by [`fields!`](crate::fields).
pub fn encode_value<V: QueryValue>(value: &V) -> Vec<String> {
    let mut out = Vec::new();
    if !value.is_zero() {
        value.encode(&mut out);
    }
    out
}

/// Decodes a field in place. Used by [`fields!`](crate::fields).
pub fn decode_value<V: QueryValue>(value: &mut V, values: &[&str]) {
    value.decode(values);
}

/// One persisted field of `C`.
pub struct Field<C> {
    name: &'static str,
    key: String,
    encode: fn(&C) -> Vec<String>,
    decode: fn(&mut C, &[&str]),
}

impl<C> Field<C> {
    /// Describes a field. `name` is the Rust field name.
    pub fn new(
        name: &'static str,
        encode: fn(&C) -> Vec<String>,
        decode: fn(&mut C, &[&str]),
    ) -> Self {
        Self {
            name,
            key: kebab_case(name),
            encode,
            decode,
        }
    }

    /// Rust field name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Unprefixed query key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl<C> std::fmt::Debug for Field<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Field")
            .field("name", &self.name)
            .field("key", &self.key)
            .finish_non_exhaustive()
    }
}

/// The persisted fields of `C`, in declaration order.
#[derive(Debug)]
pub struct Fields<C> {
    fields: Vec<Field<C>>,
}

impl<C> Default for Fields<C> {
    fn default() -> Self {
        Self { fields: Vec::new() }
    }
}

impl<C> Fields<C> {
    /// Creates a table.
    pub fn new(fields: Vec<Field<C>>) -> Self {
        Self { fields }
    }

    /// Iterates the fields.
    pub fn iter(&self) -> impl Iterator<Item = &Field<C>> {
        self.fields.iter()
    }

    /// Finds a field by Rust name.
    pub fn get(&self, name: &str) -> Option<&Field<C>> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// True for an empty table.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builds a [`Fields`] table from field names.
///
/// Every listed field must implement [`QueryValue`].
#[macro_export]
macro_rules! fields {
    ($ty:ty { $($field:ident),* $(,)? }) => {
        $crate::Fields::<$ty>::new(vec![
            $(
                $crate::Field::new(
                    stringify!($field),
                    |value: &$ty| $crate::query::encode_value(&value.$field),
                    |value: &mut $ty, values: &[&str]| {
                        $crate::query::decode_value(&mut value.$field, values)
                    },
                )
            ),*
        ])
    };
}

/// Encodes and decodes field tables to and from query strings.
#[derive(Debug, Clone, Default)]
pub struct QueryCodec {
    prefix: Option<String>,
}

impl QueryCodec {
    /// Codec without a key prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Prefixes every key with `prefix_`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix = prefix.into();
        self.prefix = (!prefix.is_empty()).then_some(prefix);
        self
    }

    /// The full query key of a field.
    pub fn key<C>(&self, field: &Field<C>) -> String {
        match &self.prefix {
            Some(prefix) => format!("{prefix}{PREFIX_DIVIDER}{}", field.key),
            None => field.key.clone(),
        }
    }

    /// Non-zero fields as ordered key/value pairs.
    pub fn encode_pairs<C>(&self, value: &C, fields: &Fields<C>) -> Vec<(String, String)> {
        fields
            .iter()
            .flat_map(|field| {
                let key = self.key(field);
                (field.encode)(value)
                    .into_iter()
                    .map(move |v| (key.clone(), v))
            })
            .collect()
    }

    /// Non-zero fields as a URL-encoded query string, without `?`.
    pub fn encode<C>(&self, value: &C, fields: &Fields<C>) -> CodecResult<String> {
        serde_urlencoded::to_string(self.encode_pairs(value, fields))
            .map_err(|e| CodecError::Query(e.to_string()))
    }

    /// Applies already parsed pairs. Unknown keys are ignored.
    pub fn decode_pairs<C>(&self, target: &mut C, fields: &Fields<C>, pairs: &[(String, String)]) {
        for field in fields.iter() {
            let key = self.key(field);
            let values: Vec<&str> = pairs
                .iter()
                .filter(|(k, _)| *k == key)
                .map(|(_, v)| v.as_str())
                .collect();
            if values.is_empty() {
                continue;
            }
            (field.decode)(target, &values);
        }
    }

    /// Parses a raw query string (without `?`) into `target`.
    pub fn decode<C>(&self, target: &mut C, fields: &Fields<C>, query: &str) -> CodecResult<()> {
        let pairs = parse_query(query)?;
        self.decode_pairs(target, fields, &pairs);
        Ok(())
    }
}

/// Parses a raw query string into ordered pairs.
pub fn parse_query(query: &str) -> CodecResult<Vec<(String, String)>> {
    serde_urlencoded::from_str(query.trim_start_matches('?'))
        .map_err(|e| CodecError::Query(e.to_string()))
}

/// `page_size` becomes `page-size`, `pageSize` becomes `page-size`.
pub fn kebab_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut previous_lower = false;
    for c in name.chars() {
        if c == '_' || c == '-' {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            previous_lower = false;
        } else if c.is_ascii_uppercase() {
            if previous_lower {
                out.push('-');
            }
            out.push(c.to_ascii_lowercase());
            previous_lower = false;
        } else {
            out.push(c);
            previous_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out.trim_end_matches('-').to_string()
}
