//! String-instantiable leaf types.
//!
//! A scalar is any type that converts to a string and back. Scalars are
//! written as element text or as an attribute value.

use crate::dynamic::{Dynamic, TypeKey};
use std::any::{Any, TypeId};
use std::fmt::{self, Display};
use std::str::FromStr;
use url::Url;
use uuid::Uuid;

type FormatFn = fn(&dyn Any) -> Option<String>;
type ParseFn = fn(&str) -> Result<Dynamic, String>;
type ResolveFn = fn(&Url, &str) -> Result<Dynamic, String>;

/// String conversion for a scalar type.
#[derive(Clone, Copy)]
pub struct ScalarCodec {
    key: TypeKey,
    format: FormatFn,
    parse: ParseFn,
    resolve: Option<ResolveFn>,
}

impl ScalarCodec {
    /// Codec for a type with `Display` and `FromStr`.
    pub fn of<T>() -> Self
    where
        T: FromStr + Display + Any + Send + Sync,
        T::Err: Display,
    {
        Self {
            key: TypeKey::of::<T>(),
            format: format_value::<T>,
            parse: parse_value::<T>,
            resolve: None,
        }
    }

    /// Marks the type as a resource reference.
    ///
    /// When a load has a base URI, leaf strings of this type are passed to
    /// `resolve` together with the base instead of being parsed directly.
    #[must_use]
    pub fn with_context_resolution(mut self, resolve: ResolveFn) -> Self {
        self.resolve = Some(resolve);
        self
    }

    /// The scalar type.
    pub fn key(&self) -> TypeKey {
        self.key
    }

    /// Whether values of this type are resolved against a base URI.
    pub fn is_uri_like(&self) -> bool {
        self.resolve.is_some()
    }

    /// Format a value of the scalar type. `None` if the value has another type.
    pub fn format(&self, value: &dyn Any) -> Option<String> {
        (self.format)(value)
    }

    /// Parse a string into a value of the scalar type.
    pub fn parse(&self, text: &str) -> Result<Dynamic, String> {
        (self.parse)(text)
    }

    /// Parse a string, resolving it against `context` when the type is
    /// uri-like and a context is present.
    pub fn parse_in_context(&self, text: &str, context: Option<&Url>) -> Result<Dynamic, String> {
        match (self.resolve, context) {
            (Some(resolve), Some(base)) => resolve(base, text),
            _ => self.parse(text),
        }
    }
}

impl fmt::Debug for ScalarCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarCodec")
            .field("key", &self.key)
            .field("uri_like", &self.is_uri_like())
            .finish()
    }
}

fn format_value<T: Display + Any>(value: &dyn Any) -> Option<String> {
    value.downcast_ref::<T>().map(ToString::to_string)
}

fn parse_value<T>(text: &str) -> Result<Dynamic, String>
where
    T: FromStr + Any + Send + Sync,
    T::Err: Display,
{
    text.parse::<T>()
        .map(|v| Box::new(v) as Dynamic)
        .map_err(|e| e.to_string())
}

fn resolve_url(base: &Url, text: &str) -> Result<Dynamic, String> {
    base.join(text)
        .map(|url| Box::new(url) as Dynamic)
        .map_err(|e| e.to_string())
}

/// Short names for the primitive types and `String`.
///
/// These take precedence over derived names in both directions.
const SYNONYMS: [(&str, fn() -> TypeKey); 13] = [
    ("bool", TypeKey::of::<bool>),
    ("char", TypeKey::of::<char>),
    ("i8", TypeKey::of::<i8>),
    ("i16", TypeKey::of::<i16>),
    ("i32", TypeKey::of::<i32>),
    ("i64", TypeKey::of::<i64>),
    ("u8", TypeKey::of::<u8>),
    ("u16", TypeKey::of::<u16>),
    ("u32", TypeKey::of::<u32>),
    ("u64", TypeKey::of::<u64>),
    ("f32", TypeKey::of::<f32>),
    ("f64", TypeKey::of::<f64>),
    ("string", TypeKey::of::<String>),
];

/// The type a primitive synonym stands for.
pub fn synonym_type(name: &str) -> Option<TypeKey> {
    SYNONYMS
        .iter()
        .find(|(synonym, _)| *synonym == name)
        .map(|(_, key)| key())
}

/// The synonym for a primitive type.
pub fn synonym_name(id: TypeId) -> Option<&'static str> {
    SYNONYMS
        .iter()
        .find(|(_, key)| key().id() == id)
        .map(|(synonym, _)| *synonym)
}

/// Codecs installed in every persister.
pub(crate) fn builtin_codecs() -> Vec<ScalarCodec> {
    vec![
        ScalarCodec::of::<bool>(),
        ScalarCodec::of::<char>(),
        ScalarCodec::of::<i8>(),
        ScalarCodec::of::<i16>(),
        ScalarCodec::of::<i32>(),
        ScalarCodec::of::<i64>(),
        ScalarCodec::of::<u8>(),
        ScalarCodec::of::<u16>(),
        ScalarCodec::of::<u32>(),
        ScalarCodec::of::<u64>(),
        ScalarCodec::of::<f32>(),
        ScalarCodec::of::<f64>(),
        ScalarCodec::of::<String>(),
        ScalarCodec::of::<Uuid>(),
        ScalarCodec::of::<Url>().with_context_resolution(resolve_url),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn format_and_parse() {
        let codec = ScalarCodec::of::<i32>();
        assert_eq!(codec.format(&42_i32).as_deref(), Some("42"));
        assert_eq!(codec.format(&42_i64), None);

        let parsed = codec.parse("-7").unwrap();
        assert_eq!(parsed.downcast_ref::<i32>(), Some(&-7));
        assert!(codec.parse("seven").is_err());
    }

    #[test]
    fn strings_keep_whitespace() {
        let codec = ScalarCodec::of::<String>();
        let parsed = codec.parse("  padded ").unwrap();
        assert_eq!(parsed.downcast_ref::<String>().map(String::as_str), Some("  padded "));
    }

    #[test]
    fn url_resolves_against_context() {
        let codec = ScalarCodec::of::<Url>().with_context_resolution(resolve_url);
        assert!(codec.is_uri_like());

        let base = Url::parse("http://example.org/a/").unwrap();
        let resolved = codec.parse_in_context("b.xml", Some(&base)).unwrap();
        assert_eq!(
            resolved.downcast_ref::<Url>().map(Url::as_str),
            Some("http://example.org/a/b.xml")
        );

        // Without a context a relative reference does not parse.
        assert!(codec.parse_in_context("b.xml", None).is_err());
    }

    #[test]
    fn plain_scalars_ignore_context() {
        let codec = ScalarCodec::of::<String>();
        let base = Url::parse("http://example.org/a/").unwrap();
        let parsed = codec.parse_in_context("b.xml", Some(&base)).unwrap();
        assert_eq!(parsed.downcast_ref::<String>().map(String::as_str), Some("b.xml"));
    }

    #[test]
    fn synonyms_round_trip() {
        assert_eq!(synonym_type("i32"), Some(TypeKey::of::<i32>()));
        assert_eq!(synonym_type("string"), Some(TypeKey::of::<String>()));
        assert_eq!(synonym_type("Integer"), None);
        assert_eq!(synonym_name(TypeId::of::<bool>()), Some("bool"));
        assert_eq!(synonym_name(TypeId::of::<String>()), Some("string"));
        assert_eq!(synonym_name(TypeId::of::<Url>()), None);
    }

    #[test]
    fn every_synonym_has_a_builtin_codec() {
        let codecs = builtin_codecs();
        for (name, key) in SYNONYMS {
            assert!(
                codecs.iter().any(|c| c.key() == key()),
                "no codec for {name}"
            );
        }
    }
}
