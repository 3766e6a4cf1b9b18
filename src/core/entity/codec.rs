//! core::entity::codec
//!
//! Lenient deserializers for typed entity fields.
//!
//! Registry documents are hand-edited and have been written by several
//! generations of tooling, so a typed field may arrive as a native YAML
//! scalar or as a quoted string. Each helper accepts both, treats an empty
//! string or `null` as "unset", and rejects anything else with a
//! descriptive error that surfaces as `Malformed` at load time.
//!
//! Plain text fields have no helper of their own: [`stringify_scalars`]
//! rewrites an entity's scalar leaves as strings before typed parsing, so
//! `port: 623` reads the same as `port: '623'`.

use std::fmt;
use std::net::IpAddr;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use serde_yaml::Value;

use crate::core::types::HwAddr;

/// Key whose payload is kept exactly as written.
const RESOURCES_KEY: &str = "resources";

/// Parse a boolean literal the way the provisioning tools always have.
///
/// Accepts `1 t T TRUE true True 0 f F FALSE false False`.
pub fn parse_flag(s: &str) -> Option<bool> {
    match s {
        "1" | "t" | "T" | "TRUE" | "true" | "True" => Some(true),
        "0" | "f" | "F" | "FALSE" | "false" | "False" => Some(false),
        _ => None,
    }
}

/// `Option<bool>` from a YAML bool, a boolean literal string, or `0`/`1`.
pub fn flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    struct FlagVisitor;

    impl<'de> Visitor<'de> for FlagVisitor {
        type Value = Option<bool>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a boolean or boolean literal")
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> Result<Self::Value, E> {
            Ok(Some(v))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            match v {
                0 => Ok(Some(false)),
                1 => Ok(Some(true)),
                _ => Err(E::custom(format!("invalid boolean: {v}"))),
            }
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            match u64::try_from(v) {
                Ok(v) => self.visit_u64(v),
                Err(_) => Err(E::custom(format!("invalid boolean: {v}"))),
            }
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let v = v.trim();
            if v.is_empty() {
                return Ok(None);
            }
            parse_flag(v)
                .map(Some)
                .ok_or_else(|| E::custom(format!("invalid boolean: '{v}'")))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(FlagVisitor)
}

/// `Option<u32>` from a YAML integer or a decimal string.
pub fn number<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    struct NumberVisitor;

    impl<'de> Visitor<'de> for NumberVisitor {
        type Value = Option<u32>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("an unsigned integer")
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<Self::Value, E> {
            u32::try_from(v)
                .map(Some)
                .map_err(|_| E::custom(format!("integer out of range: {v}")))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<Self::Value, E> {
            u32::try_from(v)
                .map(Some)
                .map_err(|_| E::custom(format!("integer out of range: {v}")))
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<Self::Value, E> {
            let v = v.trim();
            if v.is_empty() {
                return Ok(None);
            }
            v.parse::<u32>()
                .map(Some)
                .map_err(|_| E::custom(format!("invalid unsigned integer: '{v}'")))
        }

        fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_none<E: de::Error>(self) -> Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Self::Value, D::Error> {
            d.deserialize_any(self)
        }
    }

    deserializer.deserialize_any(NumberVisitor)
}

/// `Option<IpAddr>`; an empty string means unset.
pub fn addr<'de, D>(deserializer: D) -> Result<Option<IpAddr>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| de::Error::custom(format!("invalid IP address: '{s}'"))),
    }
}

/// `Option<HwAddr>`; an empty string means unset.
pub fn hwaddr<'de, D>(deserializer: D) -> Result<Option<HwAddr>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => HwAddr::new(s.trim())
            .map(Some)
            .map_err(de::Error::custom),
    }
}

/// A string list given either as a sequence or as one whitespace-separated
/// string (the older kernel argument format).
pub fn words<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Words {
        List(Vec<String>),
        Line(String),
    }

    Ok(match Option::<Words>::deserialize(deserializer)? {
        None => Vec::new(),
        Some(Words::List(list)) => list,
        Some(Words::Line(line)) => line.split_whitespace().map(str::to_string).collect(),
    })
}

/// Rewrite the scalar leaves of an entity as strings.
///
/// Numbers and booleans become their literal text, in values and in map
/// keys alike. Null values and null list items are dropped so they read as
/// unset. Resource payloads are left untouched.
pub fn stringify_scalars(value: &mut Value) {
    match value {
        Value::Mapping(map) => {
            for (key, mut child) in std::mem::take(map) {
                if child.is_null() {
                    continue;
                }
                let key = scalar_text(&key).map(Value::String).unwrap_or(key);
                if key.as_str() != Some(RESOURCES_KEY) {
                    stringify_scalars(&mut child);
                }
                map.insert(key, child);
            }
        }
        Value::Sequence(items) => {
            items.retain(|item| !item.is_null());
            items.iter_mut().for_each(stringify_scalars);
        }
        Value::Tagged(tagged) => stringify_scalars(&mut tagged.value),
        scalar => {
            if let Some(text) = scalar_text(scalar) {
                *scalar = Value::String(text);
            }
        }
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
