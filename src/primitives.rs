use std::collections::BTreeMap;
use std::fmt;

use serde::de::{self, DeserializeOwned, DeserializeSeed, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_bytes::ByteBuf;

use crate::error::{LogError, LogResult};
use crate::time::VectorClock;
use crate::types::ProcessId;

// --- Wire envelope ------------------------------------------------------------

/// The unit that travels between processes: who sent it, the sender's clock
/// right after the send was ticked, and the application payload.
///
/// `clock` is a copy of the sender's clock, never a live reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WireEnvelope {
    pub sender: ProcessId,
    pub clock: VectorClock,
    pub payload: Payload,
}

// --- Payload value model ------------------------------------------------------

/// Deepest array/map nesting a payload may have. Both codecs refuse to encode
/// anything deeper and every decoder rejects it with `LogError::Decoding`.
pub const MAX_PAYLOAD_DEPTH: usize = 100;

/// Codec-neutral application payload.
///
/// Non-negative integers are always stored as `UInt`; `Int` only ever holds
/// negative values. The `From` conversions and the deserializer both
/// normalise this way so every codec decodes integers to the same variant.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Nil,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Array(Vec<Payload>),
    /// Ordered key/value pairs; keys may be any payload.
    Map(Vec<(Payload, Payload)>),
}

impl Payload {
    /// Short name of the variant, used in type-mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Payload::Nil => "nil",
            Payload::Bool(_) => "bool",
            Payload::Int(_) => "int",
            Payload::UInt(_) => "uint",
            Payload::Float(_) => "float",
            Payload::Str(_) => "string",
            Payload::Bytes(_) => "bytes",
            Payload::Array(_) => "array",
            Payload::Map(_) => "map",
        }
    }

    /// Number of nested arrays/maps; scalars are depth 0, `[]` and `[1]` are 1.
    pub fn depth(&self) -> usize {
        let mut deepest = 0;
        let mut stack = vec![(self, 0usize)];
        while let Some((payload, enclosing)) = stack.pop() {
            let level = enclosing + 1;
            match payload {
                Payload::Array(items) => {
                    deepest = deepest.max(level);
                    stack.extend(items.iter().map(|p| (p, level)));
                }
                Payload::Map(entries) => {
                    deepest = deepest.max(level);
                    for (k, v) in entries {
                        stack.push((k, level));
                        stack.push((v, level));
                    }
                }
                _ => {}
            }
        }
        deepest
    }

    /// Fails with `LogError::Encoding` when nesting exceeds `MAX_PAYLOAD_DEPTH`.
    pub fn check_depth(&self) -> LogResult<()> {
        let depth = self.depth();
        if depth > MAX_PAYLOAD_DEPTH {
            return Err(LogError::Encoding(format!(
                "payload nested {} levels deep, limit is {}",
                depth, MAX_PAYLOAD_DEPTH
            )));
        }
        Ok(())
    }

    /// Converts any `serde` value into a payload.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> LogResult<Payload> {
        let bytes = rmp_serde::to_vec_named(value)?;
        rmp_serde::from_slice(&bytes).map_err(|e| LogError::Encoding(e.to_string()))
    }

    /// Rebuilds a `serde` value from this payload.
    pub fn deserialize_into<T: DeserializeOwned>(&self) -> LogResult<T> {
        let bytes = rmp_serde::to_vec_named(self).map_err(|e| LogError::Decoding(e.to_string()))?;
        Ok(rmp_serde::from_slice(&bytes)?)
    }

    /// Looks up a string key in a `Map` payload.
    pub fn get(&self, key: &str) -> Option<&Payload> {
        match self {
            Payload::Map(entries) => entries.iter().find_map(|(k, v)| match k {
                Payload::Str(s) if s == key => Some(v),
                _ => None,
            }),
            _ => None,
        }
    }

    fn mismatch(&self, expected: &str) -> LogError {
        LogError::Decoding(format!("expected {} payload, found {}", expected, self.kind()))
    }
}

impl From<bool> for Payload {
    fn from(v: bool) -> Self {
        Payload::Bool(v)
    }
}

impl From<u64> for Payload {
    fn from(v: u64) -> Self {
        Payload::UInt(v)
    }
}

impl From<u32> for Payload {
    fn from(v: u32) -> Self {
        Payload::UInt(u64::from(v))
    }
}

impl From<i64> for Payload {
    fn from(v: i64) -> Self {
        if v >= 0 {
            Payload::UInt(v as u64)
        } else {
            Payload::Int(v)
        }
    }
}

impl From<i32> for Payload {
    fn from(v: i32) -> Self {
        Payload::from(i64::from(v))
    }
}

impl From<f64> for Payload {
    fn from(v: f64) -> Self {
        Payload::Float(v)
    }
}

impl From<String> for Payload {
    fn from(v: String) -> Self {
        Payload::Str(v)
    }
}

impl From<&str> for Payload {
    fn from(v: &str) -> Self {
        Payload::Str(v.to_string())
    }
}

impl From<ByteBuf> for Payload {
    fn from(v: ByteBuf) -> Self {
        Payload::Bytes(v.into_vec())
    }
}

impl Serialize for Payload {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Payload::Nil => serializer.serialize_unit(),
            Payload::Bool(b) => serializer.serialize_bool(*b),
            Payload::Int(i) => serializer.serialize_i64(*i),
            Payload::UInt(u) => serializer.serialize_u64(*u),
            Payload::Float(f) => serializer.serialize_f64(*f),
            Payload::Str(s) => serializer.serialize_str(s),
            Payload::Bytes(b) => serializer.serialize_bytes(b),
            Payload::Array(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Payload::Map(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (k, v) in entries {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
        }
    }
}

/// Deserializes one payload value that sits inside `depth` enclosing
/// arrays/maps. Refuses to open a container past `MAX_PAYLOAD_DEPTH`, so a
/// hostile frame cannot recurse the decoder off the end of the stack.
#[derive(Clone, Copy)]
struct PayloadSeed {
    depth: usize,
}

impl PayloadSeed {
    fn nested<E: de::Error>(self) -> Result<PayloadSeed, E> {
        let depth = self.depth + 1;
        if depth > MAX_PAYLOAD_DEPTH {
            return Err(E::custom(format!(
                "payload nested deeper than {} levels",
                MAX_PAYLOAD_DEPTH
            )));
        }
        Ok(PayloadSeed { depth })
    }
}

impl<'de> DeserializeSeed<'de> for PayloadSeed {
    type Value = Payload;

    fn deserialize<D: Deserializer<'de>>(self, deserializer: D) -> Result<Payload, D::Error> {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for PayloadSeed {
    type Value = Payload;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("a map, array, string, bytes, number, bool or nil")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Payload, E> {
        Ok(Payload::Nil)
    }

    fn visit_none<E: de::Error>(self) -> Result<Payload, E> {
        Ok(Payload::Nil)
    }

    fn visit_some<D: Deserializer<'de>>(self, d: D) -> Result<Payload, D::Error> {
        self.deserialize(d)
    }

    fn visit_bool<E: de::Error>(self, v: bool) -> Result<Payload, E> {
        Ok(Payload::Bool(v))
    }

    fn visit_i64<E: de::Error>(self, v: i64) -> Result<Payload, E> {
        Ok(Payload::from(v))
    }

    fn visit_u64<E: de::Error>(self, v: u64) -> Result<Payload, E> {
        Ok(Payload::UInt(v))
    }

    fn visit_f64<E: de::Error>(self, v: f64) -> Result<Payload, E> {
        Ok(Payload::Float(v))
    }

    fn visit_str<E: de::Error>(self, v: &str) -> Result<Payload, E> {
        Ok(Payload::Str(v.to_string()))
    }

    fn visit_string<E: de::Error>(self, v: String) -> Result<Payload, E> {
        Ok(Payload::Str(v))
    }

    fn visit_bytes<E: de::Error>(self, v: &[u8]) -> Result<Payload, E> {
        Ok(Payload::Bytes(v.to_vec()))
    }

    fn visit_byte_buf<E: de::Error>(self, v: Vec<u8>) -> Result<Payload, E> {
        Ok(Payload::Bytes(v))
    }

    fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Payload, A::Error> {
        let inner = self.nested::<A::Error>()?;
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0).min(1024));
        while let Some(item) = seq.next_element_seed(inner)? {
            items.push(item);
        }
        Ok(Payload::Array(items))
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Payload, A::Error> {
        let inner = self.nested::<A::Error>()?;
        let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0).min(1024));
        while let Some(entry) = map.next_entry_seed(inner, inner)? {
            entries.push(entry);
        }
        Ok(Payload::Map(entries))
    }
}

impl<'de> Deserialize<'de> for Payload {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        PayloadSeed { depth: 0 }.deserialize(deserializer)
    }
}

// --- Payload capability traits ------------------------------------------------

/// Host values that can be handed to `send`.
pub trait IntoPayload {
    fn into_payload(self) -> LogResult<Payload>;
}

/// Host types a received payload can be decoded into.
/// A payload of the wrong shape is a `LogError::Decoding`.
pub trait FromPayload: Sized {
    fn from_payload(payload: Payload) -> LogResult<Self>;
}

/// Adapter for arbitrary `serde` types: `Serialized(my_struct)` can be sent,
/// and `receive::<Serialized<MyStruct>>` decodes into it.
#[derive(Debug, Clone, PartialEq)]
pub struct Serialized<T>(pub T);

macro_rules! into_payload_via_from {
    ($($t:ty),* $(,)?) => {
        $(
            impl IntoPayload for $t {
                fn into_payload(self) -> LogResult<Payload> {
                    Ok(Payload::from(self))
                }
            }
        )*
    };
}

into_payload_via_from!(bool, u64, u32, i64, i32, f64, String, &str, ByteBuf);

impl IntoPayload for Payload {
    fn into_payload(self) -> LogResult<Payload> {
        Ok(self)
    }
}

impl<T: IntoPayload> IntoPayload for Vec<T> {
    fn into_payload(self) -> LogResult<Payload> {
        let items = self.into_iter().map(IntoPayload::into_payload).collect::<LogResult<Vec<_>>>()?;
        Ok(Payload::Array(items))
    }
}

impl<T: IntoPayload> IntoPayload for Option<T> {
    fn into_payload(self) -> LogResult<Payload> {
        match self {
            Some(v) => v.into_payload(),
            None => Ok(Payload::Nil),
        }
    }
}

impl<T: IntoPayload> IntoPayload for BTreeMap<String, T> {
    fn into_payload(self) -> LogResult<Payload> {
        let mut entries = Vec::with_capacity(self.len());
        for (k, v) in self {
            entries.push((Payload::Str(k), v.into_payload()?));
        }
        Ok(Payload::Map(entries))
    }
}

impl<T: Serialize> IntoPayload for Serialized<T> {
    fn into_payload(self) -> LogResult<Payload> {
        Payload::from_serialize(&self.0)
    }
}

impl FromPayload for Payload {
    fn from_payload(payload: Payload) -> LogResult<Self> {
        Ok(payload)
    }
}

impl FromPayload for bool {
    fn from_payload(payload: Payload) -> LogResult<Self> {
        match payload {
            Payload::Bool(b) => Ok(b),
            other => Err(other.mismatch("bool")),
        }
    }
}

impl FromPayload for u64 {
    fn from_payload(payload: Payload) -> LogResult<Self> {
        match payload {
            Payload::UInt(u) => Ok(u),
            other => Err(other.mismatch("uint")),
        }
    }
}

impl FromPayload for u32 {
    fn from_payload(payload: Payload) -> LogResult<Self> {
        match payload {
            Payload::UInt(u) => u32::try_from(u)
                .map_err(|_| LogError::Decoding(format!("{} does not fit in u32", u))),
            other => Err(other.mismatch("uint")),
        }
    }
}

impl FromPayload for i64 {
    fn from_payload(payload: Payload) -> LogResult<Self> {
        match payload {
            Payload::Int(i) => Ok(i),
            Payload::UInt(u) => i64::try_from(u)
                .map_err(|_| LogError::Decoding(format!("{} does not fit in i64", u))),
            other => Err(other.mismatch("int")),
        }
    }
}

impl FromPayload for f64 {
    fn from_payload(payload: Payload) -> LogResult<Self> {
        match payload {
            Payload::Float(f) => Ok(f),
            Payload::UInt(u) => Ok(u as f64),
            Payload::Int(i) => Ok(i as f64),
            other => Err(other.mismatch("float")),
        }
    }
}

impl FromPayload for String {
    fn from_payload(payload: Payload) -> LogResult<Self> {
        match payload {
            Payload::Str(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }
}

impl FromPayload for ByteBuf {
    fn from_payload(payload: Payload) -> LogResult<Self> {
        match payload {
            Payload::Bytes(b) => Ok(ByteBuf::from(b)),
            other => Err(other.mismatch("bytes")),
        }
    }
}

impl<T: FromPayload> FromPayload for Vec<T> {
    fn from_payload(payload: Payload) -> LogResult<Self> {
        match payload {
            Payload::Array(items) => items.into_iter().map(T::from_payload).collect(),
            other => Err(other.mismatch("array")),
        }
    }
}

impl<T: FromPayload> FromPayload for Option<T> {
    fn from_payload(payload: Payload) -> LogResult<Self> {
        match payload {
            Payload::Nil => Ok(None),
            other => T::from_payload(other).map(Some),
        }
    }
}

impl<T: FromPayload> FromPayload for BTreeMap<String, T> {
    fn from_payload(payload: Payload) -> LogResult<Self> {
        match payload {
            Payload::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| -> LogResult<(String, T)> {
                    Ok((String::from_payload(k)?, T::from_payload(v)?))
                })
                .collect(),
            other => Err(other.mismatch("map")),
        }
    }
}

impl<T: DeserializeOwned> FromPayload for Serialized<T> {
    fn from_payload(payload: Payload) -> LogResult<Self> {
        payload.deserialize_into().map(Serialized)
    }
}
