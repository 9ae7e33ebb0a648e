use std::marker::PhantomData;

use base64ct::Encoding;
use serde::{de, ser, Serialize};

/// Bytes carried as unpadded base64url text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Base64Data<T>(pub T);

impl<T> From<T> for Base64Data<T> {
    fn from(value: T) -> Self {
        Base64Data(value)
    }
}

impl<T> ser::Serialize for Base64Data<T>
where
    T: AsRef<[u8]>,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let target = base64ct::Base64UrlUnpadded::encode_string(self.0.as_ref());
        serializer.serialize_str(&target)
    }
}

struct Base64DataVisitor<T>(PhantomData<T>);

impl<'de, T> de::Visitor<'de> for Base64DataVisitor<T>
where
    T: From<Vec<u8>>,
{
    type Value = Base64Data<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a base64url encoded string")
    }

    fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
    where
        E: de::Error,
    {
        let data = base64ct::Base64UrlUnpadded::decode_vec(v)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &"invalid base64url encoding"))?;
        Ok(Base64Data(data.into()))
    }
}

impl<'de, T> de::Deserialize<'de> for Base64Data<T>
where
    T: From<Vec<u8>>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_str(Base64DataVisitor(PhantomData))
    }
}

/// A value encoded to JSON, then carried as unpadded base64url text.
///
/// Used for JWS protected headers and payloads.
#[derive(Debug, Clone)]
pub struct Base64JSON<T>(pub T);

impl<T> Base64JSON<T>
where
    T: Serialize,
{
    pub(crate) fn serialized_value(&self) -> Result<String, serde_json::Error> {
        let inner = serde_json::to_vec(&self.0)?;
        Ok(base64ct::Base64UrlUnpadded::encode_string(&inner))
    }
}

impl<T> From<T> for Base64JSON<T> {
    fn from(value: T) -> Self {
        Base64JSON(value)
    }
}

impl<T> ser::Serialize for Base64JSON<T>
where
    T: ser::Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::Error;
        let inner = self
            .serialized_value()
            .map_err(|err| S::Error::custom(format!("Error producing inner JSON: {err}")))?;
        serializer.serialize_str(&inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base64_data_is_unpadded_urlsafe() {
        let data = Base64Data(vec![0xfbu8, 0xff, 0x01]);
        let encoded = serde_json::to_string(&data).unwrap();
        assert_eq!(encoded, "\"-_8B\"");

        let decoded: Base64Data<Vec<u8>> = serde_json::from_str(&encoded).unwrap();
        assert_eq!(decoded, data);
    }

    #[test]
    fn base64_json_wraps_serialized_value() {
        let value = Base64JSON(serde_json::json!({"a": 1}));
        assert_eq!(value.serialized_value().unwrap(), "eyJhIjoxfQ");
    }
}
