//! Typed records and their conversion to and from raw store documents.
//!
//! Any serde-compatible type is a [`Model`]. A stored model is wrapped in a
//! [`Record`] that also carries the store-assigned [`Identifier`]. The
//! [`DocumentMapper`] is the single place where records become BSON documents and
//! back again, so single lookups and multi-record queries share one decode path.

use bson::{
    Bson, Document,
    de::deserialize_from_document,
    oid::ObjectId,
    ser::serialize_to_document,
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Value, from_value, to_value};
use std::{fmt, iter::once, str::FromStr};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Name of the field holding the store-assigned identifier.
pub const ID_FIELD: &str = "_id";

/// Marker trait for every record shape the access layer can store.
///
/// It is implemented automatically for all types that can be serialized and
/// deserialized with serde, so no per-type code is required.
///
/// # Example
///
/// ```ignore
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// pub struct Setting {
///     pub key: String,
///     pub value: String,
/// }
///
/// // `Setting` is now a `Model`.
/// ```
pub trait Model: Serialize + DeserializeOwned + Send + Sync + 'static {}

impl<T> Model for T where T: Serialize + DeserializeOwned + Send + Sync + 'static {}

/// Conversion helpers available on every [`Model`].
pub trait ModelExt: Model {
    /// Serializes this value into a BSON document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Encode`] if the value does not serialize to a document.
    fn to_document(&self) -> DocumentStoreResult<Document>;

    /// Deserializes a value from a BSON document.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Decode`] if the document does not match the shape of `Self`.
    fn from_document(document: Document) -> DocumentStoreResult<Self>;

    /// Serializes this value into JSON.
    fn to_json(&self) -> DocumentStoreResult<Value>;

    /// Deserializes a value from JSON.
    fn from_json(value: Value) -> DocumentStoreResult<Self>;
}

impl<M: Model> ModelExt for M {
    fn to_document(&self) -> DocumentStoreResult<Document> {
        serialize_to_document(self).map_err(|e| DocumentStoreError::Encode(e.to_string()))
    }

    fn from_document(document: Document) -> DocumentStoreResult<Self> {
        deserialize_from_document(document).map_err(|e| DocumentStoreError::Decode(e.to_string()))
    }

    fn to_json(&self) -> DocumentStoreResult<Value> {
        to_value(self).map_err(|e| DocumentStoreError::Encode(e.to_string()))
    }

    fn from_json(value: Value) -> DocumentStoreResult<Self> {
        from_value(value).map_err(|e| DocumentStoreError::Decode(e.to_string()))
    }
}

/// Opaque store-assigned document identifier.
///
/// Identifiers are 12 byte object ids, written as 24 hex characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(ObjectId);

impl Identifier {
    /// Generates a fresh identifier. Only stores should call this.
    pub fn generate() -> Self {
        Self(ObjectId::new())
    }

    /// Parses the 24 character hex form of an identifier.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Identifier`] if `hex` is not a valid encoding.
    pub fn parse(hex: &str) -> DocumentStoreResult<Self> {
        ObjectId::parse_str(hex)
            .map(Self)
            .map_err(|e| DocumentStoreError::Identifier(hex.to_string(), e.to_string()))
    }

    /// Returns the 24 character hex form.
    pub fn to_hex(&self) -> String {
        self.0.to_hex()
    }

    /// Returns the underlying object id.
    pub fn object_id(&self) -> ObjectId {
        self.0
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.to_hex())
    }
}

impl FromStr for Identifier {
    type Err = DocumentStoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<ObjectId> for Identifier {
    fn from(oid: ObjectId) -> Self {
        Self(oid)
    }
}

impl From<Identifier> for Bson {
    fn from(id: Identifier) -> Self {
        Bson::ObjectId(id.0)
    }
}

/// A typed value together with the identifier the store assigned to it.
#[derive(Debug, Clone, PartialEq)]
pub struct Record<T> {
    /// Store-assigned identifier.
    pub id: Identifier,
    /// The record's fields.
    pub value: T,
}

impl<T> Record<T> {
    pub fn new(id: Identifier, value: T) -> Self {
        Self { id, value }
    }

    /// Discards the identifier and returns the value.
    pub fn into_value(self) -> T {
        self.value
    }
}

impl<T: Model> Record<T> {
    /// Renders the record as a JSON object with the identifier under `"id"`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Encode`] if `T` does not serialize to a JSON object.
    pub fn to_json(&self) -> DocumentStoreResult<Value> {
        match self.value.to_json()? {
            Value::Object(mut fields) => {
                fields.insert("id".to_string(), Value::String(self.id.to_hex()));
                Ok(Value::Object(fields))
            }
            other => Err(DocumentStoreError::Encode(format!(
                "expected a JSON object, found {other}"
            ))),
        }
    }
}

/// Converts between raw store documents and typed records.
///
/// The mapper has no knowledge of any particular record shape: all shape
/// handling is delegated to serde. For every record `r` whose fields are
/// representable in BSON, `decode(encode(r)) == r`.
pub struct DocumentMapper;

impl DocumentMapper {
    /// Converts one raw store document into a typed record.
    ///
    /// The `_id` field must hold an object id; the remaining fields are
    /// deserialized into `T`.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Decode`] when the identifier is missing or
    /// malformed, or the fields do not match `T`.
    pub fn decode<T: Model>(mut raw: Document) -> DocumentStoreResult<Record<T>> {
        let id = match raw.remove(ID_FIELD) {
            Some(Bson::ObjectId(oid)) => Identifier::from(oid),
            Some(other) => {
                return Err(DocumentStoreError::Decode(format!(
                    "expected an object id in `{ID_FIELD}`, found {:?}",
                    other.element_type()
                )));
            }
            None => {
                return Err(DocumentStoreError::Decode(format!(
                    "document has no `{ID_FIELD}` field"
                )));
            }
        };

        Ok(Record::new(id, T::from_document(raw)?))
    }

    /// Converts a typed record into a raw store document, identifier first.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::Encode`] if the value does not serialize to a document.
    pub fn encode<T: Model>(record: &Record<T>) -> DocumentStoreResult<Document> {
        Ok(Document::from_iter(
            once((ID_FIELD.to_string(), record.id.into()))
                .chain(Self::encode_value(&record.value)?),
        ))
    }

    /// Converts a bare value into the document used for inserts and replacements.
    ///
    /// Any `_id` the value serializes is dropped; identifiers belong to the store.
    pub fn encode_value<T: Model>(value: &T) -> DocumentStoreResult<Document> {
        let mut document = value.to_document()?;
        document.remove(ID_FIELD);

        Ok(document)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Setting {
        key: String,
        value: String,
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Counter {
        name: String,
        hits: i64,
        tags: Vec<String>,
        owner: Option<String>,
    }

    #[test]
    fn decode_inverts_encode() {
        let record = Record::new(
            Identifier::generate(),
            Counter {
                name: "visits".into(),
                hits: 42,
                tags: vec!["a".into(), "b".into()],
                owner: None,
            },
        );

        let raw = DocumentMapper::encode(&record).unwrap();
        assert_eq!(raw.get_object_id(ID_FIELD).unwrap(), record.id.object_id());
        assert_eq!(raw.keys().next().map(String::as_str), Some(ID_FIELD));

        let decoded: Record<Counter> = DocumentMapper::decode(raw).unwrap();
        assert_eq!(decoded, record);
    }

    #[test]
    fn decode_requires_object_id() {
        let missing = DocumentMapper::decode::<Setting>(doc! { "key": "k", "value": "v" });
        assert!(matches!(missing, Err(DocumentStoreError::Decode(_))));

        let wrong_type =
            DocumentMapper::decode::<Setting>(doc! { "_id": "abc", "key": "k", "value": "v" });
        assert!(matches!(wrong_type, Err(DocumentStoreError::Decode(_))));
    }

    #[test]
    fn decode_rejects_shape_mismatch() {
        let raw = doc! { "_id": ObjectId::new(), "key": 7 };

        assert!(matches!(
            DocumentMapper::decode::<Setting>(raw),
            Err(DocumentStoreError::Decode(_))
        ));
    }

    #[test]
    fn encode_value_strips_identifier() {
        #[derive(Serialize, Deserialize)]
        struct WithId {
            #[serde(rename = "_id")]
            id: String,
            key: String,
        }

        let document = DocumentMapper::encode_value(&WithId { id: "mine".into(), key: "k".into() })
            .unwrap();

        assert_eq!(document, doc! { "key": "k" });
    }

    #[test]
    fn encode_rejects_non_document_values() {
        assert!(matches!(
            DocumentMapper::encode_value(&"just a string".to_string()),
            Err(DocumentStoreError::Encode(_))
        ));
    }

    #[test]
    fn identifier_parses_hex() {
        let id = Identifier::parse("5f1b2c3d4e5f6a7b8c9d0e1f").unwrap();

        assert_eq!(id.to_hex(), "5f1b2c3d4e5f6a7b8c9d0e1f");
        assert_eq!(id.to_string().parse::<Identifier>().unwrap(), id);
    }

    #[test]
    fn identifier_rejects_malformed_input() {
        for input in ["", "not-an-id", "5f1b2c3d4e5f6a7b8c9d0e1", "zz1b2c3d4e5f6a7b8c9d0e1f"] {
            assert!(
                matches!(Identifier::parse(input), Err(DocumentStoreError::Identifier(ref s, _)) if s == input),
                "{input:?} should be rejected"
            );
        }
    }

    #[test]
    fn record_renders_json_with_hex_id() {
        let id = Identifier::generate();
        let record = Record::new(id, Setting { key: "k1".into(), value: "v1".into() });

        assert_eq!(
            record.to_json().unwrap(),
            serde_json::json!({ "id": id.to_hex(), "key": "k1", "value": "v1" })
        );
    }
}
