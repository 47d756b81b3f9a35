//! Application of native projection documents to stored documents.
//!
//! Only top-level fields are projected. In inclusion mode `_id` is kept unless
//! the projection sets it to `0`.

use bson::Document;

use docbridge_core::{
    document::ID_FIELD,
    error::{DocumentStoreError, DocumentStoreResult},
    query::native_flag,
};

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ProjectionMask {
    All,
    Include { fields: Vec<String>, keep_id: bool },
    Exclude(Vec<String>),
}

impl ProjectionMask {
    pub(crate) fn parse(projection: Option<Document>) -> DocumentStoreResult<Self> {
        let Some(projection) = projection else {
            return Ok(Self::All);
        };

        let mut id_flag = None;
        let mut included = Vec::new();
        let mut excluded = Vec::new();

        for (field, flag) in &projection {
            let include = native_flag(flag)? != 0;

            if field == ID_FIELD {
                id_flag = Some(include);
            } else if include {
                included.push(field.clone());
            } else {
                excluded.push(field.clone());
            }
        }

        if !included.is_empty() && !excluded.is_empty() {
            return Err(DocumentStoreError::Store(
                "Cannot mix inclusion and exclusion in a projection".into(),
            ));
        }

        if !included.is_empty() {
            return Ok(Self::Include { fields: included, keep_id: id_flag.unwrap_or(true) });
        }

        if id_flag == Some(false) {
            excluded.push(ID_FIELD.to_string());
        }
        if excluded.is_empty() {
            // Only `_id: 1` was given.
            return Ok(Self::Include { fields: Vec::new(), keep_id: true });
        }

        Ok(Self::Exclude(excluded))
    }

    pub(crate) fn apply(&self, document: &Document) -> Document {
        match self {
            Self::All => document.clone(),
            Self::Include { fields, keep_id } => document
                .iter()
                .filter(|(key, _)| {
                    (*keep_id && key.as_str() == ID_FIELD) || fields.iter().any(|f| f == *key)
                })
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
            Self::Exclude(fields) => document
                .iter()
                .filter(|(key, _)| !fields.iter().any(|f| f == *key))
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId};

    fn stored() -> Document {
        doc! { "_id": ObjectId::new(), "key": "k1", "value": "v1", "note": "n" }
    }

    #[test]
    fn no_projection_keeps_everything() {
        let document = stored();
        let mask = ProjectionMask::parse(None).unwrap();

        assert_eq!(mask.apply(&document), document);
    }

    #[test]
    fn inclusion_keeps_identifier_by_default() {
        let document = stored();
        let mask = ProjectionMask::parse(Some(doc! { "key": 1 })).unwrap();
        let projected = mask.apply(&document);

        assert_eq!(projected.keys().collect::<Vec<_>>(), vec!["_id", "key"]);
    }

    #[test]
    fn inclusion_can_drop_identifier() {
        let mask = ProjectionMask::parse(Some(doc! { "key": 1, "_id": 0 })).unwrap();
        let projected = mask.apply(&stored());

        assert_eq!(projected, doc! { "key": "k1" });
    }

    #[test]
    fn exclusion_removes_named_fields() {
        let mask = ProjectionMask::parse(Some(doc! { "note": 0 })).unwrap();
        let projected = mask.apply(&stored());

        assert!(projected.contains_key("_id"));
        assert!(projected.contains_key("value"));
        assert!(!projected.contains_key("note"));
    }

    #[test]
    fn mixing_modes_is_rejected() {
        assert!(ProjectionMask::parse(Some(doc! { "key": 1, "note": 0 })).is_err());
    }
}
