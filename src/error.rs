use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Cyclic category hierarchy: categories {category_ids:?} never reach a root")]
    CyclicHierarchy { category_ids: Vec<i64> },

    #[error("{entity} {id} references unknown {reference} {reference_id}")]
    UnknownReference {
        entity: &'static str,
        id: i64,
        reference: &'static str,
        reference_id: i64,
    },

    #[error("Invalid {entity} {id}: {details}")]
    InvalidRecord {
        entity: &'static str,
        id: i64,
        details: String,
    },

    #[error("Invalid parameter '{name}': {details}")]
    InvalidParameter { name: &'static str, details: String },

    #[error("Date calculation error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
