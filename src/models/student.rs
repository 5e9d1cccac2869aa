use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// The four client-supplied fields of a registration.
///
/// Built by HTTP validation on the way in and deserialized again from the
/// Kafka payload by the integration worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    /// Last name
    pub nom: String,
    /// First name
    pub prenom: String,
    /// Student number
    pub numero: String,
    pub email: String,
}

impl NewStudent {
    /// Decode a message payload.
    ///
    /// Goes through `serde_json::Value` so that a repeated key resolves to
    /// its last occurrence, exactly as HTTP validation sees it.
    pub fn from_payload(payload: &[u8]) -> serde_json::Result<Self> {
        let value: serde_json::Value = serde_json::from_slice(payload)?;
        Self::deserialize(value)
    }
}

/// A persisted row of the `students` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Student {
    pub id: i32,
    pub nom: String,
    pub prenom: String,
    pub numero: String,
    pub email: String,
    /// Assigned by the column default; nullable in the schema
    pub created_at: Option<NaiveDateTime>,
}

impl Student {
    /// Build a row from a new record and the store-assigned values.
    pub fn from_new(id: i32, record: NewStudent, created_at: NaiveDateTime) -> Self {
        Self {
            id,
            nom: record.nom,
            prenom: record.prenom,
            numero: record.numero,
            email: record.email,
            created_at: Some(created_at),
        }
    }
}
