//! Payloads exchanged with the remote create-lead endpoint.

use serde::{Deserialize, Serialize};

use crate::{CustomerRef, Draft, DraftId, LineItem, RemoteId};

/// Body of a create-lead request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLeadRequest {
    /// The draft this request was built from.
    ///
    /// Lets a deduplicating server recognise a retried request.
    pub client_reference: DraftId,
    /// Customer the lead is for.
    pub customer: CustomerRef,
    /// Ordered product lines.
    pub items: Vec<LineItem>,
}

impl CreateLeadRequest {
    /// Build the request for a draft.
    pub fn from_draft(draft: &Draft) -> Self {
        Self {
            client_reference: draft.id,
            customer: draft.customer.clone(),
            items: draft.items.clone(),
        }
    }
}

/// Successful create-lead response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateLeadResponse {
    /// Identifier of the created lead.
    ///
    /// Accepts either a JSON string or a JSON number.
    #[serde(deserialize_with = "string_or_number")]
    pub id: RemoteId,
}

/// Structured error body returned by the remote API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ErrorBody {
    /// Human-readable message.
    #[serde(default, alias = "error")]
    pub message: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<RemoteId, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => RemoteId::new(s),
        Raw::Int(n) => RemoteId::new(n.to_string()),
    })
}
