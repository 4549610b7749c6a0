use serde::{Deserialize, Serialize};

/// Body of `POST /set`. An omitted TTL must serialize as `null`, never as `0`:
/// zero is a valid TTL that expires the key immediately.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SetRequest {
    pub key: String,
    pub value: String,
    pub ttl: Option<u64>,
}

/// Successful `GET /keys` response. `count` is reported by the server and is
/// authoritative even if it disagrees with `keys.len()`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyListing {
    pub keys: Vec<String>,
    pub count: u64,
}

/// Confirmation body for mutations and admin commands.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageReply {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
}

/// Failure body used by every store endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorReply {
    pub detail: String,
}

/// Record returned by `GET /get/{key}`. `ttl_remaining` is `null` for keys
/// stored without a TTL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyRecord {
    pub key: String,
    pub value: String,
    pub ttl_remaining: Option<u64>,
}
