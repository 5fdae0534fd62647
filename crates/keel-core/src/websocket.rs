use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// A websocket front, recorded by the process that serves it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Websocket {
    pub id: Uuid,
    #[schema(example = "wss://ws.example.com")]
    pub url: String,
    pub created_at: u64,
}

impl Websocket {
    pub fn new(url: impl Into<String>, created_at: u64) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: url.into(),
            created_at,
        }
    }
}
