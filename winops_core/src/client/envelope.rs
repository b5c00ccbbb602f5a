use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The uniform `{success, message, data}` body every capability call
/// answers with, local or remote.
///
/// `data` stays untyped on the wire; callers pick the payload type with
/// [`Envelope::data_as`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

impl Envelope {
    pub fn ok(message: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            success: true,
            message: message.into(),
            data,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
        }
    }

    /// Decode `data` into `T`. `None` when the call failed, carried no
    /// payload, or the payload has the wrong shape.
    pub fn data_as<T: DeserializeOwned>(&self) -> Option<T> {
        if !self.success {
            return None;
        }
        let value = self.data.clone()?;
        match serde_json::from_value(value) {
            Ok(v) => Some(v),
            Err(e) => {
                log::warn!("Unexpected payload shape: {}", e);
                None
            }
        }
    }
}
