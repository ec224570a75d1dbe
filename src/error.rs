use std::io;

use serde::{Deserialize, Serialize};
use serde_json::Error as JsonError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Error)]
pub enum ZhengtuError {
    #[error("Invalid command: {0}")]
    Command(String),
    #[error("Custom error: {0}")]
    Custom(String),
    #[error("File system error: {0}")]
    Io(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("You do not have permission to access this resource")]
    PermissionDenied,
    #[error("(De)Serialization error: {0}")]
    Serialization(String),
}

impl From<io::Error> for ZhengtuError {
    fn from(x: io::Error) -> Self {
        match x.kind() {
            io::ErrorKind::NotFound => ZhengtuError::NotFound(format!("{x}")),
            io::ErrorKind::PermissionDenied => ZhengtuError::PermissionDenied,
            _ => ZhengtuError::Io(format!("IOError: {}", x.kind())),
        }
    }
}

impl From<JsonError> for ZhengtuError {
    fn from(src: JsonError) -> ZhengtuError {
        ZhengtuError::Serialization(format!("JSON (de)serialization error: {src}"))
    }
}

impl From<toml::de::Error> for ZhengtuError {
    fn from(src: toml::de::Error) -> ZhengtuError {
        ZhengtuError::Serialization(format!("Toml deserialization error: {src}"))
    }
}

impl From<toml::ser::Error> for ZhengtuError {
    fn from(src: toml::ser::Error) -> ZhengtuError {
        ZhengtuError::Serialization(format!("Toml serialization error: {src}"))
    }
}
