// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use rollcall_app::{AuxiliaryLookup, LookupEntry, Record, RecordCollection};
use serde::Deserialize;
use serde_json::Value;

use crate::ApiError;

pub const SUCCESS_CODE: i64 = 201;

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    success: Option<bool>,
    #[serde(default)]
    data: Value,
    #[serde(default)]
    image_url: Value,
    #[serde(default)]
    message: Option<String>,
}

/// A response whose success indicator matched. Payload shape is checked
/// lazily by whoever reads `data`.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub data: Value,
    pub image_url: Value,
}

impl Envelope {
    /// Successful iff `code == 201` or `success == true`. Anything else is an
    /// application error carrying the server's message.
    pub fn decode(status: u16, body: &str) -> Result<Self, ApiError> {
        let http_code = Some(i64::from(status));
        let value: Value = match serde_json::from_str(body) {
            Ok(value) => value,
            Err(_) if (200..300).contains(&status) => {
                return Err(ApiError::shape("response body is not JSON"));
            }
            Err(_) => return Err(ApiError::application(http_code, None)),
        };
        if !value.is_object() {
            return Err(ApiError::shape("response body is not an object"));
        }
        let raw: RawEnvelope = serde_json::from_value(value)
            .map_err(|error| ApiError::shape(format!("envelope: {error}")))?;

        let code = raw.code.as_ref().and_then(coerce_code);
        let succeeded = code == Some(SUCCESS_CODE) || raw.success == Some(true);
        if !succeeded {
            return Err(ApiError::application(
                code.or(http_code),
                raw.message.as_deref(),
            ));
        }

        Ok(Self {
            code,
            message: raw.message.filter(|message| !message.trim().is_empty()),
            data: raw.data,
            image_url: raw.image_url,
        })
    }

    pub fn records(&self) -> Result<RecordCollection, ApiError> {
        RecordCollection::from_json(&self.data)
            .ok_or_else(|| ApiError::shape("data is not an array of records"))
    }

    pub fn record(&self) -> Result<Record, ApiError> {
        Record::from_value(self.data.clone())
            .ok_or_else(|| ApiError::shape("data is not a record"))
    }

    /// A missing table is an empty lookup; a malformed one is a shape error.
    pub fn lookup(&self) -> Result<AuxiliaryLookup, ApiError> {
        if self.image_url.is_null() {
            return Ok(AuxiliaryLookup::default());
        }
        let entries: Vec<LookupEntry> = serde_json::from_value(self.image_url.clone())
            .map_err(|error| ApiError::shape(format!("image_url table: {error}")))?;
        Ok(AuxiliaryLookup::from_entries(entries))
    }

    pub fn collection(&self) -> Result<(RecordCollection, AuxiliaryLookup), ApiError> {
        Ok((self.records()?, self.lookup()?))
    }
}

fn coerce_code(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    }
}
