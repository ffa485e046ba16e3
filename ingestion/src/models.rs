// Copyright Amazon.com, Inc. or its affiliates. All Rights Reserved.
// SPDX-License-Identifier: MIT-0

use std::fmt;

use aws_credential_types::Credentials;
use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use zeroize::ZeroizeOnDrop;

use crate::constants::{
    BIRTHDATE_FORMAT, SAMPLE_BIRTHDATE, SAMPLE_FIRST_NAME, SAMPLE_LAST_NAME, SESSION_NAME,
};
use crate::errors::SearchError;

/// Short-lived credentials of the assumed ingestion role.
#[derive(Clone, ZeroizeOnDrop)]
pub struct Credential {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: String,
}

// Custom Debug implementation to prevent accidental logging of sensitive data
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_key_id", &"[REDACTED]")
            .field("secret_access_key", &"[REDACTED]")
            .field("session_token", &"[REDACTED]")
            .finish()
    }
}

impl From<Credentials> for Credential {
    fn from(credential: Credentials) -> Self {
        let token = match credential.session_token() {
            Some(token) => token.to_string(),
            None => "".to_string(),
        };

        Self {
            access_key_id: credential.access_key_id().to_string(),
            secret_access_key: credential.secret_access_key().to_string(),
            session_token: token,
        }
    }
}

impl From<&Credential> for Credentials {
    fn from(credential: &Credential) -> Self {
        let token = match credential.session_token.as_str() {
            "" => None,
            token => Some(token.to_string()),
        };
        Credentials::new(
            credential.access_key_id.clone(),
            credential.secret_access_key.clone(),
            token,
            None,
            SESSION_NAME,
        )
    }
}

/// Index body: two text fields and a date accepting ISO-8601 or epoch millis.
pub fn index_mapping() -> Value {
    json!({
        "mappings": {
            "properties": {
                "firstName": { "type": "text" },
                "lastName": { "type": "text" },
                "birthdate": { "type": "date", "format": BIRTHDATE_FORMAT }
            }
        }
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    pub first_name: String,
    pub last_name: String,
    /// Epoch milliseconds.
    pub birthdate: i64,
}

impl Person {
    pub fn new(first_name: &str, last_name: &str, birthdate: &str) -> Result<Self, SearchError> {
        let birthdate = DateTime::parse_from_rfc3339(birthdate)
            .map_err(|e| SearchError::Serialization(format!("birthdate {birthdate:?}: {e}")))?
            .timestamp_millis();
        Ok(Self {
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
            birthdate,
        })
    }

    pub fn sample() -> Result<Self, SearchError> {
        Self::new(SAMPLE_FIRST_NAME, SAMPLE_LAST_NAME, SAMPLE_BIRTHDATE)
    }
}

/// `{"query": {"match": {field: text}}}`
pub fn match_query(field: &str, text: &str) -> Value {
    let mut clause = Map::new();
    clause.insert(field.to_string(), Value::from(text));
    json!({ "query": { "match": clause } })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_person() {
        let person = Person::sample().unwrap();
        assert_eq!(person.birthdate, 3_660_000);
        assert_eq!(
            serde_json::to_value(&person).unwrap(),
            json!({ "firstName": "John", "lastName": "Doe", "birthdate": 3_660_000 })
        );
    }

    #[test]
    fn test_invalid_birthdate() {
        assert!(matches!(
            Person::new("John", "Doe", "yesterday"),
            Err(SearchError::Serialization(_))
        ));
    }

    #[test]
    fn test_index_mapping() {
        let mapping = index_mapping();
        assert_eq!(
            mapping["mappings"]["properties"]["birthdate"]["format"],
            "strict_date_optional_time||epoch_millis"
        );
        assert_eq!(mapping["mappings"]["properties"]["firstName"]["type"], "text");
    }

    #[test]
    fn test_match_query() {
        assert_eq!(
            match_query("firstName", "John"),
            json!({ "query": { "match": { "firstName": "John" } } })
        );
    }

    #[test]
    fn test_credential_debug_is_redacted() {
        let credential = Credential {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "wJalrXUtnFEMI".to_string(),
            session_token: "token".to_string(),
        };
        let debug = format!("{credential:?}");
        assert!(!debug.contains("AKIDEXAMPLE"));
        assert!(!debug.contains("wJalrXUtnFEMI"));
        let credentials: Credentials = (&credential).into();
        assert_eq!(credentials.session_token(), Some("token"));
    }
}
