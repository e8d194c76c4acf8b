use super::CredentialInfo;
use crate::error::{ControlError, Result};
use crate::store::{DocumentStore, KvPair};
use tracing::{info, warn};

/// Key of the document holding all credential metadata
pub const CREDENTIALS_DB_KEY: &str = "credentials";

/// Read the credential document and its store index
///
/// A missing or `{}` document is an empty set of credentials at index 0.
pub fn read_credential_info(kv: &dyn DocumentStore) -> Result<(CredentialInfo, u64)> {
    let pair = match kv.get(CREDENTIALS_DB_KEY) {
        Ok(pair) => pair,
        Err(e) => {
            warn!("Could not read credential database: {}", e);
            return Err(e);
        }
    };

    let pair = match pair {
        Some(pair) if pair.value.trim() != "{}" && !pair.value.trim().is_empty() => pair,
        _ => {
            info!("Credentials are uninitialized");
            return Ok((CredentialInfo::default(), 0));
        }
    };

    let db: CredentialInfo = serde_json::from_str(&pair.value).map_err(|e| {
        warn!("Could not parse credential database at index {}: {}", pair.index, e);
        ControlError::corrupt(CREDENTIALS_DB_KEY, e)
    })?;

    Ok((db, pair.index))
}

/// Write the credential document back
pub fn write_credential_info(kv: &dyn DocumentStore, db: &CredentialInfo) -> Result<KvPair> {
    let value = serde_json::to_string(db).map_err(|e| {
        ControlError::Store(format!("could not encode credential database: {}", e))
    })?;

    kv.put(CREDENTIALS_DB_KEY, &value).map_err(|e| {
        warn!("Could not write credential database: {}", e);
        e
    })
}
