use url::Url;

use crate::error::{Result, TransportError};

const BLOB_PREFIX: &str = "blob:";

/// Derive the origin (`scheme://host[:port]`) of an address.
///
/// A leading `blob:` is stripped so object URLs resolve to the origin that
/// minted them. The port is omitted when it is the scheme default or zero.
pub fn get_origin(address: &str) -> Result<String> {
    let trimmed = address.trim();
    let without_blob = trimmed.strip_prefix(BLOB_PREFIX).unwrap_or(trimmed);

    let url = Url::parse(without_blob).map_err(|err| TransportError::InvalidAddress {
        address: address.to_string(),
        reason: err.to_string(),
    })?;

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => {
            return Err(TransportError::InvalidAddress {
                address: address.to_string(),
                reason: "address has no host".to_string(),
            })
        }
    };

    // `Url::port` already reports `None` for the scheme's default port.
    match url.port() {
        Some(port) if port != 0 => Ok(format!("{}://{}:{}", url.scheme(), host, port)),
        _ => Ok(format!("{}://{}", url.scheme(), host)),
    }
}
