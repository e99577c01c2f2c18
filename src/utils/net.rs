use crate::ConnectionError;
use crate::Result;

/// accept ip either like 127.0.0.1 or docker host name: node1
pub(crate) fn address_str(addr: &str) -> String {
    // Strip existing "http://" or "https://" prefixes if duplicated.
    let normalized = addr.trim_start_matches("http://").trim_start_matches("https://");
    // Re-add a single "http://" prefix (or use HTTPS if needed).
    format!("http://{normalized}")
}

/// Splits a comma-separated host list into normalized endpoint URIs.
pub(crate) fn split_hosts(hosts: &str) -> Result<Vec<String>> {
    let endpoints: Vec<String> = hosts
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(address_str)
        .collect();

    if endpoints.is_empty() {
        return Err(ConnectionError::EmptyHostList.into());
    }

    Ok(endpoints)
}
