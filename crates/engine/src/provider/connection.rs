//! Connection-string routing
//!
//! A host may hold connection strings for several journal providers. Each
//! string a provider hands out starts with a routing token:
//!
//! ```text
//! ProviderId=relationaljournalprovider;Data Source=/var/lib/journal.db
//! ```
//!
//! Keys and values are compared case-insensitively; whitespace around either
//! is ignored. No other part of the string is interpreted here except the
//! SQLite data source.

/// Name every provider of this crate routes by
pub const PROVIDER_NAME: &str = "relationaljournalprovider";

/// Key of the routing token
pub const PROVIDER_ID_KEY: &str = "ProviderId";

const DATA_SOURCE_KEYS: [&str; 2] = ["Data Source", "DataSource"];

fn pairs(connection_string: &str) -> impl Iterator<Item = (&str, &str)> {
    connection_string.split(';').filter_map(|part| {
        let (key, value) = part.split_once('=')?;
        Some((key.trim(), value.trim()))
    })
}

/// True if `connection_string` carries this crate's routing token
pub fn owns_connection(connection_string: &str) -> bool {
    pairs(connection_string).any(|(key, value)| {
        key.eq_ignore_ascii_case(PROVIDER_ID_KEY) && value.eq_ignore_ascii_case(PROVIDER_NAME)
    })
}

/// Prefix a store connection string with the routing token
pub fn with_routing_token(store_connection: &str) -> String {
    let store_connection = strip_routing_token(store_connection);
    if store_connection.is_empty() {
        format!("{}={};", PROVIDER_ID_KEY, PROVIDER_NAME)
    } else {
        format!("{}={};{}", PROVIDER_ID_KEY, PROVIDER_NAME, store_connection)
    }
}

/// Remove any routing token, leaving the store's own connection string
pub fn strip_routing_token(connection_string: &str) -> String {
    connection_string
        .split(';')
        .filter(|part| {
            !part
                .split_once('=')
                .map(|(key, _)| key.trim().eq_ignore_ascii_case(PROVIDER_ID_KEY))
                .unwrap_or(false)
        })
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(";")
}

/// SQLite location named by a connection string
///
/// Uses the `Data Source` key when present, otherwise the whole string
/// (minus any routing token) is taken as the location.
pub fn sqlite_location(connection_string: &str) -> String {
    pairs(connection_string)
        .find(|(key, _)| {
            DATA_SOURCE_KEYS
                .iter()
                .any(|candidate| key.eq_ignore_ascii_case(candidate))
        })
        .map(|(_, value)| value.to_string())
        .unwrap_or_else(|| strip_routing_token(connection_string))
}
