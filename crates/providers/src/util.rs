use discuss_domain::error::Error;

/// Convert a `reqwest::Error` into the shared `Error` type, matching the
/// teacher's `from_reqwest` helper (`sa_providers::util::from_reqwest`).
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}

/// Model identifiers carry a provider prefix convention: identifiers
/// containing a "/" route to the remote cloud provider; unprefixed ones
/// route to the local provider (spec §4.1).
pub fn is_remote_model(model: &str) -> bool {
    model.contains('/')
}
