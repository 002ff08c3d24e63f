use thiserror::Error;
use url::{ParseError, Url};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidUri {
    #[error("value is empty")]
    Empty,

    #[error("invalid URI for request")]
    Opaque,

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Checks that `value` may be used as a request URI: either an absolute path
/// or an absolute URI whose scheme is followed by a path.
///
/// Hosts may be empty and ports are not range checked.
pub fn validate_uri(value: &str) -> Result<(), InvalidUri> {
    if value.is_empty() {
        return Err(InvalidUri::Empty);
    }

    if value.starts_with('/') {
        return Ok(());
    }

    match Url::parse(value) {
        Ok(url) if url.cannot_be_a_base() => return Err(InvalidUri::Opaque),
        Ok(_) | Err(ParseError::EmptyHost) => {}
        Err(ParseError::InvalidPort) if has_numeric_port(value) => {}
        Err(error) => return Err(error.into()),
    }

    // The parser adds the missing slashes to special schemes like `https:foo`.
    match value.split_once(':') {
        Some((_, rest)) if rest.starts_with('/') => Ok(()),
        _ => Err(InvalidUri::Opaque),
    }
}

fn has_numeric_port(value: &str) -> bool {
    let authority = match value.split_once("://") {
        Some((_, rest)) => rest
            .split(|c| matches!(c, '/' | '?' | '#'))
            .next()
            .unwrap_or_default(),
        None => return false,
    };
    let host_port = authority.rsplit('@').next().unwrap_or_default();
    let port = match host_port.rfind(']') {
        Some(idx) => &host_port[idx + 1..],
        None => host_port,
    };
    port.rsplit_once(':')
        .is_some_and(|(_, port)| port.chars().all(|c| c.is_ascii_digit()))
}
