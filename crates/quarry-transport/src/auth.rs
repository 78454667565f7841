//! Applying repository credentials to outgoing requests.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::RequestBuilder;

use quarry_core::repository::Credentials;

/// Build a `Basic` authorization header value, encoding the user-info pair
/// with the configured charset (`UTF-8` unless the session says otherwise).
pub fn basic_header(username: &str, password: &str, charset: &str) -> String {
    let pair = format!("{username}:{password}");
    let bytes = if charset.eq_ignore_ascii_case("ISO-8859-1") || charset.eq_ignore_ascii_case("latin1")
    {
        latin1_bytes(&pair)
    } else {
        pair.into_bytes()
    };
    format!("Basic {}", BASE64.encode(bytes))
}

fn latin1_bytes(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| {
            let code = c as u32;
            if code <= 0xFF {
                code as u8
            } else {
                b'?'
            }
        })
        .collect()
}

/// Attach credentials to a request. A password without a username is sent as
/// a bearer token.
pub fn apply_auth(
    request: RequestBuilder,
    credentials: Option<&Credentials>,
    charset: &str,
) -> RequestBuilder {
    match credentials {
        Some(Credentials {
            username: Some(user),
            password,
        }) => {
            let password = password.as_deref().unwrap_or("");
            request.header(
                reqwest::header::AUTHORIZATION,
                basic_header(user, password, charset),
            )
        }
        Some(Credentials {
            username: None,
            password: Some(token),
        }) => request.bearer_auth(token),
        _ => request,
    }
}
