use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use service_core::auth::ScopeSet;

use crate::{services::GrantError, AppState};

pub const GRANT_TYPE_CLIENT_CREDENTIALS: &str = "client_credentials";

/// Form body of `POST /oauth2/token`.
#[derive(Debug, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub scope: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<Secret<String>>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub scope: String,
}

struct ClientCredentials {
    client_id: String,
    client_secret: Secret<String>,
}

pub async fn issue_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, GrantError> {
    let req: TokenRequest = serde_urlencoded::from_bytes(&body)
        .map_err(|e| GrantError::InvalidRequest(e.to_string()))?;

    match req.grant_type.as_deref() {
        Some(GRANT_TYPE_CLIENT_CREDENTIALS) => {}
        Some(other) => return Err(GrantError::UnsupportedGrantType(other.to_string())),
        None => {
            return Err(GrantError::InvalidRequest(
                "grant_type is required".to_string(),
            ))
        }
    }

    // An empty scope parameter is treated as omitted.
    let requested = match req.scope.as_deref().map(str::trim) {
        Some(raw) if !raw.is_empty() => Some(
            ScopeSet::parse_delimited(raw).map_err(|e| GrantError::InvalidScope(e.to_string()))?,
        ),
        _ => None,
    };

    let credentials = client_credentials(&headers, &req)?;

    let issued = state.issuer.mint(
        &credentials.client_id,
        credentials.client_secret.expose_secret(),
        requested.as_ref(),
    )?;

    metrics::counter!("oauth_tokens_issued_total").increment(1);

    let mut res = (
        StatusCode::OK,
        Json(TokenResponse {
            access_token: issued.access_token,
            token_type: "Bearer".to_string(),
            expires_in: issued.expires_in,
            scope: issued.claims.scope.to_string(),
        }),
    )
        .into_response();
    res.headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    res.headers_mut()
        .insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    Ok(res)
}

/// Client authentication: HTTP Basic, or `client_id`/`client_secret` in the
/// form body. Presenting both is a malformed request.
fn client_credentials(
    headers: &HeaderMap,
    req: &TokenRequest,
) -> Result<ClientCredentials, GrantError> {
    let basic = parse_basic(headers)?;

    match (basic, &req.client_id, &req.client_secret) {
        (Some(_), Some(_), _) | (Some(_), _, Some(_)) => Err(GrantError::InvalidRequest(
            "client credentials presented more than once".to_string(),
        )),
        (Some(credentials), None, None) => Ok(credentials),
        (None, Some(client_id), Some(client_secret)) => Ok(ClientCredentials {
            client_id: client_id.clone(),
            client_secret: client_secret.clone(),
        }),
        _ => Err(GrantError::MissingCredentials),
    }
}

fn parse_basic(headers: &HeaderMap) -> Result<Option<ClientCredentials>, GrantError> {
    let value = match headers.get(header::AUTHORIZATION) {
        Some(value) => value,
        None => return Ok(None),
    };

    let malformed = || GrantError::InvalidRequest("malformed Authorization header".to_string());

    let value = value.to_str().map_err(|_| malformed())?;
    let (scheme, encoded) = value.trim().split_once(' ').ok_or_else(malformed)?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return Err(malformed());
    }

    let decoded = STANDARD.decode(encoded.trim()).map_err(|_| malformed())?;
    let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
    let (client_id, client_secret) = decoded.split_once(':').ok_or_else(malformed)?;

    Ok(Some(ClientCredentials {
        client_id: client_id.to_string(),
        client_secret: Secret::new(client_secret.to_string()),
    }))
}
