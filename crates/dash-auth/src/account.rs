//! Current-account lookup, used to confirm who just authenticated

use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;

use crate::constants::Endpoints;
use crate::error::{Error, Result};

const CURRENT_ACCOUNT_ROUTE: &str = "/2/users/get_current_account";

/// The account an access token belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountIdentity {
    pub account_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
}

impl AccountIdentity {
    /// Identity known only by id, used when the lookup itself failed.
    pub fn unresolved(account_id: Option<String>) -> Self {
        Self {
            account_id: account_id.unwrap_or_default(),
            display_name: None,
            email: None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct AccountResponse {
    account_id: String,
    #[serde(default)]
    name: Option<AccountName>,
    #[serde(default)]
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccountName {
    #[serde(default)]
    display_name: Option<String>,
}

/// Fetch the identity behind `access_token`.
///
/// The RPC endpoint takes no arguments; Dropbox expects a literal JSON
/// `null` body.
pub async fn fetch_current_account(
    client: &reqwest::Client,
    endpoints: &Endpoints,
    access_token: &str,
) -> Result<AccountIdentity> {
    let response = client
        .post(endpoints.api(CURRENT_ACCOUNT_ROUTE))
        .bearer_auth(access_token)
        .header(CONTENT_TYPE, "application/json")
        .body("null")
        .send()
        .await
        .map_err(|e| Error::from_reqwest("account lookup failed", e))?;

    let status = response.status();
    if status.as_u16() == 401 {
        return Err(Error::AuthRequired(
            "access token was rejected by the account endpoint".into(),
        ));
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(Error::Http(format!("account lookup returned {status}: {body}")));
    }

    let account: AccountResponse = response
        .json()
        .await
        .map_err(|e| Error::Http(format!("invalid account response: {e}")))?;

    Ok(AccountIdentity {
        account_id: account.account_id,
        display_name: account.name.and_then(|n| n.display_name),
        email: account.email,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn endpoints(server: &MockServer) -> Endpoints {
        Endpoints {
            api_base_url: server.uri(),
            ..Endpoints::default()
        }
    }

    #[tokio::test]
    async fn parses_display_name_and_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CURRENT_ACCOUNT_ROUTE))
            .and(header("authorization", "Bearer sl.token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "account_id": "dbid:xyz",
                "name": {"display_name": "Ada Lovelace", "given_name": "Ada"},
                "email": "ada@example.com"
            })))
            .mount(&server)
            .await;

        let identity = fetch_current_account(&reqwest::Client::new(), &endpoints(&server), "sl.token")
            .await
            .unwrap();
        assert_eq!(identity.account_id, "dbid:xyz");
        assert_eq!(identity.display_name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(identity.email.as_deref(), Some("ada@example.com"));
    }

    #[tokio::test]
    async fn unauthorized_maps_to_auth_required() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(CURRENT_ACCOUNT_ROUTE))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = fetch_current_account(&reqwest::Client::new(), &endpoints(&server), "bad")
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AuthRequired(_)), "got {err:?}");
    }

    #[test]
    fn unresolved_identity_keeps_account_id() {
        let identity = AccountIdentity::unresolved(Some("dbid:1".into()));
        assert_eq!(identity.account_id, "dbid:1");
        assert!(identity.display_name.is_none());
    }
}
