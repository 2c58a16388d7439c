//! Installed-app OAuth consent over a loopback redirect.

use chrono::Utc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;

use crate::GmailError;
use crate::credentials::{ClientSecrets, OAuthToken, request_token};

pub const GMAIL_READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

const DONE_PAGE: &str =
    "The authentication flow has completed. You may close this window.";

/// What the browser brought back to the loopback listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectOutcome {
    Code(String),
    Denied(String),
}

/// Build the consent URL the user must open.
pub fn consent_url(secrets: &ClientSecrets, redirect_uri: &str) -> Result<reqwest::Url, GmailError> {
    reqwest::Url::parse_with_params(
        &secrets.auth_uri,
        &[
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri),
            ("response_type", "code"),
            ("scope", GMAIL_READONLY_SCOPE),
            ("access_type", "offline"),
            ("prompt", "consent"),
        ],
    )
    .map_err(|e| GmailError::InvalidClientSecrets(format!("bad auth_uri: {e}")))
}

/// Parse an HTTP request line such as `GET /?code=abc&scope=... HTTP/1.1`.
///
/// Returns `None` for requests that carry neither `code` nor `error`
/// (e.g. a browser's favicon probe).
pub fn parse_redirect_request(request_line: &str) -> Option<RedirectOutcome> {
    let target = request_line.split_whitespace().nth(1)?;
    let url = reqwest::Url::parse(&format!("http://localhost{target}")).ok()?;
    let mut code = None;
    let mut error = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "error" => error = Some(value.into_owned()),
            _ => {}
        }
    }
    match (code, error) {
        (_, Some(err)) => Some(RedirectOutcome::Denied(err)),
        (Some(code), None) => Some(RedirectOutcome::Code(code)),
        (None, None) => None,
    }
}

async fn wait_for_redirect(listener: &TcpListener) -> Result<RedirectOutcome, GmailError> {
    loop {
        let (stream, peer) = listener.accept().await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).await?;
        // Headers must be consumed before the socket is closed.
        let mut header = String::new();
        while reader.read_line(&mut header).await? > 2 {
            header.clear();
        }

        match parse_redirect_request(&request_line) {
            Some(outcome) => {
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                    DONE_PAGE.len(),
                    DONE_PAGE
                );
                write_half.write_all(response.as_bytes()).await?;
                write_half.shutdown().await?;
                return Ok(outcome);
            }
            None => {
                tracing::debug!(%peer, request = request_line.trim(), "ignoring unrelated request");
                write_half
                    .write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n")
                    .await?;
            }
        }
    }
}

/// Run the interactive consent flow and exchange the code for a token.
pub(crate) async fn run_consent_flow(
    client: &reqwest::Client,
    secrets: &ClientSecrets,
    prompt: impl Fn(&str),
) -> Result<OAuthToken, GmailError> {
    let listener = TcpListener::bind(("127.0.0.1", 0)).await?;
    let port = listener.local_addr()?.port();
    let redirect_uri = format!("http://localhost:{port}/");

    let url = consent_url(secrets, &redirect_uri)?;
    prompt(url.as_str());
    tracing::info!(port, "waiting for OAuth redirect");

    let code = match wait_for_redirect(&listener).await? {
        RedirectOutcome::Code(code) => code,
        RedirectOutcome::Denied(err) => return Err(GmailError::Consent(err)),
    };

    let resp = request_token(
        client,
        &secrets.token_uri,
        &[
            ("grant_type", "authorization_code"),
            ("code", code.as_str()),
            ("redirect_uri", redirect_uri.as_str()),
            ("client_id", secrets.client_id.as_str()),
            ("client_secret", secrets.client_secret.as_str()),
        ],
    )
    .await?;
    Ok(resp.into_token(Utc::now(), None))
}
