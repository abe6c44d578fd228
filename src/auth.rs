//! OAuth2 authentication for the Gmail API

use google_gmail1::{hyper_rustls, hyper_util, yup_oauth2, Gmail};
use std::path::Path;

use crate::error::{Result, TidyError};

/// Read-only access; the report never modifies the mailbox
pub const READONLY_SCOPE: &str = "https://www.googleapis.com/auth/gmail.readonly";

/// Type alias for Gmail Hub to simplify type signatures
pub type GmailHub =
    Gmail<hyper_rustls::HttpsConnector<hyper_util::client::legacy::connect::HttpConnector>>;

/// Initialize Gmail API hub with OAuth2 authentication
///
/// Runs the installed-app flow (opens a browser) when no valid token is
/// cached, persists tokens to `token_cache_path`, and builds an HTTP/1 client
/// with TLS.
///
/// # Arguments
/// * `credentials_path` - Path to the OAuth2 client secret downloaded from Google Cloud Console
/// * `token_cache_path` - Path where access tokens will be cached
pub async fn initialize_gmail_hub(
    credentials_path: &Path,
    token_cache_path: &Path,
) -> Result<GmailHub> {
    if !credentials_path.exists() {
        return Err(TidyError::AuthError(format!(
            "{:?} not found. Please download it from Google Cloud Console",
            credentials_path
        )));
    }

    let secret = yup_oauth2::read_application_secret(credentials_path)
        .await
        .map_err(|e| TidyError::AuthError(format!("Failed to read credentials: {}", e)))?;

    if let Some(parent) = token_cache_path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let auth = yup_oauth2::InstalledFlowAuthenticator::builder(
        secret,
        yup_oauth2::InstalledFlowReturnMethod::HTTPRedirect,
    )
    .persist_tokens_to_disk(token_cache_path)
    .build()
    .await
    .map_err(|e| TidyError::AuthError(format!("Failed to build authenticator: {}", e)))?;

    // Obtain the token up front so concurrent fetches don't each start a flow
    let _token = auth
        .token(&[READONLY_SCOPE])
        .await
        .map_err(|e| TidyError::AuthError(format!("Failed to obtain token: {}", e)))?;

    if token_cache_path.exists() {
        secure_token_file(token_cache_path).await?;
    }

    let client = hyper_util::client::legacy::Client::builder(hyper_util::rt::TokioExecutor::new())
        .build(
            hyper_rustls::HttpsConnectorBuilder::new()
                .with_native_roots()
                .map_err(|e| TidyError::AuthError(format!("Failed to load TLS roots: {}", e)))?
                .https_or_http()
                .enable_http1()
                .build(),
        );

    Ok(Gmail::new(client, auth))
}

/// Restrict the token cache to the owner (0600)
#[cfg(unix)]
pub async fn secure_token_file(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_mode(0o600);
    tokio::fs::set_permissions(path, perms).await?;
    Ok(())
}

/// Windows relies on the profile directory ACLs
#[cfg(windows)]
pub async fn secure_token_file(_path: &Path) -> Result<()> {
    Ok(())
}
