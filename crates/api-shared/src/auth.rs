//! Shared-password login and signed session tokens.
//!
//! There are no user accounts. Anyone who knows the system password may log in under any
//! username; the username is only used to tag records. A successful login issues a session
//! token in an HTTP-only `auth` cookie:
//!
//! ```text
//! base64url(json { username, authenticated, timestamp }) "." base64url(hmac_sha256(payload))
//! ```
//!
//! Tokens expire eight hours after issue. Any token that is missing, malformed, badly signed
//! or expired resolves to the `Unknown` caller. Requests are never rejected for lack of a
//! session.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use icr_core::CallerIdentity;
use serde::{Deserialize, Serialize};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const SESSION_COOKIE_NAME: &str = "auth";
pub const SESSION_TTL_SECS: i64 = 8 * 60 * 60;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,
    #[error("invalid password")]
    InvalidPassword,
    #[error("SYSTEM_PASSWORD must be set and non-empty")]
    MissingSystemPassword,
    #[error("session secret is not a usable HMAC key")]
    InvalidKey,
    #[error("failed to encode session token: {0}")]
    TokenEncoding(serde_json::Error),
}

pub type AuthResult<T> = std::result::Result<T, AuthError>;

#[derive(Debug, Serialize, Deserialize)]
struct SessionPayload {
    username: String,
    authenticated: bool,
    /// Issue time, milliseconds since the Unix epoch.
    timestamp: i64,
}

/// Login and session settings, resolved once at startup.
#[derive(Clone)]
pub struct AuthConfig {
    system_password: String,
    mac: HmacSha256,
    secure_cookies: bool,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("secure_cookies", &self.secure_cookies)
            .finish_non_exhaustive()
    }
}

impl AuthConfig {
    /// `session_secret` falls back to the system password when unset or blank.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingSystemPassword` if `system_password` is empty.
    pub fn new(
        system_password: &str,
        session_secret: Option<&str>,
        secure_cookies: bool,
    ) -> AuthResult<Self> {
        if system_password.is_empty() {
            return Err(AuthError::MissingSystemPassword);
        }
        let secret = session_secret
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(system_password);

        let mac = HmacSha256::new_from_slice(secret.as_bytes()).map_err(|_| AuthError::InvalidKey)?;

        Ok(Self {
            system_password: system_password.to_string(),
            mac,
            secure_cookies,
        })
    }

    /// Check a login attempt and return the identity it establishes.
    ///
    /// # Errors
    ///
    /// `AuthError::MissingCredentials` when either field is missing or blank,
    /// `AuthError::InvalidPassword` when the password does not match.
    pub fn check_credentials(
        &self,
        username: Option<&str>,
        password: Option<&str>,
    ) -> AuthResult<CallerIdentity> {
        let username = username.map(str::trim).filter(|u| !u.is_empty());
        let password = password.filter(|p| !p.is_empty());
        let (Some(username), Some(password)) = (username, password) else {
            return Err(AuthError::MissingCredentials);
        };

        if password != self.system_password {
            return Err(AuthError::InvalidPassword);
        }
        Ok(CallerIdentity::new(username))
    }

    /// Sign a session token for `identity`, issued at `now`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::TokenEncoding` if the token payload cannot be serialised.
    pub fn issue_token(&self, identity: &CallerIdentity, now: DateTime<Utc>) -> AuthResult<String> {
        let payload = SessionPayload {
            username: identity.username().to_string(),
            authenticated: true,
            timestamp: now.timestamp_millis(),
        };
        let json = serde_json::to_vec(&payload).map_err(AuthError::TokenEncoding)?;
        let encoded = URL_SAFE_NO_PAD.encode(json);

        let mut mac = self.mac.clone();
        mac.update(encoded.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());

        Ok(format!("{encoded}.{signature}"))
    }

    /// The identity carried by `token`, or `None` if it is not a valid, current session.
    pub fn verify_token(&self, token: &str, now: DateTime<Utc>) -> Option<CallerIdentity> {
        let (encoded, signature) = token.trim().split_once('.')?;
        let signature = URL_SAFE_NO_PAD.decode(signature).ok()?;

        let mut mac = self.mac.clone();
        mac.update(encoded.as_bytes());
        mac.verify_slice(&signature).ok()?;

        let json = URL_SAFE_NO_PAD.decode(encoded).ok()?;
        let payload: SessionPayload = serde_json::from_slice(&json).ok()?;
        if !payload.authenticated {
            return None;
        }

        let age_ms = now.timestamp_millis() - payload.timestamp;
        if !(0..SESSION_TTL_SECS * 1000).contains(&age_ms) {
            return None;
        }

        let identity = CallerIdentity::new(&payload.username);
        identity.is_authenticated().then_some(identity)
    }

    /// Resolve the caller from a raw `Cookie` header. Never fails.
    pub fn identity_from_cookie_header(
        &self,
        header: Option<&str>,
        now: DateTime<Utc>,
    ) -> CallerIdentity {
        header
            .and_then(session_cookie_value)
            .and_then(|token| self.verify_token(token, now))
            .unwrap_or_else(|| {
                tracing::debug!("no valid session; caller is unknown");
                CallerIdentity::unknown()
            })
    }

    /// `Set-Cookie` value carrying a fresh session token.
    pub fn session_cookie(&self, token: &str) -> String {
        let mut cookie = format!(
            "{SESSION_COOKIE_NAME}={token}; HttpOnly; SameSite=Lax; Path=/; Max-Age={SESSION_TTL_SECS}"
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }

    /// `Set-Cookie` value that removes the session.
    pub fn clear_cookie(&self) -> String {
        let mut cookie =
            format!("{SESSION_COOKIE_NAME}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0");
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// The `auth` value from a `Cookie` header such as `a=1; auth=TOKEN`.
fn session_cookie_value(header: &str) -> Option<&str> {
    header.split(';').find_map(|pair| {
        let (name, value) = pair.trim().split_once('=')?;
        (name.trim() == SESSION_COOKIE_NAME).then(|| value.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn cfg() -> AuthConfig {
        AuthConfig::new("letmein", Some("session-secret"), false).expect("config should build")
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
    }

    #[test]
    fn credentials_are_checked() {
        let cfg = cfg();
        let id = cfg
            .check_credentials(Some(" pharm1 "), Some("letmein"))
            .expect("valid login");
        assert_eq!(id.username(), "pharm1");
        assert!(id.is_authenticated());

        assert!(matches!(
            cfg.check_credentials(Some("pharm1"), None),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            cfg.check_credentials(Some("  "), Some("letmein")),
            Err(AuthError::MissingCredentials)
        ));
        assert!(matches!(
            cfg.check_credentials(Some("pharm1"), Some("wrong")),
            Err(AuthError::InvalidPassword)
        ));
    }

    #[test]
    fn empty_system_password_is_rejected() {
        assert!(matches!(
            AuthConfig::new("", None, false),
            Err(AuthError::MissingSystemPassword)
        ));
    }

    #[test]
    fn token_round_trips_within_ttl() {
        let cfg = cfg();
        let token = cfg
            .issue_token(&CallerIdentity::new("nurse"), now())
            .unwrap();

        let later = now() + Duration::hours(7);
        let id = cfg.verify_token(&token, later).expect("token should be valid");
        assert_eq!(id.username(), "nurse");
    }

    #[test]
    fn expired_or_tampered_tokens_are_unknown() {
        let cfg = cfg();
        let token = cfg
            .issue_token(&CallerIdentity::new("nurse"), now())
            .unwrap();

        assert!(cfg.verify_token(&token, now() + Duration::hours(8)).is_none());

        let (payload, sig) = token.split_once('.').unwrap();
        let forged_payload = URL_SAFE_NO_PAD.encode(
            br#"{"username":"admin","authenticated":true,"timestamp":1709280000000}"#,
        );
        assert!(cfg.verify_token(&format!("{forged_payload}.{sig}"), now()).is_none());
        assert!(cfg.verify_token(payload, now()).is_none());
        assert!(cfg.verify_token("garbage", now()).is_none());

        let other = AuthConfig::new("letmein", Some("different"), false).unwrap();
        assert!(other.verify_token(&token, now()).is_none());
    }

    #[test]
    fn secret_falls_back_to_system_password() {
        let a = AuthConfig::new("pw", None, false).unwrap();
        let b = AuthConfig::new("pw", Some("  "), false).unwrap();
        let token = a.issue_token(&CallerIdentity::new("x"), now()).unwrap();
        assert!(b.verify_token(&token, now()).is_some());
    }

    #[test]
    fn cookie_header_resolution() {
        let cfg = cfg();
        let token = cfg
            .issue_token(&CallerIdentity::new("pharm2"), now())
            .unwrap();
        let header = format!("theme=dark; auth={token}; other=1");

        let id = cfg.identity_from_cookie_header(Some(&header), now());
        assert_eq!(id.username(), "pharm2");

        let unknown = cfg.identity_from_cookie_header(None, now());
        assert_eq!(unknown.username(), "Unknown");
        assert!(!unknown.is_authenticated());
        let unknown = cfg.identity_from_cookie_header(Some("auth=nope"), now());
        assert_eq!(unknown, CallerIdentity::unknown());
    }

    #[test]
    fn cookies_carry_expected_attributes() {
        let cookie = cfg().session_cookie("tok");
        assert_eq!(
            cookie,
            "auth=tok; HttpOnly; SameSite=Lax; Path=/; Max-Age=28800"
        );
        let secure = AuthConfig::new("pw", None, true).unwrap();
        assert!(secure.session_cookie("tok").ends_with("; Secure"));
        assert!(secure.clear_cookie().contains("Max-Age=0"));
    }
}
