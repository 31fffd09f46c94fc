//! Token refresh and authorized-call behaviour against a mock token endpoint

use std::cell::Cell;
use std::time::{SystemTime, UNIX_EPOCH};

use klingel_auth::{AuthError, CredentialGuard, OAuthClient, SdmClient, TokenFile, TokenSet};
use mockito::{Matcher, Server, ServerGuard};
use rstest::rstest;
use tempfile::TempDir;

fn now() -> f64 {
    SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_secs_f64()
}

fn stored_tokens(generated_at: f64) -> TokenSet {
    TokenSet {
        access_token: "stale-token".to_string(),
        refresh_token: "stored-refresh".to_string(),
        expires_in: 3599,
        generated_at,
        ..Default::default()
    }
}

/// Write `tokens` to a temp token file and build a guard against `server`
fn guard_for(server: &ServerGuard, tokens: TokenSet) -> (TempDir, TokenFile, CredentialGuard) {
    let dir = tempfile::tempdir().unwrap();
    let file = TokenFile::new(dir.path().join("tokens.json"));
    file.save(&tokens).unwrap();

    let client = OAuthClient::google("client-id", "client-secret")
        .with_token_url(format!("{}/token", server.url()));
    let guard = CredentialGuard::load(client, file.clone()).unwrap();
    (dir, file, guard)
}

fn mock_token_endpoint(server: &mut ServerGuard, body: &str) -> mockito::Mock {
    server
        .mock("POST", "/token")
        .match_body(Matcher::AllOf(vec![
            Matcher::Regex("grant_type=refresh_token".to_string()),
            Matcher::Regex("refresh_token=stored-refresh".to_string()),
            Matcher::Regex("client_id=client-id".to_string()),
            Matcher::Regex("client_secret=client-secret".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body)
        .create()
}

#[test]
fn test_refresh_persists_and_keeps_refresh_token() {
    let mut server = Server::new();
    let mock = mock_token_endpoint(
        &mut server,
        r#"{"access_token": "fresh-token", "expires_in": 3599, "scope": "sdm", "token_type": "Bearer"}"#,
    );
    let (_dir, file, guard) = guard_for(&server, stored_tokens(now()));

    let token = guard.refresh().unwrap();
    assert_eq!(token, "fresh-token");

    let persisted = file.load().unwrap();
    assert_eq!(persisted.access_token, "fresh-token");
    assert_eq!(persisted.refresh_token, "stored-refresh");
    assert!(persisted.generated_at >= now() - 60.0);
    assert_eq!(guard.tokens(), persisted);

    mock.assert();
}

#[test]
fn test_refresh_adopts_rotated_refresh_token() {
    let mut server = Server::new();
    let mock = mock_token_endpoint(
        &mut server,
        r#"{"access_token": "fresh-token", "expires_in": 1800, "refresh_token": "rotated"}"#,
    );
    let (_dir, file, guard) = guard_for(&server, stored_tokens(now()));

    guard.refresh().unwrap();

    let persisted = file.load().unwrap();
    assert_eq!(persisted.refresh_token, "rotated");
    assert_eq!(persisted.expires_in, 1800);
    mock.assert();
}

#[rstest]
#[case::fresh(0.0, 0)]
#[case::about_to_expire(3560.0, 1)]
#[case::expired(7200.0, 1)]
fn test_ensure_valid_access_token(#[case] age_secs: f64, #[case] expected_refreshes: usize) {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token": "fresh-token", "expires_in": 3599}"#)
        .expect(expected_refreshes)
        .create();
    let (_dir, _file, guard) = guard_for(&server, stored_tokens(now() - age_secs));

    let token = guard.ensure_valid_access_token().unwrap();
    if expected_refreshes == 0 {
        assert_eq!(token, "stale-token");
    } else {
        assert_eq!(token, "fresh-token");
    }

    mock.assert();
}

#[test]
fn test_rejected_refresh_leaves_file_untouched() {
    let mut server = Server::new();
    let mock = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error": "invalid_grant"}"#)
        .create();
    let (_dir, file, guard) = guard_for(&server, stored_tokens(0.0));

    match guard.ensure_valid_access_token() {
        Err(AuthError::Refresh(msg)) => assert!(msg.contains("invalid_grant")),
        other => panic!("Expected AuthError::Refresh, got {:?}", other),
    }
    assert_eq!(file.load().unwrap().access_token, "stale-token");

    mock.assert();
}

#[test]
fn test_authorized_retries_once_after_401() {
    let mut server = Server::new();
    let mock = mock_token_endpoint(&mut server, r#"{"access_token": "fresh-token", "expires_in": 3599}"#);
    let (_dir, _file, guard) = guard_for(&server, stored_tokens(now()));

    let calls = Cell::new(0);
    let result: Result<&str, AuthError> = guard.authorized(|token| {
        calls.set(calls.get() + 1);
        match token {
            "stale-token" => Err(AuthError::Unauthorized("expired".to_string())),
            _ => Ok("devices"),
        }
    });

    assert_eq!(result.unwrap(), "devices");
    assert_eq!(calls.get(), 2);
    mock.assert();
}

#[test]
fn test_authorized_surfaces_second_401() {
    let mut server = Server::new();
    let mock = mock_token_endpoint(&mut server, r#"{"access_token": "fresh-token", "expires_in": 3599}"#);
    let (_dir, _file, guard) = guard_for(&server, stored_tokens(now()));

    let calls = Cell::new(0);
    let result: Result<(), AuthError> = guard.authorized(|_| {
        calls.set(calls.get() + 1);
        Err(AuthError::Unauthorized("revoked".to_string()))
    });

    assert!(matches!(result, Err(AuthError::Unauthorized(_))));
    assert_eq!(calls.get(), 2);
    mock.assert();
}

#[test]
fn test_authorized_does_not_retry_other_errors() {
    let server = Server::new();
    let (_dir, _file, guard) = guard_for(&server, stored_tokens(now()));

    let calls = Cell::new(0);
    let result: Result<(), AuthError> = guard.authorized(|_| {
        calls.set(calls.get() + 1);
        Err(AuthError::Network("connection reset".to_string()))
    });

    assert!(matches!(result, Err(AuthError::Network(_))));
    assert_eq!(calls.get(), 1);
}

#[test]
fn test_sdm_check_access_refreshes_on_401() {
    let mut server = Server::new();
    let token_mock = mock_token_endpoint(&mut server, r#"{"access_token": "fresh-token", "expires_in": 3599}"#);
    let stale = server
        .mock("GET", "/v1/enterprises/project-1/devices")
        .match_header("authorization", "Bearer stale-token")
        .with_status(401)
        .create();
    let fresh = server
        .mock("GET", "/v1/enterprises/project-1/devices")
        .match_header("authorization", "Bearer fresh-token")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"devices": [
                {"name": "enterprises/project-1/devices/AVPHwEu", "type": "sdm.devices.types.DOORBELL", "traits": {}},
                {"name": "enterprises/project-1/devices/BQxR7", "type": "sdm.devices.types.CAMERA"}
            ]}"#,
        )
        .create();
    let (_dir, _file, guard) = guard_for(&server, stored_tokens(now()));

    let sdm = SdmClient::with_base_url("project-1", server.url()).unwrap();
    let devices = sdm.check_access(&guard).unwrap();

    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].id, "AVPHwEu");
    assert_eq!(devices[0].device_type, "DOORBELL");
    assert_eq!(devices[1].device_type, "CAMERA");

    token_mock.assert();
    stale.assert();
    fresh.assert();
}

#[test]
fn test_sdm_empty_listing() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/v1/enterprises/project-1/devices")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body("{}")
        .create();

    let sdm = SdmClient::with_base_url("project-1", server.url()).unwrap();
    assert!(sdm.list_devices("any").unwrap().is_empty());
    mock.assert();
}
