//! Fixtures shared by the integration tests.

#![allow(dead_code)]

// std
use std::path::PathBuf;
// self
use github_app_auth::{
	auth::{AppId, InstallationId},
	key::AppKey,
};

pub const APP_ID: &str = "4242";
pub const INSTALLATION_ID: &str = "1337";
pub const TOKEN_PATH: &str = "/app/installations/1337/access_tokens";
pub const GITHUB_V3_JSON: &str = "application/vnd.github.v3+json";

pub fn key_path() -> PathBuf {
	PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/app-key.pem")
}

pub fn app_key() -> AppKey {
	AppKey::from_file(key_path()).expect("Fixture key should load.")
}

pub fn app_id() -> AppId {
	AppId::new(APP_ID).expect("Fixture app identifier should be valid.")
}

pub fn installation_id() -> InstallationId {
	InstallationId::new(INSTALLATION_ID).expect("Fixture installation identifier should be valid.")
}
