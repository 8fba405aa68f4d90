//! HTTP client for the booking server REST API.
//!
//! This module provides the `ApiClient` struct for making requests against
//! the booking server: authentication, the canonical user record, the staff
//! roster, and the user's appointment collection.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::models::{Appointment, Staff, User};

use super::ApiError;

// ============================================================================
// Constants
// ============================================================================

/// Default base URL for the booking server (local development).
pub const DEFAULT_BASE_URL: &str = "http://localhost:3030";

/// HTTP request timeout in seconds.
/// 30s allows for slow API responses while failing fast enough for good UX.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Server responses wrap the user record in a `user` field.
#[derive(Debug, Deserialize)]
struct UserResponse {
    user: User,
}

#[derive(Debug, Deserialize)]
struct AppointmentsResponse {
    appointments: Vec<Appointment>,
}

/// Authoritative lookup of a user record by id.
///
/// `ApiClient` is the production implementation; the trait exists so the
/// identity synchronizer can be exercised without a network.
pub trait IdentitySource: Send + Sync + 'static {
    fn fetch_by_id(
        &self,
        id: i64,
        token: &str,
    ) -> impl Future<Output = Result<User, ApiError>> + Send;
}

/// API client for the booking server.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    base_url: String,
}

impl ApiClient {
    /// Create a new API client against the given base URL.
    pub fn new(base_url: impl Into<String>) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response, ApiError> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body))
        }
    }

    async fn parse_json<T: DeserializeOwned>(
        response: reqwest::Response,
        url: &str,
    ) -> Result<T, ApiError> {
        let checked = Self::check_response(response).await?;
        checked
            .json()
            .await
            .map_err(|e| ApiError::InvalidResponse(format!("bad JSON from {}: {}", url, e)))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        token: Option<&str>,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let mut request = self.client.get(&url);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        Self::parse_json(response, &url).await
    }

    async fn post_json<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.client.post(&url).json(body).send().await?;
        Self::parse_json(response, &url).await
    }

    // ===== Authentication =====

    /// Sign in with email/password, returning the user record with its token.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let body = json!({ "email": email, "password": password });
        let response: UserResponse = self.post_json("/signin", &body).await?;
        debug!(user_id = response.user.id, "signed in");
        Ok(response.user)
    }

    /// Create a new account, returning the signed-in user record.
    pub async fn sign_up(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let body = json!({ "email": email, "password": password });
        let response: UserResponse = self.post_json("/user", &body).await?;
        debug!(user_id = response.user.id, "account created");
        Ok(response.user)
    }

    // ===== Data Fetching Methods =====

    /// Fetch the canonical user record for an id.
    /// Used by the identity synchronizer's reconciliation fetch.
    pub async fn fetch_user_by_id(&self, id: i64, token: &str) -> Result<User, ApiError> {
        let response: UserResponse = self
            .get_json(&format!("/user/{}", id), Some(token))
            .await?;
        Ok(response.user)
    }

    /// Fetch the full staff roster.
    pub async fn fetch_staff(&self) -> Result<Vec<Staff>, ApiError> {
        self.get_json("/staff", None).await
    }

    /// Fetch the appointments reserved by a user.
    pub async fn fetch_user_appointments(
        &self,
        user_id: i64,
        token: &str,
    ) -> Result<Vec<Appointment>, ApiError> {
        let response: AppointmentsResponse = self
            .get_json(&format!("/user/{}/appointments", user_id), Some(token))
            .await?;
        Ok(response.appointments)
    }

    // ===== Mutations =====

    /// Write a new owner onto a remote appointment via JSON Patch.
    ///
    /// Uses `add` for an open slot and `replace` when an owner is already
    /// set, matching the server's patch validation.
    pub async fn patch_appointment_owner(
        &self,
        appointment: &Appointment,
        user_id: i64,
    ) -> Result<(), ApiError> {
        let op = if appointment.user_id.is_some() {
            "replace"
        } else {
            "add"
        };
        let body = json!({
            "data": [{ "op": op, "path": "/userId", "value": user_id }]
        });

        let url = format!("{}/appointment/{}", self.base_url, appointment.id);
        let response = self.client.patch(&url).json(&body).send().await?;
        Self::check_response(response).await?;
        debug!(appointment_id = appointment.id, user_id, "appointment owner updated");
        Ok(())
    }
}

impl IdentitySource for ApiClient {
    fn fetch_by_id(
        &self,
        id: i64,
        token: &str,
    ) -> impl Future<Output = Result<User, ApiError>> + Send {
        self.fetch_user_by_id(id, token)
    }
}

impl<T: IdentitySource> IdentitySource for std::sync::Arc<T> {
    fn fetch_by_id(
        &self,
        id: i64,
        token: &str,
    ) -> impl Future<Output = Result<User, ApiError>> + Send {
        (**self).fetch_by_id(id, token)
    }
}
