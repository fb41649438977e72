//! HTTP client for end-to-end tests
//!
//! Wraps reqwest with one method per route. When API routes or request
//! formats change, update only this file.

#![allow(dead_code)]

use super::constants::*;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api{}", self.base_url, path)
    }

    async fn post_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .expect("POST request failed")
    }

    async fn put_json(&self, path: &str, body: &Value) -> Response {
        self.client
            .put(self.url(path))
            .json(body)
            .send()
            .await
            .expect("PUT request failed")
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("GET request failed")
    }

    // ========================================================================
    // Server
    // ========================================================================

    pub async fn get_stats(&self) -> Response {
        self.client
            .get(format!("{}/", self.base_url))
            .send()
            .await
            .expect("GET request failed")
    }

    // ========================================================================
    // Patients
    // ========================================================================

    pub async fn save_patient(&self, body: &Value) -> Response {
        self.post_json("/patients", body).await
    }

    pub async fn update_patient(&self, id: &str, body: &Value) -> Response {
        self.put_json(&format!("/patients/{}", id), body).await
    }

    pub async fn get_patient(&self, id: &str) -> Response {
        self.get(&format!("/patients/{}", id)).await
    }

    pub async fn delete_patient(&self, id: &str) -> Response {
        self.client
            .delete(self.url(&format!("/patients/{}", id)))
            .send()
            .await
            .expect("DELETE request failed")
    }

    pub async fn search_patients(&self, keyword: &str) -> Response {
        self.client
            .get(self.url("/patients"))
            .query(&[("keyword", keyword)])
            .send()
            .await
            .expect("GET request failed")
    }

    pub async fn search_patients_by_name(&self, name: &str) -> Response {
        self.client
            .get(self.url("/patients/search"))
            .query(&[("pname", name)])
            .send()
            .await
            .expect("GET request failed")
    }

    /// Registers the standard fixture patient and returns its `pcode`.
    pub async fn register_patient(&self) -> i64 {
        self.register_patient_named(PATIENT_NAME).await
    }

    pub async fn register_patient_named(&self, name: &str) -> i64 {
        let response = self
            .save_patient(&json!({
                "pname": name,
                "pbirth": PATIENT_BIRTH,
                "pidnum": PATIENT_ID_PREFIX,
                "pidnum2": PATIENT_ID_SUFFIX,
                "sex": "M",
            }))
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let body: Value = response.json().await.expect("Invalid JSON");
        body["patient"]["pcode"]
            .as_i64()
            .expect("Response has no pcode")
    }

    // ========================================================================
    // Family Cards
    // ========================================================================

    pub async fn save_card(&self, body: &Value) -> Response {
        self.post_json("/cards", body).await
    }

    pub async fn update_card(&self, family_code: &str, body: &Value) -> Response {
        self.put_json(&format!("/cards/{}", family_code), body).await
    }

    pub async fn get_card(&self, family_code: &str) -> Response {
        self.get(&format!("/cards/{}", family_code)).await
    }

    // ========================================================================
    // Vital Signs
    // ========================================================================

    pub async fn create_vital(&self, patient_id: &str, body: &Value) -> Response {
        self.post_json(&format!("/vitals/{}", patient_id), body).await
    }

    pub async fn update_vital(&self, patient_id: &str, body: &Value) -> Response {
        self.put_json(&format!("/vitals/{}", patient_id), body).await
    }

    pub async fn latest_vital(&self, patient_id: &str) -> Response {
        self.get(&format!("/vitals/{}", patient_id)).await
    }

    // ========================================================================
    // Payments
    // ========================================================================

    pub async fn save_payment(&self, body: &Value) -> Response {
        self.post_json("/payments", body).await
    }

    pub async fn payment_history(&self, patient_id: &str) -> Response {
        self.get(&format!("/payments/history/{}", patient_id)).await
    }
}
