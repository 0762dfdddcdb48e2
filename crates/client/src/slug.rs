//! URL-slug availability checks with a per-instance cache.

use std::collections::HashMap;

use tracing::debug;

use tavola_core::validation::validate_url_slug;

use crate::api::ApiClient;
use crate::error::ClientError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlugStatus {
    Available,
    Taken,
    /// Malformed or reserved, with the reason to show.
    Invalid(String),
}

/// Remembers server answers so retyping a slug does not hit the API again.
#[derive(Debug, Default)]
pub struct SlugAvailability {
    cache: HashMap<String, SlugStatus>,
}

impl SlugAvailability {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn cached(&self, slug: &str) -> Option<&SlugStatus> {
        self.cache.get(slug.trim())
    }

    /// Check `slug`: locally first, then against the server unless the
    /// answer is cached. Local failures are not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the availability request fails.
    pub async fn check(&mut self, api: &ApiClient, slug: &str) -> Result<SlugStatus, ClientError> {
        let slug = slug.trim();
        if let Err(e) = validate_url_slug(slug) {
            return Ok(SlugStatus::Invalid(e.to_string()));
        }
        if let Some(status) = self.cache.get(slug) {
            debug!(slug, "slug availability from cache");
            return Ok(status.clone());
        }

        let answer = api.check_url(slug).await?;
        let status = match (answer.available, answer.reason) {
            (true, _) => SlugStatus::Available,
            (false, Some(reason)) => SlugStatus::Invalid(reason),
            (false, None) => SlugStatus::Taken,
        };
        self.cache.insert(slug.to_owned(), status.clone());
        Ok(status)
    }

    /// Forget one answer (e.g. after the slug was just registered).
    pub fn invalidate(&mut self, slug: &str) {
        self.cache.remove(slug.trim());
    }

    pub fn clear(&mut self) {
        self.cache.clear();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    use httpmock::prelude::*;
    use serde_json::json;

    use crate::config::ClientConfig;

    fn client(server: &MockServer) -> ApiClient {
        ApiClient::new(&ClientConfig::new(&server.base_url()).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_answers_are_cached_per_instance() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v1/restaurants/check-url/cantina-da-nonna");
            then.status(200)
                .json_body(json!({"url_name": "cantina-da-nonna", "available": false}));
        });
        let api = client(&server);

        let mut checks = SlugAvailability::new();
        assert_eq!(
            checks.check(&api, "cantina-da-nonna").await.unwrap(),
            SlugStatus::Taken
        );
        assert_eq!(
            checks.check(&api, " cantina-da-nonna ").await.unwrap(),
            SlugStatus::Taken
        );
        assert_eq!(mock.calls(), 1);

        let mut other = SlugAvailability::new();
        other.check(&api, "cantina-da-nonna").await.unwrap();
        assert_eq!(mock.calls(), 2);

        checks.invalidate("cantina-da-nonna");
        assert!(checks.cached("cantina-da-nonna").is_none());
    }

    #[tokio::test]
    async fn test_malformed_slug_is_rejected_locally() {
        let server = MockServer::start();
        let mock = server.mock(|_when, then| {
            then.status(200);
        });

        let mut checks = SlugAvailability::new();
        let status = checks.check(&client(&server), "Não Vale").await.unwrap();

        assert!(matches!(status, SlugStatus::Invalid(_)));
        assert_eq!(mock.calls(), 0);
        assert!(checks.cached("Não Vale").is_none());
    }

    #[tokio::test]
    async fn test_available_slug() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/api/v1/restaurants/check-url/bistro-azul");
            then.status(200)
                .json_body(json!({"url_name": "bistro-azul", "available": true}));
        });

        let mut checks = SlugAvailability::new();
        assert_eq!(
            checks.check(&client(&server), "bistro-azul").await.unwrap(),
            SlugStatus::Available
        );
        assert_eq!(checks.cached("bistro-azul"), Some(&SlugStatus::Available));
    }
}
