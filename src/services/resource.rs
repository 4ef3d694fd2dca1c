//! Organization-scoped CRUD service.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::{MinimaxError, MinimaxResult};
use crate::http::{HttpClient, RequestOptions};
use crate::services::encode_segment;
use crate::types::{ListParams, PagedResult};

/// CRUD operations on `api/orgs/{orgId}/{segment}`.
pub struct ResourceService<'a> {
    http: &'a HttpClient,
    segment: &'static str,
    options: RequestOptions,
}

impl<'a> ResourceService<'a> {
    /// Creates a service for the given path segment.
    pub fn new(http: &'a HttpClient, segment: &'static str) -> Self {
        Self {
            http,
            segment,
            options: RequestOptions::default(),
        }
    }

    /// Base options applied to every call (e.g. an organization override).
    pub fn with_options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    /// Scope calls to `organization_id` instead of the session selection.
    pub fn in_organization(mut self, organization_id: impl Into<String>) -> Self {
        self.options.organization_id = Some(organization_id.into());
        self
    }

    pub fn segment(&self) -> &str {
        self.segment
    }

    fn collection_path(&self) -> MinimaxResult<String> {
        let organization_id = self.http.resolve_organization(&self.options).ok_or_else(|| {
            MinimaxError::configuration(format!(
                "no organization selected for {}",
                self.segment
            ))
        })?;
        Ok(format!(
            "api/orgs/{}/{}",
            encode_segment(&organization_id),
            self.segment
        ))
    }

    fn item_path(&self, id: &str) -> MinimaxResult<String> {
        Ok(format!("{}/{}", self.collection_path()?, encode_segment(id)))
    }

    /// Lists one page of resources.
    pub async fn list<T: DeserializeOwned>(
        &self,
        params: &ListParams,
    ) -> MinimaxResult<PagedResult<T>> {
        let mut options = self.options.clone();
        options.query.extend(params.to_query());
        self.http.get(&self.collection_path()?, options).await
    }

    /// Gets a single resource.
    pub async fn get<T: DeserializeOwned>(&self, id: &str) -> MinimaxResult<T> {
        self.http.get(&self.item_path(id)?, self.options.clone()).await
    }

    /// Creates a resource.
    pub async fn create<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        body: &B,
    ) -> MinimaxResult<T> {
        self.http
            .post(&self.collection_path()?, body, self.options.clone())
            .await
    }

    /// Updates a resource, carrying the RowVersion last read on `current`.
    pub async fn update<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        id: &str,
        current: &Value,
        patch: &B,
    ) -> MinimaxResult<T> {
        self.http
            .update_with_concurrency(&self.item_path(id)?, current, patch, self.options.clone())
            .await
    }

    /// Deletes a resource.
    pub async fn delete(&self, id: &str, row_version: Option<&str>) -> MinimaxResult<()> {
        let mut options = self.options.clone();
        if let Some(row_version) = row_version {
            options = options.query("rowVersion", row_version);
        }
        self.http.delete(&self.item_path(id)?, options).await
    }
}
