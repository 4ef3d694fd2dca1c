//! Organizations service.

use serde_json::Value;

use crate::error::MinimaxResult;
use crate::http::{HttpClient, RequestOptions};
use crate::services::encode_segment;
use crate::types::{ListParams, PagedResult, UserOrganization};

/// Organizations visible to the logged-in user.
pub struct OrganizationsService<'a> {
    http: &'a HttpClient,
}

impl<'a> OrganizationsService<'a> {
    pub fn new(http: &'a HttpClient) -> Self {
        Self { http }
    }

    /// Lists organizations the current user can access.
    pub async fn list(&self, params: &ListParams) -> MinimaxResult<PagedResult<UserOrganization>> {
        let mut options = RequestOptions::new();
        options.query.extend(params.to_query());
        self.http.get("api/currentuser/orgs", options).await
    }

    /// Gets organization details.
    pub async fn get(&self, organization_id: &str) -> MinimaxResult<Value> {
        let path = format!("api/orgs/{}", encode_segment(organization_id));
        self.http
            .get(&path, RequestOptions::new().organization(organization_id))
            .await
    }
}
