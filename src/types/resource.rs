//! Resource Types
//!
//! Wire shapes shared by the resource services. Domain entities are passed
//! through as JSON (or a caller-supplied serde type); only the fields the
//! client itself reads are modelled here.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Field carrying the optimistic concurrency token.
pub const ROW_VERSION_FIELD: &str = "RowVersion";

/// One page of a list response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PagedResult<T> {
    #[serde(default = "Vec::new")]
    pub rows: Vec<T>,
    #[serde(default)]
    pub total_rows: u64,
    #[serde(default)]
    pub current_page_number: u32,
    #[serde(default)]
    pub page_size: u32,
}

impl<T> PagedResult<T> {
    /// Whether more rows exist after this page.
    pub fn has_more(&self) -> bool {
        let seen = u64::from(self.current_page_number.max(1)) * u64::from(self.page_size);
        self.page_size > 0 && seen < self.total_rows
    }
}

/// Paging and search parameters for list calls.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListParams {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_string: Option<String>,
}

impl ListParams {
    pub fn page(current_page: u32, page_size: u32) -> Self {
        Self {
            current_page: Some(current_page),
            page_size: Some(page_size),
            search_string: None,
        }
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search_string = Some(search.into());
        self
    }

    /// Query pairs in wire order.
    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut query = Vec::new();
        if let Some(page) = self.current_page {
            query.push(("CurrentPage".to_string(), page.to_string()));
        }
        if let Some(size) = self.page_size {
            query.push(("PageSize".to_string(), size.to_string()));
        }
        if let Some(search) = &self.search_string {
            query.push(("SearchString".to_string(), search.clone()));
        }
        query
    }
}

/// Reference to an organization as embedded in other payloads.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRef {
    #[serde(rename = "ID")]
    pub id: i64,
    #[serde(rename = "Name", default)]
    pub name: String,
}

/// Organization the current user can access.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserOrganization {
    pub organisation: OrganizationRef,
    #[serde(default)]
    pub api_access: bool,
}

/// RowVersion of a JSON resource, if present and a string.
pub fn row_version_of(resource: &Value) -> Option<&str> {
    resource.get(ROW_VERSION_FIELD).and_then(Value::as_str)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_paged_result_parsing() {
        let page: PagedResult<Value> = serde_json::from_value(json!({
            "Rows": [{"Id": 1}, {"Id": 2}],
            "TotalRows": 5,
            "CurrentPageNumber": 1,
            "PageSize": 2
        }))
        .unwrap();

        assert_eq!(page.rows.len(), 2);
        assert_eq!(page.total_rows, 5);
        assert!(page.has_more());
    }

    #[test]
    fn test_last_page() {
        let page: PagedResult<Value> = serde_json::from_value(json!({
            "Rows": [{"Id": 5}],
            "TotalRows": 5,
            "CurrentPageNumber": 3,
            "PageSize": 2
        }))
        .unwrap();
        assert!(!page.has_more());
    }

    #[test]
    fn test_list_params_query() {
        let params = ListParams::page(2, 50).with_search("acme");
        assert_eq!(
            serde_urlencoded::to_string(&params).unwrap(),
            "CurrentPage=2&PageSize=50&SearchString=acme"
        );
        assert_eq!(serde_urlencoded::to_string(ListParams::default()).unwrap(), "");
        assert_eq!(
            params.to_query(),
            vec![
                ("CurrentPage".to_string(), "2".to_string()),
                ("PageSize".to_string(), "50".to_string()),
                ("SearchString".to_string(), "acme".to_string()),
            ]
        );
    }

    #[test]
    fn test_user_organization_parsing() {
        let org: UserOrganization = serde_json::from_value(json!({
            "Organisation": {"ID": 42, "Name": "Acme d.o.o."},
            "ApiAccess": true
        }))
        .unwrap();
        assert_eq!(org.organisation.id, 42);
        assert!(org.api_access);
    }

    #[test]
    fn test_row_version_of() {
        assert_eq!(row_version_of(&json!({"RowVersion": "abc"})), Some("abc"));
        assert_eq!(row_version_of(&json!({"RowVersion": null})), None);
    }
}
