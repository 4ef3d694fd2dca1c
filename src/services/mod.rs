//! Resource services.
//!
//! Thin wrappers over the request pipeline. Every organization-scoped service
//! resolves the organization per call from its options or the session.

mod organizations;
mod resource;

pub use organizations::OrganizationsService;
pub use resource::ResourceService;

/// Path segment of customers.
pub const CUSTOMERS: &str = "customers";
/// Path segment of issued invoices.
pub const ISSUED_INVOICES: &str = "issuedinvoices";
/// Path segment of journals.
pub const JOURNALS: &str = "journals";
/// Path segment of employees.
pub const EMPLOYEES: &str = "employees";

/// Percent-encode one path segment so ids cannot alter the request path.
pub(crate) fn encode_segment(segment: &str) -> String {
    // dot segments would be collapsed by URL normalization
    if segment == "." || segment == ".." {
        return segment.replace('.', "%2E");
    }
    // form encoding escapes '+' itself, so a remaining '+' was a space
    url::form_urlencoded::byte_serialize(segment.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}
