use serde::{Deserialize, Serialize};

/// One captured browser cookie. Interpretation is delegated entirely to the
/// browser runtime at injection time; this core treats the value as opaque.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<String>,
    pub expires_at: Option<chrono::DateTime<chrono::Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct CookieSet {
    pub cookies: Vec<Cookie>,
}
