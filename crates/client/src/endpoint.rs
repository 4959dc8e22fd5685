//! Resolved endpoint settings for one resource type

/// Where and how requests for one resource type are sent
///
/// Built once at provider assembly and shared read-only by every instance of
/// the resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpEndpointConfig {
    base_url: String,
    root_path: String,
    api_key_header: String,
    api_key: Option<String>,
    headers: Vec<(String, String)>,
}

impl HttpEndpointConfig {
    /// Endpoint for the collection at `root_path` under `base_url`
    pub fn new(base_url: impl Into<String>, root_path: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let root_path = root_path.into();
        let root_path = format!("/{}", root_path.trim_matches('/'));
        Self {
            base_url,
            root_path,
            api_key_header: "Authorization".to_string(),
            api_key: None,
            headers: Vec::new(),
        }
    }

    /// Send `api_key` in the `header` header on every request
    pub fn with_api_key(mut self, header: impl Into<String>, api_key: Option<String>) -> Self {
        self.api_key_header = header.into();
        self.api_key = api_key;
        self
    }

    /// Attach a custom header to every request
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn api_key_header(&self) -> &str {
        &self.api_key_header
    }

    pub fn custom_headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// URL of the resource collection, target of create and list
    pub fn collection_url(&self) -> String {
        format!("{}{}", self.base_url, self.root_path)
    }

    /// URL of one resource instance; the identifier is percent-encoded
    pub fn instance_url(&self, id: &str) -> String {
        format!("{}/{}", self.collection_url(), urlencoding::encode(id))
    }

    /// Headers sent with every request: API key first, then custom headers
    pub fn request_headers(&self) -> Vec<(String, String)> {
        let mut headers = Vec::with_capacity(self.headers.len() + 2);
        if let Some(key) = &self.api_key {
            headers.push((self.api_key_header.clone(), key.clone()));
        }
        headers.push(("Accept".to_string(), "application/json".to_string()));
        headers.extend(self.headers.iter().cloned());
        headers
    }
}
