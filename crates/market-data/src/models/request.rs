use reqwest::Method;
use serde_json::Value;

/// One fully resolved HTTP call against a provider.
///
/// Built by the provider clients with the endpoint path and any per-call
/// extra headers (operation ids, continuation markers). The request executor
/// prepends the credential headers per attempt, so a refreshed credential
/// produces a fresh header set without mutating the caller's request.
#[derive(Clone, Debug)]
pub struct ApiRequest {
    /// HTTP method
    pub method: Method,
    /// Endpoint path, joined to the provider's base URL by the transport
    pub path: String,
    /// Query parameters
    pub query: Vec<(String, String)>,
    /// JSON body payload, if any
    pub body: Option<Value>,
    /// Request headers
    pub headers: Vec<(String, String)>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            headers: Vec::new(),
        }
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// A copy of this request with the given auth headers ahead of the
    /// per-call ones.
    pub fn with_auth_headers(&self, auth: Vec<(String, String)>) -> Self {
        let mut resolved = self.clone();
        let mut headers = auth;
        headers.extend(resolved.headers);
        resolved.headers = headers;
        resolved
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builder_accumulates_parts() {
        let request = ApiRequest::new(Method::GET, "/uapi/chart")
            .query("FID_INPUT_ISCD", "005930")
            .header("tr_id", "FHKST03010100")
            .body(json!({"mrkt_tp": "0"}));

        assert_eq!(request.method, Method::GET);
        assert_eq!(request.path, "/uapi/chart");
        assert_eq!(request.query.len(), 1);
        assert_eq!(request.headers.len(), 1);
        assert!(request.body.is_some());
    }

    #[test]
    fn test_auth_headers_come_first() {
        let request = ApiRequest::new(Method::POST, "/api/dostk/stkinfo").header("api-id", "ka10099");
        let resolved = request.with_auth_headers(vec![(
            "authorization".to_string(),
            "Bearer abc".to_string(),
        )]);

        assert_eq!(resolved.headers[0].0, "authorization");
        assert_eq!(resolved.headers[1].0, "api-id");
        // The original request is untouched.
        assert_eq!(request.headers.len(), 1);
    }
}
