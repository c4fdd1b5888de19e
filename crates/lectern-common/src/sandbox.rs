use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use url::Url;

use crate::error::LecternError;

/// Default timeout applied to every outbound request. External calls must be
/// bounded; retries are the caller's policy.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// An egress-capped HTTP client that only allows requests to approved hosts.
/// All outbound traffic in the workspace goes through this client.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a client with the default allowlist: the literature index,
    /// its PDF host, and the supported LLM API endpoints.
    pub fn new() -> Result<Self, LecternError> {
        let mut allowlist = HashSet::new();
        let domains = [
            "export.arxiv.org",                  // arXiv Atom API
            "arxiv.org",                         // arXiv PDF links
            "generativelanguage.googleapis.com", // Gemini
            "api.openai.com",                    // OpenAI-compatible
            "localhost",                         // local inference servers
            "127.0.0.1",
        ];
        for d in domains {
            allowlist.insert(d.to_string());
        }

        let client = ClientBuilder::new()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("Lectern/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LecternError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Whether a URL is permitted under the current egress policy.
    /// Subdomains of an allowed host are allowed.
    pub fn is_allowed(&self, url: &str) -> bool {
        if let Ok(parsed) = Url::parse(url) {
            if let Some(host) = parsed.host_str() {
                for allowed in &self.allowlist {
                    if host == allowed || host.ends_with(&format!(".{allowed}")) {
                        return true;
                    }
                }
            }
        }
        false
    }

    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, LecternError> {
        self.check(url)?;
        Ok(self.client.get(url))
    }

    pub fn post(&self, url: &str) -> Result<reqwest::RequestBuilder, LecternError> {
        self.check(url)?;
        Ok(self.client.post(url))
    }

    pub fn request(
        &self,
        method: reqwest::Method,
        url: &str,
    ) -> Result<reqwest::RequestBuilder, LecternError> {
        self.check(url)?;
        Ok(self.client.request(method, url))
    }

    fn check(&self, url: &str) -> Result<(), LecternError> {
        if !self.is_allowed(url) {
            return Err(LecternError::Security(format!(
                "egress blocked: host not in allowlist for URL {url}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arxiv_hosts_allowed() {
        let c = SandboxClient::new().unwrap();
        assert!(c.is_allowed("http://export.arxiv.org/api/query?search_query=all:x"));
        assert!(c.is_allowed("https://arxiv.org/pdf/2401.00001v1"));
    }

    #[test]
    fn test_unknown_host_blocked() {
        let c = SandboxClient::new().unwrap();
        assert!(!c.is_allowed("https://example.com/paper.pdf"));
        assert!(c.get("https://example.com/paper.pdf").is_err());
    }

    #[test]
    fn test_allow_domain_extends_policy() {
        let mut c = SandboxClient::new().unwrap();
        assert!(!c.is_allowed("https://mirror.example.org/x.pdf"));
        c.allow_domain("mirror.example.org");
        assert!(c.is_allowed("https://mirror.example.org/x.pdf"));
    }

    #[test]
    fn test_subdomain_of_allowed_host() {
        let c = SandboxClient::new().unwrap();
        assert!(c.is_allowed("https://static.arxiv.org/x.pdf"));
    }
}
