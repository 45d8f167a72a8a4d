//! HTTP archive retrieval.

use std::time::Duration;

use async_trait::async_trait;
use url::Url;

use super::ArchiveStream;
use crate::plugins::{PluginError, PluginRef};
use crate::{Error, Result};

pub const DEFAULT_HOST: &str = "https://github.com";
pub const DEFAULT_BRANCH: &str = "master";

const USER_AGENT: &str = concat!("plugsync/", env!("CARGO_PKG_VERSION"));
const MAX_REDIRECTS: usize = 10;

/// Retrieves the source archive of a plugin.
#[async_trait]
pub trait ArchiveFetcher: Send + Sync {
    /// Returns the archive body as soon as the response headers are in.
    async fn fetch(&self, plugin: &PluginRef) -> std::result::Result<ArchiveStream, PluginError>;

    /// Where `plugin` would be fetched from, for reporting.
    fn locate(&self, plugin: &PluginRef) -> std::result::Result<String, PluginError>;
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub host: String,
    pub default_branch: String,
    pub connect_timeout: Option<Duration>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.into(),
            default_branch: DEFAULT_BRANCH.into(),
            connect_timeout: None,
        }
    }
}

/// Fetches `https://<host>/<owner>/<repo>/archive/refs/heads/<branch>.zip`.
#[derive(Debug, Clone)]
pub struct HttpArchiveFetcher {
    client: reqwest::Client,
    host: Url,
    default_branch: String,
}

impl HttpArchiveFetcher {
    pub fn new(options: FetchOptions) -> Result<Self> {
        let host = Url::parse(&options.host)
            .map_err(|e| Error::Config(format!("invalid host '{}': {}", options.host, e)))?;
        if host.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "invalid host '{}': not a base URL",
                options.host
            )));
        }
        if options.default_branch.trim().is_empty() {
            return Err(Error::Config("default branch must not be empty".into()));
        }

        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS));
        if let Some(timeout) = options.connect_timeout {
            builder = builder.connect_timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
            host,
            default_branch: options.default_branch,
        })
    }

    pub fn default_branch(&self) -> &str {
        &self.default_branch
    }

    pub fn archive_url(&self, plugin: &PluginRef) -> std::result::Result<Url, PluginError> {
        let (owner, repo) = plugin.owner_repo()?;
        let branch = plugin.branch_or(&self.default_branch);

        let invalid = |reason: &str| PluginError::InvalidSource {
            source_locator: plugin.source.clone(),
            reason: reason.to_string(),
        };
        let branch_segments: Vec<&str> = branch.split('/').collect();
        if branch_segments
            .iter()
            .any(|s| s.is_empty() || *s == "." || *s == "..")
        {
            return Err(invalid("branch name is not a valid ref"));
        }

        let mut url = self.host.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| invalid("host is not a base URL"))?;
            segments
                .pop_if_empty()
                .extend([owner, repo, "archive", "refs", "heads"]);
            if let Some((last, parents)) = branch_segments.split_last() {
                segments.extend(parents);
                segments.push(&format!("{last}.zip"));
            }
        }
        Ok(url)
    }
}

#[async_trait]
impl ArchiveFetcher for HttpArchiveFetcher {
    async fn fetch(&self, plugin: &PluginRef) -> std::result::Result<ArchiveStream, PluginError> {
        let url = self.archive_url(plugin)?;
        tracing::debug!(plugin = %plugin.name, %url, "Requesting archive");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(PluginError::Network)?;

        let status = response.status();
        if !status.is_success() {
            return Err(PluginError::Transfer {
                status: status.as_u16(),
            });
        }

        tracing::debug!(
            plugin = %plugin.name,
            content_length = ?response.content_length(),
            "Archive response received"
        );
        Ok(ArchiveStream::from_response(response))
    }

    fn locate(&self, plugin: &PluginRef) -> std::result::Result<String, PluginError> {
        self.archive_url(plugin).map(String::from)
    }
}
