use crate::config::SourceConfig;
use eyre::{Error, WrapErr, bail};
use reqwest::Client;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Where the results page comes from.
#[derive(Clone, Debug, PartialEq)]
pub enum Source {
    Centre(String),
    Url(String),
    File(PathBuf),
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Source::Centre(centre) => write!(f, "centre {centre}"),
            Source::Url(url) => f.write_str(url),
            Source::File(path) => write!(f, "{}", path.display()),
        }
    }
}

pub fn centre_url(template: &str, centre: &str) -> Result<String, Error> {
    if centre.is_empty() || !centre.chars().all(|c| c.is_ascii_alphanumeric()) {
        bail!("invalid centre number {centre:?}");
    }
    Ok(template.replace("{centre}", centre))
}

pub struct Loader {
    client: Client,
    url_template: String,
}

impl Loader {
    pub fn new(config: &SourceConfig) -> Result<Self, Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .wrap_err("cannot build HTTP client")?;
        Ok(Self {
            client,
            url_template: config.url_template.clone(),
        })
    }

    pub async fn load(&self, source: &Source) -> Result<String, Error> {
        match source {
            Source::Centre(centre) => {
                let url = centre_url(&self.url_template, centre)?;
                self.fetch(&url).await
            }
            Source::Url(url) => self.fetch(url).await,
            Source::File(path) => Self::read(path).await,
        }
    }

    async fn fetch(&self, url: &str) -> Result<String, Error> {
        info!(%url, "fetching results page");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .wrap_err_with(|| format!("cannot fetch results page {url}"))?;
        let html = response
            .text()
            .await
            .wrap_err_with(|| format!("cannot read results page {url}"))?;
        debug!(bytes = html.len(), "results page received");
        Ok(html)
    }

    async fn read(path: &Path) -> Result<String, Error> {
        info!(path = %path.display(), "reading results page");
        tokio::fs::read_to_string(path)
            .await
            .wrap_err_with(|| format!("cannot read results page {}", path.display()))
    }
}
