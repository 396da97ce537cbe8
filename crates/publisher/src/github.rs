//! [`GitHost`] backed by the GitHub REST API via octocrab.

use async_trait::async_trait;
use octocrab::Octocrab;

use crate::config::GitHubConfig;
use crate::host::{GitHost, HostError, NewPullRequest, PullRequestRef};

/// GitHub API client scoped to one repository.
#[derive(Debug, Clone)]
pub struct GitHubHost {
    octocrab: Octocrab,
    owner: String,
    repo: String,
}

impl GitHubHost {
    pub fn new(octocrab: Octocrab, owner: String, repo: String) -> Self {
        Self {
            octocrab,
            owner,
            repo,
        }
    }

    /// Build an authenticated client from configuration.
    pub fn from_config(config: &GitHubConfig) -> Result<Self, HostError> {
        let mut builder = Octocrab::builder().personal_token(config.token.clone());
        if let Some(api_url) = &config.api_url {
            builder = builder
                .base_uri(api_url.as_str())
                .map_err(|e| HostError::Api(format!("Invalid GITHUB_API_URL: {e}")))?;
        }
        let octocrab = builder
            .build()
            .map_err(|e| HostError::Api(format!("Failed to build GitHub client: {e}")))?;

        Ok(Self::new(
            octocrab,
            config.owner.clone(),
            config.repo.clone(),
        ))
    }
}

#[async_trait]
impl GitHost for GitHubHost {
    async fn branch_exists(&self, branch: &str) -> Result<bool, HostError> {
        let route = format!("/repos/{}/{}/branches/{branch}", self.owner, self.repo);
        match self
            .octocrab
            .get::<serde_json::Value, _, ()>(route, None::<&()>)
            .await
        {
            Ok(_) => Ok(true),
            Err(octocrab::Error::GitHub { source, .. })
                if source.status_code.as_u16() == 404 =>
            {
                Ok(false)
            }
            Err(e) => Err(classify(e)),
        }
    }

    async fn create_pull_request(
        &self,
        pr: &NewPullRequest,
    ) -> Result<PullRequestRef, HostError> {
        let created = self
            .octocrab
            .pulls(&self.owner, &self.repo)
            .create(&pr.title, &pr.head, &pr.base)
            .body(&pr.body)
            .send()
            .await
            .map_err(classify)?;

        let html_url = created
            .html_url
            .map(|u| u.to_string())
            .ok_or_else(|| HostError::Api("Pull request response has no html_url".into()))?;

        tracing::info!(
            number = created.number,
            url = %html_url,
            head = %pr.head,
            base = %pr.base,
            "Opened pull request"
        );

        Ok(PullRequestRef {
            number: created.number,
            html_url,
        })
    }
}

/// Map an octocrab error onto the retry classification.
fn classify(err: octocrab::Error) -> HostError {
    match &err {
        octocrab::Error::GitHub { source, .. } => {
            let status = source.status_code.as_u16();
            let message = source.message.clone();
            let rate_limited = message.to_lowercase().contains("rate limit");
            match status {
                429 => HostError::Transient(message),
                403 if rate_limited => HostError::Transient(message),
                401 | 403 => HostError::Unauthorized(message),
                404 => HostError::NotFound(message),
                500..=599 => HostError::Transient(format!("{status}: {message}")),
                _ => HostError::Api(format!("{status}: {message}")),
            }
        }
        octocrab::Error::Hyper { .. } | octocrab::Error::Service { .. } => {
            HostError::Transient(err.to_string())
        }
        _ => HostError::Api(err.to_string()),
    }
}
