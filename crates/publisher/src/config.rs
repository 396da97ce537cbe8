use std::time::Duration;

use crate::wait::WaitPolicy;

/// Default base branch pull requests target.
const DEFAULT_BASE_BRANCH: &str = "main";
/// Default prefix for generated branch names.
const DEFAULT_BRANCH_PREFIX: &str = "inkwell";
/// Default commit author name.
const DEFAULT_AUTHOR_NAME: &str = "Inkwell";
/// Default commit author email.
const DEFAULT_AUTHOR_EMAIL: &str = "inkwell@users.noreply.github.com";
/// Body of every pull request the pipeline opens.
const DEFAULT_PULL_REQUEST_BODY: &str =
    "This pull request was opened automatically by Inkwell.";

/// Identity used for commits made by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitAuthor {
    pub name: String,
    pub email: String,
}

/// Configuration for the publishing pipeline.
#[derive(Debug, Clone)]
pub struct PublisherConfig {
    /// Clone/push URL of the site repository.
    pub remote_url: String,
    /// Token used as HTTPS credentials for clone and push (`None` for
    /// remotes that need no auth, such as local paths).
    pub git_token: Option<String>,
    /// Branch new post branches are created from and PRs target.
    pub base_branch: String,
    /// Prefix of generated branch names.
    pub branch_prefix: String,
    pub commit_author: CommitAuthor,
    /// Author written into the post's `meta`.
    pub post_author: String,
    pub pull_request_body: String,
    /// Branch visibility polling policy.
    pub wait: WaitPolicy,
}

impl PublisherConfig {
    /// Load pipeline configuration from environment variables.
    ///
    /// | Env Var                | Default                                   |
    /// |------------------------|-------------------------------------------|
    /// | `GIT_REMOTE_URL`       | `https://github.com/{owner}/{repo}.git`   |
    /// | `GITHUB_TOKEN`         | used for git credentials when set         |
    /// | `GITHUB_BASE_BRANCH`   | `main`                                    |
    /// | `BRANCH_PREFIX`        | `inkwell`                                 |
    /// | `GIT_AUTHOR_NAME`      | `Inkwell`                                 |
    /// | `GIT_AUTHOR_EMAIL`     | `inkwell@users.noreply.github.com`        |
    /// | `POST_AUTHOR`          | value of `GIT_AUTHOR_NAME`                |
    /// | `PULL_REQUEST_BODY`    | fixed attribution sentence                |
    /// | `BRANCH_WAIT_ATTEMPTS` | `5`                                       |
    /// | `BRANCH_WAIT_BASE_MS`  | `1000`                                    |
    /// | `BRANCH_WAIT_MAX_MS`   | `16000`                                   |
    ///
    /// # Panics
    ///
    /// Panics if numeric values do not parse.
    pub fn from_env(github: &GitHubConfig) -> Self {
        let remote_url = std::env::var("GIT_REMOTE_URL")
            .unwrap_or_else(|_| format!("https://github.com/{}/{}.git", github.owner, github.repo));

        let author_name =
            std::env::var("GIT_AUTHOR_NAME").unwrap_or_else(|_| DEFAULT_AUTHOR_NAME.into());
        let author_email =
            std::env::var("GIT_AUTHOR_EMAIL").unwrap_or_else(|_| DEFAULT_AUTHOR_EMAIL.into());
        let post_author = std::env::var("POST_AUTHOR").unwrap_or_else(|_| author_name.clone());

        let defaults = WaitPolicy::default();
        let wait = WaitPolicy {
            max_attempts: env_or("BRANCH_WAIT_ATTEMPTS", defaults.max_attempts),
            base_delay: Duration::from_millis(env_or(
                "BRANCH_WAIT_BASE_MS",
                defaults.base_delay.as_millis() as u64,
            )),
            max_delay: Duration::from_millis(env_or(
                "BRANCH_WAIT_MAX_MS",
                defaults.max_delay.as_millis() as u64,
            )),
        };

        Self {
            remote_url,
            git_token: Some(github.token.clone()),
            base_branch: std::env::var("GITHUB_BASE_BRANCH")
                .unwrap_or_else(|_| DEFAULT_BASE_BRANCH.into()),
            branch_prefix: std::env::var("BRANCH_PREFIX")
                .unwrap_or_else(|_| DEFAULT_BRANCH_PREFIX.into()),
            commit_author: CommitAuthor {
                name: author_name,
                email: author_email,
            },
            post_author,
            pull_request_body: std::env::var("PULL_REQUEST_BODY")
                .unwrap_or_else(|_| DEFAULT_PULL_REQUEST_BODY.into()),
            wait,
        }
    }

    /// A configuration for `remote_url` with every other field defaulted.
    pub fn for_remote(remote_url: impl Into<String>) -> Self {
        Self {
            remote_url: remote_url.into(),
            git_token: None,
            base_branch: DEFAULT_BASE_BRANCH.into(),
            branch_prefix: DEFAULT_BRANCH_PREFIX.into(),
            commit_author: CommitAuthor {
                name: DEFAULT_AUTHOR_NAME.into(),
                email: DEFAULT_AUTHOR_EMAIL.into(),
            },
            post_author: DEFAULT_AUTHOR_NAME.into(),
            pull_request_body: DEFAULT_PULL_REQUEST_BODY.into(),
            wait: WaitPolicy::default(),
        }
    }
}

/// Credentials and coordinates for the Git hosting API.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    /// Override for GitHub Enterprise or tests; `None` uses api.github.com.
    pub api_url: Option<String>,
}

impl GitHubConfig {
    /// Load GitHub configuration from environment variables.
    ///
    /// | Env Var          | Required |
    /// |------------------|----------|
    /// | `GITHUB_TOKEN`   | **yes**  |
    /// | `GITHUB_OWNER`   | **yes**  |
    /// | `GITHUB_REPO`    | **yes**  |
    /// | `GITHUB_API_URL` | no       |
    ///
    /// # Panics
    ///
    /// Panics if a required variable is missing or empty.
    pub fn from_env() -> Self {
        Self {
            token: required("GITHUB_TOKEN"),
            owner: required("GITHUB_OWNER"),
            repo: required("GITHUB_REPO"),
            api_url: std::env::var("GITHUB_API_URL").ok().filter(|v| !v.is_empty()),
        }
    }
}

fn required(name: &str) -> String {
    let value = std::env::var(name).unwrap_or_else(|_| panic!("{name} must be set"));
    assert!(!value.is_empty(), "{name} must not be empty");
    value
}

fn env_or<T>(name: &str, default: T) -> T
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|e| panic!("{name} must be a valid number: {e}")),
        Err(_) => default,
    }
}
