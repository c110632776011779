//! Finding a user's committer name and email from their hosting account.
//!
//! Used only to pre-fill prompts; every failure degrades to an empty result.

use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::process::Command;
use tracing::debug;

const GITHUB_API: &str = "https://api.github.com";
/// Repositories inspected, most recently pushed first
const MAX_REPOS: usize = 10;

/// Name and email seen on a user's commits; either may be unknown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Committer {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Committer {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}

pub trait CommitterLookup {
    /// Committer identity from the user's most recent authored commit
    fn find_committer(&self, username: &str) -> Result<Committer>;
}

/// Queries the public GitHub REST API through `curl`
#[derive(Debug, Default)]
pub struct GitHubLookup;

#[derive(Deserialize)]
struct Repo {
    full_name: String,
}

#[derive(Deserialize)]
struct CommitEntry {
    commit: CommitDetail,
}

#[derive(Deserialize)]
struct CommitDetail {
    author: Option<Author>,
}

#[derive(Deserialize)]
struct Author {
    name: Option<String>,
    email: Option<String>,
}

impl GitHubLookup {
    fn get(&self, url: &str) -> Result<String> {
        debug!(url, "querying GitHub");
        let output = Command::new("curl")
            .args([
                "-sSf",
                "-H",
                "Accept: application/vnd.github+json",
                "-H",
                "User-Agent: gitprof",
                url,
            ])
            .output()
            .context("Failed to run curl. Make sure curl is installed.")?;

        if !output.status.success() {
            bail!(
                "GitHub request failed: {}",
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Committer from a `/repos/{repo}/commits` response
fn committer_from_commits(body: &str) -> Result<Committer> {
    let commits: Vec<CommitEntry> =
        serde_json::from_str(body).context("Unexpected commits response")?;

    Ok(commits
        .into_iter()
        .find_map(|c| c.commit.author)
        .map(|a| Committer {
            name: a.name.filter(|n| !n.is_empty()),
            email: a.email.filter(|e| !e.is_empty()),
        })
        .unwrap_or_default())
}

impl CommitterLookup for GitHubLookup {
    fn find_committer(&self, username: &str) -> Result<Committer> {
        let repos_body = self.get(&format!(
            "{}/users/{}/repos?sort=pushed&per_page={}",
            GITHUB_API, username, MAX_REPOS
        ))?;
        let repos: Vec<Repo> =
            serde_json::from_str(&repos_body).context("Unexpected repositories response")?;

        let mut found = Committer::default();
        for repo in repos {
            let body = match self.get(&format!(
                "{}/repos/{}/commits?author={}&per_page=1",
                GITHUB_API, repo.full_name, username
            )) {
                Ok(body) => body,
                Err(e) => {
                    debug!(repo = %repo.full_name, error = %e, "skipping repository");
                    continue;
                }
            };

            let committer = committer_from_commits(&body).unwrap_or_default();
            if committer.name.is_some() && committer.email.is_some() {
                return Ok(committer);
            }
            if found.is_empty() {
                found = committer;
            }
        }
        Ok(found)
    }
}
