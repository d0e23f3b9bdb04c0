//! Repository identity and URL parsing.
//!
//! `RepoId` is the only key used for path derivation: two URLs with the
//! same (host, owner, name) denote the same entry regardless of scheme or
//! a trailing `.git`. Parsing covers the https/http/ssh/git/scp-style forms
//! a git remote can take.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Canonical (host, owner, name) identity used as the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RepoId {
    /// Hosting provider, e.g. `github.com`.
    pub host: String,
    /// Repository owner or organization.
    pub owner: String,
    /// Repository name, with any `.git` suffix stripped.
    pub name: String,
}

impl RepoId {
    /// Construct a `RepoId` directly, validating that no component is
    /// empty.
    pub fn new(
        host: impl Into<String>,
        owner: impl Into<String>,
        name: impl Into<String>,
    ) -> Result<Self> {
        let host = host.into();
        let owner = owner.into();
        let name = strip_git_suffix(&name.into()).to_string();
        if host.is_empty() || owner.is_empty() || name.is_empty() {
            return Err(Error::InvalidArgument(
                "repo id requires non-empty host, owner and name".to_string(),
            ));
        }
        Ok(Self { host, owner, name })
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.host, self.owner, self.name)
    }
}

fn strip_git_suffix(name: &str) -> &str {
    name.strip_suffix(".git").unwrap_or(name)
}

fn strip_trailing_slash(s: &str) -> &str {
    s.strip_suffix('/').unwrap_or(s)
}

/// Parse a repository URL into a [`RepoId`].
///
/// Accepted forms: `https://host/owner/name[.git][/]`, `http://...`,
/// `ssh://[user@]host[:port]/owner/name[.git]`,
/// `user@host:owner/name[.git]`, `git://host/owner/name[.git]`,
/// `git+https://...`, `git+ssh://...`, bare `host/owner/name`, bare
/// `host:owner/name`.
pub fn parse_repo_url(raw: &str) -> Result<RepoId> {
    let trimmed = strip_trailing_slash(raw.trim());
    if trimmed.is_empty() {
        return Err(Error::InvalidArgument("empty url".to_string()));
    }

    if let Some(rest) = trimmed
        .strip_prefix("git+https://")
        .or_else(|| trimmed.strip_prefix("git+ssh://"))
    {
        return parse_authority_path(rest, raw);
    }

    for scheme in ["https://", "http://", "ssh://", "git://"] {
        if let Some(rest) = trimmed.strip_prefix(scheme) {
            return parse_authority_path(rest, raw);
        }
    }

    if let Some((host, owner_name)) = split_scp_scheme(trimmed) {
        return parse_owner_name(host, owner_name, raw);
    }

    // Bare `host:owner/name` (no user@ prefix).
    if let Some((host, owner_name)) = trimmed.split_once(':') {
        if !host.is_empty() && !host.contains('/') {
            return parse_owner_name(host, owner_name, raw);
        }
    }

    // Bare `host/owner/name`.
    if let Some((host, owner_name)) = trimmed.split_once('/') {
        return parse_owner_name(host, owner_name, raw);
    }

    Err(Error::InvalidArgument(format!("cannot parse url '{raw}'")))
}

/// Splits `user@host:path` into `(host, path)`, mirroring scp-style
/// git remotes. Returns `None` if the string is not of that shape.
fn split_scp_scheme(s: &str) -> Option<(&str, &str)> {
    let at = s.find('@')?;
    let colon = s[at..].find(':')? + at;
    if s[..at].contains('/') || s[at + 1..colon].contains('/') {
        return None;
    }
    Some((&s[at + 1..colon], &s[colon + 1..]))
}

fn parse_authority_path(rest: &str, raw: &str) -> Result<RepoId> {
    // Drop an optional `user@` prefix, then an optional `:port`.
    let rest = rest.split_once('@').map_or(rest, |(_, r)| r);
    let (host_and_port, path) = rest
        .split_once('/')
        .ok_or_else(|| Error::InvalidArgument(format!("missing path in url '{raw}'")))?;
    let host = host_and_port.split(':').next().unwrap_or(host_and_port);
    parse_owner_name(host, path, raw)
}

fn parse_owner_name(host: &str, owner_name: &str, raw: &str) -> Result<RepoId> {
    let owner_name = owner_name.trim_matches('/');
    let mut parts = owner_name.splitn(2, '/');
    let owner = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidArgument(format!("missing owner in url '{raw}'")))?;
    let name = parts
        .next()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| Error::InvalidArgument(format!("missing repo name in url '{raw}'")))?;
    RepoId::new(host, owner, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hon(id: &RepoId) -> (&str, &str, &str) {
        (&id.host, &id.owner, &id.name)
    }

    #[test]
    fn parses_https_with_git_suffix() {
        let id = parse_repo_url("https://github.com/octocat/Hello-World.git").unwrap();
        assert_eq!(hon(&id), ("github.com", "octocat", "Hello-World"));
    }

    #[test]
    fn parses_https_without_git_suffix_and_trailing_slash() {
        let id = parse_repo_url("https://github.com/octocat/Hello-World/").unwrap();
        assert_eq!(hon(&id), ("github.com", "octocat", "Hello-World"));
    }

    #[test]
    fn parses_ssh_url_with_port() {
        let id = parse_repo_url("ssh://git@github.com:22/octocat/Hello-World.git").unwrap();
        assert_eq!(hon(&id), ("github.com", "octocat", "Hello-World"));
    }

    #[test]
    fn parses_scp_style() {
        let id = parse_repo_url("git@github.com:octocat/Hello-World.git").unwrap();
        assert_eq!(hon(&id), ("github.com", "octocat", "Hello-World"));
    }

    #[test]
    fn parses_git_protocol() {
        let id = parse_repo_url("git://github.com/octocat/Hello-World.git").unwrap();
        assert_eq!(hon(&id), ("github.com", "octocat", "Hello-World"));
    }

    #[test]
    fn parses_git_plus_ssh() {
        let id = parse_repo_url("git+ssh://git@github.com/octocat/Hello-World.git").unwrap();
        assert_eq!(hon(&id), ("github.com", "octocat", "Hello-World"));
    }

    #[test]
    fn parses_bare_host_owner_name() {
        let id = parse_repo_url("github.com/octocat/Hello-World").unwrap();
        assert_eq!(hon(&id), ("github.com", "octocat", "Hello-World"));
    }

    #[test]
    fn parses_bare_host_colon_owner_name() {
        let id = parse_repo_url("github.com:octocat/Hello-World").unwrap();
        assert_eq!(hon(&id), ("github.com", "octocat", "Hello-World"));
    }

    #[test]
    fn different_schemes_same_repo_id() {
        let a = parse_repo_url("https://github.com/octocat/Hello-World.git").unwrap();
        let b = parse_repo_url("git@github.com:octocat/Hello-World").unwrap();
        let c = parse_repo_url("ssh://git@github.com/octocat/Hello-World.git").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn rejects_empty_url() {
        assert!(parse_repo_url("").is_err());
    }

    #[test]
    fn rejects_missing_repo_name() {
        assert!(parse_repo_url("https://github.com/octocat").is_err());
    }
}
