use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::{Deserialize, Serialize};

use crate::config::env_non_empty;
use crate::http_client::http_client;

const GITHUB_API_BASE: &str = "https://api.github.com";
const PUBLISH_TIMEOUT_SECS: u64 = 25;
const DEFAULT_REPO: &str = "a7shk1/m3u-broadcast";
const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubTarget {
    /// Contents API root, `https://api.github.com` unless overridden.
    pub api_base: String,
    pub token: String,
    pub repo: String,
    pub branch: String,
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishTarget {
    Local(PathBuf),
    Github(GithubTarget),
}

impl PublishTarget {
    /// A configured `GITHUB_TOKEN` selects the contents API; otherwise the
    /// result is written to `local_path`.
    pub fn from_env(local_path: &Path, repo_path: &str, message: &str) -> Self {
        match env_non_empty("GITHUB_TOKEN") {
            Some(token) => Self::Github(GithubTarget {
                api_base: GITHUB_API_BASE.to_string(),
                token,
                repo: env_non_empty("GITHUB_REPO").unwrap_or_else(|| DEFAULT_REPO.to_string()),
                branch: env_non_empty("GITHUB_BRANCH")
                    .unwrap_or_else(|| DEFAULT_BRANCH.to_string()),
                path: repo_path.to_string(),
                message: message.to_string(),
            }),
            None => Self::Local(local_path.to_path_buf()),
        }
    }
}

/// Writes or commits `content`; returns a short description of where it went.
pub fn publish(target: &PublishTarget, content: &str) -> Result<String> {
    match target {
        PublishTarget::Local(path) => {
            write_atomic(path, content.as_bytes())?;
            let shown = fs::canonicalize(path).unwrap_or_else(|_| path.clone());
            Ok(shown.display().to_string())
        }
        PublishTarget::Github(gh) => upsert_github_file(gh, content.as_bytes()),
    }
}

/// Writes through a sibling temp file and a rename, creating parent dirs.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    }
    let mut tmp_name = path
        .file_name()
        .map(OsString::from)
        .ok_or_else(|| anyhow!("not a file path: {}", path.display()))?;
    tmp_name.push(".tmp");
    let tmp = path.with_file_name(tmp_name);
    fs::write(&tmp, contents).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, path).with_context(|| format!("swap {}", path.display()))?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct ContentsEntry {
    sha: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutContents<'a> {
    message: &'a str,
    content: String,
    branch: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct PutResponse {
    #[serde(default)]
    content: Option<PutContentInfo>,
}

#[derive(Debug, Deserialize)]
struct PutContentInfo {
    path: Option<String>,
}

/// Read-modify-write against the contents API: fetch the current blob sha
/// (absent for a new file), then PUT the new content keyed to it.
fn upsert_github_file(gh: &GithubTarget, content: &[u8]) -> Result<String> {
    let client = http_client()?;
    let url = format!(
        "{}/repos/{}/contents/{}",
        gh.api_base.trim_end_matches('/'),
        gh.repo,
        gh.path
    );
    let auth = format!("Bearer {}", gh.token);
    let timeout = Duration::from_secs(PUBLISH_TIMEOUT_SECS);

    let current = client
        .get(&url)
        .header(AUTHORIZATION, &auth)
        .header(ACCEPT, "application/vnd.github+json")
        .header(USER_AGENT, "matchday_feeds")
        .query(&[("ref", gh.branch.as_str())])
        .timeout(timeout)
        .send()
        .context("github contents lookup failed")?;
    let sha = if current.status() == StatusCode::OK {
        current
            .json::<ContentsEntry>()
            .context("invalid github contents json")?
            .sha
    } else {
        tracing::debug!(status = %current.status(), "no existing file revision");
        None
    };

    let payload = PutContents {
        message: &gh.message,
        content: BASE64.encode(content),
        branch: &gh.branch,
        sha,
    };
    let resp = client
        .put(&url)
        .header(AUTHORIZATION, &auth)
        .header(ACCEPT, "application/vnd.github+json")
        .header(USER_AGENT, "matchday_feeds")
        .json(&payload)
        .timeout(timeout)
        .send()
        .context("github contents update failed")?;
    let status = resp.status();
    let body = resp.text().context("failed reading github response")?;
    if status != StatusCode::OK && status != StatusCode::CREATED {
        return Err(anyhow!("github PUT failed: {status} {body}"));
    }
    let path = serde_json::from_str::<PutResponse>(&body)
        .ok()
        .and_then(|r| r.content)
        .and_then(|c| c.path)
        .unwrap_or_else(|| gh.path.clone());
    Ok(format!("{}@{}:{}", gh.repo, gh.branch, path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::thread;

    // Answers one request per canned response, in order, and hands back the
    // raw requests it saw.
    fn serve(responses: Vec<(u16, &'static str)>) -> (String, thread::JoinHandle<Vec<String>>) {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let base = format!("http://{}", listener.local_addr().expect("addr"));
        let handle = thread::spawn(move || {
            let mut seen = Vec::new();
            for (status, body) in responses {
                let (mut stream, _) = listener.accept().expect("accept");
                seen.push(read_request(&mut stream));
                let reply = format!(
                    "HTTP/1.1 {status} X\r\n\
Content-Type: application/json\r\n\
Content-Length: {}\r\n\
Connection: close\r\n\r\n{body}",
                    body.len()
                );
                stream.write_all(reply.as_bytes()).expect("reply");
            }
            seen
        });
        (base, handle)
    }

    fn read_request(stream: &mut impl Read) -> String {
        let mut buf = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let n = stream.read(&mut chunk).expect("read");
            if n == 0 {
                break;
            }
            buf.extend_from_slice(&chunk[..n]);
            let text = String::from_utf8_lossy(&buf).to_string();
            let Some(head_end) = text.find("\r\n\r\n") else {
                continue;
            };
            let length = text[..head_end]
                .lines()
                .find_map(|l| {
                    let (k, v) = l.split_once(':')?;
                    k.eq_ignore_ascii_case("content-length")
                        .then(|| v.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= head_end + 4 + length {
                break;
            }
        }
        String::from_utf8_lossy(&buf).to_string()
    }

    fn request_json(raw: &str) -> serde_json::Value {
        let (_, body) = raw.split_once("\r\n\r\n").expect("request body");
        serde_json::from_str(body).expect("json body")
    }

    fn target(api_base: String) -> GithubTarget {
        GithubTarget {
            api_base,
            token: "t0ken".to_string(),
            repo: "owner/lists".to_string(),
            branch: "main".to_string(),
            path: "bein.m3u".to_string(),
            message: "update bein.m3u".to_string(),
        }
    }

    #[test]
    fn existing_file_is_updated_with_its_sha() {
        let (base, server) = serve(vec![
            (200, r#"{"sha":"abc123","path":"bein.m3u"}"#),
            (201, r#"{"content":{"path":"bein.m3u"}}"#),
        ]);
        let written = publish(&PublishTarget::Github(target(base)), "#EXTM3U\n").expect("publish");
        assert_eq!(written, "owner/lists@main:bein.m3u");

        let seen = server.join().expect("server");
        assert!(seen[0].starts_with("GET /repos/owner/lists/contents/bein.m3u?ref=main "));
        assert!(seen[0].to_lowercase().contains("authorization: bearer t0ken"));
        assert!(seen[1].starts_with("PUT /repos/owner/lists/contents/bein.m3u "));
        let body = request_json(&seen[1]);
        assert_eq!(body["sha"], "abc123");
        assert_eq!(body["content"], "I0VYVE0zVQo=");
        assert_eq!(body["branch"], "main");
        assert_eq!(body["message"], "update bein.m3u");
    }

    #[test]
    fn missing_file_is_created_without_sha() {
        let (base, server) = serve(vec![
            (404, r#"{"message":"Not Found"}"#),
            (201, r#"{"content":{"path":"bein.m3u"}}"#),
        ]);
        publish(&PublishTarget::Github(target(base)), "#EXTM3U\n").expect("publish");
        let seen = server.join().expect("server");
        assert!(request_json(&seen[1]).get("sha").is_none());
    }

    #[test]
    fn rejected_put_is_an_error() {
        let (base, server) = serve(vec![
            (200, r#"{"sha":"abc123"}"#),
            (422, r#"{"message":"sha does not match"}"#),
        ]);
        let err = publish(&PublishTarget::Github(target(base)), "#EXTM3U\n")
            .expect_err("422 must fail");
        let msg = format!("{err:#}");
        assert!(msg.contains("422"), "{msg}");
        assert!(msg.contains("sha does not match"), "{msg}");
        server.join().expect("server");
    }

    #[test]
    fn atomic_write_creates_parents_and_overwrites() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("out").join("list.m3u");
        write_atomic(&path, b"first").expect("first write");
        write_atomic(&path, b"second").expect("second write");
        assert_eq!(fs::read_to_string(&path).unwrap(), "second");
        assert!(!dir.path().join("out").join("list.m3u.tmp").exists());
    }

    #[test]
    fn put_payload_omits_missing_sha() {
        let payload = PutContents {
            message: "m",
            content: BASE64.encode("#EXTM3U\n"),
            branch: "main",
            sha: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["content"], "I0VYVE0zVQo=");
        assert!(json.get("sha").is_none());
    }
}
