//! HTTP remote store speaking the Dropbox v2 files API.

use std::fmt::Write as _;

use anyhow::{Context, anyhow};
use async_trait::async_trait;
use ferry_core::{CommitInfo, RemoteFile, RemoteStore};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

const API_ARG_HEADER: &str = "Dropbox-API-Arg";
const OCTET_STREAM: &str = "application/octet-stream";

/// Connection settings for [`DropboxStore`].
#[derive(Clone)]
pub struct DropboxConfig {
    /// Static bearer token.
    pub access_token: String,
    /// RPC endpoint base, e.g. `https://api.dropboxapi.com`.
    pub api_url: String,
    /// Content endpoint base, e.g. `https://content.dropboxapi.com`.
    pub content_url: String,
    /// Prefix joined with the final path to form public links.
    pub link_base: String,
}

/// [`RemoteStore`] over the Dropbox upload and folder-listing endpoints.
#[derive(Clone)]
pub struct DropboxStore {
    client: Client,
    config: DropboxConfig,
}

#[derive(Serialize)]
struct CommitArg<'a> {
    path: &'a str,
    mode: &'static str,
    autorename: bool,
    mute: bool,
}

impl<'a> From<&'a CommitInfo> for CommitArg<'a> {
    fn from(commit: &'a CommitInfo) -> Self {
        Self {
            path: &commit.path,
            mode: "add",
            autorename: commit.autorename,
            mute: commit.mute,
        }
    }
}

#[derive(Serialize)]
struct CursorArg<'a> {
    session_id: &'a str,
    offset: u64,
}

#[derive(Serialize)]
struct StartArg {
    close: bool,
}

#[derive(Serialize)]
struct AppendArg<'a> {
    cursor: CursorArg<'a>,
    close: bool,
}

#[derive(Serialize)]
struct FinishArg<'a> {
    cursor: CursorArg<'a>,
    commit: CommitArg<'a>,
}

#[derive(Serialize)]
struct ListFolderArg<'a> {
    path: &'a str,
    recursive: bool,
}

#[derive(Serialize)]
struct ListContinueArg<'a> {
    cursor: &'a str,
}

#[derive(Deserialize)]
struct FileMetadata {
    name: String,
    path_display: Option<String>,
    path_lower: Option<String>,
    size: u64,
}

#[derive(Deserialize)]
struct SessionStarted {
    session_id: String,
}

#[derive(Deserialize)]
struct ListFolderPage {
    entries: Vec<ListEntry>,
    cursor: String,
    has_more: bool,
}

#[derive(Deserialize)]
struct ListEntry {
    #[serde(rename = ".tag")]
    tag: String,
    name: String,
    path_display: Option<String>,
    path_lower: Option<String>,
    size: Option<u64>,
}

impl DropboxStore {
    /// Store using a default HTTP client.
    #[must_use]
    pub fn new(config: DropboxConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Store using a caller-supplied HTTP client.
    #[must_use]
    pub const fn with_client(client: Client, config: DropboxConfig) -> Self {
        Self { client, config }
    }

    fn link_for(&self, path: &str) -> String {
        format!("{}{path}", self.config.link_base.trim_end_matches('/'))
    }

    fn content_request<A: Serialize>(
        &self,
        endpoint: &str,
        arg: &A,
        bytes: Vec<u8>,
    ) -> anyhow::Result<RequestBuilder> {
        let arg = serde_json::to_string(arg).context("failed to encode Dropbox-API-Arg")?;
        Ok(self
            .client
            .post(format!("{}{endpoint}", self.config.content_url))
            .bearer_auth(&self.config.access_token)
            .header(API_ARG_HEADER, header_safe_json(&arg))
            .header(CONTENT_TYPE, OCTET_STREAM)
            .body(bytes))
    }

    fn rpc_request<A: Serialize>(&self, endpoint: &str, arg: &A) -> RequestBuilder {
        self.client
            .post(format!("{}{endpoint}", self.config.api_url))
            .bearer_auth(&self.config.access_token)
            .json(arg)
    }

    fn remote_file(&self, metadata: FileMetadata) -> RemoteFile {
        let path = metadata
            .path_display
            .or(metadata.path_lower)
            .unwrap_or_else(|| format!("/{}", metadata.name));
        RemoteFile {
            url: self.link_for(&path),
            path,
            name: metadata.name,
            size_bytes: metadata.size,
        }
    }
}

async fn send(endpoint: &str, request: RequestBuilder) -> anyhow::Result<Response> {
    let response = request
        .send()
        .await
        .with_context(|| format!("{endpoint} request failed"))?;
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(anyhow!("{endpoint} returned {status}: {}", body.trim()))
}

async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> anyhow::Result<T> {
    response
        .json::<T>()
        .await
        .with_context(|| format!("{endpoint} returned an unexpected body"))
}

/// Encode JSON for an HTTP header, escaping every non-ASCII code unit.
fn header_safe_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len());
    for c in json.chars() {
        if c.is_ascii() {
            out.push(c);
        } else {
            let mut units = [0_u16; 2];
            for unit in c.encode_utf16(&mut units) {
                let _ = write!(out, "\\u{unit:04x}");
            }
        }
    }
    out
}

#[async_trait]
impl RemoteStore for DropboxStore {
    async fn upload(&self, commit: &CommitInfo, bytes: Vec<u8>) -> anyhow::Result<RemoteFile> {
        const ENDPOINT: &str = "/2/files/upload";
        let request = self.content_request(ENDPOINT, &CommitArg::from(commit), bytes)?;
        let metadata: FileMetadata = decode(ENDPOINT, send(ENDPOINT, request).await?).await?;
        Ok(self.remote_file(metadata))
    }

    async fn session_start(&self, bytes: Vec<u8>) -> anyhow::Result<String> {
        const ENDPOINT: &str = "/2/files/upload_session/start";
        let request = self.content_request(ENDPOINT, &StartArg { close: false }, bytes)?;
        let started: SessionStarted = decode(ENDPOINT, send(ENDPOINT, request).await?).await?;
        Ok(started.session_id)
    }

    async fn session_append(
        &self,
        session_id: &str,
        offset: u64,
        bytes: Vec<u8>,
    ) -> anyhow::Result<()> {
        const ENDPOINT: &str = "/2/files/upload_session/append_v2";
        let arg = AppendArg {
            cursor: CursorArg { session_id, offset },
            close: false,
        };
        let request = self.content_request(ENDPOINT, &arg, bytes)?;
        send(ENDPOINT, request).await?;
        Ok(())
    }

    async fn session_finish(
        &self,
        session_id: &str,
        offset: u64,
        bytes: Vec<u8>,
        commit: &CommitInfo,
    ) -> anyhow::Result<RemoteFile> {
        const ENDPOINT: &str = "/2/files/upload_session/finish";
        let arg = FinishArg {
            cursor: CursorArg { session_id, offset },
            commit: CommitArg::from(commit),
        };
        let request = self.content_request(ENDPOINT, &arg, bytes)?;
        let metadata: FileMetadata = decode(ENDPOINT, send(ENDPOINT, request).await?).await?;
        Ok(self.remote_file(metadata))
    }

    async fn list_folder(&self, path: &str) -> anyhow::Result<Vec<RemoteFile>> {
        const LIST: &str = "/2/files/list_folder";
        const CONTINUE: &str = "/2/files/list_folder/continue";

        let first = self.rpc_request(
            LIST,
            &ListFolderArg {
                path,
                recursive: false,
            },
        );
        let mut page: ListFolderPage = decode(LIST, send(LIST, first).await?).await?;
        let mut files = Vec::new();
        loop {
            files.extend(
                page.entries
                    .into_iter()
                    .filter(|entry| entry.tag == "file")
                    .map(|entry| {
                        self.remote_file(FileMetadata {
                            name: entry.name,
                            path_display: entry.path_display,
                            path_lower: entry.path_lower,
                            size: entry.size.unwrap_or_default(),
                        })
                    }),
            );
            if !page.has_more {
                break;
            }
            let next = self.rpc_request(
                CONTINUE,
                &ListContinueArg {
                    cursor: &page.cursor,
                },
            );
            page = decode(CONTINUE, send(CONTINUE, next).await?).await?;
        }
        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn header_json_escapes_non_ascii() {
        let encoded = header_safe_json(&json!({"path": "/games/Pokémon 🎮.nsp"}).to_string());
        assert_eq!(
            encoded,
            r#"{"path":"/games/Pok\u00e9mon \ud83c\udfae.nsp"}"#
        );
    }

    #[test]
    fn commit_arg_always_adds() {
        let commit = CommitInfo::add("/games/a.nsp");
        let arg = serde_json::to_value(CommitArg::from(&commit)).expect("serialize");
        assert_eq!(
            arg,
            json!({"path": "/games/a.nsp", "mode": "add", "autorename": true, "mute": true})
        );
    }
}
