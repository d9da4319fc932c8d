//! GitHub REST tools.

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Client, Method, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use toolgate_core::config::GithubConfig;
use toolgate_core::{CallContext, Error, IntegrationKind, Tool, ToolDescriptor};

use crate::auth::{Credentials, OutboundTokens};
use crate::http::{path_segments, segment, send_json, send_raw, upstream_message};

const SERVICE: &str = "GitHub";
const ACCEPT: &str = "application/vnd.github+json";
const API_VERSION: &str = "2022-11-28";

pub struct GithubClient {
    http: Client,
    api_base: String,
    credentials: Credentials,
}

#[derive(Debug, Deserialize)]
pub struct SearchRepositoriesArgs {
    pub query: String,
    pub page: Option<u32>,
    #[serde(alias = "perPage")]
    pub per_page: Option<u32>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateRepositoryArgs {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none", alias = "autoInit")]
    pub auto_init: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct FileContentsArgs {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrUpdateFileArgs {
    pub owner: String,
    pub repo: String,
    pub path: String,
    pub content: String,
    pub message: String,
    pub branch: String,
    pub sha: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct FileEntry {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct PushFilesArgs {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub files: Vec<FileEntry>,
    pub message: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreateIssueArgs {
    #[serde(skip_serializing)]
    pub owner: String,
    #[serde(skip_serializing)]
    pub repo: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignees: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub milestone: Option<u64>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct CreatePullRequestArgs {
    #[serde(skip_serializing)]
    pub owner: String,
    #[serde(skip_serializing)]
    pub repo: String,
    pub title: String,
    pub head: String,
    pub base: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draft: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maintainer_can_modify: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct ForkRepositoryArgs {
    pub owner: String,
    pub repo: String,
    pub organization: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateBranchArgs {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub from_branch: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AssignIssueArgs {
    /// `owner/name`.
    pub repo: String,
    pub issue_number: u64,
    pub assignee: String,
}

impl GithubClient {
    pub fn new(http: Client, config: &GithubConfig, outbound: Option<Arc<OutboundTokens>>) -> Self {
        Self {
            http,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            credentials: Credentials::new(
                IntegrationKind::Github,
                "GITHUB_PERSONAL_ACCESS_TOKEN",
                config.token.clone(),
                outbound,
            ),
        }
    }

    fn request(&self, method: Method, token: &str, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{path}", self.api_base))
            .bearer_auth(token)
            .header("Accept", ACCEPT)
            .header("X-GitHub-Api-Version", API_VERSION)
    }

    fn repo_path(owner: &str, repo: &str) -> String {
        format!("/repos/{}/{}", segment(owner), segment(repo))
    }

    /// Current commit sha of `branch`.
    async fn branch_sha(&self, token: &str, repo_path: &str, branch: &str) -> Result<String, Error> {
        let reference = send_json(
            SERVICE,
            self.request(
                Method::GET,
                token,
                &format!("{repo_path}/git/refs/heads/{}", path_segments(branch)),
            ),
        )
        .await?;
        string_field(&reference, "/object/sha")
    }

    pub async fn search_repositories(
        self: Arc<Self>,
        ctx: CallContext,
        args: SearchRepositoriesArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        let mut query = vec![("q", args.query)];
        if let Some(page) = args.page {
            query.push(("page", page.to_string()));
        }
        if let Some(per_page) = args.per_page {
            query.push(("per_page", per_page.to_string()));
        }
        send_json(
            SERVICE,
            self.request(Method::GET, &token, "/search/repositories")
                .query(&query),
        )
        .await
    }

    pub async fn create_repository(
        self: Arc<Self>,
        ctx: CallContext,
        args: CreateRepositoryArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        send_json(
            SERVICE,
            self.request(Method::POST, &token, "/user/repos").json(&args),
        )
        .await
    }

    pub async fn file_contents(
        self: Arc<Self>,
        ctx: CallContext,
        args: FileContentsArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        let path = format!(
            "{}/contents/{}",
            Self::repo_path(&args.owner, &args.repo),
            path_segments(&args.path)
        );
        let mut request = self.request(Method::GET, &token, &path);
        if let Some(branch) = &args.branch {
            request = request.query(&[("ref", branch)]);
        }
        let mut contents = send_json(SERVICE, request).await?;
        decode_file_content(&mut contents)?;
        Ok(contents)
    }

    pub async fn create_or_update_file(
        self: Arc<Self>,
        ctx: CallContext,
        args: CreateOrUpdateFileArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        let path = format!(
            "{}/contents/{}",
            Self::repo_path(&args.owner, &args.repo),
            path_segments(&args.path)
        );

        let sha = match args.sha {
            Some(sha) => Some(sha),
            None => {
                let request = self
                    .request(Method::GET, &token, &path)
                    .query(&[("ref", &args.branch)]);
                let (status, body) = send_raw(request).await?;
                if status == StatusCode::NOT_FOUND {
                    None
                } else if status.is_success() {
                    let existing = crate::http::parse_body(SERVICE, &body)?;
                    existing.get("sha").and_then(Value::as_str).map(str::to_string)
                } else {
                    return Err(Error::upstream(SERVICE, upstream_message(status, &body)));
                }
            }
        };

        let mut body = json!({
            "message": args.message,
            "content": STANDARD.encode(args.content.as_bytes()),
            "branch": args.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = Value::String(sha);
        }
        send_json(SERVICE, self.request(Method::PUT, &token, &path).json(&body)).await
    }

    pub async fn push_files(
        self: Arc<Self>,
        ctx: CallContext,
        args: PushFilesArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        let repo_path = Self::repo_path(&args.owner, &args.repo);

        let parent_sha = self.branch_sha(&token, &repo_path, &args.branch).await?;

        let commit = send_json(
            SERVICE,
            self.request(
                Method::GET,
                &token,
                &format!("{repo_path}/git/commits/{parent_sha}"),
            ),
        )
        .await?;
        let base_tree = string_field(&commit, "/tree/sha")?;

        let entries: Vec<Value> = args
            .files
            .iter()
            .map(|file| {
                json!({
                    "path": file.path,
                    "mode": "100644",
                    "type": "blob",
                    "content": file.content
                })
            })
            .collect();
        let tree = send_json(
            SERVICE,
            self.request(Method::POST, &token, &format!("{repo_path}/git/trees"))
                .json(&json!({ "base_tree": base_tree, "tree": entries })),
        )
        .await?;
        let tree_sha = string_field(&tree, "/sha")?;

        let new_commit = send_json(
            SERVICE,
            self.request(Method::POST, &token, &format!("{repo_path}/git/commits"))
                .json(&json!({
                    "message": args.message,
                    "tree": tree_sha,
                    "parents": [parent_sha]
                })),
        )
        .await?;
        let commit_sha = string_field(&new_commit, "/sha")?;

        tracing::debug!(files = args.files.len(), commit = %commit_sha, "pushing files");
        send_json(
            SERVICE,
            self.request(
                Method::PATCH,
                &token,
                &format!("{repo_path}/git/refs/heads/{}", path_segments(&args.branch)),
            )
            .json(&json!({ "sha": commit_sha, "force": false })),
        )
        .await
    }

    pub async fn create_issue(
        self: Arc<Self>,
        ctx: CallContext,
        args: CreateIssueArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        let path = format!("{}/issues", Self::repo_path(&args.owner, &args.repo));
        send_json(SERVICE, self.request(Method::POST, &token, &path).json(&args)).await
    }

    pub async fn create_pull_request(
        self: Arc<Self>,
        ctx: CallContext,
        args: CreatePullRequestArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        let path = format!("{}/pulls", Self::repo_path(&args.owner, &args.repo));
        send_json(SERVICE, self.request(Method::POST, &token, &path).json(&args)).await
    }

    pub async fn fork_repository(
        self: Arc<Self>,
        ctx: CallContext,
        args: ForkRepositoryArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        let path = format!("{}/forks", Self::repo_path(&args.owner, &args.repo));
        let mut request = self.request(Method::POST, &token, &path);
        if let Some(organization) = &args.organization {
            request = request.query(&[("organization", organization)]);
        }
        send_json(SERVICE, request).await
    }

    pub async fn create_branch(
        self: Arc<Self>,
        ctx: CallContext,
        args: CreateBranchArgs,
    ) -> Result<Value, Error> {
        let token = self.credentials.token(&ctx).await?;
        let repo_path = Self::repo_path(&args.owner, &args.repo);

        let from_branch = match args.from_branch {
            Some(branch) => branch,
            None => {
                let repository =
                    send_json(SERVICE, self.request(Method::GET, &token, &repo_path)).await?;
                string_field(&repository, "/default_branch")?
            }
        };
        let sha = self.branch_sha(&token, &repo_path, &from_branch).await?;

        send_json(
            SERVICE,
            self.request(Method::POST, &token, &format!("{repo_path}/git/refs"))
                .json(&json!({ "ref": format!("refs/heads/{}", args.branch), "sha": sha })),
        )
        .await
    }

    pub async fn assign_issue(
        self: Arc<Self>,
        ctx: CallContext,
        args: AssignIssueArgs,
    ) -> Result<Value, Error> {
        let (owner, name) = split_repo(&args.repo)?;
        let token = self.credentials.token(&ctx).await?;
        let idempotency_key = ctx.idempotency_key.clone().unwrap_or_else(|| {
            format!(
                "toolgate-gh-{}-{}-{}",
                args.repo, args.issue_number, args.assignee
            )
        });
        let path = format!(
            "{}/issues/{}/assignees",
            Self::repo_path(owner, name),
            args.issue_number
        );
        send_json(
            SERVICE,
            self.request(Method::POST, &token, &path)
                .header("Idempotency-Key", idempotency_key)
                .json(&json!({ "assignees": [args.assignee] })),
        )
        .await
    }
}

/// Split `owner/name`; both parts must be non-empty and there is exactly one `/`.
fn split_repo(repo: &str) -> Result<(&str, &str), Error> {
    match repo.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() && !name.contains('/') => {
            Ok((owner, name))
        }
        _ => Err(Error::InvalidArguments(format!(
            "repo must be \"owner/name\", got \"{repo}\""
        ))),
    }
}

fn string_field(value: &Value, pointer: &str) -> Result<String, Error> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::upstream(SERVICE, format!("response is missing {pointer}")))
}

/// Replace a file's base64 `content` with its decoded text. Directory
/// listings are left alone.
fn decode_file_content(contents: &mut Value) -> Result<(), Error> {
    let Some(object) = contents.as_object_mut() else {
        return Ok(());
    };
    if object.get("encoding").and_then(Value::as_str) != Some("base64") {
        return Ok(());
    }
    let Some(encoded) = object.get("content").and_then(Value::as_str) else {
        return Ok(());
    };
    let compact: String = encoded.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = STANDARD
        .decode(compact)
        .map_err(|e| Error::upstream(SERVICE, format!("invalid base64 content: {e}")))?;
    let text = String::from_utf8_lossy(&bytes).into_owned();
    object.insert("content".to_string(), Value::String(text));
    Ok(())
}

fn owner_repo_properties() -> serde_json::Map<String, Value> {
    let mut props = serde_json::Map::new();
    props.insert(
        "owner".to_string(),
        json!({ "type": "string", "description": "Repository owner (username or organization)" }),
    );
    props.insert(
        "repo".to_string(),
        json!({ "type": "string", "description": "Repository name" }),
    );
    props
}

fn repo_schema(extra: Value, required: &[&str]) -> Value {
    let mut props = owner_repo_properties();
    if let Value::Object(extra) = extra {
        props.extend(extra);
    }
    let mut all_required = vec!["owner", "repo"];
    all_required.extend_from_slice(required);
    json!({ "type": "object", "properties": props, "required": all_required })
}

/// Every GitHub tool, bound to `client`.
#[allow(clippy::too_many_lines)]
pub fn tools(client: &Arc<GithubClient>) -> Vec<Tool> {
    vec![
        Tool::typed(
            ToolDescriptor::new(
                "search_repositories",
                "Search for GitHub repositories",
                json!({
                    "type": "object",
                    "properties": {
                        "query": { "type": "string", "description": "Search query" },
                        "page": { "type": "number" },
                        "perPage": { "type": "number", "maximum": 100 }
                    },
                    "required": ["query"]
                }),
            ),
            client,
            GithubClient::search_repositories,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "create_repository",
                "Create a new GitHub repository",
                json!({
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "description": { "type": "string" },
                        "private": { "type": "boolean" },
                        "autoInit": { "type": "boolean" }
                    },
                    "required": ["name"]
                }),
            ),
            client,
            GithubClient::create_repository,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "get_file_contents",
                "Get the contents of a file or directory from a GitHub repository",
                repo_schema(
                    json!({
                        "path": { "type": "string" },
                        "branch": { "type": "string" }
                    }),
                    &["path"],
                ),
            ),
            client,
            GithubClient::file_contents,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "create_or_update_file",
                "Create or update a single file in a GitHub repository",
                repo_schema(
                    json!({
                        "path": { "type": "string" },
                        "content": { "type": "string" },
                        "message": { "type": "string", "description": "Commit message" },
                        "branch": { "type": "string" },
                        "sha": { "type": "string", "description": "Blob sha of the file being replaced" }
                    }),
                    &["path", "content", "message", "branch"],
                ),
            ),
            client,
            GithubClient::create_or_update_file,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "push_files",
                "Push multiple files to a GitHub repository in a single commit",
                repo_schema(
                    json!({
                        "branch": { "type": "string" },
                        "message": { "type": "string" },
                        "files": {
                            "type": "array",
                            "items": {
                                "type": "object",
                                "properties": {
                                    "path": { "type": "string" },
                                    "content": { "type": "string" }
                                },
                                "required": ["path", "content"]
                            }
                        }
                    }),
                    &["branch", "files", "message"],
                ),
            ),
            client,
            GithubClient::push_files,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "create_issue",
                "Create a new issue in a GitHub repository",
                repo_schema(
                    json!({
                        "title": { "type": "string" },
                        "body": { "type": "string" },
                        "assignees": { "type": "array", "items": { "type": "string" } },
                        "labels": { "type": "array", "items": { "type": "string" } },
                        "milestone": { "type": "number" }
                    }),
                    &["title"],
                ),
            ),
            client,
            GithubClient::create_issue,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "create_pull_request",
                "Create a new pull request",
                repo_schema(
                    json!({
                        "title": { "type": "string" },
                        "head": { "type": "string" },
                        "base": { "type": "string" },
                        "body": { "type": "string" },
                        "draft": { "type": "boolean" },
                        "maintainer_can_modify": { "type": "boolean" }
                    }),
                    &["title", "head", "base"],
                ),
            ),
            client,
            GithubClient::create_pull_request,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "fork_repository",
                "Fork a GitHub repository to your account or an organization",
                repo_schema(json!({ "organization": { "type": "string" } }), &[]),
            ),
            client,
            GithubClient::fork_repository,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "create_branch",
                "Create a new branch in a GitHub repository",
                repo_schema(
                    json!({
                        "branch": { "type": "string" },
                        "from_branch": { "type": "string", "description": "Defaults to the repository's default branch" }
                    }),
                    &["branch"],
                ),
            ),
            client,
            GithubClient::create_branch,
        ),
        Tool::typed(
            ToolDescriptor::new(
                "github_assign_issue",
                "Assign a user to a GitHub issue",
                json!({
                    "type": "object",
                    "properties": {
                        "repo": { "type": "string", "description": "owner/name" },
                        "issue_number": { "type": "number" },
                        "assignee": { "type": "string" },
                        "idempotency_key": { "type": "string" }
                    },
                    "required": ["repo", "issue_number", "assignee"]
                }),
            ),
            client,
            GithubClient::assign_issue,
        ),
    ]
}
