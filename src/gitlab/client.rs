//! reqwest implementation of [`GitLabApi`].

use reqwest::{Client, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::types::{MergeRequest, MrIid, ProjectId, RepoInfo};

use super::{GitLabApi, GitLabApiError};

/// Page size for list endpoints. GitLab's maximum.
const PER_PAGE: &str = "100";

/// Authenticated client for one GitLab instance.
#[derive(Debug, Clone)]
pub struct GitLabClient {
    http: Client,
    api_base: String,
    token: String,
}

#[derive(Serialize)]
struct NotePayload<'a> {
    body: &'a str,
}

impl GitLabClient {
    /// `base_url` is the instance root, e.g. `https://gitlab.com/`.
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self, GitLabApiError> {
        let http = Client::builder()
            .user_agent(concat!("mr-combiner/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(GitLabClient {
            http,
            api_base: format!("{}/api/v4", base_url.trim_end_matches('/')),
            token: token.into(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// Sends the request and turns non-2xx answers into [`GitLabApiError::Status`].
    async fn send(&self, request: RequestBuilder) -> Result<Response, GitLabApiError> {
        let response = request.bearer_auth(&self.token).send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        tracing::debug!(status = status.as_u16(), body = %body, "GitLab API error response");
        Err(GitLabApiError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, GitLabApiError> {
    if body.trim().is_empty() {
        return Err(GitLabApiError::EmptyResponse);
    }
    Ok(serde_json::from_str(body)?)
}

/// The `X-Next-Page` header; absent or empty on the last page.
fn next_page(response: &Response) -> Option<u32> {
    response
        .headers()
        .get("x-next-page")
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .and_then(|v| v.parse().ok())
}

impl GitLabApi for GitLabClient {
    async fn project(&self, project: ProjectId) -> Result<RepoInfo, GitLabApiError> {
        let url = self.url(&format!("/projects/{project}"));
        let response = self.send(self.http.get(&url)).await?;
        decode(&response.text().await?)
    }

    async fn labeled_merge_requests(
        &self,
        project: ProjectId,
        label: &str,
    ) -> Result<Vec<MergeRequest>, GitLabApiError> {
        let url = self.url(&format!("/projects/{project}/merge_requests"));
        let mut requests = Vec::new();
        let mut page: u32 = 1;

        loop {
            let page_param = page.to_string();
            let request = self.http.get(&url).query(&[
                ("state", "opened"),
                ("labels", label),
                ("per_page", PER_PAGE),
                ("page", page_param.as_str()),
            ]);
            let response = self.send(request).await?;
            let next = next_page(&response);

            let batch: Vec<MergeRequest> = decode(&response.text().await?)?;
            tracing::debug!(%project, page = %page, count = batch.len(), "fetched MR page");
            requests.extend(batch);

            match next {
                Some(n) if n > page => page = n,
                Some(n) => {
                    tracing::warn!(%project, page, next = n, "next page does not advance, stopping");
                    break;
                }
                None => break,
            }
        }

        Ok(requests)
    }

    async fn create_note(
        &self,
        project: ProjectId,
        request: MrIid,
        body: &str,
    ) -> Result<(), GitLabApiError> {
        let url = self.url(&format!(
            "/projects/{project}/merge_requests/{}/notes",
            request.0
        ));
        self.send(self.http.post(&url).json(&NotePayload { body }))
            .await?;
        Ok(())
    }
}
