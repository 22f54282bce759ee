//! Substitute recommendation capability. The ranking model lives behind an
//! HTTP endpoint; failures and timeouts are non-fatal to every caller, and
//! the noop implementation keeps leave-request behavior identical minus the
//! assignment.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::WorkflowError;
use crate::model::employee::Employee;
use crate::model::leave_request::LeaveRequest;
use crate::model::substitute::SubstituteMatch;

#[async_trait]
pub trait SubstituteRecommender: Send + Sync {
    /// Ranks the candidate pool for a leave request, best match first.
    async fn rank(
        &self,
        request: &LeaveRequest,
        candidates: &[Employee],
    ) -> Result<Vec<SubstituteMatch>, WorkflowError>;
}

#[derive(Serialize)]
struct RankRequest<'a> {
    leave_request: &'a LeaveRequest,
    candidates: &'a [Employee],
}

pub struct HttpRecommender {
    client: reqwest::Client,
    url: String,
}

impl HttpRecommender {
    pub fn new(url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            url,
        }
    }
}

#[async_trait]
impl SubstituteRecommender for HttpRecommender {
    async fn rank(
        &self,
        request: &LeaveRequest,
        candidates: &[Employee],
    ) -> Result<Vec<SubstituteMatch>, WorkflowError> {
        let response = self
            .client
            .post(&self.url)
            .json(&RankRequest {
                leave_request: request,
                candidates,
            })
            .send()
            .await
            .map_err(|e| WorkflowError::External(e.to_string()))?;

        let response = response
            .error_for_status()
            .map_err(|e| WorkflowError::External(e.to_string()))?;

        response
            .json::<Vec<SubstituteMatch>>()
            .await
            .map_err(|e| WorkflowError::External(e.to_string()))
    }
}

/// Never recommends anyone. Used when no recommendation endpoint is
/// configured.
pub struct NoopRecommender;

#[async_trait]
impl SubstituteRecommender for NoopRecommender {
    async fn rank(
        &self,
        _request: &LeaveRequest,
        _candidates: &[Employee],
    ) -> Result<Vec<SubstituteMatch>, WorkflowError> {
        Ok(Vec::new())
    }
}
