//! HTTP client for the reward verifier.

use farmscope_core::{Address, B256};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

use crate::error::{Result, VerifierError};
use crate::types::{
    AprInfo, AprParams, AprResponse, ProofOfRecommendation, ProofSubmission, ProofsResponse,
    RewardProof, TimePromise, TimePromiseRequest,
};

/// Client for the reward verifier service.
///
/// Proofs are only ever fetched and forwarded. Nothing is signed or created
/// locally, and failures are never retried.
#[derive(Clone, Debug)]
pub struct VerifierClient {
    client: Client,
    base_url: Url,
}

impl VerifierClient {
    /// Create a client for the verifier at `base_url`.
    pub fn new(base_url: Url, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("farmscope/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| VerifierError::InvalidInput(format!("Failed to build HTTP client: {}", e)))?;

        // `Url::join` drops the last path segment unless the base ends in '/'.
        let mut base_url = base_url;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Reward proofs issued to `account`.
    /// GET /v1/accounts/{account}/proofs
    pub async fn fetch_proofs(&self, account: Address) -> Result<Vec<RewardProof>> {
        let path = format!("v1/accounts/{}/proofs", account);
        let url = self.endpoint(&path)?;

        let response: ProofsResponse = self.send(&path, self.client.get(url)).await?;
        tracing::debug!(%account, proofs = response.items.len(), "Fetched reward proofs");
        Ok(response.items)
    }

    /// APR figures keyed by farm hash.
    /// GET /v1/farms/apr
    pub async fn fetch_apr(&self, params: &AprParams) -> Result<BTreeMap<B256, AprInfo>> {
        let path = "v1/farms/apr";
        let mut url = self.endpoint(path)?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(farm_hash) = params.farm_hash {
                query.append_pair("farmHash", &farm_hash.to_string());
            }
            if let Some(chain_id) = params.chain_id {
                query.append_pair("chainId", &chain_id.to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        let response: AprResponse = self.send(path, self.client.get(url)).await?;
        Ok(response
            .items
            .into_iter()
            .map(|info| (info.farm_hash, info))
            .collect())
    }

    /// Ask the oracle to promise a creation time for a referral link.
    /// POST /v4/time-promise
    pub async fn request_time_promise(&self, request: &TimePromiseRequest) -> Result<TimePromise> {
        let path = "v4/time-promise";
        let url = self.endpoint(path)?;
        self.send(path, self.client.post(url).json(request)).await
    }

    /// Submit a signed proof of recommendation; returns the verifier's commitment.
    /// POST /v4/proofs
    pub async fn post_proof_of_recommendation(
        &self,
        proof: &ProofOfRecommendation,
        link_referrer: &str,
    ) -> Result<serde_json::Value> {
        let path = "v4/proofs";
        let url = self.endpoint(path)?;
        let body = ProofSubmission {
            data: proof,
            link_referrer,
        };
        self.send(path, self.client.post(url).json(&body)).await
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| VerifierError::InvalidInput(format!("Invalid endpoint '{}': {}", path, e)))
    }

    async fn send<T: DeserializeOwned>(&self, endpoint: &str, request: RequestBuilder) -> Result<T> {
        let response = request.send().await.map_err(|e| {
            tracing::warn!(endpoint, error = %e, "Verifier request failed");
            VerifierError::unavailable(endpoint, e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(endpoint, status = status.as_u16(), "Verifier returned error status");
            return Err(VerifierError::unavailable(endpoint, format!("status {}", status)));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| VerifierError::unavailable(endpoint, e))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| VerifierError::unavailable(endpoint, format!("invalid body: {}", e)))
    }
}
