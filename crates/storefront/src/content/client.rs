//! HTTP client for the hosted content store.
//!
//! Reads go through the API CDN unless they must be fresh (addresses), in
//! which case they hit the live API with the read token. Writes use the
//! mutation endpoint with the write token.

use std::sync::Arc;

use async_trait::async_trait;
use nextcart_core::{Address, NewAddress, OwnerId, Product};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::instrument;

use super::queries;
use super::{ContentError, ContentStore, ProductFilter};
use crate::config::ContentConfig;

/// Client for the content store's query and mutation APIs.
#[derive(Clone)]
pub struct ContentClient {
    inner: Arc<ContentClientInner>,
}

struct ContentClientInner {
    client: reqwest::Client,
    cdn_query_url: String,
    live_query_url: String,
    mutate_url: String,
    read_token: Option<SecretString>,
    write_token: Option<SecretString>,
}

/// Envelope around every query result.
#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
struct MutationResponse {
    #[serde(default)]
    results: Vec<MutationResult>,
}

#[derive(Debug, Deserialize)]
struct MutationResult {
    id: Option<String>,
    document: Option<Value>,
}

/// Which host a query should go to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Freshness {
    /// Cached edge reads, fine for public catalog data.
    Cdn,
    /// Live API with the read token, for data the user just wrote.
    Live,
}

impl ContentClient {
    /// Create a new content store client.
    #[must_use]
    pub fn new(config: &ContentConfig) -> Self {
        let version = config.api_version.trim_start_matches('v');
        let cdn_host = format!("https://{}.apicdn.sanity.io/v{version}", config.project_id);
        let live_host = format!("https://{}.api.sanity.io/v{version}", config.project_id);

        Self {
            inner: Arc::new(ContentClientInner {
                client: reqwest::Client::new(),
                cdn_query_url: format!("{cdn_host}/data/query/{}", config.dataset),
                live_query_url: format!("{live_host}/data/query/{}", config.dataset),
                mutate_url: format!("{live_host}/data/mutate/{}", config.dataset),
                read_token: config.read_token.clone(),
                write_token: config.write_token.clone(),
            }),
        }
    }

    /// Run a GROQ query and decode its `result`.
    async fn query<T: DeserializeOwned>(
        &self,
        groq: &str,
        params: &[(&str, Value)],
        freshness: Freshness,
    ) -> Result<T, ContentError> {
        let url = match freshness {
            Freshness::Cdn => &self.inner.cdn_query_url,
            Freshness::Live => &self.inner.live_query_url,
        };

        let mut pairs = Vec::with_capacity(params.len() + 1);
        pairs.push(("query".to_string(), groq.to_string()));
        for (name, value) in params {
            pairs.push((format!("${name}"), value.to_string()));
        }

        let mut request = self.inner.client.get(url).query(&pairs);
        if freshness == Freshness::Live
            && let Some(token) = &self.inner.read_token
        {
            request = request.bearer_auth(token.expose_secret());
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                body = %body.chars().take(500).collect::<String>(),
                "Content API returned non-success status"
            );
            return Err(ContentError::Api {
                status: status.as_u16(),
                message: body.chars().take(200).collect(),
            });
        }

        serde_json::from_str::<QueryResponse<T>>(&body)
            .map(|envelope| envelope.result)
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to parse content query response");
                ContentError::Parse(e.to_string())
            })
    }

    /// Submit a transaction of mutations.
    async fn mutate(&self, mutations: Value) -> Result<MutationResponse, ContentError> {
        let token = self
            .inner
            .write_token
            .as_ref()
            .ok_or(ContentError::MissingWriteToken)?;

        let response = self
            .inner
            .client
            .post(&self.inner.mutate_url)
            .query(&[
                ("returnIds", "true"),
                ("returnDocuments", "true"),
                ("visibility", "sync"),
            ])
            .bearer_auth(token.expose_secret())
            .json(&json!({ "mutations": mutations }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ContentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ContentError::Parse(e.to_string()))
    }
}

/// Encode an optional filter as a query parameter value.
fn optional(value: Option<&String>) -> Value {
    value.map_or(Value::Null, |v| Value::String(v.clone()))
}

#[async_trait]
impl ContentStore for ContentClient {
    #[instrument(skip(self))]
    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, ContentError> {
        let params = [
            ("variant", optional(filter.variant.as_ref())),
            ("brand", optional(filter.brand.as_ref())),
            ("category", optional(filter.category.as_ref())),
            ("min", json!(filter.min)),
            ("max", json!(filter.max)),
        ];

        self.query::<Option<Vec<Product>>>(queries::PRODUCTS, &params, Freshness::Cdn)
            .await
            .map(Option::unwrap_or_default)
    }

    #[instrument(skip(self))]
    async fn search_products(&self, term: &str) -> Result<Vec<Product>, ContentError> {
        let params = [("term", Value::String(format!("{term}*")))];

        self.query::<Option<Vec<Product>>>(queries::SEARCH_PRODUCTS, &params, Freshness::Cdn)
            .await
            .map(Option::unwrap_or_default)
    }

    #[instrument(skip(self))]
    async fn product_by_slug(&self, slug: &str) -> Result<Option<Product>, ContentError> {
        let params = [("slug", Value::String(slug.to_string()))];
        self.query(queries::PRODUCT_BY_SLUG, &params, Freshness::Cdn)
            .await
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn addresses_for(&self, owner: &OwnerId) -> Result<Vec<Address>, ContentError> {
        let params = [("ownerId", Value::String(owner.to_string()))];

        self.query::<Option<Vec<Address>>>(queries::ADDRESSES_FOR_OWNER, &params, Freshness::Live)
            .await
            .map(Option::unwrap_or_default)
    }

    #[instrument(skip(self), fields(owner = %owner))]
    async fn unset_default_addresses(&self, owner: &OwnerId) -> Result<(), ContentError> {
        let mutations = json!([{
            "patch": {
                "query": queries::DEFAULT_ADDRESSES_FOR_OWNER,
                "params": { "ownerId": owner },
                "set": { "default": false }
            }
        }]);

        self.mutate(mutations).await.map(|_| ())
    }

    #[instrument(skip(self, address), fields(owner = %address.owner_id))]
    async fn create_address(&self, address: NewAddress) -> Result<Address, ContentError> {
        let mut document =
            serde_json::to_value(&address).map_err(|e| ContentError::Parse(e.to_string()))?;
        if let Value::Object(fields) = &mut document {
            fields.insert("_type".to_string(), Value::String("address".to_string()));
        }

        let response = self.mutate(json!([{ "create": document }])).await?;
        let result = response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ContentError::Parse("mutation returned no results".to_string()))?;

        match (result.document, result.id) {
            (Some(document), _) => {
                serde_json::from_value(document).map_err(|e| ContentError::Parse(e.to_string()))
            }
            (None, Some(id)) => Ok(address.with_id(id.into())),
            (None, None) => Err(ContentError::Parse(
                "mutation result carried neither id nor document".to_string(),
            )),
        }
    }
}
