use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EmbedError;

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
    encoding_format: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    index: usize,
    embedding: Vec<f64>,
}

/// Call an OpenAI-compatible `/embeddings` endpoint.
///
/// `dimensions == 0` leaves the field out of the request body.
pub(crate) async fn call_embedding_api(
    client: &Client,
    api_key: &str,
    base_url: &str,
    model: &str,
    dimensions: usize,
    texts: &[&str],
) -> Result<Vec<Vec<f32>>, EmbedError> {
    let url = format!("{base_url}/embeddings");
    let body = EmbeddingRequest {
        model,
        input: texts,
        dimensions: (dimensions > 0).then_some(dimensions),
        encoding_format: "float",
    };

    let resp = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await?;

    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(EmbedError::Api {
            status: status.as_u16(),
            body,
        });
    }

    let data: EmbeddingResponse = resp.json().await?;
    debug!(model, batch = texts.len(), "embed: response received");
    collect_by_index(data, texts.len())
}

/// Place each embedding at its declared index; the API may reorder items.
fn collect_by_index(
    data: EmbeddingResponse,
    batch_size: usize,
) -> Result<Vec<Vec<f32>>, EmbedError> {
    let mut vecs: Vec<Option<Vec<f32>>> = vec![None; batch_size];
    for item in data.data {
        if item.index >= batch_size {
            return Err(EmbedError::UnexpectedIndex {
                index: item.index,
                batch_size,
            });
        }
        vecs[item.index] = Some(item.embedding.iter().map(|&v| v as f32).collect());
    }

    vecs.into_iter()
        .enumerate()
        .map(|(i, v)| v.ok_or(EmbedError::MissingIndex(i)))
        .collect()
}
