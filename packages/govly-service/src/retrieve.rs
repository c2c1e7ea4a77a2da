//! Query handling: embed, search, filter, compose.

use std::collections::HashMap;

use qdrant_client::qdrant::{
	Condition, Filter, Query, QueryPointsBuilder, ScoredPoint, Value, value::Kind,
};
use serde::{Deserialize, Serialize};

use govly_domain::{Candidate, DecisionKind, QueryContext, decide};
use govly_storage::qdrant::DENSE_VECTOR_NAME;

use crate::{GovlyService, ServiceError, ServiceResult, ingest::SourceKind, respond};

#[derive(Clone, Debug, Deserialize)]
pub struct QueryRequest {
	pub query_text: String,
	#[serde(default)]
	pub country: String,
	#[serde(default)]
	pub language: String,
	#[serde(default)]
	pub agency: String,
	#[serde(default)]
	pub category_hint: Option<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct RankedResult {
	pub source_id: String,
	pub title: String,
	pub url: String,
	pub country: String,
	pub agency: String,
	pub similarity: f32,
}

#[derive(Clone, Debug, Serialize)]
pub struct QueryResponse {
	pub ranked_results: Vec<RankedResult>,
	pub response_text: String,
	pub decision_type: DecisionKind,
	pub category: Option<String>,
}

impl GovlyService {
	/// Answers a query against indexed guidance documents.
	pub async fn query_links(&self, request: QueryRequest) -> ServiceResult<QueryResponse> {
		self.run_query(request, SourceKind::Link).await
	}

	/// Answers a query against indexed government forms.
	pub async fn query_forms(&self, request: QueryRequest) -> ServiceResult<QueryResponse> {
		self.run_query(request, SourceKind::Form).await
	}

	async fn run_query(&self, request: QueryRequest, kind: SourceKind) -> ServiceResult<QueryResponse> {
		let retrieval = &self.cfg.retrieval;
		let ctx = QueryContext::build(
			&request.query_text,
			&request.country,
			&request.language,
			&request.agency,
			request.category_hint,
			retrieval.min_query_chars,
		)?;
		let vector = self.embed_single_query(&ctx.query).await?;
		let points = self.nearest_points(vector, &ctx, kind).await?;
		let candidates = candidates_from_points(points);
		let decision = decide::decide(candidates, &ctx, retrieval);

		tracing::info!(
			kind = kind.as_str(),
			candidate_count = decision.candidates.len(),
			decision_type = ?decision.kind,
			category = decision.category.as_deref().unwrap_or("none"),
			"Query decided."
		);

		let response_text = respond::compose(self, &ctx, &decision, kind).await?;
		let ranked_results = decision
			.candidates
			.iter()
			.map(|c| RankedResult {
				source_id: c.source_id.clone(),
				title: c.title.clone(),
				url: c.url.clone(),
				country: c.country.clone(),
				agency: c.agency.clone(),
				similarity: c.similarity,
			})
			.collect();

		Ok(QueryResponse {
			ranked_results,
			response_text,
			decision_type: decision.kind,
			category: decision.category,
		})
	}

	async fn nearest_points(
		&self,
		vector: Vec<f32>,
		ctx: &QueryContext,
		kind: SourceKind,
	) -> ServiceResult<Vec<ScoredPoint>> {
		let mut must = vec![Condition::matches("doc_kind", kind.as_str().to_string())];

		// "none" is the wildcard, any other value narrows the search.
		if ctx.country != "none" {
			must.push(Condition::matches("country", ctx.country.clone()));
		}
		if ctx.agency != "none" {
			must.push(Condition::matches("agency", ctx.agency.clone()));
		}

		let search = QueryPointsBuilder::new(self.qdrant.collection.clone())
			.query(Query::new_nearest(vector))
			.using(DENSE_VECTOR_NAME)
			.filter(Filter::must(must))
			.limit(self.cfg.retrieval.candidate_k as u64)
			.with_payload(true);
		let response = self
			.qdrant
			.client
			.query(search)
			.await
			.map_err(|err| ServiceError::RetrievalUnavailable { message: err.to_string() })?;

		Ok(response.result)
	}
}

/// Turns scored points into candidates, one per source document.
///
/// Several chunks of the same document can land in the result; only the
/// best-scoring chunk survives, which the incoming score order guarantees is
/// the first one seen. Points with incomplete payloads are skipped.
pub(crate) fn candidates_from_points(points: Vec<ScoredPoint>) -> Vec<Candidate> {
	let mut candidates = Vec::<Candidate>::with_capacity(points.len());

	for point in points {
		let Some(source_id) = payload_string(&point.payload, "source_id") else {
			tracing::warn!("Scored point is missing source_id payload.");

			continue;
		};

		if candidates.iter().any(|c| c.source_id == source_id) {
			continue;
		}

		let (Some(title), Some(url)) =
			(payload_string(&point.payload, "title"), payload_string(&point.payload, "url"))
		else {
			tracing::warn!(source_id = source_id.as_str(), "Scored point payload is incomplete.");

			continue;
		};

		candidates.push(Candidate {
			source_id,
			title,
			url,
			content: payload_string(&point.payload, "content").unwrap_or_default(),
			country: payload_string(&point.payload, "country").unwrap_or_else(|| "none".into()),
			agency: payload_string(&point.payload, "agency").unwrap_or_else(|| "none".into()),
			similarity: point.score,
		});
	}

	candidates
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	let value = payload.get(key)?;

	match &value.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn point(source_id: &str, score: f32) -> ScoredPoint {
		let payload = HashMap::from([
			("source_id".to_string(), Value::from(source_id)),
			("title".to_string(), Value::from(format!("Title {source_id}"))),
			("url".to_string(), Value::from(format!("https://example.gov/{source_id}"))),
			("content".to_string(), Value::from("chunk text")),
			("country".to_string(), Value::from("VN")),
			("agency".to_string(), Value::from("none")),
		]);

		ScoredPoint { score, payload, ..Default::default() }
	}

	#[test]
	fn collapses_chunks_of_the_same_source() {
		let candidates =
			candidates_from_points(vec![point("a", 0.9), point("a", 0.8), point("b", 0.7)]);

		assert_eq!(candidates.len(), 2);
		assert_eq!(candidates[0].source_id, "a");
		assert!((candidates[0].similarity - 0.9).abs() < f32::EPSILON);
	}

	#[test]
	fn skips_points_without_source_id() {
		let mut broken = point("a", 0.9);

		broken.payload.remove("source_id");

		let candidates = candidates_from_points(vec![broken, point("b", 0.7)]);

		assert_eq!(candidates.len(), 1);
		assert_eq!(candidates[0].source_id, "b");
	}
}
