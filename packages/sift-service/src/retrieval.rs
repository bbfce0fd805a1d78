use qdrant_client::qdrant::{Condition, Filter, Range, ScoredPoint};
use sift_domain::filters::{self, FilterMap, FilterSpec};
use sift_storage::payload;
use tracing::warn;

use crate::{Error, Result, SiftService};

/// The one request shape crossing into the vector-database collaborator.
#[derive(Clone, Debug)]
pub struct RetrievalRequest {
	pub query_vector_text: String,
	pub filters: FilterMap,
	pub top_k: u32,
}

/// One ranked hit, in collaborator order. The gateway does not re-sort,
/// deduplicate, or re-rank.
#[derive(Clone, Debug, serde::Serialize)]
pub struct RetrievalHit {
	pub entity_id: String,
	pub score: f32,
	pub payload: serde_json::Value,
}

impl SiftService {
	/// Embeds the query text and runs one filtered similarity search. This is
	/// the only pipeline step whose failure surfaces to the caller; an empty
	/// hit list is a valid no-matches outcome, not an error.
	pub async fn retrieve(&self, request: RetrievalRequest) -> Result<Vec<RetrievalHit>> {
		if request.top_k == 0 {
			return Err(Error::InvalidRequest {
				message: "top_k must be greater than zero.".to_string(),
			});
		}

		let vector = self.embed_query_text(&request.query_vector_text).await?;
		let filter = build_filter(&request.filters);
		let points = self
			.providers
			.vector_search
			.search(&self.qdrant, vector, filter, request.top_k as u64)
			.await?;

		Ok(points.into_iter().map(hit_from_point).collect())
	}

	pub(crate) async fn embed_query_text(&self, text: &str) -> Result<Vec<f32>> {
		let embeddings = self
			.providers
			.embedding
			.embed(&self.cfg.providers.embedding, std::slice::from_ref(&text.to_string()))
			.await?;
		let vector = embeddings.into_iter().next().ok_or_else(|| Error::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		})?;

		if vector.len() != self.qdrant.vector_dim as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vector)
	}
}

fn hit_from_point(point: ScoredPoint) -> RetrievalHit {
	RetrievalHit {
		entity_id: payload::entity_id(&point.payload, point.id.as_ref()),
		score: point.score,
		payload: payload::payload_to_json(&point.payload),
	}
}

/// Translates the filter map into Qdrant must-conditions. Range keys are
/// stripped of their suffix; a one-sided range keeps its missing bound open
/// instead of substituting a sentinel; a range with no bounds is dropped.
pub(crate) fn build_filter(filters: &FilterMap) -> Option<Filter> {
	if filters.is_empty() {
		return None;
	}

	let mut must = Vec::new();

	for (key, spec) in filters {
		match spec {
			FilterSpec::Range { gte, lte } => {
				if spec.is_empty_range() {
					warn!(field = %key, "Dropping range filter with no bounds.");

					continue;
				}

				let field = filters::range_field(key).unwrap_or(key);

				must.push(Condition::range(
					field,
					Range { gte: *gte, lte: *lte, ..Default::default() },
				));
			},
			FilterSpec::Exact(value) => match exact_condition(key, value) {
				Some(condition) => must.push(condition),
				None => {
					warn!(field = %key, "Dropping filter with unsupported value type.");
				},
			},
		}
	}

	if must.is_empty() { None } else { Some(Filter::must(must)) }
}

fn exact_condition(field: &str, value: &serde_json::Value) -> Option<Condition> {
	match value {
		serde_json::Value::String(text) => Some(Condition::matches(field, text.clone())),
		serde_json::Value::Bool(flag) => Some(Condition::matches(field, *flag)),
		serde_json::Value::Number(number) => {
			if let Some(integer) = number.as_i64() {
				return Some(Condition::matches(field, integer));
			}

			// Match predicates carry keywords, integers, and booleans only;
			// a fractional equality becomes a degenerate two-sided range.
			number.as_f64().map(|bound| {
				Condition::range(field, Range { gte: Some(bound), lte: Some(bound), ..Default::default() })
			})
		},
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_filter_map_builds_no_filter() {
		assert!(build_filter(&FilterMap::new()).is_none());
	}

	#[test]
	fn exact_and_range_filters_translate_to_must_conditions() {
		let mut filters = FilterMap::new();

		filters.insert("gender".to_string(), FilterSpec::exact("F"));
		filters.insert("target".to_string(), FilterSpec::exact(1));
		filters.insert("income_total_range".to_string(), FilterSpec::range(Some(300_000.0), None));

		let filter = build_filter(&filters).expect("Expected a filter.");

		assert_eq!(filter.must.len(), 3);
		assert!(filter.must.contains(&Condition::matches("gender", "F".to_string())));
		assert!(filter.must.contains(&Condition::matches("target", 1)));
		assert!(filter.must.contains(&Condition::range(
			"income_total",
			Range { gte: Some(300_000.0), ..Default::default() }
		)));
	}

	#[test]
	fn empty_ranges_are_dropped_before_dispatch() {
		let mut filters = FilterMap::new();

		filters.insert("age_years_range".to_string(), FilterSpec::range(None, None));

		assert!(build_filter(&filters).is_none());
	}

	#[test]
	fn one_sided_ranges_leave_the_other_bound_open() {
		let mut filters = FilterMap::new();

		filters.insert("years_employed_range".to_string(), FilterSpec::range(None, Some(-1_825.0)));

		let filter = build_filter(&filters).expect("Expected a filter.");

		assert_eq!(
			filter.must,
			vec![Condition::range(
				"years_employed",
				Range { lte: Some(-1_825.0), ..Default::default() }
			)]
		);
	}

	#[test]
	fn fractional_numbers_become_degenerate_ranges() {
		let mut filters = FilterMap::new();

		filters.insert("approval_rate".to_string(), FilterSpec::exact(0.5));

		let filter = build_filter(&filters).expect("Expected a filter.");

		assert_eq!(
			filter.must,
			vec![Condition::range(
				"approval_rate",
				Range { gte: Some(0.5), lte: Some(0.5), ..Default::default() }
			)]
		);
	}
}
