use qdrant_client::qdrant::{Condition, Filter, PointId, RetrievedPoint, point_id::PointIdOptions};
use sift_domain::filters::FilterMap;
use sift_storage::payload::{self, PROFILE_ID_FIELD};

use crate::{
	Result, SiftService,
	retrieval::{RetrievalHit, RetrievalRequest, build_filter},
};

/// One stored profile, payload included.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ProfileRecord {
	pub entity_id: String,
	pub payload: serde_json::Value,
}

/// Cursor-paginated listing request. `offset` is the cursor returned by the
/// previous page, not a row count.
#[derive(Clone, Debug, Default)]
pub struct ProfileListRequest {
	pub limit: Option<u32>,
	pub offset: Option<String>,
	pub filters: Option<FilterMap>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct ProfileListResponse {
	pub profiles: Vec<ProfileRecord>,
	pub next_offset: Option<String>,
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct CollectionStats {
	pub collection: String,
	pub points: u64,
	pub vector_dim: u32,
}

/// Optional profile attributes composed into a search string, for callers
/// that have structured fields instead of a written query.
#[derive(Clone, Debug, Default)]
pub struct ProfileAttributes {
	pub age: Option<u32>,
	pub income: Option<u64>,
	pub education: Option<String>,
	pub occupation: Option<String>,
}
impl ProfileAttributes {
	pub fn to_query_text(&self) -> String {
		let mut parts = Vec::new();

		if let Some(age) = self.age {
			parts.push(format!("{age} years old"));
		}
		if let Some(income) = self.income {
			parts.push(format!("income ${}", group_thousands(income)));
		}
		if let Some(education) = self.education.as_deref() {
			parts.push(format!("education {education}"));
		}
		if let Some(occupation) = self.occupation.as_deref() {
			parts.push(format!("occupation {occupation}"));
		}

		format!("Client profile: {}", parts.join(", "))
	}
}

impl SiftService {
	/// Looks one profile up by its id.
	pub async fn profile_by_id(&self, profile_id: &str) -> Result<Option<ProfileRecord>> {
		let filter = Filter::must([profile_condition(profile_id)]);
		let result =
			self.providers.vector_search.scroll(&self.qdrant, Some(filter), 1, None).await?;

		Ok(result.points.into_iter().next().map(record_from_point))
	}

	/// Fetches several profiles by id in one scroll. Missing ids are simply
	/// absent from the result.
	pub async fn profiles_by_ids(&self, profile_ids: &[String]) -> Result<Vec<ProfileRecord>> {
		if profile_ids.is_empty() {
			return Ok(Vec::new());
		}

		let filter = Filter {
			should: profile_ids.iter().map(|id| profile_condition(id)).collect(),
			..Default::default()
		};
		let result = self
			.providers
			.vector_search
			.scroll(&self.qdrant, Some(filter), profile_ids.len() as u32, None)
			.await?;

		Ok(result.points.into_iter().map(record_from_point).collect())
	}

	/// Lists profiles with optional filters and cursor pagination.
	pub async fn list_profiles(&self, request: ProfileListRequest) -> Result<ProfileListResponse> {
		let limit = request.limit.unwrap_or(10).max(1);
		let filter = request.filters.as_ref().and_then(build_filter);
		let offset = request.offset.as_deref().map(parse_point_id);
		let result = self.providers.vector_search.scroll(&self.qdrant, filter, limit, offset).await?;

		Ok(ProfileListResponse {
			profiles: result.points.into_iter().map(record_from_point).collect(),
			next_offset: result.next_offset.as_ref().and_then(payload::point_id_string),
		})
	}

	pub async fn collection_stats(&self) -> Result<CollectionStats> {
		let points = self.providers.vector_search.point_count(&self.qdrant).await?;

		Ok(CollectionStats {
			collection: self.qdrant.collection.clone(),
			points,
			vector_dim: self.qdrant.vector_dim,
		})
	}

	/// Searches with a profile-attribute query instead of free text. No
	/// intent resolution runs; the composed string goes straight to
	/// retrieval.
	pub async fn search_by_attributes(
		&self,
		attributes: &ProfileAttributes,
		top_k: Option<u32>,
	) -> Result<Vec<RetrievalHit>> {
		let top_k = top_k.unwrap_or(self.cfg.search.top_k).max(1);

		self.retrieve(RetrievalRequest {
			query_vector_text: attributes.to_query_text(),
			filters: FilterMap::new(),
			top_k,
		})
		.await
	}
}

fn record_from_point(point: RetrievedPoint) -> ProfileRecord {
	ProfileRecord {
		entity_id: payload::entity_id(&point.payload, point.id.as_ref()),
		payload: payload::payload_to_json(&point.payload),
	}
}

fn profile_condition(profile_id: &str) -> Condition {
	match profile_id.parse::<i64>() {
		Ok(number) => Condition::matches(PROFILE_ID_FIELD, number),
		Err(_) => Condition::matches(PROFILE_ID_FIELD, profile_id.to_string()),
	}
}

fn parse_point_id(raw: &str) -> PointId {
	match raw.parse::<u64>() {
		Ok(number) => PointId { point_id_options: Some(PointIdOptions::Num(number)) },
		Err(_) => PointId { point_id_options: Some(PointIdOptions::Uuid(raw.to_string())) },
	}
}

fn group_thousands(value: u64) -> String {
	let digits = value.to_string();
	let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

	for (index, digit) in digits.chars().enumerate() {
		if index > 0 && (digits.len() - index) % 3 == 0 {
			grouped.push(',');
		}

		grouped.push(digit);
	}

	grouped
}
