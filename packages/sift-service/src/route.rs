use std::path::Path;

use sift_domain::{
	features,
	filters::{self, FilterMap},
	query::{self, Query, QueryKind},
};
use sift_extract::Extractor;
use tracing::{debug, info, warn};

use crate::{
	Result, SiftService,
	retrieval::{RetrievalHit, RetrievalRequest},
};

/// A retrieval hit annotated with how the query reached it. The core hit
/// fields pass through untouched.
#[derive(Clone, Debug, serde::Serialize)]
pub struct RoutedHit {
	pub entity_id: String,
	pub score: f32,
	pub payload: serde_json::Value,
	pub query_kind: QueryKind,
	pub source_filename: Option<String>,
	pub pages_extracted: Option<u32>,
}

impl SiftService {
	/// Routes a raw input string. Strings with a document suffix are read
	/// from the filesystem; everything else is treated as a text query. An
	/// unreadable document is a no-matches outcome, not an error.
	pub async fn route(
		&self,
		input: &str,
		top_k: Option<u32>,
		explicit_filters: Option<&FilterMap>,
	) -> Result<Vec<RoutedHit>> {
		let kind = query::detect_kind(input);

		debug!(?kind, "Query kind detected.");

		if kind == QueryKind::Text {
			return self.route_query(&Query::text(input), top_k, explicit_filters).await;
		}

		let bytes = match tokio::fs::read(input).await {
			Ok(bytes) => bytes,
			Err(err) => {
				warn!(source = input, error = %err, "Document could not be read; returning no hits.");

				return Ok(Vec::new());
			},
		};
		let source = Path::new(input)
			.file_name()
			.and_then(|name| name.to_str())
			.unwrap_or(input)
			.to_string();
		let Some(document) = Query::document(bytes, source) else {
			return Ok(Vec::new());
		};

		self.route_query(&document, top_k, explicit_filters).await
	}

	/// Dispatches one query through the pipeline: text queries go through
	/// intent resolution and filter merging; document queries go through
	/// extraction and feature weighting with the caller's filters only.
	pub async fn route_query(
		&self,
		query: &Query,
		top_k: Option<u32>,
		explicit_filters: Option<&FilterMap>,
	) -> Result<Vec<RoutedHit>> {
		let top_k = top_k.unwrap_or(self.cfg.search.top_k).max(1);

		match query {
			Query::Text { raw } => {
				let resolved = self.resolve_intent(raw).await;

				if !resolved.detected_attributes.is_empty() {
					debug!(attributes = ?resolved.detected_attributes, "Query intent resolved.");
				}

				let merged = filters::merge(explicit_filters, &resolved.filters);
				let hits = self
					.retrieve(RetrievalRequest {
						query_vector_text: resolved.search_text,
						filters: merged,
						top_k,
					})
					.await?;

				Ok(annotate(hits, QueryKind::Text, None, None))
			},
			Query::Document { bytes, kind, source } => {
				let extractor = Extractor {
					settings: &self.cfg.extraction,
					ocr: &self.cfg.providers.ocr,
					primary: &*self.providers.primary_ocr,
					fallback: self
						.cfg
						.providers
						.ocr
						.fallback
						.as_ref()
						.map(|_| &*self.providers.fallback_ocr),
				};
				let pages = extractor.extract(bytes, *kind, source).await;

				if pages.is_empty() {
					info!(source = %source, "No text extracted from document; returning no hits.");

					return Ok(Vec::new());
				}

				let transcript =
					pages.iter().map(|page| page.text.as_str()).collect::<Vec<_>>().join(" ");
				let weighted = features::weight_features(&transcript);

				debug!(
					source = %source,
					pages = pages.len(),
					raw_chars = transcript.len(),
					weighted_chars = weighted.len(),
					"Document transcript weighted for retrieval."
				);

				// Document queries carry no natural-language intent to parse;
				// only the caller's explicit filters apply.
				let hits = self
					.retrieve(RetrievalRequest {
						query_vector_text: weighted,
						filters: explicit_filters.cloned().unwrap_or_default(),
						top_k,
					})
					.await?;

				Ok(annotate(
					hits,
					(*kind).into(),
					Some(source.clone()),
					Some(pages.len() as u32),
				))
			},
		}
	}
}

fn annotate(
	hits: Vec<RetrievalHit>,
	query_kind: QueryKind,
	source_filename: Option<String>,
	pages_extracted: Option<u32>,
) -> Vec<RoutedHit> {
	hits.into_iter()
		.map(|hit| RoutedHit {
			entity_id: hit.entity_id,
			score: hit.score,
			payload: hit.payload,
			query_kind,
			source_filename: source_filename.clone(),
			pages_extracted,
		})
		.collect()
}
