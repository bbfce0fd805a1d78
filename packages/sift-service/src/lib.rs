mod error;

pub mod intent;
pub mod profiles;
pub mod retrieval;
pub mod route;

use std::{future::Future, pin::Pin, sync::Arc};

use qdrant_client::qdrant::{
	Filter, PointId, Query as PointQuery, QueryPointsBuilder, RetrievedPoint, ScoredPoint,
	ScrollPointsBuilder,
};
use serde_json::Value;

pub use error::{Error, Result};
pub use intent::ResolvedIntent;
pub use profiles::{CollectionStats, ProfileListRequest, ProfileListResponse, ProfileRecord};
pub use retrieval::{RetrievalHit, RetrievalRequest};
pub use route::RoutedHit;
// The OCR engine contracts live with the extractor; they are re-exported so
// embedders wire every provider from one place.
pub use sift_extract::{FallbackOcr, OcrReading, PrimaryOcr};

use sift_config::{Config, EmbeddingProviderConfig, LlmProviderConfig};
use sift_storage::qdrant::QdrantStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

pub trait ChatProvider
where
	Self: Send + Sync,
{
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>>;
}

/// Pages returned by one scroll step plus the cursor for the next one.
pub struct ScrollResult {
	pub points: Vec<RetrievedPoint>,
	pub next_offset: Option<PointId>,
}

/// Thin seam over the vector-database collaborator. The default
/// implementation talks to Qdrant; tests substitute a stub so the pipeline
/// runs without a live server.
pub trait VectorSearch
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		store: &'a QdrantStore,
		vector: Vec<f32>,
		filter: Option<Filter>,
		limit: u64,
	) -> BoxFuture<'a, Result<Vec<ScoredPoint>>>;

	fn scroll<'a>(
		&'a self,
		store: &'a QdrantStore,
		filter: Option<Filter>,
		limit: u32,
		offset: Option<PointId>,
	) -> BoxFuture<'a, Result<ScrollResult>>;

	fn point_count<'a>(&'a self, store: &'a QdrantStore) -> BoxFuture<'a, Result<u64>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub chat: Arc<dyn ChatProvider>,
	pub primary_ocr: Arc<dyn PrimaryOcr>,
	pub fallback_ocr: Arc<dyn FallbackOcr>,
	pub vector_search: Arc<dyn VectorSearch>,
}

/// The process-wide service bundle: configuration, the Qdrant handle, and
/// every external collaborator behind a trait. Constructed once at process
/// start and shared by reference; individual routing calls hold no state of
/// their own.
pub struct SiftService {
	pub cfg: Config,
	pub qdrant: QdrantStore,
	pub providers: Providers,
}

struct DefaultProviders;

impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		chat: Arc<dyn ChatProvider>,
		primary_ocr: Arc<dyn PrimaryOcr>,
		fallback_ocr: Arc<dyn FallbackOcr>,
		vector_search: Arc<dyn VectorSearch>,
	) -> Self {
		Self { embedding, chat, primary_ocr, fallback_ocr, vector_search }
	}
}

impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self {
			embedding: provider.clone(),
			chat: provider.clone(),
			primary_ocr: provider.clone(),
			fallback_ocr: provider.clone(),
			vector_search: provider,
		}
	}
}

impl SiftService {
	pub fn new(cfg: Config, qdrant: QdrantStore) -> Self {
		Self { cfg, qdrant, providers: Providers::default() }
	}

	pub fn with_providers(cfg: Config, qdrant: QdrantStore, providers: Providers) -> Self {
		Self { cfg, qdrant, providers }
	}
}

impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(sift_providers::embedding::embed(cfg, texts).await?) })
	}
}

impl ChatProvider for DefaultProviders {
	fn complete<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		messages: &'a [Value],
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(sift_providers::chat::complete(cfg, messages).await?) })
	}
}

impl PrimaryOcr for DefaultProviders {
	fn recognize<'a>(
		&'a self,
		cfg: &'a sift_config::Tesseract,
		png: &'a [u8],
	) -> sift_extract::BoxFuture<'a, sift_extract::Result<OcrReading>> {
		Box::pin(async move {
			let (text, confidence) = sift_providers::ocr::tesseract(cfg, png)
				.await
				.map_err(|err| sift_extract::Error::Engine { message: err.to_string() })?;

			Ok(OcrReading { text, confidence })
		})
	}
}

impl FallbackOcr for DefaultProviders {
	fn recognize<'a>(
		&'a self,
		cfg: &'a sift_config::OcrProviderConfig,
		png: &'a [u8],
	) -> sift_extract::BoxFuture<'a, sift_extract::Result<String>> {
		Box::pin(async move {
			sift_providers::ocr::remote(cfg, png)
				.await
				.map_err(|err| sift_extract::Error::Engine { message: err.to_string() })
		})
	}
}

impl VectorSearch for DefaultProviders {
	fn search<'a>(
		&'a self,
		store: &'a QdrantStore,
		vector: Vec<f32>,
		filter: Option<Filter>,
		limit: u64,
	) -> BoxFuture<'a, Result<Vec<ScoredPoint>>> {
		Box::pin(async move {
			let mut search = QueryPointsBuilder::new(store.collection.clone())
				.query(PointQuery::new_nearest(vector))
				.limit(limit)
				.with_payload(true);

			if let Some(filter) = filter {
				search = search.filter(filter);
			}

			let response = store
				.client
				.query(search)
				.await
				.map_err(|err| Error::Qdrant { message: err.to_string() })?;

			Ok(response.result)
		})
	}

	fn scroll<'a>(
		&'a self,
		store: &'a QdrantStore,
		filter: Option<Filter>,
		limit: u32,
		offset: Option<PointId>,
	) -> BoxFuture<'a, Result<ScrollResult>> {
		Box::pin(async move {
			let mut scroll = ScrollPointsBuilder::new(store.collection.clone())
				.limit(limit)
				.with_payload(true)
				.with_vectors(false);

			if let Some(filter) = filter {
				scroll = scroll.filter(filter);
			}
			if let Some(offset) = offset {
				scroll = scroll.offset(offset);
			}

			let response = store
				.client
				.scroll(scroll)
				.await
				.map_err(|err| Error::Qdrant { message: err.to_string() })?;

			Ok(ScrollResult { points: response.result, next_offset: response.next_page_offset })
		})
	}

	fn point_count<'a>(&'a self, store: &'a QdrantStore) -> BoxFuture<'a, Result<u64>> {
		Box::pin(async move {
			let response = store
				.client
				.collection_info(store.collection.clone())
				.await
				.map_err(|err| Error::Qdrant { message: err.to_string() })?;

			Ok(response.result.and_then(|info| info.points_count).unwrap_or(0))
		})
	}
}
