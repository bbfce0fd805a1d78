use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub extraction: Extraction,
	#[serde(default)]
	pub search: Search,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub llm_parser: LlmProviderConfig,
	#[serde(default)]
	pub ocr: Ocr,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	/// When false the router skips intent resolution entirely and searches
	/// with the raw query text.
	#[serde(default = "default_true")]
	pub enabled: bool,
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Ocr {
	pub tesseract: Tesseract,
	/// Secondary engine tried when the primary confidence falls below
	/// `extraction.ocr_confidence_threshold`. Optional: without it the
	/// primary output is accepted regardless of confidence.
	pub fallback: Option<OcrProviderConfig>,
}
impl Default for Ocr {
	fn default() -> Self {
		Self { tesseract: Tesseract::default(), fallback: None }
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Tesseract {
	pub command: String,
	pub language: Option<String>,
	pub page_segmentation_mode: u32,
}
impl Default for Tesseract {
	fn default() -> Self {
		Self { command: "tesseract".to_string(), language: None, page_segmentation_mode: 6 }
	}
}

#[derive(Debug, Deserialize)]
pub struct OcrProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Extraction {
	/// Pages probed for the text-density heuristic.
	pub probe_pages: u32,
	/// Non-whitespace characters across the probed pages required to treat a
	/// document as natively text-bearing.
	pub min_direct_chars: u32,
	/// Primary OCR confidence (0-100) below which the fallback engine runs.
	pub ocr_confidence_threshold: f32,
	/// Pages narrower than this are upscaled before OCR.
	pub min_ocr_width_px: u32,
	/// Rasterization resolution for scanned PDF pages.
	pub render_dpi: u32,
	pub rasterizer_command: String,
}
impl Default for Extraction {
	fn default() -> Self {
		Self {
			probe_pages: 3,
			min_direct_chars: 50,
			ocr_confidence_threshold: 60.0,
			min_ocr_width_px: 300,
			render_dpi: 144,
			rasterizer_command: "pdftoppm".to_string(),
		}
	}
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub top_k: u32,
}
impl Default for Search {
	fn default() -> Self {
		Self { top_k: 5 }
	}
}

pub(crate) fn default_true() -> bool {
	true
}
