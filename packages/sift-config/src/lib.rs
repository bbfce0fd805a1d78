mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Config, EmbeddingProviderConfig, Extraction, LlmProviderConfig, Ocr, OcrProviderConfig,
	Providers, Qdrant, Search, Service, Storage, Tesseract,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.storage.qdrant.url.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.url must be non-empty.".to_string(),
		});
	}
	if cfg.storage.qdrant.collection.trim().is_empty() {
		return Err(Error::Validation {
			message: "storage.qdrant.collection must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.embedding.api_key must be non-empty.".to_string(),
		});
	}
	if cfg.providers.llm_parser.enabled && cfg.providers.llm_parser.api_key.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.llm_parser.api_key must be non-empty when enabled.".to_string(),
		});
	}
	if let Some(fallback) = cfg.providers.ocr.fallback.as_ref()
		&& fallback.api_key.trim().is_empty()
	{
		return Err(Error::Validation {
			message: "providers.ocr.fallback.api_key must be non-empty.".to_string(),
		});
	}
	if cfg.providers.ocr.tesseract.command.trim().is_empty() {
		return Err(Error::Validation {
			message: "providers.ocr.tesseract.command must be non-empty.".to_string(),
		});
	}
	if cfg.extraction.probe_pages == 0 {
		return Err(Error::Validation {
			message: "extraction.probe_pages must be greater than zero.".to_string(),
		});
	}
	if !(0.0..=100.0).contains(&cfg.extraction.ocr_confidence_threshold) {
		return Err(Error::Validation {
			message: "extraction.ocr_confidence_threshold must be in the range 0-100.".to_string(),
		});
	}
	if cfg.extraction.min_ocr_width_px == 0 {
		return Err(Error::Validation {
			message: "extraction.min_ocr_width_px must be greater than zero.".to_string(),
		});
	}
	if cfg.extraction.render_dpi == 0 {
		return Err(Error::Validation {
			message: "extraction.render_dpi must be greater than zero.".to_string(),
		});
	}
	if cfg.extraction.rasterizer_command.trim().is_empty() {
		return Err(Error::Validation {
			message: "extraction.rasterizer_command must be non-empty.".to_string(),
		});
	}
	if cfg.search.top_k == 0 {
		return Err(Error::Validation {
			message: "search.top_k must be greater than zero.".to_string(),
		});
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.providers
		.ocr
		.tesseract
		.language
		.as_deref()
		.map(|lang| lang.trim().is_empty())
		.unwrap_or(false)
	{
		cfg.providers.ocr.tesseract.language = None;
	}
}
