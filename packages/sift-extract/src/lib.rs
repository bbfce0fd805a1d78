mod error;

pub mod pdf;
pub mod preprocess;

pub use error::{Error, Result};

use std::{future::Future, pin::Pin};

use image::DynamicImage;
use sift_domain::query::DocumentKind;
use tracing::{debug, warn};
use uuid::Uuid;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// How a page's text was obtained.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMethod {
	Direct,
	Ocr,
}

/// One extracted page. Page numbers are 1-based and strictly increasing
/// within a document; pages that yield no text are omitted entirely rather
/// than zero-padded.
#[derive(Clone, Debug)]
pub struct ExtractedPage {
	pub source_id: Uuid,
	pub page_number: u32,
	pub method: ExtractionMethod,
	pub text: String,
}

/// Output of the primary OCR engine. Confidence is the mean token confidence
/// on a 0-100 scale.
#[derive(Clone, Debug)]
pub struct OcrReading {
	pub text: String,
	pub confidence: f32,
}

pub trait PrimaryOcr: Send + Sync {
	fn recognize<'a>(
		&'a self,
		cfg: &'a sift_config::Tesseract,
		png: &'a [u8],
	) -> BoxFuture<'a, Result<OcrReading>>;
}

pub trait FallbackOcr: Send + Sync {
	fn recognize<'a>(
		&'a self,
		cfg: &'a sift_config::OcrProviderConfig,
		png: &'a [u8],
	) -> BoxFuture<'a, Result<String>>;
}

/// Per-document extraction state. A document is probed once, commits to one
/// extraction mode, and finishes; there is no restart.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DocumentState {
	Undetermined,
	TextMode,
	ScannedMode,
	Done,
}

/// Document-to-text extractor. OCR engines are injected so the mode and
/// fallback decisions stay testable without any engine installed. Extraction
/// never fails: unreadable documents and pages degrade to omission.
pub struct Extractor<'a> {
	pub settings: &'a sift_config::Extraction,
	pub ocr: &'a sift_config::Ocr,
	pub primary: &'a dyn PrimaryOcr,
	pub fallback: Option<&'a dyn FallbackOcr>,
}

impl Extractor<'_> {
	pub async fn extract(
		&self,
		bytes: &[u8],
		kind: DocumentKind,
		source: &str,
	) -> Vec<ExtractedPage> {
		let pages = match kind {
			DocumentKind::Pdf => self.extract_pdf(bytes, source).await,
			DocumentKind::Image => self.extract_image(bytes, source).await,
		};

		debug!(source, pages = pages.len(), "Document extraction finished.");

		pages
	}

	async fn extract_pdf(&self, bytes: &[u8], source: &str) -> Vec<ExtractedPage> {
		let mut state = DocumentState::Undetermined;
		let mut direct_texts = Vec::new();
		let mut pages = Vec::new();

		while state != DocumentState::Done {
			state = match state {
				DocumentState::Undetermined => match pdf::page_texts(bytes) {
					Ok(texts) =>
						if text_bearing(&texts, self.settings) {
							direct_texts = texts;

							DocumentState::TextMode
						} else {
							DocumentState::ScannedMode
						},
					Err(err) => {
						warn!(
							source,
							error = %err,
							"Direct text probe failed; treating document as scanned."
						);

						DocumentState::ScannedMode
					},
				},
				DocumentState::TextMode => {
					pages = direct_pages(std::mem::take(&mut direct_texts));

					DocumentState::Done
				},
				DocumentState::ScannedMode => {
					pages = self.ocr_pdf(bytes, source).await;

					DocumentState::Done
				},
				DocumentState::Done => DocumentState::Done,
			};
		}

		pages
	}

	async fn extract_image(&self, bytes: &[u8], source: &str) -> Vec<ExtractedPage> {
		let image = match image::load_from_memory(bytes) {
			Ok(image) => image,
			Err(err) => {
				warn!(source, error = %err, "Image failed to decode; no pages extracted.");

				return Vec::new();
			},
		};

		match self.ocr_page(&image, source, 1).await {
			Some(text) => vec![ExtractedPage {
				source_id: Uuid::new_v4(),
				page_number: 1,
				method: ExtractionMethod::Ocr,
				text,
			}],
			None => Vec::new(),
		}
	}

	async fn ocr_pdf(&self, bytes: &[u8], source: &str) -> Vec<ExtractedPage> {
		let rendered = match pdf::rasterize(
			&self.settings.rasterizer_command,
			self.settings.render_dpi,
			bytes,
		)
		.await
		{
			Ok(rendered) => rendered,
			Err(err) => {
				warn!(source, error = %err, "Rasterization failed; no pages extracted.");

				return Vec::new();
			},
		};

		// Pages are independent, but they are processed sequentially and
		// collected in page order so the final concatenation is stable.
		let mut pages = Vec::new();

		for (page_number, image) in rendered {
			if let Some(text) = self.ocr_page(&image, source, page_number).await {
				pages.push(ExtractedPage {
					source_id: Uuid::new_v4(),
					page_number,
					method: ExtractionMethod::Ocr,
					text,
				});
			}
		}

		pages
	}

	async fn ocr_page(
		&self,
		image: &DynamicImage,
		source: &str,
		page_number: u32,
	) -> Option<String> {
		let prepared = preprocess::prepare(image, self.settings.min_ocr_width_px);
		let png = match preprocess::encode_png(&prepared) {
			Ok(png) => png,
			Err(err) => {
				warn!(
					source,
					page = page_number,
					error = %err,
					"Failed to encode preprocessed page."
				);

				return None;
			},
		};
		let reading = match self.primary.recognize(&self.ocr.tesseract, &png).await {
			Ok(reading) => reading,
			Err(err) => {
				warn!(source, page = page_number, error = %err, "Primary OCR engine failed.");

				OcrReading { text: String::new(), confidence: 0.0 }
			},
		};
		let text = if reading.confidence >= self.settings.ocr_confidence_threshold {
			reading.text
		} else {
			match (self.fallback, self.ocr.fallback.as_ref()) {
				(Some(engine), Some(cfg)) => {
					debug!(
						source,
						page = page_number,
						confidence = reading.confidence,
						"Low primary confidence; trying fallback engine."
					);

					match engine.recognize(cfg, &png).await {
						Ok(fallback_text) => select_longer(reading.text, fallback_text),
						Err(err) => {
							warn!(
								source,
								page = page_number,
								error = %err,
								"Fallback OCR engine failed."
							);

							reading.text
						},
					}
				},
				_ => reading.text,
			}
		};

		if text.trim().is_empty() { None } else { Some(text) }
	}
}

/// Maps positional page texts to extracted pages, keeping original page
/// numbers and dropping pages without text.
fn direct_pages(texts: Vec<String>) -> Vec<ExtractedPage> {
	texts
		.into_iter()
		.enumerate()
		.filter(|(_, text)| !text.trim().is_empty())
		.map(|(index, text)| ExtractedPage {
			source_id: Uuid::new_v4(),
			page_number: index as u32 + 1,
			method: ExtractionMethod::Direct,
			text,
		})
		.collect()
}

/// The text-density heuristic: the document is natively text-bearing when
/// its first probed pages carry enough non-whitespace characters.
fn text_bearing(texts: &[String], settings: &sift_config::Extraction) -> bool {
	let probed: usize = texts
		.iter()
		.take(settings.probe_pages as usize)
		.map(|text| text.chars().filter(|ch| !ch.is_whitespace()).count())
		.sum();

	probed >= settings.min_direct_chars as usize
}

/// Keeps whichever engine produced the longer text; ties favor the primary.
fn select_longer(primary: String, fallback: String) -> String {
	if fallback.len() > primary.len() { fallback } else { primary }
}
