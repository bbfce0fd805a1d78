use std::sync::atomic::{AtomicUsize, Ordering};

use image::{DynamicImage, GrayImage, Luma};
use sift_config::{Extraction, Ocr, OcrProviderConfig, Tesseract};
use sift_domain::query::DocumentKind;
use sift_extract::{
	BoxFuture, Extractor, ExtractionMethod, FallbackOcr, OcrReading, PrimaryOcr, Result,
};

struct FixedPrimary {
	text: String,
	confidence: f32,
	calls: AtomicUsize,
}
impl FixedPrimary {
	fn new(text: &str, confidence: f32) -> Self {
		Self { text: text.to_string(), confidence, calls: AtomicUsize::new(0) }
	}

	fn count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl PrimaryOcr for FixedPrimary {
	fn recognize<'a>(
		&'a self,
		_cfg: &'a Tesseract,
		_png: &'a [u8],
	) -> BoxFuture<'a, Result<OcrReading>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let reading = OcrReading { text: self.text.clone(), confidence: self.confidence };

		Box::pin(async move { Ok(reading) })
	}
}

struct FixedFallback {
	text: String,
	calls: AtomicUsize,
}
impl FixedFallback {
	fn new(text: &str) -> Self {
		Self { text: text.to_string(), calls: AtomicUsize::new(0) }
	}

	fn count(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl FallbackOcr for FixedFallback {
	fn recognize<'a>(
		&'a self,
		_cfg: &'a OcrProviderConfig,
		_png: &'a [u8],
	) -> BoxFuture<'a, Result<String>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		let text = self.text.clone();

		Box::pin(async move { Ok(text) })
	}
}

fn ocr_with_fallback() -> Ocr {
	Ocr {
		tesseract: Tesseract::default(),
		fallback: Some(OcrProviderConfig {
			provider_id: "p".to_string(),
			api_base: "http://localhost".to_string(),
			api_key: "key".to_string(),
			path: "/v1/ocr".to_string(),
			model: "m".to_string(),
			timeout_ms: 1_000,
			default_headers: serde_json::Map::new(),
		}),
	}
}

fn image_fixture() -> Vec<u8> {
	let image = GrayImage::from_fn(64, 32, |x, y| if (x + y) % 2 == 0 { Luma([0]) } else { Luma([255]) });
	let mut buffer = std::io::Cursor::new(Vec::new());

	DynamicImage::ImageLuma8(image)
		.write_to(&mut buffer, image::ImageFormat::Png)
		.expect("Failed to encode fixture image.");

	buffer.into_inner()
}

#[tokio::test]
async fn low_confidence_primary_defers_to_longer_fallback_text() {
	let settings = Extraction::default();
	let ocr = ocr_with_fallback();
	let primary_text = "p".repeat(60);
	let fallback_text = "f".repeat(80);
	let primary = FixedPrimary::new(&primary_text, 45.0);
	let fallback = FixedFallback::new(&fallback_text);
	let extractor = Extractor {
		settings: &settings,
		ocr: &ocr,
		primary: &primary,
		fallback: Some(&fallback),
	};
	let pages = extractor.extract(&image_fixture(), DocumentKind::Image, "scan.png").await;

	assert_eq!(pages.len(), 1);
	assert_eq!(pages[0].page_number, 1);
	assert_eq!(pages[0].method, ExtractionMethod::Ocr);
	assert_eq!(pages[0].text, fallback_text);
	assert_eq!(primary.count(), 1);
	assert_eq!(fallback.count(), 1);
}

#[tokio::test]
async fn confident_primary_output_skips_the_fallback_engine() {
	let settings = Extraction::default();
	let ocr = ocr_with_fallback();
	let primary = FixedPrimary::new("Annual Income: $60,000", 88.0);
	let fallback = FixedFallback::new("should never be used");
	let extractor = Extractor {
		settings: &settings,
		ocr: &ocr,
		primary: &primary,
		fallback: Some(&fallback),
	};
	let pages = extractor.extract(&image_fixture(), DocumentKind::Image, "scan.png").await;

	assert_eq!(pages.len(), 1);
	assert_eq!(pages[0].text, "Annual Income: $60,000");
	assert_eq!(fallback.count(), 0);
}

#[tokio::test]
async fn missing_fallback_engine_accepts_low_confidence_primary() {
	let settings = Extraction::default();
	let ocr = Ocr::default();
	let primary = FixedPrimary::new("noisy but kept", 10.0);
	let extractor = Extractor { settings: &settings, ocr: &ocr, primary: &primary, fallback: None };
	let pages = extractor.extract(&image_fixture(), DocumentKind::Image, "scan.png").await;

	assert_eq!(pages.len(), 1);
	assert_eq!(pages[0].text, "noisy but kept");
}

#[tokio::test]
async fn blank_ocr_output_contributes_no_page() {
	let settings = Extraction::default();
	let ocr = Ocr::default();
	let primary = FixedPrimary::new("   \n", 95.0);
	let extractor = Extractor { settings: &settings, ocr: &ocr, primary: &primary, fallback: None };
	let pages = extractor.extract(&image_fixture(), DocumentKind::Image, "scan.png").await;

	assert!(pages.is_empty());
}

#[tokio::test]
async fn unopenable_pdf_yields_an_empty_sequence() {
	let mut settings = Extraction::default();

	// A bogus rasterizer keeps the scanned path hermetic too.
	settings.rasterizer_command = "sift-missing-rasterizer".to_string();

	let ocr = Ocr::default();
	let primary = FixedPrimary::new("never reached", 99.0);
	let extractor = Extractor { settings: &settings, ocr: &ocr, primary: &primary, fallback: None };
	let pages = extractor.extract(b"", DocumentKind::Pdf, "broken.pdf").await;

	assert!(pages.is_empty());
	assert_eq!(primary.count(), 0);
}

#[tokio::test]
async fn undecodable_image_yields_an_empty_sequence() {
	let settings = Extraction::default();
	let ocr = Ocr::default();
	let primary = FixedPrimary::new("never reached", 99.0);
	let extractor = Extractor { settings: &settings, ocr: &ocr, primary: &primary, fallback: None };
	let pages = extractor.extract(b"not an image", DocumentKind::Image, "scan.png").await;

	assert!(pages.is_empty());
	assert_eq!(primary.count(), 0);
}
