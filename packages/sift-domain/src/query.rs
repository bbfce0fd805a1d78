use std::path::Path;

/// Classification of a pipeline input. Detection is total: anything that is
/// not recognizably a document is a text query.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryKind {
	Text,
	Pdf,
	Image,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentKind {
	Pdf,
	Image,
}
impl From<DocumentKind> for QueryKind {
	fn from(kind: DocumentKind) -> Self {
		match kind {
			DocumentKind::Pdf => Self::Pdf,
			DocumentKind::Image => Self::Image,
		}
	}
}

/// One pipeline input. Immutable once constructed and discarded after the
/// routing call that created it returns.
#[derive(Clone, Debug)]
pub enum Query {
	Text { raw: String },
	Document { bytes: Vec<u8>, kind: DocumentKind, source: String },
}
impl Query {
	pub fn text(raw: impl Into<String>) -> Self {
		Self::Text { raw: raw.into() }
	}

	/// Wraps a byte payload, classifying it by its source filename. Payloads
	/// without a recognized document suffix are rejected; callers should pass
	/// such inputs as [`Query::Text`].
	pub fn document(bytes: Vec<u8>, source: impl Into<String>) -> Option<Self> {
		let source = source.into();
		let kind = document_kind(&source)?;

		Some(Self::Document { bytes, kind, source })
	}

	pub fn kind(&self) -> QueryKind {
		match self {
			Self::Text { .. } => QueryKind::Text,
			Self::Document { kind, .. } => (*kind).into(),
		}
	}
}

/// Detects what kind of input a raw string is. Recognized document suffixes
/// win, whether or not the string names an existing filesystem path;
/// everything else is a text query. Never fails.
pub fn detect_kind(input: &str) -> QueryKind {
	match document_kind(input) {
		Some(kind) => kind.into(),
		None => QueryKind::Text,
	}
}

fn document_kind(name: &str) -> Option<DocumentKind> {
	let extension = Path::new(name).extension()?.to_str()?;

	if extension.eq_ignore_ascii_case("pdf") {
		return Some(DocumentKind::Pdf);
	}
	if ["png", "jpg", "jpeg", "bmp", "tiff"]
		.iter()
		.any(|suffix| extension.eq_ignore_ascii_case(suffix))
	{
		return Some(DocumentKind::Image);
	}

	None
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pdf_suffix_detects_pdf() {
		assert_eq!(detect_kind("profile.pdf"), QueryKind::Pdf);
		assert_eq!(detect_kind("reports/Q3/profile.PDF"), QueryKind::Pdf);
	}

	#[test]
	fn image_suffixes_detect_image() {
		for name in ["scan.png", "scan.jpg", "scan.jpeg", "scan.bmp", "scan.tiff"] {
			assert_eq!(detect_kind(name), QueryKind::Image, "suffix of {name}");
		}
	}

	#[test]
	fn plain_text_detects_text() {
		assert_eq!(detect_kind("Find clients with high income"), QueryKind::Text);
		assert_eq!(detect_kind(""), QueryKind::Text);
	}

	#[test]
	fn unrecognized_suffix_detects_text() {
		assert_eq!(detect_kind("notes.txt"), QueryKind::Text);
	}

	#[test]
	fn byte_payload_classifies_by_source_name() {
		let query = Query::document(vec![1, 2, 3], "scan.jpeg").expect("Expected image query.");

		assert_eq!(query.kind(), QueryKind::Image);
		assert!(Query::document(vec![1, 2, 3], "notes.txt").is_none());
	}
}
