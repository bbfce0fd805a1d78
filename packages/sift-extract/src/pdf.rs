use std::path::Path;

use image::DynamicImage;
use tokio::process::Command;
use tracing::warn;

use crate::{Error, Result};

/// Extracts the text layer of every page. Pages without a text layer come
/// back as empty strings so page numbering stays positional.
pub fn page_texts(bytes: &[u8]) -> Result<Vec<String>> {
	pdf_extract::extract_text_from_mem_by_pages(bytes)
		.map_err(|err| Error::Pdf { message: err.to_string() })
}

/// Rasterizes every page to an image via the configured `pdftoppm` binary,
/// returning `(page_number, image)` pairs in page order. Pages that render
/// but fail to decode are skipped.
pub async fn rasterize(
	command: &str,
	dpi: u32,
	bytes: &[u8],
) -> Result<Vec<(u32, DynamicImage)>> {
	let dir = tempfile::tempdir()?;
	let input = dir.path().join("document.pdf");

	tokio::fs::write(&input, bytes).await?;

	let prefix = dir.path().join("page");
	let output = Command::new(command)
		.arg("-png")
		.arg("-r")
		.arg(dpi.to_string())
		.arg(&input)
		.arg(&prefix)
		.output()
		.await?;

	if !output.status.success() {
		return Err(Error::Rasterize {
			message: format!(
				"Rasterizer exited with status {}: {}",
				output.status,
				String::from_utf8_lossy(&output.stderr).trim()
			),
		});
	}

	let mut pages = Vec::new();

	for entry in std::fs::read_dir(dir.path())? {
		let path = entry?.path();
		let Some(page_number) = page_number_from_name(&path) else {
			continue;
		};

		match image::open(&path) {
			Ok(image) => pages.push((page_number, image)),
			Err(err) => {
				warn!(page = page_number, error = %err, "Rasterized page failed to decode.");
			},
		}
	}

	pages.sort_by_key(|(page_number, _)| *page_number);

	Ok(pages)
}

/// Parses the page ordinal out of a `page-<n>.png` rasterizer output name.
/// The ordinal may be zero-padded depending on the document's page count.
fn page_number_from_name(path: &Path) -> Option<u32> {
	let name = path.file_name()?.to_str()?;
	let ordinal = name.strip_prefix("page-")?.strip_suffix(".png")?;

	ordinal.parse().ok()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_page_ordinals_with_and_without_padding() {
		assert_eq!(page_number_from_name(Path::new("/tmp/x/page-1.png")), Some(1));
		assert_eq!(page_number_from_name(Path::new("/tmp/x/page-07.png")), Some(7));
		assert_eq!(page_number_from_name(Path::new("/tmp/x/document.pdf")), None);
	}

	#[test]
	fn garbage_bytes_are_not_a_pdf() {
		assert!(page_texts(b"not a pdf at all").is_err());
	}
}
