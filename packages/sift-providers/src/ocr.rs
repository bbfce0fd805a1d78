use std::{path::Path, time::Duration};

use reqwest::{Client, header::CONTENT_TYPE};
use serde_json::Value;
use tokio::process::Command;

use crate::{Error, Result};

/// Tesseract marks structural TSV rows (pages, blocks, lines) with this
/// confidence; they carry no token and are excluded from the average.
const NO_CONFIDENCE: f32 = -1.0;

/// Runs the Tesseract CLI over a preprocessed PNG and returns the recognized
/// text together with the mean token confidence (0-100).
///
/// Two passes are made: a plain text pass for the transcript and a TSV pass
/// for token-level confidences. The input never leaves the temp directory and
/// is removed when the call returns.
pub async fn tesseract(cfg: &sift_config::Tesseract, png: &[u8]) -> Result<(String, f32)> {
	let dir = tempfile::tempdir()?;
	let input = dir.path().join("page.png");

	tokio::fs::write(&input, png).await?;

	let text = run_tesseract(cfg, &input, None).await?;
	let tsv = run_tesseract(cfg, &input, Some("tsv")).await?;

	Ok((text, mean_confidence(&tsv)))
}

/// Sends a preprocessed PNG to the remote secondary OCR engine. The engine
/// reports text only; it has no confidence channel.
pub async fn remote(cfg: &sift_config::OcrProviderConfig, png: &[u8]) -> Result<String> {
	let client = Client::builder().timeout(Duration::from_millis(cfg.timeout_ms)).build()?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let res = client
		.post(url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.header(CONTENT_TYPE, "image/png")
		.query(&[("model", cfg.model.as_str())])
		.body(png.to_vec())
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_remote_response(json)
}

async fn run_tesseract(
	cfg: &sift_config::Tesseract,
	input: &Path,
	output_format: Option<&str>,
) -> Result<String> {
	let mut command = Command::new(&cfg.command);

	command.arg(input).arg("stdout");

	if let Some(language) = cfg.language.as_deref() {
		command.arg("-l").arg(language);
	}

	command.arg("--psm").arg(cfg.page_segmentation_mode.to_string());

	if let Some(format) = output_format {
		command.arg(format);
	}

	let output = command.output().await?;

	if !output.status.success() {
		return Err(Error::EngineFailed {
			message: format!("Tesseract exited with status {}.", output.status),
		});
	}

	Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn parse_remote_response(json: Value) -> Result<String> {
	json.get("text").and_then(|v| v.as_str()).map(|text| text.to_string()).ok_or_else(|| {
		Error::InvalidResponse { message: "OCR response is missing text field.".to_string() }
	})
}

fn mean_confidence(tsv: &str) -> f32 {
	let mut total = 0.0f32;
	let mut count = 0usize;

	for line in tsv.lines().skip(1) {
		let Some(conf) = line.split('\t').nth(10) else {
			continue;
		};
		let Ok(value) = conf.trim().parse::<f32>() else {
			continue;
		};

		if value == NO_CONFIDENCE {
			continue;
		}

		total += value;
		count += 1;
	}

	if count == 0 { 0.0 } else { total / count as f32 }
}

#[cfg(test)]
mod tests {
	use super::*;

	const TSV_HEADER: &str =
		"level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext";

	#[test]
	fn averages_token_confidences() {
		let tsv = format!(
			"{TSV_HEADER}\n\
			1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t\n\
			5\t1\t1\t1\t1\t1\t0\t0\t10\t10\t90\tincome\n\
			5\t1\t1\t1\t1\t2\t12\t0\t10\t10\t50\t$60,000"
		);

		assert_eq!(mean_confidence(&tsv), 70.0);
	}

	#[test]
	fn no_tokens_means_zero_confidence() {
		let tsv = format!("{TSV_HEADER}\n1\t1\t0\t0\t0\t0\t0\t0\t100\t100\t-1\t");

		assert_eq!(mean_confidence(&tsv), 0.0);
	}

	#[test]
	fn remote_response_requires_text_field() {
		let ok = serde_json::json!({ "text": "hello" });
		let missing = serde_json::json!({ "result": "hello" });

		assert_eq!(parse_remote_response(ok).expect("parse failed"), "hello");
		assert!(parse_remote_response(missing).is_err());
	}
}
