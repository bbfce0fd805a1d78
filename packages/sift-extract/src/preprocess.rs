use std::io::Cursor;

use image::{DynamicImage, GrayImage, ImageFormat, Luma, imageops, imageops::FilterType};

use crate::Result;

/// Contrast clip factor for adaptive histogram equalization.
const CLIP_LIMIT: f32 = 2.0;
/// Tile grid used by adaptive histogram equalization, per axis.
const TILE_GRID: u32 = 8;

/// Prepares a page image for OCR. The steps run in a fixed order because
/// each one feeds the next: grayscale, upscale narrow pages to `min_width`
/// with cubic interpolation, adaptive histogram equalization, median
/// denoising, then Otsu binarization. Reordering changes OCR output.
pub fn prepare(image: &DynamicImage, min_width: u32) -> GrayImage {
	let gray = upscale_if_narrow(image.to_luma8(), min_width);
	let gray = equalize_adaptive(&gray, CLIP_LIMIT, TILE_GRID);
	let gray = median_denoise(&gray);

	binarize_otsu(&gray)
}

/// Encodes the preprocessed page as PNG for handoff to an OCR engine.
pub fn encode_png(image: &GrayImage) -> Result<Vec<u8>> {
	let mut buffer = Cursor::new(Vec::new());

	DynamicImage::ImageLuma8(image.clone()).write_to(&mut buffer, ImageFormat::Png)?;

	Ok(buffer.into_inner())
}

fn upscale_if_narrow(image: GrayImage, min_width: u32) -> GrayImage {
	let (width, height) = image.dimensions();

	if width == 0 || height == 0 || width >= min_width {
		return image;
	}

	let scale = min_width as f32 / width as f32;
	let new_height = ((height as f32 * scale).round() as u32).max(1);

	imageops::resize(&image, min_width, new_height, FilterType::CatmullRom)
}

/// Contrast-limited adaptive histogram equalization. Each grid tile gets its
/// own clipped equalization table; per-pixel values blend the four nearest
/// tile tables bilinearly so tile seams do not show.
fn equalize_adaptive(image: &GrayImage, clip_limit: f32, grid: u32) -> GrayImage {
	let (width, height) = image.dimensions();

	if width == 0 || height == 0 {
		return image.clone();
	}

	let tile_w = width.div_ceil(grid.clamp(1, width)).max(1);
	let tile_h = height.div_ceil(grid.clamp(1, height)).max(1);
	let tiles_x = width.div_ceil(tile_w);
	let tiles_y = height.div_ceil(tile_h);

	let mut tables: Vec<[u8; 256]> = Vec::with_capacity((tiles_x * tiles_y) as usize);

	for ty in 0..tiles_y {
		for tx in 0..tiles_x {
			let x0 = tx * tile_w;
			let x1 = (x0 + tile_w).min(width);
			let y0 = ty * tile_h;
			let y1 = (y0 + tile_h).min(height);
			let mut histogram = [0u32; 256];

			for y in y0..y1 {
				for x in x0..x1 {
					histogram[image.get_pixel(x, y).0[0] as usize] += 1;
				}
			}

			tables.push(tile_table(&histogram, clip_limit, (x1 - x0) * (y1 - y0)));
		}
	}

	let mut out = GrayImage::new(width, height);

	for y in 0..height {
		for x in 0..width {
			let value = image.get_pixel(x, y).0[0] as usize;
			// Tile-center coordinates; pixels in the outer half-tile clamp to
			// the border tables.
			let fx = (x as f32 + 0.5) / tile_w as f32 - 0.5;
			let fy = (y as f32 + 0.5) / tile_h as f32 - 0.5;
			let tx0 = fx.floor().clamp(0.0, (tiles_x - 1) as f32) as u32;
			let ty0 = fy.floor().clamp(0.0, (tiles_y - 1) as f32) as u32;
			let tx1 = (tx0 + 1).min(tiles_x - 1);
			let ty1 = (ty0 + 1).min(tiles_y - 1);
			let wx = (fx - tx0 as f32).clamp(0.0, 1.0);
			let wy = (fy - ty0 as f32).clamp(0.0, 1.0);
			let table = |tx: u32, ty: u32| tables[(ty * tiles_x + tx) as usize][value] as f32;
			let top = table(tx0, ty0) * (1.0 - wx) + table(tx1, ty0) * wx;
			let bottom = table(tx0, ty1) * (1.0 - wx) + table(tx1, ty1) * wx;
			let blended = top * (1.0 - wy) + bottom * wy;

			out.put_pixel(x, y, Luma([blended.round().clamp(0.0, 255.0) as u8]));
		}
	}

	out
}

fn tile_table(histogram: &[u32; 256], clip_limit: f32, area: u32) -> [u8; 256] {
	let mut histogram = *histogram;
	let clip = ((clip_limit * area as f32 / 256.0) as u32).max(1);
	let mut excess = 0u32;

	for bin in histogram.iter_mut() {
		if *bin > clip {
			excess += *bin - clip;
			*bin = clip;
		}
	}

	// Clipped mass is redistributed evenly so the table stays monotone.
	let bonus = excess / 256;

	for bin in histogram.iter_mut() {
		*bin += bonus;
	}

	let total: u32 = histogram.iter().sum();
	let scale = 255.0 / total.max(1) as f32;
	let mut table = [0u8; 256];
	let mut cumulative = 0u32;

	for (value, bin) in histogram.iter().enumerate() {
		cumulative += *bin;
		table[value] = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
	}

	table
}

fn median_denoise(image: &GrayImage) -> GrayImage {
	let (width, height) = image.dimensions();

	if width < 3 || height < 3 {
		return image.clone();
	}

	let mut out = GrayImage::new(width, height);

	for y in 0..height {
		for x in 0..width {
			let mut window = [0u8; 9];
			let mut len = 0;

			for dy in -1i64..=1 {
				for dx in -1i64..=1 {
					let nx = x as i64 + dx;
					let ny = y as i64 + dy;

					if nx < 0 || ny < 0 || nx >= width as i64 || ny >= height as i64 {
						continue;
					}

					window[len] = image.get_pixel(nx as u32, ny as u32).0[0];
					len += 1;
				}
			}

			let window = &mut window[..len];

			window.sort_unstable();
			out.put_pixel(x, y, Luma([window[len / 2]]));
		}
	}

	out
}

fn binarize_otsu(image: &GrayImage) -> GrayImage {
	let mut histogram = [0u32; 256];

	for pixel in image.pixels() {
		histogram[pixel.0[0] as usize] += 1;
	}

	let threshold = otsu_threshold(&histogram);
	let mut out = image.clone();

	for pixel in out.pixels_mut() {
		pixel.0[0] = if pixel.0[0] > threshold { 255 } else { 0 };
	}

	out
}

fn otsu_threshold(histogram: &[u32; 256]) -> u8 {
	let total: u64 = histogram.iter().map(|&count| count as u64).sum();

	if total == 0 {
		return 0;
	}

	let sum_all: u64 =
		histogram.iter().enumerate().map(|(value, &count)| value as u64 * count as u64).sum();
	let mut weight_background = 0u64;
	let mut sum_background = 0u64;
	let mut best_threshold = 0u8;
	let mut best_variance = -1.0f64;

	for value in 0..256usize {
		weight_background += histogram[value] as u64;

		if weight_background == 0 {
			continue;
		}

		let weight_foreground = total - weight_background;

		if weight_foreground == 0 {
			break;
		}

		sum_background += value as u64 * histogram[value] as u64;

		let mean_background = sum_background as f64 / weight_background as f64;
		let mean_foreground = (sum_all - sum_background) as f64 / weight_foreground as f64;
		let between = weight_background as f64
			* weight_foreground as f64
			* (mean_background - mean_foreground).powi(2);

		if between > best_variance {
			best_variance = between;
			best_threshold = value as u8;
		}
	}

	best_threshold
}
