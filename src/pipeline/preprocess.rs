//! Image normalisation: denoise, binarise, and edge-detect a board photo.
//!
//! ## Why spawn_blocking?
//!
//! Non-local-means denoising visits a 21×21 search window with a 7×7 patch
//! comparison for every pixel — pure CPU work that would stall a Tokio worker
//! thread for seconds. `tokio::task::spawn_blocking` moves the whole stage
//! onto the blocking pool, mirroring how the other CPU-bound stage (the OCR
//! subprocess) is handled.
//!
//! ## The chalkboard enhancement sequence
//!
//! A photographed board has three noise regimes: sensor grain (handled by
//! non-local means), salt-and-pepper speckle from chalk dust (3×3 median
//! blur), and ragged stroke boundaries after thresholding (2×2 morphological
//! opening then closing). Otsu picks the global threshold automatically;
//! when the binarised mean lands below 127 the polarity is flipped so text
//! always ends up dark-on-light regardless of board colour. A Canny edge map
//! of the blurred grayscale is kept as a diagnostic by-product; nothing
//! downstream consumes it.
//!
//! Every transform is a deterministic function of its input image, so the
//! stage is idempotent given identical input and has no side effects beyond
//! writing its three outputs into the scratch workspace.

use crate::config::ConversionConfig;
use crate::error::Board2TexError;
use image::imageops::{self, FilterType};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::contrast::otsu_level;
use imageproc::edges::canny;
use imageproc::filter::median_filter;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Paths of the three derived images written into the scratch workspace.
#[derive(Debug, Clone)]
pub struct PreprocessedImage {
    /// Colour image after non-local-means denoising.
    pub denoised: PathBuf,
    /// Binarised, morphology-cleaned image — the OCR input.
    pub enhanced: PathBuf,
    /// Canny edge map (diagnostic output, unused downstream).
    pub edges: PathBuf,
    /// Dimensions after the resize cap.
    pub width: u32,
    pub height: u32,
}

/// Normalise one board photo, writing `denoise_NN.png`, `enhanced_NN.png`,
/// and `edges_NN.png` into `work_dir`.
///
/// `index` is the image's position in the submitted batch, used only for the
/// scratch file names.
///
/// # Errors
/// [`Board2TexError::DecodeFailed`] when the source cannot be decoded; the
/// remaining steps are deterministic numeric transforms with no failure path
/// besides scratch-file I/O.
pub async fn preprocess_image(
    image_path: &Path,
    config: &ConversionConfig,
    work_dir: &Path,
    index: usize,
) -> Result<PreprocessedImage, Board2TexError> {
    let path = image_path.to_path_buf();
    let config = config.clone();
    let work_dir = work_dir.to_path_buf();

    tokio::task::spawn_blocking(move || preprocess_blocking(&path, &config, &work_dir, index))
        .await
        .map_err(|e| Board2TexError::Internal(format!("Preprocess task panicked: {}", e)))?
}

/// Blocking implementation of the normalisation pipeline.
fn preprocess_blocking(
    image_path: &Path,
    config: &ConversionConfig,
    work_dir: &Path,
    index: usize,
) -> Result<PreprocessedImage, Board2TexError> {
    let decoded = image::open(image_path).map_err(|e| Board2TexError::DecodeFailed {
        path: image_path.to_path_buf(),
        detail: e.to_string(),
    })?;
    let rgb = decoded.to_rgb8();
    info!(
        "Preprocessing image {} ({}x{})",
        image_path.display(),
        rgb.width(),
        rgb.height()
    );

    let resized = resize_to_max_side(&rgb, config.max_side);
    let (width, height) = resized.dimensions();
    if (width, height) != rgb.dimensions() {
        debug!("Resized to {}x{}", width, height);
    }

    let denoised = nlm_denoise(
        &resized,
        config.denoise_strength,
        config.denoise_template,
        config.denoise_search,
    );

    let (enhanced, blurred) = enhance_board(&denoised);
    let edges = canny(&blurred, config.canny_low, config.canny_high);

    let denoised_path = work_dir.join(format!("denoise_{:02}.png", index));
    let enhanced_path = work_dir.join(format!("enhanced_{:02}.png", index));
    let edges_path = work_dir.join(format!("edges_{:02}.png", index));

    save_image(&denoised, &denoised_path)?;
    save_image_gray(&enhanced, &enhanced_path)?;
    save_image_gray(&edges, &edges_path)?;

    debug!("Wrote enhanced image: {}", enhanced_path.display());

    Ok(PreprocessedImage {
        denoised: denoised_path,
        enhanced: enhanced_path,
        edges: edges_path,
        width,
        height,
    })
}

fn save_image(img: &RgbImage, path: &Path) -> Result<(), Board2TexError> {
    img.save(path).map_err(|e| Board2TexError::IntermediateWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

fn save_image_gray(img: &GrayImage, path: &Path) -> Result<(), Board2TexError> {
    img.save(path).map_err(|e| Board2TexError::IntermediateWriteFailed {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Cap the longest image side at `max_side` pixels, preserving aspect ratio.
///
/// Images already within the cap are returned unchanged. Downscaling uses
/// triangle filtering, which averages source pixels when minifying and so
/// avoids the aliasing a nearest-neighbour shrink would introduce into thin
/// chalk strokes.
pub fn resize_to_max_side(img: &RgbImage, max_side: u32) -> RgbImage {
    let (w, h) = img.dimensions();
    let long_side = w.max(h);
    if long_side <= max_side {
        return img.clone();
    }

    let scale = max_side as f64 / long_side as f64;
    let new_w = ((w as f64 * scale) as u32).max(1);
    let new_h = ((h as f64 * scale) as u32).max(1);
    imageops::resize(img, new_w, new_h, FilterType::Triangle)
}

/// Non-local-means colour denoising.
///
/// For each pixel, candidate pixels inside the `search`×`search` window are
/// weighted by the similarity of their surrounding `template`×`template`
/// patches (mean squared RGB difference through `exp(-d²/h²)`), and the
/// output is the weighted average of the candidates. Patch similarity over a
/// wide search window suppresses broad sensor grain while leaving stroke
/// edges — whose patches match nothing nearby — untouched.
///
/// Computed per search offset: one squared-difference image between the
/// input and its shifted copy, then a summed-area table over it, so every
/// patch distance is a single box lookup instead of a `template`² scan.
/// Patches are clamped at the image border and the distance is normalised
/// by the visible patch area.
///
/// `template` and `search` must be odd; the search window must be the larger
/// of the two (enforced by the config builder).
pub fn nlm_denoise(img: &RgbImage, strength: f32, template: u32, search: u32) -> RgbImage {
    if strength <= 0.0 {
        return img.clone();
    }

    let (w, h) = img.dimensions();
    let (wi, hi) = (w as i64, h as i64);
    let t = (template / 2) as i64;
    let s = (search / 2) as i64;
    let h2 = (strength * strength) as f64;

    let clamp_get = |x: i64, y: i64| -> &Rgb<u8> {
        img.get_pixel(x.clamp(0, wi - 1) as u32, y.clamp(0, hi - 1) as u32)
    };

    let n = (w * h) as usize;
    let mut weight_sum = vec![0.0f64; n];
    let mut acc = vec![[0.0f64; 3]; n];

    let mut sq = vec![0.0f64; n];
    let mut sat = vec![0.0f64; ((w + 1) * (h + 1)) as usize];

    for dy in -s..=s {
        for dx in -s..=s {
            for y in 0..hi {
                for x in 0..wi {
                    let a = img.get_pixel(x as u32, y as u32);
                    let b = clamp_get(x + dx, y + dy);
                    let mut d = 0.0f64;
                    for c in 0..3 {
                        let diff = a.0[c] as f64 - b.0[c] as f64;
                        d += diff * diff;
                    }
                    sq[(y * wi + x) as usize] = d;
                }
            }
            build_sat(&sq, w, h, &mut sat);

            for y in 0..hi {
                for x in 0..wi {
                    let x0 = (x - t).max(0);
                    let y0 = (y - t).max(0);
                    let x1 = (x + t).min(wi - 1);
                    let y1 = (y + t).min(hi - 1);
                    let area = ((x1 - x0 + 1) * (y1 - y0 + 1) * 3) as f64;
                    let d2 = box_sum(&sat, w, x0, y0, x1, y1) / area;

                    let weight = (-d2 / h2).exp();
                    let candidate = clamp_get(x + dx, y + dy);
                    let i = (y * wi + x) as usize;
                    weight_sum[i] += weight;
                    for c in 0..3 {
                        acc[i][c] += weight * candidate.0[c] as f64;
                    }
                }
            }
        }
    }

    let mut out = RgbImage::new(w, h);
    for y in 0..h {
        for x in 0..w {
            let i = (y as i64 * wi + x as i64) as usize;
            let ws = weight_sum[i];
            out.put_pixel(
                x,
                y,
                Rgb([
                    (acc[i][0] / ws).round().clamp(0.0, 255.0) as u8,
                    (acc[i][1] / ws).round().clamp(0.0, 255.0) as u8,
                    (acc[i][2] / ws).round().clamp(0.0, 255.0) as u8,
                ]),
            );
        }
    }

    out
}

/// Summed-area table over `vals` with a zero top row and left column,
/// written into `out` (length `(w + 1) * (h + 1)`).
fn build_sat(vals: &[f64], w: u32, h: u32, out: &mut [f64]) {
    let (w, h) = (w as usize, h as usize);
    let stride = w + 1;
    out[..stride].fill(0.0);
    for y in 0..h {
        let mut row = 0.0f64;
        out[(y + 1) * stride] = 0.0;
        for x in 0..w {
            row += vals[y * w + x];
            out[(y + 1) * stride + x + 1] = out[y * stride + x + 1] + row;
        }
    }
}

/// Sum over the inclusive pixel box `(x0, y0)..=(x1, y1)`.
fn box_sum(sat: &[f64], w: u32, x0: i64, y0: i64, x1: i64, y1: i64) -> f64 {
    let stride = (w + 1) as usize;
    let (x0, y0) = (x0 as usize, y0 as usize);
    let (x1, y1) = (x1 as usize + 1, y1 as usize + 1);
    sat[y1 * stride + x1] - sat[y0 * stride + x1] - sat[y1 * stride + x0] + sat[y0 * stride + x0]
}

/// The chalkboard enhancement: grayscale → median blur → Otsu binarisation
/// with polarity normalisation → 2×2 morphological open then close.
///
/// Returns `(enhanced, blurred)`: the cleaned binary image destined for OCR,
/// and the median-blurred grayscale the Canny stage runs on.
pub fn enhance_board(img: &RgbImage) -> (GrayImage, GrayImage) {
    let gray = imageops::grayscale(img);
    let blurred = median_filter(&gray, 1, 1);

    let level = otsu_level(&blurred);
    let mut binary = GrayImage::new(blurred.width(), blurred.height());
    for (x, y, p) in blurred.enumerate_pixels() {
        let v = if p.0[0] > level { 255u8 } else { 0u8 };
        binary.put_pixel(x, y, Luma([v]));
    }

    // Dark-dominant result means the background got classified as foreground;
    // flip so text is always dark-on-light.
    if mean_luma(&binary) < 127.0 {
        for p in binary.pixels_mut() {
            p.0[0] = 255 - p.0[0];
        }
    }

    let opened = dilate2x2(&erode2x2(&binary));
    let closed = erode2x2(&dilate2x2(&opened));

    (closed, blurred)
}

/// Mean pixel value of a grayscale image (0 for an empty image).
pub fn mean_luma(img: &GrayImage) -> f64 {
    let count = (img.width() as u64 * img.height() as u64).max(1);
    let sum: u64 = img.pixels().map(|p| p.0[0] as u64).sum();
    sum as f64 / count as f64
}

/// Erosion with a 2×2 structuring element anchored bottom-right, borders
/// replicated. A 2×2 element removes single-pixel speckle without eating
/// into strokes the way the usual 3×3 element would at this resolution.
fn erode2x2(img: &GrayImage) -> GrayImage {
    morph2x2(img, [-1, 0], u8::min, 255)
}

/// Dilation with the mirrored 2×2 window, so open/close pairs re-centre.
fn dilate2x2(img: &GrayImage) -> GrayImage {
    morph2x2(img, [0, 1], u8::max, 0)
}

fn morph2x2(img: &GrayImage, offsets: [i64; 2], fold: fn(u8, u8) -> u8, init: u8) -> GrayImage {
    let (w, h) = img.dimensions();
    let mut out = GrayImage::new(w, h);

    for y in 0..h as i64 {
        for x in 0..w as i64 {
            let mut v = init;
            for &dy in &offsets {
                for &dx in &offsets {
                    let cx = (x + dx).clamp(0, w as i64 - 1) as u32;
                    let cy = (y + dy).clamp(0, h as i64 - 1) as u32;
                    v = fold(v, img.get_pixel(cx, cy).0[0]);
                }
            }
            out.put_pixel(x as u32, y as u32, Luma([v]));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, rgb: [u8; 3]) -> RgbImage {
        RgbImage::from_pixel(w, h, Rgb(rgb))
    }

    #[test]
    fn resize_noop_under_cap() {
        let img = solid(50, 40, [120, 130, 140]);
        let out = resize_to_max_side(&img, 2000);
        assert_eq!(out.dimensions(), (50, 40));
        assert_eq!(out, img);
    }

    #[test]
    fn resize_caps_long_side_and_keeps_aspect() {
        let img = solid(400, 200, [0, 0, 0]);
        let out = resize_to_max_side(&img, 100);
        assert_eq!(out.dimensions(), (100, 50));
    }

    #[test]
    fn nlm_preserves_solid_colour() {
        let img = solid(12, 9, [77, 88, 99]);
        let out = nlm_denoise(&img, 10.0, 7, 21);
        assert_eq!(out.dimensions(), (12, 9));
        // All patches are identical, so the weighted average is the input.
        assert_eq!(out, img);
    }

    #[test]
    fn nlm_preserves_structure_against_flat_background() {
        // A hard detail has no similar patches nearby, so patch weighting
        // keeps it; the flat background averages with itself and stays put.
        let mut img = solid(15, 15, [200, 200, 200]);
        img.put_pixel(7, 7, Rgb([0, 0, 0]));
        let out = nlm_denoise(&img, 10.0, 3, 9);
        assert!(out.get_pixel(7, 7).0[0] < 100, "detail must survive");
        assert!(out.get_pixel(0, 0).0[0] >= 195, "background must stay flat");
    }

    #[test]
    fn nlm_averages_repetitive_grain_toward_the_mean() {
        // A fine 198/202 checker: every pixel has many near-identical patches
        // inside the search window, so the weighted average pulls both phases
        // toward 200.
        let img = RgbImage::from_fn(24, 24, |x, y| {
            if (x + y) % 2 == 0 {
                Rgb([198, 198, 198])
            } else {
                Rgb([202, 202, 202])
            }
        });
        let out = nlm_denoise(&img, 10.0, 3, 7);
        let centre = out.get_pixel(12, 12).0[0] as f64;
        assert!(
            (199.0..=201.0).contains(&centre),
            "expected smoothing toward 200, got {centre}"
        );
    }

    #[test]
    fn enhance_is_strictly_binary() {
        let mut img = solid(20, 20, [230, 230, 230]);
        for y in 5..15 {
            for x in 5..15 {
                img.put_pixel(x, y, Rgb([20, 20, 20]));
            }
        }
        let (enhanced, _) = enhance_board(&img);
        assert!(enhanced.pixels().all(|p| p.0[0] == 0 || p.0[0] == 255));
    }

    #[test]
    fn dark_board_polarity_is_normalised() {
        // Chalk on a dark board: thin light strokes, dark background.
        let mut img = solid(32, 32, [15, 15, 15]);
        for x in 4..28 {
            img.put_pixel(x, 10, Rgb([240, 240, 240]));
            img.put_pixel(x, 11, Rgb([240, 240, 240]));
            img.put_pixel(x, 20, Rgb([240, 240, 240]));
            img.put_pixel(x, 21, Rgb([240, 240, 240]));
        }
        let (enhanced, _) = enhance_board(&img);
        assert!(
            mean_luma(&enhanced) >= 127.0,
            "background must come out light, got mean {}",
            mean_luma(&enhanced)
        );
    }

    #[test]
    fn solid_image_has_no_edges() {
        let img = solid(30, 30, [128, 128, 128]);
        let (_, blurred) = enhance_board(&img);
        let edges = canny(&blurred, 50.0, 150.0);
        assert!(edges.pixels().all(|p| p.0[0] == 0));
    }

    #[test]
    fn open_close_removes_isolated_speckle() {
        let mut img = GrayImage::from_pixel(16, 16, Luma([255]));
        img.put_pixel(8, 8, Luma([0]));
        let opened = dilate2x2(&erode2x2(&img));
        let closed = erode2x2(&dilate2x2(&opened));
        assert_eq!(closed.get_pixel(8, 8).0[0], 255, "lone dark pixel removed");
    }
}
