use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::{GrayImage, ImageBuffer, Luma};
use ndarray::Array2;
use tiff::encoder::{colortype, TiffEncoder};

use crate::error::{Result, WetmapError};

fn dims_u32(h: usize, w: usize) -> Result<(u32, u32)> {
    match (u32::try_from(w), u32::try_from(h)) {
        (Ok(w), Ok(h)) => Ok((w, h)),
        _ => Err(WetmapError::InvalidDimensions { width: w, height: h }),
    }
}

fn row_major<T: Copy>(data: &Array2<T>) -> Vec<T> {
    data.iter().copied().collect()
}

/// Save raw u16 values as a 16-bit grayscale image (format from extension).
pub fn save_u16(data: &Array2<u16>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let (w32, h32) = dims_u32(h, w)?;
    let img = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(w32, h32, row_major(data))
        .ok_or(WetmapError::InvalidDimensions { width: w, height: h })?;
    img.save(path)?;
    Ok(())
}

/// Save u8 values as an 8-bit grayscale image (format from extension).
pub fn save_u8(data: &Array2<u8>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let (w32, h32) = dims_u32(h, w)?;
    let img = GrayImage::from_raw(w32, h32, row_major(data))
        .ok_or(WetmapError::InvalidDimensions { width: w, height: h })?;
    img.save(path)?;
    Ok(())
}

/// Save signed 16-bit values as a TIFF.
pub fn save_i16_tiff(data: &Array2<i16>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let (w32, h32) = dims_u32(h, w)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    encoder.write_image::<colortype::GrayI16>(w32, h32, &row_major(data))?;
    Ok(())
}

/// Save 32-bit float values as a TIFF.
pub fn save_f32_tiff(data: &Array2<f32>, path: &Path) -> Result<()> {
    let (h, w) = data.dim();
    let (w32, h32) = dims_u32(h, w)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(File::create(path)?))?;
    encoder.write_image::<colortype::Gray32Float>(w32, h32, &row_major(data))?;
    Ok(())
}

/// Load a grayscale image as u16 values. 8-bit sources are rescaled to the full 16-bit range.
pub fn load_u16(path: &Path) -> Result<Array2<u16>> {
    let gray = image::open(path)?.to_luma16();
    let (w, h) = gray.dimensions();
    Array2::from_shape_vec((h as usize, w as usize), gray.into_raw()).map_err(|_| {
        WetmapError::InvalidDimensions {
            width: w as usize,
            height: h as usize,
        }
    })
}

/// Load an 8-bit grayscale image.
pub fn load_u8(path: &Path) -> Result<Array2<u8>> {
    let gray = image::open(path)?.to_luma8();
    let (w, h) = gray.dimensions();
    Array2::from_shape_vec((h as usize, w as usize), gray.into_raw()).map_err(|_| {
        WetmapError::InvalidDimensions {
            width: w as usize,
            height: h as usize,
        }
    })
}
