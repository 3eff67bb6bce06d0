//! Sheet Layout Engine
//!
//! Tiles one normalized photo onto a fixed 4x6in print sheet at
//! 300 DPI. Photo sizes are given in inches; the two known presets
//! (passport and joint) use fixed grids, anything else gets an
//! auto-computed grid capped at 12 photos per sheet.

use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Rgb, RgbImage};

use crate::error::ProcessError;

/// Print resolution; process-wide constant, not per-request config.
pub const DPI: f64 = 300.0;

/// 4in x 6in sheet at 300 DPI.
pub const SHEET_WIDTH_PX: u32 = 1200;
pub const SHEET_HEIGHT_PX: u32 = 1800;

/// Hard cap on placed photos, regardless of how many would fit.
pub const MAX_PHOTOS_PER_SHEET: usize = 12;

pub const PASSPORT_WIDTH_IN: f64 = 1.2;
pub const PASSPORT_HEIGHT_IN: f64 = 1.4;
pub const JOINT_WIDTH_IN: f64 = 1.9;
pub const JOINT_HEIGHT_IN: f64 = 1.4;

/// Outer sheet margin for the passport grid and all auto layouts.
const AUTO_MARGIN_PX: i64 = 20;
/// Outer sheet margin for the fixed 8-up joint grid.
const JOINT_MARGIN_PX: i64 = 15;

/// Anything past this per-edge pixel count is treated as absurd input.
const MAX_PHOTO_EDGE_PX: u32 = 30_000;

const PRESET_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Preset {
    Passport,
    Joint,
}

/// Physical photo size in inches, validated on construction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhotoSize {
    width_in: f64,
    height_in: f64,
}

impl PhotoSize {
    pub fn new(width_in: f64, height_in: f64) -> Result<Self, ProcessError> {
        for (axis, value) in [("width", width_in), ("height", height_in)] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ProcessError::InvalidDimensions(format!(
                    "photo {} must be a positive number of inches, got {}",
                    axis, value
                )));
            }
        }

        let size = PhotoSize {
            width_in,
            height_in,
        };
        let (width_px, height_px) = (size.width_px(), size.height_px());

        if width_px < 1 || height_px < 1 {
            return Err(ProcessError::InvalidDimensions(format!(
                "photo {}x{}in is smaller than one pixel at {} DPI",
                width_in, height_in, DPI
            )));
        }
        if width_px > MAX_PHOTO_EDGE_PX || height_px > MAX_PHOTO_EDGE_PX {
            return Err(ProcessError::InvalidDimensions(format!(
                "photo {}x{}in exceeds the supported size",
                width_in, height_in
            )));
        }

        Ok(size)
    }

    pub fn passport() -> Self {
        PhotoSize {
            width_in: PASSPORT_WIDTH_IN,
            height_in: PASSPORT_HEIGHT_IN,
        }
    }

    pub fn joint() -> Self {
        PhotoSize {
            width_in: JOINT_WIDTH_IN,
            height_in: JOINT_HEIGHT_IN,
        }
    }

    pub fn width_px(&self) -> u32 {
        (self.width_in * DPI).round() as u32
    }

    pub fn height_px(&self) -> u32 {
        (self.height_in * DPI).round() as u32
    }

    fn approx_eq(&self, other: PhotoSize) -> bool {
        (self.width_in - other.width_in).abs() < PRESET_EPSILON
            && (self.height_in - other.height_in).abs() < PRESET_EPSILON
    }

    fn preset(&self) -> Option<Preset> {
        if self.approx_eq(Self::passport()) {
            Some(Preset::Passport)
        } else if self.approx_eq(Self::joint()) {
            Some(Preset::Joint)
        } else {
            None
        }
    }
}

/// Computed grid for one sheet: cell counts, outer margin and the
/// inter-photo spacing per axis. Derived per request, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetLayout {
    pub columns: u32,
    pub rows: u32,
    pub margin: i64,
    pub spacing_x: i64,
    pub spacing_y: i64,
    pub photo_width: u32,
    pub photo_height: u32,
}

impl SheetLayout {
    pub fn for_photo(size: PhotoSize) -> Self {
        let photo_width = size.width_px() as i64;
        let photo_height = size.height_px() as i64;

        let (columns, rows, margin) = match size.preset() {
            Some(Preset::Passport) => (3, 4, AUTO_MARGIN_PX),
            Some(Preset::Joint) => (2, 4, JOINT_MARGIN_PX),
            None => {
                let available_width = SHEET_WIDTH_PX as i64 - 2 * AUTO_MARGIN_PX;
                let available_height = SHEET_HEIGHT_PX as i64 - 2 * AUTO_MARGIN_PX;
                let columns = available_width.div_euclid(photo_width).max(1);
                let rows = available_height.div_euclid(photo_height).max(1);

                // More cells than one sheet holds: fall back to the fixed
                // passport grid while keeping the custom pixel size. A
                // photo larger than the passport cell then overflows its
                // cell; that overflow is the documented behavior, not
                // something to correct here.
                if columns * rows > MAX_PHOTOS_PER_SHEET as i64 {
                    (3, 4, AUTO_MARGIN_PX)
                } else {
                    (columns, rows, AUTO_MARGIN_PX)
                }
            }
        };

        SheetLayout {
            columns: columns as u32,
            rows: rows as u32,
            margin,
            spacing_x: Self::axis_spacing(SHEET_WIDTH_PX as i64, columns, photo_width, margin),
            spacing_y: Self::axis_spacing(SHEET_HEIGHT_PX as i64, rows, photo_height, margin),
            photo_width: photo_width as u32,
            photo_height: photo_height as u32,
        }
    }

    /// Remaining space after margins split evenly across `count + 1`
    /// gaps; a single column or row is centered instead. div_euclid
    /// keeps flooring semantics when the photo is wider than its cell
    /// and the spacing goes negative.
    fn axis_spacing(sheet: i64, count: i64, photo: i64, margin: i64) -> i64 {
        if count == 1 {
            (sheet - 2 * margin - photo).div_euclid(2)
        } else {
            (sheet - count * photo - 2 * margin).div_euclid(count + 1)
        }
    }

    /// Number of photos a render will place.
    pub fn capacity(&self) -> usize {
        ((self.columns * self.rows) as usize).min(MAX_PHOTOS_PER_SHEET)
    }

    /// Pixel offset of the cell at (column, row).
    pub fn position(&self, column: u32, row: u32) -> (i64, i64) {
        let x = if self.columns == 1 {
            self.margin + self.spacing_x
        } else {
            self.margin + column as i64 * (self.photo_width as i64 + self.spacing_x)
        };
        let y = if self.rows == 1 {
            self.margin + self.spacing_y
        } else {
            self.margin + row as i64 * (self.photo_height as i64 + self.spacing_y)
        };
        (x, y)
    }
}

/// A finished sheet plus the number of photos actually placed.
pub struct RenderedSheet {
    pub image: RgbImage,
    pub placed: usize,
}

/// Resizes the photo to its exact pixel size and tiles it onto a white
/// sheet in row-major order, stopping once the cap is hit.
pub fn render_sheet(photo: &DynamicImage, size: PhotoSize) -> RenderedSheet {
    let layout = SheetLayout::for_photo(size);

    let tile = photo
        .resize_exact(layout.photo_width, layout.photo_height, FilterType::Lanczos3)
        .to_rgb8();

    let mut sheet: RgbImage =
        ImageBuffer::from_pixel(SHEET_WIDTH_PX, SHEET_HEIGHT_PX, Rgb([255, 255, 255]));

    let capacity = layout.capacity();
    let mut placed = 0;
    'rows: for row in 0..layout.rows {
        for column in 0..layout.columns {
            if placed >= capacity {
                break 'rows;
            }
            let (x, y) = layout.position(column, row);
            imageops::overlay(&mut sheet, &tile, x, y);
            placed += 1;
        }
    }

    RenderedSheet {
        image: sheet,
        placed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_photo(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([80, 60, 40])))
    }

    #[test]
    fn test_photo_size_validation() {
        assert!(PhotoSize::new(1.2, 1.4).is_ok());
        assert!(matches!(
            PhotoSize::new(0.0, 1.4),
            Err(ProcessError::InvalidDimensions(_))
        ));
        assert!(matches!(
            PhotoSize::new(1.2, -1.0),
            Err(ProcessError::InvalidDimensions(_))
        ));
        assert!(matches!(
            PhotoSize::new(f64::NAN, 1.4),
            Err(ProcessError::InvalidDimensions(_))
        ));
        assert!(matches!(
            PhotoSize::new(0.001, 1.4),
            Err(ProcessError::InvalidDimensions(_))
        ));
        assert!(matches!(
            PhotoSize::new(500.0, 1.4),
            Err(ProcessError::InvalidDimensions(_))
        ));
    }

    #[test]
    fn test_one_inch_photo_is_300px() {
        let size = PhotoSize::new(1.0, 1.0).unwrap();
        assert_eq!(size.width_px(), 300);
        assert_eq!(size.height_px(), 300);
    }

    #[test]
    fn test_passport_layout() {
        let layout = SheetLayout::for_photo(PhotoSize::passport());

        assert_eq!((layout.columns, layout.rows), (3, 4));
        assert_eq!(layout.margin, 20);
        assert_eq!((layout.photo_width, layout.photo_height), (360, 420));
        // (1200 - 3*360 - 2*20) / 4 and (1800 - 4*420 - 2*20) / 5
        assert_eq!(layout.spacing_x, 20);
        assert_eq!(layout.spacing_y, 16);
        assert_eq!(layout.capacity(), 12);
        assert_eq!(layout.position(0, 0), (20, 20));
        assert_eq!(layout.position(2, 3), (20 + 2 * 380, 20 + 3 * 436));
    }

    #[test]
    fn test_joint_layout() {
        let layout = SheetLayout::for_photo(PhotoSize::joint());

        assert_eq!((layout.columns, layout.rows), (2, 4));
        assert_eq!(layout.margin, 15);
        assert_eq!((layout.photo_width, layout.photo_height), (570, 420));
        // (1200 - 2*570 - 2*15) / 3 and (1800 - 4*420 - 2*15) / 5
        assert_eq!(layout.spacing_x, 10);
        assert_eq!(layout.spacing_y, 18);
        assert_eq!(layout.capacity(), 8);
    }

    #[test]
    fn test_custom_grid_fits_available_space() {
        // 450x480px photo: floor(1160/450) = 2 columns, floor(1760/480) = 3 rows
        let size = PhotoSize::new(1.5, 1.6).unwrap();
        let layout = SheetLayout::for_photo(size);

        assert_eq!((layout.columns, layout.rows), (2, 3));
        assert_eq!(layout.margin, 20);
        assert_eq!(layout.capacity(), 6);
    }

    #[test]
    fn test_custom_grid_over_cap_falls_back_to_passport_grid() {
        // 384x330px photo would fit 3x5 = 15 cells; capped back to 3x4
        // with the custom pixel size kept, even though 384 > 360.
        let size = PhotoSize::new(1.28, 1.1).unwrap();
        let layout = SheetLayout::for_photo(size);

        assert_eq!((layout.columns, layout.rows), (3, 4));
        assert_eq!((layout.photo_width, layout.photo_height), (384, 330));
        assert_eq!(layout.capacity(), 12);
    }

    #[test]
    fn test_fallback_spacing_can_go_negative() {
        // 232x450px photo: naive grid 5x3 = 15 cells, capped to 3x4.
        // Four 450px rows plus margins exceed the sheet height, so the
        // vertical spacing floors to a negative value.
        let size = PhotoSize::new(232.0 / 300.0, 1.5).unwrap();
        let layout = SheetLayout::for_photo(size);

        assert_eq!((layout.columns, layout.rows), (3, 4));
        assert_eq!(layout.spacing_y, -8);

        let rendered = render_sheet(&sample_photo(232, 450), size);
        assert_eq!(rendered.placed, 12);
    }

    #[test]
    fn test_single_column_is_centered() {
        // 600x600px photo: one column, two rows.
        let size = PhotoSize::new(2.0, 2.0).unwrap();
        let layout = SheetLayout::for_photo(size);

        assert_eq!((layout.columns, layout.rows), (1, 2));
        // (1200 - 2*20 - 600) / 2 = 280, centered at margin + spacing
        assert_eq!(layout.spacing_x, 280);
        assert_eq!(layout.position(0, 0).0, 300);
    }

    #[test]
    fn test_render_passport_sheet() {
        let rendered = render_sheet(&sample_photo(600, 700), PhotoSize::passport());

        assert_eq!(rendered.placed, 12);
        assert_eq!(rendered.image.width(), SHEET_WIDTH_PX);
        assert_eq!(rendered.image.height(), SHEET_HEIGHT_PX);

        // Top-left cell carries the photo, corner stays white.
        assert_eq!(*rendered.image.get_pixel(0, 0), Rgb([255, 255, 255]));
        assert_eq!(*rendered.image.get_pixel(200, 200), Rgb([80, 60, 40]));
    }

    #[test]
    fn test_render_joint_sheet_places_eight() {
        let rendered = render_sheet(&sample_photo(570, 420), PhotoSize::joint());
        assert_eq!(rendered.placed, 8);
    }

    #[test]
    fn test_render_never_exceeds_cap() {
        // Tiny photo: naive capacity is far above 12; the fallback grid
        // plus the placement cap keep it at 12.
        let size = PhotoSize::new(0.5, 0.5).unwrap();
        let rendered = render_sheet(&sample_photo(150, 150), size);
        assert_eq!(rendered.placed, 12);
    }

    #[test]
    fn test_render_is_deterministic() {
        let photo = sample_photo(601, 703);
        let first = render_sheet(&photo, PhotoSize::passport());
        let second = render_sheet(&photo, PhotoSize::passport());
        assert_eq!(first.image.as_raw(), second.image.as_raw());
    }
}
