use base64::{engine::general_purpose, Engine};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use serde_derive::{Deserialize, Serialize};
use std::io::Cursor;

use crate::error::Error;

pub const CANVAS_WIDTH: u32 = 600;
pub const CANVAS_HEIGHT: u32 = 200;

const PEN_RADIUS: f32 = 1.5;
const INK: Rgba<u8> = Rgba([0, 0, 0, 255]);
const PAPER: Rgba<u8> = Rgba([255, 255, 255, 255]);

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CaptureState {
    Empty,
    Drawing,
    Saved,
}

/// Freehand signature capture over a white canvas.
///
/// Strokes accumulate while `Drawing`. `save` serializes them to a PNG data
/// URL that embeds directly in the rendered document and persists as a plain
/// string. `clear` discards everything from any state.
#[derive(Debug)]
pub struct SignaturePad {
    width: u32,
    height: u32,
    strokes: Vec<Vec<Point>>,
    image: Option<String>,
    state: CaptureState,
}

impl Default for SignaturePad {
    fn default() -> Self {
        Self::new(CANVAS_WIDTH, CANVAS_HEIGHT)
    }
}

impl SignaturePad {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            strokes: Vec::new(),
            image: None,
            state: CaptureState::Empty,
        }
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// The most recently saved image, if any.
    pub fn image(&self) -> Option<&str> {
        self.image.as_deref()
    }

    /// Starts a new stroke. Ignored while `Saved`, the canvas is not shown
    /// until `edit` re-enters `Drawing`.
    pub fn begin_stroke(&mut self, at: Point) {
        match self.state {
            CaptureState::Saved => {}
            CaptureState::Empty | CaptureState::Drawing => {
                self.state = CaptureState::Drawing;
                self.strokes.push(vec![at]);
            }
        }
    }

    /// Extends the stroke in progress. Ignored outside `Drawing`.
    pub fn add_point(&mut self, point: Point) {
        if self.state != CaptureState::Drawing {
            return;
        }
        if let Some(stroke) = self.strokes.last_mut() {
            stroke.push(point);
        }
    }

    /// Serializes the drawn strokes to a PNG data URL and moves to `Saved`.
    /// With nothing drawn this is a no-op returning `None`.
    pub fn save(&mut self) -> Result<Option<String>, Error> {
        if self.is_blank() {
            return Ok(None);
        }

        let encoded = self.rasterize()?;
        self.image = Some(encoded.clone());
        self.strokes.clear();
        self.state = CaptureState::Saved;

        Ok(Some(encoded))
    }

    /// Discards all strokes and the saved image. Valid from any state.
    pub fn clear(&mut self) {
        self.strokes.clear();
        self.image = None;
        self.state = CaptureState::Empty;
    }

    /// Re-enters `Drawing` on a fresh canvas. The saved image survives until
    /// the next save or clear.
    pub fn edit(&mut self) {
        if self.state == CaptureState::Saved {
            self.state = CaptureState::Drawing;
        }
    }

    fn is_blank(&self) -> bool {
        self.strokes.iter().all(|stroke| stroke.is_empty())
    }

    fn rasterize(&self) -> Result<String, Error> {
        let mut canvas = RgbaImage::from_pixel(self.width, self.height, PAPER);

        for stroke in &self.strokes {
            if let Some(first) = stroke.first() {
                stamp(&mut canvas, *first);
            }
            for pair in stroke.windows(2) {
                segment(&mut canvas, pair[0], pair[1]);
            }
        }

        let mut buffer = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(canvas).write_to(&mut buffer, ImageFormat::Png)?;

        Ok(format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(buffer.get_ref())
        ))
    }
}

fn segment(canvas: &mut RgbaImage, from: Point, to: Point) {
    let length = ((to.x - from.x).powi(2) + (to.y - from.y).powi(2)).sqrt();
    let steps = length.ceil().max(1.0) as u32;

    for step in 0..=steps {
        let t = step as f32 / steps as f32;
        stamp(
            canvas,
            Point {
                x: from.x + (to.x - from.x) * t,
                y: from.y + (to.y - from.y) * t,
            },
        );
    }
}

fn stamp(canvas: &mut RgbaImage, at: Point) {
    let (width, height) = canvas.dimensions();
    let min_x = (at.x - PEN_RADIUS).floor() as i64;
    let max_x = (at.x + PEN_RADIUS).ceil() as i64;
    let min_y = (at.y - PEN_RADIUS).floor() as i64;
    let max_y = (at.y + PEN_RADIUS).ceil() as i64;

    for y in min_y.max(0)..=max_y.min(height as i64 - 1) {
        for x in min_x.max(0)..=max_x.min(width as i64 - 1) {
            let dx = x as f32 + 0.5 - at.x;
            let dy = y as f32 + 0.5 - at.y;
            if dx * dx + dy * dy <= PEN_RADIUS * PEN_RADIUS {
                canvas.put_pixel(x as u32, y as u32, INK);
            }
        }
    }
}
