use crate::error::Error;
use crate::signature::{Point, SignaturePad, CANVAS_HEIGHT, CANVAS_WIDTH};
use axum::Json;
use axum_valid::Garde;
use garde::Validate;
use serde_derive::{Deserialize, Serialize};

/// Body for replaying a capture gesture, every stroke as sampled pointer
/// positions in canvas coordinates.
#[derive(Clone, Debug, Deserialize, Serialize, Validate)]
pub struct Capture {
    #[garde(length(min = 1))]
    pub strokes: Vec<Vec<Point>>,
}

#[derive(Clone, Debug, Serialize)]
pub struct Captured {
    /// Empty when the gesture left no ink on the canvas.
    pub signature: String,
}

pub async fn capture(Garde(Json(capture)): Garde<Json<Capture>>) -> Result<Json<Captured>, Error> {
    let mut pad = SignaturePad::new(CANVAS_WIDTH, CANVAS_HEIGHT);
    for stroke in &capture.strokes {
        let Some((first, rest)) = stroke.split_first() else {
            continue;
        };

        pad.begin_stroke(*first);
        for point in rest {
            pad.add_point(*point);
        }
    }

    let signature = pad.save()?.unwrap_or_default();
    Ok(Json(Captured { signature }))
}
