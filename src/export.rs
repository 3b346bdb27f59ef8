use crate::{
    error::Error,
    models::{AppSettings, Customer, Invoice},
    render::{self, Renderer},
};
use lopdf::{
    content::{Content, Operation},
    dictionary, Document, Object, ObjectId, Stream,
};
use regex::Regex;
use std::sync::LazyLock;

/// A4 portrait in PDF points.
pub const A4_WIDTH: f32 = 595.276;
pub const A4_HEIGHT: f32 = 841.89;

static UNSAFE_FILENAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^A-Za-z0-9._-]+").unwrap());

/// The download name for one exported invoice. Anything outside a small safe
/// set collapses to an underscore.
pub fn filename(invoice: &Invoice) -> String {
    let number = UNSAFE_FILENAME.replace_all(&invoice.invoice_number, "_");
    format!("Invoice_{number}.pdf")
}

/// Renders and packages one invoice end to end.
pub fn pdf_bytes(
    renderer: &Renderer,
    invoice: &Invoice,
    customer: Option<&Customer>,
    settings: &AppSettings,
) -> Result<Vec<u8>, Error> {
    let document = renderer.document(invoice, customer, settings)?;
    let pages = render::rasterize(&document, render::RASTER_SCALE)?;
    package(&pages)
}

/// Packages rasterized pages into a PDF. Each bitmap is drawn onto its own A4
/// portrait page, scaled to fit with the aspect ratio preserved and anchored
/// to the top left corner.
pub fn package(pages: &[image::RgbaImage]) -> Result<Vec<u8>, Error> {
    let mut document = Document::with_version("1.5");
    let pages_id = document.new_object_id();

    let kids = pages
        .iter()
        .map(|page| embed_page(&mut document, pages_id, page))
        .collect::<Result<Vec<_>, Error>>()?;

    document.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as u32,
            "Kids" => kids.into_iter().map(Object::Reference).collect::<Vec<_>>(),
        }),
    );

    let catalog_id = document.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    document.trailer.set("Root", catalog_id);

    document.compress();

    let mut buffer = Vec::new();
    document.save_to(&mut buffer)?;
    Ok(buffer)
}

fn embed_page(
    document: &mut Document,
    pages_id: ObjectId,
    page: &image::RgbaImage,
) -> Result<ObjectId, Error> {
    let rgb = image::DynamicImage::ImageRgba8(page.clone()).into_rgb8();
    let (width, height) = rgb.dimensions();

    // Raw samples only, `compress` deflates every unfiltered stream on save.
    let image_id = document.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width,
            "Height" => height,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
        },
        rgb.into_raw(),
    ));

    let ratio = (A4_WIDTH / width as f32).min(A4_HEIGHT / height as f32);
    let scaled_width = width as f32 * ratio;
    let scaled_height = height as f32 * ratio;

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    scaled_width.into(),
                    0.into(),
                    0.into(),
                    scaled_height.into(),
                    0.into(),
                    (A4_HEIGHT - scaled_height).into(),
                ],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = document.add_object(Stream::new(dictionary! {}, content.encode()?));

    Ok(document.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0.into(), 0.into(), A4_WIDTH.into(), A4_HEIGHT.into()],
        "Resources" => dictionary! {
            "XObject" => dictionary! { "Im0" => image_id },
        },
        "Contents" => content_id,
    }))
}
