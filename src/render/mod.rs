use crate::{
    calc,
    error::Error,
    models::{decode_data_url, AppSettings, Customer, Invoice},
    state::State,
};
use axum::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use comemo::Prehashed;
use std::{
    cell::{RefCell, RefMut},
    collections::HashMap,
    io::Cursor,
    path::{Path, PathBuf},
    sync::{Arc, OnceLock},
};
use typst::{
    diag::{FileError, FileResult},
    eval::Tracer,
    foundations::{Bytes, Datetime},
    model::Document,
    syntax::{FileId, Source},
    text::{Font, FontBook},
    visualize::Color,
    Library, World,
};

/// Pixels per typographic point when a page is rasterized. Both the screen
/// preview and the PDF export use the same factor so they stay pixel
/// identical.
pub const RASTER_SCALE: f32 = 2.0;

#[derive(Clone, Debug)]
pub struct FontSlot {
    path: PathBuf,
    index: u32,
    font: OnceLock<Option<Font>>,
}

impl FontSlot {
    pub fn get(&self) -> Option<Font> {
        self.font
            .get_or_init(|| {
                let data = std::fs::read(&self.path).ok()?.into();
                Font::new(data, self.index)
            })
            .clone()
    }
}

fn fonts() -> (FontBook, Vec<FontSlot>) {
    #[cfg(feature = "system_fonts")]
    let mut db = fontdb::Database::new();
    #[cfg(feature = "system_fonts")]
    db.load_system_fonts();

    let mut book = FontBook::new();
    let mut fonts = Vec::new();

    #[cfg(feature = "system_fonts")]
    for face in db.faces() {
        let path = match &face.source {
            fontdb::Source::File(path) | fontdb::Source::SharedFile(path, _) => path,
            _ => continue,
        };

        let info = db
            .with_face_data(face.id, typst::text::FontInfo::new)
            .expect("bug: impossible");

        if let Some(info) = info {
            book.push(info);
            fonts.push(FontSlot {
                path: path.clone(),
                index: face.index,
                font: OnceLock::new(),
            });
        }
    }

    for data in typst_assets::fonts() {
        let buffer = Bytes::from_static(data);
        for (i, font) in Font::iter(buffer).enumerate() {
            book.push(font.info().clone());
            fonts.push(FontSlot {
                path: PathBuf::new(),
                index: i as u32,
                font: OnceLock::from(Some(font)),
            })
        }
    }

    (book, fonts)
}

#[derive(Clone, Debug)]
struct FileEntry {
    bytes: Bytes,
    source: Option<Source>,
}

impl FileEntry {
    fn new(bytes: Vec<u8>, source: Option<Source>) -> Self {
        Self {
            bytes: bytes.into(),
            source,
        }
    }

    fn source(&mut self, id: FileId) -> FileResult<Source> {
        let source = if let Some(source) = &self.source {
            source
        } else {
            let contents = std::str::from_utf8(&self.bytes).map_err(|_| FileError::InvalidUtf8)?;
            let contents = contents.trim_start_matches('\u{feff}');
            let source = Source::new(id, contents.into());
            self.source.insert(source)
        };
        Ok(source.clone())
    }
}

/// The document surface. Fonts and the embedded template are loaded once at
/// startup and shared across renders, each compilation runs in its own
/// [`Sandbox`] on top of them.
#[derive(Debug)]
pub struct Renderer {
    library: Prehashed<Library>,
    book: Prehashed<FontBook>,
    fonts: Vec<FontSlot>,
    source: Source,
}

impl Renderer {
    pub fn new() -> Result<Self, Error> {
        let (book, fonts) = fonts();
        if fonts.is_empty() {
            return Err(Error::RenderSurfaceUnavailable);
        }

        Ok(Self {
            library: Prehashed::new(Library::builder().build()),
            book: Prehashed::new(book),
            fonts,
            source: Source::detached(include_str!("../../templates/invoice.typ")),
        })
    }

    /// Compiles the canonical document for one invoice. Embedded images are
    /// decoded into a sandbox root that lives only for this call.
    pub fn document(
        &self,
        invoice: &Invoice,
        customer: Option<&Customer>,
        settings: &AppSettings,
    ) -> Result<Document, Error> {
        let tempdir = tempdir::TempDir::new("dutybill")?;
        let mut data = payload(invoice, customer, settings);

        if let Some(name) = write_embedded(tempdir.path(), "logo", &settings.business_logo)? {
            data["logo"] = serde_json::Value::String(name);
        }
        if let Some(name) = write_embedded(tempdir.path(), "signature", &invoice.signature)? {
            data["signature"] = serde_json::Value::String(name);
        }

        let data: typst::foundations::Value = serde_json::from_value(data)?;
        let w = Sandbox::new(self, tempdir.path().to_path_buf(), data);

        let mut tracer = Tracer::default();
        typst::compile(&w, &mut tracer).map_err(|_| Error::TypstError)
    }
}

/// Decodes a data URL into `root` and returns the filename the template can
/// reference. Empty and malformed values render without the image.
fn write_embedded(root: &Path, name: &str, value: &str) -> Result<Option<String>, Error> {
    if value.is_empty() {
        return Ok(None);
    }
    let Ok((extension, bytes)) = decode_data_url(value) else {
        return Ok(None);
    };

    let filename = format!("{name}.{extension}");
    std::fs::write(root.join(&filename), bytes)?;
    Ok(Some(filename))
}

/// A single-compilation world: the shared [`Renderer`] plus the invoice data
/// and decoded images for one document.
struct Sandbox<'a> {
    renderer: &'a Renderer,
    library: Prehashed<Library>,
    root: PathBuf,
    files: RefCell<HashMap<FileId, FileEntry>>,
    time: time::OffsetDateTime,
}

impl<'a> Sandbox<'a> {
    fn new(renderer: &'a Renderer, root: PathBuf, data: typst::foundations::Value) -> Self {
        let mut library = renderer.library.clone();
        library.update(|l| l.global.scope_mut().define("data", data));

        Self {
            renderer,
            library,
            root,
            files: RefCell::new(HashMap::new()),
            time: time::OffsetDateTime::now_utc(),
        }
    }

    fn sandbox_file(&self, id: FileId) -> FileResult<RefMut<'_, FileEntry>> {
        if let Ok(entry) = RefMut::filter_map(self.files.borrow_mut(), |files| files.get_mut(&id)) {
            return Ok(entry);
        }

        let path = id
            .vpath()
            .resolve(&self.root)
            .ok_or(FileError::AccessDenied)?;

        let content = std::fs::read(&path).map_err(|error| FileError::from_io(error, &path))?;
        Ok(RefMut::map(self.files.borrow_mut(), |files| {
            files.entry(id).or_insert(FileEntry::new(content, None))
        }))
    }
}

impl World for Sandbox<'_> {
    fn library(&self) -> &Prehashed<Library> {
        &self.library
    }

    fn book(&self) -> &Prehashed<FontBook> {
        &self.renderer.book
    }

    fn main(&self) -> Source {
        self.renderer.source.clone()
    }

    fn source(&self, id: FileId) -> FileResult<Source> {
        if id == self.renderer.source.id() {
            Ok(self.renderer.source.clone())
        } else {
            self.sandbox_file(id)?.source(id)
        }
    }

    fn file(&self, id: FileId) -> FileResult<Bytes> {
        self.sandbox_file(id).map(|file| file.bytes.clone())
    }

    fn font(&self, index: usize) -> Option<Font> {
        self.renderer.fonts.get(index)?.get()
    }

    fn today(&self, offset: Option<i64>) -> Option<Datetime> {
        let offset = offset.unwrap_or(0);
        let offset = time::UtcOffset::from_hms(offset.try_into().ok()?, 0, 0).ok()?;
        let time = self.time.checked_to_offset(offset)?;
        Some(Datetime::Date(time.date()))
    }
}

/// The data behind one rendered invoice, every field preformatted so the
/// template stays purely presentational. Totals are recomputed here, display
/// never trusts the stored derived fields.
pub fn payload(
    invoice: &Invoice,
    customer: Option<&Customer>,
    settings: &AppSettings,
) -> serde_json::Value {
    let totals = calc::invoice_totals(&invoice.items, invoice.cgst, invoice.sgst);
    let guest_names = invoice
        .guest_names
        .iter()
        .map(|guest| guest.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let items = invoice
        .items
        .iter()
        .map(|item| {
            serde_json::json!({
                "description": item.description,
                "rate": display_money(item.rate),
                "quantity": display_number(item.quantity),
                "amount": display_money(calc::item_amount(item.rate, item.quantity)),
            })
        })
        .collect::<Vec<_>>();

    serde_json::json!({
        "businessName": settings.business_name,
        "businessAddress": settings.business_address,
        "businessEmail": settings.business_email,
        "businessPhone": settings.business_phone,
        "logo": "",
        "invoiceNumber": invoice.invoice_number,
        "billNo": invoice.bill_no,
        "date": display_date(invoice.date),
        "customerName": customer.map_or("Unknown", |customer| customer.name.as_str()),
        "address": invoice.address,
        "detailAddress": invoice.detail_address,
        "contactNo": invoice.contact_no,
        "emailId": invoice.email_id,
        "gstNo": invoice.gst_no,
        "panNo": invoice.pan_no,
        "bookedBy": invoice.booked_by,
        "guestNames": guest_names,
        "vehicleNo": invoice.vehicle_no,
        "vehicleDetail": invoice.vehicle_detail,
        "dutyPeriod": format!(
            "{} to {}",
            display_date(invoice.duty_from),
            display_date(invoice.duty_to)
        ),
        "kilometer": invoice.kilometer,
        "items": items,
        "subtotal": display_money(totals.subtotal),
        "cgstLabel": format!("CGST ({}%)", display_number(invoice.cgst)),
        "cgstAmount": display_money(totals.cgst_amount),
        "sgstLabel": format!("SGST ({}%)", display_number(invoice.sgst)),
        "sgstAmount": display_money(totals.sgst_amount),
        "total": display_money(totals.total),
        "dutyDescription": invoice.duty_description,
        "signature": "",
    })
}

/// Currency rendition used everywhere an amount is shown: a fixed rupee sign
/// and exactly two decimals.
pub fn display_money(amount: f64) -> String {
    format!("\u{20b9}{amount:.2}")
}

/// Dates render as `02 Jan 2025` on the document.
pub fn display_date(date: chrono::NaiveDate) -> String {
    date.format("%d %b %Y").to_string()
}

fn display_number(value: f64) -> String {
    format!("{value}")
}

/// Rasterizes every page of a compiled document onto white at `pixel_per_pt`.
pub fn rasterize(document: &Document, pixel_per_pt: f32) -> Result<Vec<image::RgbaImage>, Error> {
    document
        .pages
        .iter()
        .map(|page| {
            let pixmap = typst_render::render(&page.frame, pixel_per_pt, Color::WHITE);
            image::RgbaImage::from_raw(pixmap.width(), pixmap.height(), pixmap.take())
                .ok_or(Error::TypstError)
        })
        .collect()
}

/// Stacks page bitmaps vertically into a single PNG, the screen rendition of
/// the document.
pub fn preview_png(pages: &[image::RgbaImage]) -> Result<Vec<u8>, Error> {
    let width = pages.iter().map(|page| page.width()).max().unwrap_or(1);
    let height = pages.iter().map(|page| page.height()).sum::<u32>().max(1);

    let mut canvas =
        image::RgbaImage::from_pixel(width, height, image::Rgba([255, 255, 255, 255]));
    let mut offset = 0i64;
    for page in pages {
        image::imageops::overlay(&mut canvas, page, 0, offset);
        offset += i64::from(page.height());
    }

    let mut buffer = Cursor::new(Vec::new());
    image::DynamicImage::ImageRgba8(canvas).write_to(&mut buffer, image::ImageFormat::Png)?;
    Ok(buffer.into_inner())
}

/// Extracts the shared renderer, rejecting up front when the surface failed
/// to initialize at startup.
pub struct Surface(pub Arc<Renderer>);

#[async_trait]
impl<S> FromRequestParts<S> for Surface
where
    S: Send + Sync,
    State: FromRef<S>,
{
    type Rejection = Error;

    async fn from_request_parts(_parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = State::from_ref(state);
        state
            .renderer
            .clone()
            .map(Surface)
            .ok_or(Error::RenderSurfaceUnavailable)
    }
}
