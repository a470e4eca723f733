//! Paged document builder on top of lopdf.
//!
//! Coordinates are millimetres from the top-left corner of the page, font
//! sizes are points. Conversion to PDF user space happens per operation.

use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use serde::{Deserialize, Serialize};

use super::ExportError;
use crate::text::win_ansi_byte;

const PT_PER_MM: f64 = 72.0 / 25.4;

/// Page size in millimetres
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageFormat {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageFormat {
    pub const A4_LANDSCAPE: PageFormat = PageFormat {
        width_mm: 297.0,
        height_mm: 210.0,
    };
}

impl Default for PageFormat {
    fn default() -> Self {
        Self::A4_LANDSCAPE
    }
}

/// What a page ended up holding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PageKind {
    Blank,
    Image,
    Instructions,
}

/// Decoded RGB raster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage {
    pub width: u32,
    pub height: u32,
    pub rgb: Vec<u8>,
}

impl RasterImage {
    pub fn decode(encoded: &[u8]) -> Result<Self, image::ImageError> {
        let img = image::load_from_memory(encoded)?.to_rgb8();
        Ok(Self {
            width: img.width(),
            height: img.height(),
            rgb: img.into_raw(),
        })
    }
}

struct Page {
    kind: PageKind,
    operations: Vec<Operation>,
    /// Indices into `ReportDocument::images`
    images: Vec<usize>,
}

impl Page {
    fn blank() -> Self {
        Self {
            kind: PageKind::Blank,
            operations: Vec::new(),
            images: Vec::new(),
        }
    }
}

/// Base-14 fonts only understand WinAnsi; characters without a glyph become '?'.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| win_ansi_byte(c).unwrap_or(b'?'))
        .collect()
}

fn real(value: f64) -> Object {
    Object::Real(value as f32)
}

/// Starts with one blank page; `add_page` appends and makes it current.
pub struct ReportDocument {
    format: PageFormat,
    pages: Vec<Page>,
    images: Vec<RasterImage>,
}

impl ReportDocument {
    pub fn new(format: PageFormat) -> Self {
        Self {
            format,
            pages: vec![Page::blank()],
            images: Vec::new(),
        }
    }

    pub fn format(&self) -> PageFormat {
        self.format
    }

    pub fn add_page(&mut self) {
        self.pages.push(Page::blank());
    }

    pub fn page_kinds(&self) -> Vec<PageKind> {
        self.pages.iter().map(|p| p.kind).collect()
    }

    fn current(&mut self) -> &mut Page {
        if self.pages.is_empty() {
            self.pages.push(Page::blank());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    /// Tag the current page; the first tag wins.
    pub fn mark(&mut self, kind: PageKind) {
        let page = self.current();
        if page.kind == PageKind::Blank {
            page.kind = kind;
        }
    }

    /// Draw `lines` with the first baseline at `y_mm`, `line_height_mm` apart.
    pub fn text(
        &mut self,
        lines: &[String],
        x_mm: f64,
        y_mm: f64,
        font_size_pt: f64,
        color: [u8; 3],
        line_height_mm: f64,
    ) {
        let page_height = self.format.height_mm;
        let page = self.current();
        let [r, g, b] = color.map(|c| f64::from(c) / 255.0);

        page.operations.push(Operation::new("BT", vec![]));
        page.operations.push(Operation::new(
            "Tf",
            vec!["F1".into(), real(font_size_pt)],
        ));
        page.operations.push(Operation::new("rg", vec![real(r), real(g), real(b)]));
        for (i, line) in lines.iter().enumerate() {
            let y = y_mm + i as f64 * line_height_mm;
            page.operations.push(Operation::new(
                "Tm",
                vec![
                    real(1.0),
                    real(0.0),
                    real(0.0),
                    real(1.0),
                    real(x_mm * PT_PER_MM),
                    real((page_height - y) * PT_PER_MM),
                ],
            ));
            page.operations.push(Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(line), StringFormat::Literal)],
            ));
        }
        page.operations.push(Operation::new("ET", vec![]));
    }

    /// Place `image` with its top-left corner at `(x_mm, y_mm)`.
    pub fn image(&mut self, image: RasterImage, x_mm: f64, y_mm: f64, width_mm: f64, height_mm: f64) {
        let page_height = self.format.height_mm;
        let index = self.images.len();
        self.images.push(image);

        let page = self.current();
        page.images.push(index);
        page.operations.push(Operation::new("q", vec![]));
        page.operations.push(Operation::new(
            "cm",
            vec![
                real(width_mm * PT_PER_MM),
                real(0.0),
                real(0.0),
                real(height_mm * PT_PER_MM),
                real(x_mm * PT_PER_MM),
                real((page_height - y_mm - height_mm) * PT_PER_MM),
            ],
        ));
        page.operations.push(Operation::new("Do", vec![format!("Im{index}").as_str().into()]));
        page.operations.push(Operation::new("Q", vec![]));
    }

    /// Serialize to PDF bytes.
    pub fn to_pdf(&self, title: &str) -> Result<Vec<u8>, ExportError> {
        let mut doc = Document::with_version("1.5");
        let id_pages = doc.new_object_id();

        let id_font = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });

        let image_ids: Vec<ObjectId> = self
            .images
            .iter()
            .map(|img| {
                doc.add_object(Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => i64::from(img.width),
                        "Height" => i64::from(img.height),
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8_i64,
                    },
                    img.rgb.clone(),
                ))
            })
            .collect();

        let mut kids: Vec<Object> = Vec::with_capacity(self.pages.len());
        for page in &self.pages {
            let content = Content {
                operations: page.operations.clone(),
            };
            let id_content = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

            let mut xobjects = Dictionary::new();
            for &i in &page.images {
                xobjects.set(format!("Im{i}"), image_ids[i]);
            }
            let id_resources = doc.add_object(dictionary! {
                "Font" => dictionary! { "F1" => id_font },
                "XObject" => xobjects,
            });

            let id_page = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => id_pages,
                "Contents" => id_content,
                "Resources" => id_resources,
            });
            kids.push(id_page.into());
        }

        let pages = dictionary! {
            "Type" => "Pages",
            "Count" => kids.len() as i64,
            "Kids" => kids,
            "MediaBox" => vec![
                real(0.0),
                real(0.0),
                real(self.format.width_mm * PT_PER_MM),
                real(self.format.height_mm * PT_PER_MM),
            ],
        };
        doc.objects.insert(id_pages, Object::Dictionary(pages));

        let id_catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => id_pages,
        });
        doc.trailer.set("Root", id_catalog);

        let date = chrono::Utc::now().format("D:%Y%m%d%H%M%SZ").to_string();
        let id_info = doc.add_object(dictionary! {
            "Title" => Object::String(encode_win_ansi(title), StringFormat::Literal),
            "Creator" => Object::string_literal("Graphite"),
            "CreationDate" => Object::string_literal(date.clone()),
            "ModDate" => Object::string_literal(date),
        });
        doc.trailer.set("Info", id_info);
        doc.compress();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer)?;
        Ok(buffer)
    }
}
