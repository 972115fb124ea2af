//! Image XObjects built from decoded image files

use std::fs;
use std::path::Path;
use image::{ColorType, DynamicImage, ImageFormat};
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use crate::error::Result;

/// Sample data of an image XObject
#[derive(Debug, Clone)]
enum Samples {
    /// 8-bit DeviceRGB samples, deflated when the document is compressed
    Raw(Vec<u8>),
    /// Original JPEG file, embedded as-is behind DCTDecode
    Jpeg { data: Vec<u8>, color_space: &'static [u8] },
}

/// An image ready to be embedded as a PDF Image XObject
///
/// Baseline RGB and grayscale JPEGs keep their encoded bytes. Everything else
/// is stored as 8-bit DeviceRGB, with any alpha channel kept separately so it
/// can be written as a DeviceGray soft mask.
#[derive(Debug, Clone)]
pub struct ImageXObject {
    width: u32,
    height: u32,
    samples: Samples,
    alpha: Option<Vec<u8>>,
}

impl ImageXObject {
    /// Read an image file (PNG or JPEG)
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read(path)?;
        let img = image::load_from_memory(&data)?;

        if image::guess_format(&data)? == ImageFormat::Jpeg {
            let color_space: Option<&'static [u8]> = match img.color() {
                ColorType::Rgb8 => Some(b"DeviceRGB"),
                ColorType::L8 => Some(b"DeviceGray"),
                _ => None,
            };
            if let Some(color_space) = color_space {
                return Ok(Self {
                    width: img.width(),
                    height: img.height(),
                    samples: Samples::Jpeg { data, color_space },
                    alpha: None,
                });
            }
        }

        Ok(Self::from_image(&img))
    }

    /// Split a decoded image into color samples and an optional alpha channel
    pub fn from_image(img: &DynamicImage) -> Self {
        if !img.color().has_alpha() {
            let rgb = img.to_rgb8();
            return Self {
                width: rgb.width(),
                height: rgb.height(),
                samples: Samples::Raw(rgb.into_raw()),
                alpha: None,
            };
        }

        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();
        let pixels = (width as usize) * (height as usize);
        let mut rgb = Vec::with_capacity(pixels * 3);
        let mut alpha = Vec::with_capacity(pixels);

        for pixel in rgba.pixels() {
            rgb.extend_from_slice(&pixel.0[..3]);
            alpha.push(pixel.0[3]);
        }

        Self {
            width,
            height,
            samples: Samples::Raw(rgb),
            alpha: Some(alpha),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn has_alpha(&self) -> bool {
        self.alpha.is_some()
    }

    /// Whether the encoded JPEG bytes are embedded directly
    pub fn is_passthrough_jpeg(&self) -> bool {
        matches!(self.samples, Samples::Jpeg { .. })
    }

    /// Add the image (and its soft mask, if any) to `doc` and return the image's object ID
    ///
    /// Raw samples are left uncompressed here; `Document::compress` deflates them
    /// on save. JPEG data is marked so it is never deflated a second time.
    pub fn add_to(&self, doc: &mut Document) -> ObjectId {
        let stream = match &self.samples {
            Samples::Raw(rgb) => {
                let mut dict = self.base_dictionary(b"DeviceRGB");
                dict.set("Interpolate", Object::Boolean(true));

                if let Some(ref alpha) = self.alpha {
                    let smask = Stream::new(self.base_dictionary(b"DeviceGray"), alpha.clone());
                    let smask_id = doc.add_object(smask);
                    dict.set("SMask", Object::Reference(smask_id));
                }

                Stream::new(dict, rgb.clone())
            }
            Samples::Jpeg { data, color_space } => {
                let mut dict = self.base_dictionary(color_space);
                dict.set("Interpolate", Object::Boolean(true));
                dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));

                let mut stream = Stream::new(dict, data.clone());
                stream.allows_compression = false;
                stream
            }
        };

        doc.add_object(stream)
    }

    fn base_dictionary(&self, color_space: &[u8]) -> Dictionary {
        let mut dict = Dictionary::new();
        dict.set("Type", Object::Name(b"XObject".to_vec()));
        dict.set("Subtype", Object::Name(b"Image".to_vec()));
        dict.set("Width", Object::Integer(self.width as i64));
        dict.set("Height", Object::Integer(self.height as i64));
        dict.set("ColorSpace", Object::Name(color_space.to_vec()));
        dict.set("BitsPerComponent", Object::Integer(8));
        dict
    }
}
