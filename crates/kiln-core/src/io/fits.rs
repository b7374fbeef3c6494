use std::fs::File;
use std::io::{BufWriter, Cursor, Read, Write};
use std::path::Path;

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use chrono::{DateTime, NaiveDateTime, Utc};
use flate2::read::GzDecoder;
use memmap2::Mmap;
use ndarray::Array2;

use crate::error::{KilnError, Result};
use crate::frame::{CardValue, Frame, Header};

/// FITS files are organized in 2880-byte blocks.
pub const FITS_BLOCK_SIZE: usize = 2880;

/// Each header card is an 80-character record; 36 cards fill a block.
pub const FITS_CARD_SIZE: usize = 80;

/// Timestamp layout for DATE-OBS/DATE-END: ISO-8601 UTC with milliseconds.
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3f";

/// Header fields written alongside a calibration or science product.
#[derive(Clone, Debug, Default)]
pub struct ProductMeta {
    pub filter: Option<String>,
    pub date_obs: Option<DateTime<Utc>>,
    pub date_end: Option<DateTime<Utc>>,
    pub exposure_time: Option<f64>,
    pub gain: Option<f64>,
}

impl ProductMeta {
    /// Carry over the product fields present in an existing header.
    pub fn from_header(header: &Header) -> Self {
        let parse_timestamp = |s: &str| {
            NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        };
        Self {
            filter: header.get_str("FILTER").map(str::to_string),
            date_obs: header.get_str("DATE-OBS").and_then(parse_timestamp),
            date_end: header.get_str("DATE-END").and_then(parse_timestamp),
            exposure_time: header.exposure_time(),
            gain: header.get_f64("GAIN"),
        }
    }
}

/// Read header and pixel data from a FITS file.
///
/// A `.gz` suffix signals a gzip layer in front of the same payload;
/// callers never need to know which form they were handed.
pub fn read_frame(path: &Path) -> Result<Frame> {
    let payload = open_payload(path)?;
    let (header, shape, data_offset) = parse_header(payload.bytes())?;
    let data = decode_data(&payload.bytes()[data_offset..], &shape)?;
    Ok(Frame::new(data, header))
}

/// Read only the header of a FITS file.
pub fn read_header(path: &Path) -> Result<Header> {
    let payload = open_payload(path)?;
    let (header, _, _) = parse_header(payload.bytes())?;
    Ok(header)
}

/// Read only the pixel data of a FITS file.
pub fn read_data(path: &Path) -> Result<Array2<f32>> {
    Ok(read_frame(path)?.data)
}

/// Write a product file: 32-bit float image with a minimal header.
///
/// Optional meta fields are written only when present. An existing file
/// at `path` is overwritten.
pub fn write_product(path: &Path, data: &Array2<f32>, meta: &ProductMeta) -> Result<()> {
    let (h, w) = data.dim();

    let mut cards: Vec<[u8; FITS_CARD_SIZE]> = Vec::new();
    cards.push(logical_card("SIMPLE", true));
    cards.push(int_card("BITPIX", -32));
    cards.push(int_card("NAXIS", 2));
    cards.push(int_card("NAXIS1", w as i64));
    cards.push(int_card("NAXIS2", h as i64));
    if let Some(ref filter) = meta.filter {
        cards.push(str_card("FILTER", filter));
    }
    if let Some(ref t) = meta.date_obs {
        cards.push(str_card("DATE-OBS", &t.format(TIMESTAMP_FORMAT).to_string()));
    }
    if let Some(ref t) = meta.date_end {
        cards.push(str_card("DATE-END", &t.format(TIMESTAMP_FORMAT).to_string()));
    }
    if let Some(exptime) = meta.exposure_time {
        cards.push(real_card("EXPTIME", exptime));
    }
    if let Some(gain) = meta.gain {
        cards.push(real_card("GAIN", gain));
    }
    cards.push(end_card());

    let mut out = BufWriter::new(File::create(path)?);
    for card in &cards {
        out.write_all(card)?;
    }
    // Pad the header to a whole number of blocks with blank cards.
    let cards_per_block = FITS_BLOCK_SIZE / FITS_CARD_SIZE;
    let remainder = cards.len() % cards_per_block;
    if remainder != 0 {
        let blank = [b' '; FITS_CARD_SIZE];
        for _ in remainder..cards_per_block {
            out.write_all(&blank)?;
        }
    }

    let mut written = 0usize;
    for row in 0..h {
        for col in 0..w {
            out.write_f32::<BigEndian>(data[[row, col]])?;
            written += 4;
        }
    }
    let tail = written % FITS_BLOCK_SIZE;
    if tail != 0 {
        out.write_all(&vec![0u8; FITS_BLOCK_SIZE - tail])?;
    }
    out.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Reading
// ---------------------------------------------------------------------------

/// Raw file bytes, either memory-mapped or decompressed into memory.
enum Payload {
    Mapped(Mmap),
    Buffered(Vec<u8>),
}

impl Payload {
    fn bytes(&self) -> &[u8] {
        match self {
            Payload::Mapped(mmap) => &mmap[..],
            Payload::Buffered(buf) => &buf[..],
        }
    }
}

fn open_payload(path: &Path) -> Result<Payload> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("gz") => {
            let file = File::open(path)?;
            let mut buf = Vec::new();
            GzDecoder::new(file).read_to_end(&mut buf)?;
            Ok(Payload::Buffered(buf))
        }
        Some("fz") => Err(KilnError::InvalidFits(
            "tile-compressed (.fz) files are not supported; recompress as .fits.gz".into(),
        )),
        _ => {
            let file = File::open(path)?;
            let mmap = unsafe { Mmap::map(&file)? };
            Ok(Payload::Mapped(mmap))
        }
    }
}

/// Container geometry pulled from the structural header cards.
struct ImageShape {
    bitpix: i32,
    width: usize,
    height: usize,
    bzero: f64,
    bscale: f64,
}

/// Keywords that describe the container rather than the observation.
/// They are consumed here and not exposed on `Header`.
const STRUCTURAL_KEYS: &[&str] = &[
    "SIMPLE", "BITPIX", "NAXIS", "NAXIS1", "NAXIS2", "NAXIS3", "EXTEND", "BZERO", "BSCALE",
];

fn parse_header(bytes: &[u8]) -> Result<(Header, ImageShape, usize)> {
    if bytes.len() < FITS_BLOCK_SIZE {
        return Err(KilnError::InvalidFits("file too small for a header block".into()));
    }
    if &bytes[0..6] != b"SIMPLE" {
        return Err(KilnError::InvalidFits("missing SIMPLE card".into()));
    }

    let mut header = Header::new();
    let mut structural: Vec<(String, CardValue)> = Vec::new();
    let mut offset = 0usize;
    let mut ended = false;

    'blocks: while offset + FITS_BLOCK_SIZE <= bytes.len() {
        let block = &bytes[offset..offset + FITS_BLOCK_SIZE];
        offset += FITS_BLOCK_SIZE;
        for card in block.chunks_exact(FITS_CARD_SIZE) {
            let keyword = std::str::from_utf8(&card[0..8])
                .map_err(|_| KilnError::InvalidFits("non-ASCII header keyword".into()))?
                .trim_end()
                .to_string();
            if keyword == "END" {
                ended = true;
                break 'blocks;
            }
            if keyword.is_empty() || keyword == "COMMENT" || keyword == "HISTORY" {
                continue;
            }
            if &card[8..10] != b"= " {
                continue;
            }
            let text = String::from_utf8_lossy(&card[10..]);
            if let Some(value) = parse_card_value(&text) {
                if STRUCTURAL_KEYS.contains(&keyword.as_str()) {
                    structural.push((keyword, value));
                } else {
                    header.set(&keyword, value);
                }
            }
        }
    }

    if !ended {
        return Err(KilnError::InvalidFits("header has no END card".into()));
    }

    let get_int = |key: &str| -> Option<i64> {
        structural.iter().find(|(k, _)| k == key).and_then(|(_, v)| match v {
            CardValue::Int(i) => Some(*i),
            CardValue::Real(r) => Some(*r as i64),
            _ => None,
        })
    };
    let get_real = |key: &str| -> Option<f64> {
        structural.iter().find(|(k, _)| k == key).and_then(|(_, v)| match v {
            CardValue::Real(r) => Some(*r),
            CardValue::Int(i) => Some(*i as f64),
            _ => None,
        })
    };

    let bitpix = get_int("BITPIX")
        .ok_or_else(|| KilnError::InvalidFits("missing BITPIX".into()))? as i32;
    if ![8, 16, 32, -32, -64].contains(&bitpix) {
        return Err(KilnError::InvalidFits(format!("unsupported BITPIX {bitpix}")));
    }
    let naxis = get_int("NAXIS").ok_or_else(|| KilnError::InvalidFits("missing NAXIS".into()))?;
    if naxis != 2 {
        return Err(KilnError::InvalidFits(format!(
            "expected a 2D image, got NAXIS = {naxis}"
        )));
    }
    let width = get_int("NAXIS1")
        .ok_or_else(|| KilnError::InvalidFits("missing NAXIS1".into()))? as usize;
    let height = get_int("NAXIS2")
        .ok_or_else(|| KilnError::InvalidFits("missing NAXIS2".into()))? as usize;
    if width == 0 || height == 0 {
        return Err(KilnError::InvalidFits(format!(
            "invalid image dimensions {width}x{height}"
        )));
    }

    let shape = ImageShape {
        bitpix,
        width,
        height,
        bzero: get_real("BZERO").unwrap_or(0.0),
        bscale: get_real("BSCALE").unwrap_or(1.0),
    };

    Ok((header, shape, offset))
}

/// Parse the value field of one card (everything after "= ").
///
/// Strings keep embedded `''` escapes; an inline `/ comment` is dropped.
fn parse_card_value(text: &str) -> Option<CardValue> {
    let trimmed = text.trim_start();
    if trimmed.is_empty() {
        return None;
    }

    if let Some(rest) = trimmed.strip_prefix('\'') {
        let mut value = String::new();
        let mut chars = rest.chars().peekable();
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    value.push('\'');
                } else {
                    break;
                }
            } else {
                value.push(c);
            }
        }
        return Some(CardValue::Str(value.trim_end().to_string()));
    }

    let bare = trimmed.split('/').next().unwrap_or("").trim();
    match bare {
        "" => None,
        "T" => Some(CardValue::Logical(true)),
        "F" => Some(CardValue::Logical(false)),
        _ => {
            if let Ok(i) = bare.parse::<i64>() {
                Some(CardValue::Int(i))
            } else {
                bare.replace(['D', 'd'], "E")
                    .parse::<f64>()
                    .ok()
                    .map(CardValue::Real)
            }
        }
    }
}

fn decode_data(bytes: &[u8], shape: &ImageShape) -> Result<Array2<f32>> {
    let pixels = shape.width * shape.height;
    let bytes_per_pixel = (shape.bitpix.unsigned_abs() / 8) as usize;
    let needed = pixels * bytes_per_pixel;
    if bytes.len() < needed {
        return Err(KilnError::InvalidFits(format!(
            "data truncated: expected {} bytes, got {}",
            needed,
            bytes.len()
        )));
    }

    let mut cursor = Cursor::new(&bytes[..needed]);
    let mut data = Array2::<f32>::zeros((shape.height, shape.width));
    for row in 0..shape.height {
        for col in 0..shape.width {
            let raw = match shape.bitpix {
                8 => cursor.read_u8()? as f64,
                16 => cursor.read_i16::<BigEndian>()? as f64,
                32 => cursor.read_i32::<BigEndian>()? as f64,
                -32 => cursor.read_f32::<BigEndian>()? as f64,
                -64 => cursor.read_f64::<BigEndian>()?,
                _ => unreachable!("BITPIX validated in parse_header"),
            };
            data[[row, col]] = (shape.bzero + shape.bscale * raw) as f32;
        }
    }
    Ok(data)
}

// ---------------------------------------------------------------------------
// Writing
// ---------------------------------------------------------------------------

fn pad_card(text: &str) -> [u8; FITS_CARD_SIZE] {
    let mut card = [b' '; FITS_CARD_SIZE];
    let bytes = text.as_bytes();
    let n = bytes.len().min(FITS_CARD_SIZE);
    card[..n].copy_from_slice(&bytes[..n]);
    card
}

fn logical_card(key: &str, value: bool) -> [u8; FITS_CARD_SIZE] {
    pad_card(&format!("{:<8}= {:>20}", key, if value { "T" } else { "F" }))
}

fn int_card(key: &str, value: i64) -> [u8; FITS_CARD_SIZE] {
    pad_card(&format!("{key:<8}= {value:>20}"))
}

fn real_card(key: &str, value: f64) -> [u8; FITS_CARD_SIZE] {
    let mut text = format!("{value}");
    if !text.contains(['.', 'e', 'E']) {
        text.push_str(".0");
    }
    pad_card(&format!("{key:<8}= {text:>20}"))
}

fn str_card(key: &str, value: &str) -> [u8; FITS_CARD_SIZE] {
    let escaped = value.replace('\'', "''");
    pad_card(&format!("{key:<8}= '{escaped:<8}'"))
}

fn end_card() -> [u8; FITS_CARD_SIZE] {
    pad_card("END")
}
