#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};

use kiln_core::io::fits::{FITS_BLOCK_SIZE, FITS_CARD_SIZE};

fn pad_card(text: &str) -> [u8; FITS_CARD_SIZE] {
    let mut card = [b' '; FITS_CARD_SIZE];
    let bytes = text.as_bytes();
    card[..bytes.len()].copy_from_slice(bytes);
    card
}

fn push_cards(buf: &mut Vec<u8>, cards: &[String]) {
    for text in cards {
        buf.extend_from_slice(&pad_card(text));
    }
    let cards_per_block = FITS_BLOCK_SIZE / FITS_CARD_SIZE;
    let remainder = cards.len() % cards_per_block;
    if remainder != 0 {
        for _ in remainder..cards_per_block {
            buf.extend_from_slice(&[b' '; FITS_CARD_SIZE]);
        }
    }
}

fn pad_data(buf: &mut Vec<u8>, data_start: usize) {
    let tail = (buf.len() - data_start) % FITS_BLOCK_SIZE;
    if tail != 0 {
        buf.resize(buf.len() + FITS_BLOCK_SIZE - tail, 0);
    }
}

/// Build a 32-bit float FITS file with row-major `pixels`.
pub fn build_fits_f32(width: usize, height: usize, exptime: Option<f64>, pixels: &[f32]) -> Vec<u8> {
    assert_eq!(pixels.len(), width * height);

    let mut cards = vec![
        format!("{:<8}= {:>20}", "SIMPLE", "T"),
        format!("{:<8}= {:>20}", "BITPIX", -32),
        format!("{:<8}= {:>20}", "NAXIS", 2),
        format!("{:<8}= {:>20}", "NAXIS1", width),
        format!("{:<8}= {:>20}", "NAXIS2", height),
    ];
    if let Some(t) = exptime {
        cards.push(format!("{:<8}= {:>20}", "EXPTIME", format!("{t:.1}")));
    }
    cards.push("END".to_string());

    let mut buf = Vec::new();
    push_cards(&mut buf, &cards);
    let data_start = buf.len();
    for &v in pixels {
        buf.extend_from_slice(&v.to_be_bytes());
    }
    pad_data(&mut buf, data_start);
    buf
}

/// Build a 16-bit integer FITS file with the unsigned BZERO convention.
pub fn build_fits_i16(
    width: usize,
    height: usize,
    exptime: Option<f64>,
    bzero: f64,
    pixels: &[i16],
) -> Vec<u8> {
    assert_eq!(pixels.len(), width * height);

    let mut cards = vec![
        format!("{:<8}= {:>20}", "SIMPLE", "T"),
        format!("{:<8}= {:>20}", "BITPIX", 16),
        format!("{:<8}= {:>20}", "NAXIS", 2),
        format!("{:<8}= {:>20}", "NAXIS1", width),
        format!("{:<8}= {:>20}", "NAXIS2", height),
        format!("{:<8}= {:>20}", "BZERO", format!("{bzero:.1}")),
        format!("{:<8}= {:>20}", "BSCALE", "1.0"),
    ];
    if let Some(t) = exptime {
        cards.push(format!("{:<8}= {:>20}", "EXPTIME", format!("{t:.1}")));
    }
    cards.push("END".to_string());

    let mut buf = Vec::new();
    push_cards(&mut buf, &cards);
    let data_start = buf.len();
    for &v in pixels {
        buf.extend_from_slice(&v.to_be_bytes());
    }
    pad_data(&mut buf, data_start);
    buf
}

/// Gzip a byte buffer (for `.fits.gz` fixtures).
pub fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(bytes).expect("gzip write");
    encoder.finish().expect("gzip finish")
}

/// Write bytes to `dir/name` and return the full path.
pub fn write_file(dir: &Path, name: &str, bytes: &[u8]) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, bytes).expect("write fixture");
    path
}

/// Write a constant-valued f32 raw frame file and return its path.
pub fn constant_frame_file(
    dir: &Path,
    name: &str,
    width: usize,
    height: usize,
    value: f32,
    exptime: f64,
) -> PathBuf {
    let pixels = vec![value; width * height];
    write_file(dir, name, &build_fits_f32(width, height, Some(exptime), &pixels))
}
