use ndarray::Array2;

/// A single detector frame.
///
/// Pixel values are f32 in detector units (DN); invalid pixels are NaN.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    /// Header read from (or destined for) the FITS container
    pub header: Header,
}

impl Frame {
    pub fn new(data: Array2<f32>, header: Header) -> Self {
        Self { data, header }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }
}

/// A single header value.
#[derive(Clone, Debug, PartialEq)]
pub enum CardValue {
    Str(String),
    Int(i64),
    Real(f64),
    Logical(bool),
}

/// Ordered keyword/value metadata attached to a frame.
///
/// Keeps cards in file order so a written product round-trips with the
/// layout a human expects from the container format.
#[derive(Clone, Debug, Default)]
pub struct Header {
    cards: Vec<(String, CardValue)>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&CardValue> {
        self.cards
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Numeric lookup; integer cards are widened to f64.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        match self.get(key)? {
            CardValue::Real(v) => Some(*v),
            CardValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.get(key)? {
            CardValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Insert or replace a card, preserving its position if it exists.
    pub fn set(&mut self, key: &str, value: CardValue) {
        if let Some(slot) = self.cards.iter_mut().find(|(k, _)| k == key) {
            slot.1 = value;
        } else {
            self.cards.push((key.to_string(), value));
        }
    }

    pub fn set_str(&mut self, key: &str, value: &str) {
        self.set(key, CardValue::Str(value.to_string()));
    }

    pub fn set_f64(&mut self, key: &str, value: f64) {
        self.set(key, CardValue::Real(value));
    }

    pub fn set_i64(&mut self, key: &str, value: i64) {
        self.set(key, CardValue::Int(value));
    }

    /// Exposure time in seconds, from the EXPTIME card.
    pub fn exposure_time(&self) -> Option<f64> {
        self.get_f64("EXPTIME")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &CardValue)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
