//! Text encodings understood by the log viewer.
//!
//! The indexer needs to know how wide a code unit is and where the `\n`
//! byte sits inside the encoded terminator; the line-access API needs to
//! decode raw bytes into strings. Both sides are served by [`Encoding`].
//!
//! Detection is heuristic: byte-order marks are authoritative, BOM-less
//! UTF-16 is recognised from its zero-byte pattern, valid multi-byte UTF-8
//! is recognised as such, and everything else falls back to ISO-8859-1.

use crate::error::{CoreError, Result};

/// Character encodings supported for indexing and display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Encoding {
    /// ISO-8859-1 (Latin-1). Single byte, maps 1:1 onto U+0000..U+00FF.
    Latin1,
    /// UTF-8, variable width.
    Utf8,
    /// UTF-16, little endian.
    Utf16Le,
    /// UTF-16, big endian.
    Utf16Be,
    /// UTF-32, little endian.
    Utf32Le,
    /// UTF-32, big endian.
    Utf32Be,
}

/// Geometry of an encoding's code units.
///
/// Two encodings that share a width class produce identical line-end byte
/// offsets for the same content, so switching the display encoding between
/// them does not invalidate an existing line index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WidthClass {
    /// Bytes per code unit.
    pub unit_bytes: u8,
    /// Offset of the 0x0A byte within an encoded `\n` unit.
    pub terminator_offset: u8,
}

/// How many bytes of the start of a source the detector looks at.
const DETECTION_SAMPLE: usize = 4096;

impl Encoding {
    /// Canonical name of the encoding.
    pub fn name(self) -> &'static str {
        match self {
            Encoding::Latin1 => "ISO-8859-1",
            Encoding::Utf8 => "UTF-8",
            Encoding::Utf16Le => "UTF-16LE",
            Encoding::Utf16Be => "UTF-16BE",
            Encoding::Utf32Le => "UTF-32LE",
            Encoding::Utf32Be => "UTF-32BE",
        }
    }

    /// Look up an encoding by name. Case and separators are ignored.
    pub fn for_name(name: &str) -> Result<Self> {
        let key: String = name
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();

        match key.as_str() {
            "iso88591" | "latin1" | "latin" => Ok(Encoding::Latin1),
            "utf8" => Ok(Encoding::Utf8),
            "utf16" | "utf16le" => Ok(Encoding::Utf16Le),
            "utf16be" => Ok(Encoding::Utf16Be),
            "utf32" | "utf32le" => Ok(Encoding::Utf32Le),
            "utf32be" => Ok(Encoding::Utf32Be),
            _ => Err(CoreError::UnknownEncoding(String::from(name))),
        }
    }

    /// The byte-order mark announcing this encoding. Empty for encodings
    /// that have none.
    pub fn bom(self) -> &'static [u8] {
        match self {
            Encoding::Latin1 => &[],
            Encoding::Utf8 => &[0xEF, 0xBB, 0xBF],
            Encoding::Utf16Le => &[0xFF, 0xFE],
            Encoding::Utf16Be => &[0xFE, 0xFF],
            Encoding::Utf32Le => &[0xFF, 0xFE, 0x00, 0x00],
            Encoding::Utf32Be => &[0x00, 0x00, 0xFE, 0xFF],
        }
    }

    /// Bytes per code unit (1 for Latin-1 and UTF-8).
    pub fn code_unit_width(self) -> usize {
        match self {
            Encoding::Latin1 | Encoding::Utf8 => 1,
            Encoding::Utf16Le | Encoding::Utf16Be => 2,
            Encoding::Utf32Le | Encoding::Utf32Be => 4,
        }
    }

    /// The code-unit geometry of this encoding.
    pub fn width_class(self) -> WidthClass {
        let (unit_bytes, terminator_offset) = match self {
            Encoding::Latin1 | Encoding::Utf8 => (1, 0),
            Encoding::Utf16Le => (2, 0),
            Encoding::Utf16Be => (2, 1),
            Encoding::Utf32Le => (4, 0),
            Encoding::Utf32Be => (4, 3),
        };

        WidthClass {
            unit_bytes,
            terminator_offset,
        }
    }

    /// Guess the encoding of a source from its first bytes.
    ///
    /// Inconclusive input falls back to [`Encoding::Latin1`], which decodes
    /// any byte sequence without loss of addressing.
    pub fn detect(bytes: &[u8]) -> Self {
        let sample = &bytes[..bytes.len().min(DETECTION_SAMPLE)];

        // Byte-order marks are authoritative. UTF-32 first: its LE BOM
        // starts with the UTF-16LE one.
        if sample.starts_with(&[0x00, 0x00, 0xFE, 0xFF]) {
            return Encoding::Utf32Be;
        }
        if sample.starts_with(&[0xFF, 0xFE, 0x00, 0x00]) {
            return Encoding::Utf32Le;
        }
        if sample.starts_with(&[0xFE, 0xFF]) {
            return Encoding::Utf16Be;
        }
        if sample.starts_with(&[0xFF, 0xFE]) {
            return Encoding::Utf16Le;
        }
        if sample.starts_with(&[0xEF, 0xBB, 0xBF]) {
            return Encoding::Utf8;
        }

        if let Some(wide) = detect_bomless_utf16(sample) {
            return wide;
        }

        if is_multibyte_utf8(sample) {
            return Encoding::Utf8;
        }

        Encoding::Latin1
    }

    /// Decode raw bytes with this encoding.
    ///
    /// Invalid sequences are replaced with U+FFFD. A byte-order mark at the
    /// start of the input is dropped.
    pub fn decode(self, bytes: &[u8]) -> String {
        match self {
            Encoding::Latin1 => bytes.iter().map(|&b| b as char).collect(),
            Encoding::Utf8 => {
                let bytes = bytes.strip_prefix([0xEF, 0xBB, 0xBF].as_slice()).unwrap_or(bytes);
                String::from_utf8_lossy(bytes).into_owned()
            }
            Encoding::Utf16Le | Encoding::Utf16Be => self.decode_utf16(bytes),
            Encoding::Utf32Le | Encoding::Utf32Be => self.decode_utf32(bytes),
        }
    }

    fn decode_utf16(self, bytes: &[u8]) -> String {
        let mut units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| {
                let pair = [pair[0], pair[1]];
                if self == Encoding::Utf16Le {
                    u16::from_le_bytes(pair)
                } else {
                    u16::from_be_bytes(pair)
                }
            })
            .collect();

        if units.first() == Some(&0xFEFF) {
            units.remove(0);
        }

        let mut decoded = String::from_utf16_lossy(&units);
        if bytes.len() % 2 != 0 {
            decoded.push(char::REPLACEMENT_CHARACTER);
        }
        decoded
    }

    fn decode_utf32(self, bytes: &[u8]) -> String {
        let mut decoded = String::with_capacity(bytes.len() / 4);

        for (index, quad) in bytes.chunks_exact(4).enumerate() {
            let quad = [quad[0], quad[1], quad[2], quad[3]];
            let unit = if self == Encoding::Utf32Le {
                u32::from_le_bytes(quad)
            } else {
                u32::from_be_bytes(quad)
            };

            if index == 0 && unit == 0xFEFF {
                continue;
            }
            decoded.push(char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER));
        }

        if bytes.len() % 4 != 0 {
            decoded.push(char::REPLACEMENT_CHARACTER);
        }
        decoded
    }
}

impl Default for Encoding {
    fn default() -> Self {
        Encoding::Latin1
    }
}

impl std::fmt::Display for Encoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Recognise BOM-less UTF-16 from the distribution of zero bytes.
///
/// Mostly-ASCII text encoded as UTF-16 has a zero in every other byte; the
/// parity of the zeros tells the endianness apart.
fn detect_bomless_utf16(sample: &[u8]) -> Option<Encoding> {
    let pairs = sample.len() / 2;
    if pairs < 4 {
        return None;
    }

    let mut even_zeros = 0usize;
    let mut odd_zeros = 0usize;
    for (index, &byte) in sample[..pairs * 2].iter().enumerate() {
        if byte == 0 {
            if index % 2 == 0 {
                even_zeros += 1;
            } else {
                odd_zeros += 1;
            }
        }
    }

    // Require a zero in the majority of units on one side and almost none
    // on the other.
    if odd_zeros * 2 > pairs && even_zeros * 10 < pairs {
        Some(Encoding::Utf16Le)
    } else if even_zeros * 2 > pairs && odd_zeros * 10 < pairs {
        Some(Encoding::Utf16Be)
    } else {
        None
    }
}

/// True if the sample is valid UTF-8 containing at least one multi-byte
/// sequence. A sequence cut short at the end of the sample is tolerated.
fn is_multibyte_utf8(sample: &[u8]) -> bool {
    let valid_up_to = match std::str::from_utf8(sample) {
        Ok(_) => sample.len(),
        // error_len() of None means the sample ends mid-sequence
        Err(e) if e.error_len().is_none() => e.valid_up_to(),
        Err(_) => return false,
    };

    sample[..valid_up_to].iter().any(|&b| b >= 0x80)
}
