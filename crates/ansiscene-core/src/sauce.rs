//! SAUCE metadata trailer bridge.
//!
//! SAUCE ("Standard Architecture for Universal Comment Extensions") is a
//! 128-byte record appended after the visible bytes of a file, optionally
//! preceded by a comment block and an EOF (0x1A) marker so DOS-era pagers
//! stop before the metadata. Parsing is never fatal: a missing or mangled
//! trailer just means "no metadata".

use std::fmt;

use crate::codepage::{ByteEncoding, decode_byte, encode_byte};

const RECORD_LEN: usize = 128;
const COMMENT_LINE_LEN: usize = 64;
const COMMENT_HEAD: &[u8; 5] = b"COMNT";
const EOF_BYTE: u8 = 0x1a;

/// SAUCE data type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DataType {
    #[default]
    None,
    /// Character-based art (ANSI, ASCII, RIP…). File type 1 = ANSI.
    Character,
    Bitmap,
    Vector,
    Audio,
    /// Raw VGA text-mode dump; the file type byte encodes width/2.
    BinaryText,
    XBin,
    Archive,
    Executable,
    Other(u8),
}

impl DataType {
    #[must_use]
    pub fn from_byte(b: u8) -> DataType {
        match b {
            0 => DataType::None,
            1 => DataType::Character,
            2 => DataType::Bitmap,
            3 => DataType::Vector,
            4 => DataType::Audio,
            5 => DataType::BinaryText,
            6 => DataType::XBin,
            7 => DataType::Archive,
            8 => DataType::Executable,
            other => DataType::Other(other),
        }
    }

    #[must_use]
    pub fn as_byte(self) -> u8 {
        match self {
            DataType::None => 0,
            DataType::Character => 1,
            DataType::Bitmap => 2,
            DataType::Vector => 3,
            DataType::Audio => 4,
            DataType::BinaryText => 5,
            DataType::XBin => 6,
            DataType::Archive => 7,
            DataType::Executable => 8,
            DataType::Other(b) => b,
        }
    }
}

/// A parsed (or to-be-written) SAUCE record.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SauceRecord {
    pub title: String,
    pub author: String,
    pub group: String,
    /// CCYYMMDD, or empty when unknown.
    pub date: String,
    pub file_size: u32,
    pub data_type: DataType,
    pub file_type: u8,
    pub tinfo1: u16,
    pub tinfo2: u16,
    pub tinfo3: u16,
    pub tinfo4: u16,
    pub flags: u8,
    /// TInfoS: the declared font name.
    pub font_name: String,
    pub comments: Vec<String>,
}

impl SauceRecord {
    /// Declared column width, when the record carries one.
    ///
    /// Character art stores columns in TInfo1; BinaryText encodes half the
    /// width in the file type byte.
    #[must_use]
    pub fn declared_columns(&self) -> Option<u32> {
        match self.data_type {
            DataType::Character if self.tinfo1 > 0 => Some(u32::from(self.tinfo1)),
            DataType::BinaryText if self.file_type > 0 => Some(u32::from(self.file_type) * 2),
            _ => None,
        }
    }

    /// Declared row count (TInfo2 for character art).
    #[must_use]
    pub fn declared_rows(&self) -> Option<u32> {
        match self.data_type {
            DataType::Character if self.tinfo2 > 0 => Some(u32::from(self.tinfo2)),
            _ => None,
        }
    }
}

/// Result of scanning a byte buffer for a trailing SAUCE record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SauceScan {
    pub record: Option<SauceRecord>,
    /// Length of the visible payload, excluding EOF byte and metadata.
    pub payload_len: usize,
    pub had_eof_byte: bool,
    pub had_comment_block: bool,
}

/// Scan `bytes` for a SAUCE trailer. Never fails.
#[must_use]
pub fn parse(bytes: &[u8]) -> SauceScan {
    let absent = SauceScan {
        record: None,
        payload_len: bytes.len(),
        had_eof_byte: false,
        had_comment_block: false,
    };
    if bytes.len() < RECORD_LEN {
        return absent;
    }
    let rec_start = bytes.len() - RECORD_LEN;
    let rec = &bytes[rec_start..];
    if &rec[0..5] != b"SAUCE" {
        return absent;
    }

    let comment_count = rec[104] as usize;
    let mut record = SauceRecord {
        title: decode_field(&rec[7..42]),
        author: decode_field(&rec[42..62]),
        group: decode_field(&rec[62..82]),
        date: decode_date(&rec[82..90]),
        file_size: u32::from_le_bytes([rec[90], rec[91], rec[92], rec[93]]),
        data_type: DataType::from_byte(rec[94]),
        file_type: rec[95],
        tinfo1: u16::from_le_bytes([rec[96], rec[97]]),
        tinfo2: u16::from_le_bytes([rec[98], rec[99]]),
        tinfo3: u16::from_le_bytes([rec[100], rec[101]]),
        tinfo4: u16::from_le_bytes([rec[102], rec[103]]),
        flags: rec[105],
        font_name: decode_zstring(&rec[106..128]),
        comments: Vec::new(),
    };

    // The comment block, when declared, sits directly before the record.
    let mut meta_start = rec_start;
    let mut had_comment_block = false;
    if comment_count > 0 {
        let block_len = COMMENT_HEAD.len() + comment_count * COMMENT_LINE_LEN;
        if let Some(block_start) = rec_start.checked_sub(block_len)
            && &bytes[block_start..block_start + 5] == COMMENT_HEAD
        {
            for i in 0..comment_count {
                let at = block_start + 5 + i * COMMENT_LINE_LEN;
                record.comments.push(decode_field(&bytes[at..at + COMMENT_LINE_LEN]));
            }
            meta_start = block_start;
            had_comment_block = true;
        }
        // Declared comments without a block: tolerate, keep the record.
    }

    let mut payload_len = meta_start;
    let mut had_eof_byte = false;
    if payload_len > 0 && bytes[payload_len - 1] == EOF_BYTE {
        payload_len -= 1;
        had_eof_byte = true;
    }

    SauceScan {
        record: Some(record),
        payload_len,
        had_eof_byte,
        had_comment_block,
    }
}

/// Options controlling [`append`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SauceWriteOptions {
    /// Emit the 0x1A EOF byte before the metadata.
    pub eof_byte: bool,
    /// Emit the comment block (when the record has comments).
    pub comments: bool,
}

impl Default for SauceWriteOptions {
    fn default() -> Self {
        Self { eof_byte: true, comments: true }
    }
}

/// Errors from serializing a SAUCE record.
#[derive(Debug)]
pub enum SauceError {
    /// More than 255 comment lines after chunking.
    TooManyComments(usize),
}

impl fmt::Display for SauceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SauceError::TooManyComments(n) => {
                write!(f, "SAUCE comment block limited to 255 lines, got {n}")
            }
        }
    }
}

impl std::error::Error for SauceError {}

/// Append `record` to `out` (EOF byte, comment block, record).
///
/// Text fields are sanitized: control characters dropped, over-long values
/// truncated, an invalid date cleared. Comments are re-chunked at 64
/// codepoints per line.
pub fn append(
    out: &mut Vec<u8>,
    record: &SauceRecord,
    options: &SauceWriteOptions,
) -> Result<(), SauceError> {
    let lines = if options.comments { chunk_comments(&record.comments)? } else { Vec::new() };

    if options.eof_byte {
        out.push(EOF_BYTE);
    }
    if !lines.is_empty() {
        out.extend_from_slice(COMMENT_HEAD);
        for line in &lines {
            push_field(out, line, COMMENT_LINE_LEN);
        }
    }

    out.extend_from_slice(b"SAUCE00");
    push_field(out, &record.title, 35);
    push_field(out, &record.author, 20);
    push_field(out, &record.group, 20);
    let date = if is_valid_date(&record.date) { record.date.as_str() } else { "" };
    push_field(out, date, 8);
    out.extend_from_slice(&record.file_size.to_le_bytes());
    out.push(record.data_type.as_byte());
    out.push(record.file_type);
    out.extend_from_slice(&record.tinfo1.to_le_bytes());
    out.extend_from_slice(&record.tinfo2.to_le_bytes());
    out.extend_from_slice(&record.tinfo3.to_le_bytes());
    out.extend_from_slice(&record.tinfo4.to_le_bytes());
    out.push(lines.len() as u8);
    out.push(record.flags);
    push_zstring(out, &record.font_name, 22);
    Ok(())
}

fn decode_field(bytes: &[u8]) -> String {
    let end = bytes
        .iter()
        .rposition(|&b| b != b' ' && b != 0)
        .map_or(0, |i| i + 1);
    bytes[..end]
        .iter()
        .map(|&b| decode_byte(b, ByteEncoding::Cp437))
        .collect()
}

fn decode_zstring(bytes: &[u8]) -> String {
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(bytes.len());
    decode_field(&bytes[..end])
}

fn decode_date(bytes: &[u8]) -> String {
    if bytes.iter().all(|b| b.is_ascii_digit()) {
        bytes.iter().map(|&b| b as char).collect()
    } else {
        String::new()
    }
}

fn is_valid_date(date: &str) -> bool {
    date.len() == 8 && date.bytes().all(|b| b.is_ascii_digit())
}

fn sanitize(text: &str) -> impl Iterator<Item = char> + '_ {
    text.chars().filter(|c| !c.is_control())
}

fn push_field(out: &mut Vec<u8>, text: &str, width: usize) {
    let mut written = 0;
    for ch in sanitize(text).take(width) {
        out.push(encode_byte(ch, ByteEncoding::Cp437).unwrap_or(b'?'));
        written += 1;
    }
    out.resize(out.len() + (width - written), b' ');
}

fn push_zstring(out: &mut Vec<u8>, text: &str, width: usize) {
    let mut written = 0;
    // Leave room for the terminating NUL.
    for ch in sanitize(text).take(width - 1) {
        out.push(encode_byte(ch, ByteEncoding::Cp437).unwrap_or(b'?'));
        written += 1;
    }
    out.resize(out.len() + (width - written), 0);
}

fn chunk_comments(comments: &[String]) -> Result<Vec<String>, SauceError> {
    let mut lines = Vec::new();
    for comment in comments {
        let chars: Vec<char> = sanitize(comment).collect();
        if chars.is_empty() {
            lines.push(String::new());
            continue;
        }
        for chunk in chars.chunks(COMMENT_LINE_LEN) {
            lines.push(chunk.iter().collect());
        }
    }
    if lines.len() > 255 {
        return Err(SauceError::TooManyComments(lines.len()));
    }
    Ok(lines)
}
