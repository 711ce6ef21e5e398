use std::fmt;
use std::str::FromStr;

use crate::{Result, SieveError};

/// SAM FLAG bits.
pub mod flag {
    pub const MULTIPLE: u16 = 0x1;
    pub const PROPER: u16 = 0x2;
    pub const UNMAPPED: u16 = 0x4;
    pub const NEXT_UNMAPPED: u16 = 0x8;
    pub const REVERSED: u16 = 0x10;
    pub const NEXT_REVERSED: u16 = 0x20;
    pub const FIRST: u16 = 0x40;
    pub const LAST: u16 = 0x80;
    pub const SECONDARY: u16 = 0x100;
    pub const QC_FAILED: u16 = 0x200;
    pub const DUPLICATE: u16 = 0x400;
    pub const SUPPLEMENTARY: u16 = 0x800;
}

/// Two-character optional field key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tag(pub [u8; 2]);
impl Tag {
    /// Key from text matching `[A-Za-z][A-Za-z0-9]`.
    pub fn parse(key: &str) -> Option<Self> {
        match key.as_bytes() {
            [a, b] if a.is_ascii_alphabetic() && b.is_ascii_alphanumeric() => Some(Tag([*a, *b])),
            _ => None,
        }
    }

    pub const X0: Tag = Tag(*b"X0");
    pub const X1: Tag = Tag(*b"X1");
    pub const XM: Tag = Tag(*b"XM");
    pub const XO: Tag = Tag(*b"XO");
    pub const XG: Tag = Tag(*b"XG");
    pub const RG: Tag = Tag(*b"RG");
    pub const SR: Tag = Tag(*b"sr");
}
impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.0[0] as char, self.0[1] as char)
    }
}

/// Typed optional field value.
///
/// `B` arrays are kept as their raw `subtype,v1,v2,...` text.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TagValue {
    Char(u8),
    Int(i64),
    Float(f32),
    String(String),
    Hex(String),
    Array(String),
}
impl TagValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            TagValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    fn type_char(&self) -> char {
        match self {
            TagValue::Char(_) => 'A',
            TagValue::Int(_) => 'i',
            TagValue::Float(_) => 'f',
            TagValue::String(_) => 'Z',
            TagValue::Hex(_) => 'H',
            TagValue::Array(_) => 'B',
        }
    }
}

/// Optional fields of one alignment, in input order.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tags(Vec<(Tag, TagValue)>);
impl Tags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, tag: Tag) -> Option<&TagValue> {
        self.0.iter().find(|(t, _)| *t == tag).map(|(_, v)| v)
    }

    pub fn contains(&self, tag: Tag) -> bool {
        self.get(tag).is_some()
    }

    /// Replaces an existing value in place, or appends.
    pub fn set(&mut self, tag: Tag, value: TagValue) {
        match self.0.iter_mut().find(|(t, _)| *t == tag) {
            Some((_, v)) => *v = value,
            None => self.0.push((tag, value)),
        }
    }

    pub fn remove(&mut self, tag: Tag) -> Option<TagValue> {
        let pos = self.0.iter().position(|(t, _)| *t == tag)?;
        Some(self.0.remove(pos).1)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Tag, TagValue)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn parse_field(field: &str) -> Result<(Tag, TagValue)> {
        let invalid = || SieveError::InvalidTag(field.to_string());
        let mut parts = field.splitn(3, ':');
        let (tag, kind, value) = match (parts.next(), parts.next(), parts.next()) {
            (Some(key), Some(kind), Some(value)) if kind.len() == 1 => {
                (Tag::parse(key).ok_or_else(invalid)?, kind, value)
            }
            _ => return Err(invalid()),
        };
        let value = match kind {
            "A" => match value.as_bytes() {
                [c] => TagValue::Char(*c),
                _ => return Err(invalid()),
            },
            "i" => TagValue::Int(value.parse().map_err(|_| invalid())?),
            "f" => TagValue::Float(value.parse().map_err(|_| invalid())?),
            "Z" => TagValue::String(value.to_string()),
            "H" => TagValue::Hex(value.to_string()),
            "B" => TagValue::Array(value.to_string()),
            _ => return Err(invalid()),
        };
        Ok((tag, value))
    }
}

impl fmt::Display for Tags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (tag, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\t")?;
            }
            write!(f, "{}:{}:", tag, value.type_char())?;
            match value {
                TagValue::Char(c) => write!(f, "{}", *c as char)?,
                TagValue::Int(v) => write!(f, "{}", v)?,
                TagValue::Float(v) => write!(f, "{}", v)?,
                TagValue::String(s) | TagValue::Hex(s) | TagValue::Array(s) => f.write_str(s)?,
            }
        }
        Ok(())
    }
}

/// One SAM alignment record.
///
/// `refid` is a transient annotation set by the chromosome-index filter; it is
/// never parsed from or written to SAM text.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Alignment {
    pub qname: String,
    pub flag: u16,
    pub rname: String,
    pub pos: i32,
    pub mapq: u8,
    pub cigar: String,
    pub rnext: String,
    pub pnext: i32,
    pub tlen: i32,
    pub seq: String,
    pub qual: String,
    pub tags: Tags,
    pub refid: Option<i32>,
}
impl Default for Alignment {
    fn default() -> Self {
        Self {
            qname: "*".to_string(),
            flag: 0,
            rname: "*".to_string(),
            pos: 0,
            mapq: 255,
            cigar: "*".to_string(),
            rnext: "*".to_string(),
            pnext: 0,
            tlen: 0,
            seq: "*".to_string(),
            qual: "*".to_string(),
            tags: Tags::new(),
            refid: None,
        }
    }
}
impl Alignment {
    pub fn is_unmapped(&self) -> bool {
        self.flag & flag::UNMAPPED != 0
    }

    pub fn is_duplicate(&self) -> bool {
        self.flag & flag::DUPLICATE != 0
    }

    pub fn set_read_group(&mut self, id: &str) {
        self.tags.set(Tag::RG, TagValue::String(id.to_string()));
    }

    pub fn read_group(&self) -> Option<&str> {
        match self.tags.get(Tag::RG) {
            Some(TagValue::String(id)) => Some(id),
            _ => None,
        }
    }
}

fn parse_number<T: FromStr>(field: Option<&str>, name: &str, line: &str) -> Result<T> {
    field
        .and_then(|f| f.parse().ok())
        .ok_or_else(|| SieveError::MalformedRecord(format!("invalid {} in: {}", name, line)))
}

fn parse_text(field: Option<&str>, name: &str, line: &str) -> Result<String> {
    field
        .map(str::to_string)
        .ok_or_else(|| SieveError::MalformedRecord(format!("missing {} in: {}", name, line)))
}

impl FromStr for Alignment {
    type Err = SieveError;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim_end_matches(['\n', '\r']);
        let mut fields = line.split('\t');
        let mut aln = Alignment {
            qname: parse_text(fields.next(), "QNAME", line)?,
            flag: parse_number(fields.next(), "FLAG", line)?,
            rname: parse_text(fields.next(), "RNAME", line)?,
            pos: parse_number(fields.next(), "POS", line)?,
            mapq: parse_number(fields.next(), "MAPQ", line)?,
            cigar: parse_text(fields.next(), "CIGAR", line)?,
            rnext: parse_text(fields.next(), "RNEXT", line)?,
            pnext: parse_number(fields.next(), "PNEXT", line)?,
            tlen: parse_number(fields.next(), "TLEN", line)?,
            seq: parse_text(fields.next(), "SEQ", line)?,
            qual: parse_text(fields.next(), "QUAL", line)?,
            tags: Tags::new(),
            refid: None,
        };
        for field in fields {
            let (tag, value) = Tags::parse_field(field)?;
            aln.tags.0.push((tag, value));
        }
        Ok(aln)
    }
}

impl fmt::Display for Alignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\t{}",
            self.qname,
            self.flag,
            self.rname,
            self.pos,
            self.mapq,
            self.cigar,
            self.rnext,
            self.pnext,
            self.tlen,
            self.seq,
            self.qual
        )?;
        if !self.tags.is_empty() {
            write!(f, "\t{}", self.tags)?;
        }
        Ok(())
    }
}
