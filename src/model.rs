use std::collections::BTreeSet;

use bitflags::bitflags;
use bstr::ByteSlice;

use crate::errors::{Error, Result};
use crate::index::Index;
use crate::logistic::LogisticClassifier;
use crate::train::ModelType;

pub(crate) const MAGIC: &[u8; 4] = b"MIML";
pub(crate) const VERSION: u32 = 1;

bitflags! {
    /// Sections present in a model file
    #[derive(Default)]
    pub struct Sections: u32 {
        /// Averaged perceptron weights
        const PERCEPTRON = 0x01;
        /// Fold Z classifiers and Y classifiers
        const JOINT = 0x02;
        /// Fold-trained local models cached before EM
        const INITIAL = 0x04;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Header {
    pub model_type: ModelType,
    pub sections: Sections,
}

#[inline]
pub(crate) fn unpack_u32(buf: &[u8]) -> Result<u32> {
    if buf.len() < 4 {
        return Err(Error::invalid_format("not enough data for unpacking u32"));
    }
    Ok(u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]))
}

#[inline]
fn unpack_f64(buf: &[u8]) -> Result<f64> {
    if buf.len() < 8 {
        return Err(Error::invalid_format("not enough data for unpacking f64"));
    }
    Ok(f64::from_le_bytes([
        buf[0], buf[1], buf[2], buf[3], buf[4], buf[5], buf[6], buf[7],
    ]))
}

/// Cursor over a serialized model
#[derive(Debug)]
pub(crate) struct ModelReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> ModelReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn rest(&self) -> &'a [u8] {
        &self.buf[self.pos.min(self.buf.len())..]
    }

    pub fn is_at_end(&self) -> bool {
        self.pos >= self.buf.len()
    }

    pub fn read_header(&mut self) -> Result<Header> {
        if !self.rest().starts_with(MAGIC) {
            return Err(Error::invalid_format("magic mismatch"));
        }
        self.pos += MAGIC.len();
        let version = self.read_u32()?;
        if version != VERSION {
            return Err(Error::invalid_format(format!(
                "unsupported version {}",
                version
            )));
        }
        let raw_type = self.read_u32()?;
        let model_type = ModelType::from_u32(raw_type)
            .ok_or_else(|| Error::invalid_format(format!("unknown model type {}", raw_type)))?;
        let raw_sections = self.read_u32()?;
        let sections = Sections::from_bits(raw_sections).ok_or_else(|| {
            Error::invalid_format(format!("unknown section flags {:#x}", raw_sections))
        })?;
        Ok(Header {
            model_type,
            sections,
        })
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let v = unpack_u32(self.rest())?;
        self.pos += 4;
        Ok(v)
    }

    pub fn read_len(&mut self) -> Result<usize> {
        let len = self.read_u32()? as usize;
        // every element takes at least one byte
        if len > self.rest().len() {
            return Err(Error::invalid_format(format!(
                "length {} exceeds the remaining {} bytes",
                len,
                self.rest().len()
            )));
        }
        Ok(len)
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let v = unpack_f64(self.rest())?;
        self.pos += 8;
        Ok(v)
    }

    pub fn read_f64s(&mut self, len: usize) -> Result<Vec<f64>> {
        match len.checked_mul(8) {
            Some(bytes) if bytes <= self.rest().len() => {}
            _ => return Err(Error::invalid_format("not enough data for weight vector")),
        }
        (0..len).map(|_| self.read_f64()).collect()
    }

    pub fn read_str(&mut self) -> Result<&'a str> {
        let len = self.read_u32()? as usize;
        let rest = self.rest();
        if rest.len() < len {
            return Err(Error::invalid_format("not enough data for string"));
        }
        let s = rest[..len].to_str()?;
        self.pos += len;
        Ok(s)
    }

    pub fn read_index(&mut self) -> Result<Index> {
        let len = self.read_len()?;
        let mut index = Index::new();
        for _ in 0..len {
            let s = self.read_str()?;
            let before = index.len();
            index.get_or_insert(s);
            if index.len() == before {
                return Err(Error::invalid_format(format!("duplicate index entry {}", s)));
            }
        }
        Ok(index)
    }

    pub fn read_string_set(&mut self) -> Result<BTreeSet<String>> {
        let len = self.read_len()?;
        (0..len).map(|_| self.read_str().map(str::to_string)).collect()
    }

    pub fn read_logistic(&mut self) -> Result<LogisticClassifier> {
        let num_labels = self.read_u32()? as usize;
        let num_features = self.read_u32()? as usize;
        let len = num_labels
            .checked_mul(num_features)
            .ok_or_else(|| Error::invalid_format("logistic shape overflows"))?;
        let weights = self.read_f64s(len)?;
        Ok(LogisticClassifier::from_weights(
            num_labels,
            num_features,
            weights,
        ))
    }
}
