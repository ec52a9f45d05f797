use std::collections::BTreeSet;
use std::io::{self, Write};

use crate::index::Index;
use crate::logistic::LogisticClassifier;
use crate::model::{Sections, MAGIC, VERSION};

use super::ModelType;

/// Little-endian writer for the model format read by `ModelReader`
pub(crate) struct ModelWriter<W: Write> {
    inner: W,
}

impl<W: Write> ModelWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> W {
        self.inner
    }

    pub fn write_header(&mut self, model_type: ModelType, sections: Sections) -> io::Result<()> {
        self.inner.write_all(MAGIC)?;
        self.write_u32(VERSION)?;
        self.write_u32(model_type.to_u32())?;
        self.write_u32(sections.bits())
    }

    pub fn write_u32(&mut self, v: u32) -> io::Result<()> {
        self.inner.write_all(&v.to_le_bytes())
    }

    pub fn write_len(&mut self, len: usize) -> io::Result<()> {
        let len = u32::try_from(len)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "length overflows u32"))?;
        self.write_u32(len)
    }

    pub fn write_f64s(&mut self, values: &[f64]) -> io::Result<()> {
        for v in values {
            self.inner.write_all(&v.to_le_bytes())?;
        }
        Ok(())
    }

    pub fn write_str(&mut self, s: &str) -> io::Result<()> {
        self.write_len(s.len())?;
        self.inner.write_all(s.as_bytes())
    }

    pub fn write_index(&mut self, index: &Index) -> io::Result<()> {
        self.write_len(index.len())?;
        for (s, _) in index.iter() {
            self.write_str(s)?;
        }
        Ok(())
    }

    pub fn write_string_set(&mut self, set: &BTreeSet<String>) -> io::Result<()> {
        self.write_len(set.len())?;
        for s in set {
            self.write_str(s)?;
        }
        Ok(())
    }

    pub fn write_logistic(&mut self, model: &LogisticClassifier) -> io::Result<()> {
        self.write_len(model.num_labels())?;
        self.write_len(model.num_features())?;
        self.write_f64s(model.weights())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ModelReader;

    #[test]
    fn test_write_then_read_sections() {
        let index: Index = ["atleastonce", "none", "co:s|A|d|B|"].iter().collect();
        let deps: BTreeSet<String> = ["co:s|B|d|A|".to_string()].into_iter().collect();
        let mut model = LogisticClassifier::new(2, 3);
        model.set_weight(1, 2, -0.25);

        let mut writer = ModelWriter::new(Vec::new());
        writer
            .write_header(ModelType::JointBayes, Sections::JOINT)
            .unwrap();
        writer.write_index(&index).unwrap();
        writer.write_string_set(&deps).unwrap();
        writer.write_logistic(&model).unwrap();
        let buf = writer.into_inner();

        let mut reader = ModelReader::new(&buf);
        let header = reader.read_header().unwrap();
        assert_eq!(header.model_type, ModelType::JointBayes);
        assert_eq!(reader.read_index().unwrap(), index);
        assert_eq!(reader.read_string_set().unwrap(), deps);
        assert_eq!(reader.read_logistic().unwrap(), model);
        assert!(reader.is_at_end());
    }
}
