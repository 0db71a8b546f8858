//! SPIR-V binary writer
//!
//! Produces the word stream of a [`SpirvModule`]: the five-word header
//! followed by every section in logical-layout order.

use super::module::SpirvModule;
use spirv::Word;

/// Generator magic: tool id 0 (unregistered) in the high half, tool version
/// in the low half.
pub const GENERATOR_WORD: u32 = 1;

/// Number of words in the module header.
pub const HEADER_WORDS: usize = 5;

pub struct BinaryWriter;

impl BinaryWriter {
    /// Encode `module` into SPIR-V words.
    pub fn write(module: &SpirvModule) -> Vec<Word> {
        let body: usize = module.instructions().map(|i| i.word_count()).sum();
        let mut words = Vec::with_capacity(HEADER_WORDS + body);
        let (major, minor) = module.version;
        words.push(spirv::MAGIC_NUMBER);
        words.push(((major as u32) << 16) | ((minor as u32) << 8));
        words.push(module.generator);
        words.push(module.id_bound);
        // Reserved schema
        words.push(0);
        for instruction in module.instructions() {
            instruction.push_words(&mut words);
        }
        words
    }

    /// Little-endian byte image of a word stream, as written to `.spv` files.
    pub fn to_bytes(words: &[Word]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    /// Inverse of [`BinaryWriter::to_bytes`]; `None` if the length is not a
    /// whole number of words or the magic number is missing.
    pub fn from_bytes(bytes: &[u8]) -> Option<Vec<Word>> {
        if bytes.len() % 4 != 0 {
            return None;
        }
        let words: Vec<Word> = bytes
            .chunks_exact(4)
            .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        (words.first() == Some(&spirv::MAGIC_NUMBER)).then_some(words)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::spirv::module::Instruction;

    #[test]
    fn test_header() {
        let module = SpirvModule {
            version: (1, 3),
            generator: GENERATOR_WORD,
            id_bound: 7,
            ..Default::default()
        };
        let words = BinaryWriter::write(&module);
        assert_eq!(words, vec![0x0723_0203, 0x0001_0300, GENERATOR_WORD, 7, 0]);
    }

    #[test]
    fn test_sections_in_layout_order() {
        let mut module = SpirvModule {
            version: (1, 3),
            id_bound: 2,
            ..Default::default()
        };
        // Filled out of order on purpose
        module
            .types_globals
            .push(Instruction::new(spirv::Op::TypeVoid).with_result(1));
        module
            .capabilities
            .push(Instruction::capability(spirv::Capability::Shader));
        let words = BinaryWriter::write(&module);
        assert_eq!(words[HEADER_WORDS], (2 << 16) | spirv::Op::Capability as u32);
        assert_eq!(words[HEADER_WORDS + 2], (2 << 16) | spirv::Op::TypeVoid as u32);
        assert_eq!(words.len(), HEADER_WORDS + 4);
    }

    #[test]
    fn test_bytes_round_trip() {
        let words = vec![spirv::MAGIC_NUMBER, 0x0001_0300, 1, 1, 0];
        let bytes = BinaryWriter::to_bytes(&words);
        assert_eq!(&bytes[..4], &[0x03, 0x02, 0x23, 0x07]);
        assert_eq!(BinaryWriter::from_bytes(&bytes), Some(words));
        assert_eq!(BinaryWriter::from_bytes(&bytes[..6]), None);
        assert_eq!(BinaryWriter::from_bytes(&[0; 8]), None);
    }
}
