//! Code text: the alphabet, normalization, and batch generation.

pub mod alphabet;
pub mod generator;

pub use alphabet::{ALPHABET, is_canonical, normalize};
pub use generator::{CandidateSource, CodeGenerator, GeneratorConfig, RandomSource};
