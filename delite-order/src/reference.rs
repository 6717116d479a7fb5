use rand::Rng;

pub const REFERENCE_LENGTH: usize = 8;
const REFERENCE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Source of human-readable booking reference codes
pub trait ReferenceGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniform random `[A-Z0-9]{8}` codes
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomReferenceGenerator;

impl ReferenceGenerator for RandomReferenceGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::thread_rng();
        (0..REFERENCE_LENGTH)
            .map(|_| REFERENCE_ALPHABET[rng.gen_range(0..REFERENCE_ALPHABET.len())] as char)
            .collect()
    }
}

pub fn is_valid_reference(reference: &str) -> bool {
    reference.len() == REFERENCE_LENGTH
        && reference.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
