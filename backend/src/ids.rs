use ring::rand::{SecureRandom, SystemRandom};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("system random number generator unavailable")]
pub struct IdError;

/// Generates `0x`-prefixed 32-byte identifiers from the OS CSPRNG, the shape
/// used for loan, bridge, swap and schedule ids.
#[derive(Clone)]
pub struct IdGenerator {
    rng: SystemRandom,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    pub fn hex_id(&self) -> Result<String, IdError> {
        let mut bytes = [0u8; 32];
        self.rng.fill(&mut bytes).map_err(|_| IdError)?;

        let hex: String = bytes.iter().map(|b| format!("{b:02x}")).collect();
        Ok(format!("0x{hex}"))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for IdGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("IdGenerator")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_prefixed_hex_of_32_bytes() {
        let id = IdGenerator::new().hex_id().unwrap();
        assert_eq!(id.len(), 66);
        assert!(id.starts_with("0x"));
        assert!(id[2..].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
    }

    #[test]
    fn ids_do_not_repeat() {
        let generator = IdGenerator::new();
        let ids: HashSet<String> = (0..256).map(|_| generator.hex_id().unwrap()).collect();
        assert_eq!(ids.len(), 256);
    }
}
