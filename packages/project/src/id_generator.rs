use crc32fast::Hasher;

/// Derive a stable session id from a session label using CRC32.
pub fn get_session_id(label: &str) -> String {
    let mut hasher = Hasher::new();
    hasher.update(label.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Sequential ID generator for patches, transactions and placed entities
/// within one editing session.
///
/// Generated ids are `<seed>-<n>` where the seed is hex and never contains
/// `:`. Ids are embedded in colon-delimited hunk refs, so the delimiter
/// must not appear in them.
#[derive(Debug, Clone)]
pub struct IdGenerator {
    seed: String,
    count: u32,
}

impl IdGenerator {
    pub fn new(label: &str) -> Self {
        Self {
            seed: get_session_id(label),
            count: 0,
        }
    }

    pub fn from_seed(seed: String) -> Self {
        Self { seed, count: 0 }
    }

    /// Generate next sequential ID.
    pub fn new_id(&mut self) -> String {
        self.count += 1;
        format!("{}-{}", self.seed, self.count)
    }

    pub fn seed(&self) -> &str {
        &self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_id_is_stable() {
        assert_eq!(get_session_id("session-a"), get_session_id("session-a"));
        assert_ne!(get_session_id("session-a"), get_session_id("session-b"));
    }

    #[test]
    fn ids_are_sequential_and_colon_free() {
        let mut gen = IdGenerator::new("session-a");
        let a = gen.new_id();
        let b = gen.new_id();
        assert_ne!(a, b);
        assert!(a.ends_with("-1"));
        assert!(b.ends_with("-2"));
        assert!(!a.contains(':'));
    }
}
