use std::fmt;
use std::str::FromStr;

/// Bases accepted on FASTQ sequence lines
pub const ALLOWED_BASES: &[u8] = b"ATCGU";

/// 128-bit content fingerprint of a query, rendered as 32 lowercase hex chars
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Digest([u8; 16]);

impl Digest {
    pub fn of(text: &str) -> Self {
        Digest(md5::compute(text.as_bytes()).0)
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

impl FromStr for Digest {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() != 32 || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(format!("Not a 32 character hex digest: {}", s));
        }
        let mut bytes = [0u8; 16];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&s[2 * i..2 * i + 2], 16)
                .map_err(|e| format!("Invalid digest {}: {}", s, e))?;
        }
        Ok(Digest(bytes))
    }
}

/// One nucleotide sequence submitted for comparison.
///
/// The stored text is the canonical form (whitespace removed, upper case) and
/// the digest is computed from it once, so equal sequences from any source
/// share a cache slot.
#[derive(Debug, Clone)]
pub struct Query {
    sequence: String,
    digest: Digest,
}

impl Query {
    pub fn new(sequence: &str) -> Self {
        let sequence: String = sequence
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| c.to_ascii_uppercase())
            .collect();
        let digest = Digest::of(&sequence);
        Self { sequence, digest }
    }

    pub fn as_str(&self) -> &str {
        &self.sequence
    }

    pub fn digest(&self) -> Digest {
        self.digest
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Leading bases used to label the query in logs and output
    pub fn prefix(&self, n: usize) -> &str {
        let end = self
            .sequence
            .char_indices()
            .nth(n)
            .map(|(i, _)| i)
            .unwrap_or(self.sequence.len());
        &self.sequence[..end]
    }
}

impl PartialEq for Query {
    fn eq(&self, other: &Self) -> bool {
        self.sequence == other.sequence
    }
}

impl Eq for Query {}

impl std::hash::Hash for Query {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.sequence.hash(state);
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.sequence)
    }
}

impl From<&str> for Query {
    fn from(sequence: &str) -> Self {
        Query::new(sequence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digest_matches_md5_hex() {
        // md5("ACGT")
        let query = Query::new("ACGT");
        assert_eq!(
            query.digest().to_string(),
            format!("{:x}", md5::compute(b"ACGT"))
        );
        assert_eq!(query.digest().to_string().len(), 32);
    }

    #[test]
    fn test_equal_text_shares_digest() {
        let a = Query::new("acgt\nACGT");
        let b = Query::new("ACGTACGT");
        assert_eq!(a, b);
        assert_eq!(a.digest(), b.digest());
        assert_ne!(a.digest(), Query::new("ACGTACGA").digest());
    }

    #[test]
    fn test_digest_hex_parse() {
        let digest = Query::new("AAAA").digest();
        let parsed: Digest = digest.to_string().parse().unwrap();
        assert_eq!(parsed, digest);
        assert!("xyz".parse::<Digest>().is_err());
        assert!("g".repeat(32).parse::<Digest>().is_err());
    }

    #[test]
    fn test_prefix() {
        let query = Query::new("ACGTACGTACGTAC");
        assert_eq!(query.prefix(10), "ACGTACGTAC");
        assert_eq!(Query::new("ACG").prefix(10), "ACG");
        assert_eq!(query.len(), 14);
    }
}
