use gamebank_protocol::types::{Digest, Ripemd};

/// sha256 of arbitrary bytes.
pub fn sha256(data: &[u8]) -> Digest {
    Digest::hash(data)
}

/// ripemd160 of arbitrary bytes.
pub fn ripemd160(data: &[u8]) -> Ripemd {
    Ripemd::hash(data)
}

/// Iterated ripemd160 over a sequence of digests, as used by the contract
/// host's `get_block_hash`: each step hashes the previous accumulator
/// concatenated with the next input digest.
pub fn chained_ripemd160(inputs: impl Iterator<Item = Digest>) -> Ripemd {
    let mut acc = Ripemd::default();
    for d in inputs {
        let mut data = acc.0.to_vec();
        data.extend_from_slice(&d.0);
        acc = Ripemd::hash(&data);
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chained_hash_depends_on_order() {
        let a = Digest::hash(b"a");
        let b = Digest::hash(b"b");
        let ab = chained_ripemd160([a, b].into_iter());
        let ba = chained_ripemd160([b, a].into_iter());
        assert_ne!(ab, ba);
    }
}
