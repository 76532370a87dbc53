use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::{info, warn};

use gamebank_protocol::block::SignedBlock;
use gamebank_protocol::error::ChainError;

fn storage_err(e: impl std::fmt::Display) -> ChainError {
    ChainError::Storage(e.to_string())
}

/// The append-only block log.
///
/// Record layout: `bincode(block)` followed by an 8-byte little-endian
/// offset equal to the byte position of the record's own start, so the
/// trailing 8 bytes of the file always locate the head block. The sidecar
/// index file stores, at `(block_num − 1) × 8`, the start offset of block
/// `block_num`.
///
/// The log holds irreversible blocks only; the caller appends a block
/// exactly once, in block-number order.
pub struct BlockLog {
    log_file: File,
    index_file: File,
    log_path: PathBuf,
    index_path: PathBuf,
    head: Option<SignedBlock>,
}

impl BlockLog {
    /// Open (or create) the log at `path`, cross-validating the index and
    /// rebuilding it when the two files disagree.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ChainError> {
        let log_path = path.as_ref().to_path_buf();
        let index_path = log_path.with_extension("index");

        let log_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&log_path)
            .map_err(storage_err)?;
        let index_file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&index_path)
            .map_err(storage_err)?;

        let mut log = BlockLog {
            log_file,
            index_file,
            log_path,
            index_path,
            head: None,
        };

        let log_size = log.log_file.metadata().map_err(storage_err)?.len();
        let index_size = log.index_file.metadata().map_err(storage_err)?.len();

        if log_size > 0 {
            log.head = Some(log.read_head()?);
            let head_offset = log.read_trailing_offset()?;
            let index_consistent = index_size >= 8 && {
                let mut buf = [0u8; 8];
                log.index_file
                    .seek(SeekFrom::End(-8))
                    .map_err(storage_err)?;
                log.index_file.read_exact(&mut buf).map_err(storage_err)?;
                u64::from_le_bytes(buf) == head_offset
            };
            if !index_consistent {
                warn!(path = %log.index_path.display(), "block log index out of sync, rebuilding");
                log.construct_index()?;
            }
        } else if index_size > 0 {
            info!("block log is empty but index is not, truncating index");
            log.index_file.set_len(0).map_err(storage_err)?;
        }

        Ok(log)
    }

    pub fn head(&self) -> Option<&SignedBlock> {
        self.head.as_ref()
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    /// Append one block and update the index. The block must extend the
    /// current head by exactly one.
    pub fn append(&mut self, block: &SignedBlock) -> Result<u64, ChainError> {
        let expected_index_pos = (block.block_num() as u64 - 1) * 8;
        let index_pos = self.index_file.seek(SeekFrom::End(0)).map_err(storage_err)?;
        if index_pos != expected_index_pos {
            return Err(ChainError::Storage(format!(
                "append to block log out of order: index at {index_pos}, expected {expected_index_pos}"
            )));
        }

        let start = self.log_file.seek(SeekFrom::End(0)).map_err(storage_err)?;
        let payload = bincode::serialize(block)
            .map_err(|e| ChainError::Serialization(e.to_string()))?;
        self.log_file.write_all(&payload).map_err(storage_err)?;
        self.log_file
            .write_all(&start.to_le_bytes())
            .map_err(storage_err)?;
        self.index_file
            .write_all(&start.to_le_bytes())
            .map_err(storage_err)?;

        self.head = Some(block.clone());
        Ok(start)
    }

    pub fn flush(&mut self) -> Result<(), ChainError> {
        self.log_file.flush().map_err(storage_err)?;
        self.index_file.flush().map_err(storage_err)?;
        Ok(())
    }

    /// Read block `block_num` through the index, or `None` past the head.
    pub fn read_block_by_num(&mut self, block_num: u32) -> Result<Option<SignedBlock>, ChainError> {
        if block_num == 0 {
            return Ok(None);
        }
        let index_size = self.index_file.metadata().map_err(storage_err)?.len();
        let pos = (block_num as u64 - 1) * 8;
        if pos + 8 > index_size {
            return Ok(None);
        }
        self.index_file
            .seek(SeekFrom::Start(pos))
            .map_err(storage_err)?;
        let mut buf = [0u8; 8];
        self.index_file.read_exact(&mut buf).map_err(storage_err)?;
        let offset = u64::from_le_bytes(buf);
        Ok(Some(self.read_block_at(offset)?))
    }

    fn read_block_at(&mut self, offset: u64) -> Result<SignedBlock, ChainError> {
        self.log_file
            .seek(SeekFrom::Start(offset))
            .map_err(storage_err)?;
        bincode::deserialize_from(&mut self.log_file)
            .map_err(|e| ChainError::Serialization(format!("corrupt block record: {e}")))
    }

    fn read_trailing_offset(&mut self) -> Result<u64, ChainError> {
        self.log_file.seek(SeekFrom::End(-8)).map_err(storage_err)?;
        let mut buf = [0u8; 8];
        self.log_file.read_exact(&mut buf).map_err(storage_err)?;
        Ok(u64::from_le_bytes(buf))
    }

    fn read_head(&mut self) -> Result<SignedBlock, ChainError> {
        let offset = self.read_trailing_offset()?;
        self.read_block_at(offset)
    }

    /// Rebuild the index by a linear scan of the log.
    pub fn construct_index(&mut self) -> Result<(), ChainError> {
        let log_size = self.log_file.metadata().map_err(storage_err)?.len();
        self.index_file.set_len(0).map_err(storage_err)?;
        self.index_file
            .seek(SeekFrom::Start(0))
            .map_err(storage_err)?;

        let mut pos: u64 = 0;
        while pos < log_size {
            self.log_file
                .seek(SeekFrom::Start(pos))
                .map_err(storage_err)?;
            let _block: SignedBlock = bincode::deserialize_from(&mut self.log_file)
                .map_err(|e| ChainError::Storage(format!("index rebuild hit corrupt record: {e}")))?;
            let after_block = self
                .log_file
                .stream_position()
                .map_err(storage_err)?;
            let mut buf = [0u8; 8];
            self.log_file.read_exact(&mut buf).map_err(storage_err)?;
            let recorded_start = u64::from_le_bytes(buf);
            if recorded_start != pos {
                return Err(ChainError::Storage(format!(
                    "block record at {pos} claims start {recorded_start}"
                )));
            }
            self.index_file
                .write_all(&pos.to_le_bytes())
                .map_err(storage_err)?;
            pos = after_block + 8;
        }
        self.index_file.flush().map_err(storage_err)?;
        info!(path = %self.log_path.display(), "block log index rebuilt");
        Ok(())
    }

    /// Stream every block in order through `visit`; stop early on `false`.
    pub fn for_each_block(
        &mut self,
        mut visit: impl FnMut(SignedBlock) -> bool,
    ) -> Result<(), ChainError> {
        let head_num = match &self.head {
            Some(h) => h.block_num(),
            None => return Ok(()),
        };
        for num in 1..=head_num {
            let block = self.read_block_by_num(num)?.ok_or_else(|| {
                ChainError::Storage(format!("block {num} missing below log head"))
            })?;
            if !visit(block) {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamebank_protocol::block::{BlockHeader, SignedBlockHeader};
    use gamebank_protocol::types::{BlockId, Ripemd, Signature};

    fn temp_path(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("gamebank_blocklog_{tag}_{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir.join("block_log")
    }

    fn make_block(num: u32, previous: BlockId) -> SignedBlock {
        SignedBlock {
            signed_header: SignedBlockHeader {
                header: BlockHeader {
                    previous,
                    timestamp: num as i64 * 3,
                    witness: "initminer".into(),
                    transaction_merkle_root: Ripemd::default(),
                    extensions: vec![],
                },
                witness_signature: Signature([0u8; 65]),
            },
            transactions: vec![],
        }
    }

    fn make_chain(n: u32) -> Vec<SignedBlock> {
        let mut blocks = Vec::new();
        let mut prev = BlockId::default();
        for num in 1..=n {
            let b = make_block(num, prev);
            prev = b.id();
            blocks.push(b);
        }
        blocks
    }

    #[test]
    fn append_and_read_back() {
        let path = temp_path("rw");
        let mut log = BlockLog::open(&path).unwrap();
        for b in make_chain(5) {
            log.append(&b).unwrap();
        }
        log.flush().unwrap();

        for num in 1..=5 {
            let b = log.read_block_by_num(num).unwrap().unwrap();
            assert_eq!(b.block_num(), num);
        }
        assert!(log.read_block_by_num(6).unwrap().is_none());
        assert_eq!(log.head().unwrap().block_num(), 5);
    }

    #[test]
    fn reopen_recovers_head() {
        let path = temp_path("reopen");
        {
            let mut log = BlockLog::open(&path).unwrap();
            for b in make_chain(3) {
                log.append(&b).unwrap();
            }
            log.flush().unwrap();
        }
        let mut log = BlockLog::open(&path).unwrap();
        assert_eq!(log.head().unwrap().block_num(), 3);
        assert_eq!(log.read_block_by_num(2).unwrap().unwrap().block_num(), 2);
    }

    #[test]
    fn damaged_index_is_rebuilt() {
        let path = temp_path("rebuild");
        {
            let mut log = BlockLog::open(&path).unwrap();
            for b in make_chain(4) {
                log.append(&b).unwrap();
            }
            log.flush().unwrap();
        }
        // truncate the index to simulate a crash between writes
        let index_path = path.with_extension("index");
        let f = OpenOptions::new().write(true).open(&index_path).unwrap();
        f.set_len(8).unwrap();
        drop(f);

        let mut log = BlockLog::open(&path).unwrap();
        for num in 1..=4 {
            assert_eq!(log.read_block_by_num(num).unwrap().unwrap().block_num(), num);
        }
    }

    #[test]
    fn out_of_order_append_is_rejected() {
        let path = temp_path("order");
        let mut log = BlockLog::open(&path).unwrap();
        let chain = make_chain(3);
        log.append(&chain[0]).unwrap();
        // skipping block 2
        assert!(log.append(&chain[2]).is_err());
    }
}
