use std::path::PathBuf;

use common::types::batch::Batch;

/// Partitions `files` into batches of `batch_size`, preserving order.
/// Every batch is exactly `batch_size` long except possibly the last, and
/// numbering starts at 1. Empty input yields no batches.
pub fn split_into_batches(files: &[PathBuf], batch_size: usize) -> Vec<Batch> {
    let batch_size = batch_size.max(1);

    files
        .chunks(batch_size)
        .enumerate()
        .map(|(index, chunk)| Batch {
            number: index + 1,
            files: chunk.to_vec(),
        })
        .collect()
}
