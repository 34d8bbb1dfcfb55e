//! Recipient batching.
//!
//! Batches are contiguous slices of the resolved recipient set, processed in
//! ascending index order. The order governs which recipients are contacted
//! first; it matters for auditing, not correctness.

/// Maximum recipients mentioned per status (backend-recommended limit).
pub const MAX_MENTIONS_PER_STATUS: usize = 5;

/// Partition recipients into contiguous batches of at most `limit`.
pub fn partition(recipients: &[String], limit: usize) -> Vec<&[String]> {
    debug_assert!(limit > 0);
    recipients.chunks(limit).collect()
}

/// Number of batches a recipient list of `total` produces.
#[allow(dead_code)]
pub fn batch_count(total: usize, limit: usize) -> usize {
    total.div_ceil(limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipients(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("55119000000{:02}@s.whatsapp.net", i)).collect()
    }

    #[test]
    fn test_batch_count_is_ceiling() {
        assert_eq!(batch_count(0, 5), 0);
        assert_eq!(batch_count(1, 5), 1);
        assert_eq!(batch_count(5, 5), 1);
        assert_eq!(batch_count(6, 5), 2);
        assert_eq!(batch_count(12, 5), 3);
    }

    #[test]
    fn test_partition_12_into_5_5_2() {
        let list = recipients(12);
        let batches = partition(&list, MAX_MENTIONS_PER_STATUS);

        let sizes: Vec<usize> = batches.iter().map(|b| b.len()).collect();
        assert_eq!(sizes, vec![5, 5, 2]);
    }

    #[test]
    fn test_partition_covers_input_in_order_without_gaps() {
        for n in [1, 4, 5, 6, 10, 11, 23] {
            let list = recipients(n);
            let batches = partition(&list, MAX_MENTIONS_PER_STATUS);

            assert_eq!(batches.len(), batch_count(n, MAX_MENTIONS_PER_STATUS));
            assert!(batches.iter().all(|b| b.len() <= MAX_MENTIONS_PER_STATUS));
            assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), n);

            let flattened: Vec<String> = batches.concat();
            assert_eq!(flattened, list);
        }
    }

    #[test]
    fn test_partition_empty() {
        let batches = partition(&[], MAX_MENTIONS_PER_STATUS);
        assert!(batches.is_empty());
    }
}
