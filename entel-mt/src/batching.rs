//! Tokenized examples and padded batches
//!
//! Inputs are padded with the runtime's pad id; labels are padded with
//! [`LABEL_PAD_ID`] so the loss ignores them. Every row of a batch has the
//! same length, the longest row in that batch.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Label value the loss function skips
pub const LABEL_PAD_ID: i64 = -100;

/// One tokenized sentence pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenizedPair {
    pub input_ids: Vec<u32>,
    pub labels: Vec<u32>,
}

/// Uniform-length model inputs for one optimizer step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub input_ids: Vec<Vec<u32>>,
    pub attention_mask: Vec<Vec<u8>>,
    pub labels: Vec<Vec<i64>>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// Number of label positions that count towards the loss
    pub fn label_tokens(&self) -> usize {
        self.labels
            .iter()
            .flatten()
            .filter(|&&label| label != LABEL_PAD_ID)
            .count()
    }
}

/// Pad a group of pairs into a [`Batch`]
pub fn collate(pairs: &[TokenizedPair], pad_token_id: u32) -> Batch {
    let input_len = pairs.iter().map(|p| p.input_ids.len()).max().unwrap_or(0);
    let label_len = pairs.iter().map(|p| p.labels.len()).max().unwrap_or(0);

    let mut batch = Batch {
        input_ids: Vec::with_capacity(pairs.len()),
        attention_mask: Vec::with_capacity(pairs.len()),
        labels: Vec::with_capacity(pairs.len()),
    };

    for pair in pairs {
        let padding = input_len - pair.input_ids.len();

        let mut ids = pair.input_ids.clone();
        ids.resize(input_len, pad_token_id);
        batch.input_ids.push(ids);

        let mut mask = vec![1u8; pair.input_ids.len()];
        mask.extend(std::iter::repeat_n(0u8, padding));
        batch.attention_mask.push(mask);

        let mut labels: Vec<i64> = pair.labels.iter().map(|&id| id as i64).collect();
        labels.resize(label_len, LABEL_PAD_ID);
        batch.labels.push(labels);
    }

    batch
}

/// Split `pairs` into padded batches of at most `batch_size`, in order
pub fn make_batches(pairs: &[TokenizedPair], batch_size: usize, pad_token_id: u32) -> Vec<Batch> {
    pairs
        .chunks(batch_size.max(1))
        .map(|chunk| collate(chunk, pad_token_id))
        .collect()
}

/// Shuffle with a per-epoch seed, then batch
pub fn shuffled_batches(
    pairs: &[TokenizedPair],
    batch_size: usize,
    pad_token_id: u32,
    seed: u64,
) -> Vec<Batch> {
    let mut order: Vec<&TokenizedPair> = pairs.iter().collect();
    let mut rng = StdRng::seed_from_u64(seed);
    order.shuffle(&mut rng);
    let shuffled: Vec<TokenizedPair> = order.into_iter().cloned().collect();
    make_batches(&shuffled, batch_size, pad_token_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair(input: &[u32], labels: &[u32]) -> TokenizedPair {
        TokenizedPair {
            input_ids: input.to_vec(),
            labels: labels.to_vec(),
        }
    }

    #[test]
    fn test_collate_pads_to_longest() {
        let batch = collate(&[pair(&[5, 6, 7], &[8]), pair(&[5], &[8, 9, 10])], 0);
        assert_eq!(batch.input_ids, vec![vec![5, 6, 7], vec![5, 0, 0]]);
        assert_eq!(batch.attention_mask, vec![vec![1, 1, 1], vec![1, 0, 0]]);
        assert_eq!(
            batch.labels,
            vec![vec![8, LABEL_PAD_ID, LABEL_PAD_ID], vec![8, 9, 10]]
        );
        assert_eq!(batch.label_tokens(), 4);
    }

    #[test]
    fn test_make_batches_keeps_remainder() {
        let pairs: Vec<TokenizedPair> = (0..10).map(|i| pair(&[i], &[i])).collect();
        let batches = make_batches(&pairs, 4, 0);
        assert_eq!(batches.len(), 3);
        assert_eq!(batches[0].len(), 4);
        assert_eq!(batches[2].len(), 2);
    }

    #[test]
    fn test_make_batches_empty() {
        assert!(make_batches(&[], 4, 0).is_empty());
    }

    #[test]
    fn test_shuffled_batches_are_seeded() {
        let pairs: Vec<TokenizedPair> = (0..32).map(|i| pair(&[i], &[i])).collect();
        let a = shuffled_batches(&pairs, 8, 0, 3);
        let b = shuffled_batches(&pairs, 8, 0, 3);
        assert_eq!(a, b);

        let mut seen: Vec<u32> = a.iter().flat_map(|b| b.input_ids.iter().map(|r| r[0])).collect();
        seen.sort();
        assert_eq!(seen, (0..32).collect::<Vec<u32>>());
    }
}
