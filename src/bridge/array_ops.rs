//! Small buffer helpers. Each takes ownership of its input and returns the result.

use rand::Rng;
use rand::seq::SliceRandom;

pub fn reversed<T>(mut items: Vec<T>) -> Vec<T> {
    items.reverse();
    items
}

/// Shuffles with the caller's random source so results are reproducible under a seed.
pub fn shuffle<T, R: Rng + ?Sized>(mut items: Vec<T>, rng: &mut R) -> Vec<T> {
    items.shuffle(rng);
    items
}

/// Swaps channels `a` and `b` of every pixel of an interleaved buffer.
pub fn swap_channels<T>(mut data: Vec<T>, channels: usize, a: usize, b: usize) -> Vec<T> {
    debug_assert!(a < channels && b < channels);
    if a != b {
        for pixel in data.chunks_exact_mut(channels) {
            pixel.swap(a, b);
        }
    }
    data
}

/// Splits an interleaved buffer into one contiguous plane per channel.
pub fn split_planes<T: Copy>(interleaved: &[T], channels: usize) -> Vec<Vec<T>> {
    let pixels = interleaved.len() / channels;
    let mut planes: Vec<Vec<T>> = (0..channels).map(|_| Vec::with_capacity(pixels)).collect();
    for pixel in interleaved.chunks_exact(channels) {
        for (plane, &sample) in planes.iter_mut().zip(pixel) {
            plane.push(sample);
        }
    }
    planes
}

/// Interleaves planes in the order given.
pub fn merge_planes<T: Copy>(planes: &[Vec<T>]) -> Vec<T> {
    let pixels = planes.iter().map(Vec::len).min().unwrap_or(0);
    let mut out = Vec::with_capacity(pixels * planes.len());
    for i in 0..pixels {
        for plane in planes {
            out.push(plane[i]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_shuffle_is_deterministic_under_seed() {
        let items: Vec<u32> = (0..32).collect();
        let a = shuffle(items.clone(), &mut StdRng::seed_from_u64(7));
        let b = shuffle(items.clone(), &mut StdRng::seed_from_u64(7));
        assert_eq!(a, b);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, items);
    }

    #[test]
    fn test_swap_channels() {
        let data = vec![1, 2, 3, 4, 5, 6];
        assert_eq!(swap_channels(data, 3, 0, 2), vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_split_merge() {
        let interleaved = vec![1u16, 10, 100, 2, 20, 200];
        let planes = split_planes(&interleaved, 3);
        assert_eq!(planes, vec![vec![1, 2], vec![10, 20], vec![100, 200]]);
        assert_eq!(merge_planes(&planes), interleaved);
        assert_eq!(merge_planes(&reversed(planes)), vec![100, 10, 1, 200, 20, 2]);
    }
}
