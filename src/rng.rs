#[derive(Clone, Debug)]
pub struct Rng {
    seed: u32,
}

impl Rng {
    pub fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn next_f32(&mut self) -> f32 {
        self.seed = self.seed.wrapping_add(0x6d2b79f5);
        let mut t = self.seed;
        t = (t ^ (t >> 15)).wrapping_mul(t | 1);
        t ^= t.wrapping_add((t ^ (t >> 7)).wrapping_mul(t | 61));
        let out = t ^ (t >> 14);
        (out as f64 / 4_294_967_296.0) as f32
    }

    pub fn pick_index(&mut self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        (self.next_f32() * len as f32).floor().min((len - 1) as f32) as usize
    }

    /// Removes and returns up to `count` distinct items chosen uniformly.
    pub fn take_distinct<T>(&mut self, mut pool: Vec<T>, count: usize) -> Vec<T> {
        let mut out = Vec::with_capacity(count.min(pool.len()));
        while out.len() < count && !pool.is_empty() {
            let idx = self.pick_index(pool.len());
            out.push(pool.swap_remove(idx));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::Rng;

    #[test]
    fn same_seed_yields_same_sequence() {
        let mut a = Rng::new(7);
        let mut b = Rng::new(7);
        for _ in 0..64 {
            assert_eq!(a.next_f32().to_bits(), b.next_f32().to_bits());
        }
    }

    #[test]
    fn pick_index_stays_in_range() {
        let mut rng = Rng::new(99);
        for _ in 0..1_000 {
            assert!(rng.pick_index(5) < 5);
        }
        assert_eq!(rng.pick_index(0), 0);
        assert_eq!(rng.pick_index(1), 0);
    }

    #[test]
    fn take_distinct_caps_at_pool_size() {
        let mut rng = Rng::new(3);
        let picked = rng.take_distinct(vec![1, 2, 3], 10);
        assert_eq!(picked.len(), 3);
        let mut sorted = picked.clone();
        sorted.sort();
        assert_eq!(sorted, vec![1, 2, 3]);
    }
}
