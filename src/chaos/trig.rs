use std::f64::consts::PI;

/// `(cos, sin)` of the rotation angle `2πk/n` for every fold index `k`.
#[derive(Debug, Clone, PartialEq)]
pub struct TrigTable {
    entries: Vec<(f64, f64)>,
}

impl TrigTable {
    pub fn new(n: usize) -> Self {
        let n = n.max(1);
        let entries = (0..n)
            .map(|k| {
                let angle = 2.0 * PI * k as f64 / n as f64;
                (angle.cos(), angle.sin())
            })
            .collect();
        Self { entries }
    }

    pub fn degree(&self) -> usize {
        self.entries.len()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Falls back to the identity rotation for an out-of-range index.
    #[inline]
    pub fn get(&self, k: usize) -> (f64, f64) {
        self.entries.get(k).copied().unwrap_or((1.0, 0.0))
    }

    #[inline]
    pub fn rotate(&self, k: usize, x: f64, y: f64) -> (f64, f64) {
        let (c, s) = self.get(k);
        (c * x - s * y, s * x + c * y)
    }

    pub fn iter(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.entries.iter().copied()
    }
}
