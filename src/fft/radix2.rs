use super::DFTBase;
use num_complex::Complex32;
use std::f32::consts::PI;

fn w(k: usize, n: usize) -> Complex32 {
    let angle = -2.0 * PI * (k as f32) / (n as f32);
    Complex32::from_polar(1.0, angle)
}

//
// Iterative radix-2 Cooley–Tukey transform.
//
pub struct DFTRadix2 {
    n: usize,
    twiddles: Vec<Complex32>,
    bitrev: Vec<usize>,
}

impl DFTRadix2 {
    pub fn new(n: usize) -> Self {
        //
        // Precompute the first half of the unit circle.
        //
        let twiddles = (0..n / 2).map(|k| w(k, n)).collect();

        //
        // Precompute bit-reversed input order.
        //
        let bits = n.trailing_zeros();
        let bitrev = if n <= 1 {
            vec![0; n]
        } else {
            (0..n)
                .map(|i| i.reverse_bits() >> (usize::BITS - bits))
                .collect()
        };

        Self {
            n,
            twiddles,
            bitrev,
        }
    }
}

impl DFTBase for DFTRadix2 {
    fn name(&self) -> String {
        format!("Radix2({})", self.n)
    }
    fn size(&self) -> usize {
        self.n
    }

    fn xform_inplace(&self, buffer: &mut [Complex32]) {
        debug_assert_eq!(buffer.len(), self.n);

        //
        // Reorder input into bit-reversed positions.
        //
        for (i, &j) in self.bitrev.iter().enumerate() {
            if i < j {
                buffer.swap(i, j);
            }
        }

        //
        // Butterfly passes, doubling the span each time.
        //
        let mut span = 2;
        while span <= self.n {
            let half = span / 2;
            let stride = self.n / span;
            for block in buffer.chunks_exact_mut(span) {
                let (lo, hi) = block.split_at_mut(half);
                for k in 0..half {
                    let t = hi[k] * self.twiddles[k * stride];
                    let u = lo[k];
                    lo[k] = u + t;
                    hi[k] = u - t;
                }
            }
            span *= 2;
        }
    }
}
