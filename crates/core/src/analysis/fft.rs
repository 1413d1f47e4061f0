use std::f32::consts::PI;

use realfft::num_complex::Complex32;

/// In-place iterative radix-2 FFT with a fused window + bit-reversal load.
///
/// All tables are built at construction so [`load_windowed`](Self::load_windowed)
/// and [`transform`](Self::transform) never allocate.
pub struct Radix2Fft {
    len: usize,
    bit_reverse: Box<[usize]>,
    window: Box<[f32]>,
    twiddles: Box<[Complex32]>,
}

impl Radix2Fft {
    /// Plans a transform over `1 << lg_len` points.
    pub fn new(lg_len: u32) -> Self {
        assert!((1..=16).contains(&lg_len), "unsupported fft size 2^{lg_len}");
        let len = 1usize << lg_len;

        let bit_reverse = (0..len)
            .map(|i| reverse_bits(i, lg_len))
            .collect::<Vec<_>>();
        let window = (0..len).map(|i| vorbis_value(i, len)).collect::<Vec<_>>();
        let twiddles = (0..len / 2)
            .map(|k| Complex32::from_polar(1.0, -2.0 * PI * k as f32 / len as f32))
            .collect::<Vec<_>>();

        Self {
            len,
            bit_reverse: bit_reverse.into_boxed_slice(),
            window: window.into_boxed_slice(),
            twiddles: twiddles.into_boxed_slice(),
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Windows `sample(i)` for every `i` in `0..len` and stores it at the
    /// bit-reversed position of `buffer`, ready for [`transform`](Self::transform).
    pub fn load_windowed(&self, buffer: &mut [Complex32], mut sample: impl FnMut(usize) -> f32) {
        debug_assert_eq!(buffer.len(), self.len);
        for (i, (&target, &weight)) in self.bit_reverse.iter().zip(self.window.iter()).enumerate() {
            buffer[target] = Complex32::new(sample(i) * weight, 0.0);
        }
    }

    /// Cooley-Tukey butterflies over `log2(len)` stages. Expects bit-reversed
    /// input and leaves the spectrum in natural order.
    pub fn transform(&self, buffer: &mut [Complex32]) {
        debug_assert_eq!(buffer.len(), self.len);
        let mut span = 2;
        while span <= self.len {
            let half = span / 2;
            let step = self.len / span;
            for start in (0..self.len).step_by(span) {
                for k in 0..half {
                    let t = self.twiddles[k * step] * buffer[start + k + half];
                    let u = buffer[start + k];
                    buffer[start + k] = u + t;
                    buffer[start + k + half] = u - t;
                }
            }
            span <<= 1;
        }
    }
}

impl std::fmt::Debug for Radix2Fft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Radix2Fft").field("len", &self.len).finish()
    }
}

fn reverse_bits(value: usize, bits: u32) -> usize {
    value.reverse_bits() >> (usize::BITS - bits)
}

/// Vorbis power-complementary window.
fn vorbis_value(index: usize, len: usize) -> f32 {
    let s = (PI * index as f32 / len as f32).sin();
    (0.5 * PI * s * s).sin()
}
