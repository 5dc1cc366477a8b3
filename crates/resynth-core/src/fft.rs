//! Cancellable FFTs.
//!
//! [`Fft`] is an iterative radix-2 Cooley–Tukey transform over a precomputed
//! twiddle table. It polls a [`CancellationToken`] once per butterfly stage,
//! which is why the analysis code does not delegate to an opaque planner.
//! Lengths must be powers of two; callers zero-pad.
//!
//! [`Bluestein`] handles arbitrary lengths by expressing the DFT as a
//! chirp convolution evaluated with power-of-two transforms. The analysis
//! pipeline always pads to a power of two, so it is only reached through
//! the public API.

use std::f64::consts::PI;

pub use rustfft::num_complex::Complex;

use crate::{CancellationToken, Error, Result};

/// Radix-2 FFT of a fixed power-of-two size.
#[derive(Debug, Clone)]
pub struct Fft {
    size: usize,
    twiddles: Vec<Complex<f32>>,
    bit_reverse: Vec<usize>,
}

impl Fft {
    /// Create a transform of `size` points.
    ///
    /// Fails with [`Error::FftLength`] unless `size` is a power of two.
    pub fn new(size: usize) -> Result<Self> {
        if !size.is_power_of_two() {
            return Err(Error::FftLength { len: size });
        }
        let twiddles = (0..size / 2)
            .map(|k| {
                let angle = -2.0 * PI * k as f64 / size as f64;
                Complex::new(angle.cos() as f32, angle.sin() as f32)
            })
            .collect();
        let bits = size.trailing_zeros();
        let bit_reverse = (0..size)
            .map(|i| {
                if bits == 0 {
                    i
                } else {
                    i.reverse_bits() >> (usize::BITS - bits)
                }
            })
            .collect();
        Ok(Self {
            size,
            twiddles,
            bit_reverse,
        })
    }

    /// Get FFT size
    pub fn size(&self) -> usize {
        self.size
    }

    /// Forward transform in place (no scaling).
    pub fn forward(&self, buffer: &mut [Complex<f32>], cancel: &CancellationToken) -> Result<()> {
        self.transform(buffer, false, cancel)
    }

    /// Inverse transform in place, scaled by `1/N`.
    pub fn inverse(&self, buffer: &mut [Complex<f32>], cancel: &CancellationToken) -> Result<()> {
        self.transform(buffer, true, cancel)?;
        let scale = 1.0 / self.size as f32;
        for c in buffer.iter_mut() {
            *c *= scale;
        }
        Ok(())
    }

    /// Forward transform of real samples, zero-padded to the transform size.
    ///
    /// Returns all `size` bins.
    pub fn forward_real(
        &self,
        input: &[f32],
        cancel: &CancellationToken,
    ) -> Result<Vec<Complex<f32>>> {
        if input.len() > self.size {
            return Err(Error::FftLength { len: input.len() });
        }
        let mut buffer: Vec<Complex<f32>> =
            input.iter().map(|&x| Complex::new(x, 0.0)).collect();
        buffer.resize(self.size, Complex::new(0.0, 0.0));
        self.forward(&mut buffer, cancel)?;
        Ok(buffer)
    }

    /// Inverse transform of a full spectrum, returning the real part.
    pub fn inverse_real(
        &self,
        spectrum: &[Complex<f32>],
        cancel: &CancellationToken,
    ) -> Result<Vec<f32>> {
        let mut buffer = spectrum.to_vec();
        self.inverse(&mut buffer, cancel)?;
        Ok(buffer.into_iter().map(|c| c.re).collect())
    }

    fn transform(
        &self,
        buffer: &mut [Complex<f32>],
        inverse: bool,
        cancel: &CancellationToken,
    ) -> Result<()> {
        let n = self.size;
        if buffer.len() != n {
            return Err(Error::FftLength { len: buffer.len() });
        }

        for (i, &j) in self.bit_reverse.iter().enumerate() {
            if i < j {
                buffer.swap(i, j);
            }
        }

        let mut len = 2;
        while len <= n {
            cancel.check()?;
            let half = len / 2;
            let stride = n / len;
            for start in (0..n).step_by(len) {
                for k in 0..half {
                    let w = self.twiddles[k * stride];
                    let w = if inverse { w.conj() } else { w };
                    let u = buffer[start + k];
                    let v = buffer[start + k + half] * w;
                    buffer[start + k] = u + v;
                    buffer[start + k + half] = u - v;
                }
            }
            len <<= 1;
        }
        Ok(())
    }
}

/// Arbitrary-length DFT via Bluestein's chirp-z algorithm.
#[derive(Debug, Clone)]
pub struct Bluestein {
    len: usize,
    inner: Fft,
    chirp: Vec<Complex<f32>>,
    kernel_spectrum: Vec<Complex<f32>>,
}

impl Bluestein {
    /// Prepare a transform of `len` points (any `len >= 1`).
    pub fn new(len: usize, cancel: &CancellationToken) -> Result<Self> {
        if len == 0 {
            return Err(Error::FftLength { len });
        }
        let m = (2 * len - 1).next_power_of_two();
        let inner = Fft::new(m)?;

        // w_k = exp(-iπk²/n); k² is reduced mod 2n to keep the angle small.
        let chirp: Vec<Complex<f32>> = (0..len)
            .map(|k| {
                let k2 = (k as u128 * k as u128 % (2 * len as u128)) as f64;
                let angle = -PI * k2 / len as f64;
                Complex::new(angle.cos() as f32, angle.sin() as f32)
            })
            .collect();

        let mut kernel = vec![Complex::new(0.0, 0.0); m];
        kernel[0] = chirp[0].conj();
        for k in 1..len {
            kernel[k] = chirp[k].conj();
            kernel[m - k] = chirp[k].conj();
        }
        inner.forward(&mut kernel, cancel)?;

        Ok(Self {
            len,
            inner,
            chirp,
            kernel_spectrum: kernel,
        })
    }

    /// Transform length.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Whether the transform is zero-length (never true for a constructed plan).
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Forward DFT in place (no scaling).
    pub fn forward(&self, buffer: &mut [Complex<f32>], cancel: &CancellationToken) -> Result<()> {
        if buffer.len() != self.len {
            return Err(Error::FftLength { len: buffer.len() });
        }
        let m = self.inner.size();
        let mut work = vec![Complex::new(0.0, 0.0); m];
        for k in 0..self.len {
            work[k] = buffer[k] * self.chirp[k];
        }
        self.inner.forward(&mut work, cancel)?;
        for (w, k) in work.iter_mut().zip(&self.kernel_spectrum) {
            *w *= *k;
        }
        self.inner.inverse(&mut work, cancel)?;
        for k in 0..self.len {
            buffer[k] = work[k] * self.chirp[k];
        }
        Ok(())
    }

    /// Inverse DFT in place, scaled by `1/N`.
    pub fn inverse(&self, buffer: &mut [Complex<f32>], cancel: &CancellationToken) -> Result<()> {
        for c in buffer.iter_mut() {
            *c = c.conj();
        }
        self.forward(buffer, cancel)?;
        let scale = 1.0 / self.len as f32;
        for c in buffer.iter_mut() {
            *c = c.conj() * scale;
        }
        Ok(())
    }
}
