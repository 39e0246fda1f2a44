//! # Euclidean Distance Kernels
//!
//! Squared L2 distance between two equal-length `f32` slices, dispatched at
//! runtime to the widest instruction set the CPU offers:
//! AVX2+FMA > NEON > scalar.
//!
//! Face descriptors are 128 floats, so the AVX2 path runs eight iterations of
//! a two-accumulator loop with no scalar tail. The tail code is still kept for
//! arbitrary slice lengths.
//!
//! Every kernel computes `(a[i] - b[i])^2` in the same lane order for
//! `(a, b)` and `(b, a)`, so results are bit-for-bit symmetric.

#[cfg(target_arch = "x86_64")]
use std::arch::x86_64::*;

#[cfg(target_arch = "aarch64")]
use std::arch::aarch64::*;

/// Squared euclidean distance. Callers ranking many candidates against one
/// query compare these directly and only take the root for reported values.
#[inline]
pub fn l2_squared(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());

    #[cfg(target_arch = "x86_64")]
    {
        if is_x86_feature_detected!("avx2") && is_x86_feature_detected!("fma") {
            // SAFETY: feature presence checked above.
            return unsafe { l2_squared_avx2_fma(a, b) };
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        // SAFETY: NEON is mandatory on aarch64.
        return unsafe { l2_squared_neon(a, b) };
    }

    #[allow(unreachable_code)]
    l2_squared_scalar(a, b)
}

/// Euclidean distance (with sqrt)
#[inline]
pub fn l2(a: &[f32], b: &[f32]) -> f32 {
    l2_squared(a, b).sqrt()
}

#[inline]
pub fn l2_squared_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum()
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx2", enable = "fma")]
unsafe fn l2_squared_avx2_fma(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let pairs = n / 16;

    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut acc0 = _mm256_setzero_ps();
    let mut acc1 = _mm256_setzero_ps();

    for i in 0..pairs {
        let offset = i * 16;
        let d0 = _mm256_sub_ps(
            _mm256_loadu_ps(a_ptr.add(offset)),
            _mm256_loadu_ps(b_ptr.add(offset)),
        );
        let d1 = _mm256_sub_ps(
            _mm256_loadu_ps(a_ptr.add(offset + 8)),
            _mm256_loadu_ps(b_ptr.add(offset + 8)),
        );
        acc0 = _mm256_fmadd_ps(d0, d0, acc0);
        acc1 = _mm256_fmadd_ps(d1, d1, acc1);
    }

    let mut result = hsum256_ps(_mm256_add_ps(acc0, acc1));

    for i in pairs * 16..n {
        let d = a[i] - b[i];
        result += d * d;
    }

    result
}

#[cfg(target_arch = "x86_64")]
#[target_feature(enable = "avx", enable = "sse3")]
#[inline]
unsafe fn hsum256_ps(v: __m256) -> f32 {
    let folded = _mm_add_ps(_mm256_extractf128_ps(v, 1), _mm256_castps256_ps128(v));
    let shuf = _mm_movehdup_ps(folded);
    let sums = _mm_add_ps(folded, shuf);
    let high = _mm_movehl_ps(sums, sums);
    _mm_cvtss_f32(_mm_add_ss(sums, high))
}

#[cfg(target_arch = "aarch64")]
#[inline]
unsafe fn l2_squared_neon(a: &[f32], b: &[f32]) -> f32 {
    let n = a.len().min(b.len());
    let chunks = n / 4;

    let a_ptr = a.as_ptr();
    let b_ptr = b.as_ptr();

    let mut acc = vdupq_n_f32(0.0);
    for i in 0..chunks {
        let offset = i * 4;
        let diff = vsubq_f32(vld1q_f32(a_ptr.add(offset)), vld1q_f32(b_ptr.add(offset)));
        acc = vfmaq_f32(acc, diff, diff);
    }

    let mut result = vaddvq_f32(acc);
    for i in chunks * 4..n {
        let d = a[i] - b[i];
        result += d * d;
    }

    result
}
