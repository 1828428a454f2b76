//! Arithmetic operations for BigNum.

use crate::bignum::{BigNum, DoubleLimb, Limb, LIMB_BITS};
use slimtls_types::CryptoError;

impl BigNum {
    /// Add: self + other.
    pub fn add(&self, other: &BigNum) -> BigNum {
        let a = self.limbs();
        let b = other.limbs();
        let max_len = a.len().max(b.len());
        let mut limbs = vec![0u64; max_len + 1];
        let mut carry: u64 = 0;

        for (i, limb) in limbs.iter_mut().enumerate().take(max_len) {
            let av = a.get(i).copied().unwrap_or(0);
            let bv = b.get(i).copied().unwrap_or(0);
            let sum = av as DoubleLimb + bv as DoubleLimb + carry as DoubleLimb;
            *limb = sum as Limb;
            carry = (sum >> LIMB_BITS) as u64;
        }
        limbs[max_len] = carry;

        BigNum::from_limbs(limbs)
    }

    /// Subtract: |self - other|, plus a borrow flag that is true when the
    /// true result would have been negative (self < other). Checking the
    /// flag is the caller's responsibility; there is no silent wraparound.
    pub fn sub(&self, other: &BigNum) -> (BigNum, bool) {
        let (larger, smaller, borrowed) = match self.cmp(other) {
            std::cmp::Ordering::Less => (other.limbs(), self.limbs(), true),
            std::cmp::Ordering::Equal => return (BigNum::zero(), false),
            std::cmp::Ordering::Greater => (self.limbs(), other.limbs(), false),
        };

        let mut limbs = vec![0u64; larger.len()];
        let mut borrow: u64 = 0;

        for (i, limb) in limbs.iter_mut().enumerate() {
            let lv = larger[i];
            let sv = smaller.get(i).copied().unwrap_or(0);
            let (diff, b1) = lv.overflowing_sub(sv);
            let (diff2, b2) = diff.overflowing_sub(borrow);
            *limb = diff2;
            borrow = (b1 as u64) + (b2 as u64);
        }

        (BigNum::from_limbs(limbs), borrowed)
    }

    /// Multiply: self * other (schoolbook).
    pub fn mul(&self, other: &BigNum) -> BigNum {
        if self.is_zero() || other.is_zero() {
            return BigNum::zero();
        }
        let a = self.limbs();
        let b = other.limbs();

        let mut limbs = vec![0u64; a.len() + b.len()];

        for i in 0..a.len() {
            let mut carry: u64 = 0;
            for j in 0..b.len() {
                let prod = a[i] as DoubleLimb * b[j] as DoubleLimb
                    + limbs[i + j] as DoubleLimb
                    + carry as DoubleLimb;
                limbs[i + j] = prod as Limb;
                carry = (prod >> LIMB_BITS) as u64;
            }
            limbs[i + b.len()] = carry;
        }

        BigNum::from_limbs(limbs)
    }

    /// Square: self * self.
    pub fn sqr(&self) -> BigNum {
        self.mul(self)
    }

    /// Division with remainder: returns (quotient, remainder).
    ///
    /// Multi-limb divisors use Knuth's Algorithm D with digit
    /// normalization; single-limb divisors use double-width short
    /// division.
    pub fn div_rem(&self, divisor: &BigNum) -> Result<(BigNum, BigNum), CryptoError> {
        if divisor.is_zero() {
            return Err(CryptoError::BnDivisionByZero);
        }
        if self < divisor {
            return Ok((BigNum::zero(), self.clone()));
        }
        if divisor.num_limbs() == 1 {
            let (q, r) = div_rem_limb(self.limbs(), divisor.limbs()[0]);
            return Ok((q, BigNum::from_u64(r)));
        }
        Ok(div_rem_knuth(self.limbs(), divisor.limbs()))
    }

    /// Modular reduction: self mod modulus.
    pub fn mod_reduce(&self, modulus: &BigNum) -> Result<BigNum, CryptoError> {
        let (_, r) = self.div_rem(modulus)?;
        Ok(r)
    }
}

/// Short division by a single limb.
fn div_rem_limb(a: &[Limb], d: Limb) -> (BigNum, u64) {
    let mut q = vec![0u64; a.len()];
    let mut rem: DoubleLimb = 0;
    for i in (0..a.len()).rev() {
        let cur = (rem << LIMB_BITS) | a[i] as DoubleLimb;
        q[i] = (cur / d as DoubleLimb) as Limb;
        rem = cur % d as DoubleLimb;
    }
    (BigNum::from_limbs(q), rem as u64)
}

/// Knuth TAOCP vol. 2, Algorithm 4.3.1 D. Requires a >= b and b at least
/// two limbs with a non-zero top limb.
fn div_rem_knuth(a: &[Limb], b: &[Limb]) -> (BigNum, BigNum) {
    let n = b.len();
    let m = a.len() - n;
    let base = 1u128 << LIMB_BITS;

    // D1: normalize so the divisor's top limb has its high bit set. The
    // dividend gains one extra limb to absorb the shift carry.
    let shift = b[n - 1].leading_zeros() as usize;
    let v = shl_bits(b, shift, n);
    let mut u = shl_bits(a, shift, a.len() + 1);

    let mut q = vec![0u64; m + 1];

    // D2..D7: one quotient digit per iteration, most significant first.
    for j in (0..=m).rev() {
        // D3: estimate qhat from the top two dividend limbs; correct it
        // until it is at most one too large.
        let num = ((u[j + n] as DoubleLimb) << LIMB_BITS) | u[j + n - 1] as DoubleLimb;
        let mut qhat = num / v[n - 1] as DoubleLimb;
        let mut rhat = num % v[n - 1] as DoubleLimb;

        while qhat >= base
            || qhat * v[n - 2] as DoubleLimb > (rhat << LIMB_BITS) + u[j + n - 2] as DoubleLimb
        {
            qhat -= 1;
            rhat += v[n - 1] as DoubleLimb;
            if rhat >= base {
                break;
            }
        }

        // D4: multiply and subtract qhat * v from u[j..=j+n]. The signed
        // accumulator stays in (-2^64, 2^64), so the arithmetic shift
        // below yields exactly the borrow.
        let mut k: i128 = 0;
        for i in 0..n {
            let p = qhat * v[i] as DoubleLimb;
            let t = u[i + j] as i128 - k - (p as Limb) as i128;
            u[i + j] = t as Limb;
            k = (p >> LIMB_BITS) as i128 - (t >> LIMB_BITS);
        }
        let t = u[j + n] as i128 - k;
        u[j + n] = t as Limb;

        q[j] = qhat as Limb;

        // D5/D6: qhat was one too large; add the divisor back.
        if t < 0 {
            q[j] -= 1;
            let mut carry: DoubleLimb = 0;
            for i in 0..n {
                let s = u[i + j] as DoubleLimb + v[i] as DoubleLimb + carry;
                u[i + j] = s as Limb;
                carry = s >> LIMB_BITS;
            }
            u[j + n] = u[j + n].wrapping_add(carry as Limb);
        }
    }

    // D8: denormalize the remainder.
    let quotient = BigNum::from_limbs(q);
    let remainder = shr_bits(&u[..n], shift);
    (quotient, remainder)
}

/// Shift a limb slice left by `shift` bits (< 64) into a vector of
/// exactly `out_len` limbs.
fn shl_bits(a: &[Limb], shift: usize, out_len: usize) -> Vec<Limb> {
    let mut out = vec![0u64; out_len];
    if shift == 0 {
        out[..a.len()].copy_from_slice(a);
        return out;
    }
    let mut carry = 0u64;
    for (i, &limb) in a.iter().enumerate() {
        out[i] = (limb << shift) | carry;
        carry = limb >> (LIMB_BITS - shift);
    }
    if a.len() < out_len {
        out[a.len()] = carry;
    }
    out
}

/// Shift a limb slice right by `shift` bits (< 64).
fn shr_bits(a: &[Limb], shift: usize) -> BigNum {
    if shift == 0 {
        return BigNum::from_limbs(a.to_vec());
    }
    let mut out = vec![0u64; a.len()];
    for i in 0..a.len() {
        let lo = a[i] >> shift;
        let hi = if i + 1 < a.len() {
            a[i + 1] << (LIMB_BITS - shift)
        } else {
            0
        };
        out[i] = lo | hi;
    }
    BigNum::from_limbs(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bn(hex_str: &str) -> BigNum {
        BigNum::from_bytes_be(&hex::decode(hex_str).unwrap())
    }

    #[test]
    fn test_add() {
        let a = BigNum::from_u64(100);
        let b = BigNum::from_u64(200);
        assert_eq!(a.add(&b), BigNum::from_u64(300));
    }

    #[test]
    fn test_add_carry_chain() {
        // (2^128 - 1) + 1 = 2^128
        let a = BigNum::from_bytes_be(&[0xFF; 16]);
        let one = BigNum::from_u64(1);
        let sum = a.add(&one);
        assert_eq!(sum.bit_len(), 129);
        assert_eq!(sum.get_bit(128), 1);
    }

    #[test]
    fn test_sub_with_borrow_flag() {
        let a = BigNum::from_u64(300);
        let b = BigNum::from_u64(100);

        let (d, borrow) = a.sub(&b);
        assert_eq!(d, BigNum::from_u64(200));
        assert!(!borrow);

        let (d, borrow) = b.sub(&a);
        assert_eq!(d, BigNum::from_u64(200));
        assert!(borrow);

        let (d, borrow) = a.sub(&a);
        assert!(d.is_zero());
        assert!(!borrow);
    }

    #[test]
    fn test_mul() {
        let a = BigNum::from_u64(12345);
        let b = BigNum::from_u64(67890);
        assert_eq!(a.mul(&b), BigNum::from_u64(12345u64 * 67890));
    }

    #[test]
    fn test_mul_multi_limb() {
        // (2^64 - 1)^2 = 2^128 - 2^65 + 1
        let a = BigNum::from_u64(u64::MAX);
        let sq = a.sqr();
        let expected = bn("fffffffffffffffe0000000000000001");
        assert_eq!(sq, expected);
    }

    #[test]
    fn test_div_rem_small() {
        let a = BigNum::from_u64(100);
        let b = BigNum::from_u64(7);
        let (q, r) = a.div_rem(&b).unwrap();
        assert_eq!(q, BigNum::from_u64(14));
        assert_eq!(r, BigNum::from_u64(2));
    }

    #[test]
    fn test_div_by_zero() {
        let a = BigNum::from_u64(100);
        assert!(a.div_rem(&BigNum::zero()).is_err());
    }

    #[test]
    fn test_div_smaller_dividend() {
        let a = BigNum::from_u64(3);
        let b = BigNum::from_u64(10);
        let (q, r) = a.div_rem(&b).unwrap();
        assert!(q.is_zero());
        assert_eq!(r, a);
    }

    #[test]
    fn test_div_rem_knuth_known() {
        // 2^192 / (2^96 + 1): q = 2^96 - 1, r = 1
        let a = {
            let mut bytes = vec![0u8; 25];
            bytes[0] = 1;
            BigNum::from_bytes_be(&bytes)
        };
        let b = {
            let mut bytes = vec![0u8; 13];
            bytes[0] = 1;
            bytes[12] = 1;
            BigNum::from_bytes_be(&bytes)
        };
        let (q, r) = a.div_rem(&b).unwrap();
        assert_eq!(q, BigNum::from_bytes_be(&[0xFF; 12]));
        assert_eq!(r, BigNum::from_u64(1));
    }

    #[test]
    fn test_div_rem_reconstruct() {
        // a == q * b + r with r < b, across limb-boundary operands
        let a = bn("0123456789abcdef0123456789abcdef0123456789abcdef0123456789abcdef");
        let divisors = [
            bn("fedcba9876543210fedcba98"),
            bn("8000000000000000000000000000000000000001"),
            BigNum::from_u64(0xdeadbeef),
        ];
        for b in &divisors {
            let (q, r) = a.div_rem(b).unwrap();
            assert!(&r < b);
            assert_eq!(q.mul(b).add(&r), a);
        }
    }

    #[test]
    fn test_div_rem_qhat_correction() {
        // Dividend crafted so the first qhat estimate overshoots: the
        // divisor's top limb is the normalization-boundary value.
        let a = bn("7fffffffffffffff8000000000000000000000000000000000000000");
        let b = bn("80000000000000000000000000000001");
        let (q, r) = a.div_rem(&b).unwrap();
        assert_eq!(q.mul(&b).add(&r), a);
        assert!(r < b);
    }

    #[test]
    fn test_mod_reduce() {
        let a = bn("0123456789abcdef0123456789abcdef");
        let m = BigNum::from_u64(97);
        let r = a.mod_reduce(&m).unwrap();
        assert!(r < m);
        // Verify via reconstruction
        let (q, r2) = a.div_rem(&m).unwrap();
        assert_eq!(r, r2);
        assert_eq!(q.mul(&m).add(&r), a);
    }
}
