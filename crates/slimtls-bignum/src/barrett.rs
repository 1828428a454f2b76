//! Barrett reduction context for modular exponentiation.

use crate::bignum::BigNum;
use slimtls_types::CryptoError;

/// Barrett reduction context.
///
/// Installing a modulus precomputes µ = ⌊b^(2k) / m⌋ where b = 2^64 and
/// k is the limb count of m. Reduction of any x < b^(2k) then needs only
/// two multiplications and a couple of subtractions (HAC 14.42), which is
/// what makes repeated `mod_exp` squarings affordable.
#[derive(Clone)]
pub struct BarrettCtx {
    /// The installed modulus m.
    modulus: BigNum,
    /// Limb count of the modulus.
    k: usize,
    /// µ = ⌊b^(2k) / m⌋.
    mu: BigNum,
}

impl BarrettCtx {
    /// Install a modulus, precomputing its reduction constant.
    pub fn new(modulus: &BigNum) -> Result<Self, CryptoError> {
        if modulus.is_zero() {
            return Err(CryptoError::BnDivisionByZero);
        }

        let k = modulus.num_limbs();
        // b^(2k) as a 2k+1 limb power of the radix
        let radix_2k = BigNum::from_u64(1).shl_limbs(2 * k);
        let (mu, _) = radix_2k.div_rem(modulus)?;

        Ok(BarrettCtx {
            modulus: modulus.clone(),
            k,
            mu,
        })
    }

    /// Return a reference to the installed modulus.
    pub fn modulus(&self) -> &BigNum {
        &self.modulus
    }

    /// Reduce x modulo the installed modulus.
    ///
    /// Uses the Barrett estimate for x < b^(2k) (always the case for a
    /// product of two reduced values); anything wider falls back to long
    /// division.
    pub fn reduce(&self, x: &BigNum) -> Result<BigNum, CryptoError> {
        let k = self.k;
        if x < &self.modulus {
            return Ok(x.clone());
        }
        if x.num_limbs() > 2 * k {
            return x.mod_reduce(&self.modulus);
        }

        // q3 = floor(floor(x / b^(k-1)) * mu / b^(k+1))
        let q1 = x.shr_limbs(k - 1);
        let q2 = q1.mul(&self.mu);
        let q3 = q2.shr_limbs(k + 1);

        // r = (x mod b^(k+1)) - (q3 * m mod b^(k+1)), plus b^(k+1) when
        // the subtraction borrows
        let r1 = x.low_limbs(k + 1);
        let r2 = q3.mul(&self.modulus).low_limbs(k + 1);
        let (mut r, borrowed) = r1.sub(&r2);
        if borrowed {
            let radix_k1 = BigNum::from_u64(1).shl_limbs(k + 1);
            let (wrapped, _) = radix_k1.sub(&r);
            r = wrapped;
        }

        // The estimate is off by at most 2
        while r >= self.modulus {
            let (next, _) = r.sub(&self.modulus);
            r = next;
        }
        Ok(r)
    }

    /// Modular multiplication: (a * b) mod m.
    pub fn mod_mul(&self, a: &BigNum, b: &BigNum) -> Result<BigNum, CryptoError> {
        self.reduce(&a.mul(b))
    }

    /// Fixed-window modular exponentiation: base^exp mod m.
    pub fn mod_exp(&self, base: &BigNum, exp: &BigNum) -> Result<BigNum, CryptoError> {
        if exp.is_zero() {
            // a^0 = 1 (mod m), except m == 1 where everything is 0
            if self.modulus.is_one() {
                return Ok(BigNum::zero());
            }
            return Ok(BigNum::from_u64(1));
        }

        let exp_bits = exp.bit_len();
        let w = get_window_size(exp_bits);
        let table_size = 1usize << w;

        // Precompute table[i] = base^i mod m for i = 0..2^w-1
        let base_red = self.reduce(base)?;
        let mut table = Vec::with_capacity(table_size);
        table.push(BigNum::from_u64(1));
        table.push(base_red.clone());
        for i in 2..table_size {
            table.push(self.mod_mul(&table[i - 1], &base_red)?);
        }

        // Process exponent from MSB to LSB in w-bit windows
        let mut result = BigNum::from_u64(1);
        let mut i = exp_bits;
        while i > 0 {
            let window_bits = if i >= w { w } else { i };
            i -= window_bits;

            for _ in 0..window_bits {
                result = self.reduce(&result.sqr())?;
            }

            let mut window_val = 0u64;
            for b in 0..window_bits {
                window_val |= exp.get_bit(i + b) << b;
            }

            if window_val != 0 {
                result = self.mod_mul(&result, &table[window_val as usize])?;
            }
        }

        Ok(result)
    }
}

/// Window size for modular exponentiation based on exponent bit length.
fn get_window_size(bits: usize) -> usize {
    if bits > 512 {
        6
    } else if bits > 256 {
        5
    } else if bits > 128 {
        4
    } else if bits > 64 {
        3
    } else if bits > 32 {
        2
    } else {
        1
    }
}
