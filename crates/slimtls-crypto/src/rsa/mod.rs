//! RSA public-key operations over the bignum engine.
//!
//! Keys are imported from raw big-endian component buffers (the DER
//! layer lives in the PKI crate). Only PKCS#1 v1.5 padding is provided:
//! encryption/decryption for the TLS key exchange and signing/verification
//! for certificates. The private-key operation uses the CRT shortcut with
//! one Barrett context per installed modulus (n, p, q).

mod pkcs1v15;

pub use pkcs1v15::pkcs1v15_decrypt_unpad;

use slimtls_bignum::{BarrettCtx, BigNum};
use slimtls_types::CryptoError;

/// An RSA public key.
#[derive(Clone)]
pub struct RsaPublicKey {
    /// Barrett context for the modulus n.
    n_ctx: BarrettCtx,
    /// The public exponent e.
    e: BigNum,
    /// Key size in bits.
    bits: usize,
    /// Modulus byte length (k).
    k: usize,
}

impl std::fmt::Debug for RsaPublicKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPublicKey")
            .field("bits", &self.bits)
            .finish()
    }
}

impl RsaPublicKey {
    /// Create an RSA public key from modulus and exponent (big-endian bytes).
    pub fn new(n: &[u8], e: &[u8]) -> Result<Self, CryptoError> {
        let n_bn = BigNum::from_bytes_be(n);
        let e_bn = BigNum::from_bytes_be(e);

        if n_bn.is_zero() || n_bn.is_even() {
            return Err(CryptoError::InvalidKey);
        }
        if e_bn.is_zero() || e_bn.is_even() {
            return Err(CryptoError::InvalidKey);
        }

        let bits = n_bn.bit_len();
        let k = bits.div_ceil(8);

        Ok(RsaPublicKey {
            n_ctx: BarrettCtx::new(&n_bn)?,
            e: e_bn,
            bits,
            k,
        })
    }

    /// Encrypt a message with PKCS#1 v1.5 block type 0x02 padding.
    /// The message must be at most `modulus_len() - 11` bytes.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let em = pkcs1v15::pkcs1v15_encrypt_pad(plaintext, self.k)?;
        self.raw_public_op(&em)
    }

    /// Verify a PKCS#1 v1.5 signature against a message digest.
    ///
    /// The expected encoded message is reconstructed and compared in
    /// constant time; the digest length selects the DigestInfo prefix.
    pub fn verify(&self, digest: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        if signature.len() != self.k {
            return Err(CryptoError::RsaVerifyFail);
        }
        let em = self.raw_public_op(signature)?;
        pkcs1v15::pkcs1v15_verify_unpad(&em, digest, self.k)
    }

    /// Return the key size in bits.
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Return the modulus byte length. Callers of the raw block
    /// operations must size buffers to exactly this.
    pub fn modulus_len(&self) -> usize {
        self.k
    }

    /// Return the modulus as big-endian bytes.
    pub fn n_bytes(&self) -> Vec<u8> {
        self.n_ctx.modulus().to_bytes_be()
    }

    /// Return the public exponent as big-endian bytes.
    pub fn e_bytes(&self) -> Vec<u8> {
        self.e.to_bytes_be()
    }

    /// Raw RSA public key operation: c = m^e mod n (RSAEP).
    fn raw_public_op(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let m = BigNum::from_bytes_be(data);
        if &m >= self.n_ctx.modulus() {
            return Err(CryptoError::InvalidArg);
        }
        let c = self.n_ctx.mod_exp(&m, &self.e)?;
        c.to_bytes_be_padded(self.k)
    }
}

/// An RSA private key with the full CRT parameter set.
pub struct RsaPrivateKey {
    /// Barrett context for the modulus n.
    n_ctx: BarrettCtx,
    /// Barrett context for the prime p.
    p_ctx: BarrettCtx,
    /// Barrett context for the prime q.
    q_ctx: BarrettCtx,
    /// The public exponent e.
    e: BigNum,
    /// The private exponent d (held for completeness; the CRT path
    /// below never exponentiates with it).
    d: BigNum,
    /// d mod (p-1).
    dp: BigNum,
    /// d mod (q-1).
    dq: BigNum,
    /// q^(-1) mod p.
    qinv: BigNum,
    /// Key size in bits.
    bits: usize,
    /// Modulus byte length (k).
    k: usize,
}

impl std::fmt::Debug for RsaPrivateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RsaPrivateKey")
            .field("bits", &self.bits)
            .finish()
    }
}

impl RsaPrivateKey {
    /// Create an RSA private key from its components (big-endian bytes).
    ///
    /// The CRT parameters are imported as supplied, not recomputed; the
    /// only derived check is n == p * q.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        n: &[u8],
        e: &[u8],
        d: &[u8],
        p: &[u8],
        q: &[u8],
        dp: &[u8],
        dq: &[u8],
        qinv: &[u8],
    ) -> Result<Self, CryptoError> {
        let n_bn = BigNum::from_bytes_be(n);
        let e_bn = BigNum::from_bytes_be(e);
        let d_bn = BigNum::from_bytes_be(d);
        let p_bn = BigNum::from_bytes_be(p);
        let q_bn = BigNum::from_bytes_be(q);
        let dp_bn = BigNum::from_bytes_be(dp);
        let dq_bn = BigNum::from_bytes_be(dq);
        let qinv_bn = BigNum::from_bytes_be(qinv);

        if n_bn.is_zero() || n_bn.is_even() || e_bn.is_zero() || d_bn.is_zero() {
            return Err(CryptoError::InvalidKey);
        }
        if p_bn.is_zero() || q_bn.is_zero() || dp_bn.is_zero() || dq_bn.is_zero()
            || qinv_bn.is_zero()
        {
            return Err(CryptoError::RsaNoKeyInfo);
        }
        if p_bn.mul(&q_bn) != n_bn {
            return Err(CryptoError::InvalidKey);
        }

        let bits = n_bn.bit_len();
        let k = bits.div_ceil(8);

        Ok(RsaPrivateKey {
            n_ctx: BarrettCtx::new(&n_bn)?,
            p_ctx: BarrettCtx::new(&p_bn)?,
            q_ctx: BarrettCtx::new(&q_bn)?,
            e: e_bn,
            d: d_bn,
            dp: dp_bn,
            dq: dq_bn,
            qinv: qinv_bn,
            bits,
            k,
        })
    }

    /// Decrypt a PKCS#1 v1.5 block-type-0x02 ciphertext.
    /// The ciphertext must be exactly `modulus_len()` bytes.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() != self.k {
            return Err(CryptoError::InvalidArg);
        }
        let em = self.raw_private_op(ciphertext)?;
        pkcs1v15::pkcs1v15_decrypt_unpad(&em)
    }

    /// Sign a message digest with PKCS#1 v1.5 block type 0x01 padding.
    pub fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let em = pkcs1v15::pkcs1v15_sign_pad(digest, self.k)?;
        self.raw_private_op(&em)
    }

    /// Extract the corresponding public key.
    pub fn public_key(&self) -> RsaPublicKey {
        RsaPublicKey {
            n_ctx: self.n_ctx.clone(),
            e: self.e.clone(),
            bits: self.bits,
            k: self.k,
        }
    }

    /// Return the key size in bits.
    pub fn bits(&self) -> usize {
        self.bits
    }

    /// Return the modulus byte length.
    pub fn modulus_len(&self) -> usize {
        self.k
    }

    /// Return the private exponent as big-endian bytes.
    pub fn d_bytes(&self) -> Vec<u8> {
        self.d.to_bytes_be()
    }

    /// Raw RSA private key operation: m = c^d mod n (RSADP).
    ///
    /// Computed via the CRT: m1 = c^dP mod p, m2 = c^dQ mod q,
    /// h = qInv * (m1 - m2) mod p, m = m2 + h * q. Roughly 4x faster
    /// than a single full-width exponentiation.
    fn raw_private_op(&self, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let c = BigNum::from_bytes_be(data);
        if &c >= self.n_ctx.modulus() {
            return Err(CryptoError::InvalidArg);
        }

        let p = self.p_ctx.modulus();
        let q = self.q_ctx.modulus();

        let m1 = self.p_ctx.mod_exp(&c, &self.dp)?;
        let m2 = self.q_ctx.mod_exp(&c, &self.dq)?;

        // m1 + p - (m2 mod p) keeps the difference non-negative without
        // assuming p > q.
        let m2_mod_p = self.p_ctx.reduce(&m2)?;
        let (diff, _) = m1.add(p).sub(&m2_mod_p);
        let diff = self.p_ctx.reduce(&diff)?;
        let h = self.p_ctx.mod_mul(&diff, &self.qinv)?;

        let m = m2.add(&h.mul(q));
        m.to_bytes_be_padded(self.k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(s: &str) -> Vec<u8> {
        ::hex::decode(s).unwrap()
    }

    // A valid RSA-1024 key generated by OpenSSL (NOT for production use).
    // Components verified: n = p * q, d * e ≡ 1 (mod (p-1)(q-1)).
    pub(crate) struct TestKey {
        pub n: Vec<u8>,
        pub e: Vec<u8>,
        pub d: Vec<u8>,
        pub p: Vec<u8>,
        pub q: Vec<u8>,
        pub dp: Vec<u8>,
        pub dq: Vec<u8>,
        pub qinv: Vec<u8>,
    }

    pub(crate) fn test_key_1024() -> TestKey {
        let p = hex(
            "00ed8bdd1da05a922e09eae43fc535ba4c0fb7315dab0b6a24136a7ddc0803c1\
             6426f829298419218307822335145a1dc864e3e165a09444fc6106f93809bb934f",
        );
        let q = hex(
            "00e5c19a4c79326ace1080b907791eb70a6a8a164473e18445193743a784f68a\
             72867b962d8c5c42a68ef865c79660a2ae63a9ae8dec8bdcd28e348a3b3544f61f",
        );
        let n = hex(
            "00d531c26a4cc6443cca66325ba2746a7eaf0423112d1aa222c8a89f5bb8d12c\
             3dccf8386a53b9aa4d1cfbe5b17ddb8a329732110aa1dd06c55dccb849e5ffc8\
             b2c213bdc95d8fe28e4b75b483b95b7d4cde85ab58dd9cc2b741b79b74c0d09c\
             df85612ca1793d16e28e8d98af311ac3b242c074e551767d0659e9fbaae940c091",
        );
        let e = hex("010001");
        let d = hex(
            "0df14923a68db8dcb8e7e2173812a0fc53f9d3494647dd9ea4bcd25f2f410ec1\
             a3ebffd484513a1ffceb44644d34d45ee6a07198de69140e484a212b440d6c54\
             95e905a5294f7f30066100900603b9f68d2c23d149bb3a09393bca9b09a6d479\
             dd953b76884fb7127db6d169fd7bbdfa5fcd8047876d965d936e819232622cb9",
        );

        // CRT parameters derived from (d, p, q) with the bignum engine;
        // production keys carry these in their DER encoding.
        let one = BigNum::from_u64(1);
        let d_bn = BigNum::from_bytes_be(&d);
        let p_bn = BigNum::from_bytes_be(&p);
        let q_bn = BigNum::from_bytes_be(&q);
        let (p1, _) = p_bn.sub(&one);
        let (q1, _) = q_bn.sub(&one);
        let dp = d_bn.mod_reduce(&p1).unwrap().to_bytes_be();
        let dq = d_bn.mod_reduce(&q1).unwrap().to_bytes_be();
        // qinv = q^(p-2) mod p (p prime, Fermat inverse)
        let p_ctx = BarrettCtx::new(&p_bn).unwrap();
        let (p2, _) = p_bn.sub(&BigNum::from_u64(2));
        let qinv = p_ctx.mod_exp(&q_bn, &p2).unwrap().to_bytes_be();

        TestKey {
            n,
            e,
            d,
            p,
            q,
            dp,
            dq,
            qinv,
        }
    }

    pub(crate) fn test_keys(k: &TestKey) -> (RsaPublicKey, RsaPrivateKey) {
        let pub_key = RsaPublicKey::new(&k.n, &k.e).unwrap();
        let priv_key = RsaPrivateKey::new(
            &k.n, &k.e, &k.d, &k.p, &k.q, &k.dp, &k.dq, &k.qinv,
        )
        .unwrap();
        (pub_key, priv_key)
    }

    #[test]
    fn test_rsa_encrypt_decrypt_roundtrip() {
        let (pub_key, priv_key) = test_keys(&test_key_1024());

        let msg = b"Hello, RSA!";
        let ct = pub_key.encrypt(msg).unwrap();
        assert_eq!(ct.len(), pub_key.modulus_len());

        let pt = priv_key.decrypt(&ct).unwrap();
        assert_eq!(pt, msg);
    }

    #[test]
    fn test_rsa_encrypt_max_length() {
        let (pub_key, priv_key) = test_keys(&test_key_1024());
        let k = pub_key.modulus_len();

        // len < k - 11 round-trips; len > k - 11 is rejected
        let msg = vec![0x5A; k - 11];
        let ct = pub_key.encrypt(&msg).unwrap();
        assert_eq!(priv_key.decrypt(&ct).unwrap(), msg);

        let too_long = vec![0x5A; k - 10];
        assert!(pub_key.encrypt(&too_long).is_err());
    }

    #[test]
    fn test_rsa_sign_verify_roundtrip() {
        let (pub_key, priv_key) = test_keys(&test_key_1024());

        // SHA-256 digest of "hello" (pre-computed)
        let digest = hex("2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824");

        let sig = priv_key.sign(&digest).unwrap();
        assert_eq!(sig.len(), priv_key.modulus_len());
        assert!(pub_key.verify(&digest, &sig).unwrap());

        // Tampered digest fails
        let mut bad = digest.clone();
        bad[0] ^= 0x01;
        assert!(!pub_key.verify(&bad, &sig).unwrap());

        // Tampered signature fails
        let mut bad_sig = sig.clone();
        bad_sig[10] ^= 0x01;
        assert!(!pub_key.verify(&digest, &bad_sig).unwrap());
    }

    #[test]
    fn test_rsa_sign_md5_and_sha1_digests() {
        let (pub_key, priv_key) = test_keys(&test_key_1024());

        for len in [16usize, 20] {
            let digest = vec![0xA7; len];
            let sig = priv_key.sign(&digest).unwrap();
            assert!(pub_key.verify(&digest, &sig).unwrap());
        }
    }

    #[test]
    fn test_rsa_public_key_extraction() {
        let key = test_key_1024();
        let (pub_key, priv_key) = test_keys(&key);
        let extracted = priv_key.public_key();

        assert_eq!(extracted.bits(), pub_key.bits());
        assert_eq!(extracted.n_bytes(), pub_key.n_bytes());
        assert_eq!(extracted.e_bytes(), pub_key.e_bytes());
    }

    #[test]
    fn test_rsa_invalid_keys() {
        let key = test_key_1024();
        // Even modulus
        assert!(RsaPublicKey::new(&[0x04], &key.e).is_err());
        // Zero exponent
        assert!(RsaPublicKey::new(&key.n, &[0x00]).is_err());
        // p * q != n
        assert!(RsaPrivateKey::new(
            &key.n, &key.e, &key.d, &key.p, &key.p, &key.dp, &key.dq, &key.qinv
        )
        .is_err());
    }

    #[test]
    fn test_rsa_wrong_ciphertext_length() {
        let (_, priv_key) = test_keys(&test_key_1024());
        assert!(priv_key.decrypt(&[0u8; 64]).is_err());
    }

    #[test]
    fn test_rsa_crt_matches_plain_exponentiation() {
        let key = test_key_1024();
        let (pub_key, priv_key) = test_keys(&key);

        let digest = vec![0x42; 32];
        let sig_crt = priv_key.sign(&digest).unwrap();

        // Same operation without the CRT: em^d mod n
        let em = pkcs1v15::pkcs1v15_sign_pad(&digest, priv_key.modulus_len()).unwrap();
        let n_bn = BigNum::from_bytes_be(&key.n);
        let ctx = BarrettCtx::new(&n_bn).unwrap();
        let sig_plain = ctx
            .mod_exp(
                &BigNum::from_bytes_be(&em),
                &BigNum::from_bytes_be(&key.d),
            )
            .unwrap()
            .to_bytes_be_padded(priv_key.modulus_len())
            .unwrap();

        assert_eq!(sig_crt, sig_plain);
        assert!(pub_key.verify(&digest, &sig_crt).unwrap());
    }
}
