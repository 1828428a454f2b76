//! Shared fixtures for the PKI tests: a fixed RSA-1024 key pair and its
//! RFC 8017 DER encoding, plus builder-generated certificate chains.

use slimtls_bignum::{BarrettCtx, BigNum};
use slimtls_crypto::rsa::{RsaPrivateKey, RsaPublicKey};
use slimtls_utils::asn1::Encoder;

use crate::x509::{Certificate, CertificateBuilder, DistinguishedName};

fn hex(s: &str) -> Vec<u8> {
    ::hex::decode(s).unwrap()
}

/// Raw components of a fixed RSA-1024 test key (NOT for production use).
pub(crate) struct TestKeyParts {
    pub n: Vec<u8>,
    pub e: Vec<u8>,
    pub d: Vec<u8>,
    pub p: Vec<u8>,
    pub q: Vec<u8>,
    pub dp: Vec<u8>,
    pub dq: Vec<u8>,
    pub qinv: Vec<u8>,
}

pub(crate) fn test_key_parts() -> TestKeyParts {
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

    // CRT parameters derived from (d, p, q); production keys carry these
    // in their DER encoding.
    let one = BigNum::from_u64(1);
    let d_bn = BigNum::from_bytes_be(&d);
    let p_bn = BigNum::from_bytes_be(&p);
    let q_bn = BigNum::from_bytes_be(&q);
    let (p1, _) = p_bn.sub(&one);
    let (q1, _) = q_bn.sub(&one);
    let dp = d_bn.mod_reduce(&p1).unwrap().to_bytes_be();
    let dq = d_bn.mod_reduce(&q1).unwrap().to_bytes_be();
    // qinv = q^(p-2) mod p (Fermat inverse, p prime)
    let p_ctx = BarrettCtx::new(&p_bn).unwrap();
    let (p2, _) = p_bn.sub(&BigNum::from_u64(2));
    let qinv = p_ctx.mod_exp(&q_bn, &p2).unwrap().to_bytes_be();

    TestKeyParts {
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

/// The fixed test key as a (public, private) pair.
pub(crate) fn test_rsa_key_pair() -> (RsaPublicKey, RsaPrivateKey) {
    let k = test_key_parts();
    let pub_key = RsaPublicKey::new(&k.n, &k.e).unwrap();
    let priv_key =
        RsaPrivateKey::new(&k.n, &k.e, &k.d, &k.p, &k.q, &k.dp, &k.dq, &k.qinv).unwrap();
    (pub_key, priv_key)
}

/// The fixed test key encoded as an RFC 8017 RSAPrivateKey DER blob.
pub(crate) fn test_rsa_key_der() -> Vec<u8> {
    let k = test_key_parts();
    let mut body = Encoder::new();
    body.write_integer(&[0x00]);
    body.write_integer(&k.n);
    body.write_integer(&k.e);
    body.write_integer(&k.d);
    body.write_integer(&k.p);
    body.write_integer(&k.q);
    body.write_integer(&k.dp);
    body.write_integer(&k.dq);
    body.write_integer(&k.qinv);
    let mut outer = Encoder::new();
    outer.write_sequence(&body.finish());
    outer.finish()
}

pub(crate) fn dn(cn: &str) -> DistinguishedName {
    DistinguishedName {
        entries: vec![("CN".into(), cn.into()), ("O".into(), "slimtls test".into())],
    }
}

/// Build a root CA, an intermediate CA, and a leaf, all on the test key.
/// Chain order is leaf first.
pub(crate) fn test_chain() -> (Certificate, Vec<Certificate>) {
    let (pub_key, priv_key) = test_rsa_key_pair();

    let root = CertificateBuilder::new()
        .serial_number(&[0x01])
        .issuer(dn("slimtls root"))
        .subject(dn("slimtls root"))
        .validity(1_600_000_000, 2_500_000_000)
        .subject_public_key(pub_key.clone())
        .basic_constraints(true)
        .build(&priv_key)
        .unwrap();

    let intermediate = CertificateBuilder::new()
        .serial_number(&[0x02])
        .issuer(dn("slimtls root"))
        .subject(dn("slimtls intermediate"))
        .validity(1_600_000_000, 2_500_000_000)
        .subject_public_key(pub_key.clone())
        .basic_constraints(true)
        .build(&priv_key)
        .unwrap();

    let leaf = CertificateBuilder::new()
        .serial_number(&[0x03])
        .issuer(dn("slimtls intermediate"))
        .subject(dn("device.slimtls.test"))
        .validity(1_600_000_000, 2_500_000_000)
        .subject_public_key(pub_key)
        .build(&priv_key)
        .unwrap();

    (root, vec![leaf, intermediate])
}
