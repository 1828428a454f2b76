//! Cryptographic algorithm benchmarks.
//!
//! Run with: cargo bench -p slimtls-crypto

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

// ---------------------------------------------------------------------------
// Hash benchmarks
// ---------------------------------------------------------------------------

fn bench_hashes(c: &mut Criterion) {
    use slimtls_crypto::md5::Md5;
    use slimtls_crypto::sha1::Sha1;
    use slimtls_crypto::sha2::Sha256;

    let mut group = c.benchmark_group("hash");

    for size in [1024usize, 16384] {
        group.throughput(Throughput::Bytes(size as u64));
        let data = vec![0u8; size];

        group.bench_with_input(BenchmarkId::new("md5", size), &size, |b, _| {
            b.iter(|| Md5::digest(&data).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("sha1", size), &size, |b, _| {
            b.iter(|| Sha1::digest(&data).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("sha256", size), &size, |b, _| {
            b.iter(|| Sha256::digest(&data).unwrap());
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// RC4 benchmarks
// ---------------------------------------------------------------------------

fn bench_rc4(c: &mut Criterion) {
    use slimtls_crypto::rc4::Rc4;

    let mut group = c.benchmark_group("rc4");

    for size in [1024usize, 16384] {
        group.throughput(Throughput::Bytes(size as u64));
        let key = [0x42u8; 16];

        group.bench_with_input(BenchmarkId::new("apply", size), &size, |b, _| {
            let mut buf = vec![0u8; size];
            let mut rc4 = Rc4::new(&key).unwrap();
            b.iter(|| rc4.apply_keystream(&mut buf));
        });
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// RSA benchmarks
// ---------------------------------------------------------------------------

fn bench_rsa(c: &mut Criterion) {
    use slimtls_bignum::{BarrettCtx, BigNum};

    let mut group = c.benchmark_group("rsa");
    group.sample_size(20);

    // 1024-bit modular exponentiation with a short public exponent,
    // the dominant cost of certificate verification.
    let n = BigNum::from_bytes_be(&[0xC7; 128]);
    let ctx = BarrettCtx::new(&n).unwrap();
    let base = BigNum::from_bytes_be(&[0x35; 128]);
    let e = BigNum::from_u64(65537);

    group.bench_function("mod_exp_1024_e65537", |b| {
        b.iter(|| ctx.mod_exp(&base, &e).unwrap());
    });

    group.finish();
}

criterion_group!(benches, bench_hashes, bench_rc4, bench_rsa);
criterion_main!(benches);
