#![forbid(unsafe_code)]
#![doc = "Arbitrary-precision unsigned integer arithmetic for slimtls."]

mod barrett;
mod bignum;
mod ops;

pub use barrett::BarrettCtx;
pub use bignum::{BigNum, DoubleLimb, Limb, LIMB_BITS};
