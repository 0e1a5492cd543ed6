pub mod cipher;
pub mod hash;
pub mod signature;
