#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![forbid(unsafe_code)]

pub mod lifecycle;
pub mod notify;
pub mod processors;
pub mod storage;
pub mod utils;

#[cfg(test)]
mod testing;
