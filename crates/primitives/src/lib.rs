#![cfg_attr(not(test), warn(unused_crate_dependencies))]

pub mod calldata;
pub mod fee;
pub mod utils;

pub use starknet_types_core::felt::{Felt, FromStrError};
pub use starknet_types_core::hash;
