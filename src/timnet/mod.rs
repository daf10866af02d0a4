pub mod client;
pub mod packet;

pub use client::{Client, RegisterReader};
