pub mod contracts;

pub use contracts::{BulkerOpcode, IBulker};
