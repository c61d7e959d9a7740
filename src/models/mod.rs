pub mod action;
pub mod market;
pub mod rewards;
pub mod token;

pub use action::*;
pub use market::*;
pub use rewards::*;
pub use token::*;
