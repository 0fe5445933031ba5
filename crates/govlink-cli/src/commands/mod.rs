pub mod check;
pub mod export;
pub mod metrics;
pub mod requirements;
