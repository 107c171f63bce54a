pub mod breakdown;
pub mod client;
pub mod emissions;
pub mod impact;
pub mod record;
pub mod rollup;
