pub mod audit;
pub mod facilities;
pub mod submissions;
