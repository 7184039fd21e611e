pub mod active_region;
pub mod factorization;
pub mod gradient;
pub mod ordering;
pub mod seamless_clone;
pub mod session;
pub mod solver;
pub mod system;
