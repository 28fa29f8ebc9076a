pub mod order;
pub mod policy;
pub mod precedent;
