pub mod prints;
pub mod system;
