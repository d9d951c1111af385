pub mod failpoint;
pub mod hash;
