pub mod backup;
pub mod exec;
pub mod restore;
