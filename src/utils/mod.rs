pub mod fs;
pub mod sort;
