pub mod nis;
pub mod results;
pub mod text;
