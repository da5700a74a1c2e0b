pub mod oscillation;
