pub mod tooling;
