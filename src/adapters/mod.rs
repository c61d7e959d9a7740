pub mod compound_v3;
