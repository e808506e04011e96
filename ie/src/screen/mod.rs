pub mod encounter;
