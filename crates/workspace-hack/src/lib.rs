// This file is generated by `cargo hakari`.
