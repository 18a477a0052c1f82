mod security;

pub use security::*;
