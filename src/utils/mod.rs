mod text;

pub use text::{char_len, ellipsize};
