pub mod browser;
pub mod decode;
pub mod engine;

#[cfg(test)]
pub mod fake;
