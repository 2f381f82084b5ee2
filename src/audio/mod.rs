pub mod analyser;
pub mod decode;
pub mod smoother;
pub mod tap;
