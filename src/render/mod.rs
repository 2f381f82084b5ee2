pub mod background;
pub mod canvas;
pub mod radial;
pub mod surface;
pub mod text;
