pub mod audio;
pub mod gfx;
