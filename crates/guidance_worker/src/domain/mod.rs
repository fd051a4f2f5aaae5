mod guidance_loop;

pub use guidance_loop::*;
