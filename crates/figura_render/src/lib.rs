//! Rendering seams for Figura.
//!
//! The core never talks to a graphics API directly. It allocates, uploads,
//! reads back and draws through [`RenderDevice`], and looks compiled shaders
//! up through [`ShaderCache`]. [`HeadlessDevice`] and [`MemoryShaderCache`]
//! implement both in memory.

pub mod device;
pub mod figure_renderer;
pub mod ibl;
pub mod pass;
pub mod shader;

pub use device::{BufferDesc, BufferId, DeviceOp, DrawCall, HeadlessDevice, RenderDevice};
pub use figure_renderer::{FigureConstants, FigureRenderer};
pub use ibl::IblEnvironment;
pub use pass::RenderingPass;
pub use shader::{MemoryShaderCache, ShaderCache, ShaderHandle, ShaderKey};
