pub mod classify;
pub mod composite;
pub mod consts;
pub mod error;
pub mod filter;
pub mod gapfill;
pub mod geometry;
pub mod io;
pub mod mask;
pub mod pipeline;
pub mod raster;
pub mod reduce;
pub mod scene;
pub mod summary;
