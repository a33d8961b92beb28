//! I/O for geospatial raster data

mod geotiff;

pub use geotiff::{
    read_geotiff, read_geotiff_from_buffer, read_scene, write_geotiff, write_geotiff_to_buffer,
    write_scene,
};
