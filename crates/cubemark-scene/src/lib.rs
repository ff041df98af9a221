//! Composite cube geometry for groups of adjacent markers.
//!
//! A [`LayoutTable`] says, for each marker identity, where its cube's eight
//! corners sit in the marker's frame and which neighbouring markers own each
//! vertical edge. A [`CubeResolver`] turns per-frame marker poses into pixel
//! cubes, passing a fresh [`CornerCache`] through the frame so adjacent
//! markers draw coincident edges.
//!
//! ```
//! use cubemark_core::{CalibrationParameters, MarkerPose};
//! use cubemark_scene::{BoardDims, CubeResolver, LayoutTable, RegistrationMode};
//! use nalgebra::Vector3;
//!
//! let table = LayoutTable::standard(&BoardDims::default()).unwrap();
//! let resolver = CubeResolver::new(table, 2.0).unwrap();
//! let calib = CalibrationParameters::pinhole(800.0, 800.0, 640.0, 360.0);
//! let pose = MarkerPose::new(Vector3::zeros(), Vector3::new(0.0, 0.0, 50.0));
//!
//! let frame = resolver.resolve_frame(&[(0, pose)], &calib, RegistrationMode::Incremental);
//! assert_eq!(frame.cubes.len(), 1);
//! assert!(frame.cache.contains(0));
//! ```

mod cache;
mod layout;
mod resolver;

pub use cache::{CornerCache, CornerPair};
pub use layout::{BoardDims, CubeLayout, LayoutError, LayoutTable, FRAME_MARKER_ID};
pub use resolver::{
    CornerSource, CubeResolver, FrameResolution, RegistrationMode, ResolveError, ResolvedCube,
};
