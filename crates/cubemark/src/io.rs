//! Capture and display seams for the frame loop.
//!
//! A [`FrameSource`] stands in for the camera and a [`FrameSink`] for the
//! display window. The provided implementations read an image sequence from
//! a directory and write annotated frames back to disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;

const FRAME_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff"];

/// One captured frame.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Position in the stream, starting at 0.
    pub index: u64,
    /// Stable name used to key detections and output files.
    pub name: String,
    pub image: RgbImage,
}

impl Frame {
    pub fn new(index: u64, name: impl Into<String>, image: RgbImage) -> Self {
        Self {
            index,
            name: name.into(),
            image,
        }
    }
}

/// Whether the loop should keep going after a frame was presented.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopControl {
    Continue,
    /// Stop after the current frame (the Escape key of a live window).
    Stop,
}

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode frame {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("no frames found in {0}")]
    Empty(PathBuf),
    #[error("{first} and {second} would both be named frame {name:?}")]
    DuplicateName {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },
}

#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[error("failed to create {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write frame {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

/// Supplies frames until exhausted (`Ok(None)`).
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;
}

/// Consumes annotated frames.
pub trait FrameSink {
    fn present(&mut self, frame: &Frame, annotated: &RgbImage) -> Result<LoopControl, SinkError>;
}

/// Frames read from image files in a directory, in file-name order.
#[derive(Debug)]
pub struct ImageSequenceSource {
    /// Frame name (file stem) and path, in name order.
    frames: Vec<(String, PathBuf)>,
    next: usize,
    expected_size: Option<(u32, u32)>,
}

impl ImageSequenceSource {
    /// List the frames in `dir`. Fails if there are none, or if two files
    /// share a stem (`f.png` and `f.jpg`).
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, SourceError> {
        let dir = dir.as_ref();
        let entries = fs::read_dir(dir).map_err(|source| SourceError::Io {
            path: dir.to_path_buf(),
            source,
        })?;

        let mut by_name: BTreeMap<String, PathBuf> = BTreeMap::new();
        for entry in entries {
            let entry = entry.map_err(|source| SourceError::Io {
                path: dir.to_path_buf(),
                source,
            })?;
            let path = entry.path();
            if !path.is_file() || !is_frame_file(&path) {
                continue;
            }
            let Some(name) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            if let Some(first) = by_name.get(&name) {
                let (first, second) = if *first < path {
                    (first.clone(), path)
                } else {
                    (path, first.clone())
                };
                return Err(SourceError::DuplicateName {
                    name,
                    first,
                    second,
                });
            }
            by_name.insert(name, path);
        }
        if by_name.is_empty() {
            return Err(SourceError::Empty(dir.to_path_buf()));
        }
        log::info!("found {} frames in {}", by_name.len(), dir.display());

        Ok(Self {
            frames: by_name.into_iter().collect(),
            next: 0,
            expected_size: None,
        })
    }

    /// Warn about frames whose size differs from `width x height`.
    pub fn with_expected_size(mut self, width: u32, height: u32) -> Self {
        self.expected_size = Some((width, height));
        self
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        let Some((name, path)) = self.frames.get(self.next) else {
            return Ok(None);
        };
        let image = image::open(path)
            .map_err(|source| SourceError::Decode {
                path: path.clone(),
                source,
            })?
            .to_rgb8();

        if let Some((w, h)) = self.expected_size {
            if image.dimensions() != (w, h) {
                log::warn!(
                    "{} is {}x{}, expected {w}x{h}; processing as-is",
                    path.display(),
                    image.width(),
                    image.height()
                );
            }
        }

        let frame = Frame::new(self.next as u64, name.clone(), image);
        self.next += 1;
        Ok(Some(frame))
    }
}

fn is_frame_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| FRAME_EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}

/// Writes each annotated frame to `<dir>/<frame name>.png`.
#[derive(Debug)]
pub struct DirectorySink {
    dir: PathBuf,
    written: usize,
}

impl DirectorySink {
    /// Create the output directory if needed.
    pub fn create(dir: impl AsRef<Path>) -> Result<Self, SinkError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|source| SinkError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir, written: 0 })
    }

    pub fn written(&self) -> usize {
        self.written
    }
}

impl FrameSink for DirectorySink {
    fn present(&mut self, frame: &Frame, annotated: &RgbImage) -> Result<LoopControl, SinkError> {
        let path = self.dir.join(format!("{}.png", frame.name));
        annotated
            .save(&path)
            .map_err(|source| SinkError::Encode { path, source })?;
        self.written += 1;
        Ok(LoopControl::Continue)
    }
}
