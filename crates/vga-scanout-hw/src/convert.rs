//! On-demand pixel stream conversion.
//!
//! The scanout engine asks for the physical bytes of a run of whole lines.
//! Each logical sample is depth-expanded to one output byte and replicated
//! `scale` times horizontally. With scale 2 the second line of each pair is a
//! copy of the first, so samples are only expanded once per line pair.

use crate::color::{ColorMode, PACKED_HIGH_SHIFT, PACKED_SAMPLE_MASK};
use crate::frame::Frame;
use crate::geometry::Geometry;
use crate::{Error, Result};

/// A request for a run of the physical pixel stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRequest {
    /// Offset in the flattened, row-major physical pixel stream.
    pub start_pixel: usize,
    /// Number of bytes (physical pixels) to produce.
    pub byte_length: usize,
}

impl ChunkRequest {
    /// Creates a new chunk request.
    pub fn new(start_pixel: usize, byte_length: usize) -> Self {
        Self {
            start_pixel,
            byte_length,
        }
    }

    /// Creates a request for `count` whole lines starting at `first_line`.
    pub fn lines(geometry: &Geometry, first_line: usize, count: usize) -> Self {
        let width = geometry.screen_width();
        Self::new(first_line * width, count * width)
    }

    /// Returns the offset one past the last requested pixel, saturating at
    /// `usize::MAX`.
    pub fn end_pixel(&self) -> usize {
        self.start_pixel.saturating_add(self.byte_length)
    }

    /// Returns true if the request covers the given pixel offset.
    pub fn contains(&self, pixel: usize) -> bool {
        self.start_pixel <= pixel && pixel < self.end_pixel()
    }
}

/// Splits one physical frame into requests of at most `lines_per_chunk` lines.
///
/// The last chunk is shorter when the screen height is not a multiple of the
/// chunk size.
pub fn frame_chunks(
    geometry: &Geometry,
    lines_per_chunk: usize,
) -> impl Iterator<Item = ChunkRequest> + '_ {
    let step = lines_per_chunk.max(1);
    (0..geometry.screen_height())
        .step_by(step)
        .map(move |first| {
            let count = step.min(geometry.screen_height() - first);
            ChunkRequest::lines(geometry, first, count)
        })
}

/// Returns true if the chunk covering the boundary pixel is the last chunk of
/// the frame.
///
/// A swap raised from any earlier chunk would serve the rest of the frame
/// from the new buffer, so engines must use a chunk size for which this holds.
pub fn boundary_in_last_chunk(geometry: &Geometry, lines_per_chunk: usize) -> bool {
    frame_chunks(geometry, lines_per_chunk)
        .last()
        .is_some_and(|last| last.contains(geometry.boundary_pixel()))
}

/// Fills `out[..request.byte_length]` with the physical bytes for `request`.
///
/// Output byte `k` is the physical pixel at `request.start_pixel + k`. The
/// request must cover whole lines inside the screen, and `frame` must have the
/// format `geometry` describes. Performs no allocation.
pub fn produce(
    frame: Frame<'_>,
    geometry: &Geometry,
    request: ChunkRequest,
    out: &mut [u8],
) -> Result<()> {
    let width = geometry.screen_width();
    if request.start_pixel % width != 0 || request.byte_length % width != 0 {
        return Err(Error::MisalignedRequest {
            start_pixel: request.start_pixel,
            byte_length: request.byte_length,
            screen_width: width,
        });
    }

    let first_line = request.start_pixel / width;
    let lines = request.byte_length / width;
    let in_range = first_line
        .checked_add(lines)
        .is_some_and(|end| end <= geometry.screen_height());
    if !in_range {
        return Err(Error::RequestOutOfRange {
            first_line,
            lines,
            screen_height: geometry.screen_height(),
        });
    }

    if out.len() < request.byte_length {
        return Err(Error::ChunkBuffer {
            expected: request.byte_length,
            actual: out.len(),
        });
    }

    if frame.format() != geometry.format() {
        return Err(Error::FormatMismatch {
            expected: geometry.format().to_string(),
            actual: frame.format().to_string(),
        });
    }

    let scale = geometry.scale();
    let mode = geometry.color_mode();
    let out = &mut out[..request.byte_length];

    for i in 0..lines {
        let y = first_line + i;
        let offset = i * width;
        if y % scale != 0 && i > 0 {
            // Second line of a pair, already expanded just above
            out.copy_within(offset - width..offset, offset);
        } else {
            expand_line(frame.row(y / scale), mode, scale, &mut out[offset..offset + width]);
        }
    }

    Ok(())
}

/// Expands one logical row into one physical line.
#[inline]
fn expand_line(src: &[u8], mode: ColorMode, scale: usize, dst: &mut [u8]) {
    match (mode, scale) {
        (ColorMode::Direct8, 1) => dst.copy_from_slice(src),
        (ColorMode::Direct8, _) => {
            for (pair, &value) in dst.chunks_exact_mut(2).zip(src) {
                pair.fill(value);
            }
        }
        (ColorMode::Packed3x2, 1) => {
            for (pair, &byte) in dst.chunks_exact_mut(2).zip(src) {
                pair[0] = byte & PACKED_SAMPLE_MASK;
                pair[1] = (byte >> PACKED_HIGH_SHIFT) & PACKED_SAMPLE_MASK;
            }
        }
        (ColorMode::Packed3x2, _) => {
            for (quad, &byte) in dst.chunks_exact_mut(4).zip(src) {
                let (low, high) = quad.split_at_mut(2);
                low.fill(byte & PACKED_SAMPLE_MASK);
                high.fill((byte >> PACKED_HIGH_SHIFT) & PACKED_SAMPLE_MASK);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::FrameFormat;

    const MODES: [ColorMode; 2] = [ColorMode::Direct8, ColorMode::Packed3x2];

    /// Logical frame whose samples vary with position.
    fn patterned(format: FrameFormat) -> Vec<u8> {
        (0..format.byte_len())
            .map(|i| (i.wrapping_mul(37) ^ (i >> 3)) as u8)
            .collect()
    }

    /// Physical pixel at `offset` computed straight from the definition.
    fn reference_pixel(frame: Frame<'_>, geometry: &Geometry, offset: usize) -> u8 {
        let x = (offset % geometry.screen_width()) / geometry.scale();
        let y = (offset / geometry.screen_width()) / geometry.scale();
        frame.pixel(x, y).unwrap()
    }

    #[test]
    fn test_output_length_and_mapping_all_modes() {
        for scale in [1, 2] {
            for mode in MODES {
                let geometry = Geometry::with_default_boundary(64, 24, scale, mode).unwrap();
                let data = patterned(geometry.format());
                let frame = Frame::new(geometry.format(), &data).unwrap();

                for (first, count) in [(0, 1), (0, 24), (3, 5), (10, 2), (23, 1)] {
                    let request = ChunkRequest::lines(&geometry, first, count);
                    // Extra tail proves nothing past byte_length is touched
                    let mut out = vec![0xEEu8; request.byte_length + 16];
                    produce(frame, &geometry, request, &mut out).unwrap();

                    for k in 0..request.byte_length {
                        assert_eq!(
                            out[k],
                            reference_pixel(frame, &geometry, request.start_pixel + k),
                            "scale {} {} lines {}+{} byte {}",
                            scale,
                            mode,
                            first,
                            count,
                            k
                        );
                    }
                    assert!(out[request.byte_length..].iter().all(|&b| b == 0xEE));
                }
            }
        }
    }

    #[test]
    fn test_idempotent() {
        let geometry = Geometry::with_default_boundary(640, 480, 2, ColorMode::Packed3x2).unwrap();
        let data = patterned(geometry.format());
        let frame = Frame::new(geometry.format(), &data).unwrap();
        let request = ChunkRequest::lines(&geometry, 96, 48);

        let mut first = vec![0u8; request.byte_length];
        let mut second = vec![0u8; request.byte_length];
        produce(frame, &geometry, request, &mut first).unwrap();
        produce(frame, &geometry, request, &mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_packed_depth_expansion() {
        let geometry = Geometry::with_default_boundary(2, 1, 1, ColorMode::Packed3x2).unwrap();
        let data = [0xF2u8];
        let frame = Frame::new(geometry.format(), &data).unwrap();
        let mut out = [0u8; 2];
        produce(frame, &geometry, ChunkRequest::new(0, 2), &mut out).unwrap();
        assert_eq!(out, [2, 7]);

        let geometry = Geometry::with_default_boundary(4, 2, 2, ColorMode::Packed3x2).unwrap();
        let frame = Frame::new(geometry.format(), &data).unwrap();
        let mut out = [0u8; 8];
        produce(frame, &geometry, ChunkRequest::new(0, 8), &mut out).unwrap();
        assert_eq!(out, [2, 2, 7, 7, 2, 2, 7, 7]);
    }

    #[test]
    fn test_scale2_line_pairs_identical() {
        for mode in MODES {
            let geometry = Geometry::with_default_boundary(640, 480, 2, mode).unwrap();
            let data = patterned(geometry.format());
            let frame = Frame::new(geometry.format(), &data).unwrap();
            let request = ChunkRequest::lines(&geometry, 0, 480);
            let mut out = vec![0u8; request.byte_length];
            produce(frame, &geometry, request, &mut out).unwrap();

            for pair in out.chunks_exact(2 * 640) {
                let (even, odd) = pair.split_at(640);
                assert_eq!(even, odd);
            }
        }
    }

    #[test]
    fn test_scale2_odd_start_line() {
        let geometry = Geometry::with_default_boundary(16, 8, 2, ColorMode::Direct8).unwrap();
        let data = patterned(geometry.format());
        let frame = Frame::new(geometry.format(), &data).unwrap();

        let mut whole = vec![0u8; geometry.frame_pixels()];
        produce(frame, &geometry, ChunkRequest::lines(&geometry, 0, 8), &mut whole).unwrap();

        let request = ChunkRequest::lines(&geometry, 3, 4);
        let mut part = vec![0u8; request.byte_length];
        produce(frame, &geometry, request, &mut part).unwrap();
        assert_eq!(&part[..], &whole[request.start_pixel..request.end_pixel()]);
    }

    #[test]
    fn test_chunks_match_whole_frame() {
        let geometry = Geometry::with_default_boundary(640, 480, 2, ColorMode::Packed3x2).unwrap();
        let data = patterned(geometry.format());
        let frame = Frame::new(geometry.format(), &data).unwrap();

        let mut whole = vec![0u8; geometry.frame_pixels()];
        produce(frame, &geometry, ChunkRequest::lines(&geometry, 0, 480), &mut whole).unwrap();

        let mut stitched = Vec::with_capacity(geometry.frame_pixels());
        let mut bounce = vec![0u8; 48 * 640];
        for request in frame_chunks(&geometry, 48) {
            produce(frame, &geometry, request, &mut bounce).unwrap();
            stitched.extend_from_slice(&bounce[..request.byte_length]);
        }
        assert_eq!(stitched, whole);
    }

    #[test]
    fn test_frame_chunks_cover_frame() {
        let geometry = Geometry::with_default_boundary(640, 350, 2, ColorMode::Direct8).unwrap();
        let chunks: Vec<_> = frame_chunks(&geometry, 48).collect();
        assert_eq!(chunks.len(), 8);
        assert_eq!(chunks[0], ChunkRequest::new(0, 48 * 640));
        assert_eq!(chunks[7], ChunkRequest::new(336 * 640, 14 * 640));
        assert_eq!(chunks[7].end_pixel(), geometry.frame_pixels());
    }

    #[test]
    fn test_end_to_end_solid_fill() {
        let geometry = Geometry::with_default_boundary(640, 480, 2, ColorMode::Direct8).unwrap();
        let data = vec![9u8; geometry.format().byte_len()];
        let frame = Frame::new(geometry.format(), &data).unwrap();
        let mut out = vec![0u8; 640];
        produce(frame, &geometry, ChunkRequest::new(0, 640), &mut out).unwrap();
        assert_eq!(out.len(), 640);
        assert!(out.iter().all(|&b| b == 9));
    }

    #[test]
    fn test_rejects_misaligned_request() {
        let geometry = Geometry::with_default_boundary(640, 480, 1, ColorMode::Direct8).unwrap();
        let data = vec![0u8; geometry.format().byte_len()];
        let frame = Frame::new(geometry.format(), &data).unwrap();
        let mut out = vec![0u8; 1280];

        let err = produce(frame, &geometry, ChunkRequest::new(320, 640), &mut out).unwrap_err();
        assert!(matches!(err, Error::MisalignedRequest { .. }));
        let err = produce(frame, &geometry, ChunkRequest::new(0, 700), &mut out).unwrap_err();
        assert!(matches!(err, Error::MisalignedRequest { .. }));
    }

    #[test]
    fn test_rejects_out_of_range_and_short_buffer() {
        let geometry = Geometry::with_default_boundary(640, 480, 2, ColorMode::Direct8).unwrap();
        let data = vec![0u8; geometry.format().byte_len()];
        let frame = Frame::new(geometry.format(), &data).unwrap();

        let mut out = vec![0u8; 2 * 640];
        let err = produce(frame, &geometry, ChunkRequest::lines(&geometry, 479, 2), &mut out)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RequestOutOfRange {
                first_line: 479,
                lines: 2,
                ..
            }
        ));

        let mut short = vec![0u8; 639];
        let err = produce(frame, &geometry, ChunkRequest::new(0, 640), &mut short).unwrap_err();
        assert!(matches!(
            err,
            Error::ChunkBuffer {
                expected: 640,
                actual: 639
            }
        ));
    }

    #[test]
    fn test_rejects_request_past_usize_max() {
        let geometry = Geometry::new(1, 1, 1, ColorMode::Direct8, 1).unwrap();
        let data = [0u8; 1];
        let frame = Frame::new(geometry.format(), &data).unwrap();
        let mut out = [0u8; 1];

        let request = ChunkRequest::new(usize::MAX, 1);
        assert_eq!(request.end_pixel(), usize::MAX);
        assert!(!request.contains(0));
        let err = produce(frame, &geometry, request, &mut out).unwrap_err();
        assert!(matches!(
            err,
            Error::RequestOutOfRange {
                first_line: usize::MAX,
                lines: 1,
                ..
            }
        ));
    }

    #[test]
    fn test_boundary_in_last_chunk() {
        let geometry = Geometry::with_default_boundary(640, 480, 2, ColorMode::Direct8).unwrap();
        assert_eq!(geometry.boundary_lines(), 48);
        assert!(boundary_in_last_chunk(&geometry, 48));
        assert!(boundary_in_last_chunk(&geometry, 100));
        assert!(boundary_in_last_chunk(&geometry, 480));
        assert!(!boundary_in_last_chunk(&geometry, 1));
        assert!(!boundary_in_last_chunk(&geometry, 20));
        assert!(!boundary_in_last_chunk(&geometry, 50));
    }

    #[test]
    fn test_rejects_foreign_frame_format() {
        let geometry = Geometry::with_default_boundary(640, 480, 2, ColorMode::Direct8).unwrap();
        let format = FrameFormat::new(320, 240, ColorMode::Packed3x2);
        let data = vec![0u8; format.byte_len()];
        let frame = Frame::new(format, &data).unwrap();
        let mut out = vec![0u8; 640];
        let err = produce(frame, &geometry, ChunkRequest::new(0, 640), &mut out).unwrap_err();
        assert!(matches!(err, Error::FormatMismatch { .. }));
    }

    #[test]
    fn test_empty_request() {
        let geometry = Geometry::with_default_boundary(640, 480, 2, ColorMode::Direct8).unwrap();
        let data = vec![0u8; geometry.format().byte_len()];
        let frame = Frame::new(geometry.format(), &data).unwrap();
        let mut out: [u8; 0] = [];
        assert!(produce(frame, &geometry, ChunkRequest::new(0, 0), &mut out).is_ok());
    }
}
