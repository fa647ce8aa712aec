//! Request/response boundary exposed to the consuming process.

use serde::{Deserialize, Serialize};

use crate::buffer::Mapping;
use crate::device::VncFramebuffer;
use crate::dirty::DirtyRect;
use crate::error::Result;
use crate::geometry::Geometry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeometryInfo {
    pub width: u32,
    pub height: u32,
    pub bits_per_pixel: u32,
    /// Bytes per row.
    pub stride: u32,
    pub buffer_size: u64,
}

impl From<Geometry> for GeometryInfo {
    fn from(geometry: Geometry) -> Self {
        Self {
            width: geometry.width(),
            height: geometry.height(),
            bits_per_pixel: geometry.bits_per_pixel(),
            stride: geometry.stride(),
            buffer_size: geometry.buffer_size(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ControlRequest {
    GetGeometry,
    GetAndClearDirty,
    MapBuffer,
    SetGeometry {
        width: u32,
        height: u32,
        bits_per_pixel: u32,
    },
}

#[derive(Debug)]
pub enum ControlReply {
    Geometry(GeometryInfo),
    /// All zeros when nothing changed since the previous poll.
    Dirty(DirtyRect),
    Mapped(Mapping),
    GeometrySet(GeometryInfo),
}

pub trait ControlSurface {
    fn get_geometry(&self) -> Result<GeometryInfo>;

    /// Returns the pending dirty rectangle and clears it.
    fn get_and_clear_dirty(&self) -> DirtyRect;

    fn map_buffer(&self) -> Result<Mapping>;

    fn set_geometry(&self, width: u32, height: u32, bits_per_pixel: u32) -> Result<GeometryInfo>;

    fn handle(&self, request: ControlRequest) -> Result<ControlReply> {
        match request {
            ControlRequest::GetGeometry => self.get_geometry().map(ControlReply::Geometry),
            ControlRequest::GetAndClearDirty => Ok(ControlReply::Dirty(self.get_and_clear_dirty())),
            ControlRequest::MapBuffer => self.map_buffer().map(ControlReply::Mapped),
            ControlRequest::SetGeometry {
                width,
                height,
                bits_per_pixel,
            } => self
                .set_geometry(width, height, bits_per_pixel)
                .map(ControlReply::GeometrySet),
        }
    }
}

impl ControlSurface for VncFramebuffer {
    fn get_geometry(&self) -> Result<GeometryInfo> {
        self.current_geometry().map(GeometryInfo::from)
    }

    fn get_and_clear_dirty(&self) -> DirtyRect {
        self.take_dirty().to_reply()
    }

    fn map_buffer(&self) -> Result<Mapping> {
        self.map_for_shared_access()
    }

    fn set_geometry(&self, width: u32, height: u32, bits_per_pixel: u32) -> Result<GeometryInfo> {
        self.configure(width, height, bits_per_pixel)
            .map(GeometryInfo::from)
    }
}

#[cfg(all(test, not(feature = "loom")))]
mod tests {
    use super::*;
    use crate::error::FramebufferError;

    #[test]
    fn unconfigured_device_rejects_geometry_and_map() {
        let fb = VncFramebuffer::new("test");
        assert_eq!(fb.get_geometry(), Err(FramebufferError::NotConfigured));
        assert!(matches!(
            fb.handle(ControlRequest::MapBuffer),
            Err(FramebufferError::NotConfigured)
        ));
        assert_eq!(fb.get_and_clear_dirty(), DirtyRect::EMPTY);
    }

    #[test]
    fn set_geometry_reports_derived_fields() {
        let fb = VncFramebuffer::new("test");
        let reply = fb
            .handle(ControlRequest::SetGeometry {
                width: 800,
                height: 600,
                bits_per_pixel: 24,
            })
            .unwrap();
        let info = match reply {
            ControlReply::GeometrySet(info) => info,
            other => panic!("unexpected reply {other:?}"),
        };
        assert_eq!(
            info,
            GeometryInfo {
                width: 800,
                height: 600,
                bits_per_pixel: 24,
                stride: 2400,
                buffer_size: 2400 * 600,
            }
        );
        assert_eq!(fb.get_geometry(), Ok(info));
    }

    #[test]
    fn map_buffer_covers_exactly_the_buffer() {
        let fb = VncFramebuffer::new("test");
        fb.set_geometry(320, 200, 16).unwrap();
        let Ok(ControlReply::Mapped(mapping)) = fb.handle(ControlRequest::MapBuffer) else {
            panic!("map failed");
        };
        assert_eq!(mapping.len(), 320 * 2 * 200);
    }

    #[test]
    fn dirty_poll_returns_sentinel_when_idle() {
        let fb = VncFramebuffer::new("test");
        fb.set_geometry(64, 64, 32).unwrap();
        fb.report_changed_pixel_rect(1, 2, 3, 4);

        let Ok(ControlReply::Dirty(rect)) = fb.handle(ControlRequest::GetAndClearDirty) else {
            panic!("poll failed");
        };
        assert_eq!(rect, DirtyRect::new(1, 2, 3, 4));
        assert_eq!(fb.get_and_clear_dirty(), DirtyRect::EMPTY);
    }

    #[test]
    fn requests_are_serialization_agnostic() {
        let request = ControlRequest::SetGeometry {
            width: 640,
            height: 480,
            bits_per_pixel: 16,
        };
        let json = serde_json::to_string(&request).unwrap();
        assert_eq!(
            json,
            r#"{"op":"set_geometry","width":640,"height":480,"bits_per_pixel":16}"#
        );
        assert_eq!(serde_json::from_str::<ControlRequest>(&json).unwrap(), request);
        assert_eq!(
            serde_json::from_str::<ControlRequest>(r#"{"op":"get_and_clear_dirty"}"#).unwrap(),
            ControlRequest::GetAndClearDirty
        );
    }
}
