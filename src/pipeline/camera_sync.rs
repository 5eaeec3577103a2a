use glam::Vec3;

use crate::collab::types::{RenderCamera, TrackerSpec};
use crate::pipeline::types::Sizing;

/// Default vertical FOV, in degrees, spanned by the smaller video dimension.
pub const DEFAULT_MIN_VIDEO_DIM_FOV_DEG: f32 = 35.0;

/// Copies the tracker's implied camera geometry onto the render camera.
///
/// Anchor poses are expressed in the tracker's camera space, so this has to
/// run before anchors are drawn on every tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraSync {
    min_video_dim_fov_deg: f32,
}

impl CameraSync {
    pub fn new(min_video_dim_fov_deg: f32) -> Self {
        Self {
            min_video_dim_fov_deg,
        }
    }

    /// Vertical FOV (degrees) and aspect for a canvas showing the tracker video.
    ///
    /// Returns `None` while either the canvas or the video has no extent.
    pub fn fit(&self, sizing: Sizing, spec: &TrackerSpec) -> Option<(f32, f32)> {
        if sizing.is_empty() || spec.video_width == 0 || spec.video_height == 0 {
            return None;
        }
        let video_w = spec.video_width as f32;
        let video_h = spec.video_height as f32;
        let canvas_w = sizing.width as f32;
        let canvas_h = sizing.height as f32;

        let video_aspect = video_w / video_h;
        let canvas_aspect = sizing.aspect();

        // The base FOV spans the smaller video dimension.
        let fov_factor = if video_h > video_w {
            1.0 / video_aspect
        } else {
            1.0
        };
        let mut fov = self.min_video_dim_fov_deg * fov_factor;

        // Canvas wider than the video: the video is scaled to the canvas width
        // and cropped vertically, so only part of its FOV is visible.
        if canvas_aspect > video_aspect {
            let scaled_video_h = video_h * (canvas_w / video_w);
            let half = (0.5 * fov).to_radians();
            fov = (2.0 * ((canvas_h / scaled_video_h) * half.tan()).atan()).to_degrees();
        }

        Some((fov, canvas_aspect))
    }

    /// Write the fitted projection onto `camera`. Returns `false` and leaves
    /// the camera untouched when the tracker has not reported yet.
    pub fn sync(
        &self,
        sizing: Sizing,
        spec: Option<&TrackerSpec>,
        camera: &mut RenderCamera,
    ) -> bool {
        let Some((fov_deg, aspect)) = spec.and_then(|spec| self.fit(sizing, spec)) else {
            return false;
        };
        camera.fov_deg = fov_deg;
        camera.aspect = aspect;
        camera.position = Vec3::ZERO;
        true
    }
}

impl Default for CameraSync {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_VIDEO_DIM_FOV_DEG)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square(side: u32) -> Sizing {
        Sizing {
            width: side,
            height: side,
            top: 0,
            left: 0,
        }
    }

    fn spec(w: u32, h: u32) -> TrackerSpec {
        TrackerSpec {
            video_width: w,
            video_height: h,
        }
    }

    #[test]
    fn landscape_video_in_square_canvas_keeps_base_fov() {
        let sync = CameraSync::default();
        let (fov, aspect) = sync.fit(square(600), &spec(640, 480)).unwrap();
        assert!((fov - 35.0).abs() < 1e-4);
        assert_eq!(aspect, 1.0);
    }

    #[test]
    fn portrait_video_is_cropped_to_canvas() {
        let sync = CameraSync::default();
        let (fov, _) = sync.fit(square(600), &spec(480, 640)).unwrap();

        let base = 35.0_f32 * (640.0 / 480.0);
        let expected = (2.0 * (0.75 * (0.5 * base).to_radians().tan()).atan()).to_degrees();
        assert!((fov - expected).abs() < 1e-3, "fov {fov} != {expected}");
        assert!(fov < base);
    }

    #[test]
    fn sync_writes_projection_and_recentres_camera() {
        let sync = CameraSync::default();
        let mut camera = RenderCamera::default();
        assert!(sync.sync(square(720), Some(&spec(1280, 720)), &mut camera));
        assert!((camera.fov_deg - 35.0).abs() < 1e-4);
        assert_eq!(camera.aspect, 1.0);
        assert_eq!(camera.position, Vec3::ZERO);
    }

    #[test]
    fn sync_without_spec_leaves_camera_untouched() {
        let sync = CameraSync::default();
        let mut camera = RenderCamera::default();
        assert!(!sync.sync(square(720), None, &mut camera));
        assert_eq!(camera, RenderCamera::default());
    }

    #[test]
    fn sync_with_empty_canvas_is_skipped() {
        let sync = CameraSync::default();
        let mut camera = RenderCamera::default();
        assert!(!sync.sync(Sizing::default(), Some(&spec(640, 480)), &mut camera));
        assert!(sync.fit(square(100), &spec(0, 480)).is_none());
    }

    #[test]
    fn custom_base_fov_is_respected() {
        let sync = CameraSync::new(50.0);
        let (fov, _) = sync.fit(square(600), &spec(640, 480)).unwrap();
        assert!((fov - 50.0).abs() < 1e-4);
    }
}
