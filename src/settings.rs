use std::f32::consts::PI;
use three_d::{Srgba, Vec3, vec3};


pub const DEFAULT_ASSET_PATH: &str = "assets/spider/scene.gltf";


/// Camera placement and projection
#[derive(Clone, Debug)]
pub struct CameraSettings {
    pub position: Vec3,
    pub target: Vec3,
    pub fovy_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// orbit/zoom speeds grow with the distance to the target
    pub orbit_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
}


/// Lights and shadow map
#[derive(Clone, Debug)]
pub struct LightSettings {
    pub ambient_intensity: f32,
    pub spot_intensity: f32,
    pub spot_position: Vec3,
    pub spot_cutoff: f32, // radians, half-angle of the cone
    pub spot_color: Srgba,
    pub spot_linear_falloff: f32,
    pub shadow_map_size: u32,
}


/// Walking and turning constants, all per frame
#[derive(Clone, Debug)]
pub struct MotionSettings {
    pub walk_speed: f32,
    pub walk_animation_rate: f32,
    pub turn_step: f32,
    pub wrap_bound: f32,
}


#[derive(Clone, Debug)]
pub struct Settings {
    pub asset_path: String,
    pub clip_index: usize,
    pub plane_size: f32,
    pub plane_color: Srgba,
    pub axes_length: f32,
    pub helpers_visible: bool,
    pub camera: CameraSettings,
    pub light: LightSettings,
    pub motion: MotionSettings,
}
impl Default for Settings {
    fn default() -> Self {
        Self {
            asset_path: DEFAULT_ASSET_PATH.to_string(),
            clip_index: 2, // idle
            plane_size: 100.0,
            plane_color: Srgba::new_opaque(0xbc, 0xbc, 0xbc),
            axes_length: 50.0,
            helpers_visible: false,
            camera: CameraSettings {
                position: vec3(-10.0, 7.0, -12.0),
                target: vec3(0.0, 0.0, 0.0),
                fovy_degrees: 40.0,
                z_near: 0.1,
                z_far: 1000.0,
                min_distance: 1.0,
                max_distance: 100.0,
                orbit_speed: 0.01,
                zoom_speed: 0.001,
                pan_speed: 0.01,
            },
            light: LightSettings {
                ambient_intensity: 0.7,
                spot_intensity: 0.7,
                spot_position: vec3(2.0, 12.0, 2.0),
                spot_cutoff: PI / 6.0,
                spot_color: Srgba::WHITE,
                spot_linear_falloff: 0.05,
                shadow_map_size: 1024,
            },
            motion: MotionSettings {
                walk_speed: 0.03,
                walk_animation_rate: 0.005,
                turn_step: 0.05,
                wrap_bound: 15.0,
            },
        }
    }
}
impl Settings {
    /// Default settings loading the model from `path` instead of [DEFAULT_ASSET_PATH]
    pub fn with_asset_path(path: Option<String>) -> Self {
        let mut settings = Self::default();
        if let Some(p) = path.filter(|p| !p.trim().is_empty()) {
            settings.asset_path = p;
        }
        settings
    }
}
