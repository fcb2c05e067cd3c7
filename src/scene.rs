use three_d::*;

use crate::log; // macro import
use crate::motion::Pose;
use crate::settings::Settings;


const HELPER_COLOR: Srgba = Srgba { r: 255, g: 214, b: 0, a: 255 };


/// Everything in the world except the character: ground, lights and debug helpers
pub struct Stage {
    plane: Gm<Mesh, PhysicalMaterial>,
    ambient: AmbientLight,
    spot: SpotLight,
    axes: Axes,
    spot_arrow: Gm<Mesh, ColorMaterial>,
    shadow_map_size: u32,
    pub helpers_visible: bool,
}
impl Stage {
    pub fn new(context: &Context, settings: &Settings) -> Self {
        let mut plane = Gm::new(
            Mesh::new(context, &CpuMesh::square()),
            PhysicalMaterial::new_opaque(
                context,
                &CpuMaterial {
                    albedo: settings.plane_color,
                    ..Default::default()
                },
            ),
        );
        // unit square spans [-1, 1] in XY; lay it flat on XZ facing +Y
        plane.set_transformation(
            Mat4::from_angle_x(degrees(-90.0)) * Mat4::from_scale(settings.plane_size / 2.0)
        );

        let light = &settings.light;
        let ambient = AmbientLight::new(context, light.ambient_intensity, Srgba::WHITE);
        let spot = SpotLight::new(
            context,
            light.spot_intensity,
            light.spot_color,
            &light.spot_position,
            &(-light.spot_position.normalize()), // at the origin until the character shows up
            radians(light.spot_cutoff),
            Attenuation {
                constant: 1.0,
                linear: light.spot_linear_falloff,
                quadratic: 0.0,
            },
        );

        let axes = Axes::new(context, 0.05, settings.axes_length);
        let spot_arrow = Gm::new(
            Mesh::new(context, &CpuMesh::arrow(0.9, 0.02, 16)),
            ColorMaterial::new_opaque(
                context,
                &CpuMaterial {
                    albedo: HELPER_COLOR,
                    ..Default::default()
                },
            ),
        );

        let mut stage = Self {
            plane,
            ambient,
            spot,
            axes,
            spot_arrow,
            shadow_map_size: light.shadow_map_size,
            helpers_visible: settings.helpers_visible,
        };
        stage.aim_spotlight(vec3(0.0, 0.0, 0.0));
        stage
    }


    /// Points the spotlight (and its helper arrow) at `target`
    pub fn aim_spotlight(&mut self, target: Vec3) {
        let to_target = target - self.spot.position;
        let distance = to_target.magnitude();
        if distance < 1e-4 {
            return;
        }
        self.spot.direction = to_target / distance;

        let rotation = Mat4::from(Quat::from_arc(vec3(1.0, 0.0, 0.0), self.spot.direction, None));
        self.spot_arrow.set_transformation(
            Mat4::from_translation(self.spot.position)
                * rotation
                * Mat4::from_nonuniform_scale(distance, 1.0, 1.0)
        );
    }


    /// Re-renders the spotlight shadow map; only the character casts shadows
    pub fn update_shadows(&mut self, character: Option<&Character>) {
        match character {
            Some(c) => self.spot.generate_shadow_map(self.shadow_map_size, c.parts()),
            None => self.spot.clear_shadow_map(),
        }
    }


    pub fn render(&self, target: &RenderTarget, camera: &Camera, character: Option<&Character>) {
        let lights = [&self.ambient as &dyn Light, &self.spot];
        target.render(camera, [&self.plane], &lights);
        if let Some(c) = character {
            target.render(camera, c.parts(), &lights);
        }
        if self.helpers_visible {
            target.render(camera, [&self.axes as &dyn Object, &self.spot_arrow], &[]);
        }
    }
}


/// A key-frame animation of the glTF document, in document order
#[derive(Clone, Debug, PartialEq)]
pub struct Clip {
    /// Name as stored in the file; unnamed animations are played with `None`
    pub name: Option<String>,
    pub label: String,
}


/// The animated, steerable glTF model
pub struct Character {
    name: String,
    model: Model<PhysicalMaterial>,
    base_transformations: Vec<Mat4>,
    clips: Vec<Clip>,
    clip: Option<usize>,
}
impl Character {
    /// Fetches a .gltf/.glb (plus its buffers and textures) relative to the page
    pub async fn load(context: &Context, path: &str, clip_index: usize) -> Result<Self, String> {
        let mut loaded = three_d_asset::io::load_async(&[path]).await
            .map_err(|e| format!("Character::load(): ERROR: could not fetch {}: {}", path, e))?;
        let document = loaded.get(path)
            .map_err(|e| format!("Character::load(): ERROR: {} missing after fetch: {}", path, e))?;
        let clips = read_clips(document)?;
        let cpu_model: CpuModel = loaded.deserialize(path)
            .map_err(|e| format!("Character::load(): ERROR: could not parse {}: {}", path, e))?;
        Self::new(context, path, cpu_model, clips, clip_index)
    }


    /// Builds a character from an in-memory .glb file
    pub fn from_bytes(context: &Context, name: &str, bytes: Vec<u8>, clip_index: usize) -> Result<Self, String> {
        let clips = read_clips(&bytes)?;
        let mut raw = three_d_asset::io::RawAssets::new();
        raw.insert(name, bytes);
        let cpu_model: CpuModel = raw.deserialize(name)
            .map_err(|e| format!("Character::from_bytes(): ERROR: could not parse {}: {}", name, e))?;
        Self::new(context, name, cpu_model, clips, clip_index)
    }


    fn new(
        context: &Context,
        name: &str,
        cpu_model: CpuModel,
        clips: Vec<Clip>,
        clip_index: usize,
    ) -> Result<Self, String> {
        let base_transformations = cpu_model.geometries.iter()
            .map(|primitive| primitive.transformation)
            .collect();
        let model = Model::<PhysicalMaterial>::new(context, &cpu_model)
            .map_err(|e| format!("Character::new(): ERROR: {}", e))?;

        let mut character = Self {
            name: name.to_string(),
            model,
            base_transformations,
            clips,
            clip: None,
        };
        log!(
            "Character::new(): {}: parts={}, clips={:?}",
            character.name,
            character.base_transformations.len(),
            character.clips.iter().map(|c| c.label.as_str()).collect::<Vec<_>>()
        );
        character.select_clip(clip_index);
        Ok(character)
    }


    /// Plays the clip at `index`, falling back to the first clip when out of range
    pub fn select_clip(&mut self, index: usize) {
        self.clip = resolve_clip(self.clips.len(), index);
        match self.clip {
            Some(i) if i != index => {
                log!(
                    "Character::select_clip(): clip {} not found, playing '{}'", index, self.clips[i].label
                );
            }
            None => {
                log!("Character::select_clip(): {} has no animations", self.name);
            }
            _ => {}
        }
        let name = self.clip.and_then(|i| self.clips[i].name.as_deref());
        self.model.choose_animation(name);
    }


    /// Places every part at `pose` and animates it at `time` seconds
    pub fn sync(&mut self, pose: &Pose, time: f32) {
        let root = pose.transformation();
        for (part, base) in self.model.iter_mut().zip(self.base_transformations.iter()) {
            part.set_transformation(root * *base);
        }
        self.model.animate(time);
    }


    pub fn parts(&self) -> impl Iterator<Item = &ModelPart<PhysicalMaterial>> + Clone {
        self.model.iter()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn clips(&self) -> &[Clip] {
        &self.clips
    }

    pub fn clip(&self) -> Option<usize> {
        self.clip
    }
}


/// Lists the animations of a .gltf/.glb document in the order they are stored
fn read_clips(document: &[u8]) -> Result<Vec<Clip>, String> {
    let gltf = gltf::Gltf::from_slice(document)
        .map_err(|e| format!("read_clips(): ERROR: not a glTF document: {}", e))?;
    Ok(gltf.animations()
        .map(|animation| Clip {
            name: animation.name().map(str::to_string),
            label: animation.name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("animation {}", animation.index())),
        })
        .collect())
}


/// Clip to play for a requested index given `count` available clips
fn resolve_clip(count: usize, requested: usize) -> Option<usize> {
    if count == 0 {
        None
    } else if requested < count {
        Some(requested)
    } else {
        Some(0)
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    // node A is the parent of node B; "idle" animates B, the others animate A
    const ANIMATED_NODES: &str = r#"{
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [ { "nodes": [0] } ],
        "nodes": [ { "name": "A", "children": [1] }, { "name": "B" } ],
        "buffers": [ { "byteLength": 32, "uri": "data:application/octet-stream;base64,AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=" } ],
        "bufferViews": [
            { "buffer": 0, "byteOffset": 0, "byteLength": 8 },
            { "buffer": 0, "byteOffset": 8, "byteLength": 24 }
        ],
        "accessors": [
            { "bufferView": 0, "componentType": 5126, "count": 2, "type": "SCALAR", "min": [0.0], "max": [0.0] },
            { "bufferView": 1, "componentType": 5126, "count": 2, "type": "VEC3" }
        ],
        "animations": [
            { "name": "idle", "samplers": [ { "input": 0, "output": 1 } ],
              "channels": [ { "sampler": 0, "target": { "node": 1, "path": "translation" } } ] },
            { "name": "walk", "samplers": [ { "input": 0, "output": 1 } ],
              "channels": [ { "sampler": 0, "target": { "node": 0, "path": "translation" } } ] },
            { "name": "attack", "samplers": [ { "input": 0, "output": 1 } ],
              "channels": [ { "sampler": 0, "target": { "node": 0, "path": "translation" } } ] },
            { "samplers": [ { "input": 0, "output": 1 } ],
              "channels": [ { "sampler": 0, "target": { "node": 1, "path": "translation" } } ] }
        ]
    }"#;

    #[test]
    fn clips_follow_document_order() {
        let clips = read_clips(ANIMATED_NODES.as_bytes()).unwrap();
        let labels: Vec<&str> = clips.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["idle", "walk", "attack", "animation 3"]);

        // default clip index picks the third animation of the file
        let i = resolve_clip(clips.len(), 2).unwrap();
        assert_eq!(clips[i].name.as_deref(), Some("attack"));
    }

    #[test]
    fn unnamed_animations_are_listed() {
        let clips = read_clips(ANIMATED_NODES.as_bytes()).unwrap();
        assert_eq!(clips[3], Clip { name: None, label: "animation 3".to_string() });
    }

    #[test]
    fn non_gltf_bytes_are_rejected() {
        assert!(read_clips(b"not a model").is_err());
    }

    #[test]
    fn clip_resolution() {
        assert_eq!(resolve_clip(0, 2), None);
        assert_eq!(resolve_clip(5, 2), Some(2));
        assert_eq!(resolve_clip(2, 2), Some(0));
        assert_eq!(resolve_clip(1, 0), Some(0));
    }
}
