#[allow(unused_imports)]
use std::{
    sync::{Arc, Mutex, atomic::{AtomicBool, Ordering}},
    rc::Rc,
    cell::RefCell,
};

use three_d::*;
#[cfg(target_arch = "wasm32")]
use bus::{Bus, BusReader};

use crate::log; // macro import
use crate::utils::*;
use crate::scene::*;
use crate::controls::{Command, Controls};
use crate::motion::{AnimationClock, Pose};
use crate::settings::{CameraSettings, Settings};


/// Orbit control that also pans with the right mouse button
pub struct OrbitPanControl {
    control: CameraControl,
    orbit_speed: f32,
    zoom_speed: f32,
}
impl OrbitPanControl {
    /// Left drag orbits around the camera target, right drag pans, the wheel zooms
    pub fn new(target: Vec3, settings: &CameraSettings) -> Self {
        Self {
            control: CameraControl {
                left_drag_horizontal: CameraAction::OrbitLeft { target, speed: settings.orbit_speed },
                left_drag_vertical: CameraAction::OrbitUp { target, speed: settings.orbit_speed },
                scroll_vertical: CameraAction::Zoom {
                    min: settings.min_distance,
                    max: settings.max_distance,
                    speed: settings.zoom_speed,
                    target,
                },
                right_drag_horizontal: CameraAction::Left { speed: settings.pan_speed },
                right_drag_vertical: CameraAction::Up { speed: settings.pan_speed },
                ..Default::default()
            },
            orbit_speed: settings.orbit_speed,
            zoom_speed: settings.zoom_speed,
        }
    }

    /// Translation of the orbit target caused by this frame's right-button drag
    fn pan_offset(&self, camera: &Camera, events: &[Event]) -> Vec3 {
        let drag = events.iter().find_map(|event| match event {
            Event::MouseMotion { delta, button: Some(MouseButton::Right), .. } => Some(*delta),
            _ => None,
        });
        let Some((dx, dy)) = drag else {
            return Vec3::zero();
        };

        let mut offset = Vec3::zero();
        if let CameraAction::Left { speed } = self.control.right_drag_horizontal {
            offset += -camera.right_direction() * dx * speed;
        }
        if let CameraAction::Up { speed } = self.control.right_drag_vertical {
            let up = camera.right_direction().cross(camera.view_direction());
            offset += up * dy * speed;
        }
        offset
    }

    /// Handles the events. Must be called each frame.
    pub fn handle_events(&mut self, camera: &mut Camera, events: &mut [Event]) -> bool {
        let offset = self.pan_offset(camera, events);
        let position = *camera.position();

        if let CameraAction::Zoom { speed, target, .. } = &mut self.control.scroll_vertical {
            *speed = self.zoom_speed * (target.distance(position) + 1.0);
            *target += offset;
        }
        for action in [&mut self.control.left_drag_horizontal, &mut self.control.left_drag_vertical] {
            if let CameraAction::OrbitLeft { speed, target } | CameraAction::OrbitUp { speed, target } = action {
                *speed = self.orbit_speed * target.distance(position) + 0.001;
                *target += offset;
            }
        }

        self.control.handle_events(camera, events)
    }
}


/// Applies key commands to the pose and helper visibility.
/// Before a character is loaded only the key table reacts to keys.
fn apply_commands(commands: &[Command], pose: &mut Pose, helpers_visible: &mut bool, has_character: bool) {
    if !has_character {
        return;
    }
    for command in commands {
        match *command {
            Command::Turn(delta) => pose.turn(delta),
            Command::Reset => pose.reset(),
            Command::ToggleHelpers => *helpers_visible = !*helpers_visible,
        }
    }
}


/// Opens a file dialog and broadcasts the picked .glb to the render loop
#[cfg(target_arch = "wasm32")]
fn pick_model(bus: Rc<RefCell<Bus<(String, Vec<u8>)>>>) {
    execute_future(async move {
        let file = rfd::AsyncFileDialog::new()
            .add_filter("glTF binary", &["glb"])
            .pick_file()
            .await;
        if let Some(f) = file {
            let name = f.file_name();
            let bytes = f.read().await;
            log!("pick_model(): {} ({} bytes)", name, bytes.len());
            //////////////////////////////////
            // non-blocking (i.e., no atomic.wait)
            let _ = bus.borrow_mut().try_broadcast((name, bytes));
            //////////////////////////////////
        }
    });
}


pub async fn main(settings: Settings) {
    let error_flag = Arc::new(AtomicBool::new(false));
    let error_msg = Arc::new(Mutex::new(String::new()));

    let canvas_w = get_canvas_width();
    let canvas_h = get_canvas_height();
    log!("main(): canvas size: {}x{}", canvas_w, canvas_h);

    let window = match Window::new(WindowSettings {
        title: "spiderwalk".to_string(),
        max_size: Some((canvas_w, canvas_h)),
        ..Default::default()
    }) {
        Ok(w) => w,
        Err(e) => {
            log!("main(): ERROR: could not create window: {}", e);
            return;
        }
    };

    let context = window.gl();
    log!("main(): OpenGL version: {:?}", context.version());

    let mut camera = Camera::new_perspective(
        window.viewport(),
        settings.camera.position,
        settings.camera.target,
        vec3(0.0, 1.0, 0.0),
        degrees(settings.camera.fovy_degrees),
        settings.camera.z_near,
        settings.camera.z_far,
    );
    let mut orbit_control = OrbitPanControl::new(*camera.target(), &settings.camera);

    let mut stage = Stage::new(&context, &settings);
    let mut controls = Controls::new(&settings.motion);
    let mut pose = Pose::default();
    let mut clock = AnimationClock::default();

    let mut character = match Character::load(&context, &settings.asset_path, settings.clip_index).await {
        Ok(c) => Some(c),
        Err(e) => {
            log!("main(): {}", e);
            set_error_for_egui(&error_flag, &error_msg, e);
            None
        }
    };

    // lock-free bus for models picked in the file dialog (single-send, single-consumer)
    #[cfg(target_arch = "wasm32")]
    let mut bus_model = Bus::<(String, Vec<u8>)>::new(1);
    #[cfg(target_arch = "wasm32")]
    let mut rx_model: BusReader<(String, Vec<u8>)> = bus_model.add_rx();
    #[cfg(target_arch = "wasm32")]
    let bus_model_rc = Rc::new(RefCell::new(bus_model));

    let mut gui = three_d::GUI::new(&context);
    let mut pointer_over_gui = false;
    let mut fps_ma = IncrementalMA::new(100);
    let mut shadows_dirty = true;
    let wrap_bound = settings.motion.wrap_bound;
    #[cfg(target_arch = "wasm32")]
    let clip_index = settings.clip_index;

    window.render_loop(move |mut frame_input| {
        let fps = fps_ma.add(1000.0 / frame_input.elapsed_time);

        #[cfg(target_arch = "wasm32")]
        if let Ok((name, bytes)) = rx_model.try_recv() {
            match Character::from_bytes(&context, &name, bytes, clip_index) {
                Ok(c) => {
                    log!("main(): switched model to {}", c.name());
                    character = Some(c);
                    pose.reset();
                    clock = AnimationClock::default();
                    shadows_dirty = true;
                }
                Err(e) => {
                    log!("main(): {}", e);
                    set_error_for_egui(&error_flag, &error_msg, e);
                }
            }
        }

        camera.set_viewport(frame_input.viewport);

        gui.update(
            &mut frame_input.events,
            frame_input.accumulated_time,
            frame_input.viewport,
            frame_input.device_pixel_ratio,
            |gui_context| {
                pointer_over_gui = gui_context.is_using_pointer();

                if error_flag.load(Ordering::Relaxed) {
                    egui::Window::new("Error")
                        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
                        .show(gui_context, |ui| {
                            if let Ok(mutex) = error_msg.lock() {
                                ui.colored_label(egui::Color32::RED, &(*mutex));
                            }
                            if ui.button("Ok").clicked() {
                                error_flag.store(false, Ordering::Relaxed);
                                if let Ok(mut mutex) = error_msg.lock() {
                                    mutex.clear();
                                }
                            }
                        });
                }

                egui::Window::new("spiderwalk")
                    .default_open(false)
                    .show(gui_context, |ui| {
                        #[cfg(target_arch = "wasm32")]
                        if ui.button("Open .glb model").clicked() {
                            pick_model(bus_model_rc.clone());
                        }

                        egui::Grid::new("status_grid")
                            .num_columns(2)
                            .spacing([40.0, 4.0])
                            .striped(true)
                            .show(ui, |ui| {
                                ui.add(egui::Label::new("FPS"));
                                ui.label(format!("{:.2}", fps));
                                ui.end_row();

                                ui.add(egui::Label::new("Position"));
                                ui.label(format!("({:.2}, {:.2})", pose.x, pose.z));
                                ui.end_row();

                                ui.add(egui::Label::new("Heading"));
                                ui.label(format!("{:.1}°", pose.heading.to_degrees()));
                                ui.end_row();

                                ui.add(egui::Label::new("Speed"));
                                ui.label(format!("{:.3}", controls.locomotion().speed));
                                ui.end_row();

                                if let Some(c) = character.as_mut() {
                                    ui.add(egui::Label::new("Model"));
                                    ui.label(c.name());
                                    ui.end_row();

                                    ui.add(egui::Label::new("Animation"));
                                    let clips = c.clips().to_vec();
                                    let mut selected = c.clip();
                                    let text = selected.map(|i| clips[i].label.as_str()).unwrap_or("none");
                                    egui::ComboBox::from_id_source("clip_combo")
                                        .selected_text(text)
                                        .show_ui(ui, |ui| {
                                            for (i, clip) in clips.iter().enumerate() {
                                                ui.selectable_value(&mut selected, Some(i), clip.label.as_str());
                                            }
                                        });
                                    if let Some(i) = selected.filter(|i| Some(*i) != c.clip()) {
                                        c.select_clip(i);
                                        shadows_dirty = true;
                                    }
                                    ui.end_row();

                                    ui.add(egui::Label::new("Animation Time (s)"));
                                    ui.label(format!("{:.3}", clock.time()));
                                    ui.end_row();
                                }

                                ui.add(egui::Label::new("Helpers (H)"));
                                ui.checkbox(&mut stage.helpers_visible, "");
                                ui.end_row();

                                ui.add(egui::Label::new("Controls"));
                                ui.label("↑ walk, ←/→ turn, R reset");
                                ui.end_row();
                            });
                    });
            },
        );

        let commands = controls.handle_events(&mut frame_input.events);
        let pose_before = pose;
        apply_commands(&commands, &mut pose, &mut stage.helpers_visible, character.is_some());
        let locomotion = controls.poll();

        if !pointer_over_gui {
            orbit_control.handle_events(&mut camera, &mut frame_input.events);
        }

        if let Some(c) = character.as_mut() {
            let time = clock.advance(locomotion.animation_rate);
            if pose.step(locomotion.speed, wrap_bound) {
                log!("main(): {} out of bounds, wrapped to origin", c.name());
            }
            c.sync(&pose, time);
            stage.aim_spotlight(pose.position());
        }
        // a standing, unturned character leaves the shadow map as it was
        if shadows_dirty || locomotion.is_moving() || pose != pose_before {
            stage.update_shadows(character.as_ref());
            shadows_dirty = false;
        }

        let screen = frame_input.screen();
        screen.clear(ClearState::color_and_depth(0.0, 0.0, 0.0, 1.0, 1.0));
        stage.render(&screen, &camera, character.as_ref());
        gui.render();

        // Returns default frame output to end the frame
        FrameOutput::default()
    });
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orbit_control_takes_camera_settings() {
        let mut camera = Settings::default().camera;
        camera.orbit_speed = 0.2;
        camera.zoom_speed = 0.3;
        camera.pan_speed = 0.4;
        let orbit = OrbitPanControl::new(vec3(0.0, 0.0, 0.0), &camera);

        assert!(matches!(
            orbit.control.left_drag_horizontal,
            CameraAction::OrbitLeft { speed, .. } if speed == 0.2
        ));
        assert!(matches!(
            orbit.control.scroll_vertical,
            CameraAction::Zoom { speed, min, max, .. } if speed == 0.3 && min == 1.0 && max == 100.0
        ));
        assert!(matches!(
            orbit.control.right_drag_vertical,
            CameraAction::Up { speed } if speed == 0.4
        ));
    }

    #[test]
    fn keys_before_load_leave_the_pose_alone() {
        let mut pose = Pose { x: 1.0, z: 2.0, heading: 0.3 };
        let mut helpers = false;
        apply_commands(
            &[Command::Turn(0.05), Command::Reset, Command::ToggleHelpers],
            &mut pose,
            &mut helpers,
            false,
        );
        assert_eq!(pose, Pose { x: 1.0, z: 2.0, heading: 0.3 });
        assert!(!helpers);
    }

    #[test]
    fn commands_apply_in_order_once_loaded() {
        let mut pose = Pose { x: 1.0, z: 2.0, heading: 0.3 };
        let mut helpers = false;
        apply_commands(
            &[Command::Reset, Command::Turn(0.05), Command::ToggleHelpers, Command::ToggleHelpers, Command::ToggleHelpers],
            &mut pose,
            &mut helpers,
            true,
        );
        assert_eq!(pose, Pose { x: 0.0, z: 0.0, heading: 0.05 });
        assert!(helpers);
    }
}
