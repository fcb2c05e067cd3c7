use three_d::{Mat4, Vec3, radians, vec3};


/// Forward speed and animation playback rate applied each frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Locomotion {
    pub speed: f32,
    pub animation_rate: f32,
}
impl Locomotion {
    pub const STILL: Self = Self { speed: 0.0, animation_rate: 0.0 };

    pub fn is_moving(&self) -> bool {
        self.speed != 0.0 || self.animation_rate != 0.0
    }
}


/// Horizontal placement of the character. It always stands on the ground (y = 0).
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pose {
    pub x: f32,
    pub z: f32,
    pub heading: f32, // radians about +Y
}
impl Pose {
    /// Moves `speed` units along the heading, then wraps back to the origin
    /// once either coordinate leaves `[-bound, bound]`.
    /// Returns true when the pose was wrapped.
    pub fn step(&mut self, speed: f32, bound: f32) -> bool {
        self.x += speed * self.heading.sin();
        self.z += speed * self.heading.cos();

        if self.x.abs() > bound || self.z.abs() > bound {
            self.x = 0.0;
            self.z = 0.0;
            return true;
        }
        false
    }

    pub fn turn(&mut self, delta: f32) {
        self.heading += delta;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn position(&self) -> Vec3 {
        vec3(self.x, 0.0, self.z)
    }

    /// World transformation of the model root; local +Z faces the walking direction
    pub fn transformation(&self) -> Mat4 {
        Mat4::from_translation(self.position()) * Mat4::from_angle_y(radians(self.heading))
    }
}


/// Accumulated animation time in seconds, advanced by the playback rate each frame
#[derive(Clone, Copy, Debug, Default)]
pub struct AnimationClock {
    time: f32,
}
impl AnimationClock {
    pub fn advance(&mut self, rate: f32) -> f32 {
        self.time += rate;
        self.time
    }

    pub fn time(&self) -> f32 {
        self.time
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;
    use three_d::{Vec4, vec4};
    use crate::utils::are_floats_equal;

    const EPS: f32 = 1e-5;

    #[test]
    fn heading_zero_walks_along_z() {
        let mut pose = Pose::default();
        assert!(!pose.step(0.03, 15.0));
        assert!(are_floats_equal(pose.x, 0.0, EPS));
        assert!(are_floats_equal(pose.z, 0.03, EPS));
    }

    #[test]
    fn quarter_turn_walks_along_x() {
        let mut pose = Pose { heading: FRAC_PI_2, ..Default::default() };
        pose.step(1.0, 15.0);
        assert!(are_floats_equal(pose.x, 1.0, EPS));
        assert!(are_floats_equal(pose.z, 0.0, EPS));
    }

    #[test]
    fn zero_speed_keeps_position() {
        let mut pose = Pose { x: 3.0, z: -2.0, heading: 1.2 };
        pose.step(0.0, 15.0);
        assert_eq!(pose, Pose { x: 3.0, z: -2.0, heading: 1.2 });
    }

    #[test]
    fn leaving_the_bound_wraps_both_coordinates() {
        let mut pose = Pose { x: 4.0, z: 14.99, heading: 0.0 };
        assert!(pose.step(0.03, 15.0));
        assert_eq!(pose.x, 0.0);
        assert_eq!(pose.z, 0.0);
        assert_eq!(pose.heading, 0.0);

        let mut pose = Pose { x: -14.99, z: 2.0, heading: -FRAC_PI_2 };
        assert!(pose.step(0.03, 15.0));
        assert_eq!((pose.x, pose.z), (0.0, 0.0));
        assert_eq!(pose.heading, -FRAC_PI_2);
    }

    #[test]
    fn exactly_on_the_bound_does_not_wrap() {
        let mut pose = Pose { x: 0.0, z: 14.5, heading: 0.0 };
        assert!(!pose.step(0.5, 15.0));
        assert_eq!(pose.z, 15.0);
    }

    #[test]
    fn walking_forever_stays_inside_bound() {
        let mut pose = Pose { heading: 0.7, ..Default::default() };
        let mut wraps = 0;
        for _ in 0..10_000 {
            if pose.step(0.03, 15.0) {
                wraps += 1;
            }
            assert!(pose.x.abs() <= 15.0 && pose.z.abs() <= 15.0);
        }
        assert!(wraps > 0);
    }

    #[test]
    fn turn_and_reset() {
        let mut pose = Pose { x: 1.0, z: 2.0, heading: 0.0 };
        pose.turn(0.05);
        pose.turn(0.05);
        pose.turn(-0.05);
        assert!(are_floats_equal(pose.heading, 0.05, EPS));
        pose.reset();
        assert_eq!(pose, Pose::default());
    }

    #[test]
    fn transformation_faces_walking_direction() {
        let pose = Pose { x: 2.0, z: -1.0, heading: 0.9 };
        let origin = pose.transformation() * vec4(0.0, 0.0, 0.0, 1.0);
        assert!(are_floats_equal(origin.x, 2.0, EPS));
        assert!(are_floats_equal(origin.y, 0.0, EPS));
        assert!(are_floats_equal(origin.z, -1.0, EPS));

        let forward: Vec4 = pose.transformation() * vec4(0.0, 0.0, 1.0, 0.0);
        let mut stepped = pose;
        stepped.step(1.0, 15.0);
        assert!(are_floats_equal(forward.x, stepped.x - pose.x, EPS));
        assert!(are_floats_equal(forward.z, stepped.z - pose.z, EPS));
    }

    #[test]
    fn clock_advances_only_with_rate() {
        let mut clock = AnimationClock::default();
        clock.advance(0.0);
        assert_eq!(clock.time(), 0.0);
        for _ in 0..200 {
            clock.advance(0.005);
        }
        assert!(are_floats_equal(clock.time(), 1.0, 1e-4));
    }

    #[test]
    fn still_locomotion() {
        assert!(!Locomotion::STILL.is_moving());
        assert!(Locomotion { speed: 0.03, animation_rate: 0.005 }.is_moving());
    }
}
