//! Interpolation property tests
//!
//! Checks the observable contract of the tick-based interpolators:
//! 1. Every kind lands on its goal after exactly round(T/dt) ticks
//! 2. The quartic-linear profile is continuous across its segment boundaries
//! 3. SLERP reproduces its endpoints
//! 4. Reading without popping never changes state

use approx::assert_relative_eq;
use nalgebra::{UnitQuaternion, Vector1, Vector3};

use stride_core::interpolation::{
    InterpolationKind, Interpolator, OrientationInterpolator, RotationKind, TrajectoryGoal, TrajectorySample,
};
use stride_core::math::{slerp, yaw_matrix};
use stride_core::ticks;

fn drain<const D: usize>(inter: &mut Interpolator<D>) -> Vec<TrajectorySample<D>> {
    let mut out = Vec::new();
    while !inter.is_empty() {
        out.push(inter.get(true));
    }
    out
}

/// set(target, T, kind) followed by round(T/dt) pops ends on the target
mod endpoint_tests {
    use super::*;

    const DT: f64 = 0.005;

    fn run(kind: InterpolationKind, duration: f64) -> (usize, TrajectorySample<3>) {
        let mut inter = Interpolator::<3>::new(DT);
        inter.init(
            Vector3::new(0.1, -0.2, 0.3),
            Some(Vector3::new(0.5, 0.0, -0.5)),
            Some(Vector3::new(0.0, 1.0, 0.0)),
        );
        inter
            .set(
                TrajectoryGoal::new(Vector3::new(1.0, 2.0, -1.0), duration, kind)
                    .with_velocity(Vector3::new(0.2, -0.1, 0.0))
                    .with_acceleration(Vector3::new(-0.3, 0.0, 0.4)),
            )
            .unwrap();

        let samples = drain(&mut inter);
        (samples.len(), *samples.last().unwrap())
    }

    #[test]
    fn test_linear_position() {
        let (n, last) = run(InterpolationKind::Linear, 0.73);
        assert_eq!(n, ticks(0.73, DT));
        assert_relative_eq!(last.position, Vector3::new(1.0, 2.0, -1.0), epsilon = 1e-9);
    }

    #[test]
    fn test_cubic_position_velocity() {
        let (n, last) = run(InterpolationKind::Cubic, 0.73);
        assert_eq!(n, ticks(0.73, DT));
        assert_relative_eq!(last.position, Vector3::new(1.0, 2.0, -1.0), epsilon = 1e-9);
        assert_relative_eq!(last.velocity, Vector3::new(0.2, -0.1, 0.0), epsilon = 1e-9);
    }

    #[test]
    fn test_quintic_full_state() {
        for kind in [InterpolationKind::Quintic, InterpolationKind::HoffArbib] {
            let (n, last) = run(kind, 0.73);
            assert_eq!(n, ticks(0.73, DT));
            assert_relative_eq!(last.position, Vector3::new(1.0, 2.0, -1.0), epsilon = 1e-9);
            assert_relative_eq!(last.velocity, Vector3::new(0.2, -0.1, 0.0), epsilon = 1e-9);
            assert_relative_eq!(last.acceleration, Vector3::new(-0.3, 0.0, 0.4), epsilon = 1e-8);
        }
    }

    #[test]
    fn test_quartic_linear_position_velocity() {
        let (n, last) = run(InterpolationKind::QuarticLinear { blend: 0.1 }, 0.73);
        assert_eq!(n, ticks(0.73, DT));
        assert_relative_eq!(last.position, Vector3::new(1.0, 2.0, -1.0), epsilon = 1e-9);
        assert_relative_eq!(last.velocity, Vector3::new(0.2, -0.1, 0.0), epsilon = 1e-9);
    }
}

/// 4-1-4 profile: start 0, target 10, 10 s, blend 2 s, dt 0.01 s
mod quartic_linear_tests {
    use super::*;

    const DT: f64 = 0.01;

    fn profile() -> Vec<TrajectorySample<1>> {
        let mut inter = Interpolator::<1>::new(DT);
        inter.init(Vector1::new(0.0), None, None);
        inter
            .set_position(Vector1::new(10.0), 10.0, InterpolationKind::QuarticLinear { blend: 2.0 })
            .unwrap();
        drain(&mut inter)
    }

    #[test]
    fn test_reaches_target_at_rest() {
        let samples = profile();
        let last = samples.last().unwrap();

        assert_eq!(samples.len(), 1000);
        assert_relative_eq!(last.position[0], 10.0, epsilon = 1e-9);
        assert_relative_eq!(last.velocity[0], 0.0, epsilon = 1e-9);
        assert_relative_eq!(last.acceleration[0], 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_cruise_velocity() {
        // m = (10 - 0) / (10 - 2·2)
        let samples = profile();
        assert_relative_eq!(samples[499].velocity[0], 10.0 / 6.0, epsilon = 1e-9);
        assert_relative_eq!(samples[499].acceleration[0], 0.0);
    }

    #[test]
    fn test_no_jumps_at_boundaries() {
        let samples = profile();

        // Peak acceleration 0.625 m/s², peak jerk 0.625 m/s³
        for pair in samples.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            assert!((b.position[0] - a.position[0]).abs() <= 10.0 / 6.0 * DT + 1e-9);
            assert!((b.velocity[0] - a.velocity[0]).abs() <= 0.625 * DT + 1e-9);
            assert!((b.acceleration[0] - a.acceleration[0]).abs() <= 0.625 * DT + 1e-9);
        }
    }

    #[test]
    fn test_boundary_values_match() {
        let samples = profile();

        // Ease-in ends at tick 400, ease-out starts at tick 600
        for boundary in [399usize, 599] {
            let (a, b) = (&samples[boundary - 1], &samples[boundary]);
            assert_relative_eq!(b.velocity[0], a.velocity[0], epsilon = 1e-3);
            assert_relative_eq!(b.acceleration[0], a.acceleration[0], epsilon = 1e-2);
        }
    }
}

mod slerp_tests {
    use super::*;

    fn quats() -> Vec<UnitQuaternion<f64>> {
        vec![
            UnitQuaternion::identity(),
            UnitQuaternion::from_euler_angles(0.3, -0.2, 1.4),
            UnitQuaternion::from_euler_angles(-2.5, 1.0, 0.1),
            UnitQuaternion::from_euler_angles(3.0, 0.0, -3.0),
        ]
    }

    #[test]
    fn test_endpoints() {
        for q0 in quats() {
            for q1 in quats() {
                assert!(slerp(&q0, &q1, 0.0).angle_to(&q0) < 1e-9);
                assert!(slerp(&q0, &q1, 1.0).angle_to(&q1) < 1e-9);
            }
        }
    }

    #[test]
    fn test_same_input_is_constant() {
        for q in quats() {
            for i in 0..=20 {
                assert!(slerp(&q, &q, i as f64 / 20.0).angle_to(&q) < 1e-9);
            }
        }
    }
}

mod idempotence_tests {
    use super::*;

    #[test]
    fn test_trajectory_peek() {
        let mut inter = Interpolator::<2>::new(0.01);
        inter
            .set_position(nalgebra::Vector2::new(1.0, 1.0), 0.5, InterpolationKind::Quintic)
            .unwrap();
        for _ in 0..10 {
            inter.get(true);
        }

        let first = inter.get(false);
        for _ in 0..5 {
            assert_eq!(inter.get(false), first);
        }
        assert_eq!(inter.get(true), first);
    }

    #[test]
    fn test_peek_does_not_activate_queued_goal() {
        let mut inter = Interpolator::<1>::new(0.01);
        inter.set_position(Vector1::new(1.0), 0.01, InterpolationKind::Linear).unwrap();
        inter.set_position(Vector1::new(2.0), 0.5, InterpolationKind::Linear).unwrap();

        assert_relative_eq!(inter.get(false).position[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(inter.get(false).position[0], 1.0, epsilon = 1e-12);
        assert_eq!(inter.len(), 1);
    }

    #[test]
    fn test_orientation_peek() {
        let mut inter = OrientationInterpolator::new(0.01);
        inter
            .set(yaw_matrix(1.0), 0.5, RotationKind::TwoAxis, InterpolationKind::Cubic)
            .unwrap();
        inter.get(true);

        let first = inter.get(false);
        for _ in 0..5 {
            assert_eq!(inter.get(false), first);
        }
    }
}
