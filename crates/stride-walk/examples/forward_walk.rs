//! Forward Walk Demonstration
//!
//! Walks a kinematic biped forward four steps and stops:
//! - Configuration from an optional TOML file
//! - Step goals queued up front, then a stop request
//! - One generator sample per tick handed to the robot's IK
//!
//! The samples are written to `forward_walk.csv`.
//!
//! ```text
//! RUST_LOG=stride_walk=debug cargo run --example forward_walk -- [config.toml]
//! ```

use std::convert::Infallible;
use std::fs::File;
use std::io::{BufWriter, Write};

use nalgebra::Vector3;
use tracing::info;

use stride_core::math::{yaw_matrix, Pose};
use stride_walk::{
    BipedKinematics, FootSide, FootType, IkTargets, StepType, WalkConfig, WalkPlanner,
};

/// Robot whose joints reach any target exactly
struct KinematicBiped {
    com: Vector3<f64>,
    rfoot: Pose,
    lfoot: Pose,
}

impl BipedKinematics for KinematicBiped {
    type Error = Infallible;

    fn center_of_mass(&self) -> Vector3<f64> {
        self.com
    }

    fn foot_pose(&self, side: FootSide) -> Pose {
        match side {
            FootSide::Right => self.rfoot,
            FootSide::Left => self.lfoot,
        }
    }

    fn solve_ik(&mut self, targets: &IkTargets) -> Result<(), Infallible> {
        self.com = targets.com;
        self.rfoot = targets.rfoot;
        self.lfoot = targets.lfoot;
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("stride_walk=info".parse()?),
        )
        .init();

    println!("=== Stride Forward Walk Demonstration ===\n");

    let config = match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading configuration from {}", path);
            WalkConfig::load(&path)?
        }
        None => WalkConfig::default(),
    };
    println!("Control period: {} s", config.dt);
    println!("Step timing: {} s single, {} s double", config.single_support_time, config.double_support_time);

    let mut robot = KinematicBiped {
        com: Vector3::new(0.0, 0.0, 0.8),
        rfoot: Pose::from_translation(Vector3::new(0.0, -0.1, 0.0)),
        lfoot: Pose::from_translation(Vector3::new(0.0, 0.1, 0.0)),
    };

    let mut planner = WalkPlanner::new(config)?;
    planner.init(&robot)?;
    println!("Lateral capture point offset: {:.4} m", planner.capture_point().offset());

    // Alternating steps, turning slightly on the last pair
    let footholds = [
        (FootType::Left, Pose::from_translation(Vector3::new(0.1, 0.1, 0.0))),
        (FootType::Right, Pose::from_translation(Vector3::new(0.2, -0.1, 0.0))),
        (FootType::Left, Pose::new(Vector3::new(0.3, 0.1, 0.0), yaw_matrix(0.1))),
        (FootType::Right, Pose::new(Vector3::new(0.32, -0.1, 0.0), yaw_matrix(0.1))),
    ];
    for (swing, pose) in footholds {
        planner.add_step_for(pose, swing, StepType::Cycloid)?;
    }
    planner.stop(false)?;
    println!("Planned walk duration: {:.3} s\n", planner.remaining_time());

    let mut csv = BufWriter::new(File::create("forward_walk.csv")?);
    writeln!(
        csv,
        "t,support,type,com_x,com_y,com_z,zmp_x,zmp_y,cp_x,cp_y,rfoot_x,rfoot_y,rfoot_z,lfoot_x,lfoot_y,lfoot_z"
    )?;

    let dt = planner.config().dt;
    let mut tick = 0usize;
    while !planner.is_empty() {
        let sample = planner.get(true);
        robot.solve_ik(&IkTargets::from_step(&sample))?;

        let t = tick as f64 * dt;
        writeln!(
            csv,
            "{:.3},{:?},{:?},{:.5},{:.5},{:.5},{:.5},{:.5},{:.5},{:.5},{:.5},{:.5},{:.5},{:.5},{:.5},{:.5}",
            t,
            sample.support_foot,
            sample.step_type,
            sample.com.x,
            sample.com.y,
            sample.com.z,
            sample.zmp.x,
            sample.zmp.y,
            sample.cp.x,
            sample.cp.y,
            sample.rfoot.translation.x,
            sample.rfoot.translation.y,
            sample.rfoot.translation.z,
            sample.lfoot.translation.x,
            sample.lfoot.translation.y,
            sample.lfoot.translation.z,
        )?;

        if tick % 80 == 0 {
            println!(
                "t={:5.2}s  {:>8?}  com=({:+.3}, {:+.3})  cp=({:+.3}, {:+.3})",
                t, sample.support_foot, sample.com.x, sample.com.y, sample.cp.x, sample.cp.y
            );
        }
        tick += 1;
    }
    csv.flush()?;

    println!("\n=== Walk Complete ===");
    println!("Ticks: {}", tick);
    println!("Final CoM: ({:.4}, {:.4}, {:.4})", robot.com.x, robot.com.y, robot.com.z);
    println!("Right foot: {:?}", robot.rfoot.translation);
    println!("Left foot: {:?}", robot.lfoot.translation);
    println!("Samples written to forward_walk.csv");

    Ok(())
}
