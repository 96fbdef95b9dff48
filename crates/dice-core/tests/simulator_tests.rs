// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(missing_docs)]
use dice_core::math::{Mat3, Vec3};
use dice_core::{Cube, Point2, Simulator, SimulatorState, StateError, Walls, TAP_POWER};

const MAX_TICKS: usize = 2000;

fn cube_at(x: f64, y: f64, z: f64) -> Cube {
    Cube::from_parts(Vec3::new(x, y, z), Vec3::ZERO, Mat3::identity(), Vec3::ZERO)
}

fn run_until_stopped(sim: &mut Simulator) -> usize {
    for tick in 1..=MAX_TICKS {
        sim.update();
        if sim.is_stopped() {
            return tick;
        }
    }
    panic!("simulator still moving after {MAX_TICKS} ticks");
}

#[test]
fn dropped_pair_settles() {
    let mut sim = Simulator::new(2, None);
    run_until_stopped(&mut sim);
    for cube in sim.cubes() {
        assert!(cube.is_face_down());
        assert!(cube.position().z() < 1.1);
    }
}

#[test]
fn dropped_pair_settles_inside_walls() {
    let walls = Walls { x: 6.0, y: 6.0 };
    let mut sim = Simulator::new(2, Some(walls));
    run_until_stopped(&mut sim);
    for cube in sim.cubes() {
        assert!(cube.position().x().abs() <= walls.x);
        assert!(cube.position().y().abs() <= walls.y);
    }
}

#[test]
fn corners_never_end_a_tick_below_the_floor() {
    let mut sim = Simulator::new(2, None);
    for _ in 0..400 {
        sim.update();
        for cube in sim.cubes() {
            for corner in cube.corners() {
                assert!(corner.z() >= -1e-9, "corner below floor: {corner:?}");
            }
        }
    }
}

#[test]
fn tap_directly_below_lifts_with_full_power() {
    let mut sim = Simulator::from_cubes(vec![cube_at(0.0, 0.0, 1.0)], None);
    let here = Point2 { x: 0.0, y: 0.0 };
    assert!(sim.has_tap_target_cube(here));
    sim.tap_position(here);
    let v = sim.cube(0).map(Cube::velocity).expect("slot 0");
    assert_eq!(v.z(), TAP_POWER);
    assert!(v.x().hypot(v.y()) <= 0.1 * TAP_POWER + 1e-12);
    assert!(!sim.is_stopped());
}

#[test]
fn tap_ignores_hidden_cubes() {
    let mut sim = Simulator::from_cubes(vec![cube_at(0.0, 0.0, 1.0)], None);
    sim.hide(&[0]);
    let here = Point2 { x: 0.0, y: 0.0 };
    assert!(!sim.has_tap_target_cube(here));
    sim.tap_position(here);
    assert_eq!(sim.cube(0).map(Cube::velocity), Some(Vec3::ZERO));
}

#[test]
fn throw_is_deterministic_and_reveals() {
    let mut a = Simulator::new(3, None);
    a.hide(&[0, 1, 2]);
    let mut b = a.clone();
    a.throw(&[0, 2], 1234.5);
    b.throw(&[0, 2], 1234.5);
    assert_eq!(a.current_state(), b.current_state());
    let state = a.current_state();
    assert!(state.cubes[0].is_some());
    assert!(state.cubes[1].is_none());
    assert!(state.cubes[2].is_some());
    for cube in [0, 2].into_iter().filter_map(|i| a.cube(i)) {
        assert!(cube.position().z() >= 8.0);
        assert_eq!(cube.velocity(), Vec3::ZERO);
    }
    assert_ne!(a.cube(0).map(Cube::position), a.cube(2).map(Cube::position));
}

#[test]
fn hidden_slots_export_as_none_and_reimport_hidden() {
    let mut sim = Simulator::new(2, None);
    sim.hide(&[1]);
    let state = sim.current_state();
    assert!(state.cubes[1].is_none());

    let mut other = Simulator::new(2, None);
    other.replace_state(&state).expect("same slot count");
    let hidden = other.cube(1).expect("slot 1");
    assert!(hidden.is_hidden());
    assert_eq!(hidden.position(), Vec3::ZERO);
    assert_eq!(other.current_state(), state);
}

#[test]
fn replicas_fed_the_same_snapshot_stay_in_lockstep() {
    let mut authority = Simulator::new(2, None);
    for _ in 0..10 {
        authority.update();
    }
    let mut replica = Simulator::new(2, None);
    replica
        .replace_state(&authority.current_state())
        .expect("import");
    let tap = Point2 { x: 0.5, y: -0.25 };
    authority.tap_position(tap);
    replica.tap_position(tap);
    for _ in 0..50 {
        authority.update();
        replica.update();
    }
    assert_eq!(authority.current_state(), replica.current_state());
}

#[test]
fn replace_state_rejects_wrong_slot_count() {
    let mut sim = Simulator::new(2, None);
    let before = sim.current_state();
    let err = sim
        .replace_state(&SimulatorState {
            frame: 9,
            cubes: vec![None],
        })
        .expect_err("slot count differs");
    assert_eq!(err, StateError::SlotCountMismatch { expected: 2, got: 1 });
    assert_eq!(sim.current_state(), before);
}

#[test]
fn replace_state_rejects_non_finite_numbers() {
    let mut sim = Simulator::new(1, None);
    let before = sim.current_state();
    let mut state = before.clone();
    if let Some(cube) = state.cubes[0].as_mut() {
        cube.v.x = f64::NAN;
    }
    let err = sim.replace_state(&state).expect_err("nan rejected");
    assert_eq!(err, StateError::NonFinite { index: 0 });
    assert_eq!(sim.current_state(), before);
}

#[test]
fn replace_state_resumes_a_stopped_simulator() {
    let mut sim = Simulator::from_cubes(vec![cube_at(0.0, 0.0, 1.0)], None);
    sim.update();
    assert!(sim.is_stopped());
    let state = sim.current_state();
    sim.replace_state(&state).expect("import");
    assert!(!sim.is_stopped());
    assert_eq!(sim.frame(), state.frame);
}

#[test]
fn hidden_cube_takes_no_part_in_collisions() {
    let mover = Cube::from_parts(
        Vec3::new(0.5, 0.0, 5.0),
        Vec3::new(-1.0, 0.0, 0.0),
        Mat3::identity(),
        Vec3::ZERO,
    );
    let overlapping = vec![cube_at(0.0, 0.0, 5.0), mover.clone()];

    let mut with_hidden = Simulator::from_cubes(overlapping.clone(), None);
    with_hidden.hide(&[0]);
    let hidden_before = with_hidden.cube(0).cloned();
    with_hidden.update();

    let mut alone = Simulator::from_cubes(vec![mover], None);
    alone.update();

    assert_eq!(with_hidden.cube(0).cloned(), hidden_before);
    assert_eq!(with_hidden.cube(1), alone.cube(0));
    let v = with_hidden.cube(1).expect("slot").velocity();
    assert_eq!(v, Vec3::new(-1.0, 0.0, -0.1));

    let mut both_visible = Simulator::from_cubes(overlapping, None);
    both_visible.update();
    assert_ne!(both_visible.cube(1), alone.cube(0));
}
