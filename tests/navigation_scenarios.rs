use std::time::Duration;

use image::{Rgb, RgbImage};
use rand::SeedableRng;
use rand::rngs::StdRng;
use robo_eye::core_modules::clock::ManualClock;
use robo_eye::core_modules::target_manager::random_target;
use robo_eye::pipeline::{Direction, Instruction, Point};
use robo_eye::{Tracker, TrackerConfig};

const GREEN: Rgb<u8> = Rgb([0, 255, 0]);

fn tracker_with_clock(seed: u64) -> (Tracker<StdRng, ManualClock>, ManualClock) {
    let clock = ManualClock::new();
    let tracker = Tracker::with_parts(
        TrackerConfig::default(),
        StdRng::seed_from_u64(seed),
        clock.clone(),
    )
    .expect("default config is valid");
    (tracker, clock)
}

/// 800x600 black frame with a filled square of `side` centred on `center`.
fn frame_with_square(color: Rgb<u8>, center: (u32, u32), side: u32) -> RgbImage {
    let mut frame = RgbImage::new(800, 600);
    let half = side / 2;
    for y in center.1 - half..center.1 + half {
        for x in center.0 - half..center.0 + half {
            frame.put_pixel(x, y, color);
        }
    }
    frame
}

#[test]
fn empty_scene_reports_nothing_to_navigate() {
    let (mut tracker, _clock) = tracker_with_clock(1);
    let frame = RgbImage::from_pixel(800, 600, Rgb([90, 90, 90]));

    let package = tracker.process(frame).expect("valid frame");
    assert!(package.detection.is_none());
    assert_eq!(package.direction, Direction::NoObject);
    assert_eq!(package.direction.to_string(), "No Object Detected");
    assert_eq!(package.navigation.instruction, Instruction::NoObject);
    assert_eq!(package.navigation.instruction.to_string(), "No object to navigate");
    assert_eq!(package.navigation.distance, None);
    assert_eq!(tracker.target_manager().reach_reports(), 0);
}

#[test]
fn green_square_is_steered_toward_pinned_target() {
    let (mut tracker, _clock) = tracker_with_clock(2);
    tracker.pin_target(Point::new(100, 500));

    let package = tracker
        .process(frame_with_square(GREEN, (600, 100), 40))
        .expect("valid frame");

    let detection = package.detection.expect("green square is detected");
    assert_eq!(detection.color, "Green");
    assert_eq!(detection.blob.centroid, Point::new(600, 100));
    assert!(detection.blob.area > 800);
    assert_eq!(package.direction, Direction::Right);
    assert_eq!(package.navigation.offset, Some((-500, 400)));
    assert_eq!(package.navigation.instruction.to_string(), "Move Left & Move Down");
    assert_eq!(package.navigation.distance, Some(640));
    assert_eq!(package.target, Point::new(100, 500));
    assert_eq!(package.next_target, None);
}

#[test]
fn object_on_target_registers_exactly_one_reach() {
    let (mut tracker, _clock) = tracker_with_clock(3);
    tracker.pin_target(Point::new(600, 100));

    let package = tracker
        .process(frame_with_square(GREEN, (600, 100), 40))
        .expect("valid frame");

    assert_eq!(package.navigation.offset, Some((0, 0)));
    assert_eq!(package.navigation.instruction.to_string(), "Target Reached");
    assert_eq!(tracker.target_manager().reach_reports(), 1);
    // First reach of the run: no earlier reach, so the target moves on.
    assert!(package.next_target.is_some());
    assert_eq!(tracker.target_manager().target(), package.next_target);
}

#[test]
fn target_replacement_respects_cooldown() {
    let (mut tracker, clock) = tracker_with_clock(4);
    let frame = || frame_with_square(GREEN, (400, 300), 40);

    tracker.pin_target(Point::new(400, 300));
    let first = tracker.process(frame()).expect("valid frame");
    assert!(first.next_target.is_some(), "first reach replaces the target");

    // Bring the target back under the object 0.3s later: still cooling down.
    clock.advance(Duration::from_millis(300));
    tracker.pin_target(Point::new(400, 300));
    let early = tracker.process(frame()).expect("valid frame");
    assert!(early.navigation.is_reached());
    assert_eq!(early.next_target, None);
    assert_eq!(tracker.target_manager().target(), Some(Point::new(400, 300)));

    // 0.9s after the registered reach the cooldown has passed.
    clock.advance(Duration::from_millis(600));
    let late = tracker.process(frame()).expect("valid frame");
    assert!(late.navigation.is_reached());
    assert!(late.next_target.is_some());
    assert_ne!(late.next_target, Some(Point::new(400, 300)));

    let stats = tracker.shutdown();
    assert_eq!(stats.reach_reports, 3);
    assert_eq!(stats.targets_reached, 2);
}

#[test]
fn first_target_comes_from_the_injected_rng() {
    let (mut tracker, _clock) = tracker_with_clock(5);
    let mut twin = StdRng::seed_from_u64(5);

    let package = tracker.process(RgbImage::new(640, 480)).expect("valid frame");
    assert_eq!(package.target, random_target(&mut twin, 640, 480, 50));
    assert!((50..=590).contains(&package.target.x));
    assert!((50..=430).contains(&package.target.y));
}

#[test]
fn identical_frames_give_identical_navigation() {
    let (mut tracker, _clock) = tracker_with_clock(6);
    tracker.pin_target(Point::new(100, 500));

    let a = tracker
        .process(frame_with_square(GREEN, (600, 100), 40))
        .expect("valid frame");
    let b = tracker
        .process(frame_with_square(GREEN, (600, 100), 40))
        .expect("valid frame");
    assert_eq!(a.navigation, b.navigation);
    assert_eq!(a.detection, b.detection);
    assert_eq!(tracker.target_manager().reach_reports(), 0);
}

#[test]
fn speckle_below_threshold_is_not_an_object() {
    let (mut tracker, _clock) = tracker_with_clock(7);
    // 20x20 = 400 pixels, grows a little under refinement but stays under 800.
    let package = tracker
        .process(frame_with_square(GREEN, (300, 300), 20))
        .expect("valid frame");
    assert!(package.detection.is_none());
    assert_eq!(package.navigation.instruction, Instruction::NoObject);
}
